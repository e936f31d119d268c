//! The mesh network layer itself: address validation and radio setup
//! (`begin`), the send pipeline with end-to-end ACKs (`send`/`send_direct`),
//! the receive pipeline (`poll`), and multicast.

use log::{debug, trace, warn};

use crate::address::{self, NodeAddress, NodeIdentity};
use crate::channel::channel_mhz;
use crate::config::NetworkConfig;
use crate::error::NetworkError;
use crate::packet::{CodecError, Frame, Header, TxMode, FRAME_LEN, HEADER_LEN, NETWORK_ACK};
use crate::queue::RxQueue;
use crate::radio::Radio;
use crate::routing::logical_to_physical;
use crate::timer::Timer;

/// Running count of successful and failed sends, exposed by `failures`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Counters {
    pub ok: u32,
    pub failed: u32,
}

/// A tree-routed mesh network bound to one radio and one node address.
///
/// `N` is the receive queue's frame capacity (default 6, matching the
/// source firmware's small frame buffer).
pub struct Network<R: Radio, T: Timer, const N: usize = 6> {
    radio: R,
    timer: T,
    config: NetworkConfig,
    identity: NodeIdentity,
    queue: RxQueue<N>,
    next_id: u16,
    multicast_level: u8,
    multicast_relay_enabled: bool,
    last_multi_message_id: u16,
    counters: Counters,
}

impl<R: Radio, T: Timer, const N: usize> Network<R, T, N> {
    /// Builds a `Network` around `radio` and `timer`, not yet bound to an
    /// address; call `begin` before sending or polling.
    pub fn new(radio: R, timer: T, config: NetworkConfig) -> Self {
        let multicast_relay_enabled = config.multicast_relay;
        Network {
            radio,
            timer,
            config,
            identity: NodeIdentity::new(address::ROOT),
            queue: RxQueue::new(),
            next_id: 0,
            multicast_level: 0,
            multicast_relay_enabled,
            last_multi_message_id: 0,
            counters: Counters::default(),
        }
    }

    /// Validates `address`, configures the radio (channel, dynamic
    /// ACK/payloads, staggered retry delay), opens all six listening
    /// pipes, and starts listening.
    ///
    /// The retry delay is derived from the node's own address
    /// (`((address % 6) + 1) * 2 + 3`, in the radio's native 250us units)
    /// so that sibling nodes don't all retry in lockstep after a
    /// collision.
    pub fn begin(&mut self, channel: u8, address: NodeAddress) -> Result<(), NetworkError<R::Error>> {
        if !address::is_valid_address(address, self.config.multicast_enabled) {
            return Err(NetworkError::InvalidAddress);
        }
        if !self.radio.is_valid() {
            return Err(NetworkError::RadioNotValid);
        }

        self.radio.set_channel(channel).map_err(NetworkError::Radio)?;
        self.radio.enable_dynamic_ack().map_err(NetworkError::Radio)?;
        self.radio.enable_dynamic_payloads().map_err(NetworkError::Radio)?;

        let retry_delay = ((address.raw() % 6) + 1) * 2 + 3;
        self.radio
            .set_retries(retry_delay as u8, self.config.retry_count)
            .map_err(NetworkError::Radio)?;

        self.identity = NodeIdentity::new(address);

        for pipe in 0..6u8 {
            let pipe_addr = address::pipe_address(address, pipe, self.config.multicast_enabled);
            self.radio.open_reading_pipe(pipe, pipe_addr).map_err(NetworkError::Radio)?;
        }

        self.multicast_level = self.identity.depth;

        self.radio.start_listening().map_err(NetworkError::Radio)?;
        debug!(
            "network begin: address=0o{:o} mask=0o{:o} parent=0o{:o} depth={} channel={} ({} MHz)",
            address.raw(),
            self.identity.node_mask,
            self.identity.parent_node.raw(),
            self.identity.depth,
            channel,
            channel_mhz(channel)
        );
        Ok(())
    }

    /// Builds a header with `from_node` left at the zero address (filled
    /// in by `send`/`send_direct`/`multicast`) and a freshly assigned,
    /// monotonically increasing id.
    pub fn make_header(&mut self, to_node: NodeAddress, msg_type: u8) -> Header {
        let id = self.next_id;
        self.next_id = self.next_id.wrapping_add(1);
        Header {
            from_node: address::ROOT,
            to_node,
            id,
            msg_type,
            reserved: 0,
        }
    }

    pub fn address(&self) -> NodeAddress {
        self.identity.address
    }

    pub fn parent(&self) -> Option<NodeAddress> {
        if self.identity.address == address::ROOT {
            None
        } else {
            Some(self.identity.parent_node)
        }
    }

    pub fn failures(&self) -> Counters {
        self.counters
    }

    pub fn available(&self) -> bool {
        self.queue.available()
    }

    pub fn peek(&self) -> Option<&Frame> {
        self.queue.peek()
    }

    pub fn read(&mut self) -> Option<Frame> {
        self.queue.read()
    }

    /// Routes `header`/`payload` toward `header.to_node` by ordinary tree
    /// routing, waiting for an end-to-end ACK if the send is forwarded
    /// through an intermediate hop.
    pub fn send(&mut self, mut header: Header, payload: &[u8]) -> Result<bool, NetworkError<R::Error>> {
        header.from_node = self.identity.address;
        let to_node = header.to_node;
        if to_node == self.identity.address {
            return self.enqueue_locally(header, payload);
        }
        self.route_and_send(header, payload, to_node, TxMode::Normal)
    }

    /// Routes `header`/`payload` toward the explicit address
    /// `write_direct` rather than `header.to_node`'s tree position. If
    /// `write_direct` equals `header.to_node` this is a direct
    /// single-hop send (`TxMode::ToPhysical`); otherwise it's addressed
    /// through an explicit intermediate (`TxMode::ToLogical`).
    pub fn send_direct(
        &mut self,
        mut header: Header,
        payload: &[u8],
        write_direct: NodeAddress,
    ) -> Result<bool, NetworkError<R::Error>> {
        header.from_node = self.identity.address;
        if header.to_node == self.identity.address {
            return self.enqueue_locally(header, payload);
        }
        let mode = if header.to_node == write_direct {
            TxMode::ToPhysical
        } else {
            TxMode::ToLogical
        };
        self.route_and_send(header, payload, write_direct, mode)
    }

    /// Sends `payload` to every node listening at tree `level`.
    /// `header.to_node` is overwritten with the reserved multicast
    /// address; no per-hop ACK is requested.
    pub fn multicast(&mut self, mut header: Header, payload: &[u8], level: u8) -> Result<bool, NetworkError<R::Error>> {
        header.from_node = self.identity.address;
        header.to_node = address::MULTICAST_ADDRESS;
        let target = address::level_to_address(level);
        self.route_and_send(header, payload, target, TxMode::Multicast)
    }

    /// Moves this node's multicast rendezvous to `level`: reopens reading
    /// pipe 0 on the level-scoped address so it receives multicast traffic
    /// for the new level instead of the one derived from its own address
    /// at `begin`.
    pub fn set_multicast_level(&mut self, level: u8) -> Result<(), NetworkError<R::Error>> {
        self.radio.stop_listening().map_err(NetworkError::Radio)?;
        let pipe_addr = address::pipe_address(address::level_to_address(level), 0, self.config.multicast_enabled);
        self.radio.open_reading_pipe(0, pipe_addr).map_err(NetworkError::Radio)?;
        self.radio.start_listening().map_err(NetworkError::Radio)?;
        self.multicast_level = level;
        Ok(())
    }

    pub fn set_multicast_relay(&mut self, enabled: bool) {
        self.multicast_relay_enabled = enabled;
    }

    fn enqueue_locally(&mut self, header: Header, payload: &[u8]) -> Result<bool, NetworkError<R::Error>> {
        let frame = Frame::new(header, payload)?;
        Ok(self.queue.enqueue(frame))
    }

    /// Core of the send pipeline: validates `route_target`, asks the
    /// routing engine where to physically send next, transmits, emits a
    /// routed ACK if this hop just delivered a `TX_ROUTED` frame to its
    /// final destination, and (for ordinary/explicit-logical sends that
    /// were actually forwarded) blocks polling for the end-to-end ACK.
    fn route_and_send(
        &mut self,
        header: Header,
        payload: &[u8],
        route_target: NodeAddress,
        mode: TxMode,
    ) -> Result<bool, NetworkError<R::Error>> {
        if !address::is_valid_address(route_target, self.config.multicast_enabled) {
            return Ok(false);
        }

        let route = logical_to_physical(&self.identity, route_target, mode);
        let frame = Frame::new(header, payload)?;
        trace!(
            "sending to 0o{:o} via 0o{:o} pipe {} mode {:?}",
            header.to_node.raw(),
            route.next_hop.raw(),
            route.pipe,
            mode
        );
        let mut ok = self.write_to_pipe(&frame, route.next_hop, route.pipe, route.multicast)?;

        if mode == TxMode::Routed && ok && route.next_hop == route_target && header.msg_type != NETWORK_ACK {
            self.emit_routed_ack(&header)?;
        }

        self.radio.start_listening().map_err(NetworkError::Radio)?;

        if ok && route.next_hop != route_target && matches!(mode, TxMode::Normal | TxMode::ToLogical) {
            ok = self.wait_for_network_ack()?;
        }

        if ok {
            self.counters.ok += 1;
        } else {
            self.counters.failed += 1;
            warn!("send to 0o{:o} failed", header.to_node.raw());
        }
        Ok(ok)
    }

    /// The routed-ACK quirk: the ACK keeps `from_node` as the original
    /// sender, not this relaying node, since it is routed back along the
    /// reverse path using the same address that got it here.
    fn emit_routed_ack(&mut self, header: &Header) -> Result<(), NetworkError<R::Error>> {
        let mut ack_header = *header;
        ack_header.to_node = header.from_node;
        ack_header.msg_type = NETWORK_ACK;

        let ack_route = logical_to_physical(&self.identity, ack_header.to_node, TxMode::Routed);
        let ack_frame = Frame::header_only(ack_header);
        self.write_to_pipe(&ack_frame, ack_route.next_hop, ack_route.pipe, ack_route.multicast)?;
        Ok(())
    }

    fn wait_for_network_ack(&mut self) -> Result<bool, NetworkError<R::Error>> {
        let start = self.timer.ticks_ms();
        loop {
            if self.poll()? == NETWORK_ACK {
                return Ok(true);
            }
            if self.timer.ticks_ms().wrapping_sub(start) > self.config.route_timeout_ms {
                return Ok(false);
            }
        }
    }

    fn write_to_pipe(
        &mut self,
        frame: &Frame,
        next_hop: NodeAddress,
        pipe: u8,
        multicast: bool,
    ) -> Result<bool, NetworkError<R::Error>> {
        let pipe_addr = address::pipe_address(next_hop, pipe, self.config.multicast_enabled);

        self.radio.stop_listening().map_err(NetworkError::Radio)?;
        self.radio.open_writing_pipe(pipe_addr).map_err(NetworkError::Radio)?;

        let mut buf = [0u8; FRAME_LEN];
        let len = frame.encode(&mut buf);
        self.radio.write_fast(&buf[..len], multicast).map_err(NetworkError::Radio)?;
        self.radio
            .tx_standby(self.config.tx_timeout_ms)
            .map_err(NetworkError::Radio)
    }

    /// Drains every frame waiting on the radio: self-destined frames are
    /// enqueued (or, if `NETWORK_ACK`, recorded and discarded),
    /// multicast frames are enqueued and optionally relayed a level
    /// deeper, and everything else is relayed one hop closer to its
    /// destination. Returns `NETWORK_ACK` if one was observed during
    /// this drain (used by the send pipeline's ACK wait), else 0.
    pub fn poll(&mut self) -> Result<u8, NetworkError<R::Error>> {
        let mut signal = 0u8;

        while self.radio.is_valid() && self.radio.available().map_err(NetworkError::Radio)? {
            let avail_len = self.radio.get_dynamic_payload_size().map_err(NetworkError::Radio)?;
            if avail_len < HEADER_LEN {
                let mut discard = [0u8; FRAME_LEN];
                self.radio.read(&mut discard, avail_len).map_err(NetworkError::Radio)?;
                continue;
            }

            let read_len = avail_len.min(FRAME_LEN);
            let mut buf = [0u8; FRAME_LEN];
            self.radio.read(&mut buf, read_len).map_err(NetworkError::Radio)?;

            let frame = match Frame::decode(&buf[..read_len]) {
                Ok(frame) => frame,
                Err(CodecError::TooShort) | Err(CodecError::PayloadTooLarge) => continue,
            };
            let header = frame.header;

            if !address::is_valid_address(header.to_node, self.config.multicast_enabled) {
                continue;
            }

            if header.to_node == self.identity.address {
                if header.msg_type == NETWORK_ACK {
                    trace!("network ack received from 0o{:o}", header.from_node.raw());
                    signal = NETWORK_ACK;
                    continue;
                }
                if !self.queue.enqueue(frame) {
                    warn!("receive queue full, dropping frame from 0o{:o}", header.from_node.raw());
                }
            } else if self.config.multicast_enabled && header.to_node == address::MULTICAST_ADDRESS {
                if header.id != self.last_multi_message_id {
                    if self.multicast_relay_enabled {
                        let target = address::level_to_address(self.multicast_level + 1);
                        self.route_and_send(header, frame.payload(), target, TxMode::Multicast)?;
                    }
                    self.queue.enqueue(frame);
                    self.last_multi_message_id = header.id;
                } else {
                    trace!("dropping duplicate multicast id {} from 0o{:o}", header.id, header.from_node.raw());
                }
            } else {
                debug!("relaying to 0o{:o} from 0o{:o}", header.to_node.raw(), header.from_node.raw());
                self.route_and_send(header, frame.payload(), header.to_node, TxMode::Routed)?;
            }
        }

        Ok(signal)
    }
}
