//! Frame codec: packs/unpacks the 8-byte header and 0..24-byte payload
//! into the fixed-size frame format carried over the air and through the
//! receive queue.

use byteorder::{ByteOrder, LittleEndian};

use crate::address::NodeAddress;

/// Maximum application payload carried by a single frame.
pub const MAX_PAYLOAD: usize = 24;

/// Wire size of the header.
pub const HEADER_LEN: usize = 8;

/// Total frame stride used for receive-queue arithmetic (header + the full
/// payload area, regardless of how much of it a given frame actually uses).
pub const FRAME_LEN: usize = HEADER_LEN + MAX_PAYLOAD;

/// Reserved header `type` value meaning "end-to-end acknowledgement of a
/// routed frame". Disjoint from application message types, which should
/// stay in `0..NETWORK_ACK`.
pub const NETWORK_ACK: u8 = 0xFE;

/// Send mode passed to the routing engine; a local decision, never
/// serialized onto the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum TxMode {
    /// Ordinary send: route toward `to_node` by tree position.
    Normal = 0,
    /// A send being relayed on behalf of another node; the final hop emits
    /// a `NETWORK_ACK` back to the original sender.
    Routed = 1,
    /// Force next hop to a specific physical address equal to `to_node`.
    ToPhysical = 2,
    /// Force next hop to a specific logical address different from `to_node`.
    ToLogical = 3,
    /// Level-scoped multicast.
    Multicast = 4,
}

/// Errors from decoding a raw buffer into a `Header`/`Frame`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodecError {
    /// Fewer than `HEADER_LEN` bytes were supplied.
    TooShort,
    /// More payload bytes were supplied than `MAX_PAYLOAD` allows.
    PayloadTooLarge,
}

/// The 8-byte frame header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub from_node: NodeAddress,
    pub to_node: NodeAddress,
    pub id: u16,
    pub msg_type: u8,
    pub reserved: u8,
}

impl Header {
    pub fn encode(&self, buf: &mut [u8]) {
        LittleEndian::write_u16(&mut buf[0..2], self.from_node.raw());
        LittleEndian::write_u16(&mut buf[2..4], self.to_node.raw());
        LittleEndian::write_u16(&mut buf[4..6], self.id);
        buf[6] = self.msg_type;
        buf[7] = self.reserved;
    }

    pub fn decode(buf: &[u8]) -> Result<Self, CodecError> {
        if buf.len() < HEADER_LEN {
            return Err(CodecError::TooShort);
        }
        Ok(Header {
            from_node: NodeAddress(LittleEndian::read_u16(&buf[0..2])),
            to_node: NodeAddress(LittleEndian::read_u16(&buf[2..4])),
            id: LittleEndian::read_u16(&buf[4..6]),
            msg_type: buf[6],
            reserved: buf[7],
        })
    }
}

/// A header plus its owned payload, sized for the fixed frame stride.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frame {
    pub header: Header,
    payload: [u8; MAX_PAYLOAD],
    payload_len: usize,
}

impl Frame {
    pub fn new(header: Header, payload: &[u8]) -> Result<Self, CodecError> {
        if payload.len() > MAX_PAYLOAD {
            return Err(CodecError::PayloadTooLarge);
        }
        let mut buf = [0u8; MAX_PAYLOAD];
        buf[..payload.len()].copy_from_slice(payload);
        Ok(Frame {
            header,
            payload: buf,
            payload_len: payload.len(),
        })
    }

    /// Convenience constructor for header-only frames (e.g. `NETWORK_ACK`).
    pub fn header_only(header: Header) -> Self {
        Frame {
            header,
            payload: [0u8; MAX_PAYLOAD],
            payload_len: 0,
        }
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload[..self.payload_len]
    }

    /// Encodes into `buf`, returning the number of bytes written
    /// (`HEADER_LEN + payload_len`, never the full stride).
    pub fn encode(&self, buf: &mut [u8]) -> usize {
        self.header.encode(&mut buf[..HEADER_LEN]);
        let end = HEADER_LEN + self.payload_len;
        buf[HEADER_LEN..end].copy_from_slice(self.payload());
        end
    }

    /// Decodes a frame from a buffer containing at least a header; any
    /// remaining bytes beyond `MAX_PAYLOAD` are an error, not a truncation,
    /// since the radio never delivers more than its hardware payload.
    pub fn decode(buf: &[u8]) -> Result<Self, CodecError> {
        let header = Header::decode(buf)?;
        let payload = &buf[HEADER_LEN..];
        Frame::new(header, payload)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn sample_header() -> Header {
        Header {
            from_node: NodeAddress(0o11),
            to_node: NodeAddress(0o1),
            id: 42,
            msg_type: 7,
            reserved: 0,
        }
    }

    #[test]
    fn round_trips_with_payload() {
        let header = sample_header();
        let payload = [1u8, 2, 3, 4, 5];
        let frame = Frame::new(header, &payload).unwrap();

        let mut buf = [0u8; FRAME_LEN];
        let n = frame.encode(&mut buf);
        assert_eq!(n, HEADER_LEN + payload.len());

        let decoded = Frame::decode(&buf[..n]).unwrap();
        assert_eq!(decoded.header, header);
        assert_eq!(decoded.payload(), &payload[..]);
    }

    #[test]
    fn round_trips_header_only() {
        let header = sample_header();
        let frame = Frame::header_only(header);

        let mut buf = [0u8; FRAME_LEN];
        let n = frame.encode(&mut buf);
        assert_eq!(n, HEADER_LEN);

        let decoded = Frame::decode(&buf[..n]).unwrap();
        assert_eq!(decoded.header, header);
        assert_eq!(decoded.payload(), &[] as &[u8]);
    }

    #[test]
    fn rejects_short_buffers() {
        let buf = [0u8; 4];
        assert_eq!(Frame::decode(&buf), Err(CodecError::TooShort));
    }

    #[test]
    fn rejects_oversized_payload() {
        let header = sample_header();
        let payload = [0u8; MAX_PAYLOAD + 1];
        assert_eq!(Frame::new(header, &payload), Err(CodecError::PayloadTooLarge));
    }

    #[test]
    fn tx_mode_ordering_matches_routing_thresholds() {
        assert!(TxMode::Normal < TxMode::Routed);
        assert!(TxMode::Routed < TxMode::ToPhysical);
        assert!(TxMode::ToPhysical < TxMode::ToLogical);
        assert!(TxMode::ToLogical < TxMode::Multicast);
    }
}
