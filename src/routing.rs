//! Routing engine: a pure function mapping a final destination and send
//! mode to the next physical hop, pipe, and whether per-hop ACK should be
//! disabled. Used by both the send pipeline and the receive pipeline.

use crate::address::{NodeAddress, NodeIdentity};
use crate::packet::TxMode;

/// Outcome of routing a logical destination: where to physically send the
/// frame next, which pipe to send it on, and whether the radio should
/// suppress its per-hop auto-ACK for this transmission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RouteDecision {
    pub next_hop: NodeAddress,
    pub pipe: u8,
    pub multicast: bool,
}

/// Decides the next hop for `to_node` given the local node's identity and
/// the requested send `mode`.
///
/// First match wins:
/// 1. Explicit addressing (`mode` beyond `Routed`): send directly to
///    `to_node`, disabling the per-hop ACK. `Multicast` additionally forces
///    pipe 0; `ToPhysical`/`ToLogical` use `parent_pipe % 5`.
/// 2. `to_node` is a direct child: send to it on pipe 5.
/// 3. `to_node` is a more distant descendant: send to the intervening
///    direct child on pipe 5, which will relay further.
/// 4. Otherwise: ascend to the parent on `parent_pipe % 5`.
pub fn logical_to_physical(identity: &NodeIdentity, to_node: NodeAddress, mode: TxMode) -> RouteDecision {
    if mode > TxMode::Routed {
        let pipe = if mode == TxMode::Multicast {
            0
        } else {
            identity.parent_pipe % 5
        };
        return RouteDecision {
            next_hop: to_node,
            pipe,
            multicast: true,
        };
    }

    if identity.is_direct_child(to_node) {
        return RouteDecision {
            next_hop: to_node,
            pipe: 5,
            multicast: false,
        };
    }

    if identity.is_descendant(to_node) {
        return RouteDecision {
            next_hop: identity.direct_child_route_to(to_node),
            pipe: 5,
            multicast: false,
        };
    }

    RouteDecision {
        next_hop: identity.parent_node,
        pipe: identity.parent_pipe % 5,
        multicast: false,
    }
}

#[cfg(test)]
mod test {
    use super::*;

    // Chain topology from spec scenarios S3/S4: 0 — 0o1 — 0o11.

    #[test]
    fn ascend_when_neither_child_nor_self() {
        // Node 0o11 sending to 0o1: not a descendant of 0o11, so ascend.
        let id = NodeIdentity::new(NodeAddress(0o11));
        let route = logical_to_physical(&id, NodeAddress(0o1), TxMode::Normal);
        assert_eq!(route.next_hop, NodeAddress(0o1));
        assert_eq!(route.pipe, id.parent_pipe % 5);
        assert!(!route.multicast);
    }

    #[test]
    fn descend_through_intervening_child() {
        // Root sending to 0o11: 0o11 is a descendant but not a direct child
        // of root, so route via the direct child 0o1.
        let id = NodeIdentity::new(NodeAddress(0));
        let route = logical_to_physical(&id, NodeAddress(0o11), TxMode::Normal);
        assert_eq!(route.next_hop, NodeAddress(0o1));
        assert_eq!(route.pipe, 5);
        assert!(!route.multicast);
    }

    #[test]
    fn direct_child_routes_on_pipe_five() {
        let id = NodeIdentity::new(NodeAddress(0o1));
        let route = logical_to_physical(&id, NodeAddress(0o11), TxMode::Normal);
        assert_eq!(route.next_hop, NodeAddress(0o11));
        assert_eq!(route.pipe, 5);
    }

    #[test]
    fn explicit_multicast_forces_pipe_zero() {
        let id = NodeIdentity::new(NodeAddress(0o11));
        let route = logical_to_physical(&id, NodeAddress(0o10), TxMode::Multicast);
        assert_eq!(route.next_hop, NodeAddress(0o10));
        assert_eq!(route.pipe, 0);
        assert!(route.multicast);
    }

    #[test]
    fn explicit_logical_uses_parent_pipe() {
        let id = NodeIdentity::new(NodeAddress(0o11));
        let route = logical_to_physical(&id, NodeAddress(0o21), TxMode::ToLogical);
        assert_eq!(route.next_hop, NodeAddress(0o21));
        assert_eq!(route.pipe, id.parent_pipe % 5);
        assert!(route.multicast);
    }
}
