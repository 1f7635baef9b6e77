use std::sync::Arc;

use crate::address::Address;
use crate::edge::Edge;

/// A directly-connected peer (spec §3: "One entry per directly-connected
/// node").
///
/// `packet_success` is the single-link loss-free-delivery estimate supplied
/// by the harness at topology-wiring time (spec §6). The core never mutates
/// it: link quality feeds into the OGM metric at every hop (spec §4.4), but
/// nothing in this simulator re-measures a raw link in isolation from the
/// path-level ack feedback that drives `ForwardingEntry::next_hop`.
#[derive(Clone)]
pub struct Neighbor {
    pub address: Address,
    pub packet_success: f64,
    pub edge: Arc<Edge>,
}
