use thiserror::Error;

use crate::address::Address;

/// Local, non-fatal error conditions raised while processing a single packet.
///
/// None of these halt a node's dispatch loop (§7): callers log the offending
/// condition at the appropriate level and drop the packet. `RouterError` only
/// exists to give the drop sites a typed reason instead of a bare `bool`.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum RouterError {
    /// An OGM/ACK payload failed to decode off a real transport.
    ///
    /// The in-process core never actually produces this: payloads here are
    /// typed Rust values, not bytes, so there is nothing to fail to parse.
    /// The variant is kept because a real deployment's wire codec sits at
    /// exactly this seam (see spec §1, out of scope: "on-wire byte format").
    #[error("malformed payload")]
    MalformedPayload,

    /// An OGM arrived whose `sender_address` is not a direct neighbor.
    #[error("OGM sender {0} is not a neighbor")]
    NotANeighbor(Address),

    /// An OGM's sequence number did not exceed the stored one for its
    /// destination; a silent, non-logged drop (§7: "no log spam").
    #[error("stale OGM sequence for {0}")]
    StaleSequence(Address),

    /// A forwarded packet has no forwarding-table entry for its destination.
    #[error("no route to {0}")]
    NoRoute(Address),

    /// An ack was discarded: either the next hop switched after the ack's
    /// window started, or the window covered zero recorded bytes.
    #[error("stale or uninformative ack for {0}")]
    StaleAck(Address),
}
