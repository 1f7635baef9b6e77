use std::time::Instant;

use crate::address::Address;

/// Per-observed-source bookkeeping at the receiving end (spec §3:
/// `SourceRecord`). Created on the first packet seen from a given source.
pub struct SourceRecord {
    pub address: Address,
    pub last_ack_time: Instant,
    pub bytes_received_since_last_ack: u64,
}
