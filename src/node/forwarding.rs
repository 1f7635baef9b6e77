use std::collections::VecDeque;
use std::time::Instant;

use crate::address::Address;
use crate::packet::{AckPayload, PacketRecord};

/// The chosen relay toward a destination, plus the metric that won it the
/// slot (spec §3: `NextHop`).
#[derive(Debug, Clone)]
pub struct NextHop {
    pub address: Address,
    pub packet_success: f64,
    pub time_switched: Instant,
}

/// Per-destination routing state (spec §3: `ForwardingEntry`).
///
/// Created on the first acceptable OGM for a destination and never deleted
/// (spec §3, "Lifecycles"). Mutated only by the OGM engine and by the
/// router's `packets_sent` appends (spec §4.3); read by the router and the
/// ack engine.
pub struct ForwardingEntry {
    pub destination: Address,
    pub next_hop: NextHop,
    pub ogm_sequence: u64,
    pub packets_sent: VecDeque<PacketRecord>,
    pub acks_received: VecDeque<AckPayload>,
}

/// Acks are kept only for introspection/tests; `sum_bytes` always recomputes
/// straight from `packets_sent`, so bounding this list cannot affect
/// correctness (spec leaves no retention requirement on `acks_received`).
const MAX_RETAINED_ACKS: usize = 32;

impl ForwardingEntry {
    pub fn new(destination: Address, next_hop: NextHop, ogm_sequence: u64) -> Self {
        Self {
            destination,
            next_hop,
            ogm_sequence,
            packets_sent: VecDeque::new(),
            acks_received: VecDeque::new(),
        }
    }

    /// Σ `pr.bytes` for packets sent strictly inside `(start, end)` (spec
    /// §4.5 step 3). Bounds are exclusive, matching
    /// `original_source/node.go`'s `PacketRecords.SumBytes`
    /// (`pr.Time.After(start) && pr.Time.Before(end)`).
    pub fn sum_bytes(&self, start: Instant, end: Instant) -> u64 {
        self.packets_sent
            .iter()
            .filter(|pr| pr.time > start && pr.time < end)
            .map(|pr| pr.bytes)
            .sum()
    }

    pub fn record_ack(&mut self, ack: AckPayload) {
        self.acks_received.push_back(ack);
        while self.acks_received.len() > MAX_RETAINED_ACKS {
            self.acks_received.pop_front();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn record(bytes: u64, time: Instant, addr: &str) -> PacketRecord {
        PacketRecord {
            bytes,
            time,
            source: addr.into(),
            destination: addr.into(),
        }
    }

    #[test]
    fn sum_bytes_is_strictly_exclusive_of_window_edges() {
        let mut entry = ForwardingEntry::new(
            "dest".into(),
            NextHop {
                address: "next".into(),
                packet_success: 1.0,
                time_switched: Instant::now(),
            },
            1,
        );

        let t0 = Instant::now();
        let start = t0 + Duration::from_millis(10);
        let mid = t0 + Duration::from_millis(20);
        let end = t0 + Duration::from_millis(30);

        entry.packets_sent.push_back(record(100, start, "s")); // exactly at boundary: excluded
        entry.packets_sent.push_back(record(200, mid, "s")); // inside: included
        entry.packets_sent.push_back(record(300, end, "s")); // exactly at boundary: excluded

        assert_eq!(entry.sum_bytes(start, end), 200);
    }

    #[test]
    fn acks_received_is_bounded() {
        let mut entry = ForwardingEntry::new(
            "dest".into(),
            NextHop {
                address: "next".into(),
                packet_success: 1.0,
                time_switched: Instant::now(),
            },
            1,
        );

        for _ in 0..(MAX_RETAINED_ACKS + 5) {
            entry.record_ack(AckPayload {
                bytes_received: 1,
                start_time: Instant::now(),
                end_time: Instant::now(),
                source: "s".into(),
                destination: "dest".into(),
            });
        }

        assert_eq!(entry.acks_received.len(), MAX_RETAINED_ACKS);
    }
}
