//! The ack feedback engine (spec §4.5, C5): reconciling an end-to-end ack
//! against the path it traveled and degrading the next-hop metric when the
//! observed delivery ratio falls short of what the OGM engine promised.

use tracing::debug;

use crate::error::RouterError;
use crate::packet::AckPayload;

use super::Node;

impl Node {
    /// Invoked at every hop an ack passes through, not only at its final
    /// destination — see `DESIGN.md` for why spec §4.5's "forwarding of
    /// third-party acks" is read this way.
    ///
    /// Looks up this node's own forwarding entry for `ack.destination`
    /// (the node that *received* the data and emitted this ack — the same
    /// destination a forward-path data packet addressed to it would
    /// consult), guards against an ack describing traffic sent before the
    /// most recent next-hop switch, and degrades `next_hop.packet_success`
    /// when the path clearly underperformed it.
    pub(super) fn handle_ack(&mut self, ack: &AckPayload) -> Result<(), RouterError> {
        let entry = self
            .forwarding_table
            .get_mut(&ack.destination)
            .ok_or_else(|| RouterError::NoRoute(ack.destination.clone()))?;

        if entry.next_hop.time_switched > ack.start_time {
            // The path this ack describes predates our current next hop;
            // not safe to blame the current one for it (spec §4.5, "stale
            // ack guard").
            return Err(RouterError::StaleAck(ack.destination.clone()));
        }

        let bytes_sent = entry.sum_bytes(ack.start_time, ack.end_time);
        if bytes_sent == 0 {
            return Err(RouterError::StaleAck(ack.destination.clone()));
        }

        let path_success = (ack.bytes_received as f64 / bytes_sent as f64).min(1.0);

        if entry.next_hop.packet_success - path_success > self.config.ack_degrade_threshold {
            debug!(
                node = %self.address,
                destination = %ack.destination,
                old = entry.next_hop.packet_success,
                new = path_success,
                "degrading next-hop packet_success from ack feedback"
            );
            entry.next_hop.packet_success = path_success.max(self.config.packet_success_floor);
        }

        entry.record_ack(ack.clone());
        Ok(())
    }
}
