//! The OGM protocol engine (spec §4.4, C4): origination, per-hop metric
//! adjustment, forwarding-table maintenance, and unconditional rebroadcast.

use std::time::Instant;

use tracing::{debug, warn};

use crate::error::RouterError;
use crate::packet::{OgmPayload, Packet, Payload};

use super::forwarding::{ForwardingEntry, NextHop};
use super::Node;

impl Node {
    /// `originate()` (spec §4.4): a fresh, maximal-quality OGM for self,
    /// flooded to every neighbor.
    pub(super) fn originate_ogm(&mut self) {
        self.ogm_sequence_counter += 1;
        let ogm = OgmPayload {
            sequence: self.ogm_sequence_counter,
            destination_address: self.address.clone(),
            sender_address: self.address.clone(),
            packet_success: 1.0,
            timestamp: Instant::now(),
        };
        debug!(node = %self.address, seq = ogm.sequence, "originating OGM");
        self.broadcast_ogm(ogm);
    }

    /// `handle_ogm(ogm)` (spec §4.4): adjust, maintain, rebroadcast.
    pub(super) fn handle_ogm(&mut self, ogm: OgmPayload) {
        if ogm.destination_address == self.address {
            // An OGM about ourselves has looped back; silent discard (spec
            // §4.4, loop prevention).
            return;
        }

        let adjusted = match self.adjust_ogm(ogm) {
            Ok(ogm) => ogm,
            Err(RouterError::NotANeighbor(sender)) => {
                warn!(node = %self.address, %sender, "OGM from non-neighbor sender, dropping");
                return;
            }
            Err(other) => {
                warn!(node = %self.address, error = %other, "OGM rejected");
                return;
            }
        };

        match self.update_forwarding_table(&adjusted) {
            Ok(switched) => {
                debug!(
                    node = %self.address,
                    destination = %adjusted.destination_address,
                    seq = adjusted.sequence,
                    packet_success = adjusted.packet_success,
                    switched,
                    "OGM accepted"
                );
                self.broadcast_ogm(adjusted);
            }
            Err(RouterError::StaleSequence(_)) => {
                // Ordinary and frequent under flooding; not worth logging.
            }
            Err(other) => {
                warn!(node = %self.address, error = %other, "OGM rejected");
            }
        }
    }

    /// §4.4 step "Adjust": `packet_success *= neighbor.packet_success * HOP_MULTIPLIER`,
    /// clamped into `(packet_success_floor, 1.0]` so a long path never
    /// rounds down to exactly zero (see `SPEC_FULL.md`).
    fn adjust_ogm(&self, mut ogm: OgmPayload) -> Result<OgmPayload, RouterError> {
        let neighbor = self
            .neighbors
            .get(&ogm.sender_address)
            .ok_or_else(|| RouterError::NotANeighbor(ogm.sender_address.clone()))?;

        let adjusted = ogm.packet_success * neighbor.packet_success * self.config.hop_multiplier;
        ogm.packet_success = adjusted.max(self.config.packet_success_floor).min(1.0);
        Ok(ogm)
    }

    /// §4.4 step "Update forwarding table": create on first sight; on a
    /// repeat destination, reject non-increasing sequence numbers, then
    /// switch the next hop only on a strictly better metric.
    fn update_forwarding_table(&mut self, ogm: &OgmPayload) -> Result<bool, RouterError> {
        let now = Instant::now();

        match self.forwarding_table.get_mut(&ogm.destination_address) {
            None => {
                let entry = ForwardingEntry::new(
                    ogm.destination_address.clone(),
                    NextHop {
                        address: ogm.sender_address.clone(),
                        packet_success: ogm.packet_success,
                        time_switched: now,
                    },
                    ogm.sequence,
                );
                self.forwarding_table.insert(ogm.destination_address.clone(), entry);
                Ok(true)
            }
            Some(entry) => {
                if ogm.sequence <= entry.ogm_sequence {
                    return Err(RouterError::StaleSequence(ogm.destination_address.clone()));
                }
                entry.ogm_sequence = ogm.sequence;

                let mut switched = false;
                if ogm.packet_success > entry.next_hop.packet_success {
                    entry.next_hop.packet_success = ogm.packet_success;
                    if entry.next_hop.address != ogm.sender_address {
                        entry.next_hop.address = ogm.sender_address.clone();
                        entry.next_hop.time_switched = now;
                        switched = true;
                    }
                }
                Ok(switched)
            }
        }
    }

    /// §4.4 step "Rebroadcast": unconditional flood to every neighbor,
    /// including the one the OGM arrived from — matching
    /// `original_source/routing.go`'s `RebroadcastOGM`, which applies no
    /// split-horizon suppression.
    fn broadcast_ogm(&mut self, mut ogm: OgmPayload) {
        ogm.sender_address = self.address.clone();
        let neighbors: Vec<_> = self.neighbors.values().cloned().collect();
        for neighbor in neighbors {
            neighbor.edge.send(Packet {
                source: self.address.clone(),
                destination: neighbor.address.clone(),
                payload: Payload::Ogm(ogm.clone()),
            });
        }
    }
}
