use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, trace};

use crate::packet::Packet;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EdgeState {
    Idle,
    Saturated,
}

/// A rate-limited, one-directional conduit between two nodes (spec §4.1).
///
/// At most one transmission is ever "in flight": while saturated, further
/// `send` calls are dropped rather than queued, so an overloaded link is
/// observable as packet loss feeding the ack-based quality estimator
/// (spec §4.1, "Design rationale").
pub struct Edge {
    /// Used only for logging (e.g. `"A->B"`).
    label: String,
    throughput_bps: f64,
    overhead_bits: f64,
    target: UnboundedSender<Packet>,
    state: Mutex<EdgeState>,
}

impl Edge {
    pub fn new(
        label: impl Into<String>,
        throughput_bps: f64,
        overhead_bits: f64,
        target: UnboundedSender<Packet>,
    ) -> Arc<Self> {
        Arc::new(Self {
            label: label.into(),
            throughput_bps,
            overhead_bits,
            target,
            state: Mutex::new(EdgeState::Idle),
        })
    }

    /// Attempts to transmit `packet`. Never blocks and never fails: a drop
    /// due to saturation is ordinary, counted behavior (spec §7: `edge_drop`
    /// — "counted, not raised"), not an error.
    ///
    /// The saturation flag flips to `Saturated` synchronously in this call;
    /// clearing it back to `Idle` after the computed serialization delay
    /// runs as an independent spawned task that touches only this edge's own
    /// lock (spec §5: "this task holds only the edge's own lock, never a
    /// node's state").
    pub fn send(self: &Arc<Self>, packet: Packet) {
        let bytes = packet.payload.byte_len();

        {
            let mut state = self.state.lock().expect("edge state mutex poisoned");
            if *state == EdgeState::Saturated {
                debug!(edge = %self.label, bytes, "edge_drop: saturated");
                return;
            }
            *state = EdgeState::Saturated;
        }

        let bits = bytes as f64 * 8.0 + self.overhead_bits;
        let delay = Duration::from_secs_f64(bits / self.throughput_bps);

        if self.target.send(packet).is_err() {
            trace!(edge = %self.label, "peer mailbox closed, packet dropped");
        }

        let this = Arc::clone(self);
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let mut state = this.state.lock().expect("edge state mutex poisoned");
            *state = EdgeState::Idle;
        });
    }

    pub fn is_saturated(&self) -> bool {
        *self.state.lock().expect("edge state mutex poisoned") == EdgeState::Saturated
    }
}
