use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Process-wide tunables (spec §6: "Tunables (process-wide constants)").
///
/// Every field has the spec's reference value as its `Default`. The demo
/// binary (`src/bin/mesh_demo.rs`) layers a CLI and an optional TOML file on
/// top of these defaults, the way `trix`/`styrene-rs`-style binaries in the
/// retrieval pack expose their simulation knobs.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Per-hop metric penalty applied to every OGM's `packet_success`
    /// (spec §4.4). Reference value 0.94.
    pub hop_multiplier: f64,

    /// Minimum interval between acks emitted for a given source (spec §4.5).
    /// Reference value 5s.
    #[serde(with = "duration_secs")]
    pub ack_interval: Duration,

    /// Fixed per-frame overhead added to every edge transmission before the
    /// serialization-delay computation (spec §4.1). Reference value 20 bits.
    pub frame_overhead_bits: f64,

    /// How far below the stored next-hop `packet_success` an ack's computed
    /// `path_success` must fall before the engine lowers the stored estimate
    /// (spec §4.5, δ). The spec leaves the exact value to the implementer;
    /// 0.1 matches the worked example in spec §8 (S4).
    pub ack_degrade_threshold: f64,

    /// Small floor applied to `packet_success` after each hop's multiplicative
    /// penalty, so that many hops cannot underflow the metric to exactly
    /// zero (spec §9, "Numerical care").
    pub packet_success_floor: f64,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            hop_multiplier: 0.94,
            ack_interval: Duration::from_secs(5),
            frame_overhead_bits: 20.0,
            ack_degrade_threshold: 0.1,
            packet_success_floor: 1e-6,
        }
    }
}

mod duration_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_f64(d.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(d)?;
        Ok(Duration::from_secs_f64(secs))
    }
}
