//! Simulated mesh network with proactive, OGM-flooded routing and an
//! ack-driven link-quality feedback loop.
//!
//! This crate models the core packet-forwarding logic of a B.A.T.M.A.N.-style
//! protocol without a real network transport: nodes are `tokio` tasks
//! connected by in-process [`edge::Edge`]s, and `tests/` plus the
//! `mesh_demo` binary drive them the way a harness would drive real sockets.

pub mod address;
pub mod config;
pub mod edge;
pub mod error;
pub mod neighbor;
pub mod node;
pub mod packet;

pub use address::Address;
pub use config::SimConfig;
pub use edge::Edge;
pub use error::RouterError;
pub use neighbor::Neighbor;
pub use node::{Node, NodeHandle};
pub use packet::{AckPayload, OgmPayload, Packet, PacketKind, PacketRecord, Payload};
