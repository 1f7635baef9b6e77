use std::time::Instant;

use crate::address::Address;

/// Discriminant for [`Payload`], used for logging and dispatch branching
/// without having to match the full payload (spec §3: `type ∈ {DATA, OGM,
/// ACK}`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacketKind {
    Data,
    Ogm,
    Ack,
}

impl std::fmt::Display for PacketKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            PacketKind::Data => "DATA",
            PacketKind::Ogm => "OGM",
            PacketKind::Ack => "ACK",
        };
        f.write_str(s)
    }
}

/// A packet's type-dependent body (spec §3: "`payload` is an opaque byte
/// sequence whose meaning depends on `type`").
///
/// Real deployments would carry this as bytes and decode on receipt (see
/// `RouterError::MalformedPayload`); since every node here lives in the same
/// process, the payload is kept as the typed value directly — there is no
/// wire to cross, and that crossing is explicitly out of scope (spec §1).
#[derive(Debug, Clone)]
pub enum Payload {
    Data(Vec<u8>),
    Ogm(OgmPayload),
    Ack(AckPayload),
}

impl Payload {
    pub fn kind(&self) -> PacketKind {
        match self {
            Payload::Data(_) => PacketKind::Data,
            Payload::Ogm(_) => PacketKind::Ogm,
            Payload::Ack(_) => PacketKind::Ack,
        }
    }

    /// Logical size in bytes, used by [`crate::edge::Edge`] for the
    /// serialization-delay computation and recorded in [`PacketRecord`].
    ///
    /// For `Data` this is the literal payload length. OGM/ACK payloads have
    /// no byte representation in this in-process core (see module doc), so
    /// their size is approximated from their field widths — a self-describing
    /// key-value wire encoding (spec §6) would land in the same ballpark.
    pub fn byte_len(&self) -> usize {
        match self {
            Payload::Data(bytes) => bytes.len(),
            Payload::Ogm(ogm) => {
                8 + ogm.destination_address.as_str().len() + ogm.sender_address.as_str().len() + 8 + 8
            }
            Payload::Ack(ack) => {
                8 + 8 + 8 + ack.source.as_str().len() + ack.destination.as_str().len()
            }
        }
    }
}

/// `{type, source, destination, payload}` (spec §3).
#[derive(Debug, Clone)]
pub struct Packet {
    pub source: Address,
    pub destination: Address,
    pub payload: Payload,
}

impl Packet {
    pub fn kind(&self) -> PacketKind {
        self.payload.kind()
    }
}

/// Originator Message payload (spec §3).
///
/// `destination_address` is the originator being advertised; `sender_address`
/// is the immediate upstream relay and is overwritten on every rebroadcast
/// (spec §4.4).
#[derive(Debug, Clone)]
pub struct OgmPayload {
    pub sequence: u64,
    pub destination_address: Address,
    pub sender_address: Address,
    pub packet_success: f64,
    pub timestamp: Instant,
}

/// End-to-end acknowledgement payload (spec §3).
///
/// `source` sent the data packets being acknowledged; `destination` received
/// them (the node that emits the ack).
#[derive(Debug, Clone)]
pub struct AckPayload {
    pub bytes_received: u64,
    pub start_time: Instant,
    pub end_time: Instant,
    pub source: Address,
    pub destination: Address,
}

/// One forwarded-or-originated packet, logged for later ack reconciliation
/// (spec §3: `packets_sent: ordered sequence of PacketRecord`).
#[derive(Debug, Clone)]
pub struct PacketRecord {
    pub bytes: u64,
    pub time: Instant,
    pub source: Address,
    pub destination: Address,
}
