use std::fmt;
use std::sync::Arc;

/// Opaque node identifier (spec §3: "Address. Opaque identifier (string-like)").
///
/// Backed by `Arc<str>` rather than `String` so that cloning an address —
/// which happens on essentially every packet, forwarding-table lookup, and
/// log line — is a refcount bump instead of a heap copy.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Address(Arc<str>);

impl Address {
    pub fn new(s: impl Into<Arc<str>>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Address {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for Address {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
