//! Per-send delivery guarantees.

use std::fmt;

/// Guarantee requested from the transport for a single outbound message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DeliveryMode {
    /// Fire and forget: may be lost, duplicated or reordered
    Unreliable,
    /// Retransmitted until acknowledged, delivered in arrival order
    ReliableUnordered,
    /// Retransmitted until acknowledged, delivered in send order
    #[default]
    ReliableOrdered,
}

impl DeliveryMode {
    /// Returns `true` for modes that retransmit until acknowledged.
    pub fn is_reliable(self) -> bool {
        !matches!(self, DeliveryMode::Unreliable)
    }
}

impl fmt::Display for DeliveryMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DeliveryMode::Unreliable => "unreliable",
            DeliveryMode::ReliableUnordered => "reliable-unordered",
            DeliveryMode::ReliableOrdered => "reliable-ordered",
        };
        f.write_str(name)
    }
}
