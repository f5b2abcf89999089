//! Counters kept by the dispatch loop.

use std::fmt;

/// Running totals since the server started.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchStats {
    /// Messages that reached a handler and completed without error
    pub messages_handled: u64,
    /// Messages dropped at any stage of routing
    pub messages_dropped: u64,
    pub connections_accepted: u64,
    pub connections_rejected: u64,
    pub disconnects: u64,
    pub network_errors: u64,
}

impl fmt::Display for DispatchStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "handled={} dropped={} accepted={} rejected={} disconnects={} network_errors={}",
            self.messages_handled,
            self.messages_dropped,
            self.connections_accepted,
            self.connections_rejected,
            self.disconnects,
            self.network_errors
        )
    }
}
