//! Error taxonomy for the overlay engine.
//!
//! Every failure path is an explicit result; nothing is retried inside the
//! engine itself. The stabilizer's next tick is the retry mechanism.

use thiserror::Error;

/// Result type for chord operations.
pub type ChordResult<T> = Result<T, ChordError>;

/// Errors surfaced by the overlay engine.
#[derive(Debug, Error)]
pub enum ChordError {
    /// No routing rule matched the target; transient during stabilization.
    #[error("no finger rule matched for {0}")]
    Routing(String),

    /// Dial or heartbeat to the chosen hop failed.
    #[error("peer {addr} unreachable: {reason}")]
    PeerUnreachable { addr: String, reason: String },

    /// The local key-value backend failed.
    #[error("store failure: {0}")]
    Store(String),

    /// Unknown purpose, malformed body, or a failed unmarshal.
    #[error("protocol violation: {0}")]
    Protocol(String),

    /// The bootstrap node rejected the join handshake.
    #[error("join via {addr} failed: {reason}")]
    Join { addr: String, reason: String },
}
