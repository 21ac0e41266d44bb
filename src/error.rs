//! Crate-wide error taxonomy.
//!
//! Mirrors the failure categories in the error handling design: transport
//! failures and temporal rejections are logged and swallowed at the call
//! site rather than propagated as `CoreError` (see `net::dispatch` and
//! `player::position`), so `CoreError` itself is reserved for failures a
//! caller needs to *act* on — malformed configuration, a full resource, or a
//! contract violation it chose not to tolerate silently.

use thiserror::Error;

/// Errors surfaced by the simulation core.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A packet was too short, had an unknown type, or had a payload length
    /// inconsistent with its type.
    #[error("malformed packet (type {packet_type:#04x}): {reason}")]
    MalformedPacket {
        /// The packet type byte, if one could be read.
        packet_type: u8,
        /// Why the payload was rejected.
        reason: String,
    },

    /// A fixed-capacity resource (weapon slots, chat ring, player roster) had
    /// no room left.
    #[error("{resource} exhausted (capacity {capacity})")]
    ResourceExhausted {
        /// Name of the exhausted resource.
        resource: &'static str,
        /// Its fixed capacity.
        capacity: usize,
    },

    /// A caller-side contract was violated (e.g. an out-of-range player id).
    #[error("contract violation: {0}")]
    ContractViolation(String),

    /// The configuration file could not be loaded or parsed.
    #[error("failed to load config {path}: {reason}")]
    ConfigLoad {
        /// Path that was attempted.
        path: String,
        /// Parse or I/O failure description.
        reason: String,
    },

    /// The tile map failed to load. This is the one condition treated as
    /// fatal at connect time — the bot cannot simulate anything without a
    /// map.
    #[error("failed to load map: {0}")]
    MapLoad(String),

    /// The security-solver helper service is unreachable or returned a
    /// malformed response.
    #[error("security solver unavailable: {0}")]
    SecuritySolverUnavailable(String),

    /// Wraps a lower-level I/O failure (e.g. the security solver's TCP
    /// client or config file reads).
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
