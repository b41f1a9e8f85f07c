//! TCP test probes
//!
//! Minimal client and single-peer server for poking at network stacks on
//! the bench. Raw bytes only, no framing.

mod client;
mod server;

pub use client::{run_client, ClientConfig, ClientReport, DEFAULT_MESSAGE};
pub use server::{ProbeServer, ServerConfig, ServerMode, SessionReport};

use thiserror::Error;

/// Receive buffer size used by both probes
pub const DEFAULT_BUFFER_SIZE: usize = 1024;

/// Probe error types
#[derive(Error, Debug)]
pub enum ProbeError {
    /// Connect failed
    #[error("Connection to {addr} failed: {source}")]
    ConnectionFailed {
        /// Target address
        addr: String,
        /// Underlying socket error
        source: std::io::Error,
    },

    /// Bind failed
    #[error("Unable to listen on {addr}: {source}")]
    BindFailed {
        /// Listen address
        addr: String,
        /// Underlying socket error
        source: std::io::Error,
    },

    /// Connect timed out
    #[error("Connection timeout after {0} seconds")]
    Timeout(u64),

    /// No reply arrived in time
    #[error("No reply within {0} seconds")]
    ReplyTimeout(u64),

    /// Interrupted before a peer connected
    #[error("Interrupted")]
    Interrupted,

    /// I/O error on an established connection
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
