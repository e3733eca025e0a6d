// Error taxonomy for the simulation link.
//
// Nothing here is fatal to the process: every variant degrades to
// "operation did not complete", and the next command re-attempts connection
// and initialization from scratch.

use thiserror::Error;

/// Result type alias using [`LinkError`].
pub type Result<T> = std::result::Result<T, LinkError>;

/// Failure modes of the simulation link.
#[derive(Debug, Error)]
pub enum LinkError {
    /// Socket connect/write/read failure. Recoverable: the next command
    /// reconnects.
    #[error("connection failed: {0}")]
    Connection(String),

    /// A frame failed to serialize or parse as valid JSON. Recoverable:
    /// skipped and retried within the read-attempt bound.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// The server answered `ok == false`. Surfaced to the caller; session
    /// state is left unchanged.
    #[error("server error: {0}")]
    Server(String),

    /// No genuine result arrived within the read-attempt bound. The
    /// connection is left open — the cause may be a slow server, not a
    /// dead one.
    #[error("no valid response to '{action}' after {attempts} read attempts")]
    ExhaustedRetries { action: &'static str, attempts: u32 },
}
