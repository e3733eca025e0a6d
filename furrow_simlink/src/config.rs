// Connection configuration for the simulation server link.

use std::time::Duration;

use furrow_protocol::types::DEFAULT_PORT;

/// Where the simulation server lives and how long to wait on it.
#[derive(Clone, Debug)]
pub struct LinkConfig {
    pub host: String,
    pub port: u16,
    /// Read/write timeout for command replies. `Duration::ZERO` means block
    /// indefinitely — supported for long-running external simulations.
    pub io_timeout: Duration,
    /// Bounded wait for the optional greeting line after connecting. A
    /// missing greeting is tolerated, so this stays short.
    pub greeting_timeout: Duration,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: DEFAULT_PORT,
            io_timeout: Duration::ZERO,
            greeting_timeout: Duration::from_secs(2),
        }
    }
}

impl LinkConfig {
    /// `host:port` form accepted by `TcpStream::connect`.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// The configured I/O timeout in the form `set_read_timeout` expects:
    /// zero maps to `None` (block indefinitely).
    pub fn io_timeout_opt(&self) -> Option<Duration> {
        if self.io_timeout.is_zero() {
            None
        } else {
            Some(self.io_timeout)
        }
    }
}
