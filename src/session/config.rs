//! Stream session configuration

use std::time::Duration;

/// Per-stream settings shared by all sessions
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Interval between keep-alive comments on an idle stream (None = off)
    pub keep_alive: Option<Duration>,

    /// Maximum time to wait for the transport to accept one frame
    pub write_timeout: Duration,

    /// Frames queued towards the response body
    pub sink_capacity: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            keep_alive: Some(Duration::from_secs(15)),
            write_timeout: Duration::from_secs(10),
            sink_capacity: 16,
        }
    }
}

impl SessionConfig {
    /// Set the keep-alive interval
    pub fn keep_alive(mut self, interval: Duration) -> Self {
        self.keep_alive = Some(interval);
        self
    }

    /// Disable keep-alive comments
    pub fn disable_keep_alive(mut self) -> Self {
        self.keep_alive = None;
        self
    }

    /// Set the write timeout
    pub fn write_timeout(mut self, timeout: Duration) -> Self {
        self.write_timeout = timeout;
        self
    }

    /// Set the sink capacity (minimum 1)
    pub fn sink_capacity(mut self, capacity: usize) -> Self {
        self.sink_capacity = capacity.max(1);
        self
    }
}
