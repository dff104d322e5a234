//! Transport runtime configuration.
//!
//! A single [`TransportConfig`] is handed to [`TransportStack::start`] and
//! copied into every endpoint manager, queue and timer engine it builds.
//!
//! [`TransportStack::start`]: crate::stack::TransportStack::start

use std::ops::RangeInclusive;

use crate::error::{NetError, NetResult};

// ============================================================================
// Defaults
// ============================================================================

/// Ephemeral port range start (IANA recommendation).
pub const EPHEMERAL_PORT_START: u16 = 49152;

/// Ephemeral port range end.
pub const EPHEMERAL_PORT_END: u16 = 65535;

/// Ports below this boundary require the caller to hold bind privilege.
pub const PRIVILEGED_PORT_LIMIT: u16 = 1024;

/// Default receive budget for a socket buffer queue (bytes).
pub const DEFAULT_FIFO_BYTES: usize = 64 * 1024;

/// Maximum reset replies per rate-limit window.
pub const RESET_RATE_LIMIT: u32 = 100;

/// Reset rate-limit window in milliseconds.
pub const RESET_RATE_WINDOW_MS: u64 = 1000;

/// Name given to the timer engine's service thread.
pub const TIMER_THREAD_NAME: &str = "net timer";

// ============================================================================
// TransportConfig
// ============================================================================

/// Tunables for the transport runtime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportConfig {
    /// Ports handed out for "any port" binds.
    pub ephemeral_ports: RangeInclusive<u16>,
    /// Ports below this value need bind privilege.
    pub privileged_port_limit: u16,
    /// Byte budget for queues built by [`TransportStack::new_fifo`].
    ///
    /// [`TransportStack::new_fifo`]: crate::stack::TransportStack::new_fifo
    pub default_fifo_bytes: usize,
    /// Reset replies allowed per window; 0 disables rate limiting.
    pub reset_rate_limit: u32,
    /// Length of the reset rate-limit window.
    pub reset_rate_window_ms: u64,
    /// Service thread name for the timer engine.
    pub timer_thread_name: String,
    /// Fixed seed for the ephemeral port PRNG; `None` seeds from the OS.
    pub rng_seed: Option<u64>,
}

impl Default for TransportConfig {
    fn default() -> Self {
        TransportConfig {
            ephemeral_ports: EPHEMERAL_PORT_START..=EPHEMERAL_PORT_END,
            privileged_port_limit: PRIVILEGED_PORT_LIMIT,
            default_fifo_bytes: DEFAULT_FIFO_BYTES,
            reset_rate_limit: RESET_RATE_LIMIT,
            reset_rate_window_ms: RESET_RATE_WINDOW_MS,
            timer_thread_name: TIMER_THREAD_NAME.to_string(),
            rng_seed: None,
        }
    }
}

impl TransportConfig {
    pub fn with_ephemeral_ports(mut self, ports: RangeInclusive<u16>) -> Self {
        self.ephemeral_ports = ports;
        self
    }

    pub fn with_privileged_port_limit(mut self, limit: u16) -> Self {
        self.privileged_port_limit = limit;
        self
    }

    pub fn with_default_fifo_bytes(mut self, bytes: usize) -> Self {
        self.default_fifo_bytes = bytes;
        self
    }

    pub fn with_reset_rate_limit(mut self, limit: u32, window_ms: u64) -> Self {
        self.reset_rate_limit = limit;
        self.reset_rate_window_ms = window_ms;
        self
    }

    pub fn with_timer_thread_name(mut self, name: impl Into<String>) -> Self {
        self.timer_thread_name = name.into();
        self
    }

    /// Make ephemeral port selection reproducible.
    pub fn with_rng_seed(mut self, seed: u64) -> Self {
        self.rng_seed = Some(seed);
        self
    }

    /// Check the configuration for internal consistency.
    ///
    /// The ephemeral range must be non-empty, must not contain port 0
    /// (the wildcard), and must sit entirely above the privileged limit.
    pub fn validate(&self) -> NetResult<()> {
        let (start, end) = (*self.ephemeral_ports.start(), *self.ephemeral_ports.end());
        if start > end || start == 0 {
            return Err(NetError::InvalidArgument);
        }
        if start < self.privileged_port_limit {
            return Err(NetError::InvalidArgument);
        }
        if self.reset_rate_limit > 0 && self.reset_rate_window_ms == 0 {
            return Err(NetError::InvalidArgument);
        }
        Ok(())
    }
}
