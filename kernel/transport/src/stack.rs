//! Transport runtime lifecycle.
//!
//! [`TransportStack`] is built once at network initialization and torn down
//! at shutdown. It owns one [`EndpointManager`] per protocol domain and the
//! shared [`TimerEngine`]; socket code receives references to it instead of
//! reaching for globals.

use log::info;

use crate::addr::{SockAddrIn, SockAddrIn6};
use crate::config::TransportConfig;
use crate::error::NetResult;
use crate::fifo::BufferQueue;
use crate::manager::EndpointManager;
use crate::timer::{TimerEngine, TimerHandle};

pub struct TransportStack {
    config: TransportConfig,
    inet: EndpointManager<SockAddrIn>,
    inet6: EndpointManager<SockAddrIn6>,
    timers: TimerEngine,
}

impl TransportStack {
    /// Validate `config` and bring the runtime up.
    ///
    /// # Errors
    ///
    /// * `InvalidArgument` - inconsistent configuration
    /// * `OutOfMemory` - the timer service thread could not be started
    pub fn start(config: TransportConfig) -> NetResult<Self> {
        config.validate()?;

        let timers = TimerEngine::start(&config.timer_thread_name)?;
        // Derive distinct streams so both domains don't pick the same ports.
        let inet_config = config.clone();
        let inet6_config = match config.rng_seed {
            Some(seed) => config.clone().with_rng_seed(seed.wrapping_add(1)),
            None => config.clone(),
        };

        let stack = TransportStack {
            inet: EndpointManager::new(&inet_config),
            inet6: EndpointManager::new(&inet6_config),
            timers,
            config,
        };
        info!(
            "transport: started, ephemeral ports {}..={}, privileged below {}",
            stack.config.ephemeral_ports.start(),
            stack.config.ephemeral_ports.end(),
            stack.config.privileged_port_limit
        );
        Ok(stack)
    }

    pub fn config(&self) -> &TransportConfig {
        &self.config
    }

    /// IPv4 endpoint manager.
    pub fn inet(&self) -> &EndpointManager<SockAddrIn> {
        &self.inet
    }

    /// IPv6 endpoint manager.
    pub fn inet6(&self) -> &EndpointManager<SockAddrIn6> {
        &self.inet6
    }

    pub fn timers(&self) -> &TimerEngine {
        &self.timers
    }

    /// Cloneable timer handle for protocol state that outlives a borrow of
    /// the stack.
    pub fn timer_handle(&self) -> TimerHandle {
        self.timers.handle()
    }

    /// Queue with the configured default byte budget.
    pub fn new_fifo(&self) -> BufferQueue {
        BufferQueue::new(self.config.default_fifo_bytes)
    }

    /// Stop the timer engine. Armed timers are discarded. Idempotent.
    pub fn shutdown(&self) {
        if self.timers.is_shutdown() {
            return;
        }
        self.timers.shutdown();
        info!("transport: shut down");
    }
}

impl Drop for TransportStack {
    fn drop(&mut self) {
        self.shutdown();
    }
}
