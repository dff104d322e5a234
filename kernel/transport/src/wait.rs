//! Blocking-wait plumbing shared by socket queues.
//!
//! A blocking receive carries three pieces of caller state into the queue:
//! its [`RecvFlags`], a [`Timeout`] and a [`WaitContext`]. The context
//! outlives a single call so that a receive restarted after a signal keeps
//! the deadline computed by the first attempt.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use bitflags::bitflags;
use parking_lot::Mutex;

bitflags! {
    /// Receive flags understood by the queue.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct RecvFlags: u32 {
        /// Never block; forces a zero timeout.
        const DONT_WAIT = 1 << 0;
        /// Return a copy of the head buffer and leave it queued.
        const PEEK = 1 << 1;
    }
}

// ============================================================================
// Timeout
// ============================================================================

/// Microsecond timeout value meaning "wait forever".
pub const INFINITE_TIMEOUT_US: i64 = i64::MAX;

/// How long a blocking receive may sleep.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Timeout {
    /// Do not sleep at all.
    Poll,
    /// Sleep until data, interruption or close.
    Infinite,
    /// Sleep at most this long from the first attempt.
    Relative(Duration),
    /// Sleep until this instant.
    Absolute(Instant),
}

impl Timeout {
    /// Decode a syscall timeout in microseconds.
    ///
    /// `0` (or negative) polls, [`INFINITE_TIMEOUT_US`] waits forever,
    /// anything else is relative to the call.
    pub fn from_micros(us: i64) -> Self {
        match us {
            INFINITE_TIMEOUT_US => Timeout::Infinite,
            us if us <= 0 => Timeout::Poll,
            us => Timeout::Relative(Duration::from_micros(us as u64)),
        }
    }

    pub fn is_poll(&self) -> bool {
        matches!(self, Timeout::Poll)
    }

    /// Absolute deadline for a wait starting at `now`; `None` is unbounded.
    fn deadline_from(&self, now: Instant) -> Option<Instant> {
        match *self {
            Timeout::Poll => Some(now),
            Timeout::Infinite => None,
            // Unrepresentable deadlines wait forever.
            Timeout::Relative(d) => now.checked_add(d),
            Timeout::Absolute(at) => Some(at),
        }
    }
}

// ============================================================================
// InterruptToken
// ============================================================================

type Kick = Arc<dyn Fn() + Send + Sync>;

struct InterruptShared {
    pending: AtomicBool,
    kick: Mutex<Option<Kick>>,
}

/// Signal delivery handle for one thread's blocking calls.
///
/// [`interrupt`](Self::interrupt) marks the token and wakes whatever queue
/// the owning thread is currently sleeping on.
#[derive(Clone)]
pub struct InterruptToken {
    inner: Arc<InterruptShared>,
}

impl InterruptToken {
    pub fn new() -> Self {
        InterruptToken {
            inner: Arc::new(InterruptShared {
                pending: AtomicBool::new(false),
                kick: Mutex::new(None),
            }),
        }
    }

    /// Deliver an interrupt.
    pub fn interrupt(&self) {
        self.inner.pending.store(true, Ordering::Release);
        // Clone out so the kick never runs under our own lock.
        let kick = self.inner.kick.lock().clone();
        if let Some(kick) = kick {
            kick();
        }
    }

    pub fn is_interrupted(&self) -> bool {
        self.inner.pending.load(Ordering::Acquire)
    }

    /// Acknowledge a delivered interrupt.
    pub fn clear(&self) {
        self.inner.pending.store(false, Ordering::Release);
    }

    /// Install the wake-up routine for the duration of one sleep.
    ///
    /// Must be called without holding the lock the kick acquires.
    pub(crate) fn arm(&self, kick: Kick) -> ArmedInterrupt<'_> {
        *self.inner.kick.lock() = Some(kick);
        ArmedInterrupt { token: self }
    }
}

impl Default for InterruptToken {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Debug for InterruptToken {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("InterruptToken")
            .field("pending", &self.is_interrupted())
            .finish()
    }
}

/// Removes the installed kick on drop.
pub(crate) struct ArmedInterrupt<'a> {
    token: &'a InterruptToken,
}

impl Drop for ArmedInterrupt<'_> {
    fn drop(&mut self) {
        *self.token.inner.kick.lock() = None;
    }
}

// ============================================================================
// WaitContext
// ============================================================================

/// Per-call state threaded through a blocking receive.
///
/// The first attempt converts its [`Timeout`] into an absolute deadline and
/// stores it here. If the call ends with [`NetError::Interrupted`] the
/// deadline is kept, and a restarted call reuses it instead of starting a
/// fresh timeout. Any other outcome forgets it.
///
/// [`NetError::Interrupted`]: crate::error::NetError::Interrupted
#[derive(Debug, Default)]
pub struct WaitContext {
    deadline: Option<Instant>,
    restarting: bool,
    interrupt: InterruptToken,
}

impl WaitContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Context whose sleeps can be broken by `token`.
    pub fn with_interrupt(token: InterruptToken) -> Self {
        WaitContext {
            deadline: None,
            restarting: false,
            interrupt: token,
        }
    }

    pub fn interrupt_token(&self) -> &InterruptToken {
        &self.interrupt
    }

    /// Deadline stored by an interrupted attempt, if any.
    pub fn stored_deadline(&self) -> Option<Instant> {
        self.restarting.then_some(self.deadline).flatten()
    }

    /// Resolve the deadline for this attempt.
    pub(crate) fn begin(&mut self, timeout: Timeout) -> Option<Instant> {
        if !self.restarting {
            self.deadline = timeout.deadline_from(Instant::now());
        }
        self.restarting = false;
        self.deadline
    }

    /// Record how the attempt ended. An interrupted attempt consumes the
    /// pending interrupt so the restarted call can sleep again.
    pub(crate) fn finish(&mut self, interrupted: bool) {
        self.restarting = interrupted;
        if interrupted {
            self.interrupt.clear();
        } else {
            self.deadline = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn test_timeout_decoding() {
        assert_eq!(Timeout::from_micros(0), Timeout::Poll);
        assert_eq!(Timeout::from_micros(-5), Timeout::Poll);
        assert_eq!(Timeout::from_micros(INFINITE_TIMEOUT_US), Timeout::Infinite);
        assert_eq!(
            Timeout::from_micros(1500),
            Timeout::Relative(Duration::from_micros(1500))
        );
    }

    #[test]
    fn test_restarted_call_reuses_deadline() {
        let mut ctx = WaitContext::new();
        let first = ctx.begin(Timeout::Relative(Duration::from_secs(5)));
        ctx.finish(true);
        assert_eq!(ctx.stored_deadline(), first);

        std::thread::sleep(Duration::from_millis(2));
        let second = ctx.begin(Timeout::Relative(Duration::from_secs(5)));
        assert_eq!(first, second);

        ctx.finish(false);
        assert!(ctx.stored_deadline().is_none());
        let third = ctx.begin(Timeout::Relative(Duration::from_secs(5)));
        assert!(third > first);
    }

    #[test]
    fn test_interrupted_finish_consumes_interrupt() {
        let token = InterruptToken::new();
        let mut ctx = WaitContext::with_interrupt(token.clone());
        ctx.begin(Timeout::Infinite);
        token.interrupt();
        ctx.finish(true);
        assert!(!token.is_interrupted());

        // A completed attempt leaves a late interrupt for the next call.
        ctx.begin(Timeout::Infinite);
        token.interrupt();
        ctx.finish(false);
        assert!(token.is_interrupted());
    }

    #[test]
    fn test_interrupt_runs_armed_kick_once() {
        let token = InterruptToken::new();
        let hits = Arc::new(AtomicUsize::new(0));
        {
            let hits = hits.clone();
            let _armed = token.arm(Arc::new(move || {
                hits.fetch_add(1, Ordering::SeqCst);
            }));
            token.interrupt();
        }
        // Disarmed: only the flag changes.
        token.interrupt();
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert!(token.is_interrupted());
        token.clear();
        assert!(!token.is_interrupted());
    }
}
