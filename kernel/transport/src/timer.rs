//! Shared deadline timers for protocol state machines.
//!
//! One [`TimerEngine`] serves every socket: retransmission, keep-alive and
//! connection timeouts all arm a [`Timer`] here instead of owning a thread.
//! Armed timers sit in a list sorted by due time. A single service thread
//! sleeps until the earliest due time, pops expired timers and runs their
//! callbacks with the engine lock released, so a callback may arm or
//! cancel any timer, itself included.
//!
//! # Timer states
//!
//! ```text
//! Inactive --set_timer--> Armed --due--> (callback runs) --> Inactive
//!               ^            |
//!               +--cancel----+
//! ```
//!
//! A callback that is already running cannot be recalled; `cancel_timer`
//! only removes a timer that is still waiting. Callbacks must tolerate
//! firing right as their owner cancels them.

use core::fmt;
use core::ops::Deref;
use std::collections::VecDeque;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};
use std::thread::{self, JoinHandle, ThreadId};
use std::time::{Duration, Instant};

use log::{debug, error, warn};
use parking_lot::{Condvar, Mutex, MutexGuard};

use crate::config::TIMER_THREAD_NAME;
use crate::error::{NetError, NetResult};

/// Callback run on the service thread when a timer expires.
pub type TimerCallback = Box<dyn Fn(&Timer) + Send + Sync>;

// ============================================================================
// Timer
// ============================================================================

struct TimerShared {
    id: u64,
    callback: TimerCallback,
    /// Written only under the engine lock.
    armed: AtomicBool,
    /// Written only under the engine lock.
    running: AtomicBool,
}

/// A timer record created by [`TimerHandle::init_timer`].
///
/// Clones refer to the same timer. Dropping every clone held by the caller
/// does not cancel an armed timer; the engine keeps it alive until it fires
/// or is canceled.
#[derive(Clone)]
pub struct Timer {
    inner: Arc<TimerShared>,
}

impl Timer {
    pub fn id(&self) -> u64 {
        self.inner.id
    }

    fn fire(&self) {
        (self.inner.callback)(self)
    }
}

impl PartialEq for Timer {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for Timer {}

impl fmt::Debug for Timer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Timer")
            .field("id", &self.inner.id)
            .field("armed", &self.inner.armed.load(Ordering::Relaxed))
            .field("running", &self.inner.running.load(Ordering::Relaxed))
            .finish()
    }
}

// ============================================================================
// Engine state
// ============================================================================

struct ArmedTimer {
    due: Instant,
    timer: Timer,
}

struct EngineState {
    /// Sorted by `due`; equal due times keep arming order.
    armed: VecDeque<ArmedTimer>,
    shutdown: bool,
}

impl EngineState {
    fn unlink(&mut self, timer: &Timer) -> Option<usize> {
        let pos = self.armed.iter().position(|a| a.timer == *timer)?;
        self.armed.remove(pos);
        timer.inner.armed.store(false, Ordering::Release);
        Some(pos)
    }
}

struct EngineShared {
    state: Mutex<EngineState>,
    /// Signals the service thread that the earliest due time changed.
    changed: Condvar,
    /// Signals `wait_for_timer` callers that a callback returned.
    idle: Condvar,
    next_id: AtomicU64,
    service_thread: OnceLock<ThreadId>,
}

// ============================================================================
// TimerHandle
// ============================================================================

/// Cloneable access to a running engine.
///
/// Callbacks that need to re-arm timers capture one of these.
#[derive(Clone)]
pub struct TimerHandle {
    shared: Arc<EngineShared>,
}

impl TimerHandle {
    /// Create an inactive timer that runs `callback` when it expires.
    pub fn init_timer<F>(&self, callback: F) -> Timer
    where
        F: Fn(&Timer) + Send + Sync + 'static,
    {
        Timer {
            inner: Arc::new(TimerShared {
                id: self.shared.next_id.fetch_add(1, Ordering::Relaxed),
                callback: Box::new(callback),
                armed: AtomicBool::new(false),
                running: AtomicBool::new(false),
            }),
        }
    }

    /// Arm `timer` to fire after `delay`, or cancel it when `delay` is
    /// `None`.
    ///
    /// Callers must cancel an armed timer before setting it again. Doing so
    /// anyway is logged and handled as cancel-then-set.
    ///
    /// # Errors
    ///
    /// * `Shutdown` - the engine has stopped
    /// * `InvalidArgument` - `delay` is too large to represent as a deadline
    /// * `OutOfMemory` - the armed list could not grow
    pub fn set_timer(&self, timer: &Timer, delay: Option<Duration>) -> NetResult<()> {
        let Some(delay) = delay else {
            self.cancel_timer(timer);
            return Ok(());
        };
        let due = Instant::now()
            .checked_add(delay)
            .ok_or(NetError::InvalidArgument)?;

        let mut state = self.shared.state.lock();
        if state.shutdown {
            warn!("timer {}: set after engine shutdown", timer.id());
            return Err(NetError::Shutdown);
        }
        state.armed.try_reserve(1)?;
        if timer.inner.armed.load(Ordering::Acquire) {
            warn!("timer {}: set while armed, canceling first", timer.id());
            state.unlink(timer);
        }

        let pos = state.armed.partition_point(|a| a.due <= due);
        state.armed.insert(
            pos,
            ArmedTimer {
                due,
                timer: timer.clone(),
            },
        );
        timer.inner.armed.store(true, Ordering::Release);
        if pos == 0 {
            self.shared.changed.notify_one();
        }
        debug!("timer {}: armed for {:?}", timer.id(), delay);
        Ok(())
    }

    /// Disarm `timer`. Returns whether it was armed.
    ///
    /// A callback already in flight keeps running.
    pub fn cancel_timer(&self, timer: &Timer) -> bool {
        let mut state = self.shared.state.lock();
        match state.unlink(timer) {
            Some(0) => {
                self.shared.changed.notify_one();
                true
            }
            Some(_) => true,
            None => false,
        }
    }

    /// Whether `timer` is waiting to fire.
    pub fn is_active(&self, timer: &Timer) -> bool {
        timer.inner.armed.load(Ordering::Acquire)
    }

    /// Whether `timer`'s callback is executing right now.
    pub fn is_running(&self, timer: &Timer) -> bool {
        timer.inner.running.load(Ordering::Acquire)
    }

    /// Block until `timer`'s callback is not executing.
    ///
    /// Returns immediately on the service thread, where waiting on the
    /// current callback would deadlock.
    pub fn wait_for_timer(&self, timer: &Timer) {
        if self.shared.service_thread.get() == Some(&thread::current().id()) {
            return;
        }
        let mut state = self.shared.state.lock();
        while timer.inner.running.load(Ordering::Acquire) {
            self.shared.idle.wait(&mut state);
        }
    }

    /// Number of armed timers.
    pub fn armed_count(&self) -> usize {
        self.shared.state.lock().armed.len()
    }

    pub fn is_shutdown(&self) -> bool {
        self.shared.state.lock().shutdown
    }
}

// ============================================================================
// TimerEngine
// ============================================================================

/// Owner of the timer service thread.
///
/// Dereferences to [`TimerHandle`] for arming and canceling. Dropping the
/// engine shuts it down.
pub struct TimerEngine {
    handle: TimerHandle,
    thread: Mutex<Option<JoinHandle<()>>>,
}

impl TimerEngine {
    /// Start an engine whose service thread is called `name`.
    pub fn start(name: &str) -> NetResult<Self> {
        let shared = Arc::new(EngineShared {
            state: Mutex::new(EngineState {
                armed: VecDeque::new(),
                shutdown: false,
            }),
            changed: Condvar::new(),
            idle: Condvar::new(),
            next_id: AtomicU64::new(1),
            service_thread: OnceLock::new(),
        });

        let service = shared.clone();
        let thread = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || run_service(service))
            .map_err(|e| {
                error!("timer: failed to spawn service thread: {}", e);
                NetError::OutOfMemory
            })?;
        debug!("timer: engine started ({})", name);

        Ok(TimerEngine {
            handle: TimerHandle { shared },
            thread: Mutex::new(Some(thread)),
        })
    }

    /// Engine with the default service thread name.
    pub fn new() -> NetResult<Self> {
        Self::start(TIMER_THREAD_NAME)
    }

    pub fn handle(&self) -> TimerHandle {
        self.handle.clone()
    }

    /// Stop the service thread and discard every armed timer.
    ///
    /// A callback in flight finishes first. Idempotent.
    pub fn shutdown(&self) {
        let discarded = {
            let mut state = self.handle.shared.state.lock();
            if state.shutdown {
                return;
            }
            state.shutdown = true;
            for entry in &state.armed {
                entry.timer.inner.armed.store(false, Ordering::Release);
            }
            self.handle.shared.changed.notify_all();
            core::mem::take(&mut state.armed)
        };
        if !discarded.is_empty() {
            debug!("timer: shutdown discarded {} armed timers", discarded.len());
        }
        // Dropped outside the lock: callbacks may own handles to this engine.
        drop(discarded);

        if let Some(thread) = self.thread.lock().take() {
            if thread.thread().id() == thread::current().id() {
                // Shut down from inside a callback; the loop exits on return.
                return;
            }
            if thread.join().is_err() {
                error!("timer: service thread panicked");
            }
        }
    }
}

impl Deref for TimerEngine {
    type Target = TimerHandle;

    fn deref(&self) -> &TimerHandle {
        &self.handle
    }
}

impl Drop for TimerEngine {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn run_service(shared: Arc<EngineShared>) {
    let _ = shared.service_thread.set(thread::current().id());
    let mut state = shared.state.lock();
    loop {
        if state.shutdown {
            break;
        }
        let Some(due) = state.armed.front().map(|a| a.due) else {
            shared.changed.wait(&mut state);
            continue;
        };
        if due > Instant::now() {
            shared.changed.wait_until(&mut state, due);
            continue;
        }

        let Some(entry) = state.armed.pop_front() else {
            continue;
        };
        let timer = entry.timer;
        timer.inner.armed.store(false, Ordering::Release);
        timer.inner.running.store(true, Ordering::Release);

        let outcome = MutexGuard::unlocked(&mut state, || {
            panic::catch_unwind(AssertUnwindSafe(|| timer.fire()))
        });
        if outcome.is_err() {
            error!("timer {}: callback panicked", timer.id());
        }

        timer.inner.running.store(false, Ordering::Release);
        shared.idle.notify_all();
    }
    debug!("timer: service thread exiting");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::sync::mpsc;

    #[test]
    fn test_zero_delay_fires_before_positive_delay() {
        let engine = TimerEngine::start("test timer").unwrap();
        let (tx, rx) = mpsc::channel();

        let late_tx = tx.clone();
        let late = engine.init_timer(move |_| late_tx.send("late").unwrap());
        let early = engine.init_timer(move |_| tx.send("early").unwrap());

        engine.set_timer(&late, Some(Duration::from_millis(30))).unwrap();
        engine.set_timer(&early, Some(Duration::ZERO)).unwrap();

        let timeout = Duration::from_secs(5);
        assert_eq!(rx.recv_timeout(timeout).unwrap(), "early");
        assert_eq!(rx.recv_timeout(timeout).unwrap(), "late");
    }

    #[test]
    fn test_canceled_timer_never_fires() {
        let engine = TimerEngine::start("test timer").unwrap();
        let fired = Arc::new(AtomicUsize::new(0));
        let counter = fired.clone();
        let timer = engine.init_timer(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        engine.set_timer(&timer, Some(Duration::from_millis(40))).unwrap();
        assert!(engine.is_active(&timer));
        assert!(engine.cancel_timer(&timer));
        assert!(!engine.is_active(&timer));
        assert!(!engine.cancel_timer(&timer));

        thread::sleep(Duration::from_millis(120));
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_none_delay_cancels() {
        let engine = TimerEngine::start("test timer").unwrap();
        let timer = engine.init_timer(|_| {});
        engine.set_timer(&timer, Some(Duration::from_secs(60))).unwrap();
        engine.set_timer(&timer, None).unwrap();
        assert!(!engine.is_active(&timer));
        assert_eq!(engine.armed_count(), 0);
    }

    #[test]
    fn test_panicking_callback_keeps_engine_alive() {
        let engine = TimerEngine::start("test timer").unwrap();
        let (tx, rx) = mpsc::channel();
        let broken = engine.init_timer(|_| panic!("callback failure"));
        let healthy = engine.init_timer(move |_| tx.send("healthy").unwrap());

        engine.set_timer(&broken, Some(Duration::ZERO)).unwrap();
        engine.set_timer(&healthy, Some(Duration::from_millis(20))).unwrap();

        assert_eq!(rx.recv_timeout(Duration::from_secs(5)).unwrap(), "healthy");
        engine.wait_for_timer(&broken);
        assert!(!engine.is_active(&broken));
        assert!(!engine.is_shutdown());
    }

    #[test]
    fn test_fires_no_earlier_than_delay() {
        let engine = TimerEngine::start("test timer").unwrap();
        let (tx, rx) = mpsc::channel();
        let timer = engine.init_timer(move |_| tx.send(Instant::now()).unwrap());

        let delay = Duration::from_millis(25);
        let start = Instant::now();
        engine.set_timer(&timer, Some(delay)).unwrap();
        let fired_at = rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert!(fired_at.duration_since(start) >= delay);
        assert!(!engine.is_active(&timer));
    }

    #[test]
    fn test_callback_rearms_itself() {
        let engine = TimerEngine::start("test timer").unwrap();
        let handle = engine.handle();
        let (tx, rx) = mpsc::channel();
        let count = Arc::new(AtomicUsize::new(0));

        let seen = count.clone();
        let timer = engine.init_timer(move |t| {
            let n = seen.fetch_add(1, Ordering::SeqCst) + 1;
            if n < 3 {
                handle.set_timer(t, Some(Duration::from_millis(1))).unwrap();
            } else {
                tx.send(n).unwrap();
            }
        });
        engine.set_timer(&timer, Some(Duration::ZERO)).unwrap();

        assert_eq!(rx.recv_timeout(Duration::from_secs(5)).unwrap(), 3);
        engine.wait_for_timer(&timer);
        assert!(!engine.is_active(&timer));
        assert!(!engine.is_running(&timer));
    }

    #[test]
    fn test_rearm_while_armed_replaces_deadline() {
        let engine = TimerEngine::start("test timer").unwrap();
        let (tx, rx) = mpsc::channel();
        let timer = engine.init_timer(move |_| tx.send(()).unwrap());

        engine.set_timer(&timer, Some(Duration::from_secs(60))).unwrap();
        engine.set_timer(&timer, Some(Duration::from_millis(1))).unwrap();
        assert_eq!(engine.armed_count(), 1);
        assert!(rx.recv_timeout(Duration::from_secs(5)).is_ok());
    }

    #[test]
    fn test_wait_for_running_callback() {
        let engine = TimerEngine::start("test timer").unwrap();
        let (started_tx, started_rx) = mpsc::channel();
        let done = Arc::new(AtomicBool::new(false));
        let flag = done.clone();
        let timer = engine.init_timer(move |_| {
            started_tx.send(()).unwrap();
            thread::sleep(Duration::from_millis(30));
            flag.store(true, Ordering::SeqCst);
        });
        engine.set_timer(&timer, Some(Duration::ZERO)).unwrap();
        started_rx.recv_timeout(Duration::from_secs(5)).unwrap();

        // Too late to cancel; wait for it instead.
        assert!(!engine.cancel_timer(&timer));
        engine.wait_for_timer(&timer);
        assert!(done.load(Ordering::SeqCst));
    }

    #[test]
    fn test_shutdown_rejects_new_timers() {
        let engine = TimerEngine::start("test timer").unwrap();
        let timer = engine.init_timer(|_| {});
        engine.set_timer(&timer, Some(Duration::from_secs(60))).unwrap();

        engine.shutdown();
        assert!(engine.is_shutdown());
        assert!(!engine.is_active(&timer));
        assert_eq!(engine.set_timer(&timer, Some(Duration::ZERO)), Err(NetError::Shutdown));
        engine.shutdown();
    }
}
