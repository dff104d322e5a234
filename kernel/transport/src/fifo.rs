//! Byte-budgeted socket buffer queues.
//!
//! A [`BufferQueue`] sits between the receive path, which must never
//! block, and a reader that may sleep in `recv()`. The queue accounts every
//! queued byte against `max_bytes` and refuses deliveries that would exceed
//! it, so a slow reader can only ever pin a bounded amount of memory.
//!
//! # Wake policy
//!
//! - `enqueue` wakes at most one sleeping reader.
//! - A peek that finds data passes the wake on to the next sleeper, since
//!   nothing was consumed.
//! - `wake_all` and `close` release every sleeper.

use std::collections::VecDeque;
use std::sync::{Arc, Weak};
use std::time::Instant;

use log::{debug, trace};
use parking_lot::{Condvar, Mutex, MutexGuard};

use crate::buffer::NetBuffer;
use crate::error::{NetError, NetResult};
use crate::wait::{RecvFlags, Timeout, WaitContext};

/// Readable-data notification hook, usually the socket's select/poll glue.
///
/// Invoked after a successful enqueue, outside the queue lock, with the
/// number of bytes now queued.
pub trait ReadNotifier: Send + Sync {
    fn notify_readable(&self, queued_bytes: usize);
}

impl<F> ReadNotifier for F
where
    F: Fn(usize) + Send + Sync,
{
    fn notify_readable(&self, queued_bytes: usize) {
        self(queued_bytes)
    }
}

/// Outcome of [`BufferQueue::enqueue_cloned`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// A copy was queued.
    Queued,
    /// The filter declined the buffer; nothing was queued or charged.
    Filtered,
}

/// Point-in-time queue counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FifoStats {
    pub buffers: usize,
    pub bytes: usize,
    pub max_bytes: usize,
    pub waiting: usize,
    /// Deliveries refused for lack of budget.
    pub dropped: u64,
}

// ============================================================================
// Internal state
// ============================================================================

struct FifoState {
    buffers: VecDeque<NetBuffer>,
    current_bytes: usize,
    /// 0 means unbounded.
    max_bytes: usize,
    waiting: usize,
    closed: bool,
    dropped: u64,
}

impl FifoState {
    fn fits(&self, len: usize) -> bool {
        self.max_bytes == 0
            || self
                .current_bytes
                .checked_add(len)
                .is_some_and(|total| total <= self.max_bytes)
    }

    fn take_head(&mut self, peek: bool) -> Option<NetBuffer> {
        if peek {
            return self.buffers.front().cloned();
        }
        let buf = self.buffers.pop_front()?;
        self.current_bytes -= buf.len();
        Some(buf)
    }
}

struct FifoShared {
    state: Mutex<FifoState>,
    readable: Condvar,
}

impl FifoShared {
    fn wake_all(&self) {
        let _state = self.state.lock();
        self.readable.notify_all();
    }
}

// ============================================================================
// BufferQueue
// ============================================================================

/// FIFO of [`NetBuffer`]s with a byte budget and blocking dequeue.
pub struct BufferQueue {
    shared: Arc<FifoShared>,
    notifier: Option<Arc<dyn ReadNotifier>>,
}

impl BufferQueue {
    /// Create a queue holding at most `max_bytes` (0 = unbounded).
    pub fn new(max_bytes: usize) -> Self {
        BufferQueue {
            shared: Arc::new(FifoShared {
                state: Mutex::new(FifoState {
                    buffers: VecDeque::new(),
                    current_bytes: 0,
                    max_bytes,
                    waiting: 0,
                    closed: false,
                    dropped: 0,
                }),
                readable: Condvar::new(),
            }),
            notifier: None,
        }
    }

    /// Attach a readable-data hook.
    pub fn with_notifier(mut self, notifier: Arc<dyn ReadNotifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    /// Append `buf` to the tail.
    ///
    /// # Errors
    ///
    /// * `OutOfBuffers` - the buffer would push the queue past `max_bytes`
    /// * `OutOfMemory` - the queue could not grow
    /// * `Closed` - the queue was closed
    ///
    /// On error the queue is unchanged.
    pub fn enqueue(&self, buf: NetBuffer) -> NetResult<()> {
        let queued = {
            let mut state = self.shared.state.lock();
            Self::push_locked(&mut state, buf)?;
            if state.waiting > 0 {
                self.shared.readable.notify_one();
            }
            state.current_bytes
        };

        if let Some(notifier) = &self.notifier {
            notifier.notify_readable(queued);
        }
        Ok(())
    }

    /// Queue a copy of `buf`, leaving the caller's buffer untouched.
    ///
    /// `filter` sees the buffer first and may decline delivery, e.g. a
    /// broadcast for a socket that has not opted in. A declined buffer is
    /// not charged against the budget.
    pub fn enqueue_cloned<F>(&self, buf: &NetBuffer, filter: F) -> NetResult<Delivery>
    where
        F: FnOnce(&NetBuffer) -> bool,
    {
        if !filter(buf) {
            trace!("fifo: filtered {} byte buffer", buf.len());
            return Ok(Delivery::Filtered);
        }
        // A failed enqueue drops the clone.
        self.enqueue(buf.clone())?;
        Ok(Delivery::Queued)
    }

    /// Non-blocking dequeue.
    ///
    /// With `peek` set, a copy of the head is returned and the queue is left
    /// as it was.
    pub fn dequeue(&self, peek: bool) -> Option<NetBuffer> {
        let mut state = self.shared.state.lock();
        let buf = state.take_head(peek)?;
        if peek && state.waiting > 0 {
            self.shared.readable.notify_one();
        }
        Some(buf)
    }

    /// Dequeue, sleeping while the queue is empty.
    ///
    /// Each round with an empty queue runs, in order:
    /// 1. `probe`, with the queue unlocked; its error ends the wait (for
    ///    example `ConnectionReset` once the connection dies)
    /// 2. `WouldBlock` if this is a poll (`DONT_WAIT` or a zero timeout)
    /// 3. `Interrupted` if the context's interrupt token fired
    /// 4. `TimedOut` once the deadline has passed
    /// 5. sleep until woken or the deadline
    ///
    /// A closed queue is drained first and then yields `Closed`.
    pub fn blocking_dequeue<P>(
        &self,
        flags: RecvFlags,
        timeout: Timeout,
        ctx: &mut WaitContext,
        mut probe: P,
    ) -> NetResult<NetBuffer>
    where
        P: FnMut() -> NetResult<()>,
    {
        let timeout = if flags.contains(RecvFlags::DONT_WAIT) {
            Timeout::Poll
        } else {
            timeout
        };
        let peek = flags.contains(RecvFlags::PEEK);
        let deadline = ctx.begin(timeout);

        let result = self.wait_for_head(peek, timeout.is_poll(), deadline, ctx, &mut probe);
        ctx.finish(matches!(result, Err(NetError::Interrupted)));
        result
    }

    fn wait_for_head(
        &self,
        peek: bool,
        poll: bool,
        deadline: Option<Instant>,
        ctx: &WaitContext,
        probe: &mut dyn FnMut() -> NetResult<()>,
    ) -> NetResult<NetBuffer> {
        let interrupt = ctx.interrupt_token();
        let weak: Weak<FifoShared> = Arc::downgrade(&self.shared);
        let _armed = interrupt.arm(Arc::new(move || {
            if let Some(shared) = weak.upgrade() {
                shared.wake_all();
            }
        }));

        let mut state = self.shared.state.lock();
        loop {
            if let Some(buf) = state.take_head(peek) {
                if peek && state.waiting > 0 {
                    self.shared.readable.notify_one();
                }
                return Ok(buf);
            }
            if state.closed {
                return Err(NetError::Closed);
            }

            MutexGuard::unlocked(&mut state, &mut *probe)?;
            if !state.buffers.is_empty() {
                continue;
            }

            if poll {
                return Err(NetError::WouldBlock);
            }
            if interrupt.is_interrupted() {
                return Err(NetError::Interrupted);
            }
            if deadline.is_some_and(|at| Instant::now() >= at) {
                return Err(NetError::TimedOut);
            }

            state.waiting += 1;
            match deadline {
                Some(at) => {
                    self.shared.readable.wait_until(&mut state, at);
                }
                None => self.shared.readable.wait(&mut state),
            }
            state.waiting -= 1;
        }
    }

    /// Drop every queued buffer.
    pub fn clear(&self) {
        let released = {
            let mut state = self.shared.state.lock();
            state.current_bytes = 0;
            core::mem::take(&mut state.buffers)
        };
        if !released.is_empty() {
            debug!("fifo: cleared {} buffers", released.len());
        }
    }

    /// Release every sleeping reader so it re-runs its status probe.
    pub fn wake_all(&self) {
        self.shared.wake_all();
    }

    /// Stop accepting data and wake every reader.
    ///
    /// Queued data stays readable; once drained, readers get `Closed`.
    pub fn close(&self) {
        let mut state = self.shared.state.lock();
        state.closed = true;
        self.shared.readable.notify_all();
    }

    pub fn is_closed(&self) -> bool {
        self.shared.state.lock().closed
    }

    /// Change the byte budget. Already queued data is kept even if it now
    /// exceeds the new limit.
    pub fn set_max_bytes(&self, max_bytes: usize) {
        self.shared.state.lock().max_bytes = max_bytes;
    }

    pub fn max_bytes(&self) -> usize {
        self.shared.state.lock().max_bytes
    }

    pub fn current_bytes(&self) -> usize {
        self.shared.state.lock().current_bytes
    }

    /// Number of queued buffers.
    pub fn len(&self) -> usize {
        self.shared.state.lock().buffers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shared.state.lock().buffers.is_empty()
    }

    pub fn stats(&self) -> FifoStats {
        let state = self.shared.state.lock();
        FifoStats {
            buffers: state.buffers.len(),
            bytes: state.current_bytes,
            max_bytes: state.max_bytes,
            waiting: state.waiting,
            dropped: state.dropped,
        }
    }

    fn push_locked(state: &mut FifoState, buf: NetBuffer) -> NetResult<()> {
        if state.closed {
            return Err(NetError::Closed);
        }
        if !state.fits(buf.len()) {
            state.dropped += 1;
            trace!(
                "fifo: {} byte buffer over budget ({}/{})",
                buf.len(),
                state.current_bytes,
                state.max_bytes
            );
            return Err(NetError::OutOfBuffers);
        }
        state.buffers.try_reserve(1)?;
        state.current_bytes += buf.len();
        state.buffers.push_back(buf);
        Ok(())
    }
}

impl core::fmt::Debug for BufferQueue {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("BufferQueue")
            .field("stats", &self.stats())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::BufferFlags;
    use crate::wait::InterruptToken;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;
    use std::time::Duration;

    fn buf(len: usize, fill: u8) -> NetBuffer {
        NetBuffer::from(vec![fill; len])
    }

    fn no_probe() -> NetResult<()> {
        Ok(())
    }

    #[test]
    fn test_budget_rejects_without_mutation() {
        let fifo = BufferQueue::new(250);
        assert!(fifo.enqueue(buf(100, 1)).is_ok());
        assert!(fifo.enqueue(buf(100, 2)).is_ok());
        assert_eq!(fifo.enqueue(buf(100, 3)), Err(NetError::OutOfBuffers));

        let stats = fifo.stats();
        assert_eq!(stats.bytes, 200);
        assert_eq!(stats.buffers, 2);
        assert_eq!(stats.dropped, 1);
        assert_eq!(fifo.dequeue(false).map(|b| b.data()[0]), Some(1));
        assert_eq!(fifo.dequeue(false).map(|b| b.data()[0]), Some(2));
        assert!(fifo.dequeue(false).is_none());
        assert_eq!(fifo.current_bytes(), 0);
    }

    #[test]
    fn test_unbounded_when_max_is_zero() {
        let fifo = BufferQueue::new(0);
        for i in 0..64 {
            assert!(fifo.enqueue(buf(4096, i)).is_ok());
        }
        assert_eq!(fifo.current_bytes(), 64 * 4096);
    }

    #[test]
    fn test_peek_leaves_queue_untouched() {
        let fifo = BufferQueue::new(0);
        fifo.enqueue(buf(10, 1)).unwrap();
        fifo.enqueue(buf(20, 2)).unwrap();

        let peeked = fifo.dequeue(true).unwrap();
        assert_eq!(peeked.len(), 10);
        assert_eq!(fifo.current_bytes(), 30);
        assert_eq!(fifo.len(), 2);

        let head = fifo.dequeue(false).unwrap();
        assert_eq!(head, peeked);
        assert_eq!(fifo.current_bytes(), 20);
    }

    #[test]
    fn test_size_matches_contents_under_random_ops() {
        use rand::{Rng, SeedableRng};
        use rand_chacha::ChaCha8Rng;

        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let fifo = BufferQueue::new(1000);
        let mut model: VecDeque<usize> = VecDeque::new();

        for _ in 0..2000 {
            if rng.random_bool(0.6) {
                let len = rng.random_range(1..200);
                let fits = model.iter().sum::<usize>() + len <= 1000;
                assert_eq!(fifo.enqueue(buf(len, 0)).is_ok(), fits);
                if fits {
                    model.push_back(len);
                }
            } else {
                let peek = rng.random_bool(0.3);
                let got = fifo.dequeue(peek).map(|b| b.len());
                let expected = if peek {
                    model.front().copied()
                } else {
                    model.pop_front()
                };
                assert_eq!(got, expected);
            }
            assert_eq!(fifo.current_bytes(), model.iter().sum::<usize>());
            assert!(fifo.current_bytes() <= 1000);
        }
    }

    #[test]
    fn test_enqueue_cloned_filter() {
        let fifo = BufferQueue::new(0);
        let bcast = NetBuffer::with_flags(vec![0u8; 8], BufferFlags::BROADCAST);

        let declined = fifo.enqueue_cloned(&bcast, |b| !b.flags().contains(BufferFlags::BROADCAST));
        assert_eq!(declined, Ok(Delivery::Filtered));
        assert!(fifo.is_empty());

        assert_eq!(fifo.enqueue_cloned(&bcast, |_| true), Ok(Delivery::Queued));
        assert_eq!(fifo.current_bytes(), 8);
        // Original still usable by the producer.
        assert_eq!(bcast.len(), 8);
    }

    #[test]
    fn test_notifier_sees_queued_bytes() {
        let seen = Arc::new(AtomicUsize::new(0));
        let hook = seen.clone();
        let fifo = BufferQueue::new(0).with_notifier(Arc::new(move |bytes: usize| {
            hook.store(bytes, Ordering::SeqCst);
        }));
        fifo.enqueue(buf(5, 0)).unwrap();
        fifo.enqueue(buf(7, 0)).unwrap();
        assert_eq!(seen.load(Ordering::SeqCst), 12);
    }

    #[test]
    fn test_dont_wait_returns_would_block() {
        let fifo = BufferQueue::new(0);
        let mut ctx = WaitContext::new();
        let res = fifo.blocking_dequeue(RecvFlags::DONT_WAIT, Timeout::Infinite, &mut ctx, no_probe);
        assert_eq!(res, Err(NetError::WouldBlock));
        let res = fifo.blocking_dequeue(RecvFlags::empty(), Timeout::Poll, &mut ctx, no_probe);
        assert_eq!(res, Err(NetError::WouldBlock));
    }

    #[test]
    fn test_timeout_not_early() {
        let fifo = BufferQueue::new(0);
        let mut ctx = WaitContext::new();
        let wait = Duration::from_millis(50);
        let start = Instant::now();
        let res = fifo.blocking_dequeue(RecvFlags::empty(), Timeout::Relative(wait), &mut ctx, no_probe);
        let elapsed = start.elapsed();
        assert_eq!(res, Err(NetError::TimedOut));
        assert!(elapsed >= wait);
        assert!(elapsed < wait + Duration::from_secs(2));
    }

    #[test]
    fn test_probe_aborts_wait() {
        let fifo = BufferQueue::new(0);
        let mut ctx = WaitContext::new();
        let res = fifo.blocking_dequeue(RecvFlags::empty(), Timeout::Infinite, &mut ctx, || {
            Err(NetError::ConnectionReset)
        });
        assert_eq!(res, Err(NetError::ConnectionReset));
    }

    #[test]
    fn test_blocked_reader_gets_data() {
        let fifo = Arc::new(BufferQueue::new(0));
        let reader = {
            let fifo = fifo.clone();
            thread::spawn(move || {
                let mut ctx = WaitContext::new();
                fifo.blocking_dequeue(RecvFlags::empty(), Timeout::Infinite, &mut ctx, no_probe)
            })
        };
        while fifo.stats().waiting == 0 {
            thread::yield_now();
        }
        fifo.enqueue(buf(3, 9)).unwrap();
        let got = reader.join().unwrap().unwrap();
        assert_eq!(got.data(), &[9, 9, 9]);
        assert_eq!(fifo.current_bytes(), 0);
    }

    #[test]
    fn test_each_consumer_gets_one_buffer_in_order() {
        const N: usize = 8;
        let fifo = Arc::new(BufferQueue::new(0));

        let consumers: Vec<_> = (0..N)
            .map(|_| {
                let fifo = fifo.clone();
                thread::spawn(move || {
                    let mut ctx = WaitContext::new();
                    fifo.blocking_dequeue(RecvFlags::empty(), Timeout::Infinite, &mut ctx, no_probe)
                        .map(|b| b.data()[0])
                })
            })
            .collect();

        while fifo.stats().waiting < N {
            thread::yield_now();
        }
        for i in 0..N {
            fifo.enqueue(buf(1, i as u8)).unwrap();
        }

        let mut received: Vec<u8> = consumers
            .into_iter()
            .map(|c| c.join().unwrap().unwrap())
            .collect();
        received.sort_unstable();
        assert_eq!(received, (0..N as u8).collect::<Vec<_>>());
        assert!(fifo.is_empty());
    }

    #[test]
    fn test_interrupt_wakes_reader_and_keeps_deadline() {
        let fifo = Arc::new(BufferQueue::new(0));
        let token = InterruptToken::new();
        let reader = {
            let fifo = fifo.clone();
            let token = token.clone();
            thread::spawn(move || {
                let mut ctx = WaitContext::with_interrupt(token);
                let res = fifo.blocking_dequeue(
                    RecvFlags::empty(),
                    Timeout::Relative(Duration::from_secs(30)),
                    &mut ctx,
                    no_probe,
                );
                (res, ctx.stored_deadline())
            })
        };
        while fifo.stats().waiting == 0 {
            thread::yield_now();
        }
        token.interrupt();
        let (res, deadline) = reader.join().unwrap();
        assert_eq!(res, Err(NetError::Interrupted));
        assert!(deadline.is_some());
    }

    #[test]
    fn test_restart_after_interrupt_sleeps_to_original_deadline() {
        let fifo = Arc::new(BufferQueue::new(0));
        let token = InterruptToken::new();
        let interrupter = {
            let fifo = fifo.clone();
            let token = token.clone();
            thread::spawn(move || {
                while fifo.stats().waiting == 0 {
                    thread::yield_now();
                }
                token.interrupt();
            })
        };

        let mut ctx = WaitContext::with_interrupt(token);
        let start = Instant::now();
        let first = fifo.blocking_dequeue(
            RecvFlags::empty(),
            Timeout::Relative(Duration::from_millis(200)),
            &mut ctx,
            no_probe,
        );
        interrupter.join().unwrap();
        assert_eq!(first, Err(NetError::Interrupted));

        // The restarted call sleeps again and keeps the first deadline.
        let second = fifo.blocking_dequeue(
            RecvFlags::empty(),
            Timeout::Relative(Duration::from_secs(5)),
            &mut ctx,
            no_probe,
        );
        assert_eq!(second, Err(NetError::TimedOut));
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(200));
        assert!(elapsed < Duration::from_secs(2));
    }

    #[test]
    fn test_peeking_reader_passes_wakeup_on() {
        let fifo = Arc::new(BufferQueue::new(0));
        let peeker = {
            let fifo = fifo.clone();
            thread::spawn(move || {
                let mut ctx = WaitContext::new();
                fifo.blocking_dequeue(RecvFlags::PEEK, Timeout::Infinite, &mut ctx, no_probe)
                    .map(|b| b.data()[0])
            })
        };
        while fifo.stats().waiting < 1 {
            thread::yield_now();
        }
        let consumer = {
            let fifo = fifo.clone();
            thread::spawn(move || {
                let mut ctx = WaitContext::new();
                fifo.blocking_dequeue(RecvFlags::empty(), Timeout::Infinite, &mut ctx, no_probe)
                    .map(|b| b.data()[0])
            })
        };
        while fifo.stats().waiting < 2 {
            thread::yield_now();
        }

        fifo.enqueue(buf(1, 7)).unwrap();
        assert_eq!(peeker.join().unwrap(), Ok(7));
        assert_eq!(consumer.join().unwrap(), Ok(7));
        assert!(fifo.is_empty());
    }

    #[test]
    fn test_enqueue_wakes_one_reader() {
        let fifo = Arc::new(BufferQueue::new(0));
        let rounds = Arc::new(AtomicUsize::new(0));
        let readers: Vec<_> = (0..3)
            .map(|_| {
                let fifo = fifo.clone();
                let rounds = rounds.clone();
                thread::spawn(move || {
                    let mut ctx = WaitContext::new();
                    fifo.blocking_dequeue(RecvFlags::empty(), Timeout::Infinite, &mut ctx, || {
                        rounds.fetch_add(1, Ordering::SeqCst);
                        Ok(())
                    })
                })
            })
            .collect();
        while fifo.stats().waiting < 3 {
            thread::yield_now();
        }
        let before = rounds.load(Ordering::SeqCst);

        fifo.enqueue(buf(1, 1)).unwrap();
        while fifo.stats().waiting > 2 || !fifo.is_empty() {
            thread::yield_now();
        }
        thread::sleep(Duration::from_millis(50));
        // The woken reader found data without another round; nobody else ran.
        assert_eq!(rounds.load(Ordering::SeqCst), before);
        assert_eq!(fifo.stats().waiting, 2);

        fifo.close();
        let results: Vec<_> = readers.into_iter().map(|r| r.join().unwrap()).collect();
        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        assert_eq!(
            results.iter().filter(|r| **r == Err(NetError::Closed)).count(),
            2
        );
    }

    #[test]
    fn test_close_drains_then_fails() {
        let fifo = BufferQueue::new(0);
        fifo.enqueue(buf(1, 1)).unwrap();
        fifo.close();
        assert_eq!(fifo.enqueue(buf(1, 2)), Err(NetError::Closed));

        let mut ctx = WaitContext::new();
        let first = fifo.blocking_dequeue(RecvFlags::empty(), Timeout::Infinite, &mut ctx, no_probe);
        assert!(first.is_ok());
        let second = fifo.blocking_dequeue(RecvFlags::empty(), Timeout::Infinite, &mut ctx, no_probe);
        assert_eq!(second, Err(NetError::Closed));
    }

    #[test]
    fn test_wake_all_reruns_probe() {
        let fifo = Arc::new(BufferQueue::new(0));
        let torn_down = Arc::new(std::sync::atomic::AtomicBool::new(false));
        let readers: Vec<_> = (0..3)
            .map(|_| {
                let fifo = fifo.clone();
                let torn_down = torn_down.clone();
                thread::spawn(move || {
                    let mut ctx = WaitContext::new();
                    fifo.blocking_dequeue(RecvFlags::empty(), Timeout::Infinite, &mut ctx, || {
                        if torn_down.load(Ordering::SeqCst) {
                            Err(NetError::ConnectionReset)
                        } else {
                            Ok(())
                        }
                    })
                })
            })
            .collect();
        while fifo.stats().waiting < 3 {
            thread::yield_now();
        }
        torn_down.store(true, Ordering::SeqCst);
        fifo.wake_all();
        for r in readers {
            assert_eq!(r.join().unwrap(), Err(NetError::ConnectionReset));
        }
    }

    #[test]
    fn test_clear_resets_size() {
        let fifo = BufferQueue::new(0);
        fifo.enqueue(buf(10, 0)).unwrap();
        fifo.enqueue(buf(10, 0)).unwrap();
        fifo.clear();
        assert_eq!(fifo.current_bytes(), 0);
        assert!(fifo.is_empty());
    }
}
