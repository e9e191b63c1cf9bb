//! Repeating timers that drive poll ticks.
//!
//! An engine never sleeps on its own. It hands a tick closure to a [`Timer`]
//! and keeps the returned [`PollHandle`]; dropping or cancelling the handle
//! stops the ticks.
//!
//! - [`TokioTimer`] - real time, one tokio task per armed timer
//! - [`ManualTimer`] - ticks only when a test says so

use crate::error::{SyncError, SyncResult};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::time::MissedTickBehavior;

/// Work run on every tick.
pub type TickFn = Box<dyn FnMut() + Send + 'static>;

/// Something that can run a closure on a fixed cadence.
pub trait Timer: Send + Sync {
    /// Arms a repeating timer.
    ///
    /// The first tick happens one `period` after arming, never immediately.
    fn arm(&self, period: Duration, tick: TickFn) -> PollHandle;
}

/// An armed repeating timer.
///
/// Cancelling happens exactly once: explicitly through [`PollHandle::cancel`]
/// or implicitly on drop. Cancelling a handle that was never armed, or that
/// was already cancelled, does nothing.
pub struct PollHandle {
    cancel: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl PollHandle {
    /// Creates a handle that runs `cancel` when released.
    pub fn new(cancel: impl FnOnce() + Send + Sync + 'static) -> Self {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    /// Creates a handle for a timer that was never armed.
    pub fn inert() -> Self {
        Self { cancel: None }
    }

    /// Returns true while the timer is armed.
    pub fn is_armed(&self) -> bool {
        self.cancel.is_some()
    }

    /// Stops the timer.
    pub fn cancel(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl Drop for PollHandle {
    fn drop(&mut self) {
        self.cancel();
    }
}

impl fmt::Debug for PollHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PollHandle")
            .field("armed", &self.is_armed())
            .finish()
    }
}

/// A timer backed by a tokio runtime.
///
/// Each armed timer is a task looping on [`tokio::time::interval_at`].
/// Late ticks are delayed rather than bunched up.
#[derive(Debug, Clone)]
pub struct TokioTimer {
    handle: Handle,
}

impl TokioTimer {
    /// Creates a timer that spawns onto the given runtime.
    pub fn new(handle: Handle) -> Self {
        Self { handle }
    }

    /// Creates a timer on the runtime of the calling context.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::NoRuntime`] when called outside a tokio runtime.
    pub fn current() -> SyncResult<Self> {
        Handle::try_current()
            .map(Self::new)
            .map_err(|_| SyncError::NoRuntime)
    }
}

impl Timer for TokioTimer {
    fn arm(&self, period: Duration, mut tick: TickFn) -> PollHandle {
        let start = tokio::time::Instant::now() + period;
        let task = self.handle.spawn(async move {
            let mut interval = tokio::time::interval_at(start, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                tick();
            }
        });

        tracing::trace!(?period, "poll timer armed");
        let abort = task.abort_handle();
        PollHandle::new(move || {
            abort.abort();
            tracing::trace!("poll timer cancelled");
        })
    }
}

struct ManualEntry {
    period: Duration,
    elapsed: Duration,
    tick: Option<TickFn>,
}

#[derive(Default)]
struct ManualTimers {
    next_id: u64,
    entries: BTreeMap<u64, ManualEntry>,
}

/// A timer driven by hand, for deterministic tests.
///
/// Nothing happens until [`ManualTimer::fire`] or [`ManualTimer::advance`]
/// is called. Clones share the same set of armed timers.
///
/// # Example
///
/// ```rust
/// use kvsync_engine::{ManualTimer, Timer};
/// use std::sync::atomic::{AtomicUsize, Ordering};
/// use std::sync::Arc;
/// use std::time::Duration;
///
/// let timer = ManualTimer::new();
/// let count = Arc::new(AtomicUsize::new(0));
/// let seen = Arc::clone(&count);
/// let handle = timer.arm(Duration::from_millis(100), Box::new(move || {
///     seen.fetch_add(1, Ordering::SeqCst);
/// }));
///
/// timer.advance(Duration::from_millis(250));
/// assert_eq!(count.load(Ordering::SeqCst), 2);
///
/// drop(handle);
/// assert_eq!(timer.armed(), 0);
/// ```
#[derive(Clone, Default)]
pub struct ManualTimer {
    timers: Arc<Mutex<ManualTimers>>,
}

impl ManualTimer {
    /// Creates a timer with nothing armed.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of armed timers.
    pub fn armed(&self) -> usize {
        self.timers.lock().entries.len()
    }

    /// Returns the period of every armed timer, in arming order.
    pub fn periods(&self) -> Vec<Duration> {
        self.timers
            .lock()
            .entries
            .values()
            .map(|entry| entry.period)
            .collect()
    }

    /// Runs every armed timer once, regardless of its period.
    ///
    /// Returns the number of ticks run.
    pub fn fire(&self) -> usize {
        self.ids()
            .into_iter()
            .filter(|id| self.run(*id))
            .count()
    }

    /// Moves time forward, running each armed timer once per period that
    /// elapsed for it.
    ///
    /// Returns the number of ticks run.
    pub fn advance(&self, by: Duration) -> usize {
        let mut ran = 0;
        for id in self.ids() {
            let due = {
                let mut timers = self.timers.lock();
                let Some(entry) = timers.entries.get_mut(&id) else {
                    continue;
                };
                entry.elapsed += by;
                let period = entry.period.as_nanos().max(1);
                let due = entry.elapsed.as_nanos() / period;
                let rest = entry.elapsed.as_nanos() % period;
                entry.elapsed = Duration::from_nanos(rest as u64);
                due
            };

            for _ in 0..due {
                if !self.run(id) {
                    break;
                }
                ran += 1;
            }
        }
        ran
    }

    fn ids(&self) -> Vec<u64> {
        self.timers.lock().entries.keys().copied().collect()
    }

    /// Runs one tick of timer `id` without holding the lock, so the tick may
    /// cancel timers. Returns false if the timer is gone.
    fn run(&self, id: u64) -> bool {
        let tick = self
            .timers
            .lock()
            .entries
            .get_mut(&id)
            .and_then(|entry| entry.tick.take());
        let Some(mut tick) = tick else {
            return false;
        };

        tick();

        if let Some(entry) = self.timers.lock().entries.get_mut(&id) {
            entry.tick = Some(tick);
        }
        true
    }
}

impl Timer for ManualTimer {
    fn arm(&self, period: Duration, tick: TickFn) -> PollHandle {
        let id = {
            let mut timers = self.timers.lock();
            let id = timers.next_id;
            timers.next_id += 1;
            timers.entries.insert(
                id,
                ManualEntry {
                    period,
                    elapsed: Duration::ZERO,
                    tick: Some(tick),
                },
            );
            id
        };

        let timers = Arc::clone(&self.timers);
        PollHandle::new(move || {
            timers.lock().entries.remove(&id);
        })
    }
}

impl fmt::Debug for ManualTimer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ManualTimer")
            .field("armed", &self.armed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counter() -> (Arc<AtomicUsize>, TickFn) {
        let count = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&count);
        let tick: TickFn = Box::new(move || {
            seen.fetch_add(1, Ordering::SeqCst);
        });
        (count, tick)
    }

    #[test]
    fn inert_handle_cancel_is_noop() {
        let mut handle = PollHandle::inert();
        assert!(!handle.is_armed());
        handle.cancel();
        handle.cancel();
    }

    #[test]
    fn handle_cancels_exactly_once() {
        let cancels = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&cancels);
        let mut handle = PollHandle::new(move || {
            seen.fetch_add(1, Ordering::SeqCst);
        });

        assert!(handle.is_armed());
        handle.cancel();
        handle.cancel();
        drop(handle);
        assert_eq!(cancels.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn manual_fire_runs_each_timer() {
        let timer = ManualTimer::new();
        let (a, tick_a) = counter();
        let (b, tick_b) = counter();
        let _ha = timer.arm(Duration::from_millis(10), tick_a);
        let _hb = timer.arm(Duration::from_secs(60), tick_b);

        assert_eq!(timer.fire(), 2);
        assert_eq!(a.load(Ordering::SeqCst), 1);
        assert_eq!(b.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn manual_advance_respects_period() {
        let timer = ManualTimer::new();
        let (count, tick) = counter();
        let _handle = timer.arm(Duration::from_millis(50), tick);

        assert_eq!(timer.advance(Duration::from_millis(49)), 0);
        assert_eq!(timer.advance(Duration::from_millis(1)), 1);
        assert_eq!(timer.advance(Duration::from_millis(120)), 2);
        assert_eq!(count.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn manual_cancel_stops_ticks() {
        let timer = ManualTimer::new();
        let (count, tick) = counter();
        let mut handle = timer.arm(Duration::from_millis(10), tick);
        assert_eq!(timer.armed(), 1);
        assert_eq!(timer.periods(), vec![Duration::from_millis(10)]);

        handle.cancel();
        assert_eq!(timer.armed(), 0);
        assert_eq!(timer.advance(Duration::from_secs(1)), 0);
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn tokio_timer_requires_runtime() {
        assert!(matches!(TokioTimer::current(), Err(SyncError::NoRuntime)));
    }

    #[tokio::test(start_paused = true)]
    async fn tokio_timer_ticks_on_period() {
        let timer = TokioTimer::current().unwrap();
        let (count, tick) = counter();
        let mut handle = timer.arm(Duration::from_millis(100), tick);

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_millis(260)).await;
        assert_eq!(count.load(Ordering::SeqCst), 3);

        handle.cancel();
        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(count.load(Ordering::SeqCst), 3);
    }
}
