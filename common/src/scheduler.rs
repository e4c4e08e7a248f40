use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::task::AbortHandle;
use tokio::time::{Instant, MissedTickBehavior, interval};

pub type TickCallback = Box<dyn FnMut() + Send>;

/// Monotonic time source, measured from an arbitrary origin.
pub trait Clock: Send + Sync {
    fn now(&self) -> Duration;
}

/// Repeating timer registration. Cancelling a handle guarantees the callback
/// never runs again.
pub trait Scheduler: Send + Sync {
    fn schedule_tick(&self, interval: Duration, callback: TickCallback) -> ScheduleHandle;
}

#[derive(Clone, Debug, Default)]
pub struct ScheduleHandle {
    cancelled: Arc<AtomicBool>,
    task: Option<AbortHandle>,
}

impl ScheduleHandle {
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
        if let Some(ref task) = self.task {
            task.abort();
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Tokio time; follows the paused clock in `start_paused` tests.
pub struct TokioClock {
    origin: Instant,
}

impl TokioClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for TokioClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for TokioClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }
}

/// Runs each registration as a tokio task driven by `tokio::time::interval`.
pub struct TokioScheduler {
    runtime: Handle,
}

impl TokioScheduler {
    pub fn new(runtime: Handle) -> Self {
        Self { runtime }
    }

    /// Uses the runtime of the calling task; panics outside a tokio context.
    pub fn current() -> Self {
        Self::new(Handle::current())
    }
}

impl Scheduler for TokioScheduler {
    fn schedule_tick(&self, period: Duration, mut callback: TickCallback) -> ScheduleHandle {
        let cancelled = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&cancelled);
        let period = period.max(Duration::from_millis(1));

        let task = self.runtime.spawn(async move {
            let mut timer = interval(period);
            timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick of an interval completes immediately.
            timer.tick().await;
            loop {
                timer.tick().await;
                if flag.load(Ordering::SeqCst) {
                    break;
                }
                callback();
            }
        });

        ScheduleHandle {
            cancelled,
            task: Some(task.abort_handle()),
        }
    }
}

struct VirtualTimer {
    id: u64,
    period: Duration,
    next_due: Duration,
    callback: Option<TickCallback>,
    handle: ScheduleHandle,
}

#[derive(Default)]
struct VirtualInner {
    now: Duration,
    timers: Vec<VirtualTimer>,
}

/// Deterministic scheduler and clock for tests: time only moves on `advance`.
#[derive(Clone, Default)]
pub struct VirtualScheduler {
    inner: Arc<Mutex<VirtualInner>>,
    next_id: Arc<AtomicU64>,
}

impl VirtualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, VirtualInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn active_timers(&self) -> usize {
        let mut inner = self.lock();
        inner.timers.retain(|t| !t.handle.is_cancelled());
        inner.timers.len()
    }

    /// Moves time forward by `by`, firing due callbacks in time order.
    /// Callbacks run without the scheduler lock held, so they may read the clock.
    pub fn advance(&self, by: Duration) {
        let target = self.lock().now + by;

        loop {
            let (id, mut callback) = {
                let mut inner = self.lock();
                inner.timers.retain(|t| !t.handle.is_cancelled());

                let due = inner
                    .timers
                    .iter_mut()
                    .filter(|t| t.next_due <= target)
                    .min_by_key(|t| (t.next_due, t.id));

                let Some(timer) = due else {
                    inner.now = target;
                    return;
                };

                let fired_at = timer.next_due;
                timer.next_due += timer.period;
                let id = timer.id;
                let Some(callback) = timer.callback.take() else {
                    continue;
                };
                inner.now = fired_at;
                (id, callback)
            };

            callback();

            let mut inner = self.lock();
            if let Some(timer) = inner.timers.iter_mut().find(|t| t.id == id) {
                timer.callback = Some(callback);
            }
        }
    }
}

impl Clock for VirtualScheduler {
    fn now(&self) -> Duration {
        self.lock().now
    }
}

impl Scheduler for VirtualScheduler {
    fn schedule_tick(&self, period: Duration, callback: TickCallback) -> ScheduleHandle {
        let handle = ScheduleHandle::default();
        let period = period.max(Duration::from_millis(1));
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);

        let mut inner = self.lock();
        let next_due = inner.now + period;
        inner.timers.push(VirtualTimer {
            id,
            period,
            next_due,
            callback: Some(callback),
            handle: handle.clone(),
        });
        handle
    }
}
