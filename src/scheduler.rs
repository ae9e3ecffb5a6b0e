// Scheduler - repeating timers behind a trait so replays can be driven by hand

use std::collections::{BTreeMap, HashMap};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimerHandle(pub u64);

pub trait Scheduler {
    /// Start a repeating timer; ticks are delivered by the implementation
    fn start_interval(&mut self, period: Duration) -> TimerHandle;
    /// Stop a timer. Unknown or already-cancelled handles are ignored.
    fn cancel(&mut self, handle: TimerHandle);
}

// =============================================================================
// MANUAL SCHEDULER
// =============================================================================

/// Records timers without running them; the caller delivers ticks
#[derive(Debug, Default)]
pub struct ManualScheduler {
    next_id: u64,
    active: BTreeMap<TimerHandle, Duration>,
    cancelled: usize,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn active_timers(&self) -> Vec<TimerHandle> {
        self.active.keys().copied().collect()
    }

    pub fn period(&self, handle: TimerHandle) -> Option<Duration> {
        self.active.get(&handle).copied()
    }

    pub fn cancelled_count(&self) -> usize {
        self.cancelled
    }
}

impl Scheduler for ManualScheduler {
    fn start_interval(&mut self, period: Duration) -> TimerHandle {
        self.next_id += 1;
        let handle = TimerHandle(self.next_id);
        self.active.insert(handle, period);
        handle
    }

    fn cancel(&mut self, handle: TimerHandle) {
        if self.active.remove(&handle).is_some() {
            self.cancelled += 1;
        }
    }
}

// =============================================================================
// TOKIO SCHEDULER
// =============================================================================

/// Each timer is a task that sends its handle on every period.
/// Must be used from inside a tokio runtime.
pub struct TokioScheduler {
    next_id: u64,
    ticks: mpsc::UnboundedSender<TimerHandle>,
    tasks: HashMap<TimerHandle, JoinHandle<()>>,
}

impl TokioScheduler {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<TimerHandle>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let scheduler = Self {
            next_id: 0,
            ticks: tx,
            tasks: HashMap::new(),
        };
        (scheduler, rx)
    }

    pub fn active_count(&self) -> usize {
        self.tasks.len()
    }
}

impl Scheduler for TokioScheduler {
    fn start_interval(&mut self, period: Duration) -> TimerHandle {
        self.next_id += 1;
        let handle = TimerHandle(self.next_id);
        let tx = self.ticks.clone();

        let task = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            // the first tick completes immediately
            interval.tick().await;
            loop {
                interval.tick().await;
                if tx.send(handle).is_err() {
                    break;
                }
            }
        });

        debug!(timer = handle.0, ?period, "interval started");
        self.tasks.insert(handle, task);
        handle
    }

    fn cancel(&mut self, handle: TimerHandle) {
        if let Some(task) = self.tasks.remove(&handle) {
            task.abort();
            debug!(timer = handle.0, "interval cancelled");
        }
    }
}

impl Drop for TokioScheduler {
    fn drop(&mut self) {
        for (_, task) in self.tasks.drain() {
            task.abort();
        }
    }
}
