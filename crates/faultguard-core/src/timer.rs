//! Shared delay executor for synchronous watchers.
//!
//! A single background thread drains a deadline-ordered queue of tasks.
//! Sync-mode timeout strategies schedule their watchers here; the async
//! side uses the tokio runtime's own timer instead.

use std::cmp::Ordering as CmpOrdering;
use std::collections::BinaryHeap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use lazy_static::lazy_static;

lazy_static! {
    static ref SHARED: Timer = Timer::new();
}

type TimerTask = Box<dyn FnOnce() + Send>;

struct TimerEntry {
    deadline: Instant,
    sequence: u64,
    cancelled: Arc<AtomicBool>,
    task: TimerTask,
}

impl PartialEq for TimerEntry {
    fn eq(&self, other: &Self) -> bool {
        self.sequence == other.sequence
    }
}

impl Eq for TimerEntry {}

impl PartialOrd for TimerEntry {
    fn partial_cmp(&self, other: &Self) -> Option<CmpOrdering> {
        Some(self.cmp(other))
    }
}

impl Ord for TimerEntry {
    // Reversed so the BinaryHeap pops the earliest deadline first.
    fn cmp(&self, other: &Self) -> CmpOrdering {
        other
            .deadline
            .cmp(&self.deadline)
            .then_with(|| other.sequence.cmp(&self.sequence))
    }
}

struct TimerState {
    queue: BinaryHeap<TimerEntry>,
    next_sequence: u64,
    worker_started: bool,
}

struct TimerShared {
    state: Mutex<TimerState>,
    cond: Condvar,
}

/// A deadline-ordered task scheduler backed by one background thread.
pub struct Timer {
    shared: Arc<TimerShared>,
}

/// Cancels a scheduled task. Best effort: a task already running is not
/// stopped.
#[derive(Clone)]
pub struct TimerHandle {
    cancelled: Arc<AtomicBool>,
}

impl TimerHandle {
    /// Marks the task as cancelled.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }
}

impl Timer {
    /// Creates a timer with its own worker thread (started lazily on the
    /// first schedule).
    pub fn new() -> Self {
        Self {
            shared: Arc::new(TimerShared {
                state: Mutex::new(TimerState {
                    queue: BinaryHeap::new(),
                    next_sequence: 0,
                    worker_started: false,
                }),
                cond: Condvar::new(),
            }),
        }
    }

    /// The process-wide timer shared by all sync pipelines.
    pub fn shared() -> &'static Timer {
        &SHARED
    }

    /// Runs `task` once `delay` has elapsed, unless cancelled first.
    pub fn schedule(&self, delay: Duration, task: impl FnOnce() + Send + 'static) -> TimerHandle {
        let cancelled = Arc::new(AtomicBool::new(false));
        let mut state = self
            .shared
            .state
            .lock()
            .unwrap_or_else(|e| e.into_inner());
        let sequence = state.next_sequence;
        state.next_sequence += 1;
        state.queue.push(TimerEntry {
            deadline: Instant::now() + delay,
            sequence,
            cancelled: Arc::clone(&cancelled),
            task: Box::new(task),
        });
        if !state.worker_started {
            state.worker_started = true;
            let shared = Arc::clone(&self.shared);
            thread::Builder::new()
                .name("faultguard-timer".to_string())
                .spawn(move || worker_loop(shared))
                .expect("failed to spawn timer thread");
        }
        drop(state);
        self.shared.cond.notify_one();
        TimerHandle { cancelled }
    }
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}

enum WorkerAction {
    WaitIndefinitely,
    WaitFor(Duration),
    PopAndRun,
    DropCancelled,
}

fn worker_loop(shared: Arc<TimerShared>) {
    let mut state = shared.state.lock().unwrap_or_else(|e| e.into_inner());
    loop {
        let action = match state.queue.peek() {
            None => WorkerAction::WaitIndefinitely,
            Some(entry) if entry.cancelled.load(Ordering::SeqCst) => WorkerAction::DropCancelled,
            Some(entry) => {
                let now = Instant::now();
                if entry.deadline <= now {
                    WorkerAction::PopAndRun
                } else {
                    WorkerAction::WaitFor(entry.deadline - now)
                }
            }
        };

        match action {
            WorkerAction::WaitIndefinitely => {
                state = shared.cond.wait(state).unwrap_or_else(|e| e.into_inner());
            }
            WorkerAction::WaitFor(wait) => {
                let (s, _timed_out) = shared
                    .cond
                    .wait_timeout(state, wait)
                    .unwrap_or_else(|e| e.into_inner());
                state = s;
            }
            WorkerAction::DropCancelled => {
                state.queue.pop();
            }
            WorkerAction::PopAndRun => {
                if let Some(entry) = state.queue.pop() {
                    drop(state);
                    if !entry.cancelled.load(Ordering::SeqCst) {
                        run_task(entry.task);
                    }
                    state = shared.state.lock().unwrap_or_else(|e| e.into_inner());
                }
            }
        }
    }
}

fn run_task(task: TimerTask) {
    let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(task));
    if outcome.is_err() {
        tracing::warn!("timer task panicked; ignoring");
    }
}
