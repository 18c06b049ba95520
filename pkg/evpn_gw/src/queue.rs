//! FIFO work queue with requeue-to-tail and per-entry exponential backoff
//! (`spec.md` §4.3).

use std::collections::HashMap;
use std::time::{Duration, Instant};

use common::async_std::channel;
use common::async_std::sync::Mutex;
use crypto::random::{clocked_rng, RngExt};

use crate::model::{EventKind, StageId};

/// Backoff schedule pinned by `spec.md` §4.3:
/// `min(base * 2^attempt, ceiling)` with `base = 250ms`, `ceiling = 30s`,
/// `±20%` jitter. Hand-rolled rather than reusing `net::backoff`'s general
/// `ExponentialBackoff` (see `DESIGN.md`): the spec's Law 4 pins exact
/// backoff values that a general-purpose cooldown-resetting helper doesn't
/// guarantee bit-for-bit.
pub const BACKOFF_BASE: Duration = Duration::from_millis(250);
pub const BACKOFF_CEILING: Duration = Duration::from_secs(30);

/// The two knobs `spec.md` §4.3 pins (`base`, `ceiling`); exposed on
/// `GatewayConfig` so a deployment can tune them without touching this
/// module's default schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffConfig {
    pub base: Duration,
    pub ceiling: Duration,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            base: BACKOFF_BASE,
            ceiling: BACKOFF_CEILING,
        }
    }
}

pub fn compute_backoff(attempt: u32) -> Duration {
    compute_backoff_with(&BackoffConfig::default(), attempt)
}

pub fn compute_backoff_with(config: &BackoffConfig, attempt: u32) -> Duration {
    let scaled = config.base.saturating_mul(1u32.checked_shl(attempt).unwrap_or(u32::MAX));
    let base = scaled.min(config.ceiling);

    let mut rng = clocked_rng();
    let jitter: f64 = rng.between(0.8f64, 1.2f64);

    Duration::from_secs_f64((base.as_secs_f64() * jitter).max(0.0))
}

/// A unit of realization work for one `(object_name, resource_version)`.
#[derive(Debug, Clone)]
pub struct Task {
    pub object_name: String,
    pub resource_version: u64,
    pub event_kind: EventKind,
    pub remaining_stages: Vec<StageId>,
    pub next_attempt_at: Instant,
    pub attempt: u32,
}

impl Task {
    pub fn new(
        object_name: String,
        resource_version: u64,
        event_kind: EventKind,
        remaining_stages: Vec<StageId>,
    ) -> Self {
        Self {
            object_name,
            resource_version,
            event_kind,
            remaining_stages,
            next_attempt_at: Instant::now(),
            attempt: 0,
        }
    }

    fn key(&self) -> TaskKey {
        (self.object_name.clone(), self.resource_version)
    }
}

type TaskKey = (String, u64);

struct QueueState {
    /// Canonical storage for every task currently in the queue, keyed by
    /// `(name, resourceVersion)` so a duplicate `Push` coalesces onto the
    /// same slot (`spec.md` §4.3 invariant).
    entries: HashMap<TaskKey, Task>,
    /// FIFO arrival order of ready keys. May contain keys that have since
    /// been superseded or moved to a later `next_attempt_at`; `take_ready`
    /// filters those out lazily.
    ready_order: std::collections::VecDeque<TaskKey>,
}

/// `Push(task)` appends to the tail (or, if `nextAttemptAt > now`, the delay
/// set); `Pop` blocks until the oldest ready task is available; `Requeue`
/// reinserts with a new `nextAttemptAt`; `Notify(name)` clamps a task's
/// `nextAttemptAt` to now so a dependency wake doesn't have to wait out a
/// backoff (`spec.md` §4.3/§4.2).
pub struct TaskQueue {
    state: Mutex<QueueState>,
    wake_tx: channel::Sender<()>,
    wake_rx: channel::Receiver<()>,
}

impl TaskQueue {
    pub fn new() -> Self {
        let (wake_tx, wake_rx) = channel::unbounded();
        Self {
            state: Mutex::new(QueueState {
                entries: HashMap::new(),
                ready_order: std::collections::VecDeque::new(),
            }),
            wake_tx,
            wake_rx,
        }
    }

    /// Appends `task` to the tail of the ready set, or into the delay set if
    /// `task.next_attempt_at > now`. A `Push` for a key already present
    /// coalesces: the new task replaces the old one, but the furthest-along
    /// `attempt` counter wins (we never want a fresh create to reset an
    /// in-progress retry's attempt count, nor vice versa).
    pub async fn push(&self, mut task: Task) {
        let mut state = self.state.lock().await;

        let key = task.key();
        if let Some(existing) = state.entries.get(&key) {
            task.attempt = task.attempt.max(existing.attempt);
        } else {
            state.ready_order.push_back(key.clone());
        }

        state.entries.insert(key, task);
        drop(state);

        self.wake_tx.send(()).await.ok();
    }

    /// Moves a task back into the structure with `nextAttemptAt = now +
    /// backoff`.
    pub async fn requeue(&self, mut task: Task, backoff: Duration) {
        task.next_attempt_at = Instant::now() + backoff;
        self.push(task).await;
    }

    /// Clamps the `nextAttemptAt` of the task for `name` (if present) to now,
    /// so a dependency becoming `Done` wakes a waiter without its backoff
    /// delay running out first.
    pub async fn notify(&self, name: &str) {
        let mut state = self.state.lock().await;

        let mut woke = false;
        for (key, task) in state.entries.iter_mut() {
            if key.0 == name {
                task.next_attempt_at = Instant::now();
                woke = true;
            }
        }

        drop(state);

        if woke {
            self.wake_tx.send(()).await.ok();
        }
    }

    /// Returns the oldest ready task whose `nextAttemptAt <= now`, or `None`
    /// plus the duration until the next one becomes ready.
    async fn take_ready(&self) -> Result<Task, Option<Duration>> {
        let mut state = self.state.lock().await;

        let now = Instant::now();
        let mut earliest_wait: Option<Duration> = None;

        // Bound the scan to one pass over the keys present at entry: each
        // not-yet-ready key gets pushed back to the tail exactly once, so
        // looping for the starting length visits every key exactly once.
        let starting_len = state.ready_order.len();
        for _ in 0..starting_len {
            let key = state.ready_order.pop_front().unwrap();

            let ready = match state.entries.get(&key) {
                Some(task) => task.next_attempt_at <= now,
                None => continue, // Stale entry (task already popped and not requeued).
            };

            if ready {
                let task = state.entries.remove(&key).unwrap();
                return Ok(task);
            }

            let wait = state.entries[&key].next_attempt_at - now;
            earliest_wait = Some(match earliest_wait {
                Some(w) => w.min(wait),
                None => wait,
            });
            state.ready_order.push_back(key);
        }

        Err(earliest_wait)
    }

    /// Blocks until the oldest ready task is available, then returns it.
    pub async fn pop(&self) -> Task {
        loop {
            match self.take_ready().await {
                Ok(task) => return task,
                Err(None) => {
                    self.wake_rx.recv().await.ok();
                }
                Err(Some(wait)) => {
                    // Either the wait elapses (a delayed task becomes ready)
                    // or a `push`/`notify` wakes us early; either way we loop
                    // back to `take_ready` to recompute what's actually due.
                    common::async_std::future::timeout(wait, self.wake_rx.recv())
                        .await
                        .ok();
                }
            }
        }
    }
}

impl Default for TaskQueue {
    fn default() -> Self {
        Self::new()
    }
}
