//! Bounded worker scheduling for partition plans.
//!
//! Workers claim partition indices in increasing order. Before claiming one
//! a worker must take a permit; the permit comes back only when the consumer
//! pulls that partition's result out of the `ResultStream`. With a buffer of
//! `n` permits, in-flight plus completed-but-unconsumed partitions never
//! exceed `n`, so a slow consumer stalls production instead of growing
//! memory.
//!
//! Cancellation is an explicit flag shared with every worker and task;
//! raising it wakes workers parked on the permit gate so they can exit.

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};
use parx_core::error::Error;
use parx_core::partition::Partition;
use parx_core::result::MaterializedResult;

use crate::error::TaskError;
use crate::plan::{PartitionPlan, PartitionTask, TaskContext};
use crate::stream::ResultStream;

/// Shared cancellation flag between a stream and its producers.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Counting gate sized to the results buffer.
pub(crate) struct Permits {
    available: Mutex<usize>,
    cv: Condvar,
}

impl Permits {
    pub(crate) fn new(n: usize) -> Self {
        Self {
            available: Mutex::new(n),
            cv: Condvar::new(),
        }
    }

    /// Block until a permit is free. Returns false if cancelled first.
    pub(crate) fn acquire(&self, cancel: &CancelToken) -> bool {
        let mut n = self.available.lock();
        loop {
            if cancel.is_cancelled() {
                return false;
            }
            if *n > 0 {
                *n -= 1;
                return true;
            }
            self.cv.wait(&mut n);
        }
    }

    pub(crate) fn release(&self) {
        *self.available.lock() += 1;
        self.cv.notify_one();
    }

    /// Wake every waiter so it can re-check cancellation.
    pub(crate) fn wake_all(&self) {
        let _guard = self.available.lock();
        self.cv.notify_all();
    }
}

/// State shared by one stream and its workers.
pub(crate) struct Shared {
    pub(crate) cancel: CancelToken,
    pub(crate) permits: Permits,
    next_index: AtomicUsize,
}

impl Shared {
    /// Raise the cancel flag and unpark workers waiting for permits.
    pub(crate) fn cancel(&self) {
        self.cancel.cancel();
        self.permits.wake_all();
    }
}

/// One partition's result as delivered by a worker.
pub(crate) struct TaskOutcome<T> {
    pub(crate) index: usize,
    pub(crate) result: Result<MaterializedResult<T>, Error>,
}

#[derive(Debug, Clone, Copy)]
pub struct SchedulerOptions {
    pub num_workers: usize,
    pub results_buffer_size: usize,
    pub max_task_retries: u32,
}

/// Start executing `plan` and hand back the consuming end.
pub fn spawn<T: Partition>(plan: &PartitionPlan<T>, opts: SchedulerOptions) -> ResultStream<T> {
    let tasks = plan.tasks();
    let total = tasks.len();
    let buffer = opts.results_buffer_size.max(1);
    let shared = Arc::new(Shared {
        cancel: CancelToken::new(),
        permits: Permits::new(buffer),
        next_index: AtomicUsize::new(0),
    });

    let (tx, rx) = mpsc::channel::<TaskOutcome<T>>();
    let n_workers = opts.num_workers.max(1).min(total);
    let mut workers = Vec::with_capacity(n_workers);
    for worker_id in 0..n_workers {
        let tasks = Arc::clone(&tasks);
        let shared = Arc::clone(&shared);
        let tx = tx.clone();
        let max_retries = opts.max_task_retries;
        let handle = thread::Builder::new()
            .name(format!("parx-worker-{worker_id}"))
            .spawn(move || worker_loop(&tasks, &shared, &tx, max_retries));
        match handle {
            Ok(h) => workers.push(h),
            Err(_e) => {
                // Fewer workers still make progress; none at all is caught
                // by the stream when the channel disconnects.
                #[cfg(feature = "tracing")]
                tracing::warn!(worker_id, error = %_e, "failed to spawn worker thread");
            }
        }
    }
    drop(tx);

    ResultStream::new(rx, shared, workers, total, buffer)
}

fn worker_loop<T: Partition>(
    tasks: &[PartitionTask<T>],
    shared: &Shared,
    tx: &mpsc::Sender<TaskOutcome<T>>,
    max_retries: u32,
) {
    loop {
        if !shared.permits.acquire(&shared.cancel) {
            return;
        }
        let index = shared.next_index.fetch_add(1, Ordering::SeqCst);
        let Some(task) = tasks.get(index) else {
            shared.permits.release();
            return;
        };

        let result = execute_with_retry(task, index, &shared.cancel, max_retries);
        let failed = result.is_err();
        if tx.send(TaskOutcome { index, result }).is_err() {
            // Consumer is gone.
            return;
        }
        if failed {
            return;
        }
    }
}

/// Largest backoff exponent; retries never wait more than 2^10 ms.
const MAX_BACKOFF_EXPONENT: u32 = 10;

/// Delay before retrying after failed attempt `attempt` (0-based).
pub fn retry_backoff(attempt: u32) -> Duration {
    Duration::from_millis(1_u64 << attempt.min(MAX_BACKOFF_EXPONENT))
}

/// Run one task, retrying recoverable failures with exponential backoff.
fn execute_with_retry<T: Partition>(
    task: &PartitionTask<T>,
    index: usize,
    cancel: &CancelToken,
    max_retries: u32,
) -> Result<MaterializedResult<T>, Error> {
    let started = Instant::now();

    let mut attempt = 0u32;
    loop {
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }
        let ctx = TaskContext::new(index, attempt, cancel.clone());
        // Partition metadata is backend code too; it stays under the guard.
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            (task.run)(&ctx)
                .map(|part| MaterializedResult::new(index, part, attempt + 1, started.elapsed()))
        }))
        .unwrap_or_else(|payload| Err(TaskError::Exec(panic_message(payload))));

        match outcome {
            Ok(materialized) => return Ok(materialized),
            Err(TaskError::Cancelled) if cancel.is_cancelled() => return Err(Error::Cancelled),
            Err(e) if e.is_recoverable() && attempt < max_retries => {
                #[cfg(feature = "tracing")]
                tracing::warn!(partition = index, attempt, error = %e, "retrying partition task");
                thread::sleep(retry_backoff(attempt));
                attempt += 1;
            }
            Err(e) => return Err(task_failure(index, &task.name, e, attempt + 1)),
        }
    }
}

/// The partition is named once, in the message; the task error is kept
/// as-is as the source.
fn task_failure(index: usize, name: &str, cause: TaskError, attempts: u32) -> Error {
    Error::execution(
        format!("partition {index} ('{name}') failed after {attempts} attempt(s)"),
        cause,
    )
}

fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("task panicked: {s}")
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("task panicked: {s}")
    } else {
        "task panicked".to_string()
    }
}
