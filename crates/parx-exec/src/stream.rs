//! Consuming end of a streaming execution.
//!
//! `ResultStream` yields `MaterializedResult`s in partition-index order.
//! Pulling a result hands its permit back to the workers. The stream is
//! finite and single-pass: it ends after the last partition, or right after
//! yielding the first error. Dropping it (or calling `cancel`) stops the
//! workers, joins them, and discards anything they produced.

use std::collections::BTreeMap;
use std::sync::mpsc;
use std::sync::Arc;
use std::thread::JoinHandle;

use parx_core::error::{Error, Result};
use parx_core::result::MaterializedResult;

use crate::scheduler::{CancelToken, Shared, TaskOutcome};

pub struct ResultStream<T> {
    rx: Option<mpsc::Receiver<TaskOutcome<T>>>,
    /// Results that arrived ahead of `next`; at most one per permit.
    pending: BTreeMap<usize, Result<MaterializedResult<T>>>,
    next: usize,
    total: usize,
    buffer_size: usize,
    shared: Arc<Shared>,
    workers: Vec<JoinHandle<()>>,
    done: bool,
}

impl<T> ResultStream<T> {
    pub(crate) fn new(
        rx: mpsc::Receiver<TaskOutcome<T>>,
        shared: Arc<Shared>,
        workers: Vec<JoinHandle<()>>,
        total: usize,
        buffer_size: usize,
    ) -> Self {
        Self {
            rx: Some(rx),
            pending: BTreeMap::new(),
            next: 0,
            total,
            buffer_size,
            shared,
            workers,
            done: false,
        }
    }

    /// Partitions the plan will produce if it runs to completion.
    pub fn num_partitions(&self) -> usize {
        self.total
    }

    /// Results yielded so far.
    pub fn num_yielded(&self) -> usize {
        self.next
    }

    pub fn buffer_size(&self) -> usize {
        self.buffer_size
    }

    /// Handle on this stream's cancellation flag.
    pub fn cancel_token(&self) -> CancelToken {
        self.shared.cancel.clone()
    }

    pub fn is_cancelled(&self) -> bool {
        self.shared.cancel.is_cancelled()
    }

    /// Stop production now. Blocks until every worker has exited; results
    /// not yet pulled are discarded and the stream yields nothing further.
    pub fn cancel(&mut self) {
        if !self.done {
            #[cfg(feature = "tracing")]
            tracing::debug!(
                yielded = self.next,
                total = self.total,
                "cancelling partition stream"
            );
        }
        self.finish(true);
    }

    /// Tear down the producer side. Without `cancel` the workers are
    /// expected to exit by themselves because every index was claimed.
    fn finish(&mut self, cancel: bool) {
        self.done = true;
        if cancel {
            self.shared.cancel();
        }
        self.pending.clear();
        self.rx = None;
        for handle in self.workers.drain(..) {
            // Task panics are caught inside the worker; a join error here
            // would only mean the worker loop itself panicked.
            let _ = handle.join();
        }
    }

    fn take_next(&mut self) -> Option<Result<MaterializedResult<T>>> {
        let result = self.pending.remove(&self.next)?;
        self.next += 1;
        self.shared.permits.release();
        Some(result)
    }
}

impl<T> Iterator for ResultStream<T> {
    type Item = Result<MaterializedResult<T>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        if self.next >= self.total {
            self.finish(false);
            return None;
        }

        loop {
            if let Some(result) = self.take_next() {
                if result.is_err() {
                    self.finish(true);
                } else if self.next >= self.total {
                    self.finish(false);
                }
                return Some(result);
            }

            let received = match &self.rx {
                Some(rx) => rx.recv(),
                None => return None,
            };
            match received {
                Ok(outcome) => {
                    self.pending.insert(outcome.index, outcome.result);
                }
                Err(_) => {
                    // Every worker exited without producing `next`.
                    let cancelled = self.is_cancelled();
                    let missing = self.next;
                    self.finish(true);
                    if cancelled {
                        return None;
                    }
                    return Some(Err(Error::Invariant(format!(
                        "workers exited before partition {missing} was produced"
                    ))));
                }
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        if self.done {
            (0, Some(0))
        } else {
            (0, Some(self.total - self.next))
        }
    }
}

impl<T> Drop for ResultStream<T> {
    fn drop(&mut self) {
        if !self.done {
            self.cancel();
        }
    }
}

/// Projection of a result stream onto bare partition values.
pub struct Tables<I> {
    inner: I,
}

impl<I> Tables<I> {
    pub fn new(inner: I) -> Self {
        Self { inner }
    }

    pub fn inner(&self) -> &I {
        &self.inner
    }

    pub fn into_inner(self) -> I {
        self.inner
    }
}

impl<I, T> Iterator for Tables<I>
where
    I: Iterator<Item = Result<MaterializedResult<T>>>,
{
    type Item = Result<T>;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner
            .next()
            .map(|r| r.map(MaterializedResult::into_partition))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}
