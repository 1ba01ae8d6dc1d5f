//! Per-file FIFO serialisation of mutating operations.
//!
//! Every file name owns at most one queue. Pushing onto a missing queue creates
//! it and spawns a runner that drains jobs one at a time, yielding to the
//! scheduler between jobs. Once drained, the queue is removed from the map.
//! Different files never wait on each other.

use super::error::FsError;
use futures::FutureExt;
use futures::future::BoxFuture;
use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::pin::Pin;
use std::sync::{Arc, Mutex, PoisonError};
use std::task::{Context, Poll};
use tokio::sync::oneshot;
use tracing::{error, trace};

type Job = BoxFuture<'static, ()>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueState {
    Idle,
    Running,
}

struct FileQueue {
    state: QueueState,
    pending: VecDeque<Job>,
}

impl FileQueue {
    fn new() -> Self {
        Self {
            state: QueueState::Idle,
            pending: VecDeque::new(),
        }
    }
}

#[derive(Clone, Default)]
pub struct OperationQueue {
    queues: Arc<Mutex<HashMap<String, FileQueue>>>,
}

impl OperationQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue `op` behind every earlier operation on `name`.
    ///
    /// The job is registered before this returns; the returned future only
    /// delivers its result. Dropping it does not cancel the job.
    pub fn enqueue<T, F>(&self, name: &str, op: F) -> QueuedOp<T>
    where
        T: Send + 'static,
        F: Future<Output = Result<T, FsError>> + Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        let job: Job = Box::pin(async move {
            let _ = tx.send(op.await);
        });

        let start_runner = {
            let mut queues = self.queues.lock().unwrap_or_else(PoisonError::into_inner);
            let queue = queues.entry(name.to_string()).or_insert_with(FileQueue::new);
            queue.pending.push_back(job);
            trace!(name, pending = queue.pending.len(), "enqueued");
            if queue.state == QueueState::Idle {
                queue.state = QueueState::Running;
                true
            } else {
                false
            }
        };

        if start_runner {
            let queues = Arc::clone(&self.queues);
            let name = name.to_string();
            tokio::spawn(run_queue(queues, name));
        }

        QueuedOp { rx }
    }

    pub fn state(&self, name: &str) -> Option<QueueState> {
        let queues = self.queues.lock().unwrap_or_else(PoisonError::into_inner);
        queues.get(name).map(|q| q.state)
    }

    /// Jobs waiting behind the one currently running.
    pub fn pending(&self, name: &str) -> usize {
        let queues = self.queues.lock().unwrap_or_else(PoisonError::into_inner);
        queues.get(name).map_or(0, |q| q.pending.len())
    }

    /// Number of files with live queues.
    pub fn len(&self) -> usize {
        self.queues
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

async fn run_queue(queues: Arc<Mutex<HashMap<String, FileQueue>>>, name: String) {
    loop {
        let next = {
            let mut guard = queues.lock().unwrap_or_else(PoisonError::into_inner);
            match guard.get_mut(&name).and_then(|q| q.pending.pop_front()) {
                Some(job) => job,
                None => {
                    guard.remove(&name);
                    trace!(name = %name, "queue drained");
                    return;
                }
            }
        };

        if AssertUnwindSafe(next).catch_unwind().await.is_err() {
            error!(name = %name, "queued operation panicked");
        }
        tokio::task::yield_now().await;
    }
}

/// Result handle of a queued operation.
pub struct QueuedOp<T> {
    rx: oneshot::Receiver<Result<T, FsError>>,
}

impl<T> Future for QueuedOp<T> {
    type Output = Result<T, FsError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match Pin::new(&mut self.rx).poll(cx) {
            Poll::Ready(Ok(result)) => Poll::Ready(result),
            Poll::Ready(Err(_)) => Poll::Ready(Err(FsError::QueueClosed)),
            Poll::Pending => Poll::Pending,
        }
    }
}
