//! A fixed-size worker pool shared by every resolution.

use futures::FutureExt;
use futures::future::BoxFuture;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::sync::{Mutex, mpsc, oneshot};
use tokio_util::sync::CancellationToken;

struct Job {
    token: CancellationToken,
    task: BoxFuture<'static, ()>,
}

type JobReceiver = Arc<Mutex<mpsc::UnboundedReceiver<Job>>>;

/// Runs submitted tasks on a fixed number of long-lived workers.
///
/// Tasks are started in submission order, and never more than
/// [`size`](Self::size) at once; everything else waits in the queue. Every
/// clone submits to the same workers, which exit once the last clone is
/// dropped and the queue has drained.
///
/// Cancellation is checked once, when a worker takes a task off the queue.
/// A task that has already started always runs to completion.
///
/// # Examples
///
/// ```
/// use setsync_queue::pool::ResolutionPool;
/// use tokio_util::sync::CancellationToken;
///
/// # #[tokio::main]
/// # async fn main() {
/// let pool = ResolutionPool::new(2);
/// let token = CancellationToken::new();
/// let handles: Vec<_> = (0..5).map(|n| pool.submit(&token, async move { n * 2 })).collect();
/// let results = futures::future::join_all(handles).await;
/// assert_eq!(results, vec![Some(0), Some(2), Some(4), Some(6), Some(8)]);
/// # }
/// ```
#[derive(Clone)]
pub struct ResolutionPool {
    sender: mpsc::UnboundedSender<Job>,
    size: usize,
}
impl ResolutionPool {
    /// Spawn `size` workers (at least one) onto the current Tokio runtime.
    ///
    /// # Panics
    ///
    /// Panics if called outside of a Tokio runtime.
    pub fn new(size: usize) -> Self {
        let size = size.max(1);
        let (sender, receiver) = mpsc::unbounded_channel();
        let receiver: JobReceiver = Arc::new(Mutex::new(receiver));
        for worker in 0..size {
            tokio::spawn(run_worker(worker, receiver.clone()));
        }
        tracing::debug!(size, "started resolution pool");
        Self { sender, size }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Queue `task` to run on the pool, unless `token` is cancelled by the
    /// time a worker picks it up.
    pub fn submit<F, T>(&self, token: &CancellationToken, task: F) -> TaskHandle<T>
    where
        F: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        let (result, receiver) = oneshot::channel();
        let job = Job {
            token: token.clone(),
            task: async move {
                // The handle may have been dropped; nobody is waiting for the result then.
                _ = result.send(task.await);
            }
            .boxed(),
        };
        // If the workers are gone the job (and its sender) is dropped right
        // here, and the handle reports the task as skipped.
        _ = self.sender.send(job);
        TaskHandle { receiver }
    }
}

async fn run_worker(worker: usize, jobs: JobReceiver) {
    loop {
        // Only one idle worker waits on the channel at a time; the rest queue
        // on the lock, which keeps dequeueing strictly FIFO.
        let Some(job) = jobs.lock().await.recv().await else {
            break;
        };
        if job.token.is_cancelled() {
            tracing::trace!(worker, "skipping cancelled task");
            continue;
        }
        if let Err(panic) = AssertUnwindSafe(job.task).catch_unwind().await {
            let message = panic
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| panic.downcast_ref::<String>().cloned())
                .unwrap_or_default();
            tracing::error!(worker, panic = %message, "task panicked");
        }
    }
    tracing::trace!(worker, "worker exiting");
}

/// Completion of a task submitted to a [`ResolutionPool`].
///
/// Resolves to `Some(output)` if the task ran, or `None` if it never did
/// (cancelled before a worker picked it up) or didn't finish (panicked).
#[must_use = "dropping the handle does not cancel the task"]
pub struct TaskHandle<T> {
    receiver: oneshot::Receiver<T>,
}
impl<T> Future for TaskHandle<T> {
    type Output = Option<T>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.receiver).poll(cx).map(Result::ok)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::sync::Semaphore;

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_never_exceeds_size() {
        let pool = ResolutionPool::new(3);
        let token = CancellationToken::new();
        let running = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..20)
            .map(|_| {
                let running = running.clone();
                let peak = peak.clone();
                pool.submit(&token, async move {
                    let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(5)).await;
                    running.fetch_sub(1, Ordering::SeqCst);
                })
            })
            .collect();
        let results = futures::future::join_all(handles).await;

        assert!(results.iter().all(Option::is_some));
        assert!(peak.load(Ordering::SeqCst) <= 3);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_cancelled_before_dequeue_is_skipped() {
        let pool = ResolutionPool::new(1);
        let gate = Arc::new(Semaphore::new(0));
        let blocker = pool.submit(&CancellationToken::new(), {
            let gate = gate.clone();
            async move {
                _ = gate.acquire().await;
            }
        });

        let token = CancellationToken::new();
        let ran = Arc::new(AtomicUsize::new(0));
        let queued: Vec<_> = (0..3)
            .map(|_| {
                let ran = ran.clone();
                pool.submit(&token, async move {
                    ran.fetch_add(1, Ordering::SeqCst);
                })
            })
            .collect();
        token.cancel();
        gate.add_permits(1);

        assert_eq!(blocker.await, Some(()));
        assert!(futures::future::join_all(queued).await.iter().all(Option::is_none));
        assert_eq!(ran.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_panic_does_not_kill_worker() {
        let pool = ResolutionPool::new(1);
        let token = CancellationToken::new();
        let panicked = pool.submit(&token, async {
            if true {
                panic!("boom");
            }
        });
        let after = pool.submit(&token, async { 42 });
        assert_eq!(panicked.await, None);
        assert_eq!(after.await, Some(42));
    }

    #[tokio::test]
    async fn test_zero_size_means_one() {
        let pool = ResolutionPool::new(0);
        assert_eq!(pool.size(), 1);
        assert_eq!(pool.submit(&CancellationToken::new(), async { "ran" }).await, Some("ran"));
    }

    #[tokio::test]
    async fn test_fifo_with_single_worker() {
        let pool = ResolutionPool::new(1);
        let token = CancellationToken::new();
        let order = Arc::new(std::sync::Mutex::new(Vec::new()));
        let handles: Vec<_> = (0..10)
            .map(|n| {
                let order = order.clone();
                pool.submit(&token, async move { order.lock().unwrap().push(n) })
            })
            .collect();
        futures::future::join_all(handles).await;
        assert_eq!(*order.lock().unwrap(), (0..10).collect::<Vec<_>>());
    }
}
