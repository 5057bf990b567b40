//! Best-effort retry queue for compensating actions.
//!
//! Mirrors the shape of the system this gateway fronts: a submitted action is
//! retried a bounded number of times with a fixed interval between attempts,
//! and exhaustion is logged rather than surfaced to whoever submitted the
//! task. The queue is purely in-memory and does not survive a restart (see
//! `DESIGN.md` for the durability trade-off).

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::BoxFuture;
use tokio::sync::{mpsc, Mutex};
use uuid::Uuid;

/// A boxed, retryable unit of work. Errors are opaque to the queue; only
/// success/failure matters for retry accounting.
pub type RetryAction = Box<dyn Fn() -> BoxFuture<'static, Result<(), RetryActionError>> + Send + Sync>;

/// Opaque error type for a failed retry action.
pub type RetryActionError = Box<dyn std::error::Error + Send + Sync>;

struct RetryTask {
    /// Human-readable label (e.g. `release_car`, `cancel_payment`) used only
    /// for logging; does not affect retry semantics.
    kind: String,
    action: RetryAction,
    attempts: u32,
    max_attempts: u32,
    #[allow(dead_code)]
    created_at: Instant,
}

/// Background worker that drains submitted compensation actions.
pub struct RetryQueue {
    tasks: Mutex<HashMap<Uuid, RetryTask>>,
    tx: mpsc::UnboundedSender<Uuid>,
    rx: Mutex<Option<mpsc::UnboundedReceiver<Uuid>>>,
    running: Arc<AtomicBool>,
    retry_interval: Duration,
    default_max_attempts: u32,
}

impl RetryQueue {
    pub fn new(retry_interval: Duration, default_max_attempts: u32) -> Arc<Self> {
        let (tx, rx) = mpsc::unbounded_channel();
        Arc::new(Self {
            tasks: Mutex::new(HashMap::new()),
            tx,
            rx: Mutex::new(Some(rx)),
            running: Arc::new(AtomicBool::new(false)),
            retry_interval,
            default_max_attempts,
        })
    }

    /// Number of tasks currently pending (not yet succeeded or exhausted).
    pub async fn len(&self) -> usize {
        self.tasks.lock().await.len()
    }

    /// Enqueue `action` for best-effort retry. Returns immediately with the
    /// new task's id; the action is not invoked until the worker picks it up.
    pub async fn submit(&self, kind: impl Into<String>, action: RetryAction) -> Uuid {
        let task_id = Uuid::new_v4();
        let kind = kind.into();
        {
            let mut tasks = self.tasks.lock().await;
            tasks.insert(
                task_id,
                RetryTask {
                    kind: kind.clone(),
                    action,
                    attempts: 0,
                    max_attempts: self.default_max_attempts,
                    created_at: Instant::now(),
                },
            );
        }
        tracing::info!(%task_id, kind = %kind, "retry task submitted");
        // An unbounded channel only fails to send if the receiver has been
        // dropped, which only happens after `stop`; nothing to do at that point.
        let _ = self.tx.send(task_id);
        task_id
    }

    /// Start the worker loop. Idempotent: calling `spawn_worker` twice on the
    /// same queue after `stop` is not supported (mirrors `start`/`stop` being
    /// called once per process lifetime).
    pub fn spawn_worker(self: Arc<Self>) -> tokio::task::JoinHandle<()> {
        self.running.store(true, Ordering::SeqCst);
        tokio::spawn(async move { self.run().await })
    }

    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
    }

    async fn run(self: Arc<Self>) {
        tracing::info!("retry queue worker started");
        let mut rx = self
            .rx
            .lock()
            .await
            .take()
            .expect("retry queue worker started more than once");

        while self.running.load(Ordering::SeqCst) {
            let task_id = match tokio::time::timeout(self.retry_interval, rx.recv()).await {
                Ok(Some(id)) => id,
                Ok(None) => break, // all senders dropped
                Err(_elapsed) => continue,
            };

            self.attempt(task_id).await;
        }
        tracing::info!("retry queue worker stopped");
    }

    async fn attempt(&self, task_id: Uuid) {
        // Run the action without holding the task map lock.
        let (kind, result) = {
            let mut tasks = self.tasks.lock().await;
            let Some(task) = tasks.get_mut(&task_id) else {
                return; // already evicted
            };
            let fut = (task.action)();
            drop(tasks);
            (task_id, fut.await)
        };
        let _ = kind;

        let mut tasks = self.tasks.lock().await;
        let Some(task) = tasks.get_mut(&task_id) else {
            return;
        };

        match result {
            Ok(()) => {
                tracing::info!(%task_id, kind = %task.kind, "retry task succeeded");
                tasks.remove(&task_id);
            }
            Err(err) => {
                task.attempts += 1;
                tracing::warn!(
                    %task_id,
                    kind = %task.kind,
                    attempt = task.attempts,
                    max_attempts = task.max_attempts,
                    error = %err,
                    "retry task failed"
                );

                if task.attempts < task.max_attempts {
                    let tx = self.tx.clone();
                    let interval = self.retry_interval;
                    drop(tasks);
                    tokio::spawn(async move {
                        tokio::time::sleep(interval).await;
                        let _ = tx.send(task_id);
                    });
                } else {
                    tracing::error!(%task_id, kind = %task.kind, "retry task exhausted, giving up");
                    tasks.remove(&task_id);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU32;

    fn failing_then_succeeding(fail_times: u32) -> (Arc<AtomicU32>, RetryAction) {
        let calls = Arc::new(AtomicU32::new(0));
        let calls2 = calls.clone();
        let action: RetryAction = Box::new(move || {
            let calls = calls2.clone();
            Box::pin(async move {
                let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                if n <= fail_times {
                    Err::<(), RetryActionError>("still failing".into())
                } else {
                    Ok(())
                }
            })
        });
        (calls, action)
    }

    #[tokio::test(start_paused = true)]
    async fn retries_until_success_then_removes_task() {
        let queue = RetryQueue::new(Duration::from_millis(10), 5);
        let _worker = queue.clone().spawn_worker();

        let (calls, action) = failing_then_succeeding(2);
        queue.submit("release_car", action).await;

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(calls.load(Ordering::SeqCst) >= 3);
        assert_eq!(queue.len().await, 0);
        queue.stop();
    }

    #[tokio::test(start_paused = true)]
    async fn gives_up_after_max_attempts_and_removes_task() {
        let queue = RetryQueue::new(Duration::from_millis(5), 3);
        let _worker = queue.clone().spawn_worker();

        let (calls, action) = failing_then_succeeding(u32::MAX);
        queue.submit("cancel_payment", action).await;

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(queue.len().await, 0);
        queue.stop();
    }
}
