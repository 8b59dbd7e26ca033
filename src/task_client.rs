//! Submit/poll/resolve orchestration for server-side background tasks.
//!
//! A [`TaskSlot`] tracks one logical job (say, "the trajectory plan") and
//! runs at most one poller at a time. The poller is a spawned tokio task
//! owned by the slot: cancelling, or dropping the slot, aborts it. Every
//! state change is also tagged with a generation number so a response that
//! arrives for a superseded job is discarded.

use crate::core::task::{TaskBackend, TaskKind, TaskRequest, TaskStatus};
use anyhow::{Context, Result, anyhow, bail};
use serde::de::DeserializeOwned;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, instrument, warn};

#[derive(Debug, Clone, PartialEq)]
pub struct PollConfig {
    pub interval: Duration,
    /// Give up on a task that has not finished after this long.
    pub timeout: Option<Duration>,
    /// Consecutive failed status requests tolerated before giving up.
    pub max_consecutive_errors: u32,
}

impl Default for PollConfig {
    fn default() -> Self {
        PollConfig {
            interval: Duration::from_secs(2),
            timeout: Some(Duration::from_secs(15 * 60)),
            max_consecutive_errors: 30,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TaskState<T> {
    Idle,
    Submitting,
    Polling { task_id: String, progress: u8 },
    Completed { task_id: String, result: T },
    Failed { task_id: Option<String>, error: String },
    Cancelled,
}

impl<T> TaskState<T> {
    /// A job is in flight on this slot.
    pub fn is_busy(&self) -> bool {
        matches!(self, TaskState::Submitting | TaskState::Polling { .. })
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TaskState::Completed { .. } | TaskState::Failed { .. } | TaskState::Cancelled
        )
    }

    pub fn progress(&self) -> Option<u8> {
        match self {
            TaskState::Polling { progress, .. } => Some(*progress),
            TaskState::Completed { .. } => Some(100),
            _ => None,
        }
    }
}

struct Inner {
    generation: u64,
    task_id: Option<String>,
    poller: Option<JoinHandle<()>>,
}

struct Shared<T> {
    inner: Mutex<Inner>,
    state: watch::Sender<TaskState<T>>,
}

impl<T> Shared<T> {
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Publishes `next` if the caller still owns the slot, i.e. nothing
    /// cancelled or resubmitted since `generation` was handed out.
    fn apply(&self, generation: u64, task_id: Option<&str>, next: TaskState<T>) -> bool {
        let mut inner = self.lock();
        if inner.generation != generation || inner.task_id.as_deref() != task_id {
            debug!(generation, ?task_id, "Ignoring stale task update");
            return false;
        }
        if next.is_terminal() {
            inner.poller = None;
        }
        self.state.send_replace(next);
        true
    }
}

/// One logical task slot.
pub struct TaskSlot<T> {
    kind: TaskKind,
    backend: Arc<dyn TaskBackend>,
    config: PollConfig,
    shared: Arc<Shared<T>>,
}

impl<T> TaskSlot<T>
where
    T: DeserializeOwned + Clone + Send + Sync + 'static,
{
    pub fn new(kind: TaskKind, backend: Arc<dyn TaskBackend>, config: PollConfig) -> Self {
        let (state, _) = watch::channel(TaskState::Idle);
        Self {
            kind,
            backend,
            config,
            shared: Arc::new(Shared {
                inner: Mutex::new(Inner {
                    generation: 0,
                    task_id: None,
                    poller: None,
                }),
                state,
            }),
        }
    }

    pub fn kind(&self) -> TaskKind {
        self.kind
    }

    pub fn state(&self) -> TaskState<T> {
        self.shared.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<TaskState<T>> {
        self.shared.state.subscribe()
    }

    /// Submits a job and starts polling it. Rejected while another job is
    /// in flight on this slot; call [`TaskSlot::cancel`] first to replace it.
    #[instrument(name = "TaskSubmit", skip(self, request), fields(kind = %self.kind))]
    pub async fn submit(&self, request: &TaskRequest) -> Result<String> {
        if request.kind() != self.kind {
            bail!(
                "Cannot submit a {} task to the {} slot",
                request.kind(),
                self.kind
            );
        }

        let generation = {
            let mut inner = self.shared.lock();
            if self.shared.state.borrow().is_busy() {
                bail!("A {} task is already in progress", self.kind);
            }
            inner.generation += 1;
            inner.task_id = None;
            self.shared.state.send_replace(TaskState::Submitting);
            inner.generation
        };

        let receipt = match self.backend.submit(request).await {
            Ok(receipt) => receipt,
            Err(e) => {
                self.shared.apply(
                    generation,
                    None,
                    TaskState::Failed {
                        task_id: None,
                        error: e.to_string(),
                    },
                );
                return Err(e.context(format!("Failed to submit {} task", self.kind)));
            }
        };
        let task_id = receipt.task_id;

        let mut inner = self.shared.lock();
        if inner.generation != generation {
            debug!(%task_id, "Submission superseded before it was acknowledged");
            bail!("Task submission was cancelled");
        }
        info!(%task_id, message = ?receipt.message, "Task submitted");
        inner.task_id = Some(task_id.clone());
        self.shared.state.send_replace(TaskState::Polling {
            task_id: task_id.clone(),
            progress: 0,
        });
        inner.poller = Some(tokio::spawn(poll_until_done(
            Arc::clone(&self.backend),
            self.config.clone(),
            self.kind,
            task_id.clone(),
            generation,
            Arc::clone(&self.shared),
        )));
        Ok(task_id)
    }

    /// Stops tracking the current job. Returns false when nothing was in
    /// flight. The server-side job is left alone.
    pub fn cancel(&self) -> bool {
        let mut inner = self.shared.lock();
        if !self.shared.state.borrow().is_busy() {
            return false;
        }
        inner.generation += 1;
        if let Some(poller) = inner.poller.take() {
            poller.abort();
        }
        info!(task_id = ?inner.task_id.take(), "Task cancelled");
        self.shared.state.send_replace(TaskState::Cancelled);
        true
    }

    /// Waits until the slot is no longer busy and returns its state.
    pub async fn wait(&self) -> TaskState<T> {
        let mut rx = self.subscribe();
        loop {
            {
                let state = rx.borrow_and_update();
                if !state.is_busy() {
                    return state.clone();
                }
            }
            if rx.changed().await.is_err() {
                return self.state();
            }
        }
    }

    /// Submits and waits for the typed result in one call.
    pub async fn run_to_completion(&self, request: &TaskRequest) -> Result<T> {
        self.submit(request).await?;
        match self.wait().await {
            TaskState::Completed { result, .. } => Ok(result),
            TaskState::Failed { error, .. } => Err(anyhow!(error)),
            TaskState::Cancelled => bail!("The {} task was cancelled", self.kind),
            TaskState::Idle | TaskState::Submitting | TaskState::Polling { .. } => {
                bail!("The {} task did not finish", self.kind)
            }
        }
    }
}

impl<T> Drop for TaskSlot<T> {
    fn drop(&mut self) {
        let mut inner = self.shared.lock();
        inner.generation += 1;
        if let Some(poller) = inner.poller.take() {
            debug!("Stopping task poller");
            poller.abort();
        }
    }
}

async fn poll_until_done<T>(
    backend: Arc<dyn TaskBackend>,
    config: PollConfig,
    kind: TaskKind,
    task_id: String,
    generation: u64,
    shared: Arc<Shared<T>>,
) where
    T: DeserializeOwned,
{
    let started = Instant::now();
    let mut ticker = tokio::time::interval_at(started + config.interval, config.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut consecutive_errors = 0u32;
    let id = Some(task_id.as_str());

    loop {
        ticker.tick().await;

        if let Some(timeout) = config.timeout {
            if started.elapsed() >= timeout {
                warn!(%task_id, ?timeout, "Task timed out");
                shared.apply(
                    generation,
                    id,
                    TaskState::Failed {
                        task_id: Some(task_id.clone()),
                        error: format!("Task timed out after {timeout:?}"),
                    },
                );
                return;
            }
        }

        let task = match backend.status(&task_id).await {
            Ok(task) => {
                consecutive_errors = 0;
                task
            }
            Err(e) => {
                consecutive_errors += 1;
                debug!(%task_id, attempt = consecutive_errors, error = %e, "Task status poll failed");
                if consecutive_errors >= config.max_consecutive_errors {
                    shared.apply(
                        generation,
                        id,
                        TaskState::Failed {
                            task_id: Some(task_id.clone()),
                            error: format!(
                                "Lost contact with task after {consecutive_errors} attempts: {e}"
                            ),
                        },
                    );
                    return;
                }
                continue;
            }
        };

        match task.status {
            TaskStatus::Pending | TaskStatus::Running => {
                debug!(%task_id, progress = task.percent(), "Task in progress");
                let progressed = shared.apply(
                    generation,
                    id,
                    TaskState::Polling {
                        task_id: task_id.clone(),
                        progress: task.percent(),
                    },
                );
                if !progressed {
                    return;
                }
            }
            TaskStatus::Completed => {
                let outcome = backend
                    .result(kind, &task_id)
                    .await
                    .and_then(|body| {
                        serde_json::from_value::<T>(body)
                            .with_context(|| format!("Failed to parse {kind} result"))
                    });
                let next = match outcome {
                    Ok(result) => {
                        info!(%task_id, "Task completed");
                        TaskState::Completed {
                            task_id: task_id.clone(),
                            result,
                        }
                    }
                    Err(e) => TaskState::Failed {
                        task_id: Some(task_id.clone()),
                        error: format!("{e:#}"),
                    },
                };
                shared.apply(generation, id, next);
                return;
            }
            TaskStatus::Failed => {
                let error = task
                    .error
                    .unwrap_or_else(|| "Task failed without an error message".to_string());
                warn!(%task_id, %error, "Task failed");
                shared.apply(
                    generation,
                    id,
                    TaskState::Failed {
                        task_id: Some(task_id.clone()),
                        error,
                    },
                );
                return;
            }
        }
    }
}

/// Hands out task slots that share one backend and polling policy.
#[derive(Clone)]
pub struct TaskClient {
    backend: Arc<dyn TaskBackend>,
    config: PollConfig,
}

impl TaskClient {
    pub fn new(backend: Arc<dyn TaskBackend>, config: PollConfig) -> Self {
        Self { backend, config }
    }

    pub fn slot<T>(&self, kind: TaskKind) -> TaskSlot<T>
    where
        T: DeserializeOwned + Clone + Send + Sync + 'static,
    {
        TaskSlot::new(kind, Arc::clone(&self.backend), self.config.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::task::{Task, TaskReceipt, TrajectoryRequest};
    use async_trait::async_trait;
    use serde::Deserialize;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::time::sleep;

    #[derive(Debug, Clone, PartialEq, Deserialize)]
    struct Plan {
        score: u32,
    }

    enum Step {
        Status(TaskStatus, f64),
        FailedWith(Option<&'static str>),
        Unreachable,
    }

    struct ScriptedBackend {
        steps: Mutex<VecDeque<Step>>,
        submit_delay: Duration,
        submit_calls: AtomicUsize,
        status_calls: AtomicUsize,
        result_calls: AtomicUsize,
    }

    impl ScriptedBackend {
        fn new(steps: Vec<Step>) -> Arc<Self> {
            Self::with_submit_delay(steps, Duration::ZERO)
        }

        fn with_submit_delay(steps: Vec<Step>, submit_delay: Duration) -> Arc<Self> {
            Arc::new(Self {
                steps: Mutex::new(steps.into()),
                submit_delay,
                submit_calls: AtomicUsize::new(0),
                status_calls: AtomicUsize::new(0),
                result_calls: AtomicUsize::new(0),
            })
        }

        fn status_calls(&self) -> usize {
            self.status_calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl TaskBackend for ScriptedBackend {
        async fn submit(&self, _request: &TaskRequest) -> Result<TaskReceipt> {
            let n = self.submit_calls.fetch_add(1, Ordering::SeqCst) + 1;
            sleep(self.submit_delay).await;
            Ok(TaskReceipt {
                task_id: format!("task-{n}"),
                status: Some(TaskStatus::Pending),
                message: None,
            })
        }

        async fn status(&self, task_id: &str) -> Result<Task> {
            self.status_calls.fetch_add(1, Ordering::SeqCst);
            // An exhausted script keeps the task running forever.
            let step = self
                .steps
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Step::Status(TaskStatus::Running, 50.0));
            let (status, progress, error) = match step {
                Step::Status(status, progress) => (status, progress, None),
                Step::FailedWith(error) => (TaskStatus::Failed, 0.0, error.map(String::from)),
                Step::Unreachable => return Err(anyhow!("connection refused")),
            };
            Ok(Task {
                id: task_id.to_string(),
                kind: Some(TaskKind::WildcardTrajectory),
                status,
                progress,
                created_at: None,
                completed_at: None,
                error,
            })
        }

        async fn result(&self, _kind: TaskKind, _task_id: &str) -> Result<serde_json::Value> {
            self.result_calls.fetch_add(1, Ordering::SeqCst);
            Ok(serde_json::json!({"score": 71}))
        }
    }

    fn config(interval_ms: u64) -> PollConfig {
        PollConfig {
            interval: Duration::from_millis(interval_ms),
            timeout: None,
            max_consecutive_errors: 5,
        }
    }

    fn request() -> TaskRequest {
        TaskRequest::WildcardTrajectory(TrajectoryRequest {
            budget: 100.0,
            horizon: 4,
            current_squad: None,
        })
    }

    fn slot(backend: &Arc<ScriptedBackend>, config: PollConfig) -> TaskSlot<Plan> {
        TaskSlot::new(TaskKind::WildcardTrajectory, backend.clone(), config)
    }

    #[tokio::test]
    async fn test_running_then_completed() {
        let backend = ScriptedBackend::new(vec![
            Step::Status(TaskStatus::Running, 40.0),
            Step::Status(TaskStatus::Completed, 100.0),
        ]);
        let slot = slot(&backend, config(30));
        let mut rx = slot.subscribe();

        let task_id = slot.submit(&request()).await.unwrap();
        assert_eq!(task_id, "task-1");

        let mut progress_seen = Vec::new();
        while rx.changed().await.is_ok() {
            let state = rx.borrow_and_update().clone();
            if let Some(progress) = state.progress() {
                progress_seen.push(progress);
            }
            if state.is_terminal() {
                break;
            }
        }
        assert!(progress_seen.contains(&40));

        assert_eq!(
            slot.state(),
            TaskState::Completed {
                task_id: "task-1".to_string(),
                result: Plan { score: 71 }
            }
        );
        assert_eq!(backend.result_calls.load(Ordering::SeqCst), 1);
        assert_eq!(backend.status_calls(), 2);

        // The loop has stopped: no more traffic.
        sleep(Duration::from_millis(120)).await;
        assert_eq!(backend.status_calls(), 2);
        assert_eq!(backend.result_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failed_status_is_terminal() {
        let backend = ScriptedBackend::new(vec![Step::FailedWith(Some("Solver crashed"))]);
        let slot = slot(&backend, config(10));
        slot.submit(&request()).await.unwrap();

        match slot.wait().await {
            TaskState::Failed { task_id, error } => {
                assert_eq!(task_id.as_deref(), Some("task-1"));
                assert_eq!(error, "Solver crashed");
            }
            other => panic!("Expected failure, got {other:?}"),
        }
        assert_eq!(backend.result_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_failed_status_without_message() {
        let backend = ScriptedBackend::new(vec![Step::FailedWith(None)]);
        let slot = slot(&backend, config(10));
        let err = slot.run_to_completion(&request()).await.unwrap_err();
        assert_eq!(err.to_string(), "Task failed without an error message");
    }

    #[tokio::test]
    async fn test_transient_errors_are_retried() {
        let backend = ScriptedBackend::new(vec![
            Step::Unreachable,
            Step::Unreachable,
            Step::Status(TaskStatus::Running, 60.0),
            Step::Unreachable,
            Step::Status(TaskStatus::Completed, 100.0),
        ]);
        let slot = slot(&backend, config(10));
        let plan = slot.run_to_completion(&request()).await.unwrap();
        assert_eq!(plan, Plan { score: 71 });
        assert_eq!(backend.status_calls(), 5);
    }

    #[tokio::test]
    async fn test_error_budget_exhausted() {
        let backend = ScriptedBackend::new((0..10).map(|_| Step::Unreachable).collect());
        let slot = slot(&backend, config(10));
        let err = slot.run_to_completion(&request()).await.unwrap_err();
        assert!(err.to_string().contains("after 5 attempts"));
        assert_eq!(backend.status_calls(), 5);
    }

    #[tokio::test]
    async fn test_timeout() {
        let backend = ScriptedBackend::new(vec![]);
        let slot = slot(
            &backend,
            PollConfig {
                timeout: Some(Duration::from_millis(50)),
                ..config(10)
            },
        );
        let err = slot.run_to_completion(&request()).await.unwrap_err();
        assert!(err.to_string().contains("timed out"));
    }

    #[tokio::test]
    async fn test_submit_rejected_while_polling() {
        let backend = ScriptedBackend::new(vec![]);
        let slot = slot(&backend, config(10));
        slot.submit(&request()).await.unwrap();

        let err = slot.submit(&request()).await.unwrap_err();
        assert!(err.to_string().contains("already in progress"));
        assert_eq!(backend.submit_calls.load(Ordering::SeqCst), 1);
        assert!(matches!(slot.state(), TaskState::Polling { ref task_id, .. } if task_id == "task-1"));

        // Only one loop is running: calls grow at one per interval, not two.
        sleep(Duration::from_millis(105)).await;
        assert!(backend.status_calls() <= 11);
    }

    #[tokio::test]
    async fn test_cancel_stops_polling_and_allows_resubmit() {
        let backend = ScriptedBackend::new(vec![]);
        let slot = slot(&backend, config(10));
        slot.submit(&request()).await.unwrap();
        sleep(Duration::from_millis(35)).await;

        assert!(slot.cancel());
        assert_eq!(slot.state(), TaskState::Cancelled);
        let calls = backend.status_calls();
        sleep(Duration::from_millis(60)).await;
        assert_eq!(backend.status_calls(), calls);
        assert!(!slot.cancel());

        let task_id = slot.submit(&request()).await.unwrap();
        assert_eq!(task_id, "task-2");
        assert!(slot.cancel());
    }

    #[tokio::test]
    async fn test_cancel_during_submit_discards_receipt() {
        let backend = ScriptedBackend::with_submit_delay(
            vec![Step::Status(TaskStatus::Completed, 100.0)],
            Duration::from_millis(60),
        );
        let slot = Arc::new(slot(&backend, config(10)));

        let pending = {
            let slot = Arc::clone(&slot);
            tokio::spawn(async move { slot.submit(&request()).await })
        };
        sleep(Duration::from_millis(20)).await;
        assert_eq!(slot.state(), TaskState::Submitting);
        assert!(slot.cancel());

        let err = pending.await.unwrap().unwrap_err();
        assert!(err.to_string().contains("cancelled"));
        sleep(Duration::from_millis(40)).await;
        assert_eq!(slot.state(), TaskState::Cancelled);
        assert_eq!(backend.status_calls(), 0);
    }

    #[tokio::test]
    async fn test_stale_update_is_ignored() {
        let backend = ScriptedBackend::new(vec![]);
        let slot = slot(&backend, config(1000));
        slot.submit(&request()).await.unwrap();
        let stale_generation = slot.shared.lock().generation;
        slot.cancel();
        slot.submit(&request()).await.unwrap();

        let applied = slot.shared.apply(
            stale_generation,
            Some("task-1"),
            TaskState::Completed {
                task_id: "task-1".to_string(),
                result: Plan { score: 1 },
            },
        );
        assert!(!applied);
        assert!(matches!(slot.state(), TaskState::Polling { ref task_id, .. } if task_id == "task-2"));
        slot.cancel();
    }

    #[tokio::test]
    async fn test_drop_stops_poller() {
        let backend = ScriptedBackend::new(vec![]);
        {
            let slot = slot(&backend, config(10));
            slot.submit(&request()).await.unwrap();
            sleep(Duration::from_millis(25)).await;
        }
        let calls = backend.status_calls();
        sleep(Duration::from_millis(60)).await;
        assert_eq!(backend.status_calls(), calls);
    }

    #[tokio::test]
    async fn test_client_hands_out_independent_slots() {
        let backend = ScriptedBackend::new(vec![]);
        let client = TaskClient::new(backend.clone(), config(10));
        let first: TaskSlot<Plan> = client.slot(TaskKind::WildcardTrajectory);
        let second: TaskSlot<Plan> = client.slot(TaskKind::WildcardTrajectory);

        first.submit(&request()).await.unwrap();
        assert!(second.submit(&request()).await.is_ok());
        assert!(first.cancel());
        assert!(second.cancel());
    }

    #[tokio::test]
    async fn test_wrong_kind_rejected() {
        let backend = ScriptedBackend::new(vec![]);
        let slot: TaskSlot<Plan> =
            TaskSlot::new(TaskKind::DailySnapshot, backend.clone(), config(10));
        assert!(slot.submit(&request()).await.is_err());
        assert_eq!(backend.submit_calls.load(Ordering::SeqCst), 0);
        assert_eq!(slot.state(), TaskState::Idle);
    }
}
