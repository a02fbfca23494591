//! Background task supervisor.
//!
//! Each task calls its producer, sends the returned text to the display sink,
//! then waits for its interval. Cancellation is cooperative: the token is
//! checked before and after every producer call and interrupts the interval
//! wait, but an in-flight producer call always runs to completion. A producer
//! that never returns makes [`Supervisor::stop_all`] wait forever;
//! [`Supervisor::stop_all_within`] bounds that wait.
//!
//! A producer that panics ends only its own task. The panic is logged and
//! reported on the display sink.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::{JoinError, JoinHandle};
use tokio_util::sync::CancellationToken;

use crate::session::DisplaySink;

/// Produces the text shown on each tick.
pub type Producer = Arc<dyn Fn() -> String + Send + Sync>;

/// Identifier assigned to each started task.
pub type TaskId = u64;

/// Handle to one background task.
#[derive(Debug, Clone)]
pub struct TaskHandle {
    id: TaskId,
    name: Arc<str>,
    token: CancellationToken,
}

impl TaskHandle {
    /// Task identifier.
    pub fn id(&self) -> TaskId {
        self.id
    }

    /// Name given at start.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Signal the task to stop. Does not wait.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Whether cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

/// How a task's worker ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskExit {
    /// Stopped by its cancellation token.
    Cancelled,
    /// The producer panicked.
    Failed,
}

/// Summary of one tracked task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskInfo {
    pub id: TaskId,
    pub name: String,
    pub interval: Duration,
    /// The worker has exited (cancelled or failed) but not yet been reclaimed.
    pub finished: bool,
}

/// Result of a bounded [`Supervisor::stop_all_within`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StopReport {
    /// Tasks that exited within the timeout.
    pub stopped: usize,
    /// Tasks still running when the timeout expired; they are detached.
    pub timed_out: usize,
}

struct TaskEntry {
    handle: TaskHandle,
    interval: Duration,
    join: JoinHandle<TaskExit>,
}

struct Inner {
    sink: Arc<dyn DisplaySink>,
    tasks: Mutex<Vec<TaskEntry>>,
    next_id: AtomicU64,
}

/// Owns every background task of a session.
#[derive(Clone)]
pub struct Supervisor {
    inner: Arc<Inner>,
}

impl Supervisor {
    /// Create a supervisor whose tasks write to `sink`.
    pub fn new(sink: Arc<dyn DisplaySink>) -> Self {
        Self {
            inner: Arc::new(Inner {
                sink,
                tasks: Mutex::new(Vec::new()),
                next_id: AtomicU64::new(1),
            }),
        }
    }

    /// Spawn a repeating task.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start(&self, name: impl Into<String>, interval: Duration, producer: Producer) -> TaskHandle {
        let handle = TaskHandle {
            id: self.inner.next_id.fetch_add(1, Ordering::Relaxed),
            name: Arc::from(name.into()),
            token: CancellationToken::new(),
        };

        let join = tokio::spawn(run_task(
            handle.clone(),
            interval,
            producer,
            self.inner.sink.clone(),
        ));

        tracing::info!(
            task_id = handle.id,
            name = %handle.name,
            interval_ms = interval.as_millis() as u64,
            "started background task"
        );

        self.inner.tasks.lock().push(TaskEntry {
            handle: handle.clone(),
            interval,
            join,
        });
        handle
    }

    /// Cancel one task and wait for it. Returns false if `id` is unknown.
    pub async fn cancel(&self, id: TaskId) -> bool {
        let entry = {
            let mut tasks = self.inner.tasks.lock();
            let Some(pos) = tasks.iter().position(|t| t.handle.id == id) else {
                return false;
            };
            tasks.remove(pos)
        };

        entry.handle.cancel();
        reap(entry).await;
        true
    }

    /// Cancel every task and wait until all have exited.
    ///
    /// Returns the number of tasks reclaimed.
    pub async fn stop_all(&self) -> usize {
        let entries = self.drain();
        let count = entries.len();
        futures::future::join_all(entries.into_iter().map(reap)).await;

        tracing::info!(count, "stopped all background tasks");
        count
    }

    /// Cancel every task, waiting at most `timeout` for them to exit.
    pub async fn stop_all_within(&self, timeout: Duration) -> StopReport {
        let entries = self.drain();
        let deadline = tokio::time::Instant::now() + timeout;
        let mut report = StopReport::default();

        for mut entry in entries {
            match tokio::time::timeout_at(deadline, &mut entry.join).await {
                Ok(result) => {
                    log_exit(&entry.handle, result);
                    report.stopped += 1;
                }
                Err(_) => {
                    tracing::warn!(
                        task_id = entry.handle.id,
                        name = %entry.handle.name,
                        "background task did not stop in time, detaching"
                    );
                    entry.join.abort();
                    report.timed_out += 1;
                }
            }
        }

        tracing::info!(stopped = report.stopped, timed_out = report.timed_out, "stopped background tasks");
        report
    }

    /// Tracked tasks, in start order.
    pub fn tasks(&self) -> Vec<TaskInfo> {
        self.inner
            .tasks
            .lock()
            .iter()
            .map(|t| TaskInfo {
                id: t.handle.id,
                name: t.handle.name.to_string(),
                interval: t.interval,
                finished: t.join.is_finished(),
            })
            .collect()
    }

    /// Number of tracked tasks, including finished ones not yet reclaimed.
    pub fn len(&self) -> usize {
        self.inner.tasks.lock().len()
    }

    /// Whether no tasks are tracked.
    pub fn is_empty(&self) -> bool {
        self.inner.tasks.lock().is_empty()
    }

    fn drain(&self) -> Vec<TaskEntry> {
        let entries = std::mem::take(&mut *self.inner.tasks.lock());
        for entry in &entries {
            entry.handle.cancel();
        }
        entries
    }
}

impl std::fmt::Debug for Supervisor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Supervisor").field("tasks", &self.len()).finish()
    }
}

async fn reap(entry: TaskEntry) {
    let result = entry.join.await;
    log_exit(&entry.handle, result);
}

fn log_exit(handle: &TaskHandle, result: Result<TaskExit, JoinError>) {
    match result {
        Ok(exit) => tracing::debug!(task_id = handle.id, name = %handle.name, ?exit, "background task exited"),
        Err(e) => tracing::warn!(task_id = handle.id, name = %handle.name, error = %e, "background task aborted"),
    }
}

async fn run_task(
    handle: TaskHandle,
    interval: Duration,
    producer: Producer,
    sink: Arc<dyn DisplaySink>,
) -> TaskExit {
    loop {
        if handle.is_cancelled() {
            return TaskExit::Cancelled;
        }

        let produce = producer.clone();
        match tokio::task::spawn_blocking(move || produce()).await {
            Ok(text) => {
                if handle.is_cancelled() {
                    return TaskExit::Cancelled;
                }
                sink.display(&text);
            }
            Err(e) => {
                let reason = failure_reason(e);
                tracing::error!(
                    task_id = handle.id,
                    name = %handle.name,
                    reason = %reason,
                    "background task producer failed"
                );
                sink.display(&format!("background task '{}' failed: {}", handle.name, reason));
                return TaskExit::Failed;
            }
        }

        tokio::select! {
            _ = handle.token.cancelled() => return TaskExit::Cancelled,
            _ = tokio::time::sleep(interval) => {}
        }
    }
}

fn failure_reason(err: JoinError) -> String {
    if !err.is_panic() {
        return err.to_string();
    }
    let payload = err.into_panic();
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    /// Records every write, in order.
    #[derive(Default)]
    struct Recorder {
        writes: Mutex<Vec<String>>,
    }

    impl Recorder {
        fn take(&self) -> Vec<String> {
            std::mem::take(&mut *self.writes.lock())
        }
    }

    impl DisplaySink for Recorder {
        fn display(&self, text: &str) {
            self.writes.lock().push(text.to_string());
        }
    }

    fn setup() -> (Arc<Recorder>, Supervisor) {
        let recorder = Arc::new(Recorder::default());
        let supervisor = Supervisor::new(recorder.clone());
        (recorder, supervisor)
    }

    fn constant(text: &'static str) -> Producer {
        Arc::new(move || text.to_string())
    }

    const TICK: Duration = Duration::from_millis(10);

    #[tokio::test]
    async fn test_task_repeats_until_stopped() {
        let (recorder, supervisor) = setup();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        supervisor.start(
            "count",
            TICK,
            Arc::new(move || format!("n={}", counter.fetch_add(1, Ordering::SeqCst))),
        );

        tokio::time::sleep(Duration::from_millis(120)).await;
        assert_eq!(supervisor.stop_all().await, 1);
        assert!(supervisor.is_empty());

        let writes = recorder.take();
        assert!(writes.len() >= 2, "expected repeated output, got {writes:?}");
        assert_eq!(writes[0], "n=0");
        assert_eq!(writes[1], "n=1");

        let after = calls.load(Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(calls.load(Ordering::SeqCst), after);
        assert!(recorder.take().is_empty());
    }

    #[tokio::test]
    async fn test_cancelling_one_leaves_other_running() {
        let (recorder, supervisor) = setup();
        let a = supervisor.start("a", TICK, constant("a"));
        supervisor.start("b", TICK, constant("b"));

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(supervisor.cancel(a.id()).await);
        assert!(a.is_cancelled());
        assert!(!supervisor.cancel(a.id()).await);
        recorder.take();

        tokio::time::sleep(Duration::from_millis(60)).await;
        let writes = recorder.take();
        assert!(writes.iter().any(|w| w == "b"));
        assert!(writes.iter().all(|w| w != "a"));

        assert_eq!(supervisor.tasks().len(), 1);
        assert_eq!(supervisor.stop_all().await, 1);
    }

    #[tokio::test]
    async fn test_long_interval_stops_promptly() {
        let (recorder, supervisor) = setup();
        supervisor.start("slow", Duration::from_secs(3600), constant("tick"));

        tokio::time::sleep(Duration::from_millis(30)).await;
        let stopped = tokio::time::timeout(Duration::from_secs(2), supervisor.stop_all()).await;
        assert_eq!(stopped.unwrap(), 1);
        assert_eq!(recorder.take(), vec!["tick"]);
    }

    #[tokio::test]
    async fn test_producer_panic_is_isolated() {
        let (recorder, supervisor) = setup();
        supervisor.start("boom", TICK, Arc::new(|| -> String { panic!("kaboom") }));
        supervisor.start("steady", TICK, constant("ok"));

        tokio::time::sleep(Duration::from_millis(80)).await;

        let tasks = supervisor.tasks();
        let boom = tasks.iter().find(|t| t.name == "boom").unwrap();
        let steady = tasks.iter().find(|t| t.name == "steady").unwrap();
        assert!(boom.finished);
        assert!(!steady.finished);

        let writes = recorder.take();
        assert!(writes.contains(&"background task 'boom' failed: kaboom".to_string()));
        assert!(writes.iter().filter(|w| *w == "ok").count() >= 2);

        assert_eq!(supervisor.stop_all().await, 2);
    }

    #[tokio::test]
    async fn test_stop_all_within_detaches_stuck_task() {
        let (_recorder, supervisor) = setup();
        supervisor.start(
            "stuck",
            TICK,
            Arc::new(|| {
                std::thread::sleep(Duration::from_millis(400));
                "late".to_string()
            }),
        );
        supervisor.start("quick", TICK, constant("q"));

        tokio::time::sleep(Duration::from_millis(30)).await;
        let report = supervisor.stop_all_within(Duration::from_millis(50)).await;
        assert_eq!(report, StopReport { stopped: 1, timed_out: 1 });
        assert!(supervisor.is_empty());
    }

    #[tokio::test]
    async fn test_ids_are_unique() {
        let (_recorder, supervisor) = setup();
        let a = supervisor.start("a", TICK, constant("a"));
        let b = supervisor.start("b", TICK, constant("b"));
        assert_ne!(a.id(), b.id());
        assert_eq!(b.name(), "b");
        supervisor.stop_all().await;
    }
}
