//! Display sink and the session handle given to command handlers.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use crate::supervisor::{StopReport, Supervisor, TaskHandle};

/// Destination for rendered text.
///
/// Written by foreground commands and every background task. Writes replace
/// the visible content; the last writer wins.
pub trait DisplaySink: Send + Sync {
    /// Replace the visible output with `text`.
    fn display(&self, text: &str);
}

/// Snapshot of a [`DisplayBuffer`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DisplayState {
    /// Currently visible text.
    pub text: String,
    /// Incremented on every write.
    pub version: u64,
}

/// Mutex-guarded last-writer-wins output region.
#[derive(Debug, Default)]
pub struct DisplayBuffer {
    state: Mutex<DisplayState>,
}

impl DisplayBuffer {
    /// Create a buffer showing `initial`.
    pub fn new(initial: impl Into<String>) -> Self {
        Self {
            state: Mutex::new(DisplayState {
                text: initial.into(),
                version: 0,
            }),
        }
    }

    /// Copy of the current state.
    pub fn snapshot(&self) -> DisplayState {
        self.state.lock().clone()
    }

    /// Current version; cheap check for "changed since last render".
    pub fn version(&self) -> u64 {
        self.state.lock().version
    }

    /// Current text.
    pub fn text(&self) -> String {
        self.state.lock().text.clone()
    }
}

impl DisplaySink for DisplayBuffer {
    fn display(&self, text: &str) {
        let mut state = self.state.lock();
        state.text.clear();
        state.text.push_str(text);
        state.version += 1;
    }
}

/// Sink that discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl DisplaySink for NullSink {
    fn display(&self, text: &str) {
        tracing::trace!(len = text.len(), "discarding display update");
    }
}

/// Handle shared between the shell and command handlers.
///
/// Cloning is cheap; all clones share one sink and one supervisor.
#[derive(Clone)]
pub struct Session {
    sink: Arc<dyn DisplaySink>,
    supervisor: Supervisor,
}

impl Session {
    /// Create a session writing to `sink`.
    pub fn new(sink: Arc<dyn DisplaySink>) -> Self {
        Self {
            supervisor: Supervisor::new(sink.clone()),
            sink,
        }
    }

    /// A session whose output goes nowhere.
    pub fn detached() -> Self {
        Self::new(Arc::new(NullSink))
    }

    /// Replace the visible output.
    pub fn display(&self, text: &str) {
        self.sink.display(text);
    }

    /// Run `producer` every `interval` and display its result until cancelled.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start_interval_process<F>(
        &self,
        name: impl Into<String>,
        interval: Duration,
        producer: F,
    ) -> TaskHandle
    where
        F: Fn() -> String + Send + Sync + 'static,
    {
        self.supervisor.start(name, interval, Arc::new(producer))
    }

    /// Cancel every background task and wait for all of them to exit.
    pub async fn stop_all(&self) -> usize {
        self.supervisor.stop_all().await
    }

    /// Like [`stop_all`](Self::stop_all), but gives up waiting after `timeout`.
    pub async fn stop_all_within(&self, timeout: Duration) -> StopReport {
        self.supervisor.stop_all_within(timeout).await
    }

    /// The background task supervisor.
    pub fn supervisor(&self) -> &Supervisor {
        &self.supervisor
    }

    /// The display sink.
    pub fn sink(&self) -> &Arc<dyn DisplaySink> {
        &self.sink
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("supervisor", &self.supervisor)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_buffer_replaces() {
        let buffer = DisplayBuffer::new("help");
        assert_eq!(buffer.snapshot(), DisplayState { text: "help".into(), version: 0 });

        buffer.display("one");
        buffer.display("two");
        assert_eq!(buffer.text(), "two");
        assert_eq!(buffer.version(), 2);
    }

    #[test]
    fn test_concurrent_writes_are_whole() {
        let buffer = Arc::new(DisplayBuffer::default());
        let writers: Vec<_> = (0..4)
            .map(|i| {
                let buffer = buffer.clone();
                std::thread::spawn(move || {
                    let text = i.to_string().repeat(256);
                    for _ in 0..100 {
                        buffer.display(&text);
                    }
                })
            })
            .collect();
        for w in writers {
            w.join().unwrap();
        }

        let state = buffer.snapshot();
        assert_eq!(state.version, 400);
        let first = state.text.chars().next().unwrap();
        assert!(state.text.chars().all(|c| c == first));
        assert_eq!(state.text.len(), 256);
    }

    #[test]
    fn test_session_display_goes_to_sink() {
        let buffer = Arc::new(DisplayBuffer::default());
        let session = Session::new(buffer.clone());
        session.clone().display("hello");
        assert_eq!(buffer.text(), "hello");
    }
}
