//! Events behind the Ctrl+L panel.
//!
//! Stdout belongs to the screen while the TUI runs, so shell and supervisor
//! events are kept in memory instead. Each entry is labelled with the command
//! key or background task it concerns, when the event names one.

use std::collections::VecDeque;
use std::fmt::Write as _;
use std::sync::Arc;

use parking_lot::Mutex;
use ratatui::style::Color;
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::Layer;
use tracing_subscriber::layer::Context;

const CAPACITY: usize = 500;

/// Fields that say which command or task an event is about.
const SUBJECT_FIELDS: [&str; 2] = ["key", "name"];

#[derive(Debug, Clone)]
pub struct LogEntry {
    pub level: Level,
    pub target: String,
    /// Command key or task name, if the event carried one.
    pub subject: Option<String>,
    /// Message, then `key=value` for every field that isn't the subject.
    pub message: String,
}

impl LogEntry {
    pub fn level_color(&self) -> Color {
        match self.level {
            Level::ERROR => Color::Red,
            Level::WARN => Color::Yellow,
            Level::INFO => Color::Green,
            Level::DEBUG => Color::Cyan,
            Level::TRACE => Color::DarkGray,
        }
    }

    pub fn level_prefix(&self) -> &'static str {
        match self.level {
            Level::ERROR => "ERR",
            Level::WARN => "WRN",
            Level::INFO => "INF",
            Level::DEBUG => "DBG",
            Level::TRACE => "TRC",
        }
    }

    /// Subject if known, else the last segment of the module path.
    pub fn label(&self) -> &str {
        match &self.subject {
            Some(subject) => subject,
            None => self.target.rsplit("::").next().unwrap_or(&self.target),
        }
    }
}

#[derive(Debug, Default)]
struct Entries {
    items: VecDeque<LogEntry>,
    generation: u64,
}

/// Shared between the tracing layer and the panel renderer.
#[derive(Debug, Clone, Default)]
pub struct LogBuffer {
    inner: Arc<Mutex<Entries>>,
}

impl LogBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Oldest first.
    pub fn entries(&self) -> Vec<LogEntry> {
        self.inner.lock().items.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().items.is_empty()
    }

    /// Bumped on every change; the panel repaints when it moves.
    pub fn generation(&self) -> u64 {
        self.inner.lock().generation
    }

    pub fn clear(&self) {
        let mut inner = self.inner.lock();
        inner.items.clear();
        inner.generation += 1;
    }

    fn push(&self, entry: LogEntry) {
        let mut inner = self.inner.lock();
        if inner.items.len() == CAPACITY {
            inner.items.pop_front();
        }
        inner.items.push_back(entry);
        inner.generation += 1;
    }
}

/// Layer installed in TUI mode in place of the stderr formatter.
pub struct TuiLogLayer {
    buffer: LogBuffer,
    min_level: Level,
}

impl TuiLogLayer {
    pub fn new(buffer: LogBuffer) -> Self {
        Self {
            buffer,
            min_level: Level::DEBUG,
        }
    }

    pub fn with_min_level(mut self, level: Level) -> Self {
        self.min_level = level;
        self
    }
}

#[derive(Default)]
struct EntryVisitor {
    message: String,
    subject: Option<String>,
    fields: String,
}

impl EntryVisitor {
    fn record(&mut self, name: &str, value: String) {
        if name == "message" {
            self.message = value;
        } else if self.subject.is_none() && SUBJECT_FIELDS.contains(&name) {
            self.subject = Some(value);
        } else {
            if !self.fields.is_empty() {
                self.fields.push(' ');
            }
            let _ = write!(self.fields, "{name}={value}");
        }
    }

    fn into_entry(self, level: Level, target: &str) -> LogEntry {
        let message = match (self.message.is_empty(), self.fields.is_empty()) {
            (_, true) => self.message,
            (true, false) => self.fields,
            (false, false) => format!("{} {}", self.message, self.fields),
        };
        LogEntry {
            level,
            target: target.to_string(),
            subject: self.subject,
            message,
        }
    }
}

impl Visit for EntryVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        self.record(field.name(), format!("{value:?}"));
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        self.record(field.name(), value.to_string());
    }
}

impl<S: Subscriber> Layer<S> for TuiLogLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let metadata = event.metadata();
        if *metadata.level() > self.min_level {
            return;
        }

        let mut visitor = EntryVisitor::default();
        event.record(&mut visitor);
        self.buffer
            .push(visitor.into_entry(*metadata.level(), metadata.target()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_subscriber::prelude::*;

    fn capture(min_level: Level, emit: impl FnOnce()) -> LogBuffer {
        let buffer = LogBuffer::new();
        let subscriber = tracing_subscriber::registry()
            .with(TuiLogLayer::new(buffer.clone()).with_min_level(min_level));
        tracing::subscriber::with_default(subscriber, emit);
        buffer
    }

    #[test]
    fn test_handler_events_are_labelled_by_key() {
        let buffer = capture(Level::INFO, || {
            tracing::warn!(key = "watch/counter", error = "invalid arguments", "handler failed");
            tracing::debug!(key = "watch/counter", "executing handler");
        });

        let entries = buffer.entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].label(), "watch/counter");
        assert_eq!(entries[0].message, "handler failed error=invalid arguments");
        assert_eq!(entries[0].level_prefix(), "WRN");
        assert_eq!(entries[0].level_color(), Color::Yellow);
    }

    #[test]
    fn test_unlabelled_events_fall_back_to_module() {
        let buffer = capture(Level::DEBUG, || {
            tracing::info!(stopped = 2, timed_out = 0, "stopped background tasks");
        });

        let entries = buffer.entries();
        assert!(entries[0].subject.is_none());
        assert!(entries[0].target.ends_with("logs::tests"));
        assert_eq!(entries[0].label(), "tests");
        assert_eq!(entries[0].message, "stopped background tasks stopped=2 timed_out=0");
    }

    #[test]
    fn test_oldest_entries_drop_and_generation_moves() {
        let buffer = LogBuffer::new();
        assert_eq!(buffer.generation(), 0);

        for i in 0..CAPACITY + 3 {
            buffer.push(LogEntry {
                level: Level::ERROR,
                target: "lcdiags_shell::supervisor".to_string(),
                subject: Some("clock".to_string()),
                message: i.to_string(),
            });
        }
        assert_eq!(buffer.len(), CAPACITY);
        assert_eq!(buffer.entries()[0].message, "3");
        assert_eq!(buffer.generation(), (CAPACITY + 3) as u64);

        buffer.clear();
        assert!(buffer.is_empty());
        assert_eq!(buffer.generation(), (CAPACITY + 4) as u64);
    }
}
