//! Panic handling while the TUI owns the terminal.
//!
//! Producer panics and handler panics are caught by the shell and reported
//! as display text, so the hook must leave the screen alone. The terminal is
//! only restored when a panic unwinds out of the UI loop itself, see
//! [`RestoreOnUnwind`].

use std::panic::{self, PanicHookInfo};
use std::sync::Arc;

use parking_lot::Mutex;

type Hook = Box<dyn Fn(&PanicHookInfo<'_>) + Sync + Send + 'static>;

#[derive(Debug, Default)]
struct Record {
    count: usize,
    last: Option<String>,
}

/// Panics seen since the hook was installed.
#[derive(Debug, Clone, Default)]
pub struct PanicLog {
    record: Arc<Mutex<Record>>,
}

impl PanicLog {
    /// Number of panics recorded.
    pub fn count(&self) -> usize {
        self.record.lock().count
    }

    /// Message and location of the most recent panic.
    pub fn last(&self) -> Option<String> {
        self.record.lock().last.clone()
    }

    pub(crate) fn push(&self, message: String) {
        let mut record = self.record.lock();
        record.count += 1;
        record.last = Some(message);
    }
}

/// Replaces the process panic hook with one that records into a [`PanicLog`]
/// and emits a `tracing` error. The previous hook comes back on drop.
pub struct PanicHookGuard {
    log: PanicLog,
    previous: Option<Hook>,
}

impl PanicHookGuard {
    pub fn install() -> Self {
        let log = PanicLog::default();
        let previous = panic::take_hook();

        let hook_log = log.clone();
        panic::set_hook(Box::new(move |info| {
            let message = describe(info);
            tracing::error!(panic = %message, "panic captured");
            hook_log.push(message);
        }));

        Self {
            log,
            previous: Some(previous),
        }
    }

    pub fn log(&self) -> &PanicLog {
        &self.log
    }
}

impl Drop for PanicHookGuard {
    fn drop(&mut self) {
        // set_hook panics on a panicking thread.
        if std::thread::panicking() {
            return;
        }
        if let Some(previous) = self.previous.take() {
            panic::set_hook(previous);
        }
    }
}

/// Runs `restore` on drop, but only while the thread is unwinding.
pub struct RestoreOnUnwind<F: FnMut()> {
    restore: F,
}

impl<F: FnMut()> RestoreOnUnwind<F> {
    pub fn new(restore: F) -> Self {
        Self { restore }
    }
}

impl<F: FnMut()> Drop for RestoreOnUnwind<F> {
    fn drop(&mut self) {
        if std::thread::panicking() {
            (self.restore)();
        }
    }
}

fn describe(info: &PanicHookInfo<'_>) -> String {
    let payload = info.payload();
    let message = payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("panic");
    match info.location() {
        Some(loc) => format!("{message} at {}:{}", loc.file(), loc.line()),
        None => message.to_string(),
    }
}
