//! Run state and progress reporting for export and import runs.
//!
//! Counters live behind a cloneable [`ProgressHandle`] so another thread can
//! poll them while the run blocks on file I/O. Polling never mutates state.

use crate::error::Error;
use crate::message::MessageLog;
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

#[derive(Debug, Default)]
struct Counters {
    files_total: AtomicU64,
    files_processed: AtomicU64,
    finished: AtomicBool,
}

/// Shared, lock-free view of a run's counters.
#[derive(Debug, Clone, Default)]
pub struct ProgressHandle {
    inner: Arc<Counters>,
}

impl ProgressHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Zeroes the counters and clears `finished`.
    fn reset(&self) {
        self.inner.files_total.store(0, Ordering::SeqCst);
        self.inner.files_processed.store(0, Ordering::SeqCst);
        self.inner.finished.store(false, Ordering::SeqCst);
    }

    pub fn files_total(&self) -> u64 {
        self.inner.files_total.load(Ordering::SeqCst)
    }

    pub fn files_processed(&self) -> u64 {
        self.inner.files_processed.load(Ordering::SeqCst)
    }

    pub fn is_finished(&self) -> bool {
        self.inner.finished.load(Ordering::SeqCst)
    }

    /// Integer percentage `100 * processed / total`; `0` when nothing is counted yet.
    pub fn progress(&self) -> u64 {
        let total = self.files_total();
        if total == 0 {
            return 0;
        }
        100 * self.files_processed() / total
    }
}

/// State of a single export or import invocation.
#[derive(Debug)]
pub struct RunState {
    handle: ProgressHandle,
    messages: MessageLog,
}

impl RunState {
    /// Creates a fresh run with private counters.
    pub fn new() -> Self {
        Self::with_handle(ProgressHandle::new())
    }

    /// Creates a fresh run reporting through an existing handle.
    ///
    /// The handle is reset, so values left over from an earlier run on the
    /// same handle are never observed.
    pub fn with_handle(handle: ProgressHandle) -> Self {
        handle.reset();
        Self {
            handle,
            messages: MessageLog::new(),
        }
    }

    pub fn handle(&self) -> ProgressHandle {
        self.handle.clone()
    }

    /// Adds a pre-pass count to `files_total`.
    pub fn add_total(&self, count: u64) {
        self.handle
            .inner
            .files_total
            .fetch_add(count, Ordering::SeqCst);
    }

    pub fn inc_processed(&self) {
        self.handle
            .inner
            .files_processed
            .fetch_add(1, Ordering::SeqCst);
    }

    pub fn files_total(&self) -> u64 {
        self.handle.files_total()
    }

    pub fn files_processed(&self) -> u64 {
        self.handle.files_processed()
    }

    pub fn progress(&self) -> u64 {
        self.handle.progress()
    }

    pub fn messages(&self) -> &MessageLog {
        &self.messages
    }

    pub fn log(&mut self) -> &mut MessageLog {
        &mut self.messages
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Marks the run successful and appends the closing summary.
    pub fn finish(&mut self, summary: impl Into<String>) {
        self.messages.ok(summary);
        self.handle.inner.finished.store(true, Ordering::SeqCst);
    }

    /// Records a fatal error. `finished` stays false.
    pub fn fail(&mut self, context: &str, err: &Error) {
        self.messages.error(format!("{}: {}", context, err));
    }

    /// True when the run finished and logged no ERROR.
    pub fn succeeded(&self) -> bool {
        self.is_finished() && !self.messages.has_errors()
    }
}

impl Default for RunState {
    fn default() -> Self {
        Self::new()
    }
}

/// Terminal progress bar fed by polling a [`ProgressHandle`] on a helper thread.
pub struct ProgressWatcher {
    bar: ProgressBar,
    stop: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl ProgressWatcher {
    /// Starts polling `handle` every 100ms.
    pub fn spawn(handle: ProgressHandle, message: &str) -> Self {
        let bar = ProgressBar::new(0);
        if let Ok(style) =
            ProgressStyle::default_bar().template("{msg} [{bar:40.cyan/blue}] {pos}/{len} files")
        {
            bar.set_style(style.progress_chars("#>-"));
        }
        bar.set_message(message.to_string());

        let stop = Arc::new(AtomicBool::new(false));
        let thread = {
            let bar = bar.clone();
            let stop = stop.clone();
            std::thread::spawn(move || loop {
                bar.set_length(handle.files_total());
                bar.set_position(handle.files_processed());
                if stop.load(Ordering::SeqCst) {
                    break;
                }
                std::thread::sleep(Duration::from_millis(100));
            })
        };

        Self {
            bar,
            stop,
            thread: Some(thread),
        }
    }

    /// Stops polling and clears the bar.
    pub fn finish(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
        self.bar.finish_and_clear();
    }
}

impl Drop for ProgressWatcher {
    fn drop(&mut self) {
        if self.thread.is_some() {
            self.shutdown();
        }
    }
}
