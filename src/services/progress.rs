//! Progress reporting and cancellation for episode runs.
//!
//! The pipeline reports once per finished beat. The CLI shows a bar;
//! library callers and tests use `NoopProgressReporter`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use indicatif::{ProgressBar, ProgressStyle};

/// Reports progress for long-running operations.
///
/// `current` counts finished beats out of `total`.
#[async_trait]
pub trait ProgressReporter: Send + Sync {
    /// Report progress. Implementations never fail the caller.
    async fn report(&self, current: usize, total: usize, message: Option<String>);

    /// Called once when the run ends, cancelled or not.
    async fn finish(&self) {}
}

/// No-op reporter for library callers and tests.
pub struct NoopProgressReporter;

#[async_trait]
impl ProgressReporter for NoopProgressReporter {
    async fn report(&self, _current: usize, _total: usize, _message: Option<String>) {}
}

/// Shorthand for creating a no-op reporter.
pub fn noop_progress() -> Arc<dyn ProgressReporter> {
    Arc::new(NoopProgressReporter)
}

/// Terminal progress bar on stderr.
pub struct BarProgressReporter {
    bar: ProgressBar,
}

impl BarProgressReporter {
    pub fn new(total: usize) -> Self {
        let bar = ProgressBar::new(total as u64);
        let style = ProgressStyle::with_template("{spinner:.cyan} [{bar:30.cyan/blue}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=> ");
        bar.set_style(style);
        bar.enable_steady_tick(Duration::from_millis(120));
        Self { bar }
    }
}

#[async_trait]
impl ProgressReporter for BarProgressReporter {
    async fn report(&self, current: usize, total: usize, message: Option<String>) {
        self.bar.set_length(total as u64);
        self.bar.set_position(current as u64);
        if let Some(message) = message {
            self.bar.set_message(message);
        }
    }

    async fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

/// Shared cancellation signal for a batch.
///
/// Checked between beats: beats already started finish, the rest are skipped.
#[derive(Debug, Clone, Default)]
pub struct CancellationFlag(Arc<AtomicBool>);

impl CancellationFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}
