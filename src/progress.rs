//! Progress reporting and coarse cancellation between regions.

use std::sync::atomic::{AtomicBool, Ordering};

/// Emitted once after each region has been inpainted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressReport {
    /// Regions finished so far, including the one just completed.
    pub completed: usize,
    /// Regions in the batch.
    pub total: usize,
}

impl ProgressReport {
    /// Build a report for `completed` of `total` regions.
    #[must_use]
    pub fn new(completed: usize, total: usize) -> Self {
        Self { completed, total }
    }

    /// Completion percentage in `[0, 100]`.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn percent(&self) -> f32 {
        if self.total == 0 {
            return 100.0;
        }
        self.completed.min(self.total) as f32 / self.total as f32 * 100.0
    }
}

/// Receiver of [`ProgressReport`]s.
///
/// Any `FnMut(ProgressReport)` closure is a sink. Use [`NoProgress`] when
/// nothing needs to be reported.
pub trait ProgressSink {
    /// Called synchronously after each region completes.
    fn report(&mut self, report: ProgressReport);

    /// Polled before each region starts. Returning `true` stops the batch.
    fn is_cancelled(&self) -> bool {
        false
    }
}

impl<F: FnMut(ProgressReport)> ProgressSink for F {
    fn report(&mut self, report: ProgressReport) {
        self(report);
    }
}

/// A sink that ignores every report.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn report(&mut self, _report: ProgressReport) {}
}

/// Wraps a sink with a shared cancellation flag.
///
/// Setting the flag from another thread stops processing before the next
/// region; the region in flight always completes.
#[derive(Debug)]
pub struct Cancellable<'a, S> {
    sink: S,
    flag: &'a AtomicBool,
}

impl<'a, S: ProgressSink> Cancellable<'a, S> {
    /// Attach `flag` to `sink`.
    #[must_use]
    pub fn new(sink: S, flag: &'a AtomicBool) -> Self {
        Self { sink, flag }
    }
}

impl<S: ProgressSink> ProgressSink for Cancellable<'_, S> {
    fn report(&mut self, report: ProgressReport) {
        self.sink.report(report);
    }

    fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed) || self.sink.is_cancelled()
    }
}
