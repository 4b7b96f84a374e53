//! Percentage progress reporting for long-running sort and undo operations.
//!
//! Operations push integer percentages into a [`ProgressSink`] synchronously, in
//! processing order. Closures, `mpsc::Sender<u8>` and [`NoProgress`] all implement
//! the trait, so callers pick whether to print, forward to another thread, or ignore.

use std::sync::mpsc::Sender;

/// Receives progress updates as integer percentages in `0..=100`.
pub trait ProgressSink {
    fn report(&self, percent: u8);
}

impl<F> ProgressSink for F
where
    F: Fn(u8),
{
    fn report(&self, percent: u8) {
        self(percent)
    }
}

/// Forwards updates over a channel. A dropped receiver is ignored; delivery is best-effort.
impl ProgressSink for Sender<u8> {
    fn report(&self, percent: u8) {
        let _ = self.send(percent);
    }
}

/// Sink that discards every update.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn report(&self, _percent: u8) {}
}

/// Counts processed items against a fixed total and emits rounded percentages.
pub struct ProgressTracker<'a> {
    total: usize,
    processed: usize,
    sink: &'a dyn ProgressSink,
}

impl<'a> ProgressTracker<'a> {
    pub fn new(total: usize, sink: &'a dyn ProgressSink) -> Self {
        Self {
            total,
            processed: 0,
            sink,
        }
    }

    /// Marks one more item as processed and emits the new percentage.
    pub fn advance(&mut self) {
        if self.total == 0 {
            return;
        }
        self.processed = (self.processed + 1).min(self.total);
        self.sink.report(percent(self.processed, self.total));
    }
}

/// `round(processed / total * 100)` with halves rounded up. Zero when `total` is zero.
pub fn percent(processed: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    let processed = processed.min(total);
    ((processed * 100 + total / 2) / total) as u8
}
