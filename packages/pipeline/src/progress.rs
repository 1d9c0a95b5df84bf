//! Progress reporting for the pipeline's per-alert loops.
//!
//! Work is reported in stages (joining, clustering). Each stage is started
//! with its size, advanced unit by unit and finished with a one-line
//! result. The pipeline itself never renders anything: the CLI passes a
//! terminal implementation, library callers and tests pass
//! [`null_progress()`].

use std::sync::Arc;

/// Receives stage-by-stage progress from the pipeline.
pub trait ProgressCallback: Send + Sync {
    /// Begins a stage of `total` units.
    fn start(&self, stage: &str, total: u64);

    /// Advances the current stage.
    fn inc(&self, delta: u64);

    /// Ends the current stage.
    fn finish(&self, result: &str);
}

/// Ignores every update.
pub struct NullProgress;

impl ProgressCallback for NullProgress {
    fn start(&self, _stage: &str, _total: u64) {}
    fn inc(&self, _delta: u64) {}
    fn finish(&self, _result: &str) {}
}

#[must_use]
pub fn null_progress() -> Arc<dyn ProgressCallback> {
    Arc::new(NullProgress)
}

/// `usize` to progress units.
pub(crate) fn units(n: usize) -> u64 {
    u64::try_from(n).unwrap_or(u64::MAX)
}
