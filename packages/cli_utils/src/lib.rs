#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Terminal helpers for the gfw-alerts binaries.
//!
//! [`IndicatifProgress`] renders the pipeline's [`ProgressCallback`]
//! updates as `indicatif` bars, and [`init_logger`] routes `log` output
//! through the same [`MultiProgress`] so log lines and bars never
//! overwrite each other.

use std::sync::{Arc, Mutex, PoisonError};

use gfw_alerts_pipeline::progress::ProgressCallback;
use indicatif::{ProgressBar, ProgressStyle};

pub use indicatif::MultiProgress;

/// Renders each pipeline stage as its own `indicatif` bar.
///
/// Finished stages stay on screen with their result; the next stage gets a
/// fresh bar below them.
pub struct IndicatifProgress {
    multi: MultiProgress,
    style: ProgressStyle,
    current: Mutex<Option<ProgressBar>>,
}

impl IndicatifProgress {
    #[must_use]
    pub fn stages(multi: &MultiProgress) -> Arc<dyn ProgressCallback> {
        let style = ProgressStyle::with_template(
            "{msg:<20} {wide_bar:.cyan/dim} {pos}/{len} {percent}% [{eta}]",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("##-");

        Arc::new(Self {
            multi: multi.clone(),
            style,
            current: Mutex::new(None),
        })
    }

    fn with_bar(&self, f: impl FnOnce(&ProgressBar)) {
        let current = self.current.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(bar) = current.as_ref() {
            f(bar);
        }
    }
}

impl ProgressCallback for IndicatifProgress {
    fn start(&self, stage: &str, total: u64) {
        let bar = self.multi.add(ProgressBar::new(total));
        bar.set_style(self.style.clone());
        bar.set_message(stage.to_string());

        let mut current = self.current.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(previous) = current.replace(bar).filter(|p| !p.is_finished()) {
            previous.abandon();
        }
    }

    fn inc(&self, delta: u64) {
        self.with_bar(|bar| bar.inc(delta));
    }

    fn finish(&self, result: &str) {
        self.with_bar(|bar| bar.finish_with_message(result.to_string()));
    }
}

/// Installs `pretty_env_logger` (level from `RUST_LOG`) behind
/// `indicatif-log-bridge`.
///
/// Returns the [`MultiProgress`] every bar must be added to.
#[must_use]
pub fn init_logger() -> MultiProgress {
    let multi = MultiProgress::new();

    let logger = pretty_env_logger::formatted_builder()
        .parse_env("RUST_LOG")
        .build();
    let level = logger.filter();

    // Fails only if a logger is already installed.
    indicatif_log_bridge::LogWrapper::new(multi.clone(), logger)
        .try_init()
        .ok();

    log::set_max_level(level);

    multi
}

#[cfg(test)]
mod tests {
    use indicatif::ProgressDrawTarget;

    use super::*;

    fn current_bar(progress: &IndicatifProgress) -> ProgressBar {
        progress.current.lock().unwrap().clone().unwrap()
    }

    #[test]
    fn each_stage_gets_its_own_bar() {
        let multi = MultiProgress::with_draw_target(ProgressDrawTarget::hidden());
        let progress = IndicatifProgress {
            multi,
            style: ProgressStyle::default_bar(),
            current: Mutex::new(None),
        };

        progress.start("Joining alerts", 10);
        progress.inc(3);
        let joining = current_bar(&progress);
        assert_eq!(joining.length(), Some(10));
        assert_eq!(joining.position(), 3);
        progress.finish("Joined 10 alerts");
        assert!(joining.is_finished());

        progress.start("Clustering alerts", 2);
        let clustering = current_bar(&progress);
        assert_eq!(clustering.length(), Some(2));
        assert_eq!(clustering.position(), 0);
        assert!(!clustering.is_finished());
    }

    #[test]
    fn updates_before_start_are_ignored() {
        let multi = MultiProgress::with_draw_target(ProgressDrawTarget::hidden());
        let progress = IndicatifProgress::stages(&multi);
        progress.inc(5);
        progress.finish("nothing");
    }
}
