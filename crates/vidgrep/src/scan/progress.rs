use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

/// Frame counter shown while scanning; a no-op when hidden.
#[derive(Debug, Clone, Default)]
pub struct ScanProgress {
    bar: Option<ProgressBar>,
}

impl ScanProgress {
    pub fn hidden() -> Self {
        Self::default()
    }

    /// Bar sized to the number of frames the stride will visit.
    pub fn visible(frame_count: u64, frame_skip: u64) -> Self {
        let total = frame_count.div_ceil(frame_skip.max(1));
        let bar = ProgressBar::new(total);
        bar.set_style(bar_style());
        bar.enable_steady_tick(Duration::from_millis(100));
        Self { bar: Some(bar) }
    }

    pub(crate) fn frame_done(&self) {
        if let Some(bar) = &self.bar {
            bar.inc(1);
        }
    }

    pub(crate) fn finish(&self, stopped_early: bool) {
        let Some(bar) = &self.bar else {
            return;
        };
        if stopped_early {
            bar.abandon_with_message("stopped: match limit reached");
        } else {
            bar.finish_with_message("done");
        }
    }
}

fn bar_style() -> ProgressStyle {
    ProgressStyle::with_template(
        "{bar:40.cyan/blue} {percent:>3}% {pos}/{len} frames [{elapsed_precise}<{eta_precise}] {msg}",
    )
    .unwrap_or_else(|_| ProgressStyle::default_bar())
}
