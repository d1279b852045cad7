use std::sync::Mutex;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

const TICK_CHARS: &str = "⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏";

/// Terminal progress for the `(stage, current, total, message)` callbacks
/// of the core. A new stage replaces the previous bar.
pub struct CliProgress {
    hidden: bool,
    state: Mutex<Option<(String, ProgressBar)>>,
}

impl CliProgress {
    pub fn new(hidden: bool) -> Self {
        Self {
            hidden,
            state: Mutex::new(None),
        }
    }

    /// Spinner shown while nothing countable is happening yet.
    pub fn spinner(&self, message: &str) {
        let pb = if self.hidden {
            ProgressBar::hidden()
        } else {
            ProgressBar::new_spinner()
        };
        if let Ok(style) = ProgressStyle::with_template("{spinner:.cyan} {msg}") {
            pb.set_style(style.tick_chars(TICK_CHARS));
        }
        pb.set_message(message.to_string());
        pb.enable_steady_tick(Duration::from_millis(80));
        self.replace(String::new(), pb);
    }

    pub fn update(&self, stage: &str, current: u64, total: u64, message: &str) {
        let Ok(mut guard) = self.state.lock() else {
            return;
        };
        let same_stage = guard.as_ref().is_some_and(|(s, _)| s == stage);
        if !same_stage {
            if let Some((_, old)) = guard.take() {
                old.finish_and_clear();
            }
            *guard = Some((stage.to_string(), self.bar(total)));
        }
        if let Some((_, pb)) = guard.as_ref() {
            if pb.length() != Some(total) {
                pb.set_length(total);
            }
            pb.set_position((current + 1).min(total));
            pb.set_message(message.to_string());
        }
    }

    pub fn finish(&self) {
        if let Ok(mut guard) = self.state.lock() {
            if let Some((_, pb)) = guard.take() {
                pb.finish_and_clear();
            }
        }
    }

    fn bar(&self, total: u64) -> ProgressBar {
        if self.hidden {
            return ProgressBar::hidden();
        }
        let pb = ProgressBar::new(total);
        if let Ok(style) = ProgressStyle::with_template(
            "  {spinner:.cyan} [{bar:40.cyan/dim}] {pos}/{len} {msg} ({eta} remaining)",
        ) {
            pb.set_style(style.progress_chars("━╸─").tick_chars(TICK_CHARS));
        }
        pb.enable_steady_tick(Duration::from_millis(80));
        pb
    }

    fn replace(&self, stage: String, pb: ProgressBar) {
        if let Ok(mut guard) = self.state.lock() {
            if let Some((_, old)) = guard.take() {
                old.finish_and_clear();
            }
            *guard = Some((stage, pb));
        }
    }
}
