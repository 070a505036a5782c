use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

const ROUTE_TEMPLATE: &str =
    "{msg}\n{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} routes ({per_sec}, ETA {eta})";
const SPINNER_TEMPLATE: &str = "{spinner:.green} [{elapsed_precise}] {msg}";

/// Terminal progress for route batches and index builds; hidden in quiet mode
pub struct ProgressReporter {
    bar: Option<ProgressBar>,
}

impl ProgressReporter {
    pub fn new(total: u64, message: &str, silent: bool) -> Self {
        if silent {
            return Self::silent();
        }

        let style = ProgressStyle::default_bar()
            .template(ROUTE_TEMPLATE)
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-");
        Self::start(ProgressBar::new(total), style, message)
    }

    pub fn new_spinner(message: &str, silent: bool) -> Self {
        if silent {
            return Self::silent();
        }

        let style = ProgressStyle::default_spinner()
            .template(SPINNER_TEMPLATE)
            .unwrap_or_else(|_| ProgressStyle::default_spinner());
        Self::start(ProgressBar::new_spinner(), style, message)
    }

    pub fn silent() -> Self {
        Self { bar: None }
    }

    fn start(bar: ProgressBar, style: ProgressStyle, message: &str) -> Self {
        bar.set_style(style);
        bar.set_message(message.to_string());
        bar.enable_steady_tick(Duration::from_millis(100));
        Self { bar: Some(bar) }
    }

    pub fn is_silent(&self) -> bool {
        self.bar.is_none()
    }

    /// Jump to an absolute position, e.g. past routes restored from a checkpoint
    pub fn update(&self, current: u64) {
        if let Some(bar) = &self.bar {
            bar.set_position(current);
        }
    }

    pub fn increment(&self, delta: u64) {
        if let Some(bar) = &self.bar {
            bar.inc(delta);
        }
    }

    pub fn set_message(&self, message: &str) {
        if let Some(bar) = &self.bar {
            bar.set_message(message.to_string());
        }
    }

    pub fn finish_with_message(&self, message: &str) {
        if let Some(bar) = &self.bar {
            bar.finish_with_message(message.to_string());
        }
    }
}

impl Drop for ProgressReporter {
    fn drop(&mut self) {
        if let Some(bar) = &self.bar {
            if !bar.is_finished() {
                bar.abandon();
            }
        }
    }
}
