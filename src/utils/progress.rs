//! Progress spinner using indicatif
//!
//! The audit feed does not report a total up front, so fetching is shown as a
//! spinner counting records as pages arrive.

use indicatif::{ProgressBar as IndicatifBar, ProgressStyle};
use std::time::Duration;

/// Spinner wrapper for displaying fetch status
pub struct ProgressBar {
    bar: IndicatifBar,
}

impl ProgressBar {
    /// Create a spinner with the given label
    pub fn new_spinner(label: &str) -> Self {
        let bar = IndicatifBar::new_spinner();
        bar.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner} {prefix} {pos} records ({elapsed}) {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        bar.set_prefix(label.to_string());
        bar.enable_steady_tick(Duration::from_millis(120));

        Self { bar }
    }

    /// A spinner that draws nothing, for quiet runs
    pub fn hidden() -> Self {
        Self {
            bar: IndicatifBar::hidden(),
        }
    }

    /// Set the running record count
    pub fn update(&self, current: usize) {
        self.bar.set_position(current as u64);
    }

    /// Replace the trailing status message
    pub fn set_message(&self, message: impl Into<String>) {
        self.bar.set_message(message.into());
    }

    /// Finish with custom message
    pub fn finish_with_message(&self, message: &str) {
        self.bar.finish_with_message(message.to_string());
    }

    /// Remove the spinner from the terminal, e.g. before printing an error
    pub fn abandon(&self) {
        self.bar.finish_and_clear();
    }
}
