//! Progress bar utilities using indicatif for terminal output

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::time::Duration;

const PERCENT_TEMPLATE: &str = "[{elapsed_precise}] {bar:40.cyan/blue} {pos:>3}% {msg}";
const SPINNER_TEMPLATE: &str = "[{elapsed_precise}] {spinner:.green} {msg}";

const PROGRESS_CHARS: &str = "█▓▒░ ";
const SPINNER_CHARS: &str = "⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏";

/// Create a 0-100 percentage bar drawn on stderr
///
/// Hidden when `visible` is false, so callers can drive it unconditionally.
///
/// # Example
/// ```
/// use address_sampler::cli::output::progress::{create_percent_bar, ProgressBarExt};
///
/// let pb = create_percent_bar(false);
/// ProgressBarExt::update(&pb, 33, "Geocoded 1/3 valid addresses");
/// pb.finish_success("done");
/// ```
pub fn create_percent_bar(visible: bool) -> ProgressBar {
    let pb = ProgressBar::with_draw_target(
        Some(100),
        if visible {
            ProgressDrawTarget::stderr()
        } else {
            ProgressDrawTarget::hidden()
        },
    );
    pb.set_style(
        ProgressStyle::default_bar()
            .template(PERCENT_TEMPLATE)
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars(PROGRESS_CHARS),
    );
    if visible {
        pb.enable_steady_tick(Duration::from_millis(100));
    }
    pb
}

/// Create a spinner for indeterminate operations
pub fn create_spinner(message: impl Into<String>) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template(SPINNER_TEMPLATE)
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_chars(SPINNER_CHARS),
    );
    spinner.enable_steady_tick(Duration::from_millis(80));
    spinner.set_message(message.into());
    spinner
}

/// Extension trait for ProgressBar to add common utility methods
pub trait ProgressBarExt {
    /// Finish with a success message (green checkmark)
    fn finish_success(&self, message: impl Into<String>);

    /// Finish with an error message (red X)
    fn finish_error(&self, message: impl Into<String>);

    /// Update progress and message in one call
    fn update(&self, position: u64, message: impl Into<String>);
}

impl ProgressBarExt for ProgressBar {
    fn finish_success(&self, message: impl Into<String>) {
        self.finish_with_message(format!("✓ {}", message.into()));
    }

    fn finish_error(&self, message: impl Into<String>) {
        self.abandon_with_message(format!("✗ {}", message.into()));
    }

    fn update(&self, position: u64, message: impl Into<String>) {
        self.set_position(position);
        self.set_message(message.into());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hidden_percent_bar() {
        let pb = create_percent_bar(false);
        assert_eq!(pb.length(), Some(100));
        assert!(pb.is_hidden());

        ProgressBarExt::update(&pb, 67, "Geocoded 2/3 valid addresses");
        assert_eq!(pb.position(), 67);
        assert_eq!(pb.message(), "Geocoded 2/3 valid addresses");
    }

    #[test]
    fn test_finish_messages() {
        let pb = create_percent_bar(false);
        pb.finish_success("3 addresses");
        assert!(pb.is_finished());
        assert_eq!(pb.message(), "✓ 3 addresses");

        let pb = create_percent_bar(false);
        pb.finish_error("job cancelled");
        assert!(pb.is_finished());
        assert_eq!(pb.message(), "✗ job cancelled");
    }
}
