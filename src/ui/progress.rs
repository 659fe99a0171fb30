//! Progress indicators with CI fallback

use super::context::UiContext;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// A task spinner with CI fallback
pub struct TaskSpinner {
    spinner: Option<ProgressBar>,
    interactive: bool,
    quiet: bool,
}

impl TaskSpinner {
    /// Create a new spinner (nothing is shown until `start`)
    pub fn new(ctx: &UiContext) -> Self {
        Self {
            spinner: None,
            interactive: ctx.use_fancy_output(),
            quiet: ctx.is_quiet(),
        }
    }

    /// Start the spinner with a message
    pub fn start(&mut self, message: &str) {
        if self.quiet {
            return;
        }

        if self.interactive {
            let spinner = ProgressBar::new_spinner();
            let template =
                ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}  {elapsed:.dim}");
            if let Ok(template) = template {
                spinner.set_style(template.tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏ "));
            }
            spinner.set_message(message.to_string());
            spinner.enable_steady_tick(Duration::from_millis(120));
            self.spinner = Some(spinner);
        } else {
            eprintln!("{} {}", style("...").dim(), message);
        }
    }

    /// Stop with success message
    pub fn stop(&mut self, message: &str) {
        self.finish(message, style("✓").green().to_string(), style("[OK]").green().to_string());
    }

    /// Stop with warning message
    pub fn stop_warn(&mut self, message: &str) {
        self.finish(message, style("!").yellow().to_string(), style("[WARN]").yellow().to_string());
    }

    /// Stop with error message
    pub fn stop_error(&mut self, message: &str) {
        self.finish(message, style("✗").red().to_string(), style("[FAIL]").red().to_string());
    }

    /// Clear the spinner without any message
    pub fn clear(&mut self) {
        if let Some(spinner) = self.spinner.take() {
            spinner.finish_and_clear();
        }
    }

    fn finish(&mut self, message: &str, fancy: String, plain: String) {
        if self.quiet {
            return;
        }

        if let Some(spinner) = self.spinner.take() {
            spinner.finish_and_clear();
        }

        if self.interactive {
            eprintln!("{} {}", fancy, message);
        } else {
            eprintln!("{} {}", plain, message);
        }
    }
}

impl Drop for TaskSpinner {
    fn drop(&mut self) {
        self.clear();
    }
}
