//! Terminal feedback for long-running cache transfers
//!
//! Step outputs may go to stdout, so everything here writes to stderr.
//! Interactive terminals get an `indicatif` spinner; CI logs get one plain
//! line per event.
//!
//! # Example
//!
//! ```rust,ignore
//! use cachegate::ui::{TaskSpinner, UiContext};
//!
//! let ctx = UiContext::detect();
//! let mut spinner = TaskSpinner::new(&ctx);
//! spinner.start("Restoring cache...");
//! // ... do work ...
//! spinner.stop("Cache restored from key: v1-deps");
//! ```

mod context;
mod progress;

pub use context::UiContext;
pub use progress::TaskSpinner;
