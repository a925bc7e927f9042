//! UI module for consistent CLI output
//!
//! Decision banners go to stdout so they show up in the CI job log next to
//! the trace keys; colors are dropped outside terminals and GitLab job logs.
//!
//! # Example
//!
//! ```rust,ignore
//! use treeskip::ui::{self, UiContext};
//!
//! let ctx = UiContext::detect();
//! ui::banner_ok(&ctx, "watched paths already passed in job 42, skipping");
//! ui::step_warn_hint(&ctx, "Artifacts expired", "Run the job again");
//! ```

mod context;
mod output;

pub use context::UiContext;
pub use output::{
    banner_error, banner_ok, banner_warn, key_value, step_ok_detail, step_warn, step_warn_hint,
};
