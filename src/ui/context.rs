//! UI context for detecting terminal vs CI log output

use std::io::IsTerminal;

/// UI context that determines output behavior
#[derive(Debug, Clone)]
pub struct UiContext {
    /// Whether stdout is a terminal
    interactive: bool,
}

impl UiContext {
    /// Detect the current environment
    pub fn detect() -> Self {
        Self {
            interactive: std::io::stdout().is_terminal(),
        }
    }

    /// Create a plain-output context (for testing or log capture)
    pub fn non_interactive() -> Self {
        Self { interactive: false }
    }

    /// GitLab renders ANSI colors in job logs, so CI counts as colored too
    pub fn use_color(&self) -> bool {
        self.interactive || std::env::var_os("GITLAB_CI").is_some()
    }
}
