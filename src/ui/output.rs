//! Output functions for consistent CLI formatting

use super::context::UiContext;
use console::{style, StyledObject};

fn styled<D>(ctx: &UiContext, value: D) -> StyledObject<D> {
    style(value).force_styling(ctx.use_color())
}

/// Green full-width banner for a skip decision
pub fn banner_ok(ctx: &UiContext, message: &str) {
    println!(
        "{}",
        styled(ctx, format!("TREESKIP:  {}  ", message)).black().on_green().bold()
    );
}

/// Yellow banner for a run decision
pub fn banner_warn(ctx: &UiContext, message: &str) {
    println!(
        "{}",
        styled(ctx, format!("TREESKIP:  {}  ", message)).black().on_yellow().bold()
    );
}

/// Red banner for a failed decision
pub fn banner_error(ctx: &UiContext, message: &str) {
    println!(
        "{}",
        styled(ctx, format!("TREESKIP:  {}  ", message)).black().on_red().bold()
    );
}

/// Display a success step with detail
pub fn step_ok_detail(ctx: &UiContext, message: &str, detail: &str) {
    println!(
        "  {} {} ({})",
        styled(ctx, "[OK]").green(),
        message,
        styled(ctx, detail).dim()
    );
}

/// Display a warning step
pub fn step_warn(ctx: &UiContext, message: &str) {
    println!("  {} {}", styled(ctx, "[WARN]").yellow(), message);
}

/// Display a warning step with hint
pub fn step_warn_hint(ctx: &UiContext, message: &str, hint: &str) {
    println!(
        "  {} {} - {}",
        styled(ctx, "[WARN]").yellow(),
        message,
        styled(ctx, hint).dim()
    );
}

/// Print styled key-value pair
pub fn key_value(ctx: &UiContext, key: &str, value: &str) {
    println!("  {}: {}", styled(ctx, key).dim(), value);
}
