//! Color theming for CLI output.
//!
//! Respects `NO_COLOR` environment variable and TTY detection.

use std::io::IsTerminal;
use std::sync::atomic::{AtomicBool, Ordering};

use crossterm::style::{StyledContent, Stylize};

static COLORS_ENABLED: AtomicBool = AtomicBool::new(false);

/// Detect color support. Call once at startup before any themed output.
pub fn init() {
    let enabled = std::env::var("NO_COLOR").is_err() && std::io::stdout().is_terminal();
    COLORS_ENABLED.store(enabled, Ordering::Relaxed);
}

fn colors_enabled() -> bool {
    COLORS_ENABLED.load(Ordering::Relaxed)
}

fn styled(text: &str, style: impl FnOnce(&str) -> StyledContent<&str>) -> String {
    if colors_enabled() {
        style(text).to_string()
    } else {
        text.to_string()
    }
}

// ─── Semantic Functions ─────────────────────────────────────────────────────

pub fn error(text: &str) -> String {
    styled(text, |t| t.red())
}

pub fn warning(text: &str) -> String {
    styled(text, |t| t.yellow())
}

pub fn success(text: &str) -> String {
    styled(text, |t| t.green())
}

// ─── Tree Display ───────────────────────────────────────────────────────────

/// Node kind labels in the tree view (yellow).
pub fn label(text: &str) -> String {
    styled(text, |t| t.yellow())
}

/// Tag properties such as data type and array size (cyan).
pub fn meta(text: &str) -> String {
    styled(text, |t| t.cyan())
}

/// Tree connectors and secondary text (dark grey).
pub fn dim(text: &str) -> String {
    styled(text, |t| t.dark_grey())
}

/// Section headers (bold).
pub fn header(text: &str) -> String {
    styled(text, |t| t.bold())
}
