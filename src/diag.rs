//! Process-wide diagnostics: warnings and verbose progress messages.
//!
//! Warnings never abort. Fatal conditions are `anyhow::Result` errors that
//! propagate to `main`; everything else that a user should see goes through
//! here so the formatting stays in one place.

use std::sync::atomic::{AtomicBool, Ordering};

use owo_colors::OwoColorize;

static VERBOSE: AtomicBool = AtomicBool::new(false);

/// Enable or disable verbose progress output for the whole process.
pub fn set_verbose(on: bool) {
    VERBOSE.store(on, Ordering::Relaxed);
}

pub fn is_verbose() -> bool {
    VERBOSE.load(Ordering::Relaxed)
}

/// Print a non-fatal warning to stderr.
pub fn warning(msg: impl std::fmt::Display) {
    eprintln!("riptags: {} {}", "warning:".yellow().bold(), msg);
}

/// Print a progress message to stderr when --verbose is on.
pub fn verbose(msg: impl std::fmt::Display) {
    if is_verbose() {
        eprintln!("{}", msg);
    }
}
