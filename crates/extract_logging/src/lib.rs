#![deny(missing_docs)]
//! Shared logging utilities for the extraction workspace.
//!
//! This crate provides the `extract_*` logging macros used across the codebase
//! and a minimal test initializer for the global logger. Every record is
//! prefixed with the id of the extraction run that is currently active, so
//! interleaved output from superseded runs can be told apart.

use std::sync::atomic::{AtomicU64, Ordering};

/// Id of the most recently started extraction run; 0 before the first run.
static ACTIVE_RUN: AtomicU64 = AtomicU64::new(0);

/// Records the id of the run that is now active.
/// Called by the session controller whenever it starts a new run.
pub fn set_active_run(run: u64) {
    ACTIVE_RUN.store(run, Ordering::Relaxed);
}

/// Retrieves the id of the active run.
/// Returns 0 if no run has been started yet.
pub fn active_run() -> u64 {
    ACTIVE_RUN.load(Ordering::Relaxed)
}

/// Logs a trace-level message tagged with the active run.
#[macro_export]
macro_rules! extract_trace {
    ($($arg:tt)*) => {{
        log::trace!("[run {}] {}", $crate::active_run(), format_args!($($arg)*));
    }};
}

/// Logs an info-level message tagged with the active run.
#[macro_export]
macro_rules! extract_info {
    ($($arg:tt)*) => {{
        log::info!("[run {}] {}", $crate::active_run(), format_args!($($arg)*));
    }};
}

/// Logs a debug-level message tagged with the active run.
#[macro_export]
macro_rules! extract_debug {
    ($($arg:tt)*) => {{
        log::debug!("[run {}] {}", $crate::active_run(), format_args!($($arg)*));
    }};
}

/// Logs a warn-level message tagged with the active run.
#[macro_export]
macro_rules! extract_warn {
    ($($arg:tt)*) => {{
        log::warn!("[run {}] {}", $crate::active_run(), format_args!($($arg)*));
    }};
}

/// Logs an error-level message tagged with the active run.
#[macro_export]
macro_rules! extract_error {
    ($($arg:tt)*) => {{
        log::error!("[run {}] {}", $crate::active_run(), format_args!($($arg)*));
    }};
}

/// Initializes a simple terminal logger for use in tests.
///
/// This safely no-ops if another logger has already been initialized.
pub fn initialize_for_tests() {
    use simplelog::{ColorChoice, CombinedLogger, Config, TermLogger, TerminalMode};

    // Use debug level in debug builds, info in release builds.
    let level = if cfg!(debug_assertions) {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    // Ignore the error if a logger was already set by another test.
    let _ = CombinedLogger::init(vec![TermLogger::new(
        level,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )]);
}
