use std::time::Duration;

/// Explicit toggles for the session controller. Nothing is read from ambient
/// state; hosts pass the values they want.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Re-run simple templates automatically after each edit.
    pub auto_refresh: bool,
    /// Passed to the remote engine with every evaluation.
    pub debug: bool,
    /// Pause used for `waitUntil` and unrecognized continuations.
    pub wait: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            auto_refresh: false,
            debug: true,
            wait: Duration::from_millis(1000),
        }
    }
}
