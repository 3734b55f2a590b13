use std::time::Duration;

use extract_core::DEFAULT_NAMESPACE;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineSettings {
    /// Envelope namespace inbound notifications are nested under.
    pub namespace: String,
    /// Abort a run that hears nothing from the page for this long.
    /// `None` waits indefinitely.
    pub response_timeout: Option<Duration>,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            namespace: DEFAULT_NAMESPACE.to_string(),
            response_timeout: None,
        }
    }
}
