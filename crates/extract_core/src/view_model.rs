use crate::{ExtractState, ExtractStatus, RunFailure, RunId};

/// Coarse lifecycle stage, for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunStage {
    #[default]
    Idle,
    Starting,
    Running,
    Continuing,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct DataViewModel {
    pub extract_state: Option<ExtractState>,
    pub extract_status: Option<ExtractStatus>,
    pub refreshing: bool,
    pub stage: RunStage,
    pub run: RunId,
    pub last_error: Option<RunFailure>,
    /// Auto-refresh is switched on and the current template qualifies.
    pub auto_refresh: bool,
    /// The current template is simple enough for auto-refresh.
    pub auto_refresh_available: bool,
    pub dirty: bool,
}

impl DataViewModel {
    /// Number of errors on the exposed state, including contract violations.
    pub fn error_count(&self) -> usize {
        self.extract_state
            .as_ref()
            .map(|state| state.errors.len())
            .unwrap_or(0)
    }
}
