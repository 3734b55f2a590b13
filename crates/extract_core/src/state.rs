use std::fmt;

use thiserror::Error;

use crate::view_model::{DataViewModel, RunStage};
use crate::{ExtractState, ExtractStatus, ExtractionProgram, SessionConfig, Template};

/// Monotonic id of an extraction run. Every message that originates from a
/// run carries it so messages from superseded runs can be discarded.
pub type RunId = u64;

/// Channel operation that can fail during a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelOp {
    CurrentUrl,
    Evaluate,
    Reload,
    GoBack,
    Navigate,
    AwaitNotification,
}

impl fmt::Display for ChannelOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChannelOp::CurrentUrl => write!(f, "current url"),
            ChannelOp::Evaluate => write!(f, "evaluate"),
            ChannelOp::Reload => write!(f, "reload"),
            ChannelOp::GoBack => write!(f, "go back"),
            ChannelOp::Navigate => write!(f, "navigate"),
            ChannelOp::AwaitNotification => write!(f, "await notification"),
        }
    }
}

/// Why a run was aborted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{op} failed: {message}")]
pub struct RunFailure {
    pub op: ChannelOp,
    pub message: String,
}

impl RunFailure {
    pub fn new(op: ChannelOp, message: impl Into<String>) -> Self {
        Self {
            op,
            message: message.into(),
        }
    }
}

/// What observers see of the current run.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RunSession {
    pub extract_state: Option<ExtractState>,
    pub extract_status: Option<ExtractStatus>,
    pub refreshing: bool,
}

impl RunSession {
    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

/// Where the controller is in the run lifecycle. Each variant holds what the
/// next step needs.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Phase {
    #[default]
    Idle,
    /// Waiting for the page URL.
    Starting { template: Template, reload: bool },
    /// Waiting for the pre-run reload; `program` is evaluated afterwards.
    Reloading { program: ExtractionProgram },
    /// Waiting for a notification from the remote side.
    Running,
    /// Waiting for a side effect; `state` is resumed afterwards.
    Continuing { state: ExtractState },
}

impl Phase {
    pub fn stage(&self) -> RunStage {
        match self {
            Phase::Idle => RunStage::Idle,
            Phase::Starting { .. } | Phase::Reloading { .. } => RunStage::Starting,
            Phase::Running => RunStage::Running,
            Phase::Continuing { .. } => RunStage::Continuing,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ControllerState {
    config: SessionConfig,
    template_json: String,
    contract_json: Option<String>,
    run: RunSession,
    phase: Phase,
    current_run: RunId,
    last_error: Option<RunFailure>,
    dirty: bool,
}

impl ControllerState {
    pub fn new(config: SessionConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    pub fn view(&self) -> DataViewModel {
        let auto_refresh_available = Template::parse(&self.template_json)
            .map(|template| template.is_simple())
            .unwrap_or(false);
        DataViewModel {
            extract_state: self.run.extract_state.clone(),
            extract_status: self.run.extract_status.clone(),
            refreshing: self.run.refreshing,
            stage: self.phase.stage(),
            run: self.current_run,
            last_error: self.last_error.clone(),
            auto_refresh: self.config.auto_refresh && auto_refresh_available,
            auto_refresh_available,
            dirty: self.dirty,
        }
    }

    pub fn extract_state(&self) -> Option<&ExtractState> {
        self.run.extract_state.as_ref()
    }

    pub fn extract_status(&self) -> Option<&ExtractStatus> {
        self.run.extract_status.as_ref()
    }

    pub fn refreshing(&self) -> bool {
        self.run.refreshing
    }

    pub fn run_session(&self) -> &RunSession {
        &self.run
    }

    pub fn phase(&self) -> &Phase {
        &self.phase
    }

    pub fn current_run(&self) -> RunId {
        self.current_run
    }

    pub fn last_error(&self) -> Option<&RunFailure> {
        self.last_error.as_ref()
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn template_json(&self) -> &str {
        &self.template_json
    }

    pub fn contract_json(&self) -> Option<&str> {
        self.contract_json.as_deref()
    }

    /// A run is in flight until it finalizes, fails, or is reset.
    pub fn is_active(&self) -> bool {
        !matches!(self.phase, Phase::Idle)
    }

    /// Returns whether anything observable changed since the last call.
    pub fn consume_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    pub(crate) fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub(crate) fn set_template_json(&mut self, json: String) {
        self.template_json = json;
        self.mark_dirty();
    }

    pub(crate) fn set_contract_json(&mut self, json: Option<String>) {
        self.contract_json = json;
    }

    pub(crate) fn set_auto_refresh(&mut self, enabled: bool) {
        self.config.auto_refresh = enabled;
        self.mark_dirty();
    }

    pub(crate) fn run_mut(&mut self) -> &mut RunSession {
        self.mark_dirty();
        &mut self.run
    }

    pub(crate) fn set_phase(&mut self, phase: Phase) {
        self.phase = phase;
        self.mark_dirty();
    }

    pub(crate) fn take_phase(&mut self) -> Phase {
        std::mem::take(&mut self.phase)
    }

    /// Starts a new run generation, superseding any run still in flight.
    pub(crate) fn next_run(&mut self) -> RunId {
        self.current_run += 1;
        self.current_run
    }

    pub(crate) fn set_last_error(&mut self, failure: Option<RunFailure>) {
        self.last_error = failure;
        self.mark_dirty();
    }
}
