//! Extraction orchestration core: pure state machine, protocol shapes, and
//! the policies that decide when and how a run proceeds.
mod config;
mod continuation;
mod contract;
mod effect;
mod msg;
mod program;
mod protocol;
mod state;
mod template;
mod update;
mod view_model;

pub use config::SessionConfig;
pub use continuation::{ContinuationKind, SideEffect};
pub use contract::{
    apply_contract, Contract, ContractError, ValidationOutcome, Violation, CONTRACT_ERROR_CODE,
};
pub use effect::Effect;
pub use msg::Msg;
pub use program::{ExtractionProgram, ProgramKind};
pub use protocol::{
    ExtractError, ExtractState, ExtractStatus, Notification, Shape, YieldParams, YieldRequest,
    DEFAULT_NAMESPACE, STATE_KEY, STATUS_KEY,
};
pub use state::{ChannelOp, ControllerState, Phase, RunFailure, RunId, RunSession};
pub use template::{should_auto_refresh, Action, ActionKind, Template, TemplateError};
pub use update::update;
pub use view_model::{DataViewModel, RunStage};
