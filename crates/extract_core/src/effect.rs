use crate::{ExtractionProgram, RunId, SideEffect};

/// Work the host must perform on behalf of the state machine. Each effect
/// reports back with a `Msg` tagged by the same `run`.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Replace the active listener with one that tags notifications `run`.
    AttachListener { run: RunId },
    QueryUrl { run: RunId },
    /// Reload before the first evaluation.
    ReloadPage { run: RunId },
    /// Fire-and-forget; failures come back as `Msg::ChannelFailed`.
    Evaluate {
        run: RunId,
        program: ExtractionProgram,
    },
    /// Side effect requested by a continuation.
    Perform { run: RunId, side_effect: SideEffect },
}

impl Effect {
    pub fn run(&self) -> RunId {
        match self {
            Effect::AttachListener { run }
            | Effect::QueryUrl { run }
            | Effect::ReloadPage { run }
            | Effect::Evaluate { run, .. }
            | Effect::Perform { run, .. } => *run,
        }
    }
}
