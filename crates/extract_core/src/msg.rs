use crate::{Notification, RunFailure, RunId};

#[derive(Debug, Clone, PartialEq)]
pub enum Msg {
    /// User edited the template document.
    TemplateChanged(String),
    /// User edited (or cleared) the contract document.
    ContractChanged(Option<String>),
    /// User flipped the global auto-refresh toggle.
    AutoRefreshChanged(bool),
    /// Explicit request to run the template, optionally reloading first.
    RefreshRequested { reload: bool },
    /// Clear everything exposed about the current run.
    ResetExtractStatus,
    /// Channel answered the URL query for `run`. Empty means no page.
    UrlResolved { run: RunId, url: String },
    /// A reload or continuation side effect of `run` finished.
    ActionCompleted { run: RunId },
    /// A channel operation of `run` failed.
    ChannelFailed { run: RunId, failure: RunFailure },
    /// Inbound notification delivered to the listener attached for `run`.
    Notified {
        run: RunId,
        notification: Notification,
    },
}

impl Msg {
    /// Run generation the message reports on; `None` for user triggers.
    pub fn run(&self) -> Option<RunId> {
        match self {
            Msg::UrlResolved { run, .. }
            | Msg::ActionCompleted { run }
            | Msg::ChannelFailed { run, .. }
            | Msg::Notified { run, .. } => Some(*run),
            Msg::TemplateChanged(_)
            | Msg::ContractChanged(_)
            | Msg::AutoRefreshChanged(_)
            | Msg::RefreshRequested { .. }
            | Msg::ResetExtractStatus => None,
        }
    }
}
