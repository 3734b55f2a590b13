use std::collections::VecDeque;
use std::sync::Arc;

use extract_core::{
    update, ChannelOp, ControllerState, DataViewModel, Effect, ExtractState, ExtractStatus, Msg,
    RunFailure, SessionConfig,
};
use extract_logging::{extract_debug, extract_warn};
use tokio::sync::mpsc;
use tokio::time::Instant;

use crate::effects::run_channel_effect;
use crate::{EngineSettings, MessageListener, RemoteChannel, Subscription};

/// Sends triggers into a controller from elsewhere, e.g. a UI task.
/// Messages are applied the next time the controller pumps or settles.
#[derive(Clone)]
pub struct SessionHandle {
    tx: mpsc::UnboundedSender<Msg>,
}

impl SessionHandle {
    pub fn refresh(&self, reload: bool) {
        let _ = self.tx.send(Msg::RefreshRequested { reload });
    }

    pub fn reset_extract_status(&self) {
        let _ = self.tx.send(Msg::ResetExtractStatus);
    }
}

/// Owns the run state and performs the effects the state machine asks for.
///
/// Everything goes through [`update`]: explicit triggers, channel results,
/// and notifications forwarded by the listener. Effects are awaited one at a
/// time, so a run never has two channel operations in flight.
pub struct SessionController {
    channel: Arc<dyn RemoteChannel>,
    listener: MessageListener,
    settings: EngineSettings,
    state: ControllerState,
    subscription: Option<Subscription>,
    inbox_tx: mpsc::UnboundedSender<Msg>,
    inbox_rx: mpsc::UnboundedReceiver<Msg>,
}

impl SessionController {
    pub fn new(
        channel: Arc<dyn RemoteChannel>,
        listener: MessageListener,
        config: SessionConfig,
        settings: EngineSettings,
    ) -> Self {
        let (inbox_tx, inbox_rx) = mpsc::unbounded_channel();
        Self {
            channel,
            listener,
            settings,
            state: ControllerState::new(config),
            subscription: None,
            inbox_tx,
            inbox_rx,
        }
    }

    pub fn handle(&self) -> SessionHandle {
        SessionHandle {
            tx: self.inbox_tx.clone(),
        }
    }

    pub fn state(&self) -> &ControllerState {
        &self.state
    }

    pub fn view(&self) -> DataViewModel {
        self.state.view()
    }

    pub fn extract_state(&self) -> Option<&ExtractState> {
        self.state.extract_state()
    }

    pub fn extract_status(&self) -> Option<&ExtractStatus> {
        self.state.extract_status()
    }

    pub fn refreshing(&self) -> bool {
        self.state.refreshing()
    }

    pub fn consume_dirty(&mut self) -> bool {
        self.state.consume_dirty()
    }

    /// Replaces the template; a simple template re-runs when auto-refresh
    /// is on.
    pub async fn set_template(&mut self, json: impl Into<String>) {
        self.dispatch(Msg::TemplateChanged(json.into())).await;
        self.settle().await;
    }

    pub async fn set_contract(&mut self, json: Option<String>) {
        self.dispatch(Msg::ContractChanged(json)).await;
    }

    pub async fn set_auto_refresh(&mut self, enabled: bool) {
        self.dispatch(Msg::AutoRefreshChanged(enabled)).await;
        self.settle().await;
    }

    /// Runs the current template and drives the run until it finalizes,
    /// fails, is reset, or is declined.
    pub async fn refresh(&mut self, reload: bool) {
        self.dispatch(Msg::RefreshRequested { reload }).await;
        self.settle().await;
    }

    /// Clears the exposed run. Observation of an in-flight run stops; the
    /// remote evaluation itself is not cancelled.
    pub fn reset_extract_status(&mut self) {
        let state = std::mem::take(&mut self.state);
        let (state, _effects) = update(state, Msg::ResetExtractStatus);
        self.state = state;
    }

    /// Applies every message already waiting in the inbox.
    pub async fn pump(&mut self) {
        while let Ok(msg) = self.inbox_rx.try_recv() {
            self.dispatch(msg).await;
        }
    }

    /// Waits for inbound messages until no run is active.
    ///
    /// Without a `response_timeout` this waits as long as the page stays
    /// silent. With one, only messages for the current run (or new user
    /// triggers) restart the wait; traffic from superseded runs does not.
    pub async fn settle(&mut self) {
        self.pump().await;
        let mut deadline = self.next_deadline();
        while self.state.is_active() {
            let msg = match (self.settings.response_timeout, deadline) {
                (Some(limit), Some(deadline)) => {
                    match tokio::time::timeout_at(deadline, self.inbox_rx.recv()).await {
                        Ok(msg) => msg,
                        Err(_) => Some(Msg::ChannelFailed {
                            run: self.state.current_run(),
                            failure: RunFailure::new(
                                ChannelOp::AwaitNotification,
                                format!("no response within {limit:?}"),
                            ),
                        }),
                    }
                }
                _ => self.inbox_rx.recv().await,
            };
            let Some(msg) = msg else {
                extract_warn!("Inbox closed while a run was active");
                break;
            };
            match msg.run() {
                Some(run) if run != self.state.current_run() => {
                    extract_debug!("Message from superseded run {} keeps the deadline", run);
                }
                _ => deadline = self.next_deadline(),
            }
            self.dispatch(msg).await;
        }
    }

    fn next_deadline(&self) -> Option<Instant> {
        self.settings
            .response_timeout
            .map(|limit| Instant::now() + limit)
    }

    /// Applies `msg` and every follow-up message its effects produce.
    pub async fn dispatch(&mut self, msg: Msg) {
        let mut queue = VecDeque::from([msg]);
        while let Some(msg) = queue.pop_front() {
            let state = std::mem::take(&mut self.state);
            let (state, effects) = update(state, msg);
            self.state = state;
            for effect in effects {
                if let Some(follow_up) = self.perform(effect).await {
                    queue.push_back(follow_up);
                }
            }
        }
    }

    async fn perform(&mut self, effect: Effect) -> Option<Msg> {
        match effect {
            Effect::AttachListener { run } => {
                let tx = self.inbox_tx.clone();
                extract_debug!("Attaching listener for run {}", run);
                // Replacing the subscription detaches the previous run's handler.
                self.subscription = Some(self.listener.subscribe(move |notification| {
                    let _ = tx.send(Msg::Notified { run, notification });
                }));
                None
            }
            other => run_channel_effect(self.channel.as_ref(), other).await,
        }
    }
}
