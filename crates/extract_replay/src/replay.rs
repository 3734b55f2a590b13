use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use anyhow::Result;
use chrono::{DateTime, Utc};
use extract_core::{ExtractState, ExtractionProgram};
use extract_engine::{ChannelError, MessageListener, RemoteChannel, SessionController};
use extract_logging::{extract_debug, extract_info, extract_warn};
use serde::Serialize;
use serde_json::Value;

use crate::config::{load_recording, read_document, Recording, ReplayConfig};

#[derive(Debug, Default)]
struct Page {
    url: String,
    history: Vec<String>,
}

/// Stands in for a browser tab: answers each evaluation with the next
/// recorded round of envelopes and keeps a simple navigation history.
pub struct ReplayChannel {
    listener: MessageListener,
    engine_expression: String,
    page: Mutex<Page>,
    rounds: Mutex<VecDeque<Vec<Value>>>,
}

impl ReplayChannel {
    pub fn new(
        listener: MessageListener,
        engine_expression: impl Into<String>,
        page_url: impl Into<String>,
        recording: Recording,
    ) -> Self {
        Self {
            listener,
            engine_expression: engine_expression.into(),
            page: Mutex::new(Page {
                url: page_url.into(),
                history: Vec::new(),
            }),
            rounds: Mutex::new(recording.rounds.into()),
        }
    }

    fn page(&self) -> MutexGuard<'_, Page> {
        self.page.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn evaluations_left(&self) -> usize {
        self.rounds
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

#[async_trait::async_trait]
impl RemoteChannel for ReplayChannel {
    async fn current_url(&self) -> Result<String, ChannelError> {
        Ok(self.page().url.clone())
    }

    async fn evaluate(&self, program: &ExtractionProgram) -> Result<(), ChannelError> {
        extract_debug!("evaluate {}", program.to_script(&self.engine_expression));
        let round = self
            .rounds
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
            .ok_or(ChannelError::Closed)?;
        for envelope in &round {
            if !self.listener.deliver(envelope) {
                extract_warn!("Recorded envelope was not routed: {}", envelope);
            }
        }
        Ok(())
    }

    async fn reload(&self) -> Result<(), ChannelError> {
        extract_info!("reload {}", self.page().url);
        Ok(())
    }

    async fn go_back(&self) -> Result<(), ChannelError> {
        let mut page = self.page();
        let previous = page
            .history
            .pop()
            .ok_or_else(|| ChannelError::Failed("no previous page in history".to_string()))?;
        extract_info!("go back to {}", previous);
        page.url = previous;
        Ok(())
    }

    async fn navigate(&self, url: &str) -> Result<(), ChannelError> {
        let mut page = self.page();
        extract_info!("navigate to {}", url);
        let previous = std::mem::replace(&mut page.url, url.to_string());
        page.history.push(previous);
        Ok(())
    }
}

#[derive(Debug, Serialize)]
pub struct ReplayReport {
    pub run: u64,
    pub started_utc: DateTime<Utc>,
    pub finished_utc: DateTime<Utc>,
    pub refreshing: bool,
    pub error_count: usize,
    pub last_error: Option<String>,
    pub unused_rounds: usize,
    pub extract_state: Option<ExtractState>,
}

/// Replays one recorded session against a fresh controller.
pub async fn run(config: &ReplayConfig) -> Result<ReplayReport> {
    let template = read_document(&config.template)?;
    let contract = match &config.contract {
        Some(path) => Some(read_document(path)?),
        None => None,
    };
    let recording = load_recording(&config.recording)?;

    let settings = config.engine_settings();
    let listener = MessageListener::from_settings(&settings);
    let channel = Arc::new(ReplayChannel::new(
        listener.clone(),
        config.engine_expression.clone(),
        config.page_url.clone(),
        recording,
    ));
    let mut controller =
        SessionController::new(channel.clone(), listener, config.session_config(), settings);

    let started_utc = Utc::now();
    controller.set_contract(contract).await;
    controller.set_template(template).await;
    // Auto-refresh may already have run the template on load.
    if controller.state().current_run() == 0 {
        controller.refresh(config.reload).await;
    }

    let view = controller.view();
    Ok(ReplayReport {
        run: view.run,
        started_utc,
        finished_utc: Utc::now(),
        refreshing: view.refreshing,
        error_count: view.error_count(),
        last_error: view.last_error.as_ref().map(ToString::to_string),
        unused_rounds: channel.evaluations_left(),
        extract_state: view.extract_state,
    })
}
