use extract_logging::{extract_debug, extract_error, extract_info, extract_warn, set_active_run};

use crate::contract::{apply_contract, Contract};
use crate::template::should_auto_refresh;
use crate::{
    ContinuationKind, ControllerState, Effect, ExtractState, ExtractionProgram, Msg, Notification,
    Phase, RunFailure, RunId, Shape, SideEffect, Template,
};

/// Pure update function: applies a message to state and returns any effects.
pub fn update(mut state: ControllerState, msg: Msg) -> (ControllerState, Vec<Effect>) {
    let effects = match msg {
        Msg::TemplateChanged(json) => {
            state.set_template_json(json);
            auto_refresh(&mut state)
        }
        Msg::AutoRefreshChanged(enabled) => {
            state.set_auto_refresh(enabled);
            auto_refresh(&mut state)
        }
        Msg::ContractChanged(json) => {
            state.set_contract_json(json);
            Vec::new()
        }
        Msg::RefreshRequested { reload } => match Template::parse(state.template_json()) {
            Ok(template) if template.has_actions() => begin_run(&mut state, template, reload),
            Ok(_) => {
                extract_info!("Template has no actions, nothing to run");
                Vec::new()
            }
            Err(err) => {
                extract_warn!("Cannot run template: {}", err);
                Vec::new()
            }
        },
        Msg::ResetExtractStatus => {
            state.run_mut().clear();
            state.set_phase(Phase::Idle);
            state.set_last_error(None);
            Vec::new()
        }
        Msg::UrlResolved { run, url } => {
            if !is_current(&state, run) {
                return (state, Vec::new());
            }
            match state.take_phase() {
                Phase::Starting { template, reload } => {
                    url_resolved(&mut state, run, template, reload, url)
                }
                other => {
                    extract_debug!("Ignoring url for run {} outside of start", run);
                    state.set_phase(other);
                    Vec::new()
                }
            }
        }
        Msg::ActionCompleted { run } => {
            if !is_current(&state, run) {
                return (state, Vec::new());
            }
            let debug = state.config().debug;
            match state.take_phase() {
                Phase::Reloading { program } => {
                    state.set_phase(Phase::Running);
                    vec![Effect::Evaluate { run, program }]
                }
                Phase::Continuing { state: continuation } => {
                    extract_info!("Resuming run {}", run);
                    state.set_phase(Phase::Running);
                    vec![Effect::Evaluate {
                        run,
                        program: ExtractionProgram::resume(&continuation, debug),
                    }]
                }
                other => {
                    extract_debug!("Ignoring completed action for run {}", run);
                    state.set_phase(other);
                    Vec::new()
                }
            }
        }
        Msg::ChannelFailed { run, failure } => {
            if is_current(&state, run) && state.is_active() {
                abort_run(&mut state, failure);
            } else {
                extract_debug!("Ignoring failure from inactive run {}: {}", run, failure);
            }
            Vec::new()
        }
        Msg::Notified { run, notification } => {
            if !is_current(&state, run) || !state.is_active() {
                extract_debug!(
                    "Discarding {} from inactive run {}",
                    notification.kind(),
                    run
                );
                return (state, Vec::new());
            }
            match notification {
                Notification::Status(status) => {
                    state.run_mut().extract_status = Some(status);
                    Vec::new()
                }
                Notification::State(snapshot) => state_received(&mut state, run, snapshot),
            }
        }
    };

    (state, effects)
}

fn is_current(state: &ControllerState, run: RunId) -> bool {
    run == state.current_run()
}

fn auto_refresh(state: &mut ControllerState) -> Vec<Effect> {
    let Ok(template) = Template::parse(state.template_json()) else {
        return Vec::new();
    };
    if should_auto_refresh(&template, state.config().auto_refresh) {
        begin_run(state, template, false)
    } else {
        Vec::new()
    }
}

fn begin_run(state: &mut ControllerState, template: Template, reload: bool) -> Vec<Effect> {
    if state.is_active() {
        extract_info!("Superseding run {}", state.current_run());
    }
    let run = state.next_run();
    set_active_run(run);
    state.run_mut().clear();
    state.set_last_error(None);
    state.set_phase(Phase::Starting { template, reload });
    extract_info!("Starting run {} (reload={})", run, reload);
    vec![Effect::AttachListener { run }, Effect::QueryUrl { run }]
}

fn url_resolved(
    state: &mut ControllerState,
    run: RunId,
    template: Template,
    reload: bool,
    url: String,
) -> Vec<Effect> {
    if url.is_empty() {
        // Without a page nothing would ever answer the evaluation.
        extract_info!("No page attached, declining run {}", run);
        state.set_phase(Phase::Idle);
        return Vec::new();
    }
    state.run_mut().refreshing = true;
    let program = ExtractionProgram::start(&template, &url, state.config().debug);
    if reload {
        state.set_phase(Phase::Reloading { program });
        vec![Effect::ReloadPage { run }]
    } else {
        state.set_phase(Phase::Running);
        vec![Effect::Evaluate { run, program }]
    }
}

fn state_received(state: &mut ControllerState, run: RunId, snapshot: ExtractState) -> Vec<Effect> {
    if !matches!(state.phase(), Phase::Running) {
        extract_warn!(
            "Dropping state for run {} received while {:?}",
            run,
            state.phase().stage()
        );
        return Vec::new();
    }
    match snapshot.shape() {
        Shape::Continuation => {
            let kind = ContinuationKind::classify(snapshot.yield_params());
            let side_effect = SideEffect::for_continuation(kind, state.config().wait);
            extract_debug!("Run {} yielded, performing {:?}", run, side_effect);
            state.run_mut().extract_state = Some(snapshot.clone());
            state.set_phase(Phase::Continuing { state: snapshot });
            vec![Effect::Perform { run, side_effect }]
        }
        Shape::Terminal => {
            let contract = Contract::from_optional(state.contract_json());
            let finalized = apply_contract(contract.as_ref(), snapshot);
            extract_info!(
                "Run {} finished with {} error(s)",
                run,
                finalized.errors.len()
            );
            let session = state.run_mut();
            session.extract_state = Some(finalized);
            session.refreshing = false;
            state.set_phase(Phase::Idle);
            Vec::new()
        }
    }
}

fn abort_run(state: &mut ControllerState, failure: RunFailure) {
    extract_error!("Run {} aborted: {}", state.current_run(), failure);
    state.run_mut().refreshing = false;
    state.set_phase(Phase::Idle);
    state.set_last_error(Some(failure));
}
