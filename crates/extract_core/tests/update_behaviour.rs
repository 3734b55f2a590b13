use std::sync::Once;
use std::time::Duration;

use extract_core::{
    update, ChannelOp, ControllerState, Effect, ExtractState, ExtractStatus, Msg, Notification,
    Phase, ProgramKind, RunFailure, RunStage, SessionConfig, SideEffect, DEFAULT_NAMESPACE,
};
use pretty_assertions::assert_eq;
use serde_json::json;

const SELECT_TEMPLATE: &str = r#"{"actions": [{"select": [{"name": "price", "query": [["$('.price')"]]}]}]}"#;

fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(extract_logging::initialize_for_tests);
}

fn config() -> SessionConfig {
    SessionConfig {
        wait: Duration::from_millis(5),
        ..SessionConfig::default()
    }
}

fn with_template(json: &str) -> ControllerState {
    let (state, effects) = update(
        ControllerState::new(config()),
        Msg::TemplateChanged(json.to_string()),
    );
    assert!(effects.is_empty());
    state
}

fn state_msg(run: u64, value: serde_json::Value) -> Msg {
    let snapshot: ExtractState = serde_json::from_value(value).unwrap();
    Msg::Notified {
        run,
        notification: Notification::State(snapshot),
    }
}

/// Refresh and resolve the URL; returns the state and the evaluate effect.
fn start_run(reload: bool) -> (ControllerState, u64, Vec<Effect>) {
    let state = with_template(SELECT_TEMPLATE);
    let (state, effects) = update(state, Msg::RefreshRequested { reload });
    let run = state.current_run();
    assert_eq!(
        effects,
        vec![Effect::AttachListener { run }, Effect::QueryUrl { run }]
    );
    let (state, effects) = update(
        state,
        Msg::UrlResolved {
            run,
            url: "https://example.com".to_string(),
        },
    );
    (state, run, effects)
}

#[test]
fn refresh_without_actions_is_noop() {
    init_logging();
    for template in ["", r#"{"actions": []}"#, r#"{"url": "https://example.com"}"#] {
        let state = with_template(template);
        let (next, effects) = update(state.clone(), Msg::RefreshRequested { reload: true });
        assert!(effects.is_empty());
        assert_eq!(next.current_run(), state.current_run());
        assert_eq!(next.view().stage, RunStage::Idle);
    }
}

#[test]
fn invalid_template_declines_quietly() {
    init_logging();
    let state = with_template("{not json");
    let (next, effects) = update(state, Msg::RefreshRequested { reload: false });
    assert!(effects.is_empty());
    assert!(!next.refreshing());
}

#[test]
fn empty_url_declines_without_refreshing() {
    init_logging();
    let state = with_template(SELECT_TEMPLATE);
    let (state, _) = update(state, Msg::RefreshRequested { reload: false });
    let run = state.current_run();
    let (state, effects) = update(
        state,
        Msg::UrlResolved {
            run,
            url: String::new(),
        },
    );

    assert!(effects.is_empty());
    assert!(!state.refreshing());
    assert_eq!(state.phase(), &Phase::Idle);
}

#[test]
fn resolved_url_evaluates_fresh_program() {
    init_logging();
    let (state, run, effects) = start_run(false);

    assert!(state.refreshing());
    assert_eq!(state.view().stage, RunStage::Running);
    match effects.as_slice() {
        [Effect::Evaluate { run: effect_run, program }] => {
            assert_eq!(*effect_run, run);
            assert_eq!(program.kind(), ProgramKind::Fresh);
            assert_eq!(program.payload()["url"], json!("https://example.com"));
            assert_eq!(program.payload()["debug"], json!(true));
        }
        other => panic!("expected a single evaluate, got {other:?}"),
    }
}

#[test]
fn reload_happens_before_first_evaluation() {
    init_logging();
    let (state, run, effects) = start_run(true);
    assert_eq!(effects, vec![Effect::ReloadPage { run }]);
    assert!(state.refreshing());

    let (state, effects) = update(state, Msg::ActionCompleted { run });
    assert!(matches!(effects.as_slice(), [Effect::Evaluate { .. }]));
    assert_eq!(state.phase(), &Phase::Running);
}

#[test]
fn terminal_state_is_exposed_and_clears_refreshing() {
    init_logging();
    let (state, run, _) = start_run(false);
    let (state, effects) = update(
        state,
        state_msg(run, json!({ "key": "extract-state", "data": { "price": 9.99 }, "errors": [] })),
    );

    assert!(effects.is_empty());
    assert!(!state.refreshing());
    let view = state.view();
    assert_eq!(view.stage, RunStage::Idle);
    let exposed = view.extract_state.as_ref().expect("terminal state exposed");
    assert_eq!(exposed.data, Some(json!({ "price": 9.99 })));
    assert_eq!(view.error_count(), 0);
}

#[test]
fn terminal_with_off_shape_errors_still_finalizes() {
    init_logging();
    let payloads = [
        json!({ "key": "extract-state", "data": { "price": 9.99 }, "errors": null }),
        json!({
            "key": "extract-state",
            "data": { "price": 9.99 },
            "errors": [{ "code": "select", "message": "slow", "level": 300 }]
        }),
    ];
    for (payload, expected_errors) in payloads.into_iter().zip([0, 1]) {
        let (state, run, _) = start_run(false);
        let notification =
            Notification::from_envelope(DEFAULT_NAMESPACE, &json!({ "syphonx": payload }))
                .expect("terminal state routed");
        let (state, effects) = update(state, Msg::Notified { run, notification });

        assert!(effects.is_empty());
        assert!(!state.refreshing());
        assert!(!state.is_active());
        let view = state.view();
        let exposed = view.extract_state.as_ref().expect("terminal state exposed");
        assert_eq!(exposed.data, Some(json!({ "price": 9.99 })));
        assert_eq!(view.error_count(), expected_errors);
    }
}

#[test]
fn status_updates_exposed_status_only() {
    init_logging();
    let (state, run, _) = start_run(false);
    let status: ExtractStatus =
        serde_json::from_value(json!({ "key": "extract-status", "message": "select price" }))
            .unwrap();
    let (state, effects) = update(
        state,
        Msg::Notified {
            run,
            notification: Notification::Status(status.clone()),
        },
    );

    assert!(effects.is_empty());
    assert_eq!(state.extract_status(), Some(&status));
    assert_eq!(state.phase(), &Phase::Running);
    assert!(state.refreshing());
}

#[test]
fn navigate_continuation_resumes_with_returned_state() {
    init_logging();
    let (state, run, _) = start_run(false);
    let continuation = json!({
        "key": "extract-state",
        "yield": { "params": { "navigate": { "url": "https://example.com/page/2" } } },
        "vars": { "page": 2 }
    });
    let (state, effects) = update(state, state_msg(run, continuation));

    assert_eq!(
        effects,
        vec![Effect::Perform {
            run,
            side_effect: SideEffect::Navigate {
                url: "https://example.com/page/2".to_string()
            }
        }]
    );
    assert_eq!(state.view().stage, RunStage::Continuing);
    assert!(state.extract_state().is_some());

    let (state, effects) = update(state, Msg::ActionCompleted { run });
    match effects.as_slice() {
        [Effect::Evaluate { program, .. }] => {
            assert_eq!(program.kind(), ProgramKind::Resume);
            assert_eq!(program.payload()["vars"], json!({ "page": 2 }));
            assert_eq!(
                program.payload()["yield"]["params"]["navigate"]["url"],
                json!("https://example.com/page/2")
            );
            assert_eq!(program.payload()["debug"], json!(true));
            assert!(program.payload().get("actions").is_none());
        }
        other => panic!("expected resume evaluate, got {other:?}"),
    }
    assert_eq!(state.phase(), &Phase::Running);
}

#[test]
fn unrecognized_yield_waits_then_resumes() {
    init_logging();
    let (state, run, _) = start_run(false);
    let (state, effects) = update(
        state,
        state_msg(run, json!({ "yield": { "params": { "timeout": 30 } } })),
    );
    assert_eq!(
        effects,
        vec![Effect::Perform {
            run,
            side_effect: SideEffect::Wait(Duration::from_millis(5))
        }]
    );

    let (_state, effects) = update(state, Msg::ActionCompleted { run });
    assert!(matches!(effects.as_slice(), [Effect::Evaluate { .. }]));
}

#[test]
fn channel_failure_aborts_and_surfaces_error() {
    init_logging();
    let (state, run, _) = start_run(true);
    let failure = RunFailure::new(ChannelOp::Reload, "page detached");
    let (state, effects) = update(
        state,
        Msg::ChannelFailed {
            run,
            failure: failure.clone(),
        },
    );

    assert!(effects.is_empty());
    assert!(!state.refreshing());
    assert_eq!(state.phase(), &Phase::Idle);
    assert_eq!(state.view().last_error, Some(failure));

    // No retry: a late completion for the aborted run does nothing.
    let (state, effects) = update(state, Msg::ActionCompleted { run });
    assert!(effects.is_empty());
    assert_eq!(state.phase(), &Phase::Idle);
}

#[test]
fn reset_clears_session_and_is_idempotent() {
    init_logging();
    let (state, run, _) = start_run(false);
    let (state, _) = update(
        state,
        state_msg(run, json!({ "yield": { "params": { "reload": true } } })),
    );

    let (once, effects) = update(state, Msg::ResetExtractStatus);
    assert!(effects.is_empty());
    assert!(!once.refreshing());
    assert!(once.extract_state().is_none());
    assert!(once.extract_status().is_none());

    let (twice, effects) = update(once.clone(), Msg::ResetExtractStatus);
    assert!(effects.is_empty());
    assert_eq!(once, twice);
}

#[test]
fn late_notifications_after_reset_are_ignored() {
    init_logging();
    let (state, run, _) = start_run(false);
    let (state, _) = update(state, Msg::ResetExtractStatus);

    let (state, effects) = update(state, state_msg(run, json!({ "data": { "late": true } })));
    assert!(effects.is_empty());
    assert!(state.extract_state().is_none());
    assert!(!state.refreshing());
}

#[test]
fn new_run_supersedes_previous_one() {
    init_logging();
    let (state, first, _) = start_run(false);
    let (state, effects) = update(state, Msg::RefreshRequested { reload: false });
    let second = state.current_run();
    assert_ne!(first, second);
    assert_eq!(
        effects,
        vec![
            Effect::AttachListener { run: second },
            Effect::QueryUrl { run: second }
        ]
    );

    let (state, effects) = update(state, state_msg(first, json!({ "data": { "stale": 1 } })));
    assert!(effects.is_empty());
    assert!(state.extract_state().is_none());
    assert_eq!(state.view().stage, RunStage::Starting);
}

#[test]
fn dirty_flag_tracks_observable_changes() {
    init_logging();
    let (mut state, _run, _) = start_run(false);
    assert!(state.consume_dirty());
    assert!(!state.consume_dirty());

    let (mut state, effects) = update(state, Msg::ActionCompleted { run: 0 });
    assert!(effects.is_empty());
    assert!(!state.consume_dirty());
}
