use std::time::Duration;

use crate::protocol::{is_truthy, YieldParams};

/// What a continuation asks the orchestrator to do, resolved in fixed
/// precedence: goback, navigate, reload, waitUntil, locators, then anything
/// else.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContinuationKind {
    GoBack,
    Navigate { url: String },
    Reload,
    WaitUntil,
    Locators,
    Unrecognized,
}

impl ContinuationKind {
    pub fn classify(params: Option<&YieldParams>) -> Self {
        let Some(params) = params else {
            return ContinuationKind::Unrecognized;
        };
        let set = |field: &Option<serde_json::Value>| field.as_ref().is_some_and(is_truthy);

        if set(&params.goback) {
            ContinuationKind::GoBack
        } else if let Some(url) = params.navigate_url() {
            ContinuationKind::Navigate {
                url: url.to_string(),
            }
        } else if set(&params.reload) {
            ContinuationKind::Reload
        } else if set(&params.wait_until) {
            ContinuationKind::WaitUntil
        } else if set(&params.locators) {
            ContinuationKind::Locators
        } else {
            ContinuationKind::Unrecognized
        }
    }
}

/// The single side effect performed before a continuation is resumed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SideEffect {
    GoBack,
    Navigate { url: String },
    Reload,
    /// Bounded pause. Condition-based waiting cannot be observed from here,
    /// so `waitUntil` and unknown requests both get a fixed delay.
    Wait(Duration),
    /// Resume straight away.
    None,
}

impl SideEffect {
    pub fn for_continuation(kind: ContinuationKind, wait: Duration) -> Self {
        match kind {
            ContinuationKind::GoBack => SideEffect::GoBack,
            ContinuationKind::Navigate { url } => SideEffect::Navigate { url },
            ContinuationKind::Reload => SideEffect::Reload,
            ContinuationKind::WaitUntil => SideEffect::Wait(wait),
            ContinuationKind::Locators => SideEffect::None,
            ContinuationKind::Unrecognized => SideEffect::Wait(wait),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn params(value: serde_json::Value) -> YieldParams {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn goback_wins_over_everything() {
        let params = params(json!({
            "goback": true,
            "navigate": { "url": "https://example.com" },
            "reload": true
        }));
        assert_eq!(ContinuationKind::classify(Some(&params)), ContinuationKind::GoBack);
    }

    #[test]
    fn navigate_wins_over_reload_and_wait() {
        let params = params(json!({
            "navigate": { "url": "https://example.com/next" },
            "reload": true,
            "waitUntil": "load"
        }));
        assert_eq!(
            ContinuationKind::classify(Some(&params)),
            ContinuationKind::Navigate {
                url: "https://example.com/next".to_string()
            }
        );
    }

    #[test]
    fn navigate_without_url_falls_through() {
        let params = params(json!({ "navigate": {}, "reload": true }));
        assert_eq!(ContinuationKind::classify(Some(&params)), ContinuationKind::Reload);
    }

    #[test]
    fn false_flags_do_not_match() {
        let params = params(json!({ "goback": false, "reload": 0, "waitUntil": "networkidle" }));
        assert_eq!(ContinuationKind::classify(Some(&params)), ContinuationKind::WaitUntil);
    }

    #[test]
    fn unknown_shapes_degenerate_to_wait() {
        let wait = Duration::from_millis(250);
        let kind = ContinuationKind::classify(Some(&params(json!({ "timeout": 10 }))));
        assert_eq!(kind, ContinuationKind::Unrecognized);
        assert_eq!(SideEffect::for_continuation(kind, wait), SideEffect::Wait(wait));
        assert_eq!(
            SideEffect::for_continuation(ContinuationKind::classify(None), wait),
            SideEffect::Wait(wait)
        );
    }

    #[test]
    fn locators_resume_without_pause() {
        let kind = ContinuationKind::classify(Some(&params(json!({ "locators": [{ "name": "x" }] }))));
        assert_eq!(kind, ContinuationKind::Locators);
        assert_eq!(
            SideEffect::for_continuation(kind, Duration::from_secs(1)),
            SideEffect::None
        );
    }
}
