//! Minimal view of an extraction template: just enough structure to decide
//! whether a run is possible and whether it may run unattended. The template
//! language itself stays opaque.

use serde_json::{Map, Value};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TemplateError {
    #[error("template is not valid JSON: {0}")]
    InvalidJson(String),
    #[error("template must be a JSON object")]
    NotAnObject,
    #[error("template actions must be an array")]
    ActionsNotArray,
}

/// Action kinds understood by the extraction engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionKind {
    Select,
    Break,
    Click,
    Each,
    Error,
    GoBack,
    Keypress,
    Locator,
    Navigate,
    Repeat,
    Scroll,
    Snooze,
    Switch,
    Transform,
    WaitFor,
    Yield,
    Other(String),
}

impl ActionKind {
    fn from_key(key: &str) -> Self {
        match key {
            "select" => ActionKind::Select,
            "break" => ActionKind::Break,
            "click" => ActionKind::Click,
            "each" => ActionKind::Each,
            "error" => ActionKind::Error,
            "goback" => ActionKind::GoBack,
            "keypress" => ActionKind::Keypress,
            "locator" => ActionKind::Locator,
            "navigate" => ActionKind::Navigate,
            "repeat" => ActionKind::Repeat,
            "scroll" => ActionKind::Scroll,
            "snooze" => ActionKind::Snooze,
            "switch" => ActionKind::Switch,
            "transform" => ActionKind::Transform,
            "waitfor" => ActionKind::WaitFor,
            "yield" => ActionKind::Yield,
            other => ActionKind::Other(other.to_string()),
        }
    }
}

/// A single top-level action: an object keyed by its kind, e.g.
/// `{ "select": [ ... ] }`.
#[derive(Debug, Clone, PartialEq)]
pub struct Action {
    kind: ActionKind,
    body: Value,
}

impl Action {
    fn from_value(value: &Value) -> Self {
        let entry = value.as_object().and_then(|object| object.iter().next());
        match entry {
            Some((key, body)) => Self {
                kind: ActionKind::from_key(key),
                body: body.clone(),
            },
            None => Self {
                kind: ActionKind::Other(String::new()),
                body: value.clone(),
            },
        }
    }

    pub fn kind(&self) -> &ActionKind {
        &self.kind
    }

    /// True when the action carries a `when` guard anywhere in its body.
    pub fn is_conditional(&self) -> bool {
        has_when_guard(&self.body)
    }
}

fn has_when_guard(value: &Value) -> bool {
    match value {
        Value::Object(object) => {
            object.contains_key("when") || object.values().any(has_when_guard)
        }
        Value::Array(items) => items.iter().any(has_when_guard),
        _ => false,
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Template {
    obj: Map<String, Value>,
    actions: Vec<Action>,
}

impl Template {
    /// Parses a template document. A blank document loads as the default,
    /// empty template.
    pub fn parse(json: &str) -> Result<Self, TemplateError> {
        if json.trim().is_empty() {
            return Ok(Self::default());
        }
        let value: Value =
            serde_json::from_str(json).map_err(|err| TemplateError::InvalidJson(err.to_string()))?;
        let Value::Object(obj) = value else {
            return Err(TemplateError::NotAnObject);
        };
        let actions = match obj.get("actions") {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Array(items)) => items.iter().map(Action::from_value).collect(),
            Some(_) => return Err(TemplateError::ActionsNotArray),
        };
        Ok(Self { obj, actions })
    }

    pub fn obj(&self) -> &Map<String, Value> {
        &self.obj
    }

    pub fn actions(&self) -> &[Action] {
        &self.actions
    }

    pub fn has_actions(&self) -> bool {
        !self.actions.is_empty()
    }

    /// Exactly one top-level `select` and no `when` guards. Loops, switches
    /// and page-driving actions are never `select`, so they disqualify too.
    pub fn is_simple(&self) -> bool {
        match self.actions.as_slice() {
            [action] => action.kind == ActionKind::Select && !action.is_conditional(),
            _ => false,
        }
    }
}

/// Whether an edit to `template` should trigger an unattended re-run.
pub fn should_auto_refresh(template: &Template, auto_refresh_enabled: bool) -> bool {
    auto_refresh_enabled && template.is_simple()
}
