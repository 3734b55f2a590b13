//! Wire shapes exchanged with the remote extraction engine.
//!
//! Snapshots are kept lossless: fields this crate does not interpret are
//! carried in `rest` so a continuation can be handed back to the remote side
//! exactly as it arrived.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use extract_logging::{extract_debug, extract_warn};

/// Envelope namespace used by the page-side engine.
pub const DEFAULT_NAMESPACE: &str = "syphonx";
/// Kind tag of a progress ping.
pub const STATUS_KEY: &str = "extract-status";
/// Kind tag of a full extraction snapshot.
pub const STATE_KEY: &str = "extract-state";

/// Lightweight progress record. Display only.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ExtractStatus {
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl ExtractStatus {
    pub fn message(&self) -> Option<&str> {
        self.fields.get("message").and_then(Value::as_str)
    }
}

/// One error reported by the extraction engine, or appended by contract
/// validation.
///
/// Decoding never fails: a field whose value does not fit its type stays in
/// `rest` under its own name, and a bare non-object entry becomes the message.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "Value")]
pub struct ExtractError {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub code: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<u8>,
    #[serde(flatten)]
    pub rest: Map<String, Value>,
}

impl From<Value> for ExtractError {
    fn from(value: Value) -> Self {
        let mut rest = match value {
            Value::Object(map) => map,
            Value::Null => return Self::default(),
            Value::String(message) => {
                return Self {
                    message,
                    ..Self::default()
                }
            }
            other => {
                return Self {
                    message: other.to_string(),
                    ..Self::default()
                }
            }
        };
        let text = |value: &Value| value.as_str().map(str::to_string);
        Self {
            code: take_field(&mut rest, "code", text).unwrap_or_default(),
            message: take_field(&mut rest, "message", text).unwrap_or_default(),
            key: take_field(&mut rest, "key", text),
            level: take_field(&mut rest, "level", |value| {
                value.as_u64().and_then(|level| u8::try_from(level).ok())
            }),
            rest,
        }
    }
}

/// Moves `name` out of `map` when `convert` accepts it. Nulls are dropped;
/// anything else is left in place.
fn take_field<T>(
    map: &mut Map<String, Value>,
    name: &str,
    convert: impl Fn(&Value) -> Option<T>,
) -> Option<T> {
    let value = map.get(name)?;
    if value.is_null() {
        map.remove(name);
        return None;
    }
    let converted = convert(value)?;
    map.remove(name);
    Some(converted)
}

/// Accepts `null` or a single entry where a list of errors is expected.
fn lenient_errors<'de, D>(deserializer: D) -> Result<Vec<ExtractError>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Null => Vec::new(),
        Value::Array(entries) => entries.into_iter().map(ExtractError::from).collect(),
        other => vec![ExtractError::from(other)],
    })
}

/// Parameters of a continuation request. Each field mirrors one side effect
/// the remote side may ask for; values are kept raw because the engine uses
/// loose truthiness for them.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct YieldParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub goback: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub navigate: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reload: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wait_until: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locators: Option<Value>,
    #[serde(flatten)]
    pub rest: Map<String, Value>,
}

impl YieldParams {
    /// Target of a `navigate` request, if it names one.
    pub fn navigate_url(&self) -> Option<&str> {
        self.navigate
            .as_ref()
            .and_then(|navigate| navigate.get("url"))
            .and_then(Value::as_str)
            .filter(|url| !url.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct YieldRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<YieldParams>,
    #[serde(flatten)]
    pub rest: Map<String, Value>,
}

/// Full extraction snapshot as pushed by the remote side.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ExtractState {
    #[serde(rename = "yield", default, skip_serializing_if = "Option::is_none")]
    pub yield_request: Option<YieldRequest>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, deserialize_with = "lenient_errors")]
    pub errors: Vec<ExtractError>,
    #[serde(flatten)]
    pub rest: Map<String, Value>,
}

/// The two disjoint shapes a snapshot can take.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    Continuation,
    Terminal,
}

impl ExtractState {
    pub fn shape(&self) -> Shape {
        if self.yield_request.is_some() {
            Shape::Continuation
        } else {
            Shape::Terminal
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.shape() == Shape::Terminal
    }

    pub fn yield_params(&self) -> Option<&YieldParams> {
        self.yield_request
            .as_ref()
            .and_then(|request| request.params.as_ref())
    }

    /// Serializes the snapshot back into the object the remote side sent.
    pub fn to_object(&self) -> Map<String, Value> {
        match serde_json::to_value(self) {
            Ok(Value::Object(map)) => map,
            _ => Map::new(),
        }
    }
}

/// A demultiplexed inbound notification.
#[derive(Debug, Clone, PartialEq)]
pub enum Notification {
    Status(ExtractStatus),
    State(ExtractState),
}

impl Notification {
    /// Routes an inbound envelope `{ <namespace>: { key, ...fields } }`.
    ///
    /// Returns `None` for any other shape, for unknown kind tags, and for
    /// payloads that do not deserialize.
    pub fn from_envelope(namespace: &str, message: &Value) -> Option<Self> {
        let inner = message.get(namespace)?;
        let key = inner.get("key").and_then(Value::as_str)?;
        match key {
            STATUS_KEY => parse_payload(key, inner).map(Notification::Status),
            STATE_KEY => parse_payload(key, inner).map(Notification::State),
            other => {
                extract_debug!("Ignoring notification with kind {:?}", other);
                None
            }
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Notification::Status(_) => STATUS_KEY,
            Notification::State(_) => STATE_KEY,
        }
    }
}

fn parse_payload<T: for<'de> Deserialize<'de>>(key: &str, inner: &Value) -> Option<T> {
    match serde_json::from_value(inner.clone()) {
        Ok(payload) => Some(payload),
        Err(err) => {
            extract_warn!("Dropping malformed {} notification: {}", key, err);
            None
        }
    }
}

/// Loose truthiness, matching how the page-side engine reads flags.
pub(crate) fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_f64().is_some_and(|n| n != 0.0),
        Value::String(text) => !text.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}
