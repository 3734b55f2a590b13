use serde_json::{Map, Value};

use crate::{ExtractState, Template};

/// Whether a program starts a run or resumes one from a continuation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgramKind {
    Fresh,
    Resume,
}

/// The payload handed to the remote engine for one evaluation.
///
/// A fresh program is `{ ...template, url, debug }`; a resumption is
/// `{ ...state, debug }` where `state` is the continuation exactly as the
/// remote side returned it.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractionProgram {
    kind: ProgramKind,
    payload: Map<String, Value>,
}

impl ExtractionProgram {
    pub fn start(template: &Template, url: &str, debug: bool) -> Self {
        let mut payload = template.obj().clone();
        payload.insert("url".to_string(), Value::String(url.to_string()));
        payload.insert("debug".to_string(), Value::Bool(debug));
        Self {
            kind: ProgramKind::Fresh,
            payload,
        }
    }

    pub fn resume(state: &ExtractState, debug: bool) -> Self {
        let mut payload = state.to_object();
        payload.insert("debug".to_string(), Value::Bool(debug));
        Self {
            kind: ProgramKind::Resume,
            payload,
        }
    }

    pub fn kind(&self) -> ProgramKind {
        self.kind
    }

    pub fn payload(&self) -> &Map<String, Value> {
        &self.payload
    }

    /// Renders the program as an invocation of `engine_expression`, the form
    /// a page-side evaluator expects: `engine(<json>)`.
    pub fn to_script(&self, engine_expression: &str) -> String {
        let json = Value::Object(self.payload.clone()).to_string();
        format!("{engine_expression}({json})")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn fresh_program_spreads_template_and_adds_url() {
        let template =
            Template::parse(r#"{"actions": [{"select": []}], "url": "https://default.example.com"}"#)
                .unwrap();
        let program = ExtractionProgram::start(&template, "https://example.com", true);

        assert_eq!(program.kind(), ProgramKind::Fresh);
        assert_eq!(program.payload()["url"], json!("https://example.com"));
        assert_eq!(program.payload()["debug"], json!(true));
        assert_eq!(program.payload()["actions"], json!([{ "select": [] }]));
    }

    #[test]
    fn script_wraps_payload_in_engine_call() {
        let template = Template::parse(r#"{"actions": []}"#).unwrap();
        let program = ExtractionProgram::start(&template, "https://example.com", false);
        let script = program.to_script("engine.extract");

        assert!(script.starts_with("engine.extract({"));
        assert!(script.ends_with("})"));
        assert!(script.contains(r#""url":"https://example.com""#));
    }
}
