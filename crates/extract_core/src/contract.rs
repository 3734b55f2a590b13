//! Advisory validation of terminal extraction data against a JSON Schema
//! contract.

use std::fmt;
use std::sync::Arc;

use jsonschema::Validator;
use serde_json::Value;
use thiserror::Error;

use extract_logging::{extract_debug, extract_warn};

use crate::{ExtractError, ExtractState};

/// Error code attached to every contract violation merged into a state.
pub const CONTRACT_ERROR_CODE: &str = "contract-error";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ContractError {
    #[error("contract is not valid JSON: {0}")]
    InvalidJson(String),
    #[error("contract is not a valid schema: {0}")]
    InvalidSchema(String),
}

/// One place where the data does not match the contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    /// JSON pointer into the data, empty for the root.
    pub path: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationOutcome {
    Valid,
    Invalid(Vec<Violation>),
}

impl ValidationOutcome {
    pub fn is_valid(&self) -> bool {
        matches!(self, ValidationOutcome::Valid)
    }
}

/// A parsed contract, holding the schema compiled once at parse time.
#[derive(Clone)]
pub struct Contract {
    schema: Value,
    validator: Arc<Validator>,
}

impl fmt::Debug for Contract {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Contract")
            .field("schema", &self.schema)
            .finish_non_exhaustive()
    }
}

impl PartialEq for Contract {
    fn eq(&self, other: &Self) -> bool {
        self.schema == other.schema
    }
}

impl Contract {
    pub fn parse(json: &str) -> Result<Self, ContractError> {
        let schema: Value =
            serde_json::from_str(json).map_err(|err| ContractError::InvalidJson(err.to_string()))?;
        let validator = jsonschema::validator_for(&schema)
            .map_err(|err| ContractError::InvalidSchema(err.to_string()))?;
        Ok(Self {
            schema,
            validator: Arc::new(validator),
        })
    }

    /// Parses an optional contract document. Missing, blank, or unparsable
    /// contracts all mean "no contract configured".
    pub fn from_optional(json: Option<&str>) -> Option<Self> {
        let json = json.map(str::trim).filter(|json| !json.is_empty())?;
        match Self::parse(json) {
            Ok(contract) => Some(contract),
            Err(err) => {
                extract_warn!("Contract unavailable, skipping validation: {}", err);
                None
            }
        }
    }

    pub fn schema(&self) -> &Value {
        &self.schema
    }

    /// Validates `data`. Never fails: whatever the data looks like, the
    /// answer is an outcome.
    pub fn validate(&self, data: &Value) -> ValidationOutcome {
        let violations: Vec<Violation> = self
            .validator
            .iter_errors(data)
            .map(|error| Violation {
                path: error.instance_path.to_string(),
                message: error.to_string(),
            })
            .collect();
        if violations.is_empty() {
            ValidationOutcome::Valid
        } else {
            extract_debug!("Contract reported {} violation(s)", violations.len());
            ValidationOutcome::Invalid(violations)
        }
    }
}

/// Returns `state` with the contract outcome merged into its error list.
/// The data itself is left untouched.
pub fn apply_contract(contract: Option<&Contract>, mut state: ExtractState) -> ExtractState {
    let Some(contract) = contract else {
        return state;
    };
    let data = state.data.clone().unwrap_or(Value::Null);
    if let ValidationOutcome::Invalid(violations) = contract.validate(&data) {
        state
            .errors
            .extend(violations.into_iter().map(|violation| ExtractError {
                code: CONTRACT_ERROR_CODE.to_string(),
                message: violation.message,
                key: Some(violation.path),
                level: Some(1),
                ..ExtractError::default()
            }));
    }
    state
}
