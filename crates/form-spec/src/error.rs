use thiserror::Error;

use crate::validate::FieldErrors;

/// Errors raised while loading or binding a form.
#[derive(Debug, Error)]
pub enum FormError {
    #[error("failed to parse form description: {0}")]
    Parse(#[source] serde_json::Error),
    #[error("field '{0}' is not registered")]
    UnknownField(String),
}

/// Outcome of a schema that did not accept the submitted data.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SchemaError {
    /// Per-field messages, shown inline next to the matching controls.
    #[error("validation failed for {} field(s)", .0.len())]
    Invalid(FieldErrors),
    /// The schema itself could not be evaluated.
    #[error("schema evaluation failed: {0}")]
    Failed(String),
}

/// Transport and decode failures raised by a submit action.
#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("transport failure: {0}")]
    Transport(String),
    #[error("response body is not valid JSON: {0}")]
    Decode(#[source] serde_json::Error),
    #[error(transparent)]
    Schema(#[from] SchemaError),
}
