use thiserror::Error;

/// One structural or semantic problem found in a suggested-field
/// batch, with a JSON path into the offending element.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaViolation {
    #[error("missing required field at {path}")]
    MissingField { path: String },

    #[error("type mismatch at {path}: expected {expected}, found {found}")]
    TypeMismatch {
        path: String,
        expected: &'static str,
        found: &'static str,
    },

    #[error("unknown fieldType at {path}: {found:?}")]
    UnknownFieldType { path: String, found: String },

    #[error("fieldType at {path} is not available for suggestions: {found:?}")]
    ExcludedFieldType { path: String, found: String },

    #[error("value at {path} must be a non-empty string")]
    EmptyString { path: String },

    #[error("array at {path} must be non-empty")]
    EmptyArray { path: String },

    #[error("model suggested no fields")]
    NoSuggestions,
}

/// Failure taxonomy for the field generation pipeline.
///
/// Every stage reports its own variant so callers can branch without
/// string matching. All variants are fatal to the request; nothing is
/// retried and no partial batch is ever applied.
#[derive(Debug, Error)]
pub enum ModelError {
    /// A model client could not be constructed (missing or invalid
    /// credentials/configuration).
    #[error("failed to construct model client: {0}")]
    GetClientFailure(String),

    /// The provider call failed, or it succeeded with no usable
    /// completion (zero choices or an empty message body).
    #[error("model request failed: {0}")]
    ResponseFailure(String),

    /// The completion text was not parseable JSON.
    #[error("model response is not valid JSON: {0}")]
    InvalidSyntax(#[from] serde_json::Error),

    /// The parsed JSON did not match the suggested-field schema, or
    /// the suggestion list was empty. The whole batch is rejected.
    #[error("model response failed schema validation: {}", format_violations(.0))]
    InvalidSchemaFormat(Vec<SchemaViolation>),
}

impl ModelError {
    /// Stable machine code, logged and surfaced to the RPC caller.
    pub fn code(&self) -> &'static str {
        match self {
            ModelError::GetClientFailure(_) => "model_get_client_failure",
            ModelError::ResponseFailure(_) => "model_response_failure",
            ModelError::InvalidSyntax(_) => "model_response_invalid_syntax",
            ModelError::InvalidSchemaFormat(_) => "model_response_invalid_schema_format",
        }
    }

    /// Generic end-user wording. Validation detail is logged
    /// server-side only and never exposed here.
    pub fn user_message(&self) -> &'static str {
        match self {
            ModelError::GetClientFailure(_) | ModelError::ResponseFailure(_) => {
                "Error while connecting to the suggestion service. Please try again later."
            }
            ModelError::InvalidSyntax(_) | ModelError::InvalidSchemaFormat(_) => {
                "The suggestion service returned an unusable answer. Please try again."
            }
        }
    }
}

fn format_violations(violations: &[SchemaViolation]) -> String {
    violations
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}
