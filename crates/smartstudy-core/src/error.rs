// Error types for the assistant pipeline

use thiserror::Error;

use crate::intent::SchemaViolation;

/// Result type alias for assistant pipeline operations
pub type Result<T> = std::result::Result<T, AssistantError>;

/// Result type alias for store operations
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Entity kinds referenced by not-found errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Event,
    Task,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Event => "Event",
            EntityKind::Task => "Task",
        }
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors raised by event/task store implementations
#[derive(Debug, Error)]
pub enum StoreError {
    /// The store refused the data (e.g. a constraint violation)
    #[error("Invalid {field}: {message}")]
    Invalid { field: String, message: String },

    /// Backend failure (connection, query, ...)
    #[error("Store backend error: {0}")]
    Backend(String),
}

impl StoreError {
    pub fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        StoreError::Invalid {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn backend(msg: impl Into<String>) -> Self {
        StoreError::Backend(msg.into())
    }
}

/// Errors raised by LLM drivers
#[derive(Debug, Clone, Error)]
pub enum LlmError {
    /// The backend could not be reached or is temporarily unable to serve
    #[error("LLM backend unavailable: {0}")]
    Unavailable(String),

    /// The backend rejected the configured model (decommissioned, unknown)
    #[error("Model `{model}` rejected by backend: {message}")]
    ModelRejected { model: String, message: String },

    /// Any other error reported by the backend
    #[error("LLM API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// The backend answered with something that is not a completion
    #[error("Unexpected LLM response: {0}")]
    Protocol(String),
}

impl LlmError {
    pub fn unavailable(msg: impl Into<String>) -> Self {
        LlmError::Unavailable(msg.into())
    }

    pub fn protocol(msg: impl Into<String>) -> Self {
        LlmError::Protocol(msg.into())
    }
}

/// Errors that can occur while handling an assistant request
#[derive(Debug, Error)]
pub enum AssistantError {
    /// Empty or absent user message; no model call is made
    #[error("message required")]
    InputMissing,

    /// Transport-level failure reaching the language model backend
    #[error("Language model service unavailable: {0}")]
    UpstreamUnavailable(String),

    /// Model identifier rejected by the backend; an operator must change it
    #[error("The configured model `{model}` is no longer available. Update LLM_MODEL and restart the server.")]
    UpstreamConfigInvalid { model: String, message: String },

    /// Any other upstream failure
    #[error("Language model error: {0}")]
    Upstream(String),

    /// Output was not JSON, even after one repair attempt
    #[error("LLM JSON parse error")]
    ResponseMalformed { raw: String, repair: String },

    /// Output was JSON but not a known intent shape
    #[error("Invalid intent shape")]
    SchemaViolation(SchemaViolation),

    /// Update/delete target missing or owned by someone else
    #[error("{kind} not found")]
    EntityNotFound { kind: EntityKind, id: String },

    /// `delete_events` without ids or filter criteria
    #[error("Provide eventIds or filter")]
    SelectorMissing,

    /// A bulk plan stopped partway; earlier items stay created
    #[error("Bulk plan interrupted after {} item(s): {source}", .created_ids.len())]
    BulkPlanInterrupted {
        created_ids: Vec<String>,
        #[source]
        source: StoreError,
    },

    /// Store failure outside of bulk plans
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl AssistantError {
    pub fn not_found(kind: EntityKind, id: impl Into<String>) -> Self {
        AssistantError::EntityNotFound {
            kind,
            id: id.into(),
        }
    }

    /// Stable machine-readable code for logs and clients
    pub fn code(&self) -> &'static str {
        match self {
            AssistantError::InputMissing => "input_missing",
            AssistantError::UpstreamUnavailable(_) => "upstream_unavailable",
            AssistantError::UpstreamConfigInvalid { .. } => "upstream_config_invalid",
            AssistantError::Upstream(_) => "upstream_error",
            AssistantError::ResponseMalformed { .. } => "response_malformed",
            AssistantError::SchemaViolation(_) => "schema_violation",
            AssistantError::EntityNotFound { .. } => "entity_not_found",
            AssistantError::SelectorMissing => "selector_missing",
            AssistantError::BulkPlanInterrupted { .. } => "bulk_plan_interrupted",
            AssistantError::Store(_) => "store_error",
        }
    }
}

impl From<SchemaViolation> for AssistantError {
    fn from(violation: SchemaViolation) -> Self {
        AssistantError::SchemaViolation(violation)
    }
}

impl From<LlmError> for AssistantError {
    fn from(err: LlmError) -> Self {
        match err {
            LlmError::Unavailable(msg) => AssistantError::UpstreamUnavailable(msg),
            LlmError::ModelRejected { model, message } => {
                AssistantError::UpstreamConfigInvalid { model, message }
            }
            other => AssistantError::Upstream(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_rejection_maps_to_config_error() {
        let err: AssistantError = LlmError::ModelRejected {
            model: "llama3-70b-8192".to_string(),
            message: "The model has been decommissioned".to_string(),
        }
        .into();

        assert_eq!(err.code(), "upstream_config_invalid");
        assert!(err.to_string().contains("llama3-70b-8192"));
    }

    #[test]
    fn test_unavailable_and_api_errors_map_distinctly() {
        let unavailable: AssistantError = LlmError::unavailable("connection refused").into();
        assert_eq!(unavailable.code(), "upstream_unavailable");

        let api: AssistantError = LlmError::Api {
            status: 400,
            message: "bad request".to_string(),
        }
        .into();
        assert_eq!(api.code(), "upstream_error");
    }
}
