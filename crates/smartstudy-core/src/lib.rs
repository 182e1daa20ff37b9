// SmartStudy Assistant Pipeline
//
// This crate turns a free-form chat message into one validated operation on
// the user's calendar events and tasks.
//
// Key design decisions:
// - Stores and the language model sit behind traits (EventStore, TaskStore, LlmDriver)
// - The intent catalogue is a closed Rust enum checked against a JSON Schema document
// - At most one JSON-repair retry per request, never a schema retry
// - Configuration is an injected value (AssistantConfig), not global state
// - Bulk plans are created sequentially without rollback
// - In-memory stores and a scripted driver live here for tests and local runs

// Domain entity types
pub mod domain;

pub mod assistant;
pub mod completion;
pub mod config;
pub mod context;
pub mod dispatcher;
pub mod error;
pub mod instant;
pub mod intent;
pub mod llm;
pub mod prompt;
pub mod traits;

// In-memory implementations for tests and local development
pub mod memory;

// Re-exports for convenience
pub use assistant::Assistant;
pub use completion::{strip_code_fences, CompletionRequester};
pub use config::{AssistantConfig, DEFAULT_MODEL};
pub use context::ContextSnapshot;
pub use dispatcher::{
    ActionReply, AssistantReply, DeletedEvent, HelpReply, IntentDispatcher, PomodoroCommand,
};
pub use domain::{
    Event, EventPatch, EventType, NewEvent, NewTask, OwnerId, Task, TaskPatch,
};
pub use error::{AssistantError, EntityKind, LlmError, Result, StoreError, StoreResult};
pub use instant::parse_instant;
pub use intent::{Intent, IntentKind, IssueCode, SchemaIssue, SchemaViolation};
pub use llm::{
    LlmCallConfig, LlmCompletionMetadata, LlmMessage, LlmMessageRole, LlmResponse,
    ResponseFormat,
};
pub use traits::{EventFilter, EventStore, LlmDriver, TaskFilter, TaskStore};
