// Core traits for pluggable backends
//
// The assistant pipeline never talks to a database or an HTTP client
// directly. Stores and the language model are reached through these traits:
// - In-memory implementations for tests and local development
// - Postgres implementations for production
// - OpenAI-compatible HTTP driver for the model

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::{Event, EventPatch, NewEvent, NewTask, OwnerId, Task, TaskPatch};
use crate::error::{LlmError, StoreResult};
use crate::llm::{LlmCallConfig, LlmMessage, LlmResponse};

// ============================================================================
// EventStore - Calendar events
// ============================================================================

/// Query criteria for events. Every set criterion must match.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventFilter {
    /// Restrict to these ids
    pub ids: Option<Vec<Uuid>>,
    /// Case-insensitive substring of the title
    pub title_contains: Option<String>,
    /// Event starts at or after this instant
    pub start_from: Option<DateTime<Utc>>,
    /// Event starts at or before this instant
    pub start_to: Option<DateTime<Utc>>,
    /// Event ends at or after this instant
    pub end_from: Option<DateTime<Utc>>,
}

impl EventFilter {
    /// Events whose start lies in `[from, to]`
    pub fn starting_between(from: DateTime<Utc>, to: DateTime<Utc>) -> Self {
        Self {
            start_from: Some(from),
            start_to: Some(to),
            ..Default::default()
        }
    }

    /// Events intersecting `[start, end]`; either bound may be open
    pub fn overlapping(start: Option<DateTime<Utc>>, end: Option<DateTime<Utc>>) -> Self {
        Self {
            end_from: start,
            start_to: end,
            ..Default::default()
        }
    }

    pub fn with_ids(ids: Vec<Uuid>) -> Self {
        Self {
            ids: Some(ids),
            ..Default::default()
        }
    }

    pub fn matches(&self, event: &Event) -> bool {
        if let Some(ids) = &self.ids {
            if !ids.contains(&event.id) {
                return false;
            }
        }
        if let Some(needle) = &self.title_contains {
            if !event
                .title
                .to_lowercase()
                .contains(&needle.to_lowercase())
            {
                return false;
            }
        }
        if self.start_from.is_some_and(|from| event.start < from) {
            return false;
        }
        if self.start_to.is_some_and(|to| event.start > to) {
            return false;
        }
        if self.end_from.is_some_and(|from| event.end < from) {
            return false;
        }
        true
    }
}

/// Owner-scoped persistence for calendar events
///
/// Implementations must never return or modify another owner's events.
/// Result order is unspecified; callers sort.
#[async_trait]
pub trait EventStore: Send + Sync {
    async fn find_many(&self, owner: &OwnerId, filter: &EventFilter) -> StoreResult<Vec<Event>>;

    async fn find_one(&self, owner: &OwnerId, id: Uuid) -> StoreResult<Option<Event>>;

    /// Persist a new event; the store assigns id and timestamps
    async fn create(&self, owner: &OwnerId, event: NewEvent) -> StoreResult<Event>;

    /// Apply a patch; `None` when no such event exists for the owner
    async fn update_one(
        &self,
        owner: &OwnerId,
        id: Uuid,
        patch: &EventPatch,
    ) -> StoreResult<Option<Event>>;

    /// Delete one event; returns the removed event if it existed
    async fn delete_one(&self, owner: &OwnerId, id: Uuid) -> StoreResult<Option<Event>>;

    /// Delete every listed event owned by `owner`; returns how many went away
    async fn delete_many(&self, owner: &OwnerId, ids: &[Uuid]) -> StoreResult<u64>;
}

// ============================================================================
// TaskStore - To-do items
// ============================================================================

/// Query criteria for tasks
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskFilter {
    pub done: Option<bool>,
    /// Due at or before this instant (undated tasks never match)
    pub due_before: Option<DateTime<Utc>>,
    /// Due at or after this instant (undated tasks never match)
    pub due_after: Option<DateTime<Utc>>,
    /// Maximum number of tasks, taken in listing order
    pub limit: Option<usize>,
}

impl TaskFilter {
    pub fn open(limit: usize) -> Self {
        Self {
            done: Some(false),
            limit: Some(limit),
            ..Default::default()
        }
    }

    pub fn matches(&self, task: &Task) -> bool {
        if self.done.is_some_and(|done| task.done != done) {
            return false;
        }
        if let Some(before) = self.due_before {
            if !task.due.is_some_and(|due| due <= before) {
                return false;
            }
        }
        if let Some(after) = self.due_after {
            if !task.due.is_some_and(|due| due >= after) {
                return false;
            }
        }
        true
    }
}

/// Owner-scoped persistence for tasks
///
/// When `limit` is set, implementations apply it after ordering by due
/// ascending (undated last), then creation descending.
#[async_trait]
pub trait TaskStore: Send + Sync {
    async fn find_many(&self, owner: &OwnerId, filter: &TaskFilter) -> StoreResult<Vec<Task>>;

    async fn find_one(&self, owner: &OwnerId, id: Uuid) -> StoreResult<Option<Task>>;

    async fn create(&self, owner: &OwnerId, task: NewTask) -> StoreResult<Task>;

    async fn update_one(
        &self,
        owner: &OwnerId,
        id: Uuid,
        patch: &TaskPatch,
    ) -> StoreResult<Option<Task>>;

    async fn delete_one(&self, owner: &OwnerId, id: Uuid) -> StoreResult<Option<Task>>;

    async fn delete_many(&self, owner: &OwnerId, ids: &[Uuid]) -> StoreResult<u64>;
}

// ============================================================================
// LlmDriver - Chat completions
// ============================================================================

/// Driver for a chat-completion backend
///
/// One call is one round trip. Drivers do not retry; the caller decides.
#[async_trait]
pub trait LlmDriver: Send + Sync {
    async fn chat_completion(
        &self,
        messages: Vec<LlmMessage>,
        config: &LlmCallConfig,
    ) -> Result<LlmResponse, LlmError>;
}
