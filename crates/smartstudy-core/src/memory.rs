// In-memory implementations for tests and local development
//
// These implementations keep all data in memory:
// - Unit and integration tests
// - Running the server without a database
// - Scripted language model replies

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::domain::{
    sort_tasks, Event, EventPatch, NewEvent, NewTask, OwnerId, Task, TaskPatch,
};
use crate::error::{LlmError, StoreError, StoreResult};
use crate::llm::{LlmCallConfig, LlmMessage, LlmResponse};
use crate::traits::{EventFilter, EventStore, LlmDriver, TaskFilter, TaskStore};

// ============================================================================
// InMemoryEventStore
// ============================================================================

/// In-memory event store keyed by event id
#[derive(Debug, Default, Clone)]
pub struct InMemoryEventStore {
    events: Arc<RwLock<HashMap<Uuid, (OwnerId, Event)>>>,
}

impl InMemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a fully formed event (useful for fixtures with fixed timestamps)
    pub async fn insert(&self, owner: &OwnerId, event: Event) {
        self.events
            .write()
            .await
            .insert(event.id, (owner.clone(), event));
    }

    /// Number of events across all owners
    pub async fn len(&self) -> usize {
        self.events.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.events.read().await.is_empty()
    }
}

fn check_range(event: &Event) -> StoreResult<()> {
    if event.end <= event.start {
        return Err(StoreError::invalid("end", "end must be after start"));
    }
    Ok(())
}

#[async_trait]
impl EventStore for InMemoryEventStore {
    async fn find_many(&self, owner: &OwnerId, filter: &EventFilter) -> StoreResult<Vec<Event>> {
        Ok(self
            .events
            .read()
            .await
            .values()
            .filter(|(o, e)| o == owner && filter.matches(e))
            .map(|(_, e)| e.clone())
            .collect())
    }

    async fn find_one(&self, owner: &OwnerId, id: Uuid) -> StoreResult<Option<Event>> {
        Ok(self
            .events
            .read()
            .await
            .get(&id)
            .filter(|(o, _)| o == owner)
            .map(|(_, e)| e.clone()))
    }

    async fn create(&self, owner: &OwnerId, event: NewEvent) -> StoreResult<Event> {
        let now = Utc::now();
        let event = Event {
            id: Uuid::now_v7(),
            title: event.title,
            start: event.start,
            end: event.end,
            all_day: event.all_day,
            event_type: event.event_type,
            course_code: event.course_code,
            location: event.location,
            notes: event.notes,
            created_at: now,
            updated_at: now,
        };
        check_range(&event)?;
        self.insert(owner, event.clone()).await;
        Ok(event)
    }

    async fn update_one(
        &self,
        owner: &OwnerId,
        id: Uuid,
        patch: &EventPatch,
    ) -> StoreResult<Option<Event>> {
        let mut events = self.events.write().await;
        let Some((_, stored)) = events.get_mut(&id).filter(|(o, _)| o == owner) else {
            return Ok(None);
        };

        let mut updated = stored.clone();
        patch.apply(&mut updated);
        check_range(&updated)?;
        updated.updated_at = Utc::now();
        *stored = updated.clone();
        Ok(Some(updated))
    }

    async fn delete_one(&self, owner: &OwnerId, id: Uuid) -> StoreResult<Option<Event>> {
        let mut events = self.events.write().await;
        if !events.get(&id).is_some_and(|(o, _)| o == owner) {
            return Ok(None);
        }
        Ok(events.remove(&id).map(|(_, e)| e))
    }

    async fn delete_many(&self, owner: &OwnerId, ids: &[Uuid]) -> StoreResult<u64> {
        let mut events = self.events.write().await;
        let before = events.len();
        events.retain(|id, (o, _)| !(o == owner && ids.contains(id)));
        Ok((before - events.len()) as u64)
    }
}

// ============================================================================
// InMemoryTaskStore
// ============================================================================

/// In-memory task store keyed by task id
#[derive(Debug, Default, Clone)]
pub struct InMemoryTaskStore {
    tasks: Arc<RwLock<HashMap<Uuid, (OwnerId, Task)>>>,
}

impl InMemoryTaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, owner: &OwnerId, task: Task) {
        self.tasks
            .write()
            .await
            .insert(task.id, (owner.clone(), task));
    }

    pub async fn len(&self) -> usize {
        self.tasks.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.tasks.read().await.is_empty()
    }
}

#[async_trait]
impl TaskStore for InMemoryTaskStore {
    async fn find_many(&self, owner: &OwnerId, filter: &TaskFilter) -> StoreResult<Vec<Task>> {
        let mut tasks: Vec<Task> = self
            .tasks
            .read()
            .await
            .values()
            .filter(|(o, t)| o == owner && filter.matches(t))
            .map(|(_, t)| t.clone())
            .collect();

        if let Some(limit) = filter.limit {
            sort_tasks(&mut tasks);
            tasks.truncate(limit);
        }
        Ok(tasks)
    }

    async fn find_one(&self, owner: &OwnerId, id: Uuid) -> StoreResult<Option<Task>> {
        Ok(self
            .tasks
            .read()
            .await
            .get(&id)
            .filter(|(o, _)| o == owner)
            .map(|(_, t)| t.clone()))
    }

    async fn create(&self, owner: &OwnerId, task: NewTask) -> StoreResult<Task> {
        let now = Utc::now();
        let task = Task {
            id: Uuid::now_v7(),
            title: task.title,
            due: task.due,
            notes: task.notes,
            done: false,
            created_at: now,
            updated_at: now,
        };
        self.insert(owner, task.clone()).await;
        Ok(task)
    }

    async fn update_one(
        &self,
        owner: &OwnerId,
        id: Uuid,
        patch: &TaskPatch,
    ) -> StoreResult<Option<Task>> {
        let mut tasks = self.tasks.write().await;
        let Some((_, stored)) = tasks.get_mut(&id).filter(|(o, _)| o == owner) else {
            return Ok(None);
        };

        patch.apply(stored);
        stored.updated_at = Utc::now();
        Ok(Some(stored.clone()))
    }

    async fn delete_one(&self, owner: &OwnerId, id: Uuid) -> StoreResult<Option<Task>> {
        let mut tasks = self.tasks.write().await;
        if !tasks.get(&id).is_some_and(|(o, _)| o == owner) {
            return Ok(None);
        }
        Ok(tasks.remove(&id).map(|(_, t)| t))
    }

    async fn delete_many(&self, owner: &OwnerId, ids: &[Uuid]) -> StoreResult<u64> {
        let mut tasks = self.tasks.write().await;
        let before = tasks.len();
        tasks.retain(|id, (o, _)| !(o == owner && ids.contains(id)));
        Ok((before - tasks.len()) as u64)
    }
}

// ============================================================================
// MockLlmDriver - Returns scripted replies
// ============================================================================

/// A scripted reply: completion text or a driver error
#[derive(Debug, Clone)]
pub enum MockLlmReply {
    Text(String),
    Error(LlmError),
}

/// Mock LLM driver for testing
///
/// Replies are consumed in order; every call is logged with its messages and
/// call config. Running out of replies yields a protocol error.
#[derive(Debug, Default, Clone)]
pub struct MockLlmDriver {
    replies: Arc<RwLock<Vec<MockLlmReply>>>,
    call_index: Arc<RwLock<usize>>,
    call_log: Arc<RwLock<Vec<(Vec<LlmMessage>, LlmCallConfig)>>>,
}

impl MockLlmDriver {
    /// Create a driver answering with the given texts in order
    pub fn new<S: Into<String>>(replies: impl IntoIterator<Item = S>) -> Self {
        Self {
            replies: Arc::new(RwLock::new(
                replies
                    .into_iter()
                    .map(|r| MockLlmReply::Text(r.into()))
                    .collect(),
            )),
            ..Default::default()
        }
    }

    /// Create a driver whose first call fails
    pub fn failing(error: LlmError) -> Self {
        Self {
            replies: Arc::new(RwLock::new(vec![MockLlmReply::Error(error)])),
            ..Default::default()
        }
    }

    pub async fn add_error(&self, error: LlmError) {
        self.replies.write().await.push(MockLlmReply::Error(error));
    }

    /// Messages and config of every call so far
    pub async fn calls(&self) -> Vec<(Vec<LlmMessage>, LlmCallConfig)> {
        self.call_log.read().await.clone()
    }

    pub async fn call_count(&self) -> usize {
        self.call_log.read().await.len()
    }
}

#[async_trait]
impl LlmDriver for MockLlmDriver {
    async fn chat_completion(
        &self,
        messages: Vec<LlmMessage>,
        config: &LlmCallConfig,
    ) -> Result<LlmResponse, LlmError> {
        self.call_log.write().await.push((messages, config.clone()));

        let mut index = self.call_index.write().await;
        let reply = self.replies.read().await.get(*index).cloned();
        *index += 1;
        drop(index);

        match reply {
            Some(MockLlmReply::Text(text)) => Ok(LlmResponse::text(text)),
            Some(MockLlmReply::Error(err)) => Err(err),
            None => Err(LlmError::protocol("no more mock replies configured")),
        }
    }
}
