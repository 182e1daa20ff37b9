// Intent dispatcher
//
// Executes exactly one validated intent against the stores and shapes the
// reply. Every store call is scoped to the requesting owner. The dispatcher
// sorts listings itself; store order is not relied upon.
//
// New events are not checked for overlaps here: the model is instructed to
// avoid them and the dispatcher trusts its output.

use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::domain::{sort_events, sort_tasks, Event, EventPatch, OwnerId, Task};
use crate::error::{AssistantError, EntityKind, Result};
use crate::intent::{
    EventSelector, Intent, IssueCode, PomodoroAction, SchemaViolation, TaskStatus, TimeRange,
};
use crate::prompt::DEFAULT_HELP_PROMPT;
use crate::traits::{EventFilter, EventStore, TaskFilter, TaskStore};

pub const DEFAULT_POMODORO_MINUTES: f64 = 25.0;

// ============================================================================
// Replies
// ============================================================================

/// Id and title of a bulk-deleted event
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeletedEvent {
    pub id: String,
    pub title: String,
}

/// Timer instruction for the client-side Pomodoro
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PomodoroCommand {
    pub action: PomodoroAction,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_seconds: Option<u64>,
}

/// Reply for every intent except `help`, tagged by `action`
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ActionReply {
    Created {
        event: Event,
    },
    Updated {
        event: Event,
    },
    Deleted {
        id: String,
    },
    EventsDeleted {
        count: usize,
        events: Vec<DeletedEvent>,
    },
    DeleteNone {
        count: usize,
        events: Vec<DeletedEvent>,
    },
    List {
        events: Vec<Event>,
    },
    TaskCreated {
        task: Task,
    },
    TaskUpdated {
        task: Task,
    },
    TaskDeleted {
        id: String,
    },
    TasksList {
        tasks: Vec<Task>,
    },
    Pomodoro {
        message: String,
        command: PomodoroCommand,
    },
    PlanCreated {
        events: Vec<Event>,
        summary: String,
        count: usize,
    },
    TasksPlanCreated {
        tasks: Vec<Task>,
        summary: String,
        count: usize,
    },
}

impl ActionReply {
    pub fn action(&self) -> &'static str {
        match self {
            ActionReply::Created { .. } => "created",
            ActionReply::Updated { .. } => "updated",
            ActionReply::Deleted { .. } => "deleted",
            ActionReply::EventsDeleted { .. } => "events_deleted",
            ActionReply::DeleteNone { .. } => "delete_none",
            ActionReply::List { .. } => "list",
            ActionReply::TaskCreated { .. } => "task_created",
            ActionReply::TaskUpdated { .. } => "task_updated",
            ActionReply::TaskDeleted { .. } => "task_deleted",
            ActionReply::TasksList { .. } => "tasks_list",
            ActionReply::Pomodoro { .. } => "pomodoro",
            ActionReply::PlanCreated { .. } => "plan_created",
            ActionReply::TasksPlanCreated { .. } => "tasks_plan_created",
        }
    }
}

/// Clarification request; carries no `action`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HelpReply {
    pub help: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestions: Option<Vec<String>>,
}

/// Successful outcome of one assistant request
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum AssistantReply {
    Action(ActionReply),
    Help(HelpReply),
}

impl AssistantReply {
    /// `action` tag, or `help`
    pub fn label(&self) -> &'static str {
        match self {
            AssistantReply::Action(reply) => reply.action(),
            AssistantReply::Help(_) => "help",
        }
    }
}

impl From<ActionReply> for AssistantReply {
    fn from(reply: ActionReply) -> Self {
        AssistantReply::Action(reply)
    }
}

// ============================================================================
// Dispatcher
// ============================================================================

fn store_id(kind: EntityKind, id: &str) -> Result<Uuid> {
    Uuid::parse_str(id.trim()).map_err(|_| AssistantError::not_found(kind, id))
}

fn pomodoro_message(action: PomodoroAction, minutes: Option<f64>) -> String {
    match action {
        PomodoroAction::Start => format!(
            "Starting a {}-minute focus session.",
            minutes.unwrap_or(DEFAULT_POMODORO_MINUTES)
        ),
        PomodoroAction::Stop => "Stopping the current Pomodoro session.".to_string(),
        PomodoroAction::Reset => "Resetting the Pomodoro timer.".to_string(),
    }
}

/// Executes validated intents against the event and task stores
#[derive(Clone)]
pub struct IntentDispatcher {
    events: Arc<dyn EventStore>,
    tasks: Arc<dyn TaskStore>,
}

impl IntentDispatcher {
    pub fn new(events: Arc<dyn EventStore>, tasks: Arc<dyn TaskStore>) -> Self {
        Self { events, tasks }
    }

    pub fn events(&self) -> &Arc<dyn EventStore> {
        &self.events
    }

    pub fn tasks(&self) -> &Arc<dyn TaskStore> {
        &self.tasks
    }

    pub async fn dispatch(&self, owner: &OwnerId, intent: Intent) -> Result<AssistantReply> {
        let reply = match intent {
            Intent::AddEvent(attrs) => {
                let event = self.events.create(owner, attrs).await?;
                tracing::info!(owner = %owner, event_id = %event.id, "Created event");
                ActionReply::Created { event }
            }
            Intent::UpdateEvent { id, updates } => self.update_event(owner, &id, updates).await?,
            Intent::DeleteEvent { id } => {
                let uuid = store_id(EntityKind::Event, &id)?;
                self.events
                    .delete_one(owner, uuid)
                    .await?
                    .ok_or_else(|| AssistantError::not_found(EntityKind::Event, &id))?;
                tracing::info!(owner = %owner, event_id = %uuid, "Deleted event");
                ActionReply::Deleted { id }
            }
            Intent::DeleteEvents {
                event_ids, filter, ..
            } => self.delete_events(owner, event_ids, filter).await?,
            Intent::GetEvents { range } => {
                let filter = match range {
                    Some(TimeRange { start, end }) => EventFilter::overlapping(start, end),
                    None => EventFilter::default(),
                };
                let mut events = self.events.find_many(owner, &filter).await?;
                sort_events(&mut events);
                ActionReply::List { events }
            }
            Intent::AddTask(attrs) => {
                let task = self.tasks.create(owner, attrs).await?;
                tracing::info!(owner = %owner, task_id = %task.id, "Created task");
                ActionReply::TaskCreated { task }
            }
            Intent::UpdateTask { id, updates } => {
                let uuid = store_id(EntityKind::Task, &id)?;
                let task = self
                    .tasks
                    .update_one(owner, uuid, &updates)
                    .await?
                    .ok_or_else(|| AssistantError::not_found(EntityKind::Task, &id))?;
                ActionReply::TaskUpdated { task }
            }
            Intent::DeleteTask { id } => {
                let uuid = store_id(EntityKind::Task, &id)?;
                self.tasks
                    .delete_one(owner, uuid)
                    .await?
                    .ok_or_else(|| AssistantError::not_found(EntityKind::Task, &id))?;
                ActionReply::TaskDeleted { id }
            }
            Intent::GetTasks {
                status,
                due_before,
                due_after,
            } => {
                let filter = TaskFilter {
                    done: status.and_then(|s: TaskStatus| s.done_flag()),
                    due_before,
                    due_after,
                    limit: None,
                };
                let mut tasks = self.tasks.find_many(owner, &filter).await?;
                sort_tasks(&mut tasks);
                ActionReply::TasksList { tasks }
            }
            Intent::ControlPomodoro {
                action,
                duration_minutes,
            } => ActionReply::Pomodoro {
                message: pomodoro_message(action, duration_minutes),
                command: PomodoroCommand {
                    action,
                    duration_seconds: duration_minutes.map(|m| (m * 60.0).round() as u64),
                },
            },
            Intent::PlanSchedule { events, summary } => {
                let mut created = Vec::with_capacity(events.len());
                for attrs in events {
                    match self.events.create(owner, attrs).await {
                        Ok(event) => created.push(event),
                        Err(source) => {
                            tracing::error!(
                                owner = %owner,
                                created = created.len(),
                                error = %source,
                                "Schedule plan interrupted"
                            );
                            return Err(AssistantError::BulkPlanInterrupted {
                                created_ids: created.iter().map(|e| e.id.to_string()).collect(),
                                source,
                            });
                        }
                    }
                }
                tracing::info!(owner = %owner, count = created.len(), "Created schedule plan");
                let count = created.len();
                ActionReply::PlanCreated {
                    summary: summary
                        .filter(|s| !s.trim().is_empty())
                        .unwrap_or_else(|| format!("Created {} event(s) for your schedule.", count)),
                    events: created,
                    count,
                }
            }
            Intent::PlanTasks { tasks, summary } => {
                let mut created = Vec::with_capacity(tasks.len());
                for attrs in tasks {
                    match self.tasks.create(owner, attrs).await {
                        Ok(task) => created.push(task),
                        Err(source) => {
                            tracing::error!(
                                owner = %owner,
                                created = created.len(),
                                error = %source,
                                "Task plan interrupted"
                            );
                            return Err(AssistantError::BulkPlanInterrupted {
                                created_ids: created.iter().map(|t| t.id.to_string()).collect(),
                                source,
                            });
                        }
                    }
                }
                tracing::info!(owner = %owner, count = created.len(), "Created task plan");
                let count = created.len();
                ActionReply::TasksPlanCreated {
                    summary: summary
                        .filter(|s| !s.trim().is_empty())
                        .unwrap_or_else(|| format!("Created {} task(s) for your plan.", count)),
                    tasks: created,
                    count,
                }
            }
            Intent::Help {
                prompt,
                suggestions,
            } => {
                return Ok(AssistantReply::Help(HelpReply {
                    help: prompt.unwrap_or_else(|| DEFAULT_HELP_PROMPT.to_string()),
                    suggestions,
                }))
            }
        };

        Ok(reply.into())
    }

    async fn update_event(
        &self,
        owner: &OwnerId,
        id: &str,
        updates: EventPatch,
    ) -> Result<ActionReply> {
        let uuid = store_id(EntityKind::Event, id)?;

        // a one-sided move must still leave end after start
        if updates.is_one_sided() {
            let stored = self
                .events
                .find_one(owner, uuid)
                .await?
                .ok_or_else(|| AssistantError::not_found(EntityKind::Event, id))?;
            if let Some(field) = updates.range_conflict(&stored) {
                return Err(SchemaViolation::single(
                    format!("payload.updates.{}", field),
                    IssueCode::InvalidRange,
                    "End must be after start",
                )
                .with_raw(serde_json::json!({
                    "intent": "update_event",
                    "payload": { "id": id, "updates": &updates },
                }))
                .into());
            }
        }

        let event = self
            .events
            .update_one(owner, uuid, &updates)
            .await?
            .ok_or_else(|| AssistantError::not_found(EntityKind::Event, id))?;
        tracing::info!(owner = %owner, event_id = %event.id, "Updated event");
        Ok(ActionReply::Updated { event })
    }

    async fn delete_events(
        &self,
        owner: &OwnerId,
        event_ids: Option<Vec<String>>,
        selector: Option<EventSelector>,
    ) -> Result<ActionReply> {
        let filter = match (event_ids, selector) {
            (Some(ids), _) if !ids.is_empty() => {
                // ids that cannot exist in the store match nothing
                let ids: Vec<Uuid> = ids
                    .iter()
                    .filter_map(|id| Uuid::parse_str(id.trim()).ok())
                    .collect();
                EventFilter::with_ids(ids)
            }
            (_, Some(selector)) if !selector.is_empty() => EventFilter {
                title_contains: selector
                    .title_contains
                    .filter(|t| !t.trim().is_empty()),
                start_from: selector.from,
                start_to: selector.to,
                ..Default::default()
            },
            _ => return Err(AssistantError::SelectorMissing),
        };

        let mut matched = self.events.find_many(owner, &filter).await?;
        if matched.is_empty() {
            return Ok(ActionReply::DeleteNone {
                count: 0,
                events: vec![],
            });
        }
        sort_events(&mut matched);

        let ids: Vec<Uuid> = matched.iter().map(|e| e.id).collect();
        let removed = self.events.delete_many(owner, &ids).await?;
        tracing::info!(owner = %owner, matched = ids.len(), removed, "Deleted events");

        Ok(ActionReply::EventsDeleted {
            count: matched.len(),
            events: matched
                .into_iter()
                .map(|e| DeletedEvent {
                    id: e.id.to_string(),
                    title: e.title,
                })
                .collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{EventType, NewEvent, NewTask, TaskPatch};
    use crate::error::{StoreError, StoreResult};
    use crate::memory::{InMemoryEventStore, InMemoryTaskStore};
    use async_trait::async_trait;
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use rand::seq::SliceRandom;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn at(d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, d, h, 0, 0).unwrap()
    }

    fn new_event(title: &str, start: DateTime<Utc>, hours: i64) -> NewEvent {
        NewEvent {
            title: title.to_string(),
            start,
            end: start + Duration::hours(hours),
            all_day: false,
            event_type: EventType::Event,
            course_code: None,
            location: None,
            notes: None,
        }
    }

    fn new_task(title: &str, due: Option<DateTime<Utc>>) -> NewTask {
        NewTask {
            title: title.to_string(),
            due,
            notes: None,
        }
    }

    struct Fixture {
        owner: OwnerId,
        events: InMemoryEventStore,
        tasks: InMemoryTaskStore,
        dispatcher: IntentDispatcher,
    }

    fn fixture() -> Fixture {
        let events = InMemoryEventStore::new();
        let tasks = InMemoryTaskStore::new();
        let dispatcher =
            IntentDispatcher::new(Arc::new(events.clone()), Arc::new(tasks.clone()));
        Fixture {
            owner: OwnerId::new("student-1"),
            events,
            tasks,
            dispatcher,
        }
    }

    fn action(reply: AssistantReply) -> ActionReply {
        match reply {
            AssistantReply::Action(reply) => reply,
            AssistantReply::Help(help) => panic!("unexpected help reply: {help:?}"),
        }
    }

    #[tokio::test]
    async fn test_add_event_echoes_created_event() {
        let f = fixture();
        let attrs = new_event("Algorithms lecture", at(6, 10), 2);

        let reply = f
            .dispatcher
            .dispatch(&f.owner, Intent::AddEvent(attrs.clone()))
            .await
            .unwrap();

        let ActionReply::Created { event } = action(reply) else {
            panic!("expected created");
        };
        assert_eq!(event.title, attrs.title);
        assert_eq!(event.start, attrs.start);
        assert_eq!(event.end, attrs.end);
        assert!(f
            .events
            .find_one(&f.owner, event.id)
            .await
            .unwrap()
            .is_some());
    }

    #[tokio::test]
    async fn test_update_and_delete_unknown_ids_are_not_found() {
        let f = fixture();

        for intent in [
            Intent::UpdateEvent {
                id: Uuid::now_v7().to_string(),
                updates: EventPatch::default(),
            },
            Intent::DeleteEvent {
                id: "not-a-uuid".to_string(),
            },
        ] {
            let err = f.dispatcher.dispatch(&f.owner, intent).await.unwrap_err();
            assert!(matches!(
                err,
                AssistantError::EntityNotFound {
                    kind: EntityKind::Event,
                    ..
                }
            ));
        }

        let err = f
            .dispatcher
            .dispatch(
                &f.owner,
                Intent::UpdateTask {
                    id: "64f0c2a1e4b0".to_string(),
                    updates: TaskPatch::default(),
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Task not found");
    }

    #[tokio::test]
    async fn test_other_owners_entities_are_not_found() {
        let f = fixture();
        let foreign = f
            .events
            .create(&OwnerId::new("other"), new_event("Private", at(6, 9), 1))
            .await
            .unwrap();

        let err = f
            .dispatcher
            .dispatch(
                &f.owner,
                Intent::DeleteEvent {
                    id: foreign.id.to_string(),
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err.code(), "entity_not_found");
        assert_eq!(f.events.len().await, 1);
    }

    #[tokio::test]
    async fn test_one_sided_update_rechecks_stored_range() {
        let f = fixture();
        let event = f
            .events
            .create(&f.owner, new_event("Calculus", at(6, 10), 2))
            .await
            .unwrap();

        let err = f
            .dispatcher
            .dispatch(
                &f.owner,
                Intent::UpdateEvent {
                    id: event.id.to_string(),
                    updates: EventPatch {
                        start: Some(at(6, 13)),
                        ..Default::default()
                    },
                },
            )
            .await
            .unwrap_err();
        let AssistantError::SchemaViolation(violation) = err else {
            panic!("expected schema violation");
        };
        assert_eq!(violation.paths(), vec!["payload.updates.start"]);
        assert_eq!(violation.raw["intent"], "update_event");
        assert_eq!(violation.raw["payload"]["id"], event.id.to_string());
        assert_eq!(
            violation.raw["payload"]["updates"],
            serde_json::json!({ "start": at(6, 13) })
        );
        let stored = f.events.find_one(&f.owner, event.id).await.unwrap().unwrap();
        assert_eq!(stored.start, at(6, 10));

        let reply = f
            .dispatcher
            .dispatch(
                &f.owner,
                Intent::UpdateEvent {
                    id: event.id.to_string(),
                    updates: EventPatch {
                        start: Some(at(7, 8)),
                        end: Some(at(7, 10)),
                        ..Default::default()
                    },
                },
            )
            .await
            .unwrap();
        let ActionReply::Updated { event } = action(reply) else {
            panic!("expected updated");
        };
        assert_eq!(event.start, at(7, 8));
        assert_eq!(event.title, "Calculus");
    }

    #[tokio::test]
    async fn test_get_events_sorted_regardless_of_insertion_order() {
        let f = fixture();
        let mut starts: Vec<u32> = (6..16).collect();
        starts.shuffle(&mut rand::thread_rng());
        for day in &starts {
            f.events
                .create(&f.owner, new_event(&format!("Day {}", day), at(*day, 9), 1))
                .await
                .unwrap();
        }

        let reply = f
            .dispatcher
            .dispatch(&f.owner, Intent::GetEvents { range: None })
            .await
            .unwrap();
        let ActionReply::List { events } = action(reply) else {
            panic!("expected list");
        };
        assert_eq!(events.len(), 10);
        assert!(events.windows(2).all(|w| w[0].start <= w[1].start));
    }

    #[tokio::test]
    async fn test_get_events_range_uses_overlap() {
        let f = fixture();
        f.events
            .create(&f.owner, new_event("Spanning", at(6, 8), 4))
            .await
            .unwrap();
        f.events
            .create(&f.owner, new_event("Later", at(6, 14), 1))
            .await
            .unwrap();

        let reply = f
            .dispatcher
            .dispatch(
                &f.owner,
                Intent::GetEvents {
                    range: Some(TimeRange {
                        start: Some(at(6, 10)),
                        end: Some(at(6, 11)),
                    }),
                },
            )
            .await
            .unwrap();
        let ActionReply::List { events } = action(reply) else {
            panic!("expected list");
        };
        let titles: Vec<_> = events.iter().map(|e| e.title.as_str()).collect();
        assert_eq!(titles, vec!["Spanning"]);
    }

    #[tokio::test]
    async fn test_get_tasks_sorted_and_filtered() {
        let f = fixture();
        let mut specs = vec![
            ("Undated", None),
            ("Due 9", Some(at(9, 17))),
            ("Due 7", Some(at(7, 17))),
            ("Due 12", Some(at(12, 17))),
        ];
        specs.shuffle(&mut rand::thread_rng());
        for (title, due) in specs {
            f.tasks.create(&f.owner, new_task(title, due)).await.unwrap();
        }
        let done = f
            .tasks
            .create(&f.owner, new_task("Done 8", Some(at(8, 17))))
            .await
            .unwrap();
        f.tasks
            .update_one(
                &f.owner,
                done.id,
                &TaskPatch {
                    done: Some(true),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let reply = f
            .dispatcher
            .dispatch(
                &f.owner,
                Intent::GetTasks {
                    status: Some(TaskStatus::Open),
                    due_before: None,
                    due_after: None,
                },
            )
            .await
            .unwrap();
        let ActionReply::TasksList { tasks } = action(reply) else {
            panic!("expected tasks_list");
        };
        let titles: Vec<_> = tasks.iter().map(|t| t.title.as_str()).collect();
        assert_eq!(titles, vec!["Due 7", "Due 9", "Due 12", "Undated"]);

        let reply = f
            .dispatcher
            .dispatch(
                &f.owner,
                Intent::GetTasks {
                    status: None,
                    due_before: Some(at(9, 0)),
                    due_after: Some(at(8, 0)),
                },
            )
            .await
            .unwrap();
        let ActionReply::TasksList { tasks } = action(reply) else {
            panic!("expected tasks_list");
        };
        let titles: Vec<_> = tasks.iter().map(|t| t.title.as_str()).collect();
        assert_eq!(titles, vec!["Done 8"]);
    }

    #[tokio::test]
    async fn test_delete_events_by_filter_then_none() {
        let f = fixture();
        f.events
            .create(&f.owner, new_event("Physics lab", at(10, 14), 2))
            .await
            .unwrap();
        f.events
            .create(&f.owner, new_event("PHYSICS lecture", at(8, 9), 1))
            .await
            .unwrap();
        f.events
            .create(&f.owner, new_event("Chemistry lab", at(10, 9), 1))
            .await
            .unwrap();

        let intent = Intent::DeleteEvents {
            event_ids: None,
            filter: Some(EventSelector {
                title_contains: Some("physics".to_string()),
                from: None,
                to: None,
            }),
            confirm: true,
        };

        let reply = f
            .dispatcher
            .dispatch(&f.owner, intent.clone())
            .await
            .unwrap();
        let json = serde_json::to_value(&reply).unwrap();
        assert_eq!(json["action"], "events_deleted");
        assert_eq!(json["count"], 2);
        assert_eq!(json["events"][0]["title"], "PHYSICS lecture");
        assert_eq!(json["events"][1]["title"], "Physics lab");
        assert_eq!(f.events.len().await, 1);

        let reply = f.dispatcher.dispatch(&f.owner, intent).await.unwrap();
        assert_eq!(
            serde_json::to_value(&reply).unwrap(),
            json!({ "action": "delete_none", "count": 0, "events": [] })
        );
        assert_eq!(f.events.len().await, 1);
    }

    #[tokio::test]
    async fn test_delete_events_by_ids_takes_precedence() {
        let f = fixture();
        let keep = f
            .events
            .create(&f.owner, new_event("Physics lab", at(10, 14), 2))
            .await
            .unwrap();
        let doomed = f
            .events
            .create(&f.owner, new_event("Seminar", at(11, 9), 1))
            .await
            .unwrap();

        let reply = f
            .dispatcher
            .dispatch(
                &f.owner,
                Intent::DeleteEvents {
                    event_ids: Some(vec![doomed.id.to_string(), "bogus".to_string()]),
                    filter: Some(EventSelector {
                        title_contains: Some("physics".to_string()),
                        ..Default::default()
                    }),
                    confirm: false,
                },
            )
            .await
            .unwrap();

        let ActionReply::EventsDeleted { count, events } = action(reply) else {
            panic!("expected events_deleted");
        };
        assert_eq!(count, 1);
        assert_eq!(events[0].id, doomed.id.to_string());
        assert!(f.events.find_one(&f.owner, keep.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_delete_events_without_selector_is_rejected() {
        let f = fixture();
        f.events
            .create(&f.owner, new_event("Seminar", at(11, 9), 1))
            .await
            .unwrap();

        for (event_ids, filter) in [
            (None, None),
            (Some(vec![]), None),
            (None, Some(EventSelector::default())),
        ] {
            let err = f
                .dispatcher
                .dispatch(
                    &f.owner,
                    Intent::DeleteEvents {
                        event_ids,
                        filter,
                        confirm: true,
                    },
                )
                .await
                .unwrap_err();
            assert!(matches!(err, AssistantError::SelectorMissing));
        }
        assert_eq!(f.events.len().await, 1);
    }

    #[tokio::test]
    async fn test_pomodoro_reply() {
        let f = fixture();

        let reply = f
            .dispatcher
            .dispatch(
                &f.owner,
                Intent::ControlPomodoro {
                    action: PomodoroAction::Start,
                    duration_minutes: Some(50.0),
                },
            )
            .await
            .unwrap();
        assert_eq!(
            serde_json::to_value(&reply).unwrap(),
            json!({
                "action": "pomodoro",
                "message": "Starting a 50-minute focus session.",
                "command": { "action": "start", "durationSeconds": 3000 }
            })
        );

        let reply = f
            .dispatcher
            .dispatch(
                &f.owner,
                Intent::ControlPomodoro {
                    action: PomodoroAction::Start,
                    duration_minutes: None,
                },
            )
            .await
            .unwrap();
        let json = serde_json::to_value(&reply).unwrap();
        assert_eq!(json["message"], "Starting a 25-minute focus session.");
        assert!(json["command"].get("durationSeconds").is_none());

        let reply = f
            .dispatcher
            .dispatch(
                &f.owner,
                Intent::ControlPomodoro {
                    action: PomodoroAction::Reset,
                    duration_minutes: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(
            serde_json::to_value(&reply).unwrap()["message"],
            "Resetting the Pomodoro timer."
        );
    }

    #[tokio::test]
    async fn test_help_defaults_prompt() {
        let f = fixture();

        let reply = f
            .dispatcher
            .dispatch(
                &f.owner,
                Intent::Help {
                    prompt: None,
                    suggestions: None,
                },
            )
            .await
            .unwrap();

        let json = serde_json::to_value(&reply).unwrap();
        assert_eq!(json, json!({ "help": DEFAULT_HELP_PROMPT }));
        assert_eq!(reply.label(), "help");
    }

    #[tokio::test]
    async fn test_plan_schedule_does_not_check_overlaps() {
        let f = fixture();
        f.events
            .create(&f.owner, new_event("Existing", at(6, 10), 2))
            .await
            .unwrap();

        let reply = f
            .dispatcher
            .dispatch(
                &f.owner,
                Intent::PlanSchedule {
                    events: vec![
                        new_event("Overlapping", at(6, 11), 1),
                        new_event("Next day", at(7, 11), 1),
                    ],
                    summary: None,
                },
            )
            .await
            .unwrap();

        let ActionReply::PlanCreated {
            events,
            summary,
            count,
        } = action(reply)
        else {
            panic!("expected plan_created");
        };
        assert_eq!(count, 2);
        assert_eq!(events[0].title, "Overlapping");
        assert_eq!(summary, "Created 2 event(s) for your schedule.");
        assert_eq!(f.events.len().await, 3);
    }

    #[tokio::test]
    async fn test_plan_tasks_keeps_given_summary() {
        let f = fixture();

        let reply = f
            .dispatcher
            .dispatch(
                &f.owner,
                Intent::PlanTasks {
                    tasks: vec![new_task("Outline", None), new_task("Draft", None)],
                    summary: Some("Essay plan".to_string()),
                },
            )
            .await
            .unwrap();

        let json = serde_json::to_value(&reply).unwrap();
        assert_eq!(json["action"], "tasks_plan_created");
        assert_eq!(json["summary"], "Essay plan");
        assert_eq!(json["count"], 2);
        assert_eq!(json["tasks"][1]["title"], "Draft");
    }

    /// Event store that fails every create after the first `allowed`
    struct FlakyEventStore {
        inner: InMemoryEventStore,
        allowed: usize,
        creates: AtomicUsize,
    }

    #[async_trait]
    impl EventStore for FlakyEventStore {
        async fn find_many(
            &self,
            owner: &OwnerId,
            filter: &EventFilter,
        ) -> StoreResult<Vec<Event>> {
            self.inner.find_many(owner, filter).await
        }

        async fn find_one(&self, owner: &OwnerId, id: Uuid) -> StoreResult<Option<Event>> {
            self.inner.find_one(owner, id).await
        }

        async fn create(&self, owner: &OwnerId, event: NewEvent) -> StoreResult<Event> {
            if self.creates.fetch_add(1, Ordering::SeqCst) >= self.allowed {
                return Err(StoreError::backend("connection reset"));
            }
            self.inner.create(owner, event).await
        }

        async fn update_one(
            &self,
            owner: &OwnerId,
            id: Uuid,
            patch: &EventPatch,
        ) -> StoreResult<Option<Event>> {
            self.inner.update_one(owner, id, patch).await
        }

        async fn delete_one(&self, owner: &OwnerId, id: Uuid) -> StoreResult<Option<Event>> {
            self.inner.delete_one(owner, id).await
        }

        async fn delete_many(&self, owner: &OwnerId, ids: &[Uuid]) -> StoreResult<u64> {
            self.inner.delete_many(owner, ids).await
        }
    }

    #[tokio::test]
    async fn test_interrupted_plan_keeps_created_items() {
        let events = InMemoryEventStore::new();
        let dispatcher = IntentDispatcher::new(
            Arc::new(FlakyEventStore {
                inner: events.clone(),
                allowed: 2,
                creates: AtomicUsize::new(0),
            }),
            Arc::new(InMemoryTaskStore::new()),
        );
        let owner = OwnerId::new("student-1");

        let err = dispatcher
            .dispatch(
                &owner,
                Intent::PlanSchedule {
                    events: vec![
                        new_event("Session 1", at(6, 9), 1),
                        new_event("Session 2", at(7, 9), 1),
                        new_event("Session 3", at(8, 9), 1),
                        new_event("Session 4", at(9, 9), 1),
                    ],
                    summary: None,
                },
            )
            .await
            .unwrap_err();

        let AssistantError::BulkPlanInterrupted { created_ids, .. } = err else {
            panic!("expected bulk plan interruption");
        };
        assert_eq!(created_ids.len(), 2);
        assert_eq!(events.len().await, 2);
    }
}
