// Domain entities owned by the data store
//
// Events and tasks are created, updated and deleted by the store; the
// assistant pipeline only references them. Serialized shapes use camelCase so
// that a stored entity re-validates against the intent payload schema.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use uuid::Uuid;

use crate::instant;

/// Opaque identifier of the user owning events and tasks
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OwnerId(String);

impl OwnerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OwnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for OwnerId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Kind of calendar entry
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventType {
    #[default]
    Event,
    Course,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::Event => "event",
            EventType::Course => "course",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "event" => Some(EventType::Event),
            "course" => Some(EventType::Course),
            _ => None,
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Calendar event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: Uuid,
    pub title: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub all_day: bool,
    #[serde(rename = "type")]
    pub event_type: EventType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub course_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Attributes for a new event
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewEvent {
    pub title: String,
    #[serde(deserialize_with = "instant::required")]
    pub start: DateTime<Utc>,
    #[serde(deserialize_with = "instant::required")]
    pub end: DateTime<Utc>,
    #[serde(default)]
    pub all_day: bool,
    #[serde(rename = "type", default)]
    pub event_type: EventType,
    pub course_code: Option<String>,
    pub location: Option<String>,
    pub notes: Option<String>,
}

/// Partial update for an event. `None` leaves the field untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(
        default,
        deserialize_with = "instant::optional",
        skip_serializing_if = "Option::is_none"
    )]
    pub start: Option<DateTime<Utc>>,
    #[serde(
        default,
        deserialize_with = "instant::optional",
        skip_serializing_if = "Option::is_none"
    )]
    pub end: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub all_day: Option<bool>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub event_type: Option<EventType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub course_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl EventPatch {
    /// True when exactly one bound of the range is replaced
    pub fn is_one_sided(&self) -> bool {
        self.start.is_some() != self.end.is_some()
    }

    /// Bound that breaks `end > start` once the patch lands on `event`.
    ///
    /// Returns the wire name of the field the patch set (`end` when both are
    /// set), or `None` when the merged range is valid or the patch leaves the
    /// range alone.
    pub fn range_conflict(&self, event: &Event) -> Option<&'static str> {
        if self.start.is_none() && self.end.is_none() {
            return None;
        }
        let start = self.start.unwrap_or(event.start);
        let end = self.end.unwrap_or(event.end);
        if end > start {
            None
        } else if self.end.is_some() {
            Some("end")
        } else {
            Some("start")
        }
    }

    /// Apply the patch to an event in place
    pub fn apply(&self, event: &mut Event) {
        if let Some(title) = &self.title {
            event.title = title.clone();
        }
        if let Some(start) = self.start {
            event.start = start;
        }
        if let Some(end) = self.end {
            event.end = end;
        }
        if let Some(all_day) = self.all_day {
            event.all_day = all_day;
        }
        if let Some(event_type) = self.event_type {
            event.event_type = event_type;
        }
        if let Some(course_code) = &self.course_code {
            event.course_code = Some(course_code.clone());
        }
        if let Some(location) = &self.location {
            event.location = Some(location.clone());
        }
        if let Some(notes) = &self.notes {
            event.notes = Some(notes.clone());
        }
    }
}

/// To-do item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: Uuid,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub done: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Attributes for a new task
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct NewTask {
    pub title: String,
    #[serde(default, deserialize_with = "instant::optional")]
    pub due: Option<DateTime<Utc>>,
    pub notes: Option<String>,
}

/// Partial update for a task
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct TaskPatch {
    pub title: Option<String>,
    #[serde(default, deserialize_with = "instant::optional")]
    pub due: Option<DateTime<Utc>>,
    pub done: Option<bool>,
    pub notes: Option<String>,
}

impl TaskPatch {
    pub fn apply(&self, task: &mut Task) {
        if let Some(title) = &self.title {
            task.title = title.clone();
        }
        if let Some(due) = self.due {
            task.due = Some(due);
        }
        if let Some(done) = self.done {
            task.done = done;
        }
        if let Some(notes) = &self.notes {
            task.notes = Some(notes.clone());
        }
    }
}

/// Event listing order: start ascending, creation order among equal starts
pub fn event_order(a: &Event, b: &Event) -> Ordering {
    a.start
        .cmp(&b.start)
        .then_with(|| a.created_at.cmp(&b.created_at))
        .then_with(|| a.id.cmp(&b.id))
}

/// Task listing order: due ascending with undated tasks last, then newest first
pub fn task_order(a: &Task, b: &Task) -> Ordering {
    let by_due = match (a.due, b.due) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    };
    by_due
        .then_with(|| b.created_at.cmp(&a.created_at))
        .then_with(|| b.id.cmp(&a.id))
}

pub fn sort_events(events: &mut [Event]) {
    events.sort_by(event_order);
}

pub fn sort_tasks(tasks: &mut [Task]) {
    tasks.sort_by(task_order);
}
