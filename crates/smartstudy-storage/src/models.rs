// Database models (internal, converted to domain entities at the store boundary)

use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

use smartstudy_core::{Event, EventType, StoreError, Task};

/// Column list shared by every event query
pub const EVENT_COLUMNS: &str = "id, title, start_at, end_at, all_day, event_type, course_code, location, notes, created_at, updated_at";

/// Column list shared by every task query
pub const TASK_COLUMNS: &str = "id, title, due_at, notes, done, created_at, updated_at";

#[derive(Debug, Clone, FromRow)]
pub struct EventRow {
    pub id: Uuid,
    pub title: String,
    pub start_at: DateTime<Utc>,
    pub end_at: DateTime<Utc>,
    pub all_day: bool,
    pub event_type: String,
    pub course_code: Option<String>,
    pub location: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<EventRow> for Event {
    type Error = StoreError;

    fn try_from(row: EventRow) -> Result<Self, Self::Error> {
        let event_type = EventType::parse(&row.event_type).ok_or_else(|| {
            StoreError::backend(format!(
                "Unknown event_type '{}' for event {}",
                row.event_type, row.id
            ))
        })?;

        Ok(Event {
            id: row.id,
            title: row.title,
            start: row.start_at,
            end: row.end_at,
            all_day: row.all_day,
            event_type,
            course_code: row.course_code,
            location: row.location,
            notes: row.notes,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct TaskRow {
    pub id: Uuid,
    pub title: String,
    pub due_at: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    pub done: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<TaskRow> for Task {
    fn from(row: TaskRow) -> Self {
        Task {
            id: row.id,
            title: row.title,
            due: row.due_at,
            notes: row.notes,
            done: row.done,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn row(event_type: &str) -> EventRow {
        let at = Utc.with_ymd_and_hms(2025, 1, 6, 10, 0, 0).unwrap();
        EventRow {
            id: Uuid::now_v7(),
            title: "Algorithms".to_string(),
            start_at: at,
            end_at: at + chrono::Duration::hours(2),
            all_day: false,
            event_type: event_type.to_string(),
            course_code: Some("CS201".to_string()),
            location: None,
            notes: None,
            created_at: at,
            updated_at: at,
        }
    }

    #[test]
    fn test_event_row_conversion() {
        let event = Event::try_from(row("course")).unwrap();
        assert_eq!(event.event_type, EventType::Course);
        assert_eq!(event.course_code.as_deref(), Some("CS201"));
    }

    #[test]
    fn test_unknown_event_type_is_backend_error() {
        let err = Event::try_from(row("seminar")).unwrap_err();
        assert!(matches!(err, StoreError::Backend(_)));
    }
}
