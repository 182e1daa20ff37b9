// Context snapshot shown to the model
//
// A bounded, read-only view of the user's near-term calendar and open tasks,
// rebuilt for every request and rendered to deterministic text.

use chrono::{DateTime, Duration, SecondsFormat, Utc};

use crate::config::AssistantConfig;
use crate::domain::{sort_events, sort_tasks, Event, OwnerId, Task};
use crate::error::StoreResult;
use crate::traits::{EventFilter, EventStore, TaskFilter, TaskStore};

/// Instant rendering shared by prompts and replies, e.g. `2025-01-06T10:00:00.000Z`
pub fn iso(instant: &DateTime<Utc>) -> String {
    instant.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Per-request snapshot of upcoming events and open tasks
#[derive(Debug, Clone, PartialEq)]
pub struct ContextSnapshot {
    pub now: DateTime<Utc>,
    pub window_start: DateTime<Utc>,
    pub window_end: DateTime<Utc>,
    /// Events starting inside the window, by start ascending
    pub events: Vec<Event>,
    /// Open tasks, by due ascending (undated last) then newest first
    pub tasks: Vec<Task>,
}

impl ContextSnapshot {
    /// Fetch the snapshot for `owner` as of `now`. Store errors propagate.
    pub async fn build(
        owner: &OwnerId,
        now: DateTime<Utc>,
        events: &dyn EventStore,
        tasks: &dyn TaskStore,
        config: &AssistantConfig,
    ) -> StoreResult<Self> {
        let window_start = now
            .date_naive()
            .and_hms_opt(0, 0, 0)
            .map(|midnight| midnight.and_utc())
            .unwrap_or(now);
        let window_end = window_start + Duration::days(config.context_days);

        let mut upcoming = events
            .find_many(owner, &EventFilter::starting_between(window_start, window_end))
            .await?;
        sort_events(&mut upcoming);

        let mut open = tasks
            .find_many(owner, &TaskFilter::open(config.context_task_limit))
            .await?;
        sort_tasks(&mut open);
        open.truncate(config.context_task_limit);

        tracing::debug!(
            owner = %owner,
            events = upcoming.len(),
            tasks = open.len(),
            "Built assistant context"
        );

        Ok(Self {
            now,
            window_start,
            window_end,
            events: upcoming,
            tasks: open,
        })
    }

    /// Render the snapshot as the context system message
    pub fn render(&self) -> String {
        let mut lines = vec![
            format!(
                "Today is {}. The user is in a generic timezone.",
                iso(&self.now)
            ),
            String::new(),
            "EXISTING EVENTS IN CALENDAR (next 2 weeks):".to_string(),
        ];

        if self.events.is_empty() {
            lines.push("- No events scheduled".to_string());
        } else {
            lines.extend(self.events.iter().map(|event| {
                format!(
                    "- {} | {} to {} | {} | ID: {}",
                    event.title,
                    iso(&event.start),
                    iso(&event.end),
                    event
                        .location
                        .as_deref()
                        .filter(|l| !l.is_empty())
                        .unwrap_or("no location"),
                    event.id
                )
            }));
        }

        lines.push(String::new());
        lines.push(
            "IMPORTANT: When creating new events, you MUST check the times above and avoid any overlaps. Find free time slots between existing events."
                .to_string(),
        );
        lines.push(String::new());
        lines.push("Open tasks (ID | title | due ISO if any):".to_string());

        if self.tasks.is_empty() {
            lines.push("- no pending tasks".to_string());
        } else {
            lines.extend(self.tasks.iter().map(|task| {
                format!(
                    "- {} | {} | {}",
                    task.id,
                    task.title,
                    task.due.as_ref().map(iso).unwrap_or_else(|| "n/a".to_string())
                )
            }));
        }

        lines.push(String::new());
        lines.push(
            "Use only the documented intents. When modifying or deleting items, reference IDs from the list above. Ask for clarification via help intent if details are missing."
                .to_string(),
        );

        lines.join("\n")
    }
}
