// Database-backed EventStore
//
// Every statement filters on owner_id. Optional filter criteria are bound as
// NULL-able parameters so one statement serves all filter combinations.

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use smartstudy_core::{
    Event, EventFilter, EventPatch, EventStore, NewEvent, OwnerId, StoreResult,
};

use crate::models::{EventRow, EVENT_COLUMNS};
use crate::repositories::{store_error, Database};

/// Postgres event store
#[derive(Clone)]
pub struct PgEventStore {
    db: Database,
}

impl PgEventStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

fn into_events(rows: Vec<EventRow>) -> StoreResult<Vec<Event>> {
    rows.into_iter().map(Event::try_from).collect()
}

#[async_trait]
impl EventStore for PgEventStore {
    async fn find_many(&self, owner: &OwnerId, filter: &EventFilter) -> StoreResult<Vec<Event>> {
        let sql = format!(
            r#"
            SELECT {EVENT_COLUMNS}
            FROM events
            WHERE owner_id = $1
              AND ($2::uuid[] IS NULL OR id = ANY($2))
              AND ($3::text IS NULL OR POSITION(LOWER($3) IN LOWER(title)) > 0)
              AND ($4::timestamptz IS NULL OR start_at >= $4)
              AND ($5::timestamptz IS NULL OR start_at <= $5)
              AND ($6::timestamptz IS NULL OR end_at >= $6)
            ORDER BY start_at ASC, created_at ASC, id ASC
            "#
        );

        let rows = sqlx::query_as::<_, EventRow>(&sql)
            .bind(owner.as_str())
            .bind(filter.ids.as_ref())
            .bind(filter.title_contains.as_deref())
            .bind(filter.start_from)
            .bind(filter.start_to)
            .bind(filter.end_from)
            .fetch_all(self.db.pool())
            .await
            .map_err(store_error)?;

        into_events(rows)
    }

    async fn find_one(&self, owner: &OwnerId, id: Uuid) -> StoreResult<Option<Event>> {
        let sql = format!("SELECT {EVENT_COLUMNS} FROM events WHERE id = $1 AND owner_id = $2");

        let row = sqlx::query_as::<_, EventRow>(&sql)
            .bind(id)
            .bind(owner.as_str())
            .fetch_optional(self.db.pool())
            .await
            .map_err(store_error)?;

        row.map(Event::try_from).transpose()
    }

    async fn create(&self, owner: &OwnerId, event: NewEvent) -> StoreResult<Event> {
        let now = Utc::now();
        let sql = format!(
            r#"
            INSERT INTO events (id, owner_id, title, start_at, end_at, all_day, event_type, course_code, location, notes, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $11)
            RETURNING {EVENT_COLUMNS}
            "#
        );

        let row = sqlx::query_as::<_, EventRow>(&sql)
            .bind(Uuid::now_v7())
            .bind(owner.as_str())
            .bind(&event.title)
            .bind(event.start)
            .bind(event.end)
            .bind(event.all_day)
            .bind(event.event_type.as_str())
            .bind(&event.course_code)
            .bind(&event.location)
            .bind(&event.notes)
            .bind(now)
            .fetch_one(self.db.pool())
            .await
            .map_err(store_error)?;

        Event::try_from(row)
    }

    async fn update_one(
        &self,
        owner: &OwnerId,
        id: Uuid,
        patch: &EventPatch,
    ) -> StoreResult<Option<Event>> {
        let sql = format!(
            r#"
            UPDATE events
            SET
                title = COALESCE($3, title),
                start_at = COALESCE($4, start_at),
                end_at = COALESCE($5, end_at),
                all_day = COALESCE($6, all_day),
                event_type = COALESCE($7, event_type),
                course_code = COALESCE($8, course_code),
                location = COALESCE($9, location),
                notes = COALESCE($10, notes),
                updated_at = NOW()
            WHERE id = $1 AND owner_id = $2
            RETURNING {EVENT_COLUMNS}
            "#
        );

        let row = sqlx::query_as::<_, EventRow>(&sql)
            .bind(id)
            .bind(owner.as_str())
            .bind(&patch.title)
            .bind(patch.start)
            .bind(patch.end)
            .bind(patch.all_day)
            .bind(patch.event_type.map(|t| t.as_str()))
            .bind(&patch.course_code)
            .bind(&patch.location)
            .bind(&patch.notes)
            .fetch_optional(self.db.pool())
            .await
            .map_err(store_error)?;

        row.map(Event::try_from).transpose()
    }

    async fn delete_one(&self, owner: &OwnerId, id: Uuid) -> StoreResult<Option<Event>> {
        let sql = format!(
            "DELETE FROM events WHERE id = $1 AND owner_id = $2 RETURNING {EVENT_COLUMNS}"
        );

        let row = sqlx::query_as::<_, EventRow>(&sql)
            .bind(id)
            .bind(owner.as_str())
            .fetch_optional(self.db.pool())
            .await
            .map_err(store_error)?;

        row.map(Event::try_from).transpose()
    }

    async fn delete_many(&self, owner: &OwnerId, ids: &[Uuid]) -> StoreResult<u64> {
        if ids.is_empty() {
            return Ok(0);
        }

        let result = sqlx::query("DELETE FROM events WHERE owner_id = $1 AND id = ANY($2)")
            .bind(owner.as_str())
            .bind(ids)
            .execute(self.db.pool())
            .await
            .map_err(store_error)?;

        Ok(result.rows_affected())
    }
}
