// Postgres storage layer with sqlx
//
// This crate provides database implementations for core traits:
// - PgEventStore: implements EventStore for calendar events
// - PgTaskStore: implements TaskStore for tasks

pub mod event_store;
pub mod models;
pub mod repositories;
pub mod task_store;

pub use event_store::PgEventStore;
pub use repositories::Database;
pub use task_store::PgTaskStore;
