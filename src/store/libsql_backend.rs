//! libSQL backend — async `EventStore` trait implementation.
//!
//! Supports local file and in-memory databases. Events and tasks share one
//! `events` table; the task-only columns are NULL for plain events.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use libsql::{Connection, Database as LibSqlDatabase, params};
use tracing::info;
use uuid::Uuid;

use crate::error::StoreError;
use crate::event::{Event, EventStatus, Task};
use crate::store::migrations;
use crate::store::traits::EventStore;

/// libSQL event store.
///
/// Stores a single connection that is reused for all operations.
/// `libsql::Connection` is `Send + Sync` and safe for concurrent async use,
/// which covers the unordered saves arriving from parallel workers.
pub struct LibSqlEventStore {
    #[allow(dead_code)]
    db: Arc<LibSqlDatabase>,
    conn: Connection,
}

impl LibSqlEventStore {
    /// Open (or create) a local database file and run migrations.
    pub async fn new_local(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| StoreError::Open(format!("Failed to create store directory: {e}")))?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| StoreError::Open(format!("Failed to open libSQL database: {e}")))?;

        let conn = db
            .connect()
            .map_err(|e| StoreError::Open(format!("Failed to create connection: {e}")))?;

        migrations::run_migrations(&conn).await?;
        info!(path = %path.display(), "Event store opened");
        Ok(Self {
            db: Arc::new(db),
            conn,
        })
    }

    /// Create an in-memory database (for tests).
    pub async fn new_memory() -> Result<Self, StoreError> {
        let db = libsql::Builder::new_local(":memory:")
            .build()
            .await
            .map_err(|e| StoreError::Open(format!("Failed to create in-memory database: {e}")))?;

        let conn = db
            .connect()
            .map_err(|e| StoreError::Open(format!("Failed to create connection: {e}")))?;

        migrations::run_migrations(&conn).await?;
        Ok(Self {
            db: Arc::new(db),
            conn,
        })
    }

    fn conn(&self) -> &Connection {
        &self.conn
    }

    async fn save_record(
        &self,
        event: &Event,
        kind: &str,
        transformation_id: Option<&str>,
        param_blob: Option<&str>,
    ) -> Result<(), StoreError> {
        self.conn()
            .execute(
                "INSERT OR REPLACE INTO events
                    (id, kind, status, transformation_id, param_blob, started_at, ended_at,
                     associated_user, used_resource, caused_by, failure_cause, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
                params![
                    event.id().to_string(),
                    kind,
                    event.status().as_str(),
                    opt_text(transformation_id),
                    opt_text(param_blob),
                    event.started_at().to_rfc3339(),
                    opt_text_owned(event.ended_at().map(|t| t.to_rfc3339())),
                    opt_text(event.associated_user()),
                    opt_text(event.used_resource()),
                    opt_text_owned(event.caused_by().map(|id| id.to_string())),
                    opt_text(event.failure_cause()),
                    Utc::now().to_rfc3339(),
                ],
            )
            .await
            .map_err(|e| StoreError::Query(format!("Failed to save {kind}: {e}")))?;
        Ok(())
    }
}

// ── Helper functions ────────────────────────────────────────────────

/// Parse an RFC 3339 timestamp (our canonical write format). Anything else
/// in the column is a hard fault, not a silent default.
fn parse_datetime(s: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StoreError::Serialization(format!("Invalid timestamp {s:?}: {e}")))
}

fn parse_uuid(s: &str) -> Result<Uuid, StoreError> {
    Uuid::parse_str(s).map_err(|e| StoreError::Serialization(format!("Invalid id {s:?}: {e}")))
}

/// Convert `Option<&str>` to a libsql Value.
fn opt_text(s: Option<&str>) -> libsql::Value {
    match s {
        Some(s) => libsql::Value::Text(s.to_string()),
        None => libsql::Value::Null,
    }
}

/// Convert `Option<String>` to a libsql Value.
fn opt_text_owned(s: Option<String>) -> libsql::Value {
    match s {
        Some(s) => libsql::Value::Text(s),
        None => libsql::Value::Null,
    }
}

const EVENT_COLUMNS: &str = "id, kind, status, transformation_id, param_blob, started_at, ended_at, associated_user, used_resource, caused_by, failure_cause";

/// Map a libsql row (in `EVENT_COLUMNS` order) to an Event.
fn row_to_event(row: &libsql::Row) -> Result<Event, StoreError> {
    let get_text = |idx: i32| -> Result<String, StoreError> {
        row.get::<String>(idx)
            .map_err(|e| StoreError::Serialization(format!("Missing column {idx}: {e}")))
    };
    let get_opt_text = |idx: i32| -> Option<String> { row.get::<String>(idx).ok() };

    let id = parse_uuid(&get_text(0)?)?;
    let status: EventStatus = get_text(2)?
        .parse()
        .map_err(|e| StoreError::Serialization(format!("Event {id}: {e}")))?;
    let started_at = parse_datetime(&get_text(5)?)?;
    let ended_at = match get_opt_text(6) {
        Some(s) => Some(parse_datetime(&s)?),
        None => None,
    };
    let caused_by = match get_opt_text(9) {
        Some(s) => Some(parse_uuid(&s)?),
        None => None,
    };

    Ok(Event::from_stored(
        id,
        status,
        started_at,
        ended_at,
        get_opt_text(7),
        get_opt_text(8),
        caused_by,
        get_opt_text(10),
    ))
}

/// Map a libsql row to a Task. The row must have `kind = 'task'`.
fn row_to_task(row: &libsql::Row) -> Result<Task, StoreError> {
    let event = row_to_event(row)?;
    let transformation_id: String = row.get(3).map_err(|e| {
        StoreError::Serialization(format!(
            "Task {} has no transformation_id: {e}",
            event.id()
        ))
    })?;
    let param_blob: Option<String> = row.get::<String>(4).ok();
    Ok(Task::from_stored(event, transformation_id, param_blob))
}

// ── Trait implementation ────────────────────────────────────────────

#[async_trait]
impl EventStore for LibSqlEventStore {
    async fn save_event(&self, event: &Event) -> Result<(), StoreError> {
        self.save_record(event, "event", None, None).await
    }

    async fn save_task(&self, task: &Task) -> Result<(), StoreError> {
        self.save_record(
            task.event(),
            "task",
            Some(task.transformation_id()),
            task.param_blob(),
        )
        .await
    }

    async fn find_event(&self, id: Uuid) -> Result<Option<Event>, StoreError> {
        let mut rows = self
            .conn()
            .query(
                &format!("SELECT {EVENT_COLUMNS} FROM events WHERE id = ?1"),
                params![id.to_string()],
            )
            .await
            .map_err(|e| StoreError::Query(format!("Failed to find event: {e}")))?;

        match rows
            .next()
            .await
            .map_err(|e| StoreError::Query(format!("Failed to read event row: {e}")))?
        {
            Some(row) => Ok(Some(row_to_event(&row)?)),
            None => Ok(None),
        }
    }

    async fn find_task(&self, id: Uuid) -> Result<Option<Task>, StoreError> {
        let mut rows = self
            .conn()
            .query(
                &format!("SELECT {EVENT_COLUMNS} FROM events WHERE id = ?1 AND kind = 'task'"),
                params![id.to_string()],
            )
            .await
            .map_err(|e| StoreError::Query(format!("Failed to find task: {e}")))?;

        match rows
            .next()
            .await
            .map_err(|e| StoreError::Query(format!("Failed to read task row: {e}")))?
        {
            Some(row) => Ok(Some(row_to_task(&row)?)),
            None => Ok(None),
        }
    }
}
