//! # SQLite Persistence
//!
//! SQLite-backed [`ReminderStore`]. The connection lives behind a mutex and
//! every query runs on the blocking thread pool so callers can bound it with
//! a timeout. Instants are stored as unix seconds, target lists and
//! recurrence rules as JSON text.
//!
//! - **Version**: 2.0.0
//! - **Since**: 0.1.0
//!
//! ## Changelog
//! - 2.0.0: Reminders table with recurrence, multi-target and claim columns
//! - 1.0.0: Initial schema

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::info;
use sqlite::{Connection, State, Statement, Value};
use std::sync::{Arc, Mutex};

use crate::features::reminders::{NewReminder, Reminder, ReminderQuery, ReminderStore, StoreError};

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS reminders (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        owner_id TEXT NOT NULL,
        target_ids TEXT NOT NULL,
        message TEXT NOT NULL,
        channel_id TEXT NOT NULL,
        context_id TEXT,
        trigger_at INTEGER NOT NULL,
        recurrence TEXT,
        next_trigger_at INTEGER,
        created_at INTEGER NOT NULL,
        claimed_until INTEGER
    );
    CREATE INDEX IF NOT EXISTS idx_reminders_owner ON reminders(owner_id);
    CREATE INDEX IF NOT EXISTS idx_reminders_due
        ON reminders(COALESCE(next_trigger_at, trigger_at));
";

const COLUMNS: &str = "id, owner_id, target_ids, message, channel_id, context_id, \
                       trigger_at, recurrence, next_trigger_at, created_at";

/// Effective due instant of a row
const DUE_EXPR: &str = "COALESCE(next_trigger_at, trigger_at)";

#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    /// Open (or create) the database at `path` and apply the schema
    pub async fn new(path: &str) -> Result<Self> {
        let owned_path = path.to_string();
        let conn = tokio::task::spawn_blocking(move || -> Result<Connection> {
            let conn = sqlite::open(&owned_path)?;
            conn.execute(SCHEMA)?;
            Ok(conn)
        })
        .await??;

        info!("💾 Reminder database ready at {path}");
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    async fn blocking<T, F>(&self, f: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T, StoreError> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let guard = conn
                .lock()
                .map_err(|_| StoreError::Backend("database mutex poisoned".to_string()))?;
            f(&guard)
        })
        .await
        .map_err(|e| StoreError::Backend(format!("database task failed: {e}")))?
    }
}

fn to_secs(at: DateTime<Utc>) -> Value {
    Value::Integer(at.timestamp())
}

fn from_secs(secs: i64) -> Result<DateTime<Utc>, StoreError> {
    DateTime::from_timestamp(secs, 0)
        .ok_or_else(|| StoreError::Backend(format!("timestamp {secs} out of range")))
}

fn optional_text(value: Option<String>) -> Value {
    value.map_or(Value::Null, Value::String)
}

fn bind_all(statement: &mut Statement<'_>, values: Vec<Value>) -> Result<(), StoreError> {
    for (index, value) in values.into_iter().enumerate() {
        statement.bind((index + 1, value))?;
    }
    Ok(())
}

fn read_reminder(statement: &Statement<'_>) -> Result<Reminder, StoreError> {
    let recurrence = match statement.read::<Option<String>, _>("recurrence")? {
        Some(json) => Some(serde_json::from_str(&json)?),
        None => None,
    };
    let next_trigger_at = match statement.read::<Option<i64>, _>("next_trigger_at")? {
        Some(secs) => Some(from_secs(secs)?),
        None => None,
    };

    Ok(Reminder {
        id: statement.read::<i64, _>("id")?,
        owner_id: statement.read::<String, _>("owner_id")?,
        target_ids: serde_json::from_str(&statement.read::<String, _>("target_ids")?)?,
        message: statement.read::<String, _>("message")?,
        channel_id: statement.read::<String, _>("channel_id")?,
        context_id: statement.read::<Option<String>, _>("context_id")?,
        trigger_at: from_secs(statement.read::<i64, _>("trigger_at")?)?,
        recurrence,
        next_trigger_at,
        created_at: from_secs(statement.read::<i64, _>("created_at")?)?,
    })
}

fn select_one(conn: &Connection, id: i64) -> Result<Reminder, StoreError> {
    let mut statement = conn.prepare(format!("SELECT {COLUMNS} FROM reminders WHERE id = ?"))?;
    statement.bind((1, id))?;
    match statement.next()? {
        State::Row => read_reminder(&statement),
        State::Done => Err(StoreError::NotFound(id)),
    }
}

#[async_trait]
impl ReminderStore for Database {
    async fn create(&self, reminder: NewReminder) -> Result<Reminder, StoreError> {
        let target_ids = serde_json::to_string(&reminder.target_ids)?;
        let recurrence = reminder
            .recurrence
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;

        let values = vec![
            Value::String(reminder.owner_id),
            Value::String(target_ids),
            Value::String(reminder.message),
            Value::String(reminder.channel_id),
            optional_text(reminder.context_id),
            to_secs(reminder.trigger_at),
            optional_text(recurrence),
            reminder.next_trigger_at.map_or(Value::Null, to_secs),
            to_secs(reminder.created_at),
        ];

        self.blocking(move |conn| {
            {
                let mut statement = conn.prepare(
                    "INSERT INTO reminders (owner_id, target_ids, message, channel_id, context_id, \
                     trigger_at, recurrence, next_trigger_at, created_at) \
                     VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
                )?;
                bind_all(&mut statement, values)?;
                statement.next()?;
            }

            let mut statement = conn.prepare("SELECT last_insert_rowid() AS id")?;
            statement.next()?;
            let id = statement.read::<i64, _>("id")?;
            select_one(conn, id)
        })
        .await
    }

    async fn get(&self, id: i64) -> Result<Reminder, StoreError> {
        self.blocking(move |conn| select_one(conn, id)).await
    }

    async fn list(&self, query: &ReminderQuery) -> Result<Vec<Reminder>, StoreError> {
        let mut sql = format!("SELECT {COLUMNS} FROM reminders WHERE 1 = 1");
        let mut values = Vec::new();

        if let Some(owner) = &query.owner_id {
            sql.push_str(" AND owner_id = ?");
            values.push(Value::String(owner.clone()));
        }
        if let Some(due_by) = query.due_by {
            sql.push_str(&format!(" AND {DUE_EXPR} <= ?"));
            values.push(to_secs(due_by));
        }
        if let Some(at) = query.unclaimed_at {
            sql.push_str(" AND (claimed_until IS NULL OR claimed_until <= ?)");
            values.push(to_secs(at));
        }
        sql.push_str(" ORDER BY id LIMIT ? OFFSET ?");
        // SQLite treats a negative LIMIT as unbounded
        values.push(Value::Integer(query.limit.map_or(-1, |l| l as i64)));
        values.push(Value::Integer(query.offset as i64));

        self.blocking(move |conn| {
            let mut statement = conn.prepare(&sql)?;
            bind_all(&mut statement, values)?;

            let mut reminders = Vec::new();
            while let State::Row = statement.next()? {
                reminders.push(read_reminder(&statement)?);
            }
            Ok(reminders)
        })
        .await
    }

    async fn delete(&self, id: i64) -> Result<bool, StoreError> {
        self.blocking(move |conn| {
            let mut statement = conn.prepare("DELETE FROM reminders WHERE id = ?")?;
            statement.bind((1, id))?;
            statement.next()?;
            Ok(conn.change_count() > 0)
        })
        .await
    }

    async fn claim(
        &self,
        id: i64,
        due_at: DateTime<Utc>,
        now: DateTime<Utc>,
        lease_until: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        let sql = format!(
            "UPDATE reminders SET claimed_until = ? \
             WHERE id = ? AND {DUE_EXPR} = ? \
             AND (claimed_until IS NULL OR claimed_until <= ?)"
        );
        let values = vec![
            to_secs(lease_until),
            Value::Integer(id),
            to_secs(due_at),
            to_secs(now),
        ];

        self.blocking(move |conn| {
            let mut statement = conn.prepare(&sql)?;
            bind_all(&mut statement, values)?;
            statement.next()?;
            Ok(conn.change_count() > 0)
        })
        .await
    }

    async fn complete(&self, id: i64, lease_until: DateTime<Utc>) -> Result<bool, StoreError> {
        let values = vec![Value::Integer(id), to_secs(lease_until)];

        self.blocking(move |conn| {
            let mut statement =
                conn.prepare("DELETE FROM reminders WHERE id = ? AND claimed_until = ?")?;
            bind_all(&mut statement, values)?;
            statement.next()?;
            Ok(conn.change_count() > 0)
        })
        .await
    }

    async fn reschedule(
        &self,
        id: i64,
        next_trigger_at: DateTime<Utc>,
        lease_until: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        let values = vec![
            to_secs(next_trigger_at),
            Value::Integer(id),
            to_secs(lease_until),
        ];

        self.blocking(move |conn| {
            let mut statement = conn.prepare(
                "UPDATE reminders SET next_trigger_at = ?, claimed_until = NULL \
                 WHERE id = ? AND claimed_until = ?",
            )?;
            bind_all(&mut statement, values)?;
            statement.next()?;
            Ok(conn.change_count() > 0)
        })
        .await
    }
}
