use hearth_common::{Error, Message, Result, Role, filter_history};
use rusqlite::Connection;
use rusqlite::params;
use std::path::Path;
use tracing::{info, warn};

/// A deferred instruction waiting for its moment. The scheduler polls
/// these and feeds the instructions back into the engine.
#[derive(Debug, Clone)]
pub struct ScheduledAction {
    pub id: String,
    pub session_id: String,
    pub instructions: String,
    pub execute_at: chrono::DateTime<chrono::Utc>,
    pub status: String,
    pub error: Option<String>,
}

/// Durable storage: per-session conversation history and scheduled
/// actions. History writes always store the filtered, deduplicated form.
pub struct SessionStore {
    conn: Connection,
}

impl SessionStore {
    pub fn open(db_path: &Path) -> Result<Self> {
        info!("opening session store at {}", db_path.display());
        let conn = Connection::open(db_path)
            .map_err(|e| Error::Persistence(format!("failed to open database: {e}")))?;

        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")
            .map_err(|e| Error::Persistence(format!("failed to set pragmas: {e}")))?;

        let store = Self { conn };
        store.run_migrations()?;
        Ok(store)
    }

    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| Error::Persistence(format!("failed to open in-memory database: {e}")))?;

        let store = Self { conn };
        store.run_migrations()?;
        Ok(store)
    }

    fn run_migrations(&self) -> Result<()> {
        self.conn
            .execute_batch(
                "CREATE TABLE IF NOT EXISTS history_messages (
                    id TEXT NOT NULL,
                    session_id TEXT NOT NULL,
                    position INTEGER NOT NULL,
                    role TEXT NOT NULL,
                    content TEXT NOT NULL,
                    created_at TEXT NOT NULL DEFAULT (datetime('now')),
                    PRIMARY KEY (session_id, position)
                );

                CREATE TABLE IF NOT EXISTS scheduled_actions (
                    id TEXT PRIMARY KEY,
                    session_id TEXT NOT NULL,
                    instructions TEXT NOT NULL,
                    execute_at TEXT NOT NULL,
                    status TEXT NOT NULL DEFAULT 'pending',
                    error TEXT,
                    created_at TEXT NOT NULL DEFAULT (datetime('now')),
                    completed_at TEXT
                );

                CREATE INDEX IF NOT EXISTS idx_actions_execute_at
                    ON scheduled_actions(execute_at) WHERE status = 'pending';",
            )
            .map_err(|e| Error::Persistence(format!("migration failed: {e}")))?;
        Ok(())
    }

    /// Load a session's durable history in stored order. A session never
    /// written yields an empty list. Rows whose role no longer parses are
    /// skipped, not fatal.
    pub fn load_history(&self, session_id: &str) -> Result<Vec<Message>> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT id, role, content FROM history_messages
                 WHERE session_id = ?1 ORDER BY position ASC",
            )
            .map_err(|e| Error::Persistence(format!("failed to prepare history query: {e}")))?;

        let rows = stmt
            .query_map(params![session_id], |row| {
                let id: String = row.get(0)?;
                let role: String = row.get(1)?;
                let content: String = row.get(2)?;
                Ok((id, role, content))
            })
            .map_err(|e| Error::Persistence(format!("failed to load history: {e}")))?;

        let mut messages = Vec::new();
        for row in rows {
            let (id, role_raw, content) =
                row.map_err(|e| Error::Persistence(format!("failed to read history row: {e}")))?;
            match Role::parse(&role_raw) {
                Some(role) => messages.push(Message::restored(id, role, content)),
                None => warn!(session_id, role = %role_raw, "skipping history row with unknown role"),
            }
        }
        Ok(messages)
    }

    /// Merge `messages` into the session's durable history and rewrite it
    /// in one transaction. The stored form is the deduplicated (structural,
    /// first occurrence wins) then filtered (user and plain assistant
    /// messages only) union of what was already stored and what came in.
    /// Re-appending the same messages is a no-op.
    pub fn append_history(&mut self, session_id: &str, messages: &[Message]) -> Result<()> {
        let mut combined = self.load_history(session_id)?;
        combined.extend(messages.iter().cloned());
        let durable = filter_history(&combined);

        let tx = self
            .conn
            .transaction()
            .map_err(|e| Error::Persistence(format!("failed to start transaction: {e}")))?;
        tx.execute(
            "DELETE FROM history_messages WHERE session_id = ?1",
            params![session_id],
        )
        .map_err(|e| Error::Persistence(format!("failed to clear history: {e}")))?;
        for (position, message) in durable.iter().enumerate() {
            tx.execute(
                "INSERT INTO history_messages (id, session_id, position, role, content)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    message.id,
                    session_id,
                    position as i64,
                    message.role.as_str(),
                    message.content
                ],
            )
            .map_err(|e| Error::Persistence(format!("failed to write history row: {e}")))?;
        }
        tx.commit()
            .map_err(|e| Error::Persistence(format!("failed to commit history: {e}")))?;
        Ok(())
    }

    /// Insert a pending scheduled action and return its id.
    pub fn schedule_action(
        &self,
        session_id: &str,
        instructions: &str,
        execute_at: chrono::DateTime<chrono::Utc>,
    ) -> Result<String> {
        let id = uuid::Uuid::new_v4().to_string();
        self.conn
            .execute(
                "INSERT INTO scheduled_actions (id, session_id, instructions, execute_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![id, session_id, instructions, execute_at.to_rfc3339()],
            )
            .map_err(|e| Error::Persistence(format!("failed to schedule action: {e}")))?;
        Ok(id)
    }

    /// Pending actions whose moment has passed, oldest first.
    pub fn poll_due_actions(&self, limit: usize) -> Result<Vec<ScheduledAction>> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT id, session_id, instructions, execute_at, status, error
                 FROM scheduled_actions
                 WHERE status = 'pending' AND datetime(execute_at) <= datetime('now')
                 ORDER BY execute_at ASC
                 LIMIT ?1",
            )
            .map_err(|e| Error::Persistence(format!("failed to prepare poll query: {e}")))?;

        let rows = stmt
            .query_map(params![limit as i64], |row| {
                let execute_at_raw: String = row.get(3)?;
                Ok(ScheduledAction {
                    id: row.get(0)?,
                    session_id: row.get(1)?,
                    instructions: row.get(2)?,
                    execute_at: parse_timestamp(&execute_at_raw),
                    status: row.get(4)?,
                    error: row.get(5)?,
                })
            })
            .map_err(|e| Error::Persistence(format!("failed to poll actions: {e}")))?;

        let mut actions = Vec::new();
        for row in rows {
            actions
                .push(row.map_err(|e| Error::Persistence(format!("failed to read action row: {e}")))?);
        }
        Ok(actions)
    }

    /// Mark an action as done. Returns false if it was no longer pending.
    pub fn complete_action(&self, action_id: &str) -> Result<bool> {
        let rows = self
            .conn
            .execute(
                "UPDATE scheduled_actions
                 SET status = 'done', completed_at = datetime('now')
                 WHERE id = ?1 AND status = 'pending'",
                params![action_id],
            )
            .map_err(|e| Error::Persistence(format!("failed to complete action: {e}")))?;
        Ok(rows > 0)
    }

    /// Mark an action as failed, keeping the error for inspection.
    pub fn fail_action(&self, action_id: &str, error: &str) -> Result<()> {
        self.conn
            .execute(
                "UPDATE scheduled_actions
                 SET status = 'failed', error = ?2, completed_at = datetime('now')
                 WHERE id = ?1",
                params![action_id, error],
            )
            .map_err(|e| Error::Persistence(format!("failed to mark action as failed: {e}")))?;
        Ok(())
    }

    /// Count pending actions scheduled from a session.
    pub fn count_pending_actions(&self, session_id: &str) -> Result<i64> {
        let count: i64 = self
            .conn
            .query_row(
                "SELECT COUNT(*) FROM scheduled_actions
                 WHERE session_id = ?1 AND status = 'pending'",
                params![session_id],
                |row| row.get(0),
            )
            .map_err(|e| Error::Persistence(format!("failed to count pending actions: {e}")))?;
        Ok(count)
    }
}

fn parse_timestamp(value: &str) -> chrono::DateTime<chrono::Utc> {
    chrono::DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&chrono::Utc))
        .unwrap_or_else(|e| {
            warn!(
                "failed to parse timestamp '{}': {e}, falling back to now",
                value
            );
            chrono::Utc::now()
        })
}
