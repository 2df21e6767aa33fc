use nudge_common::{Error, Result};
use rusqlite::{Connection, OptionalExtension, params};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::info;

use crate::migrations::MIGRATIONS;

/// One user-scheduled reminder row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reminder {
    pub id: i64,
    pub user_id: String,
    pub title: String,
    pub description: String,
    pub due_at_epoch: Option<i64>,
    pub status: ReminderStatus,
    pub category: Option<String>,
    pub created_at: i64,
    pub mem0_memory_id: Option<String>,
    pub updated_at: i64,
    pub last_notified_at: Option<i64>,
    pub reschedule_count: i64,
    pub last_rescheduled_at: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReminderStatus {
    Active,
    Completed,
    Archived,
}

impl ReminderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Completed => "completed",
            Self::Archived => "archived",
        }
    }

    fn from_db(value: &str) -> Result<Self> {
        match value {
            "active" => Ok(Self::Active),
            "completed" => Ok(Self::Completed),
            "archived" => Ok(Self::Archived),
            other => Err(Error::Database(format!("unknown reminder status: {other}"))),
        }
    }
}

/// Insert shape for new reminders before the store assigns id/timestamps.
#[derive(Debug, Clone)]
pub struct NewReminder {
    pub title: String,
    pub description: String,
    pub due_at_epoch: Option<i64>,
    pub category: Option<String>,
}

/// Partial update applied to an existing reminder. `None` fields are untouched.
#[derive(Debug, Clone, Default)]
pub struct ReminderChanges {
    pub title: Option<String>,
    pub description: Option<String>,
    pub due_at_epoch: Option<i64>,
    pub status: Option<ReminderStatus>,
    pub category: Option<String>,
    /// Bumps the reschedule counter and stamps `last_rescheduled_at`.
    pub rescheduled: bool,
}

impl ReminderChanges {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.due_at_epoch.is_none()
            && self.status.is_none()
            && self.category.is_none()
            && !self.rescheduled
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreferenceEntry {
    pub key: String,
    pub value: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    pub id: i64,
    pub user_id: Option<String>,
    pub action: String,
    pub details: String,
    pub timestamp: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: String,
    pub content: String,
    pub created_at: i64,
}

/// Per-user aggregate counters with derived averages.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BehaviorStats {
    pub create_count: i64,
    pub update_count: i64,
    pub snooze_count: i64,
    pub snooze_minutes_total: i64,
    pub done_count: i64,
    pub complete_minutes_total: i64,
    pub last_event_at: Option<i64>,
    pub avg_snooze_minutes: f64,
    pub avg_complete_minutes: f64,
}

impl BehaviorStats {
    pub fn total_events(&self) -> i64 {
        self.create_count + self.update_count + self.snooze_count + self.done_count
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Mem0CacheEntry {
    pub payload: String,
    pub updated_at: i64,
}

/// Ground-truth store for reminders, preferences, audit logs, conversation
/// history, behavior stats, and the Mem0 context cache.
pub struct ReminderStore {
    conn: Mutex<Connection>,
}

impl ReminderStore {
    pub fn open(db_path: &Path) -> Result<Self> {
        info!("opening reminder store at {}", db_path.display());
        let conn = Connection::open(db_path)
            .map_err(|e| Error::Database(format!("failed to open database: {e}")))?;

        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA busy_timeout=3000;")
            .map_err(|e| Error::Database(format!("failed to set pragmas: {e}")))?;

        let store = Self {
            conn: Mutex::new(conn),
        };
        store.run_migrations()?;
        Ok(store)
    }

    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| Error::Database(format!("failed to open in-memory database: {e}")))?;

        let store = Self {
            conn: Mutex::new(conn),
        };
        store.run_migrations()?;
        Ok(store)
    }

    fn run_migrations(&self) -> Result<()> {
        let conn = self.conn()?;
        for migration in MIGRATIONS {
            conn.execute_batch(migration.sql)
                .map_err(|e| Error::Database(format!("migration {} failed: {e}", migration.name)))?;
        }
        Ok(())
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| Error::Database("database lock poisoned".into()))
    }

    // --- Reminders ---

    pub fn create_reminder(&self, user_id: &str, new: &NewReminder) -> Result<i64> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO reminders (user_id, title, description, due_at_epoch, category)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                user_id,
                new.title,
                new.description,
                new.due_at_epoch,
                new.category
            ],
        )
        .map_err(|e| Error::Database(format!("failed to insert reminder: {e}")))?;

        let reminder_id = conn.last_insert_rowid();
        log_audit_with(
            &conn,
            user_id,
            "create_reminder",
            &format!("Created {reminder_id}: {}", new.title),
        )?;
        Ok(reminder_id)
    }

    pub fn get_reminder(&self, reminder_id: i64, user_id: &str) -> Result<Option<Reminder>> {
        let conn = self.conn()?;
        conn.query_row(
            &format!("SELECT {REMINDER_COLUMNS} FROM reminders WHERE id = ?1 AND user_id = ?2"),
            params![reminder_id, user_id],
            row_to_reminder,
        )
        .optional()
        .map_err(|e| Error::Database(format!("failed to load reminder: {e}")))
    }

    pub fn update_reminder(
        &self,
        reminder_id: i64,
        user_id: &str,
        changes: &ReminderChanges,
    ) -> Result<bool> {
        if changes.is_empty() {
            return Ok(false);
        }

        let now = nudge_common::now_epoch();
        let mut sets: Vec<String> = Vec::new();
        let mut values: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        if let Some(title) = &changes.title {
            sets.push("title = ?".into());
            values.push(Box::new(title.clone()));
        }
        if let Some(description) = &changes.description {
            sets.push("description = ?".into());
            values.push(Box::new(description.clone()));
        }
        if let Some(due) = changes.due_at_epoch {
            // A new due time re-arms the notification.
            sets.push("due_at_epoch = ?".into());
            values.push(Box::new(due));
            sets.push("last_notified_at = NULL".into());
        }
        if let Some(category) = &changes.category {
            sets.push("category = ?".into());
            values.push(Box::new(category.clone()));
        }
        if changes.rescheduled {
            sets.push("reschedule_count = reschedule_count + 1".into());
            sets.push("last_rescheduled_at = ?".into());
            values.push(Box::new(now));
        }
        if let Some(status) = changes.status {
            sets.push("status = ?".into());
            values.push(Box::new(status.as_str()));
        }

        sets.push("updated_at = ?".into());
        values.push(Box::new(now));
        values.push(Box::new(reminder_id));
        values.push(Box::new(user_id.to_string()));

        let sql = format!(
            "UPDATE reminders SET {} WHERE id = ? AND user_id = ?",
            sets.join(", ")
        );

        let conn = self.conn()?;
        let updated = conn
            .execute(&sql, rusqlite::params_from_iter(values.iter()))
            .map_err(|e| Error::Database(format!("failed to update reminder: {e}")))?;

        log_audit_with(
            &conn,
            user_id,
            "update_reminder",
            &format!("Updated {reminder_id}: {}", sets.join(", ")),
        )?;
        Ok(updated > 0)
    }

    pub fn mark_reminder_done(&self, reminder_id: i64, user_id: &str) -> Result<bool> {
        self.update_reminder(
            reminder_id,
            user_id,
            &ReminderChanges {
                status: Some(ReminderStatus::Completed),
                ..Default::default()
            },
        )
    }

    pub fn delete_reminder(&self, reminder_id: i64, user_id: &str) -> Result<bool> {
        let conn = self.conn()?;
        let deleted = conn
            .execute(
                "DELETE FROM reminders WHERE id = ?1 AND user_id = ?2",
                params![reminder_id, user_id],
            )
            .map_err(|e| Error::Database(format!("failed to delete reminder: {e}")))?;

        log_audit_with(&conn, user_id, "delete_reminder", &format!("Deleted {reminder_id}"))?;
        Ok(deleted > 0)
    }

    pub fn list_active_reminders(&self, user_id: &str) -> Result<Vec<Reminder>> {
        self.query_reminders(
            &format!(
                "SELECT {REMINDER_COLUMNS} FROM reminders
                 WHERE user_id = ?1 AND status = 'active'
                 ORDER BY due_at_epoch ASC"
            ),
            params![user_id],
        )
    }

    pub fn list_completed_reminders(&self, user_id: &str) -> Result<Vec<Reminder>> {
        self.query_reminders(
            &format!(
                "SELECT {REMINDER_COLUMNS} FROM reminders
                 WHERE user_id = ?1 AND status = 'completed'
                 ORDER BY updated_at DESC"
            ),
            params![user_id],
        )
    }

    pub fn list_all_reminders(&self, user_id: &str) -> Result<Vec<Reminder>> {
        self.query_reminders(
            &format!(
                "SELECT {REMINDER_COLUMNS} FROM reminders
                 WHERE user_id = ?1 ORDER BY due_at_epoch ASC"
            ),
            params![user_id],
        )
    }

    pub fn list_rescheduled_reminders(&self, user_id: &str) -> Result<Vec<Reminder>> {
        self.query_reminders(
            &format!(
                "SELECT {REMINDER_COLUMNS} FROM reminders
                 WHERE user_id = ?1 AND status = 'active' AND reschedule_count > 0
                 ORDER BY last_rescheduled_at DESC"
            ),
            params![user_id],
        )
    }

    /// (category, due_at_epoch) pairs used to derive habitual times per category.
    pub fn list_reminder_times_by_category(&self, user_id: &str) -> Result<Vec<(String, i64)>> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(
                "SELECT category, due_at_epoch FROM reminders
                 WHERE user_id = ?1 AND category IS NOT NULL AND due_at_epoch IS NOT NULL",
            )
            .map_err(|e| Error::Database(format!("failed to prepare category query: {e}")))?;

        let rows = stmt
            .query_map(params![user_id], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
            })
            .map_err(|e| Error::Database(format!("failed to query category times: {e}")))?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| Error::Database(format!("failed to collect category times: {e}")))
    }

    pub fn search_reminders(&self, user_id: &str, query: &str) -> Result<Vec<Reminder>> {
        let term = format!("%{query}%");
        self.query_reminders(
            &format!(
                "SELECT {REMINDER_COLUMNS} FROM reminders
                 WHERE user_id = ?1 AND (title LIKE ?2 OR description LIKE ?2)
                 ORDER BY due_at_epoch ASC"
            ),
            params![user_id, term],
        )
    }

    pub fn update_reminder_mem0_id(
        &self,
        reminder_id: i64,
        user_id: &str,
        mem0_id: &str,
    ) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            "UPDATE reminders SET mem0_memory_id = ?1, updated_at = ?2
             WHERE id = ?3 AND user_id = ?4",
            params![mem0_id, nudge_common::now_epoch(), reminder_id, user_id],
        )
        .map_err(|e| Error::Database(format!("failed to store mem0 id: {e}")))?;
        Ok(())
    }

    /// Active reminders due within `[now, now + lead]` that have not already
    /// been notified for their current due time.
    pub fn get_due_soon_reminders(
        &self,
        user_id: &str,
        now_epoch: i64,
        lead_time_seconds: i64,
    ) -> Result<Vec<Reminder>> {
        let window_end = now_epoch + lead_time_seconds;
        self.query_reminders(
            &format!(
                "SELECT {REMINDER_COLUMNS} FROM reminders
                 WHERE user_id = ?1
                   AND status = 'active'
                   AND due_at_epoch >= ?2
                   AND due_at_epoch <= ?3
                   AND (last_notified_at IS NULL OR last_notified_at < due_at_epoch - ?4)
                 ORDER BY due_at_epoch ASC"
            ),
            params![user_id, now_epoch, window_end, lead_time_seconds],
        )
    }

    pub fn mark_reminder_notified(
        &self,
        reminder_id: i64,
        user_id: &str,
        notified_at: i64,
    ) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            "UPDATE reminders SET last_notified_at = ?1, updated_at = ?2
             WHERE id = ?3 AND user_id = ?4",
            params![notified_at, nudge_common::now_epoch(), reminder_id, user_id],
        )
        .map_err(|e| Error::Database(format!("failed to mark notified: {e}")))?;

        log_audit_with(&conn, user_id, "reminder_notified", &format!("Notified {reminder_id}"))?;
        Ok(())
    }

    /// Move active reminders whose due time has passed to `archived`.
    /// Returns the number of rows changed.
    pub fn archive_overdue_reminders(&self, now_epoch: i64) -> Result<usize> {
        let conn = self.conn()?;
        let archived = conn
            .execute(
                "UPDATE reminders SET status = 'archived', updated_at = ?1
                 WHERE status = 'active' AND due_at_epoch IS NOT NULL AND due_at_epoch < ?1",
                params![now_epoch],
            )
            .map_err(|e| Error::Database(format!("failed to archive overdue reminders: {e}")))?;
        Ok(archived)
    }

    fn query_reminders(&self, sql: &str, args: impl rusqlite::Params) -> Result<Vec<Reminder>> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(sql)
            .map_err(|e| Error::Database(format!("failed to prepare reminder query: {e}")))?;

        let rows = stmt
            .query_map(args, row_to_reminder)
            .map_err(|e| Error::Database(format!("failed to query reminders: {e}")))?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| Error::Database(format!("failed to collect reminders: {e}")))
    }

    // --- Preferences ---

    pub fn set_preference(&self, user_id: &str, key: &str, value: &str) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO preferences (user_id, key, value, updated_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(user_id, key) DO UPDATE SET
                 value = excluded.value,
                 updated_at = excluded.updated_at",
            params![user_id, key, value, nudge_common::now_epoch()],
        )
        .map_err(|e| Error::Database(format!("failed to set preference: {e}")))?;

        log_audit_with(&conn, user_id, "set_preference", &format!("Set {key} = {value}"))?;
        Ok(())
    }

    pub fn get_preference(&self, user_id: &str, key: &str) -> Result<Option<String>> {
        let conn = self.conn()?;
        conn.query_row(
            "SELECT value FROM preferences WHERE user_id = ?1 AND key = ?2",
            params![user_id, key],
            |row| row.get(0),
        )
        .optional()
        .map_err(|e| Error::Database(format!("failed to load preference: {e}")))
    }

    pub fn get_all_preferences(&self, user_id: &str) -> Result<Vec<PreferenceEntry>> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare("SELECT key, value FROM preferences WHERE user_id = ?1")
            .map_err(|e| Error::Database(format!("failed to prepare preferences query: {e}")))?;

        let rows = stmt
            .query_map(params![user_id], |row| {
                Ok(PreferenceEntry {
                    key: row.get(0)?,
                    value: row.get(1)?,
                })
            })
            .map_err(|e| Error::Database(format!("failed to query preferences: {e}")))?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| Error::Database(format!("failed to collect preferences: {e}")))
    }

    pub fn update_preference_mem0_id(&self, user_id: &str, key: &str, mem0_id: &str) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            "UPDATE preferences SET mem0_memory_id = ?1, updated_at = ?2
             WHERE user_id = ?3 AND key = ?4",
            params![mem0_id, nudge_common::now_epoch(), user_id, key],
        )
        .map_err(|e| Error::Database(format!("failed to store preference mem0 id: {e}")))?;
        Ok(())
    }

    // --- Audit log ---

    pub fn log_audit(&self, user_id: &str, action: &str, details: &str) -> Result<()> {
        let conn = self.conn()?;
        log_audit_with(&conn, user_id, action, details)
    }

    pub fn get_recent_audit_logs(&self, user_id: &str, limit: usize) -> Result<Vec<AuditEntry>> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(
                "SELECT id, user_id, action, details, timestamp FROM audit_logs
                 WHERE user_id = ?1 ORDER BY timestamp DESC LIMIT ?2",
            )
            .map_err(|e| Error::Database(format!("failed to prepare audit query: {e}")))?;

        let rows = stmt
            .query_map(params![user_id, limit as i64], |row| {
                Ok(AuditEntry {
                    id: row.get(0)?,
                    user_id: row.get(1)?,
                    action: row.get(2)?,
                    details: row.get::<_, Option<String>>(3)?.unwrap_or_default(),
                    timestamp: row.get(4)?,
                })
            })
            .map_err(|e| Error::Database(format!("failed to query audit logs: {e}")))?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| Error::Database(format!("failed to collect audit logs: {e}")))
    }

    // --- Conversation history ---

    pub fn add_conversation_message(&self, user_id: &str, role: &str, content: &str) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO conversation_messages (user_id, role, content, created_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![user_id, role, content, nudge_common::now_epoch()],
        )
        .map_err(|e| Error::Database(format!("failed to insert conversation message: {e}")))?;
        Ok(())
    }

    /// Last `limit` turns in chronological order.
    pub fn get_recent_conversation(
        &self,
        user_id: &str,
        limit: usize,
    ) -> Result<Vec<ConversationTurn>> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(
                "SELECT role, content, created_at FROM conversation_messages
                 WHERE user_id = ?1 ORDER BY created_at DESC, id DESC LIMIT ?2",
            )
            .map_err(|e| Error::Database(format!("failed to prepare conversation query: {e}")))?;

        let rows = stmt
            .query_map(params![user_id, limit as i64], |row| {
                Ok(ConversationTurn {
                    role: row.get(0)?,
                    content: row.get(1)?,
                    created_at: row.get(2)?,
                })
            })
            .map_err(|e| Error::Database(format!("failed to query conversation: {e}")))?;

        let mut turns = rows
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| Error::Database(format!("failed to collect conversation: {e}")))?;
        turns.reverse();
        Ok(turns)
    }

    // --- Behavior stats ---

    pub fn record_behavior_create(&self, user_id: &str) -> Result<()> {
        self.bump_behavior(user_id, "create_count = create_count + 1", &[])
    }

    pub fn record_behavior_update(&self, user_id: &str) -> Result<()> {
        self.bump_behavior(user_id, "update_count = update_count + 1", &[])
    }

    pub fn record_behavior_snooze(&self, user_id: &str, minutes: i64) -> Result<()> {
        self.bump_behavior(
            user_id,
            "snooze_count = snooze_count + 1, snooze_minutes_total = snooze_minutes_total + ?2",
            &[minutes],
        )
    }

    pub fn record_behavior_done(&self, user_id: &str, minutes: i64) -> Result<()> {
        self.bump_behavior(
            user_id,
            "done_count = done_count + 1, complete_minutes_total = complete_minutes_total + ?2",
            &[minutes],
        )
    }

    fn bump_behavior(&self, user_id: &str, set_clause: &str, extra: &[i64]) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT OR IGNORE INTO behavior_stats (user_id) VALUES (?1)",
            params![user_id],
        )
        .map_err(|e| Error::Database(format!("failed to ensure behavior row: {e}")))?;

        let sql = format!(
            "UPDATE behavior_stats SET {set_clause}, last_event_at = ?{} WHERE user_id = ?1",
            extra.len() + 2
        );
        let mut values: Vec<Box<dyn rusqlite::ToSql>> = vec![Box::new(user_id.to_string())];
        for v in extra {
            values.push(Box::new(*v));
        }
        values.push(Box::new(nudge_common::now_epoch()));

        conn.execute(&sql, rusqlite::params_from_iter(values.iter()))
            .map_err(|e| Error::Database(format!("failed to update behavior stats: {e}")))?;
        Ok(())
    }

    pub fn get_behavior_stats(&self, user_id: &str) -> Result<BehaviorStats> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT OR IGNORE INTO behavior_stats (user_id) VALUES (?1)",
            params![user_id],
        )
        .map_err(|e| Error::Database(format!("failed to ensure behavior row: {e}")))?;

        let row = conn
            .query_row(
                "SELECT create_count, update_count, snooze_count, snooze_minutes_total,
                        done_count, complete_minutes_total, last_event_at
                 FROM behavior_stats WHERE user_id = ?1",
                params![user_id],
                |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, i64>(1)?,
                        row.get::<_, i64>(2)?,
                        row.get::<_, i64>(3)?,
                        row.get::<_, i64>(4)?,
                        row.get::<_, i64>(5)?,
                        row.get::<_, Option<i64>>(6)?,
                    ))
                },
            )
            .optional()
            .map_err(|e| Error::Database(format!("failed to load behavior stats: {e}")))?;

        let Some((creates, updates, snoozes, snooze_total, dones, complete_total, last_event)) = row
        else {
            return Ok(BehaviorStats::default());
        };

        Ok(BehaviorStats {
            create_count: creates,
            update_count: updates,
            snooze_count: snoozes,
            snooze_minutes_total: snooze_total,
            done_count: dones,
            complete_minutes_total: complete_total,
            last_event_at: last_event,
            avg_snooze_minutes: round_avg(snooze_total, snoozes),
            avg_complete_minutes: round_avg(complete_total, dones),
        })
    }

    // --- Mem0 context cache ---

    pub fn set_mem0_cache(&self, user_id: &str, payload: &str) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO mem0_cache (user_id, payload, updated_at)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(user_id) DO UPDATE SET
                 payload = excluded.payload,
                 updated_at = excluded.updated_at",
            params![user_id, payload, nudge_common::now_epoch()],
        )
        .map_err(|e| Error::Database(format!("failed to write mem0 cache: {e}")))?;
        Ok(())
    }

    pub fn get_mem0_cache(&self, user_id: &str) -> Result<Option<Mem0CacheEntry>> {
        let conn = self.conn()?;
        conn.query_row(
            "SELECT payload, updated_at FROM mem0_cache WHERE user_id = ?1",
            params![user_id],
            |row| {
                Ok(Mem0CacheEntry {
                    payload: row.get(0)?,
                    updated_at: row.get(1)?,
                })
            },
        )
        .optional()
        .map_err(|e| Error::Database(format!("failed to read mem0 cache: {e}")))
    }
}

const REMINDER_COLUMNS: &str = "id, user_id, title, description, due_at_epoch, status, category,
    created_at, mem0_memory_id, updated_at, last_notified_at, reschedule_count, last_rescheduled_at";

fn row_to_reminder(row: &rusqlite::Row<'_>) -> rusqlite::Result<Reminder> {
    let status_str: String = row.get(5)?;
    let status = ReminderStatus::from_db(&status_str).map_err(|e| {
        rusqlite::Error::ToSqlConversionFailure(Box::new(std::io::Error::other(e.to_string())))
    })?;

    Ok(Reminder {
        id: row.get(0)?,
        user_id: row.get(1)?,
        title: row.get(2)?,
        description: row.get::<_, Option<String>>(3)?.unwrap_or_default(),
        due_at_epoch: row.get(4)?,
        status,
        category: row.get(6)?,
        created_at: row.get(7)?,
        mem0_memory_id: row.get(8)?,
        updated_at: row.get(9)?,
        last_notified_at: row.get(10)?,
        reschedule_count: row.get::<_, Option<i64>>(11)?.unwrap_or(0),
        last_rescheduled_at: row.get(12)?,
    })
}

fn log_audit_with(conn: &Connection, user_id: &str, action: &str, details: &str) -> Result<()> {
    conn.execute(
        "INSERT INTO audit_logs (user_id, action, details, timestamp) VALUES (?1, ?2, ?3, ?4)",
        params![user_id, action, details, nudge_common::now_epoch()],
    )
    .map_err(|e| Error::Database(format!("failed to write audit log: {e}")))?;
    Ok(())
}

fn round_avg(total: i64, count: i64) -> f64 {
    if count == 0 {
        return 0.0;
    }
    ((total as f64 / count as f64) * 10.0).round() / 10.0
}
