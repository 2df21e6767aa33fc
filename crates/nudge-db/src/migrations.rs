/// Migration system for tracking and applying database schema changes.
///
/// Each migration has a version number and a SQL statement. The store
/// applies them in order on open.
pub struct Migration {
    pub version: u32,
    pub name: &'static str,
    pub sql: &'static str,
}

pub const REMINDER_SCHEMA_V1: Migration = Migration {
    version: 1,
    name: "initial_schema",
    sql: "CREATE TABLE IF NOT EXISTS reminders (
              id INTEGER PRIMARY KEY AUTOINCREMENT,
              user_id TEXT NOT NULL,
              title TEXT NOT NULL,
              description TEXT DEFAULT '',
              due_at_epoch INTEGER,
              status TEXT DEFAULT 'active',
              category TEXT,
              created_at INTEGER DEFAULT (strftime('%s', 'now')),
              mem0_memory_id TEXT,
              updated_at INTEGER DEFAULT (strftime('%s', 'now')),
              last_notified_at INTEGER,
              reschedule_count INTEGER DEFAULT 0,
              last_rescheduled_at INTEGER
          );

          CREATE TABLE IF NOT EXISTS preferences (
              user_id TEXT NOT NULL,
              key TEXT NOT NULL,
              value TEXT NOT NULL,
              mem0_memory_id TEXT,
              updated_at INTEGER DEFAULT (strftime('%s', 'now')),
              PRIMARY KEY (user_id, key)
          );

          CREATE TABLE IF NOT EXISTS audit_logs (
              id INTEGER PRIMARY KEY AUTOINCREMENT,
              user_id TEXT,
              action TEXT NOT NULL,
              details TEXT,
              timestamp INTEGER DEFAULT (strftime('%s', 'now'))
          );

          CREATE TABLE IF NOT EXISTS conversation_messages (
              id INTEGER PRIMARY KEY AUTOINCREMENT,
              user_id TEXT NOT NULL,
              role TEXT NOT NULL,
              content TEXT NOT NULL,
              created_at INTEGER DEFAULT (strftime('%s', 'now'))
          );

          CREATE TABLE IF NOT EXISTS behavior_stats (
              user_id TEXT PRIMARY KEY,
              create_count INTEGER DEFAULT 0,
              update_count INTEGER DEFAULT 0,
              snooze_count INTEGER DEFAULT 0,
              snooze_minutes_total INTEGER DEFAULT 0,
              done_count INTEGER DEFAULT 0,
              complete_minutes_total INTEGER DEFAULT 0,
              last_event_at INTEGER DEFAULT (strftime('%s', 'now'))
          );

          CREATE TABLE IF NOT EXISTS mem0_cache (
              user_id TEXT PRIMARY KEY,
              payload TEXT NOT NULL DEFAULT '{}',
              updated_at INTEGER DEFAULT (strftime('%s', 'now'))
          );

          CREATE INDEX IF NOT EXISTS idx_reminders_user ON reminders(user_id);
          CREATE INDEX IF NOT EXISTS idx_reminders_status ON reminders(status);
          CREATE INDEX IF NOT EXISTS idx_reminders_due ON reminders(due_at_epoch);
          CREATE INDEX IF NOT EXISTS idx_audit_timestamp ON audit_logs(timestamp);
          CREATE INDEX IF NOT EXISTS idx_convo_user ON conversation_messages(user_id);
          CREATE INDEX IF NOT EXISTS idx_convo_created ON conversation_messages(created_at);",
};

pub const MIGRATIONS: &[&Migration] = &[&REMINDER_SCHEMA_V1];
