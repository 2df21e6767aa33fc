pub mod migrations;
pub mod store;

pub use store::{
    AuditEntry, BehaviorStats, ConversationTurn, Mem0CacheEntry, NewReminder, PreferenceEntry,
    Reminder, ReminderChanges, ReminderStatus, ReminderStore,
};
