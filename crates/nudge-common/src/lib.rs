pub mod error;
pub mod time;

pub use error::{Error, Result};
pub use time::{format_due_label, format_time_12h, now_epoch};
