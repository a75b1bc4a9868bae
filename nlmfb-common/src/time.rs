//! Timestamp utilities

use chrono::{DateTime, Utc};

/// Format used in backup and download file names
pub const FILE_TIMESTAMP_FORMAT: &str = "%Y-%m-%d-%H-%M-%S";

/// Get current UTC timestamp
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Render a timestamp for use in a file name, e.g. `2022-05-01-13-04-59`
pub fn file_timestamp(at: DateTime<Utc>) -> String {
    at.format(FILE_TIMESTAMP_FORMAT).to_string()
}
