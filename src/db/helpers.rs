//! Small helpers shared by the repositories

use chrono::{SecondsFormat, Utc};

/// Current UTC time as an RFC 3339 string, the storage format for all
/// timestamp columns. Fixed-width microsecond precision keeps the strings
/// sortable and distinguishes rows inserted back to back.
pub fn now_rfc3339() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}
