//! Timestamp formats shared by manifests, audit rows and storage paths

use chrono::{NaiveDateTime, SubsecRound, Utc};

/// Format used inside manifests, audit rows and the progress log
pub const RECORD_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

/// Format embedded in a session's storage directory name
pub const PATH_FORMAT: &str = "%Y%m%d-%H%M%S-%6f";

// Accepts any number of fractional digits, including none.
const PARSE_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

/// Current UTC time truncated to microsecond precision
///
/// Truncation keeps an in-memory timestamp equal to the one read back from a
/// manifest, which only stores six fractional digits.
pub fn now() -> NaiveDateTime {
    Utc::now().naive_utc().trunc_subsecs(6)
}

/// Formats a timestamp as `YYYY-MM-DD HH:MM:SS.ffffff`
pub fn format_record(at: &NaiveDateTime) -> String {
    at.format(RECORD_FORMAT).to_string()
}

/// Formats a timestamp as `YYYYMMDD-HHMMSS-ffffff`
pub fn format_path(at: &NaiveDateTime) -> String {
    at.format(PATH_FORMAT).to_string()
}

/// Parses a timestamp written by [`format_record`]
pub fn parse_record(raw: &str) -> Result<NaiveDateTime, chrono::ParseError> {
    NaiveDateTime::parse_from_str(raw.trim(), PARSE_FORMAT)
}
