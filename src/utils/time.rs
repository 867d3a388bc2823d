use std::collections::BTreeMap;
use std::sync::OnceLock;

use time::{OffsetDateTime, UtcOffset};
use time::macros::format_description;

/// Location reported to the upstream; the client never looks it up.
const USER_LOCATION: &str = "Unknown";

/// Language reported to the upstream.
const USER_LANGUAGE: &str = "en-US";

static LOCAL_OFFSET: OnceLock<UtcOffset> = OnceLock::new();

/// Fills the upstream's prompt template variables for a request sent at `now`.
pub fn template_variables(now: OffsetDateTime, user_name: &str) -> BTreeMap<String, String> {
    let datetime = format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");
    let date = format_description!("[year]-[month]-[day]");
    let clock = format_description!("[hour]:[minute]:[second]");
    let timezone = format_description!("UTC[offset_hour sign:mandatory]:[offset_minute]");

    let mut vars = BTreeMap::new();
    let mut set = |key: &str, value: String| {
        vars.insert(format!("{{{{{key}}}}}"), value);
    };
    set("USER_NAME", user_name.to_string());
    set("USER_LOCATION", USER_LOCATION.to_string());
    set("CURRENT_DATETIME", now.format(&datetime).unwrap_or_default());
    set("CURRENT_DATE", now.format(&date).unwrap_or_default());
    set("CURRENT_TIME", now.format(&clock).unwrap_or_default());
    set("CURRENT_WEEKDAY", now.weekday().to_string());
    set("CURRENT_TIMEZONE", now.format(&timezone).unwrap_or_default());
    set("USER_LANGUAGE", USER_LANGUAGE.to_string());
    vars
}

/// Reads and caches the local UTC offset, falling back to UTC.
///
/// On Unix the offset can only be read while the process has a single
/// thread, so binaries call this before starting the tokio runtime.  Later
/// calls return the cached value.
pub fn init_local_offset() -> UtcOffset {
    *LOCAL_OFFSET.get_or_init(|| UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC))
}

/// The current time in the cached local offset.
///
/// Without [`init_local_offset`] the offset is looked up on every call, which
/// yields UTC inside a multi-threaded runtime.
pub fn now() -> OffsetDateTime {
    let offset = LOCAL_OFFSET
        .get()
        .copied()
        .unwrap_or_else(|| UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC));
    OffsetDateTime::now_utc().to_offset(offset)
}
