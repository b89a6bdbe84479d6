//! Project-specific utilities live here.

use time::OffsetDateTime;

/// Calendar year in UTC, evaluated on every call.
pub fn current_year() -> i32 {
    OffsetDateTime::now_utc().year()
}
