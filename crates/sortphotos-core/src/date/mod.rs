pub mod exif;

use chrono::{Duration, NaiveDateTime, Timelike};
use serde::Serialize;

use crate::filter::FilterConfig;
use crate::metadata::MetadataRecord;

pub use exif::parse_exif_date;

/// The oldest timestamp found in a record and every key that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedDate {
    pub date: NaiveDateTime,
    pub keys: Vec<String>,
}

/// Pick the oldest valid timestamp among the eligible tags of `record`.
pub fn resolve_oldest(record: &MetadataRecord, filter: &FilterConfig) -> Option<ResolvedDate> {
    resolve_oldest_before(record, filter, chrono::Local::now().naive_local())
}

/// Same as [`resolve_oldest`], with `now` as the upper bound: only
/// timestamps strictly earlier than it can win.
pub fn resolve_oldest_before(
    record: &MetadataRecord,
    filter: &FilterConfig,
    now: NaiveDateTime,
) -> Option<ResolvedDate> {
    let mut oldest = now;
    let mut keys: Vec<String> = Vec::new();
    let mut found = false;

    for (key, value) in record.tags() {
        if !filter.is_eligible(key) {
            continue;
        }
        let Some(date) = value.primary().and_then(parse_exif_date) else {
            continue;
        };
        if date < oldest {
            oldest = date;
            keys = vec![key.to_string()];
            found = true;
        } else if date == oldest {
            keys.push(key.to_string());
        }
    }

    found.then_some(ResolvedDate { date: oldest, keys })
}

/// Pull photos taken before `day_begins` o'clock into the previous day.
pub fn reclassify_early_morning(date: NaiveDateTime, day_begins: u32) -> NaiveDateTime {
    if date.hour() < day_begins {
        date - Duration::hours(i64::from(date.hour()) + 1)
    } else {
        date
    }
}
