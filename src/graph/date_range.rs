//! Client-side date-range filtering
//!
//! The chat messages endpoint cannot combine a sender filter with a
//! `createdDateTime` range, so ranges are applied to the returned page here.
//! Both bounds are exclusive. Items without a timestamp, or with one that does
//! not parse, are kept.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

/// Exclusive `(from, to)` bounds; an unparsable bound is treated as absent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DateRange {
    from: Option<DateTime<Utc>>,
    to: Option<DateTime<Utc>>,
}

impl DateRange {
    pub fn new(from: Option<&str>, to: Option<&str>) -> Self {
        Self {
            from: from.and_then(parse_timestamp),
            to: to.and_then(parse_timestamp),
        }
    }

    pub fn is_unbounded(&self) -> bool {
        self.from.is_none() && self.to.is_none()
    }

    /// Whether an item stamped `timestamp` survives the filter
    pub fn admits(&self, timestamp: Option<&str>) -> bool {
        let Some(at) = timestamp.and_then(parse_timestamp) else {
            return true;
        };

        if let Some(from) = self.from {
            if at <= from {
                return false;
            }
        }
        if let Some(to) = self.to {
            if at >= to {
                return false;
            }
        }
        true
    }

    /// Keep the items whose timestamp lies strictly inside the range.
    pub fn retain<T>(&self, items: &mut Vec<T>, timestamp: impl Fn(&T) -> Option<&str>) {
        if self.is_unbounded() {
            return;
        }
        items.retain(|item| self.admits(timestamp(item)));
    }
}

/// RFC 3339, or a zone-less date/datetime taken as UTC
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Some(parsed.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(naive.and_utc());
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}
