// Analytics domain models (normalized from the remote API)
use chrono::{DateTime, Days, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Site {
    pub site_id: String,
    pub name: String,
    #[serde(default)]
    pub timezone: String,
    #[serde(default)]
    pub country: String,
    #[serde(default)]
    pub city: String,
}

/// Time window for an analytics query, in epoch millis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRange {
    pub from_utc: i64,
    pub to_utc: i64,
}

impl TimeRange {
    /// Whole UTC day for `date`, clipped to `now`. A day that has not
    /// started yet collapses to an empty range at its start.
    pub fn for_day(date: NaiveDate, now: DateTime<Utc>) -> Self {
        let start = date.and_time(NaiveTime::MIN).and_utc();
        let day_end = start + chrono::Duration::days(1) - chrono::Duration::milliseconds(1);
        let end = day_end.min(now).max(start);

        Self {
            from_utc: start.timestamp_millis(),
            to_utc: end.timestamp_millis(),
        }
    }

    /// Range for the day before `date`, used as the trend baseline.
    pub fn previous_day(date: NaiveDate, now: DateTime<Utc>) -> Self {
        let yesterday = date.checked_sub_days(Days::new(1)).unwrap_or(date);
        Self::for_day(yesterday, now)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsQuery {
    pub site_id: String,
    pub from_utc: i64,
    pub to_utc: i64,
}

impl AnalyticsQuery {
    pub fn new(site_id: impl Into<String>, range: TimeRange) -> Self {
        Self {
            site_id: site_id.into(),
            from_utc: range.from_utc,
            to_utc: range.to_utc,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageQuery {
    #[serde(flatten)]
    pub query: AnalyticsQuery,
    pub page_number: u32,
    pub page_size: u32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OccupancyBucket {
    pub timestamp: i64,
    pub count: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DemographicsBucket {
    pub timestamp: i64,
    pub male: f64,
    pub female: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryExitRecord {
    pub person_id: String,
    pub person_name: String,
    pub gender: Option<String>,
    pub zone_name: Option<String>,
    pub entry_utc: Option<i64>,
    pub exit_utc: Option<i64>,
    pub dwell_minutes: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub records: Vec<T>,
    pub total_records: u64,
}

impl<T> Default for Page<T> {
    fn default() -> Self {
        Self {
            records: Vec::new(),
            total_records: 0,
        }
    }
}
