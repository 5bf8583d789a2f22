// Normalization of backend payloads into domain models
//
// The backend is inconsistent about field names. Every fallback chain lives
// here, in precedence order; the first key holding a usable value wins.
// A numeric zero counts as "not usable" and falls through to the next key.
//
//   count      : count > occupancy > siteOccupancy > 0
//   timestamp  : timestamp > bucket > now
//   male       : male > maleCount > 0
//   female     : female > femaleCount > 0
//   gender     : gender > sex > Gender > Sex
//   error text : message > errorMessage
use crate::domain::analytics::{
    DemographicsBucket, EntryExitRecord, OccupancyBucket, Page, Site,
};
use serde_json::Value;

const COUNT_KEYS: &[&str] = &["count", "occupancy", "siteOccupancy"];
const TIMESTAMP_KEYS: &[&str] = &["timestamp", "bucket"];
const MALE_KEYS: &[&str] = &["male", "maleCount"];
const FEMALE_KEYS: &[&str] = &["female", "femaleCount"];
const GENDER_KEYS: &[&str] = &["gender", "sex", "Gender", "Sex"];
const ERROR_KEYS: &[&str] = &["message", "errorMessage"];

/// First non-zero number among `keys`.
pub fn number_field(value: &Value, keys: &[&str]) -> Option<f64> {
    keys.iter()
        .filter_map(|k| value.get(*k).and_then(Value::as_f64))
        .find(|n| *n != 0.0)
}

/// First non-empty string among `keys`.
pub fn text_field(value: &Value, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|k| value.get(*k).and_then(Value::as_str))
        .find(|s| !s.is_empty())
        .map(str::to_string)
}

fn timestamp_field(value: &Value, now_ms: i64) -> i64 {
    for key in TIMESTAMP_KEYS {
        match value.get(*key) {
            Some(Value::Number(n)) => {
                if let Some(ms) = n.as_i64().filter(|ms| *ms != 0) {
                    return ms;
                }
            }
            Some(Value::String(s)) => {
                if let Ok(time) = chrono::DateTime::parse_from_rfc3339(s) {
                    return time.timestamp_millis();
                }
            }
            _ => {}
        }
    }
    now_ms
}

/// Bucket list from either a bare array or a `{ "buckets": [...] }` wrapper.
fn bucket_items(value: &Value) -> &[Value] {
    match value {
        Value::Array(items) => items,
        Value::Object(map) => map
            .get("buckets")
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or(&[]),
        _ => &[],
    }
}

pub fn occupancy_buckets(value: &Value, now_ms: i64) -> Vec<OccupancyBucket> {
    bucket_items(value)
        .iter()
        .map(|item| OccupancyBucket {
            timestamp: timestamp_field(item, now_ms),
            count: number_field(item, COUNT_KEYS).unwrap_or(0.0),
        })
        .collect()
}

pub fn demographics_buckets(value: &Value, now_ms: i64) -> Vec<DemographicsBucket> {
    bucket_items(value)
        .iter()
        .map(|item| DemographicsBucket {
            timestamp: timestamp_field(item, now_ms),
            male: number_field(item, MALE_KEYS).unwrap_or(0.0),
            female: number_field(item, FEMALE_KEYS).unwrap_or(0.0),
        })
        .collect()
}

/// Scalar metric such as `{ "footfall": 12 }`; missing or null reads as zero.
pub fn metric(value: &Value, key: &str) -> f64 {
    value.get(key).and_then(Value::as_f64).unwrap_or(0.0)
}

pub fn entry_record(value: &Value) -> EntryExitRecord {
    EntryExitRecord {
        person_id: text_field(value, &["personId"]).unwrap_or_default(),
        person_name: text_field(value, &["personName"]).unwrap_or_default(),
        gender: text_field(value, GENDER_KEYS),
        zone_name: text_field(value, &["zoneName"]),
        entry_utc: value.get("entryUtc").and_then(Value::as_i64),
        exit_utc: value.get("exitUtc").and_then(Value::as_i64),
        dwell_minutes: value.get("dwellMinutes").and_then(Value::as_f64),
    }
}

/// Paginated entry/exit page; a body without a `records` array is an empty page.
pub fn entries_page(value: &Value) -> Page<EntryExitRecord> {
    let Some(records) = value.get("records").and_then(Value::as_array) else {
        return Page::default();
    };

    Page {
        records: records.iter().map(entry_record).collect(),
        total_records: value
            .get("totalRecords")
            .and_then(Value::as_u64)
            .unwrap_or(0),
    }
}

pub fn sites(value: &Value) -> Vec<Site> {
    value
        .as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(|item| serde_json::from_value(item.clone()).ok())
                .collect()
        })
        .unwrap_or_default()
}

/// Error text carried by a failed response body, if any.
pub fn error_message(value: &Value) -> Option<String> {
    text_field(value, ERROR_KEYS)
}
