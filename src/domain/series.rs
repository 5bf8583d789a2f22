// Chart series domain models
use chrono::{DateTime, Timelike, Utc};
use serde::Serialize;

/// Retention window for series fed by live updates.
pub const LIVE_RETENTION: usize = 50;

/// Formats an epoch-millis timestamp as an `H:MM` bucket label in UTC.
pub fn bucket_label(epoch_millis: i64) -> String {
    let time = DateTime::<Utc>::from_timestamp_millis(epoch_millis).unwrap_or_default();
    format!("{}:{:02}", time.hour(), time.minute())
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OccupancyPoint {
    pub label: String,
    pub count: f64,
    pub timestamp: i64,
}

impl OccupancyPoint {
    pub fn new(timestamp: i64, count: f64) -> Self {
        Self {
            label: bucket_label(timestamp),
            count,
            timestamp,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DemographicsPoint {
    pub label: String,
    pub male: f64,
    pub female: f64,
}

/// Occupancy series that accepts live updates on top of historical buckets.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LiveSeries {
    points: Vec<OccupancyPoint>,
}

impl LiveSeries {
    pub fn from_points(points: Vec<OccupancyPoint>) -> Self {
        Self { points }
    }

    pub fn points(&self) -> &[OccupancyPoint] {
        &self.points
    }

    /// Count of the most recent point, or zero for an empty series.
    pub fn latest_count(&self) -> f64 {
        self.points.last().map(|p| p.count).unwrap_or(0.0)
    }

    /// Merges a live reading into the series.
    ///
    /// A reading in the same minute bucket as the last point replaces its
    /// count; a new bucket is appended and the series trimmed to
    /// [`LIVE_RETENTION`] points.
    pub fn merge(&mut self, timestamp: i64, count: f64) {
        let label = bucket_label(timestamp);

        if let Some(last) = self.points.last_mut() {
            if last.label == label {
                last.count = count;
                return;
            }
        }

        self.points.push(OccupancyPoint {
            label,
            count,
            timestamp,
        });

        if self.points.len() > LIVE_RETENTION {
            let excess = self.points.len() - LIVE_RETENTION;
            self.points.drain(..excess);
        }
    }
}
