// Live state fed by the push channel: occupancy and recent alerts
use crate::application::push_channel::{ALERT_TOPIC, LIVE_OCCUPANCY_TOPIC};
use crate::application::realtime_client::{RealtimeClient, SubscriptionId};
use crate::domain::alert::{Alert, AlertFeed};
use crate::domain::series::{bucket_label, LiveSeries, OccupancyPoint};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::broadcast;

const UPDATE_CHANNEL_CAPACITY: usize = 100;

/// One change pushed to `/live` followers.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LiveUpdate {
    Occupancy { count: f64, label: String },
    Alert(Alert),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveSnapshot {
    pub live_occupancy: f64,
    pub occupancy: Vec<OccupancyPoint>,
}

#[derive(Default)]
struct LiveState {
    occupancy: f64,
    series: LiveSeries,
    alerts: AlertFeed,
    // Latest pushed reading as (timestamp, count)
    last_reading: Option<(i64, f64)>,
}

#[derive(Clone)]
pub struct LiveBoard {
    state: Arc<Mutex<LiveState>>,
    updates: broadcast::Sender<LiveUpdate>,
}

impl Default for LiveBoard {
    fn default() -> Self {
        Self::new()
    }
}

impl LiveBoard {
    pub fn new() -> Self {
        let (updates, _) = broadcast::channel(UPDATE_CHANNEL_CAPACITY);
        Self {
            state: Arc::new(Mutex::new(LiveState::default())),
            updates,
        }
    }

    fn lock(&self) -> MutexGuard<'_, LiveState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Subscribe the board to the occupancy and alert topics.
    pub fn attach(&self, client: &RealtimeClient) -> Vec<SubscriptionId> {
        let board = self.clone();
        let occupancy = client.subscribe(LIVE_OCCUPANCY_TOPIC, move |payload| {
            board.apply_occupancy(payload, Utc::now());
        });

        let board = self.clone();
        let alerts = client.subscribe(ALERT_TOPIC, move |payload| {
            board.apply_alert(payload, Utc::now());
        });

        vec![occupancy, alerts]
    }

    /// Replace the live series with freshly fetched history for today.
    /// A pushed reading newer than that history is merged back on top.
    pub fn seed(&self, points: Vec<OccupancyPoint>) {
        let mut state = self.lock();
        let history_end = points.last().map(|p| p.timestamp).unwrap_or(i64::MIN);
        state.series = LiveSeries::from_points(points);

        if let Some((timestamp, count)) = state.last_reading {
            if timestamp >= history_end {
                state.series.merge(timestamp, count);
            }
        }
        state.occupancy = state.series.latest_count();
    }

    /// Apply a `live_occupancy` payload. Payloads without a numeric
    /// `siteOccupancy` are ignored.
    pub fn apply_occupancy(&self, payload: &Value, now: DateTime<Utc>) -> bool {
        let Some(count) = payload.get("siteOccupancy").and_then(Value::as_f64) else {
            tracing::debug!("live_occupancy payload without siteOccupancy: {}", payload);
            return false;
        };

        let timestamp = now.timestamp_millis();
        {
            let mut state = self.lock();
            state.occupancy = count;
            state.series.merge(timestamp, count);
            state.last_reading = Some((timestamp, count));
        }

        let _ = self.updates.send(LiveUpdate::Occupancy {
            count,
            label: bucket_label(timestamp),
        });
        true
    }

    pub fn apply_alert(&self, payload: &Value, now: DateTime<Utc>) {
        let alert = Alert::from_payload(payload, now);
        tracing::info!(
            "Alert: {} at {} ({:?})",
            alert.person_name,
            alert.zone_name,
            alert.severity
        );

        self.lock().alerts.push(alert.clone());
        let _ = self.updates.send(LiveUpdate::Alert(alert));
    }

    pub fn snapshot(&self) -> LiveSnapshot {
        let state = self.lock();
        LiveSnapshot {
            live_occupancy: state.occupancy,
            occupancy: state.series.points().to_vec(),
        }
    }

    pub fn live_occupancy(&self) -> f64 {
        self.lock().occupancy
    }

    pub fn alerts(&self) -> Vec<Alert> {
        self.lock().alerts.snapshot()
    }

    /// Forget everything tied to the ended session.
    pub fn clear(&self) {
        *self.lock() = LiveState::default();
    }

    pub fn follow(&self) -> broadcast::Receiver<LiveUpdate> {
        self.updates.subscribe()
    }
}
