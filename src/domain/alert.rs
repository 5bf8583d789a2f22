// Real-time alert domain model
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use std::collections::VecDeque;

/// Alerts kept in memory, newest first.
pub const ALERT_FEED_CAPACITY: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    High,
    Medium,
    Low,
}

impl Severity {
    fn parse(raw: &str) -> Self {
        match raw.to_lowercase().as_str() {
            "high" => Severity::High,
            "medium" => Severity::Medium,
            _ => Severity::Low,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertKind {
    Entry,
    Exit,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Alert {
    pub id: String,
    pub person_name: String,
    pub zone_name: String,
    pub severity: Severity,
    pub timestamp: i64,
    pub kind: AlertKind,
}

impl Alert {
    /// Builds an alert from a raw push payload, filling defaults for missing
    /// fields.
    pub fn from_payload(payload: &Value, now: DateTime<Utc>) -> Self {
        let text = |key: &str| {
            payload
                .get(key)
                .and_then(Value::as_str)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };

        let id = text("id").unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
        let severity = text("severity")
            .map(|s| Severity::parse(&s))
            .unwrap_or(Severity::Low);
        let kind = match text("type").as_deref() {
            Some("exit") => AlertKind::Exit,
            _ => AlertKind::Entry,
        };
        let timestamp = payload
            .get("timestamp")
            .and_then(Value::as_i64)
            .filter(|t| *t != 0)
            .unwrap_or_else(|| now.timestamp_millis());

        Self {
            id,
            person_name: text("personName").unwrap_or_else(|| "Unknown".to_string()),
            zone_name: text("zoneName").unwrap_or_else(|| "Unknown Zone".to_string()),
            severity,
            timestamp,
            kind,
        }
    }
}

/// Bounded list of recent alerts, newest first.
#[derive(Debug, Clone, Default)]
pub struct AlertFeed {
    alerts: VecDeque<Alert>,
}

impl AlertFeed {
    pub fn push(&mut self, alert: Alert) {
        self.alerts.push_front(alert);
        self.alerts.truncate(ALERT_FEED_CAPACITY);
    }

    pub fn snapshot(&self) -> Vec<Alert> {
        self.alerts.iter().cloned().collect()
    }
}
