// Shared fakes for unit tests
use crate::application::dashboard_api::{ApiError, DashboardApi};
use crate::application::push_channel::{PushConnection, PushConnector, PushEvent, TransportError};
use crate::domain::analytics::{
    AnalyticsQuery, DemographicsBucket, EntryExitRecord, OccupancyBucket, Page, PageQuery, Site,
};
use crate::domain::user::NewUser;
use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::mpsc;

/// Polls `condition` until it holds, failing the test after two seconds.
pub async fn wait_until(condition: impl Fn() -> bool) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    while !condition() {
        assert!(tokio::time::Instant::now() < deadline, "condition not reached in time");
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

/// In-memory push transport. Events emitted go to the most recent link.
#[derive(Default)]
pub struct FakeConnector {
    failures_left: AtomicU32,
    opens: AtomicUsize,
    tokens: Mutex<Vec<String>>,
    link: Mutex<Option<mpsc::UnboundedSender<PushEvent>>>,
}

impl FakeConnector {
    /// Connector whose first `failures` open attempts fail.
    pub fn failing(failures: u32) -> Self {
        Self {
            failures_left: AtomicU32::new(failures),
            ..Default::default()
        }
    }

    pub fn open_count(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    pub fn tokens(&self) -> Vec<String> {
        self.tokens.lock().unwrap().clone()
    }

    pub fn emit(&self, topic: &str, payload: Value) {
        if let Some(link) = self.link.lock().unwrap().as_ref() {
            let _ = link.send(PushEvent::new(topic, payload));
        }
    }

    /// Simulates the server dropping the current link.
    pub fn drop_link(&self) {
        self.link.lock().unwrap().take();
    }
}

struct FakeConnection {
    events: mpsc::UnboundedReceiver<PushEvent>,
}

#[async_trait]
impl PushConnection for FakeConnection {
    async fn next_event(&mut self) -> Option<PushEvent> {
        self.events.recv().await
    }

    async fn close(&mut self) {
        self.events.close();
    }
}

#[async_trait]
impl PushConnector for FakeConnector {
    async fn open(&self, token: &str) -> Result<Box<dyn PushConnection>, TransportError> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        self.tokens.lock().unwrap().push(token.to_string());

        let failing = self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(TransportError::Connect("refused by fake".to_string()));
        }

        let (tx, rx) = mpsc::unbounded_channel();
        *self.link.lock().unwrap() = Some(tx);
        Ok(Box::new(FakeConnection { events: rx }))
    }
}

fn server_error() -> ApiError {
    ApiError::Status {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        message: "API Error: 500".to_string(),
    }
}

/// Canned analytics API. Per-period answers are keyed by the query's
/// `from_utc`; a missing key answers with a 500.
#[derive(Default)]
pub struct FakeApi {
    pub token: Option<String>,
    pub unauthorized: bool,
    pub sites: Vec<Site>,
    pub footfall: HashMap<i64, f64>,
    pub dwell: HashMap<i64, f64>,
    pub occupancy: HashMap<i64, Vec<OccupancyBucket>>,
    pub demographics: HashMap<i64, Vec<DemographicsBucket>>,
    pub entries: Option<Page<EntryExitRecord>>,
    pub create_user_error: Option<(StatusCode, String)>,
    pub calls: AtomicUsize,
    pub page_queries: Mutex<Vec<PageQuery>>,
}

impl FakeApi {
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn record(&self) -> Result<(), ApiError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.unauthorized {
            return Err(ApiError::Unauthorized);
        }
        Ok(())
    }

    fn lookup<T: Clone>(&self, map: &HashMap<i64, T>, query: &AnalyticsQuery) -> Result<T, ApiError> {
        self.record()?;
        map.get(&query.from_utc).cloned().ok_or_else(server_error)
    }
}

#[async_trait]
impl DashboardApi for FakeApi {
    async fn login(&self, _email: &str, password: &str) -> Result<String, ApiError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.token {
            Some(token) if password == "secret" => Ok(token.clone()),
            _ => Err(ApiError::Unauthorized),
        }
    }

    async fn list_sites(&self) -> Result<Vec<Site>, ApiError> {
        self.record()?;
        Ok(self.sites.clone())
    }

    async fn start_simulation(&self) -> Result<(), ApiError> {
        self.record()
    }

    async fn footfall(&self, query: &AnalyticsQuery) -> Result<f64, ApiError> {
        self.lookup(&self.footfall, query)
    }

    async fn dwell_minutes(&self, query: &AnalyticsQuery) -> Result<f64, ApiError> {
        self.lookup(&self.dwell, query)
    }

    async fn occupancy(&self, query: &AnalyticsQuery) -> Result<Vec<OccupancyBucket>, ApiError> {
        self.lookup(&self.occupancy, query)
    }

    async fn demographics(
        &self,
        query: &AnalyticsQuery,
    ) -> Result<Vec<DemographicsBucket>, ApiError> {
        self.lookup(&self.demographics, query)
    }

    async fn entries(&self, query: &PageQuery) -> Result<Page<EntryExitRecord>, ApiError> {
        self.record()?;
        self.page_queries.lock().unwrap().push(query.clone());
        self.entries.clone().ok_or_else(server_error)
    }

    async fn create_user(&self, _user: &NewUser) -> Result<Option<String>, ApiError> {
        self.record()?;
        match &self.create_user_error {
            Some((status, message)) => Err(ApiError::Status {
                status: *status,
                message: message.clone(),
            }),
            None => Ok(None),
        }
    }
}

pub fn site(site_id: &str) -> Site {
    Site {
        site_id: site_id.to_string(),
        name: format!("Site {}", site_id),
        timezone: "UTC".to_string(),
        country: String::new(),
        city: String::new(),
    }
}
