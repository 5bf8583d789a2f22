// HTTP client for the remote crowd-analytics API
use crate::application::dashboard_api::{ApiError, DashboardApi};
use crate::domain::analytics::{
    AnalyticsQuery, DemographicsBucket, EntryExitRecord, OccupancyBucket, Page, PageQuery, Site,
};
use crate::domain::session::Session;
use crate::domain::user::NewUser;
use crate::infrastructure::normalize;
use async_trait::async_trait;
use reqwest::{header, Method, StatusCode};
use serde::Serialize;
use serde_json::{json, Value};
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct HttpDashboardApi {
    client: reqwest::Client,
    base_url: String,
    session: Session,
}

impl HttpDashboardApi {
    pub fn new(base_url: String, timeout: Duration, session: Session) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            session,
        })
    }

    async fn request<B: Serialize + ?Sized>(
        &self,
        method: Method,
        endpoint: &str,
        body: Option<&B>,
    ) -> Result<Value, ApiError> {
        let url = format!("{}{}", self.base_url, endpoint);

        let mut request = self
            .client
            .request(method.clone(), &url)
            .header(header::ACCEPT, "application/json");

        if let Some(token) = self.session.token() {
            request = request.bearer_auth(token);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        tracing::debug!("{} {}", method, endpoint);
        let response = request.send().await?;
        let status = response.status();

        if status == StatusCode::UNAUTHORIZED {
            tracing::warn!("{} {} rejected the session token", method, endpoint);
            return Err(ApiError::Unauthorized);
        }

        if !status.is_success() {
            let body = response.json::<Value>().await.unwrap_or(Value::Null);
            let message = normalize::error_message(&body)
                .unwrap_or_else(|| format!("API Error: {}", status.as_u16()));
            tracing::warn!("{} {} failed with status {}: {}", method, endpoint, status, message);
            return Err(ApiError::Status { status, message });
        }

        // Some endpoints answer with an empty body
        let bytes = response.bytes().await?;
        if bytes.is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_slice(&bytes).map_err(|e| ApiError::Decode(e.to_string()))
    }

    async fn get(&self, endpoint: &str) -> Result<Value, ApiError> {
        self.request::<Value>(Method::GET, endpoint, None).await
    }

    async fn post<B: Serialize + ?Sized>(&self, endpoint: &str, body: &B) -> Result<Value, ApiError> {
        self.request(Method::POST, endpoint, Some(body)).await
    }
}

fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

#[async_trait]
impl DashboardApi for HttpDashboardApi {
    async fn login(&self, email: &str, password: &str) -> Result<String, ApiError> {
        let body = json!({ "email": email, "password": password });
        let response = self.post("/auth/login", &body).await?;

        normalize::text_field(&response, &["token"])
            .ok_or_else(|| ApiError::Decode("login response carried no token".to_string()))
    }

    async fn list_sites(&self) -> Result<Vec<Site>, ApiError> {
        let response = self.get("/sites").await?;
        Ok(normalize::sites(&response))
    }

    async fn start_simulation(&self) -> Result<(), ApiError> {
        self.get("/sim/start").await.map(|_| ())
    }

    async fn footfall(&self, query: &AnalyticsQuery) -> Result<f64, ApiError> {
        let response = self.post("/analytics/footfall", query).await?;
        Ok(normalize::metric(&response, "footfall"))
    }

    async fn dwell_minutes(&self, query: &AnalyticsQuery) -> Result<f64, ApiError> {
        let response = self.post("/analytics/dwell", query).await?;
        Ok(normalize::metric(&response, "avgDwellMinutes"))
    }

    async fn occupancy(&self, query: &AnalyticsQuery) -> Result<Vec<OccupancyBucket>, ApiError> {
        let response = self.post("/analytics/occupancy", query).await?;
        Ok(normalize::occupancy_buckets(&response, now_ms()))
    }

    async fn demographics(
        &self,
        query: &AnalyticsQuery,
    ) -> Result<Vec<DemographicsBucket>, ApiError> {
        let response = self.post("/analytics/demographics", query).await?;
        Ok(normalize::demographics_buckets(&response, now_ms()))
    }

    async fn entries(&self, query: &PageQuery) -> Result<Page<EntryExitRecord>, ApiError> {
        let response = self.post("/analytics/entry-exit", query).await?;
        Ok(normalize::entries_page(&response))
    }

    async fn create_user(&self, user: &NewUser) -> Result<Option<String>, ApiError> {
        let response = self.post("/user/create", user).await?;
        Ok(normalize::text_field(&response, &["message"]))
    }
}
