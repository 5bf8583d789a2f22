// Remote crowd-analytics API seam
use crate::domain::analytics::{
    AnalyticsQuery, DemographicsBucket, EntryExitRecord, OccupancyBucket, Page, PageQuery, Site,
};
use crate::domain::user::NewUser;
use async_trait::async_trait;
use reqwest::StatusCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    /// The API rejected the bearer token; the session is no longer valid.
    #[error("Session expired. Please login again.")]
    Unauthorized,

    /// Non-success response, carrying the server's message when it sent one.
    #[error("{message}")]
    Status { status: StatusCode, message: String },

    #[error("API request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Unexpected API response: {0}")]
    Decode(String),
}

impl ApiError {
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ApiError::Unauthorized)
    }
}

#[async_trait]
pub trait DashboardApi: Send + Sync {
    /// Exchange credentials for a bearer token
    async fn login(&self, email: &str, password: &str) -> Result<String, ApiError>;

    async fn list_sites(&self) -> Result<Vec<Site>, ApiError>;

    /// Ask the backend to start feeding simulated crowd data
    async fn start_simulation(&self) -> Result<(), ApiError>;

    async fn footfall(&self, query: &AnalyticsQuery) -> Result<f64, ApiError>;

    async fn dwell_minutes(&self, query: &AnalyticsQuery) -> Result<f64, ApiError>;

    async fn occupancy(&self, query: &AnalyticsQuery) -> Result<Vec<OccupancyBucket>, ApiError>;

    async fn demographics(
        &self,
        query: &AnalyticsQuery,
    ) -> Result<Vec<DemographicsBucket>, ApiError>;

    async fn entries(&self, query: &PageQuery) -> Result<Page<EntryExitRecord>, ApiError>;

    /// Create a user; returns the server's confirmation message if any
    async fn create_user(&self, user: &NewUser) -> Result<Option<String>, ApiError>;
}
