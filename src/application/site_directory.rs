// Resolves which site the dashboard shows
use crate::application::dashboard_api::{ApiError, DashboardApi};
use crate::domain::analytics::Site;
use std::sync::Arc;
use tokio::sync::Mutex;

#[derive(Clone)]
pub struct SiteDirectory {
    api: Arc<dyn DashboardApi>,
    pinned_site_id: Option<String>,
    current: Arc<Mutex<Option<Site>>>,
}

impl SiteDirectory {
    pub fn new(api: Arc<dyn DashboardApi>, pinned_site_id: Option<String>) -> Self {
        Self {
            api,
            pinned_site_id,
            current: Arc::new(Mutex::new(None)),
        }
    }

    /// The pinned site if configured, otherwise the first listed one.
    /// A successful lookup is cached for the rest of the session.
    pub async fn current(&self) -> Result<Site, ApiError> {
        let mut current = self.current.lock().await;
        if let Some(site) = current.as_ref() {
            return Ok(site.clone());
        }

        let sites = self.api.list_sites().await?;
        let site = match &self.pinned_site_id {
            Some(id) => sites
                .into_iter()
                .find(|s| &s.site_id == id)
                .unwrap_or_else(|| Site {
                    site_id: id.clone(),
                    name: id.clone(),
                    timezone: "UTC".to_string(),
                    country: String::new(),
                    city: String::new(),
                }),
            None => sites
                .into_iter()
                .next()
                .ok_or_else(|| ApiError::Decode("no sites available".to_string()))?,
        };

        tracing::info!("Dashboard site: {} ({})", site.name, site.site_id);
        *current = Some(site.clone());
        Ok(site)
    }

    pub async fn forget(&self) {
        self.current.lock().await.take();
    }
}
