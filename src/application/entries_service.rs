// Crowd entries use case - paginated entry/exit table
use crate::application::dashboard_api::{ApiError, DashboardApi};
use crate::application::site_directory::SiteDirectory;
use crate::application::view_state::{ViewState, ViewTracker};
use crate::domain::analytics::{AnalyticsQuery, EntryExitRecord, PageQuery, TimeRange};
use crate::domain::gender::detect_gender;
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use std::sync::Arc;

pub const DEFAULT_PAGE_SIZE: u32 = 10;
pub const MAX_PAGE_SIZE: u32 = 100;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryRow {
    pub person_id: String,
    pub name: String,
    pub sex: String,
    pub entry: String,
    pub exit: String,
    pub dwell: String,
    pub avatar_url: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EntriesPage {
    pub rows: Vec<EntryRow>,
    pub page: u32,
    pub page_size: u32,
    pub total_records: u64,
    pub total_pages: u64,
}

#[derive(Debug, Clone, Copy)]
pub struct EntriesRequest {
    pub date: NaiveDate,
    pub page: u32,
    pub page_size: u32,
}

pub fn total_pages(total_records: u64, page_size: u32) -> u64 {
    if page_size == 0 {
        return 1;
    }
    total_records.div_ceil(page_size as u64).max(1)
}

/// `Hh Mm` for an hour or more, `Mm` below, `--` when unknown.
pub fn format_dwell(minutes: Option<f64>) -> String {
    let Some(minutes) = minutes.filter(|m| *m > 0.0) else {
        return "--".to_string();
    };

    let minutes = minutes.round() as u64;
    let hours = minutes / 60;
    let rest = minutes % 60;
    if hours > 0 {
        format!("{}h {}m", hours, rest)
    } else {
        format!("{}m", rest)
    }
}

/// Capitalized gender, falling back to a guess from the name.
pub fn format_gender(raw: Option<&str>, person_name: &str) -> String {
    if let Some(raw) = raw.filter(|s| !s.is_empty()) {
        let mut chars = raw.chars();
        if let Some(first) = chars.next() {
            return first.to_uppercase().chain(chars.as_str().to_lowercase().chars()).collect();
        }
    }

    detect_gender(person_name)
        .map(|g| g.label().to_string())
        .unwrap_or_else(|| "--".to_string())
}

pub fn format_time(epoch_millis: Option<i64>) -> String {
    epoch_millis
        .filter(|ms| *ms != 0)
        .and_then(DateTime::<Utc>::from_timestamp_millis)
        .map(|t| t.format("%H:%M").to_string())
        .unwrap_or_else(|| "--".to_string())
}

fn avatar_url(name: &str) -> String {
    format!(
        "https://ui-avatars.com/api/?name={}&background=random&size=36",
        urlencoding::encode(name)
    )
}

fn to_row(record: &EntryExitRecord) -> EntryRow {
    let name = if record.person_name.is_empty() {
        "Unknown".to_string()
    } else {
        record.person_name.clone()
    };

    EntryRow {
        person_id: record.person_id.clone(),
        sex: format_gender(record.gender.as_deref(), &record.person_name),
        entry: format_time(record.entry_utc),
        exit: format_time(record.exit_utc),
        dwell: format_dwell(record.dwell_minutes),
        avatar_url: avatar_url(if record.person_name.is_empty() { "U" } else { &name }),
        name,
    }
}

#[derive(Clone)]
pub struct EntriesService {
    api: Arc<dyn DashboardApi>,
    sites: SiteDirectory,
    view: Arc<ViewTracker<EntriesPage>>,
}

impl EntriesService {
    pub fn new(api: Arc<dyn DashboardApi>, sites: SiteDirectory) -> Self {
        Self {
            api,
            sites,
            view: Arc::new(ViewTracker::new("entries")),
        }
    }

    pub async fn load(
        &self,
        request: EntriesRequest,
        now: DateTime<Utc>,
    ) -> Result<ViewState<EntriesPage>, ApiError> {
        let tag = self.view.begin();
        let outcome = self.fetch(request, now).await;
        self.view.complete(tag, &outcome);

        match outcome {
            Err(ApiError::Unauthorized) => Err(ApiError::Unauthorized),
            _ => Ok(self.view.state()),
        }
    }

    pub fn reset(&self) {
        self.view.reset();
    }

    async fn fetch(&self, request: EntriesRequest, now: DateTime<Utc>) -> Result<EntriesPage, ApiError> {
        let site = self.sites.current().await?;
        let page = request.page.max(1);
        let page_size = request.page_size.clamp(1, MAX_PAGE_SIZE);

        let query = PageQuery {
            query: AnalyticsQuery::new(site.site_id, TimeRange::for_day(request.date, now)),
            page_number: page,
            page_size,
        };
        let result = self.api.entries(&query).await?;

        Ok(EntriesPage {
            rows: result.records.iter().map(to_row).collect(),
            page,
            page_size,
            total_records: result.total_records,
            total_pages: total_pages(result.total_records, page_size),
        })
    }
}
