// Overview use case - KPIs, trends and charts for one day
use crate::application::dashboard_api::{ApiError, DashboardApi};
use crate::application::live_board::LiveBoard;
use crate::application::site_directory::SiteDirectory;
use crate::application::view_state::{RequestTag, ViewState, ViewTracker};
use crate::domain::analytics::{AnalyticsQuery, OccupancyBucket, Site, TimeRange};
use crate::domain::demographics::{split_demographics, PercentSlice};
use crate::domain::series::{DemographicsPoint, OccupancyPoint};
use crate::domain::trend::{compute_trend, Trend};
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct OverviewTrends {
    pub occupancy: Trend,
    pub footfall: Trend,
    pub dwell: Trend,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OverviewSnapshot {
    pub site: Option<Site>,
    pub is_today: bool,
    pub simulation_running: bool,
    pub live_occupancy: f64,
    pub footfall: f64,
    pub avg_dwell_minutes: f64,
    pub trends: OverviewTrends,
    pub occupancy: Vec<OccupancyPoint>,
    pub demographics: Vec<DemographicsPoint>,
    pub demographics_split: Vec<PercentSlice>,
}

pub fn occupancy_series(buckets: &[OccupancyBucket]) -> Vec<OccupancyPoint> {
    buckets
        .iter()
        .map(|b| OccupancyPoint::new(b.timestamp, b.count))
        .collect()
}

/// A comparison fetch that failed for any reason but an expired session
/// just means "no baseline".
fn baseline<T>(result: Result<T, ApiError>, what: &str) -> Result<Option<T>, ApiError> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(ApiError::Unauthorized) => Err(ApiError::Unauthorized),
        Err(e) => {
            tracing::warn!("Previous-period {} unavailable: {}", what, e);
            Ok(None)
        }
    }
}

fn trend_against(current: f64, previous: Option<f64>) -> Trend {
    previous
        .map(|previous| compute_trend(current, previous))
        .unwrap_or_default()
}

#[derive(Clone)]
pub struct OverviewService {
    api: Arc<dyn DashboardApi>,
    sites: SiteDirectory,
    live: LiveBoard,
    view: Arc<ViewTracker<OverviewSnapshot>>,
    simulation_running: Arc<AtomicBool>,
}

impl OverviewService {
    pub fn new(api: Arc<dyn DashboardApi>, sites: SiteDirectory, live: LiveBoard) -> Self {
        Self {
            api,
            sites,
            live,
            view: Arc::new(ViewTracker::new("overview")),
            simulation_running: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Load the overview for `date`, settling the view unless a newer load
    /// was issued meanwhile. Only an expired session is returned as an error.
    pub async fn load(
        &self,
        date: NaiveDate,
        now: DateTime<Utc>,
    ) -> Result<ViewState<OverviewSnapshot>, ApiError> {
        let tag = self.view.begin();
        let outcome = self.fetch(date, now).await;
        self.settle(tag, &outcome);

        match outcome {
            Err(ApiError::Unauthorized) => Err(ApiError::Unauthorized),
            _ => Ok(self.state()),
        }
    }

    /// Current view. Today's overview carries the live occupancy and the
    /// live-merged series instead of the fetched ones.
    pub fn state(&self) -> ViewState<OverviewSnapshot> {
        match self.view.state() {
            ViewState::Ready(mut snapshot) if snapshot.is_today => {
                let live = self.live.snapshot();
                snapshot.live_occupancy = live.live_occupancy;
                snapshot.occupancy = live.occupancy;
                ViewState::Ready(snapshot)
            }
            state => state,
        }
    }

    /// Settle the view; only the newest request may seed the live board.
    fn settle(&self, tag: RequestTag, outcome: &Result<OverviewSnapshot, ApiError>) -> bool {
        if !self.view.complete(tag, outcome) {
            return false;
        }
        if let Ok(snapshot) = outcome {
            if snapshot.is_today {
                self.live.seed(snapshot.occupancy.clone());
            }
        }
        true
    }

    pub fn reset(&self) {
        self.view.reset();
        self.simulation_running.store(false, Ordering::SeqCst);
    }

    async fn fetch(&self, date: NaiveDate, now: DateTime<Utc>) -> Result<OverviewSnapshot, ApiError> {
        let site = self.sites.current().await?;
        let is_today = date == now.date_naive();

        if is_today {
            self.start_simulation();
        }

        let mut snapshot = self
            .assemble(
                &site,
                TimeRange::for_day(date, now),
                TimeRange::previous_day(date, now),
            )
            .await?;

        snapshot.site = Some(site);
        snapshot.is_today = is_today;
        snapshot.simulation_running = is_today && self.simulation_running.load(Ordering::SeqCst);
        Ok(snapshot)
    }

    /// Fetch current and previous period together and build the snapshot.
    pub async fn assemble(
        &self,
        site: &Site,
        current: TimeRange,
        previous: TimeRange,
    ) -> Result<OverviewSnapshot, ApiError> {
        let query = AnalyticsQuery::new(site.site_id.clone(), current);
        let previous_query = AnalyticsQuery::new(site.site_id.clone(), previous);

        let (footfall, dwell, occupancy, demographics, prev_footfall, prev_dwell, prev_occupancy) = tokio::join!(
            self.api.footfall(&query),
            self.api.dwell_minutes(&query),
            self.api.occupancy(&query),
            self.api.demographics(&query),
            self.api.footfall(&previous_query),
            self.api.dwell_minutes(&previous_query),
            self.api.occupancy(&previous_query),
        );

        let footfall = footfall?;
        let dwell = dwell?;
        let occupancy = occupancy_series(&occupancy?);
        let (demographics, demographics_split) = split_demographics(&demographics?);

        let prev_footfall = baseline(prev_footfall, "footfall")?;
        let prev_dwell = baseline(prev_dwell, "dwell")?;
        let prev_live = baseline(prev_occupancy, "occupancy")?
            .map(|buckets| buckets.last().map(|b| b.count).unwrap_or(0.0));

        let live_occupancy = occupancy.last().map(|p| p.count).unwrap_or(0.0);

        Ok(OverviewSnapshot {
            site: Some(site.clone()),
            is_today: false,
            simulation_running: false,
            live_occupancy,
            footfall,
            avg_dwell_minutes: dwell.round(),
            trends: OverviewTrends {
                occupancy: trend_against(live_occupancy, prev_live),
                footfall: trend_against(footfall, prev_footfall),
                dwell: trend_against(dwell, prev_dwell),
            },
            occupancy,
            demographics,
            demographics_split,
        })
    }

    /// Kick off the backend simulation without holding up the view.
    fn start_simulation(&self) {
        let api = self.api.clone();
        let flag = self.simulation_running.clone();
        tokio::spawn(async move {
            match api.start_simulation().await {
                Ok(()) => flag.store(true, Ordering::SeqCst),
                Err(e) => {
                    tracing::debug!("Simulation start failed: {}", e);
                    flag.store(false, Ordering::SeqCst);
                }
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::analytics::DemographicsBucket;
    use crate::domain::trend::TrendDirection;
    use crate::test_support::{site, FakeApi};
    use chrono::TimeZone;
    use std::collections::HashMap;

    const CURRENT: TimeRange = TimeRange { from_utc: 0, to_utc: 1000 };
    const PREVIOUS: TimeRange = TimeRange { from_utc: -1000, to_utc: -1 };

    fn service(api: FakeApi) -> OverviewService {
        let api: Arc<dyn DashboardApi> = Arc::new(api);
        let sites = SiteDirectory::new(api.clone(), None);
        OverviewService::new(api, sites, LiveBoard::new())
    }

    fn current_only() -> FakeApi {
        FakeApi {
            footfall: HashMap::from([(0, 0.0)]),
            dwell: HashMap::from([(0, 0.0)]),
            occupancy: HashMap::from([(0, vec![])]),
            demographics: HashMap::from([(0, vec![])]),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_failed_previous_period_degrades_to_unchanged() {
        let overview = service(current_only());

        let snapshot = overview.assemble(&site("S1"), CURRENT, PREVIOUS).await.unwrap();

        assert_eq!(snapshot.footfall, 0.0);
        assert_eq!(snapshot.trends.footfall, Trend::new(0, TrendDirection::Unchanged));
        assert_eq!(snapshot.trends.dwell, Trend::unchanged());
        assert_eq!(snapshot.trends.occupancy, Trend::unchanged());
    }

    #[tokio::test]
    async fn test_trends_against_previous_period() {
        let mut api = current_only();
        api.footfall = HashMap::from([(0, 150.0), (-1000, 100.0)]);
        api.dwell = HashMap::from([(0, 12.4), (-1000, 12.4)]);
        api.occupancy = HashMap::from([
            (0, vec![OccupancyBucket { timestamp: 60_000, count: 20.0 }]),
            (-1000, vec![]),
        ]);
        let overview = service(api);

        let snapshot = overview.assemble(&site("S1"), CURRENT, PREVIOUS).await.unwrap();

        assert_eq!(snapshot.trends.footfall, Trend::new(50, TrendDirection::Increase));
        assert_eq!(snapshot.trends.dwell, Trend::unchanged());
        assert_eq!(snapshot.avg_dwell_minutes, 12.0);
        // previous day had no buckets: zero baseline
        assert_eq!(snapshot.trends.occupancy, Trend::new(100, TrendDirection::Increase));
        assert_eq!(snapshot.live_occupancy, 20.0);
        assert_eq!(snapshot.occupancy[0].label, "0:01");
    }

    #[tokio::test]
    async fn test_demographics_split() {
        let mut api = current_only();
        api.demographics = HashMap::from([(
            0,
            vec![DemographicsBucket { timestamp: 0, male: 30.0, female: 70.0 }],
        )]);
        let overview = service(api);

        let snapshot = overview.assemble(&site("S1"), CURRENT, PREVIOUS).await.unwrap();

        let split: Vec<(&str, u32)> = snapshot
            .demographics_split
            .iter()
            .map(|s| (s.name, s.value))
            .collect();
        assert_eq!(split, vec![("Males", 30), ("Females", 70)]);
    }

    #[tokio::test]
    async fn test_current_period_failure_resets_view() {
        let now = Utc.with_ymd_and_hms(2024, 5, 10, 12, 0, 0).unwrap();
        let api = FakeApi {
            sites: vec![site("S1")],
            ..Default::default()
        };
        let overview = service(api);

        let state = overview
            .load(NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(), now)
            .await
            .unwrap();

        assert_eq!(state, ViewState::Failed);
        assert_eq!(state.display(), OverviewSnapshot::default());
    }

    #[tokio::test]
    async fn test_unauthorized_is_surfaced() {
        let now = Utc.with_ymd_and_hms(2024, 5, 10, 12, 0, 0).unwrap();
        let api = FakeApi {
            unauthorized: true,
            ..Default::default()
        };
        let overview = service(api);

        let result = overview.load(now.date_naive(), now).await;

        assert!(matches!(result, Err(ApiError::Unauthorized)));
        assert_eq!(overview.state(), ViewState::Failed);
    }

    #[test]
    fn test_superseded_load_does_not_seed() {
        let live = LiveBoard::new();
        let api: Arc<dyn DashboardApi> = Arc::new(FakeApi::default());
        let overview = OverviewService::new(api.clone(), SiteDirectory::new(api, None), live.clone());
        let today = OverviewSnapshot {
            is_today: true,
            occupancy: vec![OccupancyPoint::new(60_000, 9.0)],
            ..Default::default()
        };

        let stale = overview.view.begin();
        let newest = overview.view.begin();
        assert!(overview.settle(newest, &Ok(OverviewSnapshot::default())));
        assert!(!overview.settle(stale, &Ok(today)));

        assert_eq!(live.live_occupancy(), 0.0);
        assert!(live.snapshot().occupancy.is_empty());
    }

    #[tokio::test]
    async fn test_today_shows_live_readings() {
        let now = Utc.with_ymd_and_hms(2024, 5, 10, 12, 0, 0).unwrap();
        let today = TimeRange::for_day(now.date_naive(), now);
        let bucket = OccupancyBucket { timestamp: today.from_utc + 60_000, count: 9.0 };
        let api = FakeApi {
            sites: vec![site("S1")],
            footfall: HashMap::from([(today.from_utc, 5.0)]),
            dwell: HashMap::from([(today.from_utc, 3.0)]),
            occupancy: HashMap::from([(today.from_utc, vec![bucket])]),
            demographics: HashMap::from([(today.from_utc, vec![])]),
            ..Default::default()
        };
        let api: Arc<dyn DashboardApi> = Arc::new(api);
        let live = LiveBoard::new();
        let overview = OverviewService::new(api.clone(), SiteDirectory::new(api, None), live.clone());
        overview.load(now.date_naive(), now).await.unwrap();

        live.apply_occupancy(&serde_json::json!({ "siteOccupancy": 42 }), now);

        let snapshot = overview.state().display();
        assert_eq!(snapshot.live_occupancy, 42.0);
        assert_eq!(snapshot.occupancy.len(), 2);

        // Reloading keeps the newer pushed reading
        let snapshot = overview.load(now.date_naive(), now).await.unwrap().display();
        assert_eq!(snapshot.live_occupancy, 42.0);
    }

    #[tokio::test]
    async fn test_today_seeds_live_board() {
        let now = Utc.with_ymd_and_hms(2024, 5, 10, 12, 0, 0).unwrap();
        let today = TimeRange::for_day(now.date_naive(), now);
        let bucket = OccupancyBucket { timestamp: today.from_utc + 60_000, count: 9.0 };
        let api = FakeApi {
            sites: vec![site("S1")],
            footfall: HashMap::from([(today.from_utc, 5.0)]),
            dwell: HashMap::from([(today.from_utc, 3.0)]),
            occupancy: HashMap::from([(today.from_utc, vec![bucket])]),
            demographics: HashMap::from([(today.from_utc, vec![])]),
            ..Default::default()
        };
        let api: Arc<dyn DashboardApi> = Arc::new(api);
        let live = LiveBoard::new();
        let overview = OverviewService::new(api.clone(), SiteDirectory::new(api, None), live.clone());

        let state = overview.load(now.date_naive(), now).await.unwrap();

        let snapshot = state.display();
        assert!(snapshot.is_today);
        assert_eq!(snapshot.footfall, 5.0);
        assert_eq!(live.live_occupancy(), 9.0);
    }
}
