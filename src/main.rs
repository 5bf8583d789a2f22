// Main entry point - Dependency injection and server setup
mod domain;
mod application;
mod infrastructure;
mod presentation;
#[cfg(test)]
mod test_support;

use std::{net::SocketAddr, sync::Arc};
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use crate::application::dashboard_api::DashboardApi;
use crate::application::entries_service::EntriesService;
use crate::application::live_board::LiveBoard;
use crate::application::overview_service::OverviewService;
use crate::application::realtime_client::{RealtimeClient, ReconnectPolicy};
use crate::application::session_service::SessionService;
use crate::application::site_directory::SiteDirectory;
use crate::application::user_service::UserService;
use crate::domain::session::Session;
use crate::infrastructure::config::load_app_config;
use crate::infrastructure::http_api::HttpDashboardApi;
use crate::infrastructure::token_store::TokenStore;
use crate::infrastructure::websocket_connector::WebSocketConnector;
use crate::presentation::app_state::AppState;
use crate::presentation::handlers::{
    alerts, create_user, current_session, entries, health_check, live, login, logout, overview,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Load configuration
    let config = load_app_config()?;

    // Session shared by the API client and the push channel
    let session = Session::default();
    let store = TokenStore::new(&config.session.token_file);

    // Create adapters (infrastructure layer)
    let api: Arc<dyn DashboardApi> = Arc::new(HttpDashboardApi::new(
        config.api.base_url.clone(),
        config.api.timeout(),
        session.clone(),
    )?);
    let connector = Arc::new(WebSocketConnector::new(
        &config.realtime.url,
        config.realtime.connect_timeout(),
    ));
    let realtime = RealtimeClient::new(
        connector,
        session.clone(),
        ReconnectPolicy {
            attempts: config.realtime.reconnect_attempts,
            delay: config.realtime.reconnect_delay(),
        },
    );

    // Create services (application layer)
    let live_board = LiveBoard::new();
    live_board.attach(&realtime);

    let sites = SiteDirectory::new(api.clone(), config.api.site_id.clone());
    let overview_service = OverviewService::new(api.clone(), sites.clone(), live_board.clone());
    let entries_service = EntriesService::new(api.clone(), sites.clone());
    let user_service = UserService::new(api.clone());

    let session_service = {
        let board = live_board.clone();
        let overview = overview_service.clone();
        let entries = entries_service.clone();
        SessionService::new(api, session, store.clone(), realtime.clone()).on_session_end(Arc::new(
            move || {
                board.clear();
                overview.reset();
                entries.reset();
                let sites = sites.clone();
                tokio::spawn(async move { sites.forget().await });
            },
        ))
    };

    if session_service.restore() {
        tracing::info!("Resumed session from {}", store.path().display());
    }

    // Create application state
    let state = Arc::new(AppState {
        sessions: session_service,
        overview: overview_service,
        entries: entries_service,
        users: user_service,
        live: live_board,
        realtime,
    });

    // Build router (presentation layer)
    // Note: We handle compression manually in our response builders,
    // so we don't use CompressionLayer to avoid double compression
    let router = Router::new()
        .route("/healthz", get(health_check))
        .route("/session", get(current_session).post(login).delete(logout))
        .route("/overview", get(overview))
        .route("/entries", get(entries))
        .route("/users", post(create_user))
        .route("/alerts", get(alerts))
        .route("/live", get(live))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    // Start server
    let addr: SocketAddr = config.server.bind.parse()?;
    tracing::info!("Starting crowd-dashboard service on {}", addr);

    axum::serve(tokio::net::TcpListener::bind(addr).await?, router).await?;

    Ok(())
}
