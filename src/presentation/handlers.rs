// HTTP request handlers
use crate::application::dashboard_api::ApiError;
use crate::application::entries_service::{EntriesRequest, DEFAULT_PAGE_SIZE};
use crate::application::realtime_client::ConnectionState;
use crate::application::session_service::login_failure_message;
use crate::application::user_service::CreateUserError;
use crate::domain::user::UserForm;
use crate::infrastructure::http_response::{accepts_brotli, json_response};
use crate::infrastructure::live_stream::stream_from_receiver;
use crate::presentation::app_state::AppState;
use axum::{
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Deserialize)]
pub struct DateQuery {
    pub date: Option<NaiveDate>,
}

#[derive(Deserialize)]
pub struct EntriesQuery {
    pub date: Option<NaiveDate>,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

#[derive(Serialize)]
struct SessionStatus {
    authenticated: bool,
    realtime: ConnectionState,
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
}

#[derive(Serialize)]
struct MessageBody {
    message: String,
}

async fn respond<T: Serialize>(status: StatusCode, data: &T, headers: &HeaderMap) -> Response {
    match json_response(status, data, accepts_brotli(headers)).await {
        Ok(response) => response,
        Err(status) => status.into_response(),
    }
}

async fn error(status: StatusCode, message: &str, headers: &HeaderMap) -> Response {
    respond(status, &ErrorBody { error: message }, headers).await
}

async fn not_logged_in(headers: &HeaderMap) -> Response {
    error(StatusCode::UNAUTHORIZED, "Please login to continue.", headers).await
}

fn api_status(e: &ApiError) -> StatusCode {
    match e {
        ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
        ApiError::Status { status, .. } => *status,
        ApiError::Request(_) | ApiError::Decode(_) => StatusCode::BAD_GATEWAY,
    }
}

fn session_status(state: &AppState) -> SessionStatus {
    SessionStatus {
        authenticated: state.sessions.is_authenticated(),
        realtime: state.realtime.state(),
    }
}

/// Health check endpoint
pub async fn health_check() -> &'static str {
    "ok"
}

pub async fn current_session(headers: HeaderMap, State(state): State<Arc<AppState>>) -> Response {
    respond(StatusCode::OK, &session_status(&state), &headers).await
}

pub async fn login(
    headers: HeaderMap,
    State(state): State<Arc<AppState>>,
    Json(request): Json<LoginRequest>,
) -> Response {
    if request.email.trim().is_empty() || request.password.is_empty() {
        return error(StatusCode::UNPROCESSABLE_ENTITY, "Please fill in all fields.", &headers).await;
    }

    match state.sessions.login(request.email.trim(), &request.password).await {
        Ok(()) => respond(StatusCode::OK, &session_status(&state), &headers).await,
        Err(e) => {
            tracing::warn!("Login failed for {}: {}", request.email, e);
            error(StatusCode::UNAUTHORIZED, &login_failure_message(&e), &headers).await
        }
    }
}

pub async fn logout(State(state): State<Arc<AppState>>) -> StatusCode {
    state.sessions.logout();
    StatusCode::NO_CONTENT
}

/// KPIs, trends and charts for `?date=YYYY-MM-DD` (today when omitted)
pub async fn overview(
    Query(query): Query<DateQuery>,
    headers: HeaderMap,
    State(state): State<Arc<AppState>>,
) -> Response {
    if !state.sessions.is_authenticated() {
        return not_logged_in(&headers).await;
    }

    let now = Utc::now();
    let date = query.date.unwrap_or_else(|| now.date_naive());

    match state.sessions.guard(state.overview.load(date, now).await) {
        Ok(view) => respond(StatusCode::OK, &view, &headers).await,
        Err(e) => error(api_status(&e), &e.to_string(), &headers).await,
    }
}

/// One page of the entry/exit table
pub async fn entries(
    Query(query): Query<EntriesQuery>,
    headers: HeaderMap,
    State(state): State<Arc<AppState>>,
) -> Response {
    if !state.sessions.is_authenticated() {
        return not_logged_in(&headers).await;
    }

    let now = Utc::now();
    let request = EntriesRequest {
        date: query.date.unwrap_or_else(|| now.date_naive()),
        page: query.page.unwrap_or(1),
        page_size: query.page_size.unwrap_or(DEFAULT_PAGE_SIZE),
    };

    match state.sessions.guard(state.entries.load(request, now).await) {
        Ok(view) => respond(StatusCode::OK, &view, &headers).await,
        Err(e) => error(api_status(&e), &e.to_string(), &headers).await,
    }
}

pub async fn create_user(
    headers: HeaderMap,
    State(state): State<Arc<AppState>>,
    Json(form): Json<UserForm>,
) -> Response {
    if !state.sessions.is_authenticated() {
        return not_logged_in(&headers).await;
    }

    match state.users.create_user(&form).await {
        Ok(message) => respond(StatusCode::CREATED, &MessageBody { message }, &headers).await,
        Err(CreateUserError::Invalid(e)) => {
            error(StatusCode::UNPROCESSABLE_ENTITY, &e.to_string(), &headers).await
        }
        Err(CreateUserError::Api(e)) => {
            state.sessions.check(&e);
            error(api_status(&e), &e.to_string(), &headers).await
        }
    }
}

/// Most recent alerts, newest first
pub async fn alerts(headers: HeaderMap, State(state): State<Arc<AppState>>) -> Response {
    if !state.sessions.is_authenticated() {
        return not_logged_in(&headers).await;
    }

    respond(StatusCode::OK, &state.live.alerts(), &headers).await
}

/// Stream live occupancy and alert events as NDJSON
pub async fn live(headers: HeaderMap, State(state): State<Arc<AppState>>) -> Response {
    if !state.sessions.is_authenticated() {
        return not_logged_in(&headers).await;
    }

    stream_from_receiver(state.live.follow()).into_response()
}
