// Application state for HTTP handlers
use crate::application::entries_service::EntriesService;
use crate::application::live_board::LiveBoard;
use crate::application::overview_service::OverviewService;
use crate::application::realtime_client::RealtimeClient;
use crate::application::session_service::SessionService;
use crate::application::user_service::UserService;

#[derive(Clone)]
pub struct AppState {
    pub sessions: SessionService,
    pub overview: OverviewService,
    pub entries: EntriesService,
    pub users: UserService,
    pub live: LiveBoard,
    pub realtime: RealtimeClient,
}
