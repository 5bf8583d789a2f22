// Application layer - Use cases and the seams they depend on
pub mod dashboard_api;
pub mod entries_service;
pub mod live_board;
pub mod overview_service;
pub mod push_channel;
pub mod realtime_client;
pub mod session_service;
pub mod site_directory;
pub mod user_service;
pub mod view_state;
