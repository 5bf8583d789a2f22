// Infrastructure layer - External dependencies and adapters
pub mod config;
pub mod engine_io;
pub mod http_api;
pub mod http_response;
pub mod live_stream;
pub mod normalize;
pub mod token_store;
pub mod websocket_connector;
