// Domain layer - Pure models and display arithmetic
pub mod alert;
pub mod analytics;
pub mod demographics;
pub mod gender;
pub mod series;
pub mod session;
pub mod trend;
pub mod user;
