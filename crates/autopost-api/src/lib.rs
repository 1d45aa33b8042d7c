//! HTTP status and trigger surface for the autopost pipeline.

pub mod config;
pub mod handlers;
pub mod metrics;
pub mod routes;
pub mod state;

pub use config::ApiConfig;
pub use routes::create_router;
pub use state::AppState;
