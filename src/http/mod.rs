//! Read-only HTTP status API
//!
//! - GET /health - Health check
//! - GET /session/status - Live session state, roster, and timeframes
//! - GET /session/artifact - Recording path and speaker timeframes once the
//!   session has terminated

mod handlers;
mod routes;
mod state;

pub use routes::create_router;
pub use state::AppState;
