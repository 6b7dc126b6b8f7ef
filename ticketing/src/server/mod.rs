//! HTTP server module for the ticketing service.
//!
//! - Application state shared by handlers
//! - Health and readiness endpoints
//! - Router configuration

pub mod health;
pub mod routes;
pub mod state;

pub use health::{health_check, readiness_check};
pub use routes::build_router;
pub use state::AppState;
