//! HTTP API.
//!
//! Thin glue over the session manager: JSON in, JSON out, with a uniform
//! `{"error": {"code", "message"}}` envelope on failure.

mod error;
mod handlers;
mod routes;
mod state;

pub use error::ApiError;
pub use routes::create_router;
pub use state::AppState;
