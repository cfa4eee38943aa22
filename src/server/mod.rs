//! HTTP surface of the speech service.
//!
//! One POST endpoint does the work; a health route reports liveness.

mod routes;
mod speech;

pub use routes::create_router;
pub use speech::AppState;
