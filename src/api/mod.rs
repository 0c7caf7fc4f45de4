//! HTTP API.
//!
//! ## Endpoints
//!
//! - `POST /api/tasks` - Create a task
//! - `GET /api/tasks` - List tasks, newest first
//! - `GET /api/tasks/{taskId}` - Get one task
//! - `POST /api/tasks/{taskId}/execute` - Start executing a task
//! - `GET /health` - Health check (reports document-store connectivity)

mod error;
mod routes;
pub mod types;

pub use error::ApiError;
pub use routes::{serve, AppState};
