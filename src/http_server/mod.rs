//! # HTTP Server
//!
//! Axum surface over the workflow hooks.
//!
//! # Endpoints
//!
//! - `GET /health` - Health check
//! - `GET /metrics` - Engine counters
//! - `POST /validation-requests/:id/status` - Request status change
//! - `POST /validation-requests/:id/decline` - Decline (CANCELLED)
//! - `POST /validation-requests/:id/approve` - Strict approval
//! - `POST /versions/:id/activate` - Manual activation
//! - `GET /versions/:id` - Version and status
//! - `GET /versions/:id/audit` - Version audit trail

pub mod config;
pub mod routes;
pub mod server;

pub use config::HttpServerConfig;
pub use routes::{actor_from_headers, status_routes, ErrorResponse, SharedHooks};
pub use server::HttpServer;
