//! API Module
//!
//! HTTP handlers and routing that expose the cache core to the app shell.
//!
//! # Endpoints
//! - `GET /fetch?url=` - Read-through cached fetch
//! - `PUT /set` - Store a value
//! - `DELETE /invalidate?key=` - Invalidate a key
//! - `DELETE /clear` - Clear everything
//! - `POST /prefetch[/hover|/history]` - Queue prefetches
//! - `GET|PUT /connection` - Connection quality signal
//! - `GET /stats` - Statistics
//! - `GET /health` - Health check endpoint

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
