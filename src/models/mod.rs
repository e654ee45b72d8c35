//! Request and Response models for the cache service API
//!
//! DTOs used for serializing/deserializing HTTP request and response bodies.

pub mod requests;
pub mod responses;

// Re-export commonly used types
pub use requests::{
    ConnectionUpdate, FetchQuery, HistoryRequest, HoverRequest, KeyQuery, PrefetchRequest,
    SetRequest, MAX_KEY_LENGTH,
};
pub use responses::{
    ConnectionResponse, FetchResponse, HealthResponse, HistoryResponse, MessageResponse,
    PrefetchResponse, StatsResponse,
};
