//! Background Tasks Module
//!
//! Tasks that run periodically while the service is up.
//!
//! # Tasks
//! - Fast-layer sweep: drops expired in-memory entries at a configured interval

mod sweep;

pub use sweep::spawn_sweep_task;
