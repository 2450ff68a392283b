//! Background Tasks Module
//!
//! Contains background tasks that run periodically while the gateway serves.
//!
//! # Tasks
//! - Durable sweep: removes expired and version-mismatched durable entries

mod cleanup;

pub use cleanup::spawn_cleanup_task;
