//! Background Tasks Module
//!
//! Contains background tasks that run periodically during server operation.
//!
//! # Tasks
//! - Cache Cleanup: Purges expired cache entries and stale throttle windows

mod cleanup;

pub use cleanup::spawn_cleanup_task;
