//! Background Tasks Module
//!
//! Contains background tasks that run for the lifetime of the cache manager.
//!
//! # Tasks
//! - Fallback sweep: removes expired fallback entries at configured intervals

mod sweep;

pub use sweep::spawn_sweep_task;
