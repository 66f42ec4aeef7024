//! Background Tasks Module
//!
//! Contains background tasks that run periodically during server operation.
//!
//! # Tasks
//! - TTL sweep: Removes expired in-memory entries, one task per tier

mod sweeper;

pub use sweeper::{spawn_sweep_task, spawn_sweep_tasks};
