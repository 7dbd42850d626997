//! Background Tasks Module
//!
//! Schedulers that invoke a cache's maintenance routine at a fixed interval.
//!
//! # Tasks
//! - Maintenance: replays event logs, evicts over-capacity keys and sweeps
//!   expired entries until the cache asks to stop

mod maintenance;

pub use maintenance::{spawn_maintenance_task, spawn_maintenance_thread, Maintain};
