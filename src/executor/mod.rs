//! Test execution engine
//!
//! Schedules execution units onto a bounded worker pool, keeps blocker
//! groups mutually exclusive and times out units that stop producing output.

mod lock;
mod monitor;
mod scheduler;

pub use scheduler::{Scheduler, SchedulerConfig};
