//! Data models for unit execution
//!
//! This module contains the execution unit state record and the value
//! types shared by the feeder pipeline, the executor and the aggregator.

mod outcome;
mod parameters;
mod task;
mod unit;

pub use outcome::{Outcome, OutcomeCounts, Resolution, UnitError};
pub use parameters::{ParameterArray, ParameterRow};
pub use task::{CancelSignal, Cancelled, TaskHandle};
pub use unit::{ExecutionUnit, UnitId};
