//! Outcome of a whole batch run

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use super::{AggregateResult, ResultAggregator};
use crate::models::{ExecutionUnit, Resolution, UnitId};

/// Final state and drained output of one unit
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct UnitReport {
    pub id: UnitId,
    pub script_name: String,
    pub script_id: String,
    pub original_line: String,
    pub resolution: Option<Resolution>,
    pub output: String,
}

impl UnitReport {
    /// Snapshot a unit, draining its output buffer
    pub fn collect(unit: &ExecutionUnit) -> Self {
        Self {
            id: unit.id().clone(),
            script_name: unit.script_name().to_string(),
            script_id: unit.script_id().to_string(),
            original_line: unit.original_line().to_string(),
            resolution: unit.resolution(),
            output: unit.drain_output(),
        }
    }
}

impl fmt::Display for UnitReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.resolution {
            Some(resolution) => write!(f, "{} {}", self.id, resolution),
            None => write!(f, "{} unresolved", self.id),
        }
    }
}

/// Everything a batch run produces
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BatchReport {
    pub aggregate: AggregateResult,
    pub elapsed_ms: u64,
    pub units: Vec<UnitReport>,
}

impl BatchReport {
    pub fn collect(units: &[Arc<ExecutionUnit>], elapsed: Duration) -> Self {
        let aggregate = ResultAggregator::aggregate(units);
        Self {
            aggregate,
            elapsed_ms: elapsed.as_millis() as u64,
            units: units.iter().map(|u| UnitReport::collect(u)).collect(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        Duration::from_millis(self.elapsed_ms)
    }

    pub fn unit(&self, id: &UnitId) -> Option<&UnitReport> {
        self.units.iter().find(|u| &u.id == id)
    }

    /// Number of distinct test classes in the batch
    pub fn class_count(&self) -> usize {
        let mut classes: Vec<_> = self.units.iter().map(|u| &u.id.class_name).collect();
        classes.sort();
        classes.dedup();
        classes.len()
    }
}
