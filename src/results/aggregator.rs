//! Read-only fold of unit outcomes into batch totals

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use crate::models::{ExecutionUnit, OutcomeCounts};

/// Totals over all units of a batch
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregateResult {
    pub runned: u32,
    pub passed: u32,
    pub failed: u32,
    pub na: u32,
    pub dummy: u32,
    /// Failed units whose failure was forced by the heartbeat monitor
    pub timed_out: u32,
    pub unresolved: u32,
}

impl AggregateResult {
    pub fn total(&self) -> u32 {
        self.runned + self.dummy + self.unresolved
    }

    pub fn pass_rate(&self) -> f64 {
        if self.runned == 0 {
            0.0
        } else {
            (self.passed as f64 / self.runned as f64) * 100.0
        }
    }

    pub fn is_all_passed(&self) -> bool {
        self.failed == 0 && self.unresolved == 0
    }
}

impl fmt::Display for AggregateResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Runned: {} | Passed: {} | Failed: {} | N/A: {} | Dummy: {}",
            self.runned, self.passed, self.failed, self.na, self.dummy
        )?;
        if self.timed_out > 0 {
            write!(f, " | Timed out: {}", self.timed_out)?;
        }
        Ok(())
    }
}

/// Summarizes terminal counters without touching the units
pub struct ResultAggregator;

impl ResultAggregator {
    pub fn aggregate(units: &[Arc<ExecutionUnit>]) -> AggregateResult {
        let mut counts = OutcomeCounts::default();
        let mut timed_out = 0;
        let mut unresolved = 0;

        for unit in units {
            match unit.resolution() {
                Some(resolution) => {
                    counts += OutcomeCounts::of(resolution.outcome);
                    if resolution.timed_out {
                        timed_out += 1;
                    }
                }
                None => unresolved += 1,
            }
        }

        AggregateResult {
            runned: counts.runned(),
            passed: counts.passed,
            failed: counts.failed,
            na: counts.na,
            dummy: counts.dummy,
            timed_out,
            unresolved,
        }
    }
}
