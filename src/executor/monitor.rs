//! Heartbeat watchdog
//!
//! A single background loop ticks every running unit. Output recorded by a
//! unit resets its health; a unit silent for longer than its timeout is
//! cancelled, failed and stripped of its blocker-group lock.

use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use super::lock::LockCoordinator;
use crate::models::{ExecutionUnit, UnitId};

/// Periodic liveness checker for a batch of units
pub struct HeartbeatMonitor {
    tick_interval: Duration,
    units: Vec<Arc<ExecutionUnit>>,
    coordinator: Arc<LockCoordinator>,
}

impl HeartbeatMonitor {
    pub fn new(
        tick_interval: Duration,
        units: Vec<Arc<ExecutionUnit>>,
        coordinator: Arc<LockCoordinator>,
    ) -> Self {
        Self {
            tick_interval,
            units,
            coordinator,
        }
    }

    /// Run the loop on its own task
    pub fn spawn(self) -> JoinHandle<Vec<UnitId>> {
        tokio::spawn(self.run())
    }

    /// Tick until every unit is resolved; returns the units timed out
    pub async fn run(self) -> Vec<UnitId> {
        let mut interval = tokio::time::interval(self.tick_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately
        interval.tick().await;

        let mut timed_out = Vec::new();
        while !self.all_resolved() {
            interval.tick().await;
            timed_out.extend(self.tick_once());
        }

        info!(
            "Heartbeat monitor stopped, {} unit(s) timed out",
            timed_out.len()
        );
        timed_out
    }

    /// One pass over all running units
    pub fn tick_once(&self) -> Vec<UnitId> {
        let mut timed_out = Vec::new();
        for unit in &self.units {
            if !unit.is_running() || unit.is_resolved() {
                continue;
            }
            unit.timeout_tick();
            if unit.is_stalled(self.tick_interval) && self.time_out(unit) {
                timed_out.push(unit.id().clone());
            }
        }
        timed_out
    }

    fn time_out(&self, unit: &ExecutionUnit) -> bool {
        let message = format!("no output for {:?}", unit.timeout());
        if unit.resolve_timeout(&message).is_err() {
            // The worker resolved it in the meantime
            debug!("{} finished before the timeout took effect", unit.id());
            return false;
        }
        warn!("Unit {} timed out: {}", unit.id(), message);
        unit.record_output(format!("Execution timed out: {message}"));
        unit.request_cancel();
        if let Err(e) = unit.mark_executed() {
            debug!("{}", e);
        }
        self.coordinator.release(unit);
        true
    }

    fn all_resolved(&self) -> bool {
        self.units.iter().all(|u| u.is_resolved())
    }
}
