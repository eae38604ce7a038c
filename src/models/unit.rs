//! Execution unit state
//!
//! One [`ExecutionUnit`] exists per (test class, resolved data row). It is
//! shared between the worker running it, the heartbeat monitor and the
//! scheduler, so every mutable field sits behind an atomic or a mutex.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicI64, AtomicU64, AtomicU8, Ordering};
use std::time::Duration;
use tracing::debug;

use super::outcome::{LockState, Outcome, OutcomeCounts, Resolution, UnitError};
use super::parameters::ParameterRow;
use super::task::TaskHandle;

const DEFAULT_SCRIPT_NAME: &str = "Unnamed test";
const DEFAULT_SCRIPT_ID: &str = "0.000";

/// Identity of a unit: test class plus data row
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UnitId {
    pub class_name: String,
    pub row: usize,
}

impl UnitId {
    pub fn new(class_name: impl Into<String>, row: usize) -> Self {
        Self {
            class_name: class_name.into(),
            row,
        }
    }
}

impl fmt::Display for UnitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.class_name, self.row)
    }
}

/// Per-run state record of one scheduled test unit
#[derive(Debug)]
pub struct ExecutionUnit {
    id: UnitId,
    script_name: String,
    script_id: String,
    test_url: Option<String>,
    parameters: ParameterRow,
    original_line: String,
    blocker: Option<String>,
    self_enabled_blocker: bool,
    timeout_ms: AtomicU64,
    lock: AtomicU8,
    /// 0 is healthy, negative counts monitor ticks since the last output
    health: AtomicI64,
    resolution: Mutex<Option<Resolution>>,
    task: Mutex<Option<TaskHandle>>,
    output: Mutex<String>,
}

impl ExecutionUnit {
    /// Create a unit for one resolved parameter row
    pub fn new(
        class_name: impl Into<String>,
        row: usize,
        parameters: ParameterRow,
        default_timeout: Duration,
    ) -> Self {
        let original_line = parameters.original_line();
        Self {
            id: UnitId::new(class_name, row),
            script_name: DEFAULT_SCRIPT_NAME.to_string(),
            script_id: DEFAULT_SCRIPT_ID.to_string(),
            test_url: None,
            parameters,
            original_line,
            blocker: None,
            self_enabled_blocker: false,
            timeout_ms: AtomicU64::new(duration_ms(default_timeout)),
            lock: AtomicU8::new(LockState::Unlocked as u8),
            health: AtomicI64::new(0),
            resolution: Mutex::new(None),
            task: Mutex::new(None),
            output: Mutex::new(String::new()),
        }
    }

    pub fn with_script(mut self, name: impl Into<String>, id: impl Into<String>) -> Self {
        self.script_name = name.into();
        self.script_id = id.into();
        self
    }

    pub fn with_test_url(mut self, url: impl Into<String>) -> Self {
        self.test_url = Some(url.into());
        self
    }

    pub fn with_blocker(mut self, group: impl Into<String>, self_enabled: bool) -> Self {
        self.blocker = Some(group.into());
        self.self_enabled_blocker = self_enabled;
        self
    }

    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.set_timeout(timeout);
        self
    }

    pub fn id(&self) -> &UnitId {
        &self.id
    }

    pub fn class_name(&self) -> &str {
        &self.id.class_name
    }

    pub fn row(&self) -> usize {
        self.id.row
    }

    pub fn script_name(&self) -> &str {
        &self.script_name
    }

    pub fn script_id(&self) -> &str {
        &self.script_id
    }

    pub fn test_url(&self) -> Option<&str> {
        self.test_url.as_deref()
    }

    pub fn parameters(&self) -> &ParameterRow {
        &self.parameters
    }

    pub fn original_line(&self) -> &str {
        &self.original_line
    }

    pub fn blocker(&self) -> Option<&str> {
        self.blocker.as_deref()
    }

    pub fn is_self_enabled_blocker(&self) -> bool {
        self.self_enabled_blocker
    }

    // Timeout handling

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms.load(Ordering::Relaxed))
    }

    pub fn set_timeout(&self, timeout: Duration) {
        self.timeout_ms.store(duration_ms(timeout), Ordering::Relaxed);
    }

    pub fn health(&self) -> i64 {
        self.health.load(Ordering::Acquire)
    }

    /// Liveness signal: the unit is healthy again
    pub fn tick(&self) {
        self.health.store(0, Ordering::Release);
    }

    /// One monitor tick without output; returns the new health
    pub fn timeout_tick(&self) -> i64 {
        self.health.fetch_sub(1, Ordering::AcqRel) - 1
    }

    /// Number of silent ticks after which the unit counts as stalled
    pub fn stall_threshold(&self, tick_interval: Duration) -> i64 {
        let tick_ms = duration_ms(tick_interval).max(1);
        let ticks = duration_ms(self.timeout()) / tick_ms;
        ticks.max(1) as i64
    }

    pub fn is_stalled(&self, tick_interval: Duration) -> bool {
        self.health() <= -self.stall_threshold(tick_interval)
    }

    // Lock handling

    pub fn lock_state(&self) -> LockState {
        LockState::from_u8(self.lock.load(Ordering::Acquire))
    }

    /// UNLOCKED -> LOCKED
    pub fn acquire_lock(&self) -> Result<(), UnitError> {
        self.transition(LockState::Unlocked, LockState::Locked)
    }

    /// LOCKED -> EXECUTED
    pub fn mark_executed(&self) -> Result<(), UnitError> {
        self.transition(LockState::Locked, LockState::Executed)
    }

    fn transition(&self, from: LockState, to: LockState) -> Result<(), UnitError> {
        self.lock
            .compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
            .map(|_| ())
            .map_err(|actual| UnitError::InvalidLockTransition {
                unit: self.id.to_string(),
                from: LockState::from_u8(actual),
                to,
            })
    }

    // Output buffer

    /// Append a line of diagnostic output; also counts as a heartbeat
    pub fn record_output(&self, message: impl AsRef<str>) {
        let message = message.as_ref();
        debug!(unit = %self.id, "{}", message);
        {
            let mut output = self.output.lock();
            output.push_str(message);
            output.push('\n');
        }
        self.tick();
    }

    /// Take everything buffered so far, leaving the buffer empty
    pub fn drain_output(&self) -> String {
        std::mem::take(&mut *self.output.lock())
    }

    // Terminal state

    pub fn resolve(&self, outcome: Outcome) -> Result<(), UnitError> {
        self.resolve_with(Resolution::new(outcome))
    }

    /// Force the failed-by-timeout state
    pub fn resolve_timeout(&self, message: impl Into<String>) -> Result<(), UnitError> {
        self.resolve_with(Resolution::timeout(message))
    }

    /// Set the terminal state; a second call is rejected
    pub fn resolve_with(&self, resolution: Resolution) -> Result<(), UnitError> {
        let mut slot = self.resolution.lock();
        if let Some(existing) = slot.as_ref() {
            return Err(UnitError::AlreadyResolved {
                unit: self.id.to_string(),
                existing: existing.outcome,
            });
        }
        *slot = Some(resolution);
        Ok(())
    }

    pub fn resolution(&self) -> Option<Resolution> {
        self.resolution.lock().clone()
    }

    pub fn is_resolved(&self) -> bool {
        self.resolution.lock().is_some()
    }

    /// Terminal counters; all zero while unresolved
    pub fn counts(&self) -> OutcomeCounts {
        self.resolution
            .lock()
            .as_ref()
            .map(|r| OutcomeCounts::of(r.outcome))
            .unwrap_or_default()
    }

    pub fn runned(&self) -> u32 {
        self.counts().runned()
    }

    // Task handle

    pub fn attach_task(&self, handle: TaskHandle) {
        *self.task.lock() = Some(handle);
    }

    /// Whether a task is attached and still reports running
    pub fn is_running(&self) -> bool {
        self.task
            .lock()
            .as_ref()
            .map(TaskHandle::is_running)
            .unwrap_or(false)
    }

    /// Ask the running task to stop; returns false when no task is attached
    pub fn request_cancel(&self) -> bool {
        match self.task.lock().as_ref() {
            Some(handle) => {
                handle.cancel();
                true
            }
            None => false,
        }
    }
}

impl fmt::Display for ExecutionUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} [{}] {} ({})",
            self.id,
            self.script_id,
            self.script_name,
            self.lock_state()
        )
    }
}

fn duration_ms(d: Duration) -> u64 {
    d.as_millis().min(u64::MAX as u128) as u64
}
