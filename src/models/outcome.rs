//! Terminal outcomes and lock states of an execution unit
//!
//! Defines the tagged outcome a unit resolves to, the derived counters,
//! and the monotonic lock state machine.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Errors raised by misuse of an execution unit
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UnitError {
    #[error("Unit {unit} is already resolved as {existing}")]
    AlreadyResolved { unit: String, existing: Outcome },

    #[error("Unit {unit} cannot move from {from} to {to}")]
    InvalidLockTransition {
        unit: String,
        from: LockState,
        to: LockState,
    },
}

/// Terminal outcome of one execution unit
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Passed,
    Failed,
    NotApplicable,
    Dummy,
}

impl Outcome {
    pub fn symbol(&self) -> &'static str {
        match self {
            Outcome::Passed => "✓",
            Outcome::Failed => "✗",
            Outcome::NotApplicable => "○",
            Outcome::Dummy => "·",
        }
    }

    /// Parse the outcome words used in data rows
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "pass" | "passed" => Some(Outcome::Passed),
            "fail" | "failed" => Some(Outcome::Failed),
            "na" | "n/a" | "not_applicable" => Some(Outcome::NotApplicable),
            "dummy" => Some(Outcome::Dummy),
            _ => None,
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Passed => write!(f, "PASSED"),
            Outcome::Failed => write!(f, "FAILED"),
            Outcome::NotApplicable => write!(f, "N/A"),
            Outcome::Dummy => write!(f, "DUMMY"),
        }
    }
}

/// How a unit reached its terminal state
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    pub outcome: Outcome,
    /// Set when the heartbeat monitor forced the failure
    pub timed_out: bool,
    pub message: Option<String>,
}

impl Resolution {
    pub fn new(outcome: Outcome) -> Self {
        Self {
            outcome,
            timed_out: false,
            message: None,
        }
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self {
            outcome: Outcome::Failed,
            timed_out: true,
            message: Some(message.into()),
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.outcome.symbol(), self.outcome)?;
        if self.timed_out {
            write!(f, " (timeout)")?;
        }
        if let Some(msg) = &self.message {
            write!(f, " - {msg}")?;
        }
        Ok(())
    }
}

/// Terminal counters of a unit, or a sum of them
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutcomeCounts {
    pub passed: u32,
    pub failed: u32,
    pub na: u32,
    pub dummy: u32,
}

impl OutcomeCounts {
    pub fn of(outcome: Outcome) -> Self {
        let mut counts = Self::default();
        match outcome {
            Outcome::Passed => counts.passed = 1,
            Outcome::Failed => counts.failed = 1,
            Outcome::NotApplicable => counts.na = 1,
            Outcome::Dummy => counts.dummy = 1,
        }
        counts
    }

    pub fn runned(&self) -> u32 {
        self.passed + self.failed + self.na
    }

    pub fn total(&self) -> u32 {
        self.runned() + self.dummy
    }
}

impl std::ops::AddAssign for OutcomeCounts {
    fn add_assign(&mut self, other: Self) {
        self.passed += other.passed;
        self.failed += other.failed;
        self.na += other.na;
        self.dummy += other.dummy;
    }
}

/// Lock state of a unit; only ever moves forward
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum LockState {
    Unlocked = 0,
    Locked = 1,
    Executed = 2,
}

impl LockState {
    pub(crate) fn from_u8(v: u8) -> Self {
        match v {
            0 => LockState::Unlocked,
            1 => LockState::Locked,
            _ => LockState::Executed,
        }
    }
}

impl fmt::Display for LockState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LockState::Unlocked => write!(f, "UNLOCKED"),
            LockState::Locked => write!(f, "LOCKED"),
            LockState::Executed => write!(f, "EXECUTED"),
        }
    }
}
