//! Timer utilities
//!
//! Wall-clock timing of the phases of one batch run.

use std::fmt;
use std::time::{Duration, Instant};

/// Stage of a batch run
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    Plan,
    Run,
    Report,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Plan => write!(f, "plan"),
            Phase::Run => write!(f, "run"),
            Phase::Report => write!(f, "report"),
        }
    }
}

/// Records when each phase finished, relative to construction
#[derive(Debug)]
pub struct PhaseTimer {
    started: Instant,
    marks: Vec<(Phase, Duration)>,
}

impl PhaseTimer {
    pub fn start() -> Self {
        Self {
            started: Instant::now(),
            marks: Vec::new(),
        }
    }

    /// Mark `phase` as finished now
    pub fn finish(&mut self, phase: Phase) {
        self.marks.push((phase, self.started.elapsed()));
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// How long each finished phase took on its own
    pub fn phases(&self) -> Vec<(Phase, Duration)> {
        let mut previous = Duration::ZERO;
        self.marks
            .iter()
            .map(|&(phase, at)| {
                let spent = at.saturating_sub(previous);
                previous = at;
                (phase, spent)
            })
            .collect()
    }
}

impl fmt::Display for PhaseTimer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (phase, spent) in self.phases() {
            write!(f, "{}: {}ms, ", phase, spent.as_millis())?;
        }
        write!(f, "total: {}ms", self.elapsed().as_millis())
    }
}
