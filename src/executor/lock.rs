//! Blocker-group mutual exclusion
//!
//! Units tagged with the same blocker group never run at the same time.
//! A self-enabled blocker jumps ahead of ordinary peers waiting on its
//! group, but never takes a group somebody else holds. Ordinary peers may
//! starve while self-enabled blockers keep arriving.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use tokio::sync::Notify;
use tracing::debug;

use crate::models::{ExecutionUnit, UnitId};

/// Answer to a lock request
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LockDecision {
    Granted,
    /// Another unit holds the group
    Held { holder: UnitId },
    /// A waiting self-enabled blocker goes first
    Deferred { to: UnitId },
}

impl LockDecision {
    pub fn is_granted(&self) -> bool {
        matches!(self, LockDecision::Granted)
    }
}

impl fmt::Display for LockDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LockDecision::Granted => write!(f, "granted"),
            LockDecision::Held { holder } => write!(f, "held by {holder}"),
            LockDecision::Deferred { to } => write!(f, "deferred to {to}"),
        }
    }
}

#[derive(Debug)]
struct Waiter {
    id: UnitId,
    self_enabled: bool,
}

#[derive(Debug, Default)]
struct CoordinatorState {
    holders: HashMap<String, UnitId>,
    /// Registered but not yet granted, in submission order
    waiting: HashMap<String, Vec<Waiter>>,
}

/// Brokers blocker-group locks across the whole unit set
#[derive(Debug, Default)]
pub struct LockCoordinator {
    state: Mutex<CoordinatorState>,
    released: Notify,
}

impl LockCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Announce a unit that will ask for its group later
    pub fn register(&self, unit: &ExecutionUnit) {
        let Some(group) = unit.blocker() else {
            return;
        };
        self.state
            .lock()
            .waiting
            .entry(group.to_string())
            .or_default()
            .push(Waiter {
                id: unit.id().clone(),
                self_enabled: unit.is_self_enabled_blocker(),
            });
    }

    /// Grant or deny the unit's group without blocking
    pub fn try_acquire(&self, unit: &ExecutionUnit) -> LockDecision {
        let Some(group) = unit.blocker() else {
            return LockDecision::Granted;
        };
        let mut state = self.state.lock();

        if let Some(holder) = state.holders.get(group) {
            if holder == unit.id() {
                return LockDecision::Granted;
            }
            return LockDecision::Held {
                holder: holder.clone(),
            };
        }

        // First waiting self-enabled blocker of the group has priority
        let priority = state
            .waiting
            .get(group)
            .and_then(|w| w.iter().find(|w| w.self_enabled))
            .map(|w| w.id.clone());
        if let Some(first) = priority {
            if &first != unit.id() {
                return LockDecision::Deferred { to: first };
            }
        }

        state.holders.insert(group.to_string(), unit.id().clone());
        if let Some(waiting) = state.waiting.get_mut(group) {
            waiting.retain(|w| &w.id != unit.id());
        }
        debug!("Blocker group {} taken by {}", group, unit.id());
        LockDecision::Granted
    }

    /// Free the unit's group if it holds it, and wake the scheduler
    pub fn release(&self, unit: &ExecutionUnit) -> bool {
        let released = match unit.blocker() {
            Some(group) => {
                let mut state = self.state.lock();
                if let Some(waiting) = state.waiting.get_mut(group) {
                    waiting.retain(|w| &w.id != unit.id());
                }
                if state.holders.get(group) == Some(unit.id()) {
                    state.holders.remove(group);
                    debug!("Blocker group {} released by {}", group, unit.id());
                    true
                } else {
                    false
                }
            }
            None => false,
        };
        self.released.notify_one();
        released
    }

    /// Wait until some unit releases (stored if nobody was waiting)
    pub async fn wait_for_release(&self) {
        self.released.notified().await;
    }

    #[cfg(test)]
    pub fn holder(&self, group: &str) -> Option<UnitId> {
        self.state.lock().holders.get(group).cloned()
    }

    #[cfg(test)]
    pub fn held_groups(&self) -> usize {
        self.state.lock().holders.len()
    }
}
