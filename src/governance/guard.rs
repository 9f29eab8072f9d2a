//! Mutual exclusion for state-mutating operations.
//!
//! At most one create and at most one vote/execute per proposal id may be in
//! flight through workflows that share a guard.

use std::collections::HashSet;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::error::{GovernanceError, GovernanceResult};

/// What an in-flight operation targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKey {
    CreateProposal,
    Proposal(u64),
}

impl fmt::Display for OperationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CreateProposal => write!(f, "proposal creation"),
            Self::Proposal(id) => write!(f, "proposal {}", id),
        }
    }
}

/// Shared set of in-flight operation keys.
#[derive(Debug, Clone, Default)]
pub struct InFlightGuard {
    active: Arc<Mutex<HashSet<OperationKey>>>,
}

impl InFlightGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim `key`, or fail with `OperationInFlight` if it is already held.
    pub fn try_acquire(&self, key: OperationKey) -> GovernanceResult<InFlightTicket> {
        if !lock(&self.active).insert(key) {
            return Err(GovernanceError::OperationInFlight(key.to_string()));
        }
        Ok(InFlightTicket {
            key,
            active: self.active.clone(),
        })
    }

    pub fn is_active(&self, key: OperationKey) -> bool {
        lock(&self.active).contains(&key)
    }
}

/// Releases its key on drop.
#[derive(Debug)]
pub struct InFlightTicket {
    key: OperationKey,
    active: Arc<Mutex<HashSet<OperationKey>>>,
}

impl Drop for InFlightTicket {
    fn drop(&mut self) {
        lock(&self.active).remove(&self.key);
    }
}

// The set stays consistent even if a holder panicked.
fn lock(active: &Mutex<HashSet<OperationKey>>) -> MutexGuard<'_, HashSet<OperationKey>> {
    active.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_acquire_fails() {
        let guard = InFlightGuard::new();
        let _ticket = guard.try_acquire(OperationKey::Proposal(3)).unwrap();

        let err = guard.try_acquire(OperationKey::Proposal(3)).unwrap_err();
        assert_eq!(
            err,
            GovernanceError::OperationInFlight("proposal 3".to_string())
        );
    }

    #[test]
    fn test_different_keys_are_independent() {
        let guard = InFlightGuard::new();
        let _a = guard.try_acquire(OperationKey::Proposal(1)).unwrap();
        let _b = guard.try_acquire(OperationKey::Proposal(2)).unwrap();
        let _c = guard.try_acquire(OperationKey::CreateProposal).unwrap();
        assert!(guard.is_active(OperationKey::CreateProposal));
    }

    #[test]
    fn test_drop_releases() {
        let guard = InFlightGuard::new();
        {
            let _ticket = guard.try_acquire(OperationKey::CreateProposal).unwrap();
            assert!(guard.is_active(OperationKey::CreateProposal));
        }
        assert!(!guard.is_active(OperationKey::CreateProposal));
        assert!(guard.try_acquire(OperationKey::CreateProposal).is_ok());
    }

    #[test]
    fn test_clones_share_state() {
        let guard = InFlightGuard::new();
        let other = guard.clone();
        let _ticket = guard.try_acquire(OperationKey::Proposal(0)).unwrap();
        assert!(other.try_acquire(OperationKey::Proposal(0)).is_err());
    }
}
