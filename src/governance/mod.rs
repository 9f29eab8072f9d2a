//! Proposal lifecycle and governance actions.
//!
//! - Proposals are rebuilt from ledger reads, never advanced locally
//! - One fresh connection per operation
//! - Actions are gated client-side before anything is signed

pub mod guard;
pub mod proposal;
pub mod repository;
pub mod vote;
pub mod workflow;

#[cfg(test)]
mod proptests;

use std::sync::Arc;
use std::time::SystemTime;

pub use guard::{InFlightGuard, InFlightTicket, OperationKey};
pub use proposal::{Proposal, ProposalState};
pub use repository::ProposalRepository;
pub use vote::VoteChoice;
pub use workflow::GovernanceWorkflow;

/// Source of "now" for lifecycle checks.
pub type Clock = Arc<dyn Fn() -> SystemTime + Send + Sync>;

pub fn system_clock() -> Clock {
    Arc::new(SystemTime::now)
}
