//! Property-based tests for proposal lifecycle
//!
//! Tests for:
//! - Exactly one lifecycle state holds at any instant
//! - Client-side gates agree with the derived state
//! - Executed never reverts across refreshes

use super::proposal::{Proposal, ProposalState};
use super::vote::VoteChoice;
use crate::contracts::abi::U256;
use crate::session::SessionState;
use proptest::prelude::*;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

fn at(secs: u64) -> SystemTime {
    UNIX_EPOCH + Duration::from_secs(secs)
}

fn proposal(id: u64, deadline: u64, yay: u64, nay: u64, executed: bool) -> Proposal {
    Proposal {
        id,
        target_token_id: U256::from(id),
        deadline: at(deadline),
        yay_votes: yay,
        nay_votes: nay,
        executed,
    }
}

proptest! {
    /// State follows the executed flag first, then the deadline
    #[test]
    fn prop_state_is_determined(
        deadline in 0u64..1_000_000,
        now in 0u64..1_000_000,
        executed in any::<bool>(),
    ) {
        let p = proposal(0, deadline, 0, 0, executed);
        let expected = if executed {
            ProposalState::Closed
        } else if now < deadline {
            ProposalState::Open
        } else {
            ProposalState::DecidedPendingExecution
        };
        prop_assert_eq!(p.state_at(at(now)), expected);
    }

    /// Vote is allowed only while open, execute only once decided
    #[test]
    fn prop_gates_match_state(
        deadline in 0u64..1_000_000,
        now in 0u64..1_000_000,
        executed in any::<bool>(),
    ) {
        let p = proposal(0, deadline, 0, 0, executed);
        let state = p.state_at(at(now));
        prop_assert_eq!(p.check_vote(at(now)).is_ok(), state == ProposalState::Open);
        prop_assert_eq!(
            p.check_execute(at(now)).is_ok(),
            state == ProposalState::DecidedPendingExecution
        );
        prop_assert!(!(p.check_vote(at(now)).is_ok() && p.check_execute(at(now)).is_ok()));
    }

    /// YAY only on a strict majority
    #[test]
    fn prop_projected_outcome(yay in 0u64..1_000, nay in 0u64..1_000) {
        let p = proposal(0, 0, yay, nay, false);
        let expected = if yay > nay { VoteChoice::Yay } else { VoteChoice::Nay };
        prop_assert_eq!(p.projected_outcome(), expected);
    }

    /// Once seen executed, a proposal stays executed
    #[test]
    fn prop_executed_is_monotonic(
        first in proptest::collection::vec(any::<bool>(), 0..20),
        second in proptest::collection::vec(any::<bool>(), 0..20),
    ) {
        let mut session = SessionState::new();
        let build = |flags: &[bool]| -> Vec<Proposal> {
            flags
                .iter()
                .enumerate()
                .map(|(i, executed)| proposal(i as u64, 100, 0, 0, *executed))
                .collect()
        };

        session.replace_proposals(build(&first));
        session.replace_proposals(build(&second));

        prop_assert_eq!(session.proposal_count(), second.len() as u64);
        for (i, executed) in second.iter().enumerate() {
            let seen_before = first.get(i).copied().unwrap_or(false);
            let p = session.proposal(i as u64).unwrap();
            prop_assert_eq!(p.executed, *executed || seen_before);
        }
    }
}
