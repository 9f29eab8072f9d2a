//! Proposal records and their derived lifecycle state.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::SystemTime;

use super::vote::VoteChoice;
use crate::contracts::abi::U256;
use crate::contracts::RawProposal;
use crate::error::{GovernanceError, GovernanceResult};

/// A governance proposal as reconstructed from the contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proposal {
    /// 0-based ordinal assigned by the contract.
    pub id: u64,
    /// Asset the proposal concerns; a `uint256`, written as a decimal string.
    #[serde(with = "decimal_u256")]
    pub target_token_id: U256,
    #[serde(with = "unix_seconds")]
    pub deadline: SystemTime,
    pub yay_votes: u64,
    pub nay_votes: u64,
    pub executed: bool,
}

/// Lifecycle state, derived at read time and never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProposalState {
    /// Voting window still open.
    Open,
    /// Deadline passed, waiting for someone to execute.
    DecidedPendingExecution,
    /// Executed; terminal.
    Closed,
}

impl fmt::Display for ProposalState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Open => write!(f, "open"),
            Self::DecidedPendingExecution => write!(f, "awaiting execution"),
            Self::Closed => write!(f, "executed"),
        }
    }
}

impl Proposal {
    /// Rebuild a proposal from the contract getter's fields.
    ///
    /// A deadline past what `SystemTime` can hold is a read error.
    pub fn from_raw(id: u64, raw: RawProposal) -> GovernanceResult<Self> {
        let deadline = unix_seconds::from_secs(raw.deadline).ok_or_else(|| {
            GovernanceError::RemoteReadError(format!(
                "proposal {} deadline {} is out of range",
                id, raw.deadline
            ))
        })?;
        Ok(Self {
            id,
            target_token_id: raw.nft_token_id,
            deadline,
            yay_votes: raw.yay_votes,
            nay_votes: raw.nay_votes,
            executed: raw.executed,
        })
    }

    pub fn state_at(&self, now: SystemTime) -> ProposalState {
        if self.executed {
            ProposalState::Closed
        } else if now < self.deadline {
            ProposalState::Open
        } else {
            ProposalState::DecidedPendingExecution
        }
    }

    /// Branch the contract will take on execution. Ties go to NAY.
    ///
    /// Display only: the contract decides, the client never chooses.
    pub fn projected_outcome(&self) -> VoteChoice {
        if self.yay_votes > self.nay_votes {
            VoteChoice::Yay
        } else {
            VoteChoice::Nay
        }
    }

    /// Client-side gate for voting.
    pub fn check_vote(&self, now: SystemTime) -> GovernanceResult<()> {
        match self.state_at(now) {
            ProposalState::Open => Ok(()),
            state => Err(GovernanceError::ActionNotPermitted(format!(
                "proposal {} is {}, voting is closed",
                self.id, state
            ))),
        }
    }

    /// Client-side gate for execution.
    pub fn check_execute(&self, now: SystemTime) -> GovernanceResult<()> {
        match self.state_at(now) {
            ProposalState::DecidedPendingExecution => Ok(()),
            state => Err(GovernanceError::ActionNotPermitted(format!(
                "proposal {} is {}, it cannot be executed",
                self.id, state
            ))),
        }
    }

    pub fn deadline_secs(&self) -> u64 {
        unix_seconds::to_secs(self.deadline)
    }
}

/// `SystemTime` as whole seconds since the Unix epoch.
pub mod unix_seconds {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::{Duration, SystemTime, UNIX_EPOCH};

    pub fn from_secs(secs: u64) -> Option<SystemTime> {
        UNIX_EPOCH.checked_add(Duration::from_secs(secs))
    }

    pub fn to_secs(time: SystemTime) -> u64 {
        time.duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0)
    }

    pub fn serialize<S: Serializer>(time: &SystemTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(to_secs(*time))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<SystemTime, D::Error> {
        let secs = u64::deserialize(deserializer)?;
        from_secs(secs)
            .ok_or_else(|| serde::de::Error::custom(format!("timestamp {} is out of range", secs)))
    }
}

/// `U256` as a decimal string, so JSON consumers never lose precision.
pub mod decimal_u256 {
    use serde::{Deserialize, Deserializer, Serializer};

    use crate::contracts::abi::U256;

    pub fn serialize<S: Serializer>(value: &U256, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(value)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<U256, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse::<U256>()
            .map_err(|e| serde::de::Error::custom(format!("invalid token id '{}': {}", text, e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, UNIX_EPOCH};

    fn proposal(deadline: SystemTime, yay: u64, nay: u64, executed: bool) -> Proposal {
        Proposal {
            id: 2,
            target_token_id: U256::from(7u64),
            deadline,
            yay_votes: yay,
            nay_votes: nay,
            executed,
        }
    }

    #[test]
    fn test_from_raw_converts_deadline() {
        let raw = RawProposal {
            nft_token_id: U256::from(9u64),
            deadline: 1_650_000_000,
            yay_votes: 3,
            nay_votes: 1,
            executed: false,
        };
        let p = Proposal::from_raw(4, raw).unwrap();
        assert_eq!(p.id, 4);
        assert_eq!(p.target_token_id, U256::from(9u64));
        assert_eq!(p.deadline, UNIX_EPOCH + Duration::from_secs(1_650_000_000));
        assert_eq!(p.deadline_secs(), 1_650_000_000);
    }

    #[test]
    fn test_from_raw_rejects_unrepresentable_deadline() {
        let raw = RawProposal {
            nft_token_id: U256::from(9u64),
            deadline: u64::MAX,
            yay_votes: 0,
            nay_votes: 0,
            executed: false,
        };
        match Proposal::from_raw(5, raw) {
            Err(GovernanceError::RemoteReadError(msg)) => {
                assert!(msg.contains("proposal 5 deadline"));
            }
            other => panic!("Expected RemoteReadError, got {:?}", other),
        }
    }

    #[test]
    fn test_future_deadline_is_open() {
        let now = SystemTime::now();
        let p = proposal(now + Duration::from_secs(3600), 3, 1, false);

        assert_eq!(p.state_at(now), ProposalState::Open);
        assert!(p.check_vote(now).is_ok());
        assert!(matches!(
            p.check_execute(now),
            Err(GovernanceError::ActionNotPermitted(_))
        ));
    }

    #[test]
    fn test_past_deadline_awaits_execution() {
        let now = SystemTime::now();
        let p = proposal(now - Duration::from_secs(3600), 3, 1, false);

        assert_eq!(p.state_at(now), ProposalState::DecidedPendingExecution);
        assert!(p.check_execute(now).is_ok());
        assert!(p.check_vote(now).is_err());
        assert_eq!(p.projected_outcome(), VoteChoice::Yay);
    }

    #[test]
    fn test_deadline_instant_is_decided() {
        let now = SystemTime::now();
        let p = proposal(now, 0, 0, false);
        assert_eq!(p.state_at(now), ProposalState::DecidedPendingExecution);
    }

    #[test]
    fn test_executed_is_closed_regardless_of_deadline() {
        let now = SystemTime::now();
        let p = proposal(now + Duration::from_secs(60), 0, 0, true);
        assert_eq!(p.state_at(now), ProposalState::Closed);
        assert!(p.check_vote(now).is_err());
        assert!(p.check_execute(now).is_err());
    }

    #[test]
    fn test_tie_projects_nay() {
        let p = proposal(SystemTime::now(), 2, 2, false);
        assert_eq!(p.projected_outcome(), VoteChoice::Nay);
    }

    #[test]
    fn test_json_deadline_in_seconds() {
        let p = proposal(UNIX_EPOCH + Duration::from_secs(1_700_000_000), 1, 0, false);
        let json = serde_json::to_value(&p).unwrap();
        assert_eq!(json["deadline"], 1_700_000_000u64);
        assert_eq!(json["target_token_id"], "7");
        let back: Proposal = serde_json::from_value(json).unwrap();
        assert_eq!(back, p);
    }

    #[test]
    fn test_json_rejects_out_of_range_deadline() {
        let mut json = serde_json::to_value(proposal(UNIX_EPOCH, 0, 0, false)).unwrap();
        json["deadline"] = serde_json::json!(u64::MAX);
        let err = serde_json::from_value::<Proposal>(json).unwrap_err();
        assert!(err.to_string().contains("out of range"));
    }

    #[test]
    fn test_json_token_id_keeps_full_width() {
        let mut p = proposal(UNIX_EPOCH, 0, 0, false);
        p.target_token_id = U256::MAX;
        let json = serde_json::to_value(&p).unwrap();
        assert_eq!(json["target_token_id"], U256::MAX.to_string());
        let back: Proposal = serde_json::from_value(json).unwrap();
        assert_eq!(back.target_token_id, U256::MAX);
    }
}
