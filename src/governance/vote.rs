//! Vote choices and their wire encoding.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A member's vote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum VoteChoice {
    Yay,
    Nay,
}

impl VoteChoice {
    /// Code expected by `voteOnProposal`. Fixed by the deployed contract.
    pub fn encode(self) -> u8 {
        match self {
            Self::Yay => 0,
            Self::Nay => 1,
        }
    }
}

impl fmt::Display for VoteChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Yay => write!(f, "YAY"),
            Self::Nay => write!(f, "NAY"),
        }
    }
}

impl FromStr for VoteChoice {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "yay" => Ok(Self::Yay),
            "nay" => Ok(Self::Nay),
            _ => Err(format!("Invalid vote '{}'. Use 'yay' or 'nay'.", s)),
        }
    }
}
