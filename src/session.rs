//! Process-local session state.
//!
//! Holds cached views of remote governance state plus UI flags. Fields are
//! only changed through the mutators below, each of which names the fields
//! it touches; the repository and workflow call them after successful
//! remote calls. Nothing here is persisted.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::time::SystemTime;

use crate::contracts::abi::format_ether;
use crate::governance::proposal::{Proposal, ProposalState};

/// Which view the user has selected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tab {
    CreateProposal,
    ViewProposals,
}

impl fmt::Display for Tab {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CreateProposal => write!(f, "Create Proposal"),
            Self::ViewProposals => write!(f, "View Proposals"),
        }
    }
}

/// Actions available on one proposal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PermittedActions {
    pub can_vote: bool,
    pub can_execute: bool,
}

/// Cached governance state for one session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionState {
    treasury_balance: u128,
    proposal_count: u64,
    membership_balance: u64,
    proposals: Vec<Proposal>,
    active_tab: Option<Tab>,
    pending_transaction: bool,
    connected: bool,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Governance contract balance in wei.
    pub fn treasury_balance(&self) -> u128 {
        self.treasury_balance
    }

    pub fn proposal_count(&self) -> u64 {
        self.proposal_count
    }

    pub fn membership_balance(&self) -> u64 {
        self.membership_balance
    }

    /// Cached proposals, ordered by id.
    pub fn proposals(&self) -> &[Proposal] {
        &self.proposals
    }

    pub fn proposal(&self, id: u64) -> Option<&Proposal> {
        self.proposals.iter().find(|p| p.id == id)
    }

    pub fn active_tab(&self) -> Option<Tab> {
        self.active_tab
    }

    pub fn pending_transaction(&self) -> bool {
        self.pending_transaction
    }

    pub fn connected(&self) -> bool {
        self.connected
    }

    /// Creating proposals needs a membership token and no transaction in flight.
    pub fn can_create_proposal(&self) -> bool {
        self.membership_balance > 0 && !self.pending_transaction
    }

    pub fn permitted_actions(&self, proposal: &Proposal, now: SystemTime) -> PermittedActions {
        let idle = !self.pending_transaction;
        let state = proposal.state_at(now);
        PermittedActions {
            can_vote: idle && self.membership_balance > 0 && state == ProposalState::Open,
            can_execute: idle && state == ProposalState::DecidedPendingExecution,
        }
    }

    /// Changes: `connected`.
    pub(crate) fn set_connected(&mut self, connected: bool) {
        self.connected = connected;
    }

    /// Changes: `treasury_balance`.
    pub(crate) fn set_treasury_balance(&mut self, wei: u128) {
        self.treasury_balance = wei;
    }

    /// Changes: `proposal_count`.
    pub(crate) fn set_proposal_count(&mut self, count: u64) {
        self.proposal_count = count;
    }

    /// Changes: `membership_balance`.
    pub(crate) fn set_membership_balance(&mut self, tokens: u64) {
        self.membership_balance = tokens;
    }

    /// Changes: `active_tab`.
    pub(crate) fn set_active_tab(&mut self, tab: Tab) {
        self.active_tab = Some(tab);
    }

    /// Changes: `pending_transaction` (set).
    pub(crate) fn begin_transaction(&mut self) {
        self.pending_transaction = true;
    }

    /// Changes: `pending_transaction` (clear).
    pub(crate) fn end_transaction(&mut self) {
        self.pending_transaction = false;
    }

    /// Changes: `proposals`, `proposal_count`.
    ///
    /// Replaces the whole list in one step. A proposal already seen as
    /// executed stays executed even if a stale read says otherwise.
    pub(crate) fn replace_proposals(&mut self, mut fresh: Vec<Proposal>) {
        let executed: HashSet<u64> = self
            .proposals
            .iter()
            .filter(|p| p.executed)
            .map(|p| p.id)
            .collect();

        for proposal in fresh.iter_mut() {
            if !proposal.executed && executed.contains(&proposal.id) {
                tracing::warn!(id = proposal.id, "stale read reports executed proposal as pending");
                proposal.executed = true;
            }
        }

        self.proposal_count = fresh.len() as u64;
        self.proposals = fresh;
    }

    /// Snapshot handed to presentation.
    pub fn view(&self) -> SessionView {
        SessionView {
            treasury_balance: self.treasury_balance.to_string(),
            treasury_balance_eth: format_ether(self.treasury_balance),
            num_proposals: self.proposal_count,
            proposals: self.proposals.clone(),
            nft_balance: self.membership_balance,
            selected_tab: self.active_tab,
            loading: self.pending_transaction,
            wallet_connected: self.connected,
        }
    }
}

/// Presentation payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionView {
    /// Wei, as a decimal string.
    pub treasury_balance: String,
    pub treasury_balance_eth: String,
    pub num_proposals: u64,
    pub proposals: Vec<Proposal>,
    pub nft_balance: u64,
    pub selected_tab: Option<Tab>,
    pub loading: bool,
    pub wallet_connected: bool,
}
