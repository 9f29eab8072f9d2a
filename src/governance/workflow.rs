//! Create, vote and execute, plus the session refreshes around them.
//!
//! Lifecycle transitions only ever follow a confirmed transaction and a
//! fresh read; the client never advances a proposal optimistically.

use std::future::Future;
use std::time::SystemTime;

use super::guard::{InFlightGuard, OperationKey};
use super::repository::ProposalRepository;
use super::vote::VoteChoice;
use super::{system_clock, Clock};
use crate::contracts::abi::{format_ether, U256};
use crate::contracts::{ConfirmationPolicy, GovernanceContract, PendingTransaction};
use crate::error::{GovernanceError, GovernanceResult};
use crate::ledger::traits::Receipt;
use crate::session::{SessionState, Tab};

/// Orchestrates governance operations against one session.
#[derive(Clone)]
pub struct GovernanceWorkflow {
    repository: ProposalRepository,
    confirmation: ConfirmationPolicy,
    guard: InFlightGuard,
    clock: Clock,
}

impl GovernanceWorkflow {
    pub fn new(repository: ProposalRepository, confirmation: ConfirmationPolicy) -> Self {
        Self {
            repository,
            confirmation,
            guard: InFlightGuard::new(),
            clock: system_clock(),
        }
    }

    /// Replace the clock used for client-side lifecycle checks.
    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    pub fn repository(&self) -> &ProposalRepository {
        &self.repository
    }

    pub fn guard(&self) -> &InFlightGuard {
        &self.guard
    }

    pub fn now(&self) -> SystemTime {
        (self.clock)()
    }

    /// Connect and load the overview.
    ///
    /// Changes: `connected`, then whatever `refresh_overview` changes.
    pub async fn start_session(&self, session: &mut SessionState) -> GovernanceResult<()> {
        if let Err(e) = self.repository.negotiator().acquire_connection(false).await {
            tracing::warn!(error = %e, "could not connect wallet");
            session.set_connected(false);
            return Err(e);
        }
        session.set_connected(true);
        self.refresh_overview(session).await;
        Ok(())
    }

    /// Reload treasury balance, membership balance and proposal count.
    ///
    /// A failed read is logged and leaves the previous value in place.
    pub async fn refresh_overview(&self, session: &mut SessionState) {
        self.refresh_treasury(session).await;

        match self.repository.membership_balance().await {
            Ok(tokens) => {
                tracing::info!(tokens, "membership balance");
                session.set_membership_balance(tokens);
            }
            Err(e) => tracing::warn!(error = %e, "could not read membership balance"),
        }

        self.refresh_proposal_count(session).await;
    }

    /// Reload the full proposal list. Returns whether the list was replaced.
    pub async fn refresh_proposals(&self, session: &mut SessionState) -> bool {
        match self.repository.fetch_all_proposals().await {
            Ok(proposals) => {
                session.replace_proposals(proposals);
                true
            }
            Err(e) => {
                tracing::warn!(error = %e, "could not refresh proposals");
                false
            }
        }
    }

    /// Switch tabs; the proposals tab always shows a fresh list.
    pub async fn select_tab(&self, session: &mut SessionState, tab: Tab) {
        session.set_active_tab(tab);
        if tab == Tab::ViewProposals {
            self.refresh_proposals(session).await;
        }
    }

    /// Submit `createProposal(target_token_id)` and wait for it.
    ///
    /// Changes: `pending_transaction`, `proposal_count`.
    pub async fn create_proposal(
        &self,
        session: &mut SessionState,
        target_token_id: U256,
    ) -> GovernanceResult<Receipt> {
        let result = self.try_create(session, target_token_id).await;
        self.finish("Create proposal", session, result)
    }

    /// Submit a vote and wait for it.
    ///
    /// Changes: `pending_transaction`, `proposals`, `proposal_count`.
    pub async fn vote_on_proposal(
        &self,
        session: &mut SessionState,
        id: u64,
        choice: VoteChoice,
    ) -> GovernanceResult<Receipt> {
        let result = self.try_vote(session, id, choice).await;
        self.finish("Vote", session, result)
    }

    /// Submit `executeProposal(id)` and wait for it.
    ///
    /// Changes: `pending_transaction`, `proposals`, `proposal_count`,
    /// `treasury_balance`.
    pub async fn execute_proposal(
        &self,
        session: &mut SessionState,
        id: u64,
    ) -> GovernanceResult<Receipt> {
        let result = self.try_execute(session, id).await;
        self.finish("Execute proposal", session, result)
    }

    async fn try_create(
        &self,
        session: &mut SessionState,
        target_token_id: U256,
    ) -> GovernanceResult<Receipt> {
        require_membership(session)?;
        let _ticket = self.guard.try_acquire(OperationKey::CreateProposal)?;

        let receipt = self
            .submit(session, |dao| async move {
                dao.create_proposal(target_token_id).await
            })
            .await?;

        self.refresh_proposal_count(session).await;
        Ok(receipt)
    }

    async fn try_vote(
        &self,
        session: &mut SessionState,
        id: u64,
        choice: VoteChoice,
    ) -> GovernanceResult<Receipt> {
        require_membership(session)?;
        if let Some(proposal) = session.proposal(id) {
            proposal.check_vote(self.now())?;
        }
        let _ticket = self.guard.try_acquire(OperationKey::Proposal(id))?;

        let code = choice.encode();
        tracing::info!(id, vote = %choice, code, "voting on proposal");
        let receipt = self
            .submit(session, |dao| async move {
                dao.vote_on_proposal(id, code).await
            })
            .await?;

        self.refresh_proposals(session).await;
        Ok(receipt)
    }

    async fn try_execute(&self, session: &mut SessionState, id: u64) -> GovernanceResult<Receipt> {
        if let Some(proposal) = session.proposal(id) {
            proposal.check_execute(self.now())?;
            tracing::info!(id, outcome = %proposal.projected_outcome(), "executing proposal");
        }
        let _ticket = self.guard.try_acquire(OperationKey::Proposal(id))?;

        let receipt = self
            .submit(session, |dao| async move { dao.execute_proposal(id).await })
            .await?;

        self.refresh_proposals(session).await;
        self.refresh_treasury(session).await;
        Ok(receipt)
    }

    /// Sign, submit, mark the session pending, wait for confirmation.
    async fn submit<F, Fut>(&self, session: &mut SessionState, send: F) -> GovernanceResult<Receipt>
    where
        F: FnOnce(GovernanceContract) -> Fut,
        Fut: Future<Output = GovernanceResult<PendingTransaction>>,
    {
        let conn = self.repository.negotiator().acquire_connection(true).await?;
        let dao = self.repository.binder().bind_governance_contract(conn);
        let pending = send(dao).await?;
        session.begin_transaction();
        pending.wait(&self.confirmation).await
    }

    fn finish(
        &self,
        action: &str,
        session: &mut SessionState,
        result: GovernanceResult<Receipt>,
    ) -> GovernanceResult<Receipt> {
        session.end_transaction();
        if let Err(e) = &result {
            tracing::warn!(action, error = %e, "governance action failed");
            // The negotiator already alerted about the network.
            if !matches!(e, GovernanceError::WrongNetwork { .. }) {
                self.repository
                    .negotiator()
                    .notifier()
                    .alert(&format!("{} failed: {}", action, e));
            }
        }
        result
    }

    async fn refresh_treasury(&self, session: &mut SessionState) {
        match self.repository.treasury_balance().await {
            Ok(wei) => {
                tracing::info!(treasury = %format_ether(wei), "treasury balance");
                session.set_treasury_balance(wei);
            }
            Err(e) => tracing::warn!(error = %e, "could not read treasury balance"),
        }
    }

    async fn refresh_proposal_count(&self, session: &mut SessionState) {
        match self.repository.num_proposals().await {
            Ok(count) => {
                tracing::info!(count, "proposal count");
                session.set_proposal_count(count);
            }
            Err(e) => tracing::warn!(error = %e, "could not read proposal count"),
        }
    }
}

fn require_membership(session: &SessionState) -> GovernanceResult<()> {
    if session.membership_balance() == 0 {
        return Err(GovernanceError::ActionNotPermitted(
            "you do not hold any membership tokens".to_string(),
        ));
    }
    Ok(())
}
