//! Reads of governance state.
//!
//! Each operation acquires one fresh connection and binds fresh handles on
//! it; nothing is cached between calls.

use crate::contracts::{ContractBinder, GovernanceContract};
use crate::error::{GovernanceError, GovernanceResult};
use crate::ledger::connection::ConnectionNegotiator;

use super::proposal::Proposal;

/// Fetches and reconstructs proposals and related balances.
#[derive(Clone)]
pub struct ProposalRepository {
    negotiator: ConnectionNegotiator,
    binder: ContractBinder,
}

impl ProposalRepository {
    pub fn new(negotiator: ConnectionNegotiator, binder: ContractBinder) -> Self {
        Self { negotiator, binder }
    }

    pub fn negotiator(&self) -> &ConnectionNegotiator {
        &self.negotiator
    }

    pub fn binder(&self) -> &ContractBinder {
        &self.binder
    }

    async fn governance(&self) -> GovernanceResult<GovernanceContract> {
        let conn = self.negotiator.acquire_connection(false).await?;
        Ok(self.binder.bind_governance_contract(conn))
    }

    /// Fetch and reconstruct one proposal.
    pub async fn fetch_proposal(&self, id: u64) -> GovernanceResult<Proposal> {
        let dao = self.governance().await?;
        fetch_one(&dao, id).await
    }

    /// Fetch every proposal, ids `0..count` in ascending order.
    ///
    /// All or nothing: one failed read fails the whole fetch.
    pub async fn fetch_all_proposals(&self) -> GovernanceResult<Vec<Proposal>> {
        let dao = self.governance().await?;
        let count = dao.num_proposals().await?;

        let mut proposals = Vec::with_capacity(count as usize);
        for id in 0..count {
            proposals.push(fetch_one(&dao, id).await?);
        }

        tracing::debug!(count, "fetched all proposals");
        Ok(proposals)
    }

    pub async fn num_proposals(&self) -> GovernanceResult<u64> {
        self.governance().await?.num_proposals().await
    }

    /// Ledger balance of the governance contract, in wei.
    pub async fn treasury_balance(&self) -> GovernanceResult<u128> {
        let conn = self.negotiator.acquire_connection(false).await?;
        conn.transport()
            .balance(&self.binder.addresses().governance)
            .await
            .map_err(GovernanceError::from_read)
    }

    /// Membership tokens held by the active account.
    pub async fn membership_balance(&self) -> GovernanceResult<u64> {
        let conn = self.negotiator.acquire_connection(true).await?;
        let owner = conn.signer()?;
        self.binder
            .bind_membership_contract(conn)
            .balance_of(&owner)
            .await
    }
}

async fn fetch_one(dao: &GovernanceContract, id: u64) -> GovernanceResult<Proposal> {
    dao.proposals(id)
        .await
        .and_then(|raw| Proposal::from_raw(id, raw))
        .map_err(|e| {
            tracing::warn!(id, error = %e, "failed to fetch proposal");
            e
        })
}
