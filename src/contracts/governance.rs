//! Governance contract handle.

use super::abi::{
    self, AbiError, ContractSchema, Word, U256, CREATE_PROPOSAL, EXECUTE_PROPOSAL, GOVERNANCE_SCHEMA,
    NUM_PROPOSALS, PROPOSALS, VOTE_ON_PROPOSAL,
};
use super::pending::PendingTransaction;
use crate::error::{GovernanceError, GovernanceResult};
use crate::ledger::connection::Connection;
use crate::ledger::traits::Address;

/// Fields of the `proposals(id)` getter, as returned by the contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawProposal {
    /// Full `uint256`; token ids are not bounded by 64 bits.
    pub nft_token_id: U256,
    /// Seconds since the Unix epoch.
    pub deadline: u64,
    pub yay_votes: u64,
    pub nay_votes: u64,
    pub executed: bool,
}

/// `{address, schema, connection}` for the governance contract.
#[derive(Debug)]
pub struct GovernanceContract {
    address: Address,
    conn: Connection,
}

impl GovernanceContract {
    pub(super) fn new(address: Address, conn: Connection) -> Self {
        Self { address, conn }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn schema(&self) -> &'static ContractSchema {
        &GOVERNANCE_SCHEMA
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    pub async fn num_proposals(&self) -> GovernanceResult<u64> {
        let words = self.read(&NUM_PROPOSALS, &[]).await?;
        Ok(words[0].to_u64()?)
    }

    pub async fn proposals(&self, id: u64) -> GovernanceResult<RawProposal> {
        let words = self.read(&PROPOSALS, &[Word::from_u64(id)]).await?;
        Ok(RawProposal {
            nft_token_id: words[0].to_u256(),
            deadline: field(id, "deadline", words[1].to_u64())?,
            yay_votes: field(id, "yay_votes", words[2].to_u64())?,
            nay_votes: field(id, "nay_votes", words[3].to_u64())?,
            executed: field(id, "executed", words[4].to_bool())?,
        })
    }

    pub async fn create_proposal(&self, nft_token_id: U256) -> GovernanceResult<PendingTransaction> {
        self.write(&CREATE_PROPOSAL, &[Word::from_u256(nft_token_id)])
            .await
    }

    /// `vote_code` is the contract's encoding: 0 = YAY, 1 = NAY.
    pub async fn vote_on_proposal(&self, id: u64, vote_code: u8) -> GovernanceResult<PendingTransaction> {
        self.write(
            &VOTE_ON_PROPOSAL,
            &[Word::from_u64(id), Word::from_u64(vote_code as u64)],
        )
        .await
    }

    pub async fn execute_proposal(&self, id: u64) -> GovernanceResult<PendingTransaction> {
        self.write(&EXECUTE_PROPOSAL, &[Word::from_u64(id)]).await
    }

    async fn read(&self, function: &abi::Function, args: &[Word]) -> GovernanceResult<Vec<Word>> {
        let data = abi::encode_call(function, args);
        let output = self
            .conn
            .transport()
            .call(&self.address, &data)
            .await
            .map_err(GovernanceError::from_read)?;
        Ok(abi::decode_output(function, &output)?)
    }

    async fn write(
        &self,
        function: &abi::Function,
        args: &[Word],
    ) -> GovernanceResult<PendingTransaction> {
        let signer = self.conn.signer()?;
        let data = abi::encode_call(function, args);
        let hash = self
            .conn
            .transport()
            .send_transaction(&signer, &self.address, &data)
            .await
            .map_err(|e| {
                tracing::warn!(function = function.name, error = %e, "transaction submission failed");
                GovernanceError::from_write(e)
            })?;
        tracing::info!(function = function.name, tx = %hash, "transaction submitted");
        Ok(PendingTransaction::new(hash, self.conn.transport().clone()))
    }
}

/// Name the proposal and field a getter word failed to decode.
fn field<T>(id: u64, name: &str, value: Result<T, AbiError>) -> GovernanceResult<T> {
    value.map_err(|e| GovernanceError::RemoteReadError(format!("proposal {} {}: {}", id, name, e)))
}
