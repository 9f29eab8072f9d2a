//! Membership token contract handle.

use super::abi::{self, ContractSchema, Word, BALANCE_OF, MEMBERSHIP_SCHEMA};
use crate::error::{GovernanceError, GovernanceResult};
use crate::ledger::connection::Connection;
use crate::ledger::traits::Address;

/// `{address, schema, connection}` for the membership token contract.
#[derive(Debug)]
pub struct MembershipContract {
    address: Address,
    conn: Connection,
}

impl MembershipContract {
    pub(super) fn new(address: Address, conn: Connection) -> Self {
        Self { address, conn }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn schema(&self) -> &'static ContractSchema {
        &MEMBERSHIP_SCHEMA
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Number of membership tokens held by `owner`.
    pub async fn balance_of(&self, owner: &Address) -> GovernanceResult<u64> {
        let data = abi::encode_call(&BALANCE_OF, &[Word::from_address(owner)]);
        let output = self
            .conn
            .transport()
            .call(&self.address, &data)
            .await
            .map_err(GovernanceError::from_read)?;
        let words = abi::decode_output(&BALANCE_OF, &output)?;
        Ok(words[0].to_u64()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contracts::ContractBinder;
    use crate::ledger::connection::DEFAULT_CHAIN_ID;
    use crate::ledger::mock::MockLedger;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_balance_of_member_and_stranger() {
        let ledger = MockLedger::new();
        let member = ledger.active_account();
        ledger.set_membership_balance(member, 2);

        let conn = Connection::read_only(Arc::new(ledger.clone()), DEFAULT_CHAIN_ID);
        let nft = ContractBinder::new(ledger.addresses()).bind_membership_contract(conn);

        assert_eq!(nft.balance_of(&member).await.unwrap(), 2);
        assert_eq!(nft.balance_of(&Address::new([0x99; 20])).await.unwrap(), 0);
    }
}
