//! Typed handles for the governance and membership contracts.
//!
//! Binding is pure construction: no remote call is made and nothing is
//! cached. Each operation binds a fresh handle on the connection it just
//! acquired.

pub mod abi;
pub mod governance;
pub mod membership;
pub mod pending;

use serde::{Deserialize, Serialize};

use crate::ledger::connection::Connection;
use crate::ledger::traits::Address;

pub use governance::{GovernanceContract, RawProposal};
pub use membership::MembershipContract;
pub use pending::{ConfirmationPolicy, PendingTransaction};

/// Deployed contract addresses.
///
/// Parsed once from configuration; a malformed address stops startup rather
/// than surfacing as a runtime error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContractAddresses {
    pub governance: Address,
    pub membership: Address,
}

/// Builds contract handles from fixed addresses.
#[derive(Debug, Clone, Copy)]
pub struct ContractBinder {
    addresses: ContractAddresses,
}

impl ContractBinder {
    pub fn new(addresses: ContractAddresses) -> Self {
        Self { addresses }
    }

    pub fn addresses(&self) -> &ContractAddresses {
        &self.addresses
    }

    pub fn bind_governance_contract(&self, conn: Connection) -> GovernanceContract {
        GovernanceContract::new(self.addresses.governance, conn)
    }

    pub fn bind_membership_contract(&self, conn: Connection) -> MembershipContract {
        MembershipContract::new(self.addresses.membership, conn)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::connection::DEFAULT_CHAIN_ID;
    use crate::ledger::mock::MockLedger;
    use std::sync::Arc;

    #[test]
    fn test_binder_uses_configured_addresses() {
        let ledger = MockLedger::new();
        let binder = ContractBinder::new(ledger.addresses());
        let conn = Connection::read_only(Arc::new(ledger.clone()), DEFAULT_CHAIN_ID);

        let dao = binder.bind_governance_contract(conn.clone());
        let nft = binder.bind_membership_contract(conn);

        assert_eq!(dao.address(), ledger.addresses().governance);
        assert_eq!(nft.address(), ledger.addresses().membership);
        assert_eq!(dao.schema().name, "governance");
        assert_eq!(nft.schema().name, "membership");
    }

    #[test]
    fn test_addresses_from_toml() {
        let toml_src = format!(
            "governance = \"0x{}\"\nmembership = \"0x{}\"\n",
            "01".repeat(20),
            "02".repeat(20)
        );
        let addresses: ContractAddresses = toml::from_str(&toml_src).unwrap();
        assert_eq!(addresses.governance, Address::new([0x01; 20]));
        assert_eq!(addresses.membership, Address::new([0x02; 20]));
    }

    #[test]
    fn test_malformed_address_rejected_at_parse() {
        let toml_src = "governance = \"0x1234\"\nmembership = \"0x1234\"\n";
        assert!(toml::from_str::<ContractAddresses>(toml_src).is_err());
    }
}
