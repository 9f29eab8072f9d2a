//! Remote ledger access.
//!
//! - Trait abstractions over the wallet provider and its transport
//! - Connection negotiation with network identity checks
//! - JSON-RPC transport for real nodes
//! - In-memory mock ledger for tests

pub mod connection;
pub mod mock;
pub mod rpc;
pub mod traits;

pub use connection::{Connection, ConnectionKind, ConnectionNegotiator, DEFAULT_CHAIN_ID};
pub use mock::MockLedger;
pub use rpc::{HttpWalletProvider, JsonRpcTransport};
pub use traits::{Address, ChainId, LedgerError, LedgerTransport, Receipt, TxHash, WalletProvider};
