//! Trait abstractions for the remote ledger.
//!
//! The wallet provider and its transport are external collaborators. Keeping
//! them behind traits lets the JSON-RPC transport and the in-memory
//! `MockLedger` stand in for each other.

use async_trait::async_trait;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// 20-byte account or contract address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Address([u8; 20]);

impl Address {
    pub const ZERO: Address = Address([0u8; 20]);

    pub const fn new(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl FromStr for Address {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s.strip_prefix("0x").unwrap_or(s);
        if digits.len() != 40 {
            return Err(LedgerError::Decode(format!(
                "address must be 40 hex characters, got {}",
                digits.len()
            )));
        }
        let bytes = hex::decode(digits)
            .map_err(|e| LedgerError::Decode(format!("invalid address hex: {}", e)))?;
        let mut out = [0u8; 20];
        out.copy_from_slice(&bytes);
        Ok(Self(out))
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Network identifier reported by the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChainId(pub u64);

impl fmt::Display for ChainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Transaction hash (32 bytes).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TxHash([u8; 32]);

impl TxHash {
    pub const fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for TxHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl FromStr for TxHash {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(digits)
            .map_err(|e| LedgerError::Decode(format!("invalid transaction hash: {}", e)))?;
        if bytes.len() != 32 {
            return Err(LedgerError::Decode(format!(
                "transaction hash must be 32 bytes, got {}",
                bytes.len()
            )));
        }
        let mut out = [0u8; 32];
        out.copy_from_slice(&bytes);
        Ok(Self(out))
    }
}

/// Outcome of a mined transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Receipt {
    pub hash: TxHash,
    pub block_number: u64,
    /// False when the transaction was mined but reverted.
    pub success: bool,
}

/// Result type for ledger operations.
pub type LedgerResult<T> = Result<T, LedgerError>;

/// Ledger transport errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("RPC error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("Execution reverted: {0}")]
    Reverted(String),

    #[error("Signer declined the request")]
    SignatureDeclined,

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Provider exposes no accounts")]
    NoAccounts,
}

/// Transport to the remote ledger.
#[async_trait]
pub trait LedgerTransport: Send + Sync {
    /// Network identity of the connected ledger.
    async fn chain_id(&self) -> LedgerResult<ChainId>;

    /// Accounts the provider can sign for. The first one is the active account.
    async fn accounts(&self) -> LedgerResult<Vec<Address>>;

    /// Native balance of an address, in wei.
    async fn balance(&self, address: &Address) -> LedgerResult<u128>;

    /// Read-only contract call; returns the raw return data.
    async fn call(&self, to: &Address, data: &[u8]) -> LedgerResult<Vec<u8>>;

    /// Sign and submit a transaction from `from`.
    async fn send_transaction(&self, from: &Address, to: &Address, data: &[u8])
        -> LedgerResult<TxHash>;

    /// Receipt of a transaction, or `None` while it is still pending.
    async fn transaction_receipt(&self, hash: &TxHash) -> LedgerResult<Option<Receipt>>;
}

/// Wallet provider collaborator.
#[async_trait]
pub trait WalletProvider: Send + Sync {
    /// Handshake with the provider and hand back a transport.
    async fn connect(&self) -> LedgerResult<Arc<dyn LedgerTransport>>;

    /// Account pinned by configuration, overriding the provider's first account.
    fn preferred_account(&self) -> Option<Address> {
        None
    }
}
