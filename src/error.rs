//! Error taxonomy for governance operations.
//!
//! Transport-level failures (`LedgerError`) and calldata decoding failures
//! (`AbiError`) are mapped into `GovernanceError` at the operation boundary,
//! so callers only ever see the kinds below.

use std::time::Duration;

use crate::contracts::abi::AbiError;
use crate::ledger::traits::{ChainId, LedgerError, TxHash};

/// Result type for governance operations.
pub type GovernanceResult<T> = Result<T, GovernanceError>;

/// Governance operation errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GovernanceError {
    /// Provider handshake or transport failed.
    #[error("Connection failure: {0}")]
    ConnectionFailure(String),

    /// Connected to a network other than the supported one.
    #[error("Wrong network: expected chain id {expected}, connected to {actual}")]
    WrongNetwork { expected: ChainId, actual: ChainId },

    /// A query failed or returned undecodable data.
    #[error("Remote read failed: {0}")]
    RemoteReadError(String),

    /// Signer declined or the contract reverted a state-mutating call.
    #[error("Transaction rejected: {0}")]
    TransactionRejected(String),

    /// Submitted transaction was not confirmed in time.
    #[error("Transaction {hash} not confirmed after {}", humantime::format_duration(*waited))]
    ConfirmationTimeout { hash: TxHash, waited: Duration },

    /// Client-side gate refused the action; nothing was sent.
    #[error("Action not permitted: {0}")]
    ActionNotPermitted(String),

    /// Another state-mutating operation on the same target is still running.
    #[error("Operation already in flight: {0}")]
    OperationInFlight(String),
}

impl GovernanceError {
    /// Map a transport error raised while reading.
    pub fn from_read(err: LedgerError) -> Self {
        match err {
            LedgerError::Transport(msg) => Self::RemoteReadError(format!("transport: {}", msg)),
            other => Self::RemoteReadError(other.to_string()),
        }
    }

    /// Map a transport error raised while submitting or confirming a write.
    pub fn from_write(err: LedgerError) -> Self {
        match err {
            LedgerError::SignatureDeclined => {
                Self::TransactionRejected("signer declined the transaction".to_string())
            }
            LedgerError::Reverted(reason) => Self::TransactionRejected(reason),
            other => Self::TransactionRejected(other.to_string()),
        }
    }

    /// Whether this error came from the remote side rather than a local gate.
    pub fn is_remote(&self) -> bool {
        !matches!(
            self,
            Self::ActionNotPermitted(_) | Self::OperationInFlight(_)
        )
    }
}

impl From<AbiError> for GovernanceError {
    fn from(err: AbiError) -> Self {
        Self::RemoteReadError(err.to_string())
    }
}
