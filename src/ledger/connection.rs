//! Connection negotiation.
//!
//! Every operation acquires its own connection (connect-per-operation): the
//! provider handshake and the network check run again each time, so a user
//! switching networks in their wallet is noticed on the next action.

use std::fmt;
use std::sync::Arc;

use super::traits::{Address, ChainId, LedgerTransport, WalletProvider};
use crate::error::{GovernanceError, GovernanceResult};
use crate::notify::Notifier;

/// Supported network in the reference deployment.
pub const DEFAULT_CHAIN_ID: ChainId = ChainId(4);

/// What a connection may be used for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionKind {
    ReadOnly,
    Signing,
}

/// Handle to the remote ledger.
#[derive(Clone)]
pub struct Connection {
    transport: Arc<dyn LedgerTransport>,
    chain_id: ChainId,
    signer: Option<Address>,
}

impl Connection {
    pub fn read_only(transport: Arc<dyn LedgerTransport>, chain_id: ChainId) -> Self {
        Self {
            transport,
            chain_id,
            signer: None,
        }
    }

    pub fn signing(transport: Arc<dyn LedgerTransport>, chain_id: ChainId, signer: Address) -> Self {
        Self {
            transport,
            chain_id,
            signer: Some(signer),
        }
    }

    pub fn kind(&self) -> ConnectionKind {
        if self.signer.is_some() {
            ConnectionKind::Signing
        } else {
            ConnectionKind::ReadOnly
        }
    }

    pub fn chain_id(&self) -> ChainId {
        self.chain_id
    }

    pub fn transport(&self) -> &Arc<dyn LedgerTransport> {
        &self.transport
    }

    /// Active account; fails on a read-only connection.
    pub fn signer(&self) -> GovernanceResult<Address> {
        self.signer.ok_or_else(|| {
            GovernanceError::TransactionRejected(
                "a signing connection is required for this call".to_string(),
            )
        })
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("kind", &self.kind())
            .field("chain_id", &self.chain_id)
            .field("signer", &self.signer)
            .finish()
    }
}

/// Establishes validated connections through the wallet provider.
#[derive(Clone)]
pub struct ConnectionNegotiator {
    provider: Arc<dyn WalletProvider>,
    required_chain_id: ChainId,
    notifier: Arc<dyn Notifier>,
}

impl ConnectionNegotiator {
    pub fn new(
        provider: Arc<dyn WalletProvider>,
        required_chain_id: ChainId,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            provider,
            required_chain_id,
            notifier,
        }
    }

    pub fn required_chain_id(&self) -> ChainId {
        self.required_chain_id
    }

    pub fn notifier(&self) -> &Arc<dyn Notifier> {
        &self.notifier
    }

    /// Connect, verify the network, and optionally derive a signer.
    ///
    /// No retries; the caller decides whether to reconnect.
    pub async fn acquire_connection(&self, require_signing: bool) -> GovernanceResult<Connection> {
        let transport = self.provider.connect().await.map_err(|e| {
            tracing::warn!(error = %e, "wallet provider handshake failed");
            GovernanceError::ConnectionFailure(e.to_string())
        })?;

        let chain_id = transport.chain_id().await.map_err(|e| {
            tracing::warn!(error = %e, "could not read network identity");
            GovernanceError::ConnectionFailure(e.to_string())
        })?;

        if chain_id != self.required_chain_id {
            tracing::warn!(
                expected = %self.required_chain_id,
                actual = %chain_id,
                "connected to unsupported network"
            );
            self.notifier.alert(&format!(
                "Please switch your wallet to network {} (currently on {})",
                self.required_chain_id, chain_id
            ));
            return Err(GovernanceError::WrongNetwork {
                expected: self.required_chain_id,
                actual: chain_id,
            });
        }

        if !require_signing {
            tracing::debug!(chain_id = %chain_id, "read-only connection acquired");
            return Ok(Connection::read_only(transport, chain_id));
        }

        let signer = match self.provider.preferred_account() {
            Some(account) => account,
            None => transport
                .accounts()
                .await
                .map_err(|e| GovernanceError::ConnectionFailure(e.to_string()))?
                .into_iter()
                .next()
                .ok_or_else(|| {
                    GovernanceError::ConnectionFailure("provider exposes no accounts".to_string())
                })?,
        };

        tracing::debug!(chain_id = %chain_id, signer = %signer, "signing connection acquired");
        Ok(Connection::signing(transport, chain_id, signer))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::mock::MockLedger;
    use crate::notify::RecordingNotifier;

    fn negotiator(ledger: &MockLedger, notifier: &RecordingNotifier) -> ConnectionNegotiator {
        ConnectionNegotiator::new(
            Arc::new(ledger.clone()),
            DEFAULT_CHAIN_ID,
            Arc::new(notifier.clone()),
        )
    }

    #[tokio::test]
    async fn test_read_only_connection() {
        let ledger = MockLedger::new();
        let notifier = RecordingNotifier::new();
        let conn = negotiator(&ledger, &notifier)
            .acquire_connection(false)
            .await
            .unwrap();

        assert_eq!(conn.kind(), ConnectionKind::ReadOnly);
        assert_eq!(conn.chain_id(), DEFAULT_CHAIN_ID);
        assert!(conn.signer().is_err());
    }

    #[tokio::test]
    async fn test_signing_connection_uses_first_account() {
        let ledger = MockLedger::new();
        let notifier = RecordingNotifier::new();
        let conn = negotiator(&ledger, &notifier)
            .acquire_connection(true)
            .await
            .unwrap();

        assert_eq!(conn.kind(), ConnectionKind::Signing);
        assert_eq!(conn.signer().unwrap(), ledger.active_account());
    }

    #[tokio::test]
    async fn test_wrong_network_alerts_and_fails() {
        let ledger = MockLedger::new();
        ledger.set_chain_id(ChainId(1));
        let notifier = RecordingNotifier::new();

        let err = negotiator(&ledger, &notifier)
            .acquire_connection(false)
            .await
            .unwrap_err();

        assert_eq!(
            err,
            GovernanceError::WrongNetwork {
                expected: ChainId(4),
                actual: ChainId(1)
            }
        );
        assert_eq!(notifier.alerts().len(), 1);
    }

    #[tokio::test]
    async fn test_handshake_failure_is_connection_failure() {
        let ledger = MockLedger::new();
        ledger.fail_connect(true);
        let notifier = RecordingNotifier::new();

        let err = negotiator(&ledger, &notifier)
            .acquire_connection(true)
            .await
            .unwrap_err();

        assert!(matches!(err, GovernanceError::ConnectionFailure(_)));
        assert!(notifier.alerts().is_empty());
    }

    #[tokio::test]
    async fn test_no_accounts_fails_signing_only() {
        let ledger = MockLedger::with_accounts(vec![]);
        let notifier = RecordingNotifier::new();
        let negotiator = negotiator(&ledger, &notifier);

        assert!(negotiator.acquire_connection(false).await.is_ok());
        let err = negotiator.acquire_connection(true).await.unwrap_err();
        assert!(matches!(err, GovernanceError::ConnectionFailure(_)));
    }
}
