//! Submitted transactions awaiting confirmation.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::{sleep, timeout, Instant};

use crate::error::{GovernanceError, GovernanceResult};
use crate::ledger::traits::{LedgerTransport, Receipt, TxHash};

/// Default upper bound on a confirmation wait.
pub const DEFAULT_CONFIRMATION_TIMEOUT: Duration = Duration::from_secs(600);

/// Default delay between receipt polls.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// How long to wait for a transaction to be mined.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfirmationPolicy {
    /// `None` waits until the ledger answers, however long that takes.
    pub timeout: Option<Duration>,
    pub poll_interval: Duration,
}

impl Default for ConfirmationPolicy {
    fn default() -> Self {
        Self {
            timeout: Some(DEFAULT_CONFIRMATION_TIMEOUT),
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

/// Handle to a submitted, not yet confirmed transaction.
///
/// Dropping the future returned by [`PendingTransaction::wait`] abandons the
/// wait; the transaction itself stays submitted.
pub struct PendingTransaction {
    hash: TxHash,
    transport: Arc<dyn LedgerTransport>,
}

impl PendingTransaction {
    pub fn new(hash: TxHash, transport: Arc<dyn LedgerTransport>) -> Self {
        Self { hash, transport }
    }

    pub fn hash(&self) -> TxHash {
        self.hash
    }

    /// Suspend until the transaction is mined.
    ///
    /// Fails with `TransactionRejected` when it was mined but reverted, and
    /// with `ConfirmationTimeout` once `policy.timeout` elapses. A failed
    /// receipt lookup says nothing about the transaction, so it is retried.
    pub async fn wait(&self, policy: &ConfirmationPolicy) -> GovernanceResult<Receipt> {
        let started = Instant::now();
        let receipt = match policy.timeout {
            Some(limit) => timeout(limit, self.poll(policy.poll_interval))
                .await
                .map_err(|_| {
                    tracing::warn!(tx = %self.hash, waited = ?limit, "confirmation timed out");
                    GovernanceError::ConfirmationTimeout {
                        hash: self.hash,
                        waited: limit,
                    }
                })?,
            None => self.poll(policy.poll_interval).await,
        };

        if !receipt.success {
            tracing::warn!(tx = %self.hash, block = receipt.block_number, "transaction reverted");
            return Err(GovernanceError::TransactionRejected(format!(
                "transaction {} reverted in block {}",
                self.hash, receipt.block_number
            )));
        }

        tracing::info!(
            tx = %self.hash,
            block = receipt.block_number,
            elapsed = ?started.elapsed(),
            "transaction confirmed"
        );
        Ok(receipt)
    }

    async fn poll(&self, interval: Duration) -> Receipt {
        loop {
            match self.transport.transaction_receipt(&self.hash).await {
                Ok(Some(receipt)) => return receipt,
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!(tx = %self.hash, error = %e, "receipt lookup failed, retrying");
                }
            }
            sleep(interval).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::mock::MockLedger;

    fn fast_policy(limit: Option<Duration>) -> ConfirmationPolicy {
        ConfirmationPolicy {
            timeout: limit,
            poll_interval: Duration::from_millis(5),
        }
    }

    #[tokio::test]
    async fn test_wait_returns_receipt() {
        let ledger = MockLedger::new();
        let hash = ledger.record_receipt(true);
        let pending = PendingTransaction::new(hash, Arc::new(ledger.clone()));

        let receipt = pending.wait(&fast_policy(None)).await.unwrap();
        assert!(receipt.success);
        assert_eq!(receipt.hash, hash);
    }

    #[tokio::test]
    async fn test_wait_reports_revert() {
        let ledger = MockLedger::new();
        let hash = ledger.record_receipt(false);
        let pending = PendingTransaction::new(hash, Arc::new(ledger.clone()));

        let err = pending.wait(&fast_policy(None)).await.unwrap_err();
        assert!(matches!(err, GovernanceError::TransactionRejected(_)));
    }

    #[tokio::test]
    async fn test_wait_times_out() {
        let ledger = MockLedger::new();
        ledger.hold_confirmations(true);
        let hash = ledger.record_receipt(true);
        let pending = PendingTransaction::new(hash, Arc::new(ledger.clone()));

        let err = pending
            .wait(&fast_policy(Some(Duration::from_millis(30))))
            .await
            .unwrap_err();
        assert!(matches!(err, GovernanceError::ConfirmationTimeout { .. }));
    }

    #[tokio::test]
    async fn test_wait_sees_late_confirmation() {
        let ledger = MockLedger::new();
        ledger.hold_confirmations(true);
        let hash = ledger.record_receipt(true);
        let pending = PendingTransaction::new(hash, Arc::new(ledger.clone()));

        let releaser = ledger.clone();
        tokio::spawn(async move {
            sleep(Duration::from_millis(20)).await;
            releaser.hold_confirmations(false);
        });

        let receipt = pending
            .wait(&fast_policy(Some(Duration::from_secs(5))))
            .await
            .unwrap();
        assert!(receipt.success);
    }

    #[tokio::test]
    async fn test_wait_retries_failed_receipt_lookups() {
        let ledger = MockLedger::new();
        let hash = ledger.record_receipt(true);
        ledger.fail_receipt_polls(3);
        let pending = PendingTransaction::new(hash, Arc::new(ledger.clone()));

        let receipt = pending
            .wait(&fast_policy(Some(Duration::from_secs(5))))
            .await
            .unwrap();
        assert!(receipt.success);
        assert_eq!(ledger.receipt_poll_count(), 4);
    }

    #[tokio::test]
    async fn test_wait_lookup_errors_end_in_timeout() {
        let ledger = MockLedger::new();
        let hash = ledger.record_receipt(true);
        ledger.fail_receipt_polls(u64::MAX);
        let pending = PendingTransaction::new(hash, Arc::new(ledger.clone()));

        let err = pending
            .wait(&fast_policy(Some(Duration::from_millis(30))))
            .await
            .unwrap_err();
        assert!(matches!(err, GovernanceError::ConfirmationTimeout { .. }));
        assert!(ledger.receipt_poll_count() > 1);
    }
}
