//! Credit bookkeeping around a generation.
//!
//! A guide costs one credit. The pipeline checks the balance before calling
//! the generation service ([`check_gate`]) and debits after a successful
//! answer. The debit must be a single conditional decrement ("take one if
//! any are left"), never a read followed by a write of `balance - 1`: two
//! concurrent generations would otherwise both read 1 and both write 0,
//! handing out a free guide.

use crate::error::GuideError;
use async_trait::async_trait;
use std::sync::atomic::{AtomicI64, Ordering};
use tracing::debug;

/// Storage for a caller's credit balance.
#[async_trait]
pub trait CreditLedger: Send + Sync {
    /// Current balance.
    async fn balance(&self) -> Result<i64, GuideError>;

    /// Atomically take one credit if the balance is positive.
    ///
    /// Returns the balance after the debit, or `None` when nothing was taken
    /// because the balance was already zero or below.
    async fn try_debit(&self) -> Result<Option<i64>, GuideError>;
}

/// Refuse to start when the balance is not strictly positive.
pub async fn check_gate(ledger: &dyn CreditLedger) -> Result<i64, GuideError> {
    let balance = ledger.balance().await?;
    if balance <= 0 {
        return Err(GuideError::NoCredits { balance });
    }
    debug!("Credit gate passed (balance: {balance})");
    Ok(balance)
}

/// Take the credit for a finished generation, or fail with
/// [`GuideError::NoCredits`] if another generation spent it first.
pub async fn debit_one(ledger: &dyn CreditLedger) -> Result<i64, GuideError> {
    match ledger.try_debit().await? {
        Some(remaining) => {
            debug!("Debited one credit ({remaining} left)");
            Ok(remaining)
        }
        None => Err(GuideError::NoCredits {
            balance: ledger.balance().await?,
        }),
    }
}

/// In-process ledger backed by an atomic counter.
#[derive(Debug)]
pub struct MemoryLedger {
    balance: AtomicI64,
}

impl MemoryLedger {
    pub fn new(balance: i64) -> Self {
        Self {
            balance: AtomicI64::new(balance),
        }
    }
}

#[async_trait]
impl CreditLedger for MemoryLedger {
    async fn balance(&self) -> Result<i64, GuideError> {
        Ok(self.balance.load(Ordering::SeqCst))
    }

    async fn try_debit(&self) -> Result<Option<i64>, GuideError> {
        let taken = self
            .balance
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |b| (b > 0).then(|| b - 1));
        Ok(taken.ok().map(|previous| previous - 1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn gate_refuses_zero_and_negative() {
        for b in [0, -3] {
            let ledger = MemoryLedger::new(b);
            let err = check_gate(&ledger).await.unwrap_err();
            assert!(matches!(err, GuideError::NoCredits { balance } if balance == b));
        }
    }

    #[tokio::test]
    async fn gate_passes_positive_balance() {
        assert_eq!(check_gate(&MemoryLedger::new(2)).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn debit_takes_exactly_one() {
        let ledger = MemoryLedger::new(2);
        assert_eq!(debit_one(&ledger).await.unwrap(), 1);
        assert_eq!(debit_one(&ledger).await.unwrap(), 0);
        assert!(matches!(
            debit_one(&ledger).await,
            Err(GuideError::NoCredits { balance: 0 })
        ));
        assert_eq!(ledger.balance().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn concurrent_debits_never_overdraw() {
        let ledger = Arc::new(MemoryLedger::new(5));
        let mut handles = Vec::new();
        for _ in 0..32 {
            let l = Arc::clone(&ledger);
            handles.push(tokio::spawn(async move { l.try_debit().await.unwrap() }));
        }
        let mut granted = 0;
        for h in handles {
            if h.await.unwrap().is_some() {
                granted += 1;
            }
        }
        assert_eq!(granted, 5);
        assert_eq!(ledger.balance().await.unwrap(), 0);
    }

    #[test]
    fn ledger_works_from_sync_code() {
        let ledger = MemoryLedger::new(1);
        assert_eq!(tokio_test::block_on(ledger.try_debit()).unwrap(), Some(0));
        assert_eq!(tokio_test::block_on(ledger.try_debit()).unwrap(), None);
    }
}
