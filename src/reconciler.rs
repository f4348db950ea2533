//! Cached account snapshot
//!
//! The reconciler owns the last known [`AccountSnapshot`]. A refresh
//! replaces it wholesale; a failed refresh keeps the old one and only logs.

use crate::ledger::{AccountSnapshot, LedgerClient};
use std::sync::Arc;
use tokio::sync::watch;

/// Result of a refresh attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Freshness {
    /// Snapshot fetched just now
    Fresh(AccountSnapshot),
    /// Fetch failed; whatever was cached before, if anything
    Stale(Option<AccountSnapshot>),
}

impl Freshness {
    pub fn snapshot(&self) -> Option<&AccountSnapshot> {
        match self {
            Freshness::Fresh(s) => Some(s),
            Freshness::Stale(s) => s.as_ref(),
        }
    }
}

pub struct BalanceReconciler<L: LedgerClient + ?Sized> {
    ledger: Arc<L>,
    snapshot_tx: watch::Sender<Option<AccountSnapshot>>,
}

impl<L: LedgerClient + ?Sized> BalanceReconciler<L> {
    pub fn new(ledger: Arc<L>) -> Self {
        let (snapshot_tx, _) = watch::channel(None);
        Self {
            ledger,
            snapshot_tx,
        }
    }

    /// Fetch the account and replace the cached snapshot.
    ///
    /// Never fails: on error the previous snapshot stays in place.
    pub async fn refresh(&self, address: &str) -> Freshness {
        match self.ledger.account_info(address).await {
            Ok(snapshot) => {
                tracing::info!(
                    address = %snapshot.address,
                    balance = %snapshot.balance,
                    sequence = snapshot.sequence,
                    "Account snapshot refreshed"
                );
                self.snapshot_tx.send_replace(Some(snapshot.clone()));
                Freshness::Fresh(snapshot)
            }
            Err(e) => {
                tracing::warn!(
                    address = %address,
                    kind = e.kind.code(),
                    error = %e.message,
                    "Balance refresh failed, keeping cached snapshot"
                );
                Freshness::Stale(self.cached())
            }
        }
    }

    pub fn cached(&self) -> Option<AccountSnapshot> {
        self.snapshot_tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<AccountSnapshot>> {
        self.snapshot_tx.subscribe()
    }
}
