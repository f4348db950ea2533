//! Ledger client abstraction
//!
//! The session talks to the ledger and to the key-material provider only
//! through the [`LedgerClient`] and [`Signer`] traits, so tests can swap in
//! doubles that return canned results.

mod error;
mod payment;
mod types;
mod xrpl;

pub use error::{LedgerError, LedgerErrorKind};
pub use payment::PaymentRequest;
pub use types::*;
pub use xrpl::{LedgerConfig, RpcSigner, XrplClient, DEFAULT_RPC_URL};

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Instant;

/// Capabilities the session needs from the ledger
#[async_trait]
pub trait LedgerClient: Send + Sync {
    /// Establish (or re-establish) connectivity
    async fn connect(&self) -> Result<(), LedgerError>;

    fn is_connected(&self) -> bool;

    /// Validated account root; `NotFound` for unfunded accounts
    async fn account_info(&self, address: &str) -> Result<AccountSnapshot, LedgerError>;

    /// Most recent transactions touching `address`, newest first
    async fn transaction_history(
        &self,
        address: &str,
        limit: u32,
    ) -> Result<Vec<RawTxRecord>, LedgerError>;

    /// Populate sequence number, fee and expiry
    async fn autofill(&self, payment: &PaymentRequest) -> Result<PreparedTx, LedgerError>;

    /// Submit and wait until the outcome is final
    async fn submit_and_wait(&self, signed: &SignedBlob) -> Result<SubmitResult, LedgerError>;
}

/// Key-material provider for the active account
#[async_trait]
pub trait Signer: Send + Sync {
    async fn sign(&self, prepared: &PreparedTx) -> Result<SignedBlob, LedgerError>;
}

// ============================================================================
// Arc implementations for trait objects
// ============================================================================

#[async_trait]
impl<T: LedgerClient + ?Sized> LedgerClient for Arc<T> {
    async fn connect(&self) -> Result<(), LedgerError> {
        (**self).connect().await
    }

    fn is_connected(&self) -> bool {
        (**self).is_connected()
    }

    async fn account_info(&self, address: &str) -> Result<AccountSnapshot, LedgerError> {
        (**self).account_info(address).await
    }

    async fn transaction_history(
        &self,
        address: &str,
        limit: u32,
    ) -> Result<Vec<RawTxRecord>, LedgerError> {
        (**self).transaction_history(address, limit).await
    }

    async fn autofill(&self, payment: &PaymentRequest) -> Result<PreparedTx, LedgerError> {
        (**self).autofill(payment).await
    }

    async fn submit_and_wait(&self, signed: &SignedBlob) -> Result<SubmitResult, LedgerError> {
        (**self).submit_and_wait(signed).await
    }
}

#[async_trait]
impl<T: Signer + ?Sized> Signer for Arc<T> {
    async fn sign(&self, prepared: &PreparedTx) -> Result<SignedBlob, LedgerError> {
        (**self).sign(prepared).await
    }
}

// ============================================================================
// Logging wrapper
// ============================================================================

/// Logging wrapper for ledger clients
pub struct LoggingLedgerClient {
    inner: Arc<dyn LedgerClient>,
}

impl LoggingLedgerClient {
    pub fn new(inner: Arc<dyn LedgerClient>) -> Self {
        Self { inner }
    }
}

fn log_call<T>(operation: &str, start: Instant, result: &Result<T, LedgerError>) {
    let duration = start.elapsed();
    match result {
        Ok(_) => {
            tracing::debug!(
                operation,
                duration_ms = %duration.as_millis(),
                "Ledger call completed"
            );
        }
        Err(e) => {
            tracing::warn!(
                operation,
                duration_ms = %duration.as_millis(),
                kind = e.kind.code(),
                error = %e.message,
                "Ledger call failed"
            );
        }
    }
}

#[async_trait]
impl LedgerClient for LoggingLedgerClient {
    async fn connect(&self) -> Result<(), LedgerError> {
        let start = Instant::now();
        let result = self.inner.connect().await;
        log_call("connect", start, &result);
        result
    }

    fn is_connected(&self) -> bool {
        self.inner.is_connected()
    }

    async fn account_info(&self, address: &str) -> Result<AccountSnapshot, LedgerError> {
        let start = Instant::now();
        let result = self.inner.account_info(address).await;
        log_call("account_info", start, &result);
        result
    }

    async fn transaction_history(
        &self,
        address: &str,
        limit: u32,
    ) -> Result<Vec<RawTxRecord>, LedgerError> {
        let start = Instant::now();
        let result = self.inner.transaction_history(address, limit).await;
        log_call("transaction_history", start, &result);
        result
    }

    async fn autofill(&self, payment: &PaymentRequest) -> Result<PreparedTx, LedgerError> {
        let start = Instant::now();
        let result = self.inner.autofill(payment).await;
        log_call("autofill", start, &result);
        result
    }

    async fn submit_and_wait(&self, signed: &SignedBlob) -> Result<SubmitResult, LedgerError> {
        let start = Instant::now();
        let result = self.inner.submit_and_wait(signed).await;
        log_call("submit_and_wait", start, &result);
        if let Ok(submitted) = &result {
            tracing::info!(
                hash = %submitted.transaction_hash,
                result_code = %submitted.result_code,
                "Transaction reached finality"
            );
        }
        result
    }
}
