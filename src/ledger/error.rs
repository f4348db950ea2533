//! Ledger client error types

use thiserror::Error;

/// Ledger error with classification
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct LedgerError {
    pub kind: LedgerErrorKind,
    pub message: String,
}

impl LedgerError {
    pub fn new(kind: LedgerErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(LedgerErrorKind::Network, message)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(LedgerErrorKind::Timeout, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(LedgerErrorKind::NotFound, message)
    }

    pub fn rpc(message: impl Into<String>) -> Self {
        Self::new(LedgerErrorKind::Rpc, message)
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        Self::new(LedgerErrorKind::Malformed, message)
    }

    pub fn signing(message: impl Into<String>) -> Self {
        Self::new(LedgerErrorKind::Signing, message)
    }
}

/// Error classification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedgerErrorKind {
    /// Transport failure reaching the node
    Network,
    /// No definitive answer in time
    Timeout,
    /// Account or transaction unknown to the ledger
    NotFound,
    /// Node answered with an error status
    Rpc,
    /// Node answered with something we could not interpret
    Malformed,
    /// Key-material provider refused or failed to sign
    Signing,
}

impl LedgerErrorKind {
    /// Stable code surfaced as the result code of a failed submission
    pub fn code(self) -> &'static str {
        match self {
            Self::Network => "network_error",
            Self::Timeout => "timeout",
            Self::NotFound => "not_found",
            Self::Rpc => "rpc_error",
            Self::Malformed => "malformed_response",
            Self::Signing => "signing_failed",
        }
    }

    pub fn is_timeout(self) -> bool {
        matches!(self, Self::Timeout)
    }
}
