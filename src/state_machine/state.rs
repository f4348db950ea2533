//! Lifecycle state types

use crate::intent::{Address, TransferIntent};
use rust_decimal::Decimal;
use serde::Serialize;

// ============================================================================
// Pending transaction
// ============================================================================

/// The one transfer a session may hold between proposal and settlement
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PendingTransaction {
    pub intent: TransferIntent,
    /// Set once the transfer has been handed to the submission path
    pub submission_attempted: bool,
}

impl PendingTransaction {
    pub fn new(intent: TransferIntent) -> Self {
        Self {
            intent,
            submission_attempted: false,
        }
    }

    #[must_use]
    pub fn into_submitted(self) -> Self {
        Self {
            submission_attempted: true,
            ..self
        }
    }
}

// ============================================================================
// Settlement outcome
// ============================================================================

/// Why a submission attempt ended without success
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureCause {
    /// Reached finality with a non-success result code
    LedgerRejection,
    /// Preparation, signing or transport failed before finality
    Submission,
    /// No definitive answer in time
    Timeout,
}

/// Terminal result of one submission attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SettlementOutcome {
    Success {
        transaction_hash: String,
        amount: Decimal,
        destination: Address,
    },
    Failure {
        result_code: String,
        cause: FailureCause,
        message: String,
    },
}

impl SettlementOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, SettlementOutcome::Success { .. })
    }

    /// Human-readable summary for the presentation layer
    pub fn describe(&self) -> String {
        match self {
            SettlementOutcome::Success {
                transaction_hash,
                amount,
                destination,
            } => format!("Transaction successful. Sent {amount} XRP to {destination}. Hash: {transaction_hash}"),
            SettlementOutcome::Failure {
                result_code,
                cause: FailureCause::LedgerRejection,
                ..
            } => format!("Transaction failed: {result_code}"),
            SettlementOutcome::Failure {
                cause: FailureCause::Timeout,
                message,
                ..
            } => format!("Transaction outcome unknown after timeout: {message}"),
            SettlementOutcome::Failure { message, .. } => format!("Transaction error: {message}"),
        }
    }
}

// ============================================================================
// Lifecycle state
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Default)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LifecycleState {
    /// Nothing pending
    #[default]
    Idle,

    /// A recognized transfer waits for the user's decision
    PendingConfirmation { pending: PendingTransaction },

    /// Confirmed; submission in flight until the ledger gives a final answer
    Submitting { pending: PendingTransaction },

    /// Terminal outcome, drained back to `Idle` by the runtime
    Settled { outcome: SettlementOutcome },
}

impl LifecycleState {
    pub fn name(&self) -> &'static str {
        match self {
            LifecycleState::Idle => "idle",
            LifecycleState::PendingConfirmation { .. } => "pending_confirmation",
            LifecycleState::Submitting { .. } => "submitting",
            LifecycleState::Settled { .. } => "settled",
        }
    }

    /// The transfer held by this state, if any
    pub fn pending(&self) -> Option<&PendingTransaction> {
        match self {
            LifecycleState::PendingConfirmation { pending }
            | LifecycleState::Submitting { pending } => Some(pending),
            _ => None,
        }
    }

    /// True while a submission is unresolved or its outcome not yet drained
    pub fn is_busy(&self) -> bool {
        matches!(
            self,
            LifecycleState::Submitting { .. } | LifecycleState::Settled { .. }
        )
    }
}

// ============================================================================
// Session context
// ============================================================================

/// Immutable configuration for a session
#[derive(Debug, Clone)]
pub struct SessionContext {
    /// Account that pays for proposed transfers
    pub account: Address,
    pub history_limit: u32,
}

impl SessionContext {
    pub fn new(account: Address, history_limit: u32) -> Self {
        Self {
            account,
            history_limit,
        }
    }
}
