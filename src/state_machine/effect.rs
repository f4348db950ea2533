//! Effects produced by state transitions

use super::state::PendingTransaction;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeLevel {
    Info,
    Success,
    Error,
}

/// A message for the presentation layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            message: message.into(),
        }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }
}

/// What to report once a balance refresh finishes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BalanceReport {
    /// "Balance: N XRP"
    Balance,
    /// Full snapshot for the account panel
    AccountInfo,
    /// Post-settlement refresh; snapshot broadcast only
    Quiet,
}

/// Effects to be executed after state transition
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Broadcast the new state to subscribers
    PublishState,

    /// Send a notice to connected clients
    Notify(Notice),

    /// Encode, autofill, sign and submit; resolves with `SubmissionResolved`
    SubmitPayment { pending: PendingTransaction },

    /// Refresh the cached account snapshot (awaited in place)
    RefreshBalance { report: BalanceReport },

    /// Fetch and broadcast recent history
    FetchHistory { limit: u32 },

    /// Return a settled lifecycle to idle
    DrainSettlement,
}

impl Effect {
    pub fn notify_info(message: impl Into<String>) -> Self {
        Effect::Notify(Notice::info(message))
    }
}
