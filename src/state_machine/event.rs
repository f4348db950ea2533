//! Events that drive the lifecycle

use super::state::SettlementOutcome;
use crate::intent::TransferIntent;

/// Events that trigger state transitions
#[derive(Debug, Clone)]
pub enum Event {
    // User events
    TransferProposed { intent: TransferIntent },
    UserConfirm,
    UserCancel,

    // Queries routed through the session timeline
    BalanceRequested,
    AccountInfoRequested,
    HistoryRequested,

    // Submission events
    SubmissionResolved { outcome: SettlementOutcome },
    SettlementDrained,
}

impl Event {
    pub fn name(&self) -> &'static str {
        match self {
            Event::TransferProposed { .. } => "transfer_proposed",
            Event::UserConfirm => "user_confirm",
            Event::UserCancel => "user_cancel",
            Event::BalanceRequested => "balance_requested",
            Event::AccountInfoRequested => "account_info_requested",
            Event::HistoryRequested => "history_requested",
            Event::SubmissionResolved { .. } => "submission_resolved",
            Event::SettlementDrained => "settlement_drained",
        }
    }
}
