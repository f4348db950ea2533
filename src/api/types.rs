//! API request and response types

use crate::history::HistoryEntry;
use crate::ledger::AccountSnapshot;
use crate::router::RoutedOutcome;
use crate::state_machine::LifecycleState;
use serde::{Deserialize, Serialize};

/// Request to send a chat message
#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub text: String,
}

/// Response for chat action
#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub outcome: RoutedOutcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

/// Response for confirm/cancel
#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

/// Current session view; also the SSE init payload
#[derive(Debug, Clone, Serialize)]
pub struct StateResponse {
    pub state: LifecycleState,
    pub connected: bool,
    pub snapshot: Option<AccountSnapshot>,
}

/// Response for balance and account-info queries
#[derive(Debug, Serialize)]
pub struct AccountResponse {
    pub snapshot: Option<AccountSnapshot>,
}

/// Response for history queries
#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub entries: Vec<HistoryEntry>,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
        }
    }
}
