//! Command routing
//!
//! Classifies a chat utterance before any intent extraction happens.
//! Checks run in a fixed order and the first hit wins:
//! connectivity, account/balance queries, history queries, transfers.

use crate::intent::{self, TransferIntent};
use serde::Serialize;

const ACCOUNT_INFO_KEYWORDS: &[&str] = &["account info"];
const BALANCE_KEYWORDS: &[&str] = &["balance"];
const HISTORY_KEYWORDS: &[&str] = &["transaction history", "past transactions"];

/// Example phrasing shown when nothing was recognized
pub const EXAMPLE_COMMANDS: &[&str] = &[
    "Send 15.5 XRP to rN7n7otELRKCpo4KJkNgSfCxp4oTajWjZn",
    "Transfer 100 XRP to rPEPPER7kfTD9w2To4CQk6UCfuHM9c6GDY with destination tag 12345",
    "Pay 25 XRP to rUCzEr7kfTD9w2To4CQk6UCfuHM9c6GDY with memo 'Invoice #1234'",
];

/// Classification of one utterance
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RoutedOutcome {
    DisconnectedError,
    BalanceQuery,
    AccountInfoQuery,
    HistoryQuery,
    TransferProposed { intent: TransferIntent },
    Unrecognized,
}

impl RoutedOutcome {
    pub fn kind(&self) -> &'static str {
        match self {
            RoutedOutcome::DisconnectedError => "disconnected_error",
            RoutedOutcome::BalanceQuery => "balance_query",
            RoutedOutcome::AccountInfoQuery => "account_info_query",
            RoutedOutcome::HistoryQuery => "history_query",
            RoutedOutcome::TransferProposed { .. } => "transfer_proposed",
            RoutedOutcome::Unrecognized => "unrecognized",
        }
    }

    /// Advisory text for the presentation layer, if any
    pub fn hint(&self) -> Option<String> {
        match self {
            RoutedOutcome::DisconnectedError => Some(
                "Not connected to the ledger. Connect first, then reissue the command."
                    .to_string(),
            ),
            RoutedOutcome::Unrecognized => Some(format!(
                "I couldn't understand your request. Please specify both the amount \
                 (e.g. \"10 XRP\") and the destination address. Try: \"{}\"",
                EXAMPLE_COMMANDS[0]
            )),
            _ => None,
        }
    }
}

/// Route an utterance using the default intent parser.
pub fn route(text: &str, is_connected: bool) -> RoutedOutcome {
    route_with(text, is_connected, intent::parse)
}

/// Route with an explicit parser. The parser runs only when no earlier
/// check has already classified the text.
pub fn route_with<F>(text: &str, is_connected: bool, parse: F) -> RoutedOutcome
where
    F: FnOnce(&str) -> Option<TransferIntent>,
{
    if !is_connected {
        return RoutedOutcome::DisconnectedError;
    }

    let lowered = text.to_lowercase();
    let mentions = |keywords: &[&str]| keywords.iter().any(|k| lowered.contains(k));

    if mentions(ACCOUNT_INFO_KEYWORDS) {
        return RoutedOutcome::AccountInfoQuery;
    }
    if mentions(BALANCE_KEYWORDS) {
        return RoutedOutcome::BalanceQuery;
    }
    if mentions(HISTORY_KEYWORDS) {
        return RoutedOutcome::HistoryQuery;
    }

    match parse(text) {
        Some(intent) => RoutedOutcome::TransferProposed { intent },
        None => RoutedOutcome::Unrecognized,
    }
}
