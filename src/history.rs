//! Transaction history projection
//!
//! Derives display-ready [`HistoryEntry`] rows from raw history records.
//! Rows are rebuilt on every query and never mutated.

use crate::intent::parse_drops;
use crate::ledger::{RawTxRecord, TxAmount, LEDGER_EPOCH_OFFSET};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

/// Default number of records fetched per history query
pub const DEFAULT_HISTORY_LIMIT: u32 = 20;

const NATIVE_CURRENCY: &str = "XRP";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Sent,
    Received,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HistoryEntry {
    pub direction: Direction,
    pub counterparty: String,
    pub amount: Decimal,
    pub currency: String,
    pub timestamp: Option<DateTime<Utc>>,
    pub hash: String,
}

impl HistoryEntry {
    /// Project a record from the point of view of `own_address`.
    ///
    /// Only payments with a counterparty are kept; everything else
    /// (other transaction types, self-payments, unreadable amounts) is
    /// skipped.
    pub fn from_record(record: &RawTxRecord, own_address: &str) -> Option<Self> {
        if record.tx_type != "Payment" {
            return None;
        }

        let (direction, counterparty) = match record.destination.as_deref() {
            Some(dest) if dest != own_address => (Direction::Sent, dest.to_string()),
            _ if record.account != own_address => (Direction::Received, record.account.clone()),
            _ => return None,
        };

        let (amount, currency) = match record.amount.as_ref()? {
            TxAmount::Native { drops } => (parse_drops(drops)?, NATIVE_CURRENCY.to_string()),
            TxAmount::Issued { value, currency } => (parse_issued_value(value)?, currency.clone()),
        };

        Some(Self {
            direction,
            counterparty,
            amount,
            currency,
            timestamp: record.date.and_then(ledger_time_to_utc),
            hash: record.hash.clone(),
        })
    }
}

/// Build the history view for `own_address`, preserving record order
pub fn build_history(records: &[RawTxRecord], own_address: &str) -> Vec<HistoryEntry> {
    records
        .iter()
        .filter_map(|record| {
            let entry = HistoryEntry::from_record(record, own_address);
            if entry.is_none() {
                tracing::debug!(hash = %record.hash, tx_type = %record.tx_type, "Skipping history record");
            }
            entry
        })
        .collect()
}

/// Convert seconds since the ledger epoch to wall-clock time
pub fn ledger_time_to_utc(ledger_seconds: i64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(ledger_seconds.checked_add(LEDGER_EPOCH_OFFSET)?, 0)
}

/// Issued-currency values may use scientific notation on the wire
fn parse_issued_value(value: &str) -> Option<Decimal> {
    value
        .parse::<Decimal>()
        .or_else(|_| Decimal::from_scientific(value))
        .ok()
        .map(|v| v.normalize())
}
