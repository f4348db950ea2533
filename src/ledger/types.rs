//! Ledger wire-level types

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Final result code of an applied, successful transaction
pub const SUCCESS_RESULT: &str = "tesSUCCESS";

/// Seconds between the Unix epoch and the ledger epoch (2000-01-01T00:00:00Z)
pub const LEDGER_EPOCH_OFFSET: i64 = 946_684_800;

/// Read-only projection of an account root. Replaced wholesale on refresh.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountSnapshot {
    pub address: String,
    pub balance: Decimal,
    pub sequence: u32,
    pub account_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub regular_key: Option<String>,
}

/// Amount as delivered by a history query
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TxAmount {
    /// Native asset, minor units as a decimal string
    Native { drops: String },
    /// Issued asset
    Issued { value: String, currency: String },
}

/// One transaction as returned by a history query
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawTxRecord {
    pub tx_type: String,
    pub amount: Option<TxAmount>,
    pub account: String,
    pub destination: Option<String>,
    /// Seconds since the ledger epoch
    pub date: Option<i64>,
    pub hash: String,
}

/// Transaction with sequence, fee and expiry filled in, ready to sign
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedTx {
    pub tx_json: Value,
    pub last_ledger_sequence: Option<u32>,
}

/// Signed transaction payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedBlob {
    pub tx_blob: String,
    pub hash: String,
    pub last_ledger_sequence: Option<u32>,
}

/// Definitive submission result
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitResult {
    pub result_code: String,
    pub transaction_hash: String,
}

impl SubmitResult {
    pub fn is_success(&self) -> bool {
        self.result_code == SUCCESS_RESULT
    }
}
