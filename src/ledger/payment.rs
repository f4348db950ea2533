//! Payment request encoding
//!
//! Converts a confirmed intent into the ledger's Payment transaction shape:
//! drops for the amount, the tag only when present, and the memo as
//! upper-case hex of its UTF-8 bytes.

use super::LedgerError;
use crate::intent::{xrp_to_drops, TransferIntent};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct PaymentRequest {
    pub transaction_type: &'static str,
    pub account: String,
    /// Drops, as a decimal string
    pub amount: String,
    pub destination: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination_tag: Option<u32>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub memos: Vec<MemoEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MemoEntry {
    #[serde(rename = "Memo")]
    pub memo: Memo,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Memo {
    #[serde(rename = "MemoData")]
    pub memo_data: String,
}

impl PaymentRequest {
    pub fn from_intent(account: &str, intent: &TransferIntent) -> Result<Self, LedgerError> {
        let drops = xrp_to_drops(intent.amount()).ok_or_else(|| {
            LedgerError::malformed(format!("Amount {} is not expressible in drops", intent.amount()))
        })?;

        let memos = intent
            .memo()
            .map(|memo| MemoEntry {
                memo: Memo {
                    memo_data: encode_memo(memo),
                },
            })
            .into_iter()
            .collect();

        Ok(Self {
            transaction_type: "Payment",
            account: account.to_string(),
            amount: drops.to_string(),
            destination: intent.destination().to_string(),
            destination_tag: intent.destination_tag(),
            memos,
        })
    }
}

/// Upper-case hex of the memo's UTF-8 bytes, untruncated
pub fn encode_memo(memo: &str) -> String {
    hex::encode_upper(memo.as_bytes())
}
