//! Free-text transfer intents
//!
//! Turns a chat utterance into a validated [`TransferIntent`]. Each field is
//! extracted by an independent keyword-anchored grammar (see [`grammar`]);
//! the parse succeeds only when both mandatory fields are present.

mod grammar;


use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Minor units (drops) per major unit (XRP)
pub const DROPS_PER_XRP: u64 = 1_000_000;

/// Fractional digits a major-unit amount may carry and still map onto drops
pub const AMOUNT_SCALE: u32 = 6;

/// Largest amount the ledger can represent: 10^17 drops
pub const MAX_AMOUNT_XRP: u64 = 100_000_000_000;

/// Malformed amount or address shape
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Amount must be greater than zero")]
    NonPositiveAmount,
    #[error("Amount {0} has more than 6 decimal places")]
    AmountTooPrecise(Decimal),
    #[error("Amount {0} exceeds the maximum of 100000000000 XRP")]
    AmountTooLarge(Decimal),
    #[error("Invalid address: {0}")]
    InvalidAddress(String),
    #[error("Invalid destination tag: {0}")]
    InvalidTag(String),
}

/// A syntactically valid ledger address
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Address(String);

impl Address {
    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        if grammar::is_address(raw) {
            Ok(Self(raw.to_string()))
        } else {
            Err(ValidationError::InvalidAddress(raw.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Address {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Address> for String {
    fn from(address: Address) -> Self {
        address.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A recognized, validated transfer request. Immutable once built.
///
/// Deserialization goes through [`TransferIntent::new`], so a decoded
/// intent satisfies the same checks as a parsed one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawTransferIntent")]
pub struct TransferIntent {
    amount: Decimal,
    destination: Address,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    destination_tag: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    memo: Option<String>,
}

#[derive(Deserialize)]
struct RawTransferIntent {
    amount: Decimal,
    destination: Address,
    #[serde(default)]
    destination_tag: Option<u32>,
    #[serde(default)]
    memo: Option<String>,
}

impl TryFrom<RawTransferIntent> for TransferIntent {
    type Error = ValidationError;

    fn try_from(raw: RawTransferIntent) -> Result<Self, Self::Error> {
        Self::new(raw.amount, raw.destination, raw.destination_tag, raw.memo)
    }
}

impl TransferIntent {
    pub fn new(
        amount: Decimal,
        destination: Address,
        destination_tag: Option<u32>,
        memo: Option<String>,
    ) -> Result<Self, ValidationError> {
        if amount <= Decimal::ZERO {
            return Err(ValidationError::NonPositiveAmount);
        }
        if amount.normalize().scale() > AMOUNT_SCALE {
            return Err(ValidationError::AmountTooPrecise(amount));
        }
        if amount > Decimal::from(MAX_AMOUNT_XRP) {
            return Err(ValidationError::AmountTooLarge(amount));
        }
        Ok(Self {
            amount: amount.normalize(),
            destination,
            destination_tag,
            memo: memo.filter(|m| !m.is_empty()),
        })
    }

    /// Amount in major units (XRP)
    pub fn amount(&self) -> Decimal {
        self.amount
    }

    pub fn destination(&self) -> &Address {
        &self.destination
    }

    pub fn destination_tag(&self) -> Option<u32> {
        self.destination_tag
    }

    pub fn memo(&self) -> Option<&str> {
        self.memo.as_deref()
    }
}

/// Convert a major-unit amount to drops. `None` if it is negative, too
/// precise, or out of range.
pub fn xrp_to_drops(amount: Decimal) -> Option<u64> {
    use rust_decimal::prelude::ToPrimitive;

    let drops = amount.checked_mul(Decimal::from(DROPS_PER_XRP))?;
    if drops.fract() != Decimal::ZERO {
        return None;
    }
    drops.to_u64()
}

/// Convert drops to a normalized major-unit amount
pub fn drops_to_xrp(drops: u64) -> Decimal {
    Decimal::from(drops) / Decimal::from(DROPS_PER_XRP)
}

/// Parse a drop count as it appears on the wire (a decimal string)
pub fn parse_drops(raw: &str) -> Option<Decimal> {
    raw.parse::<u64>().ok().map(|d| drops_to_xrp(d).normalize())
}

/// Extract a transfer intent from free text.
///
/// Returns `None` unless both the amount and the destination were found and
/// every extracted field passes validation.
pub fn parse(text: &str) -> Option<TransferIntent> {
    match try_parse(text) {
        Ok(intent) => intent,
        Err(e) => {
            tracing::debug!(error = %e, "Rejected transfer intent");
            None
        }
    }
}

fn try_parse(text: &str) -> Result<Option<TransferIntent>, ValidationError> {
    let Some(amount) = grammar::amount(text) else {
        return Ok(None);
    };
    let Some(destination) = grammar::destination(text) else {
        return Ok(None);
    };
    let tag = grammar::destination_tag(text)?;
    let memo = grammar::memo(text);

    TransferIntent::new(amount, Address::parse(destination)?, tag, memo).map(Some)
}
