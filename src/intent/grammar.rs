//! Keyword-anchored field grammars
//!
//! Each rule scans the whole utterance on its own and returns an optional
//! typed value. Rules never see each other's results. Where a rule could
//! match more than once, the leftmost match wins.

use super::ValidationError;
use regex::Regex;
use rust_decimal::Decimal;
use std::sync::LazyLock;

/// `send|transfer|pay` immediately followed by an ASCII number and the XRP unit
static AMOUNT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:send|transfer|pay)\s+([0-9]+(?:\.[0-9]+)?)\s*xrp\b").unwrap()
});

/// `to|destination` followed by an address-shaped token
static DESTINATION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(?i:to|destination)\s+([rR][a-zA-Z0-9]{24,34})\b").unwrap()
});

static ADDRESS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[rR][a-zA-Z0-9]{24,34}$").unwrap());

static TAG_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:destination\s+tag|tag)\s+([0-9]+)\b").unwrap()
});

/// Quoted memo: everything between a matching pair of quotes
static MEMO_QUOTED_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)\b(?:memo|note|message)\s+(?:'([^']*)'|"([^"]*)")"#).unwrap()
});

/// Bare memo: one whitespace-delimited token
static MEMO_BARE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(?:memo|note|message)\s+(\S+)").unwrap());

pub(super) fn amount(text: &str) -> Option<Decimal> {
    let caps = AMOUNT_RE.captures(text)?;
    caps.get(1)?.as_str().parse().ok()
}

pub(super) fn destination(text: &str) -> Option<&str> {
    DESTINATION_RE
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// A tag that does not fit in 32 bits is an error rather than "no tag".
pub(super) fn destination_tag(text: &str) -> Result<Option<u32>, ValidationError> {
    let Some(raw) = TAG_RE.captures(text).and_then(|caps| caps.get(1)) else {
        return Ok(None);
    };
    raw.as_str()
        .parse::<u32>()
        .map(Some)
        .map_err(|_| ValidationError::InvalidTag(raw.as_str().to_string()))
}

pub(super) fn memo(text: &str) -> Option<String> {
    if let Some(caps) = MEMO_QUOTED_RE.captures(text) {
        let quoted = caps.get(1).or_else(|| caps.get(2))?;
        return Some(quoted.as_str().to_string());
    }
    MEMO_BARE_RE
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

pub(super) fn is_address(raw: &str) -> bool {
    ADDRESS_RE.is_match(raw)
}
