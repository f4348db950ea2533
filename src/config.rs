//! Process configuration from environment variables

use crate::history::DEFAULT_HISTORY_LIMIT;
use crate::intent::{Address, ValidationError};
use crate::ledger::{LedgerConfig, DEFAULT_RPC_URL};
use std::time::Duration;
use thiserror::Error;

const DEFAULT_PORT: u16 = 8000;
const DEFAULT_FINALITY_TIMEOUT_SECS: u64 = 60;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("XRP_CHAT_ACCOUNT is not set")]
    MissingAccount,
    #[error("XRP_CHAT_ACCOUNT: {0}")]
    InvalidAccount(#[from] ValidationError),
    #[error("{name} must be a positive integer, got {value:?}")]
    InvalidNumber { name: &'static str, value: String },
}

pub struct AppConfig {
    pub port: u16,
    pub account: Address,
    /// Seed for the node-side signer; without it every confirmation fails
    pub seed: Option<String>,
    pub history_limit: u32,
    pub ledger: LedgerConfig,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("port", &self.port)
            .field("account", &self.account)
            .field("seed", &self.seed.as_ref().map(|_| "<redacted>"))
            .field("history_limit", &self.history_limit)
            .field("ledger", &self.ledger)
            .finish()
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let account = var("XRP_CHAT_ACCOUNT").ok_or(ConfigError::MissingAccount)?;
        let account = Address::parse(account.trim())?;

        let finality_secs = parse_number(&var, "XRP_CHAT_FINALITY_TIMEOUT_SECS")?
            .unwrap_or(DEFAULT_FINALITY_TIMEOUT_SECS);

        Ok(Self {
            port: parse_number(&var, "XRP_CHAT_PORT")?.unwrap_or(DEFAULT_PORT),
            account,
            seed: var("XRP_CHAT_SEED").filter(|s| !s.is_empty()),
            history_limit: parse_number(&var, "XRP_CHAT_HISTORY_LIMIT")?
                .unwrap_or(DEFAULT_HISTORY_LIMIT),
            ledger: LedgerConfig {
                rpc_url: var("XRP_CHAT_RPC_URL").unwrap_or_else(|| DEFAULT_RPC_URL.to_string()),
                finality_timeout: Duration::from_secs(finality_secs),
                ..LedgerConfig::default()
            },
        })
    }
}

fn parse_number<T: std::str::FromStr + PartialOrd + Default>(
    var: &impl Fn(&str) -> Option<String>,
    name: &'static str,
) -> Result<Option<T>, ConfigError> {
    let Some(value) = var(name) else {
        return Ok(None);
    };
    match value.trim().parse::<T>() {
        Ok(n) if n > T::default() => Ok(Some(n)),
        _ => Err(ConfigError::InvalidNumber { name, value }),
    }
}
