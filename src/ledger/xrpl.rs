//! XRP Ledger JSON-RPC client

use super::types::{AccountSnapshot, PreparedTx, RawTxRecord, SignedBlob, SubmitResult, TxAmount};
use super::{LedgerClient, LedgerError, PaymentRequest, Signer};
use crate::intent::parse_drops;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// Public testnet JSON-RPC endpoint
pub const DEFAULT_RPC_URL: &str = "https://s.altnet.rippletest.net:51234";

/// Ledgers a prepared transaction stays valid for
const LAST_LEDGER_OFFSET: u32 = 20;

/// Connection and finality settings
#[derive(Debug, Clone)]
pub struct LedgerConfig {
    pub rpc_url: String,
    pub request_timeout: Duration,
    /// Total wait for a transaction without `LastLedgerSequence`; otherwise
    /// how long the validated ledger may stall before giving up
    pub finality_timeout: Duration,
    pub poll_interval: Duration,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            rpc_url: DEFAULT_RPC_URL.to_string(),
            request_timeout: Duration::from_secs(20),
            finality_timeout: Duration::from_secs(60),
            poll_interval: Duration::from_secs(1),
        }
    }
}

/// JSON-RPC client for a rippled node
pub struct XrplClient {
    client: Client,
    config: LedgerConfig,
    connected: AtomicBool,
}

impl XrplClient {
    pub fn new(config: LedgerConfig) -> Result<Self, LedgerError> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| LedgerError::network(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            config,
            connected: AtomicBool::new(false),
        })
    }

    /// Issue one JSON-RPC call and return its `result` object
    pub(crate) async fn request(&self, method: &str, params: Value) -> Result<Value, LedgerError> {
        let body = json!({ "method": method, "params": [params] });

        let response = self
            .client
            .post(&self.config.rpc_url)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                self.connected.store(false, Ordering::SeqCst);
                if e.is_timeout() {
                    LedgerError::timeout(format!("{method} timed out: {e}"))
                } else {
                    LedgerError::network(format!("{method} failed: {e}"))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(LedgerError::rpc(format!("{method} returned HTTP {status}")));
        }

        let mut body: Value = response
            .json()
            .await
            .map_err(|e| LedgerError::malformed(format!("{method} response is not JSON: {e}")))?;
        self.connected.store(true, Ordering::SeqCst);

        let result = body
            .get_mut("result")
            .map(Value::take)
            .ok_or_else(|| LedgerError::malformed(format!("{method} response has no result")))?;
        check_status(method, result)
    }

    async fn validated_ledger_index(&self) -> Result<u32, LedgerError> {
        let result = self
            .request("ledger", json!({ "ledger_index": "validated" }))
            .await?;
        as_u32(&result["ledger_index"])
            .ok_or_else(|| LedgerError::malformed("ledger response has no ledger_index"))
    }

    /// `Some(code)` once the transaction is in a validated ledger
    async fn lookup_final_result(&self, hash: &str) -> Result<Option<String>, LedgerError> {
        match self.request("tx", json!({ "transaction": hash })).await {
            Ok(tx) => Ok(final_result_code(&tx)),
            Err(e) if e.kind == super::LedgerErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Poll until the transaction is validated or provably expired.
    ///
    /// With a `LastLedgerSequence` the ledger bounds the wait: the
    /// transaction is given up on only after a validated ledger past it has
    /// been seen and one more lookup still misses. The finality timeout then
    /// only fires if the validated ledger stops advancing.
    async fn poll_final_result(&self, hash: &str, last_ledger: Option<u32>) -> Result<String, LedgerError> {
        let mut stall = StallGuard::new(self.config.finality_timeout);
        loop {
            tokio::time::sleep(self.config.poll_interval).await;

            if let Some(code) = self.lookup_final_result(hash).await? {
                return Ok(code);
            }

            let Some(last) = last_ledger else {
                if stall.expired() {
                    return Err(LedgerError::timeout(format!("No final result for {hash} in time")));
                }
                continue;
            };

            let validated = self.validated_ledger_index().await?;
            if validated > last {
                // It may have been validated in `last` after the lookup above
                if let Some(code) = self.lookup_final_result(hash).await? {
                    return Ok(code);
                }
                return Err(LedgerError::timeout(format!(
                    "Transaction {hash} not validated by ledger {last}"
                )));
            }
            if stall.observe(validated) {
                return Err(LedgerError::timeout(format!(
                    "Validated ledger stuck at {validated} while waiting for {hash}"
                )));
            }
        }
    }
}

/// Tracks how long the validated ledger index has gone without advancing
struct StallGuard {
    limit: Duration,
    index: Option<u32>,
    since: Instant,
}

impl StallGuard {
    fn new(limit: Duration) -> Self {
        Self {
            limit,
            index: None,
            since: Instant::now(),
        }
    }

    /// Record the latest validated index; true once it has been still for `limit`
    fn observe(&mut self, index: u32) -> bool {
        if self.index != Some(index) {
            self.index = Some(index);
            self.since = Instant::now();
            return false;
        }
        self.expired()
    }

    fn expired(&self) -> bool {
        self.since.elapsed() >= self.limit
    }
}

/// Turn an error-status result into a typed error
fn check_status(method: &str, result: Value) -> Result<Value, LedgerError> {
    if result.get("status").and_then(Value::as_str) != Some("error") {
        return Ok(result);
    }

    let code = result
        .get("error")
        .and_then(Value::as_str)
        .unwrap_or("unknown");
    let detail = result
        .get("error_message")
        .and_then(Value::as_str)
        .unwrap_or(code);

    match code {
        "actNotFound" | "txnNotFound" => Err(LedgerError::not_found(format!("{method}: {detail}"))),
        _ => Err(LedgerError::rpc(format!("{method}: {code}: {detail}"))),
    }
}

fn as_u32(value: &Value) -> Option<u32> {
    value.as_u64().and_then(|v| u32::try_from(v).ok())
}

fn as_string(value: &Value) -> Option<String> {
    value.as_str().map(String::from)
}

/// Result code of a validated transaction, `None` while still pending
fn final_result_code(tx: &Value) -> Option<String> {
    if tx.get("validated").and_then(Value::as_bool) != Some(true) {
        return None;
    }
    as_string(&tx["meta"]["TransactionResult"])
}

/// Preliminary results that can never become successful.
///
/// `tel*` and `ter*` are provisional: the transaction may still be relayed
/// and validated, so those are polled like any other.
fn is_final_preliminary(code: &str) -> bool {
    code.starts_with("tem") || code.starts_with("tef")
}

pub(crate) fn parse_account_snapshot(result: &Value) -> Result<AccountSnapshot, LedgerError> {
    let data = &result["account_data"];
    let malformed = |field: &str| LedgerError::malformed(format!("account_data.{field} missing or invalid"));

    Ok(AccountSnapshot {
        address: as_string(&data["Account"]).ok_or_else(|| malformed("Account"))?,
        balance: data["Balance"]
            .as_str()
            .and_then(parse_drops)
            .ok_or_else(|| malformed("Balance"))?,
        sequence: as_u32(&data["Sequence"]).ok_or_else(|| malformed("Sequence"))?,
        account_type: as_string(&data["LedgerEntryType"]).unwrap_or_else(|| "AccountRoot".to_string()),
        regular_key: as_string(&data["RegularKey"]),
    })
}

fn parse_amount(value: &Value) -> Option<TxAmount> {
    match value {
        Value::String(drops) => Some(TxAmount::Native {
            drops: drops.clone(),
        }),
        Value::Object(obj) => Some(TxAmount::Issued {
            value: obj.get("value").and_then(Value::as_str)?.to_string(),
            currency: obj.get("currency").and_then(Value::as_str)?.to_string(),
        }),
        _ => None,
    }
}

/// Parse one `account_tx` entry (API v1 `tx` or v2 `tx_json`)
pub(crate) fn parse_tx_record(entry: &Value) -> Option<RawTxRecord> {
    let tx = entry.get("tx").or_else(|| entry.get("tx_json"))?;
    entry.get("meta")?;

    let amount = tx
        .get("Amount")
        .or_else(|| tx.get("DeliverMax"))
        .and_then(parse_amount);
    let hash = as_string(&tx["hash"]).or_else(|| as_string(&entry["hash"]))?;

    Some(RawTxRecord {
        tx_type: as_string(&tx["TransactionType"])?,
        amount,
        account: as_string(&tx["Account"])?,
        destination: as_string(&tx["Destination"]),
        date: tx["date"].as_i64().or_else(|| entry["date"].as_i64()),
        hash,
    })
}

#[async_trait]
impl LedgerClient for XrplClient {
    async fn connect(&self) -> Result<(), LedgerError> {
        let info = self.request("server_info", json!({})).await?;
        tracing::info!(
            url = %self.config.rpc_url,
            build_version = info["info"]["build_version"].as_str().unwrap_or("unknown"),
            "Connected to ledger"
        );
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    async fn account_info(&self, address: &str) -> Result<AccountSnapshot, LedgerError> {
        let result = self
            .request(
                "account_info",
                json!({ "account": address, "ledger_index": "validated" }),
            )
            .await?;
        parse_account_snapshot(&result)
    }

    async fn transaction_history(
        &self,
        address: &str,
        limit: u32,
    ) -> Result<Vec<RawTxRecord>, LedgerError> {
        let result = self
            .request(
                "account_tx",
                json!({
                    "account": address,
                    "limit": limit,
                    "ledger_index_min": -1,
                    "ledger_index_max": -1,
                }),
            )
            .await?;

        let entries = result["transactions"].as_array().cloned().unwrap_or_default();
        Ok(entries.iter().filter_map(parse_tx_record).collect())
    }

    async fn autofill(&self, payment: &PaymentRequest) -> Result<PreparedTx, LedgerError> {
        let mut tx_json = serde_json::to_value(payment)
            .map_err(|e| LedgerError::malformed(format!("Cannot encode payment: {e}")))?;

        let (account, fee, current) = tokio::try_join!(
            self.request(
                "account_info",
                json!({ "account": payment.account, "ledger_index": "current" }),
            ),
            self.request("fee", json!({})),
            self.request("ledger_current", json!({})),
        )?;

        let sequence = as_u32(&account["account_data"]["Sequence"])
            .ok_or_else(|| LedgerError::malformed("account_info has no Sequence"))?;
        let fee = as_string(&fee["drops"]["open_ledger_fee"])
            .or_else(|| as_string(&fee["drops"]["base_fee"]))
            .ok_or_else(|| LedgerError::malformed("fee response has no drops"))?;
        let current = as_u32(&current["ledger_current_index"])
            .ok_or_else(|| LedgerError::malformed("ledger_current has no index"))?;
        let last_ledger_sequence = current + LAST_LEDGER_OFFSET;

        tx_json["Sequence"] = json!(sequence);
        tx_json["Fee"] = json!(fee);
        tx_json["LastLedgerSequence"] = json!(last_ledger_sequence);

        Ok(PreparedTx {
            tx_json,
            last_ledger_sequence: Some(last_ledger_sequence),
        })
    }

    async fn submit_and_wait(&self, signed: &SignedBlob) -> Result<SubmitResult, LedgerError> {
        let submitted = self
            .request("submit", json!({ "tx_blob": signed.tx_blob }))
            .await?;

        let preliminary = as_string(&submitted["engine_result"])
            .ok_or_else(|| LedgerError::malformed("submit response has no engine_result"))?;
        let hash = as_string(&submitted["tx_json"]["hash"]).unwrap_or_else(|| signed.hash.clone());

        tracing::debug!(hash = %hash, preliminary = %preliminary, "Transaction submitted");

        if is_final_preliminary(&preliminary) {
            return Ok(SubmitResult {
                result_code: preliminary,
                transaction_hash: hash,
            });
        }

        let result_code = self
            .poll_final_result(&hash, signed.last_ledger_sequence)
            .await?;

        Ok(SubmitResult {
            result_code,
            transaction_hash: hash,
        })
    }
}

/// Signing provider backed by a node's `sign` method.
///
/// Only usable against a node that has signing enabled; the seed is held
/// by whoever configured the process.
pub struct RpcSigner {
    client: Arc<XrplClient>,
    seed: Option<String>,
}

impl RpcSigner {
    pub fn new(client: Arc<XrplClient>, seed: Option<String>) -> Self {
        Self { client, seed }
    }
}

impl fmt::Debug for RpcSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RpcSigner")
            .field("seed", &self.seed.as_ref().map(|_| "<redacted>"))
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Signer for RpcSigner {
    async fn sign(&self, prepared: &PreparedTx) -> Result<SignedBlob, LedgerError> {
        let seed = self
            .seed
            .as_deref()
            .ok_or_else(|| LedgerError::signing("No signing key configured"))?;

        let result = self
            .client
            .request(
                "sign",
                json!({ "tx_json": prepared.tx_json, "secret": seed, "offline": false }),
            )
            .await
            .map_err(|e| LedgerError::signing(e.message))?;

        Ok(SignedBlob {
            tx_blob: as_string(&result["tx_blob"])
                .ok_or_else(|| LedgerError::signing("sign response has no tx_blob"))?,
            hash: as_string(&result["tx_json"]["hash"]).unwrap_or_default(),
            last_ledger_sequence: prepared.last_ledger_sequence,
        })
    }
}
