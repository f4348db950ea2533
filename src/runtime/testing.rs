//! Mock implementations for testing
//!
//! These mocks enable integration testing of the session runtime without
//! a ledger node.

use crate::intent::Address;
use crate::ledger::{
    AccountSnapshot, LedgerClient, LedgerError, PaymentRequest, PreparedTx, RawTxRecord,
    SignedBlob, Signer, SubmitResult,
};
use crate::runtime::{spawn_session, SessionEvent, SessionHandle};
use crate::state_machine::{LifecycleState, SessionContext, SettlementOutcome};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::broadcast;

pub const TEST_ACCOUNT: &str = "rHb9CJAWyB4rj91VRWn96DkukG4bwdtyTh";

// ============================================================================
// Mock Ledger Client
// ============================================================================

/// Mock ledger client that returns queued results
#[allow(dead_code)]
pub struct MockLedgerClient {
    connected: AtomicBool,
    accounts: Mutex<VecDeque<Result<AccountSnapshot, LedgerError>>>,
    histories: Mutex<VecDeque<Result<Vec<RawTxRecord>, LedgerError>>>,
    autofill_errors: Mutex<VecDeque<LedgerError>>,
    submissions: Mutex<VecDeque<Result<SubmitResult, LedgerError>>>,
    submit_delay: Option<Duration>,
    /// Record of all account queries made
    pub account_queries: Mutex<Vec<String>>,
    /// Record of all payments passed to autofill
    pub payments: Mutex<Vec<PaymentRequest>>,
    /// Record of all signed blobs submitted
    pub submitted: Mutex<Vec<SignedBlob>>,
}

#[allow(dead_code)]
impl MockLedgerClient {
    pub fn new() -> Self {
        Self {
            connected: AtomicBool::new(true),
            accounts: Mutex::new(VecDeque::new()),
            histories: Mutex::new(VecDeque::new()),
            autofill_errors: Mutex::new(VecDeque::new()),
            submissions: Mutex::new(VecDeque::new()),
            submit_delay: None,
            account_queries: Mutex::new(Vec::new()),
            payments: Mutex::new(Vec::new()),
            submitted: Mutex::new(Vec::new()),
        }
    }

    /// Hold every submission for `delay` before answering
    pub fn with_submit_delay(mut self, delay: Duration) -> Self {
        self.submit_delay = Some(delay);
        self
    }

    pub fn snapshot(address: &str, balance: &str) -> AccountSnapshot {
        AccountSnapshot {
            address: address.to_string(),
            balance: balance.parse().expect("valid decimal"),
            sequence: 1,
            account_type: "Regular".to_string(),
            regular_key: None,
        }
    }

    pub fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::SeqCst);
    }

    pub fn queue_account(&self, result: Result<AccountSnapshot, LedgerError>) {
        self.accounts.lock().unwrap().push_back(result);
    }

    pub fn queue_history(&self, result: Result<Vec<RawTxRecord>, LedgerError>) {
        self.histories.lock().unwrap().push_back(result);
    }

    pub fn queue_autofill_error(&self, error: LedgerError) {
        self.autofill_errors.lock().unwrap().push_back(error);
    }

    pub fn queue_submission(&self, result: Result<SubmitResult, LedgerError>) {
        self.submissions.lock().unwrap().push_back(result);
    }

    pub fn recorded_payments(&self) -> Vec<PaymentRequest> {
        self.payments.lock().unwrap().clone()
    }

    pub fn recorded_submissions(&self) -> Vec<SignedBlob> {
        self.submitted.lock().unwrap().clone()
    }

    pub fn account_query_count(&self) -> usize {
        self.account_queries.lock().unwrap().len()
    }
}

impl Default for MockLedgerClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LedgerClient for MockLedgerClient {
    async fn connect(&self) -> Result<(), LedgerError> {
        self.set_connected(true);
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    async fn account_info(&self, address: &str) -> Result<AccountSnapshot, LedgerError> {
        self.account_queries.lock().unwrap().push(address.to_string());
        self.accounts
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(LedgerError::network("No mock account queued")))
    }

    async fn transaction_history(
        &self,
        _address: &str,
        _limit: u32,
    ) -> Result<Vec<RawTxRecord>, LedgerError> {
        self.histories
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(Vec::new()))
    }

    async fn autofill(&self, payment: &PaymentRequest) -> Result<PreparedTx, LedgerError> {
        self.payments.lock().unwrap().push(payment.clone());
        if let Some(error) = self.autofill_errors.lock().unwrap().pop_front() {
            return Err(error);
        }
        let mut tx_json = serde_json::to_value(payment).expect("payment serializes");
        tx_json["Sequence"] = serde_json::json!(1);
        tx_json["Fee"] = serde_json::json!("12");
        tx_json["LastLedgerSequence"] = serde_json::json!(120);
        Ok(PreparedTx {
            tx_json,
            last_ledger_sequence: Some(120),
        })
    }

    async fn submit_and_wait(&self, signed: &SignedBlob) -> Result<SubmitResult, LedgerError> {
        self.submitted.lock().unwrap().push(signed.clone());
        if let Some(delay) = self.submit_delay {
            tokio::time::sleep(delay).await;
        }
        self.submissions
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(LedgerError::network("No mock submission queued")))
    }
}

// ============================================================================
// Mock Signer
// ============================================================================

/// Mock signer producing deterministic blobs, or always failing
pub struct MockSigner {
    failure: Option<LedgerError>,
    signed: AtomicU32,
}

#[allow(dead_code)]
impl MockSigner {
    pub fn new() -> Self {
        Self {
            failure: None,
            signed: AtomicU32::new(0),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            failure: Some(LedgerError::signing(message)),
            signed: AtomicU32::new(0),
        }
    }

    pub fn signed_count(&self) -> u32 {
        self.signed.load(Ordering::SeqCst)
    }
}

impl Default for MockSigner {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Signer for MockSigner {
    async fn sign(&self, prepared: &PreparedTx) -> Result<SignedBlob, LedgerError> {
        if let Some(error) = &self.failure {
            return Err(error.clone());
        }
        let n = self.signed.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(SignedBlob {
            tx_blob: format!("BLOB{n}"),
            hash: format!("HASH{n}"),
            last_ledger_sequence: prepared.last_ledger_sequence,
        })
    }
}

// ============================================================================
// Test Session
// ============================================================================

/// A running session wired to mocks
pub struct TestSession {
    pub handle: SessionHandle,
    pub ledger: Arc<MockLedgerClient>,
    pub signer: Arc<MockSigner>,
    pub events: broadcast::Receiver<SessionEvent>,
    /// Notices read off `events` while waiting for something else
    seen_notices: Vec<String>,
}

impl TestSession {
    pub fn new() -> Self {
        Self::with(MockLedgerClient::new(), MockSigner::new())
    }

    pub fn with(ledger: MockLedgerClient, signer: MockSigner) -> Self {
        let ledger = Arc::new(ledger);
        let signer = Arc::new(signer);
        let context = SessionContext::new(Address::parse(TEST_ACCOUNT).expect("valid address"), 20);
        let handle = spawn_session(context, ledger.clone(), signer.clone());
        let events = handle.subscribe();
        Self {
            handle,
            ledger,
            signer,
            events,
            seen_notices: Vec::new(),
        }
    }

    /// Wait for a settled outcome followed by the drain back to Idle
    pub async fn wait_for_settlement(&mut self, timeout: Duration) -> Option<SettlementOutcome> {
        let deadline = tokio::time::Instant::now() + timeout;
        let mut settled = None;
        while tokio::time::Instant::now() < deadline {
            match tokio::time::timeout(Duration::from_millis(50), self.events.recv()).await {
                Ok(Ok(SessionEvent::StateChange {
                    state: LifecycleState::Settled { outcome },
                })) => settled = Some(outcome),
                Ok(Ok(SessionEvent::StateChange {
                    state: LifecycleState::Idle,
                })) if settled.is_some() => return settled,
                Ok(Ok(SessionEvent::Notice(notice))) => self.seen_notices.push(notice.message),
                _ => continue,
            }
        }
        None
    }

    /// Notices received so far, including those passed while waiting
    pub fn drain_notices(&mut self) -> Vec<String> {
        let mut notices = std::mem::take(&mut self.seen_notices);
        while let Ok(event) = self.events.try_recv() {
            if let SessionEvent::Notice(notice) = event {
                notices.push(notice.message);
            }
        }
        notices
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::{LedgerErrorKind, TxAmount, SUCCESS_RESULT};
    use crate::router::RoutedOutcome;
    use crate::runtime::SessionError;
    use crate::state_machine::{FailureCause, TransitionError};
    use rust_decimal::Decimal;

    const DEST: &str = "rN7n7otELRKCpo4KJkNgSfCxp4oTajWjZn";
    const WAIT: Duration = Duration::from_secs(5);

    fn result(code: &str, hash: &str) -> SubmitResult {
        SubmitResult {
            result_code: code.to_string(),
            transaction_hash: hash.to_string(),
        }
    }

    async fn propose_and_confirm(session: &TestSession, text: &str) {
        let outcome = session.handle.submit_free_text(text).await.unwrap();
        assert!(matches!(outcome, RoutedOutcome::TransferProposed { .. }));
        session.handle.confirm_pending().await.unwrap();
    }

    #[tokio::test]
    async fn test_successful_transfer_refreshes_balance_before_idle() {
        let mut session = TestSession::new();
        session.ledger.queue_submission(Ok(result(SUCCESS_RESULT, "ABC123")));
        session
            .ledger
            .queue_account(Ok(MockLedgerClient::snapshot(TEST_ACCOUNT, "84.5")));

        propose_and_confirm(
            &session,
            &format!("Send 15.5 XRP to {DEST} with memo 'Invoice #1234'"),
        )
        .await;

        let outcome = session.wait_for_settlement(WAIT).await.expect("settled");
        assert_eq!(
            outcome,
            SettlementOutcome::Success {
                transaction_hash: "ABC123".to_string(),
                amount: "15.5".parse().unwrap(),
                destination: Address::parse(DEST).unwrap(),
            }
        );
        assert_eq!(session.handle.state(), LifecycleState::Idle);
        assert_eq!(
            session.handle.snapshot().unwrap().balance,
            "84.5".parse::<Decimal>().unwrap()
        );

        let payments = session.ledger.recorded_payments();
        assert_eq!(payments.len(), 1);
        assert_eq!(payments[0].amount, "15500000");
        assert_eq!(payments[0].account, TEST_ACCOUNT);
        assert_eq!(payments[0].destination_tag, None);
        assert_eq!(payments[0].memos[0].memo.memo_data, "496E766F696365202331323334");
        assert_eq!(session.ledger.recorded_submissions()[0].tx_blob, "BLOB1");
    }

    #[tokio::test]
    async fn test_rejection_keeps_code_and_balance() {
        let mut session = TestSession::new();
        session
            .ledger
            .queue_account(Ok(MockLedgerClient::snapshot(TEST_ACCOUNT, "100")));
        session.handle.refresh_balance().await.unwrap();
        session
            .ledger
            .queue_submission(Ok(result("tecUNFUNDED_PAYMENT", "DEF456")));

        propose_and_confirm(&session, &format!("Send 500 XRP to {DEST}")).await;

        let outcome = session.wait_for_settlement(WAIT).await.expect("settled");
        let SettlementOutcome::Failure {
            result_code, cause, ..
        } = outcome
        else {
            panic!("expected failure");
        };
        assert_eq!(result_code, "tecUNFUNDED_PAYMENT");
        assert_eq!(cause, FailureCause::LedgerRejection);

        assert_eq!(session.ledger.account_query_count(), 1);
        assert_eq!(session.handle.snapshot().unwrap().balance, Decimal::from(100));
        assert!(session
            .drain_notices()
            .iter()
            .any(|n| n.contains("tecUNFUNDED_PAYMENT")));
    }

    #[tokio::test]
    async fn test_transport_failure_settles_as_failure() {
        let mut session = TestSession::new();
        session
            .ledger
            .queue_submission(Err(LedgerError::network("connection reset")));

        propose_and_confirm(&session, &format!("Pay 1 XRP to {DEST}")).await;

        let outcome = session.wait_for_settlement(WAIT).await.expect("settled");
        assert!(matches!(
            outcome,
            SettlementOutcome::Failure { cause: FailureCause::Submission, ref result_code, .. }
                if result_code == LedgerErrorKind::Network.code()
        ));
        assert_eq!(session.ledger.account_query_count(), 0);
    }

    #[tokio::test]
    async fn test_timeout_settles_as_failure() {
        let mut session = TestSession::new();
        session
            .ledger
            .queue_submission(Err(LedgerError::timeout("LastLedgerSequence passed")));

        propose_and_confirm(&session, &format!("Pay 1 XRP to {DEST}")).await;

        let outcome = session.wait_for_settlement(WAIT).await.expect("settled");
        assert!(matches!(
            outcome,
            SettlementOutcome::Failure {
                cause: FailureCause::Timeout,
                ..
            }
        ));
        assert_eq!(session.handle.state(), LifecycleState::Idle);
    }

    #[tokio::test]
    async fn test_signing_failure_never_submits() {
        let mut session = TestSession::with(MockLedgerClient::new(), MockSigner::failing("locked"));

        propose_and_confirm(&session, &format!("Pay 1 XRP to {DEST}")).await;

        let outcome = session.wait_for_settlement(WAIT).await.expect("settled");
        assert!(matches!(
            outcome,
            SettlementOutcome::Failure {
                cause: FailureCause::Submission,
                ..
            }
        ));
        assert!(session.ledger.recorded_submissions().is_empty());
    }

    #[tokio::test]
    async fn test_autofill_failure_never_signs() {
        let mut session = TestSession::new();
        session
            .ledger
            .queue_autofill_error(LedgerError::not_found("actNotFound"));

        propose_and_confirm(&session, &format!("Pay 1 XRP to {DEST}")).await;

        assert!(session.wait_for_settlement(WAIT).await.is_some());
        assert_eq!(session.signer.signed_count(), 0);
    }

    #[tokio::test]
    async fn test_cancel_discards_intent() {
        let mut session = TestSession::new();
        let mut state_rx = session.handle.subscribe_state();
        session
            .handle
            .submit_free_text(&format!("Send 10 XRP to {DEST}"))
            .await
            .unwrap();
        assert!(matches!(
            session.handle.state(),
            LifecycleState::PendingConfirmation { .. }
        ));

        assert!(state_rx.has_changed().unwrap());
        state_rx.borrow_and_update();

        session.handle.cancel_pending().await.unwrap();
        assert_eq!(*state_rx.borrow_and_update(), LifecycleState::Idle);
        assert!(session.ledger.recorded_payments().is_empty());
        assert_eq!(session.ledger.account_query_count(), 0);
        assert!(session
            .drain_notices()
            .contains(&"Transaction cancelled".to_string()));

        let again = session.handle.cancel_pending().await;
        assert!(matches!(
            again,
            Err(SessionError::Transition(TransitionError::NoPendingTransfer))
        ));
    }

    #[tokio::test]
    async fn test_confirm_with_nothing_pending_is_error() {
        let session = TestSession::new();
        let result = session.handle.confirm_pending().await;
        assert!(matches!(
            result,
            Err(SessionError::Transition(TransitionError::NoPendingTransfer))
        ));
        assert_eq!(session.handle.state(), LifecycleState::Idle);
    }

    #[tokio::test]
    async fn test_balance_while_disconnected() {
        let session = TestSession::new();
        session.ledger.set_connected(false);

        let outcome = session.handle.submit_free_text("balance").await.unwrap();
        assert_eq!(outcome, RoutedOutcome::DisconnectedError);
        assert_eq!(session.ledger.account_query_count(), 0);
    }

    #[tokio::test]
    async fn test_second_proposal_rejected_while_pending() {
        let session = TestSession::new();
        session
            .handle
            .submit_free_text(&format!("Send 10 XRP to {DEST}"))
            .await
            .unwrap();

        let second = session
            .handle
            .submit_free_text(&format!("Send 20 XRP to {DEST}"))
            .await;
        assert!(matches!(
            second,
            Err(SessionError::Transition(TransitionError::TransferAlreadyPending))
        ));

        let LifecycleState::PendingConfirmation { pending } = session.handle.state() else {
            panic!("expected pending confirmation");
        };
        assert_eq!(pending.intent.amount(), Decimal::from(10));
    }

    #[tokio::test]
    async fn test_commands_rejected_while_submitting() {
        let ledger = MockLedgerClient::new().with_submit_delay(Duration::from_millis(300));
        ledger.queue_submission(Ok(result(SUCCESS_RESULT, "ABC")));
        ledger.queue_account(Ok(MockLedgerClient::snapshot(TEST_ACCOUNT, "9")));
        let mut session = TestSession::with(ledger, MockSigner::new());

        propose_and_confirm(&session, &format!("Send 1 XRP to {DEST}")).await;
        assert!(matches!(
            session.handle.state(),
            LifecycleState::Submitting { .. }
        ));

        let cancel = session.handle.cancel_pending().await;
        assert!(matches!(
            cancel,
            Err(SessionError::Transition(TransitionError::SubmissionInFlight))
        ));
        let balance = session.handle.submit_free_text("balance").await;
        assert!(matches!(
            balance,
            Err(SessionError::Transition(TransitionError::SubmissionInFlight))
        ));

        assert!(session.wait_for_settlement(WAIT).await.unwrap().is_success());
        assert_eq!(session.ledger.recorded_submissions().len(), 1);
    }

    #[tokio::test]
    async fn test_unrecognized_leaves_state_alone() {
        let session = TestSession::new();
        let outcome = session.handle.submit_free_text("hello there").await.unwrap();
        assert_eq!(outcome, RoutedOutcome::Unrecognized);
        assert!(outcome.hint().is_some());
        assert_eq!(session.handle.state(), LifecycleState::Idle);
    }

    #[tokio::test]
    async fn test_history_query() {
        let session = TestSession::new();
        session.ledger.queue_history(Ok(vec![RawTxRecord {
            tx_type: "Payment".to_string(),
            amount: Some(TxAmount::Native {
                drops: "2500000".to_string(),
            }),
            account: DEST.to_string(),
            destination: Some(TEST_ACCOUNT.to_string()),
            date: Some(0),
            hash: "H1".to_string(),
        }]));

        let outcome = session
            .handle
            .submit_free_text("show my transaction history")
            .await
            .unwrap();
        assert_eq!(outcome, RoutedOutcome::HistoryQuery);

        session.ledger.queue_history(Err(LedgerError::network("down")));
        assert!(matches!(
            session.handle.request_history().await,
            Err(SessionError::Ledger(_))
        ));
    }

    #[tokio::test]
    async fn test_request_history_returns_entries() {
        let session = TestSession::new();
        session.ledger.queue_history(Ok(vec![RawTxRecord {
            tx_type: "Payment".to_string(),
            amount: Some(TxAmount::Native {
                drops: "2500000".to_string(),
            }),
            account: TEST_ACCOUNT.to_string(),
            destination: Some(DEST.to_string()),
            date: None,
            hash: "H2".to_string(),
        }]));

        let entries = session.handle.request_history().await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].counterparty, DEST);
        assert_eq!(entries[0].amount, "2.5".parse::<Decimal>().unwrap());
    }

    #[tokio::test]
    async fn test_stale_balance_is_not_an_error() {
        let session = TestSession::new();
        session
            .ledger
            .queue_account(Err(LedgerError::network("unreachable")));
        assert_eq!(session.handle.refresh_balance().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_connect_loads_account() {
        let session = TestSession::new();
        session.ledger.set_connected(false);
        session
            .ledger
            .queue_account(Ok(MockLedgerClient::snapshot(TEST_ACCOUNT, "250")));

        session.handle.connect().await.unwrap();
        assert!(session.handle.is_connected());
        assert_eq!(session.handle.snapshot().unwrap().balance, Decimal::from(250));
    }
}
