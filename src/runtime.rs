//! Session runtime
//!
//! One runtime drives one session: it owns the lifecycle state, applies
//! events serially, and executes the effects the state machine returns.
//! The presentation layer talks to it only through [`SessionHandle`].

mod executor;
mod submission;

#[cfg(test)]
pub mod testing;

pub use executor::SessionRuntime;

use crate::history::HistoryEntry;
use crate::ledger::{AccountSnapshot, LedgerClient, LedgerError, Signer};
use crate::router::{self, RoutedOutcome};
use crate::state_machine::{Event, LifecycleState, Notice, SessionContext, TransitionError};
use executor::Command;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{broadcast, mpsc, oneshot, watch};

/// Events sent to subscribers (SSE clients)
#[derive(Debug, Clone)]
pub enum SessionEvent {
    StateChange { state: LifecycleState },
    Notice(Notice),
    Snapshot(AccountSnapshot),
    History(Vec<HistoryEntry>),
    Error { message: String },
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Transition(#[from] TransitionError),
    #[error(transparent)]
    Ledger(#[from] LedgerError),
    #[error("Session runtime is not running")]
    Closed,
}

/// Start a runtime on the current tokio runtime and return its handle
pub fn spawn_session<L, S>(context: SessionContext, ledger: Arc<L>, signer: Arc<S>) -> SessionHandle
where
    L: LedgerClient + 'static,
    S: Signer + 'static,
{
    let (runtime, handle) = SessionRuntime::new(context, ledger, signer);
    tokio::spawn(runtime.run());
    handle
}

/// Handle to interact with a running session
#[derive(Clone)]
pub struct SessionHandle {
    ledger: Arc<dyn LedgerClient>,
    command_tx: mpsc::Sender<Command>,
    state_rx: watch::Receiver<LifecycleState>,
    snapshot_rx: watch::Receiver<Option<AccountSnapshot>>,
    history_rx: watch::Receiver<Vec<HistoryEntry>>,
    broadcast_tx: broadcast::Sender<SessionEvent>,
}

impl SessionHandle {
    /// Route one chat message and feed the result into the lifecycle.
    ///
    /// The routed outcome is returned even when it carries no event
    /// (`Unrecognized`, `DisconnectedError`); lifecycle rejections come
    /// back as `Err`.
    pub async fn submit_free_text(&self, text: &str) -> Result<RoutedOutcome, SessionError> {
        let outcome = router::route(text, self.ledger.is_connected());
        tracing::debug!(outcome = outcome.kind(), "Routed chat message");

        match &outcome {
            RoutedOutcome::DisconnectedError => {
                self.notify(Notice::error(
                    "Not connected to the ledger. Connect first, then try again.",
                ));
            }
            RoutedOutcome::BalanceQuery => self.dispatch(Event::BalanceRequested).await?,
            RoutedOutcome::AccountInfoQuery => self.dispatch(Event::AccountInfoRequested).await?,
            RoutedOutcome::HistoryQuery => self.dispatch(Event::HistoryRequested).await?,
            RoutedOutcome::TransferProposed { intent } => {
                self.dispatch(Event::TransferProposed {
                    intent: intent.clone(),
                })
                .await?;
            }
            RoutedOutcome::Unrecognized => {}
        }

        Ok(outcome)
    }

    /// Confirm the pending transfer. Returns once submission has started.
    pub async fn confirm_pending(&self) -> Result<(), SessionError> {
        self.dispatch(Event::UserConfirm).await
    }

    pub async fn cancel_pending(&self) -> Result<(), SessionError> {
        self.dispatch(Event::UserCancel).await
    }

    /// Refresh and return the cached snapshot (possibly stale)
    pub async fn refresh_balance(&self) -> Result<Option<AccountSnapshot>, SessionError> {
        self.dispatch(Event::BalanceRequested).await?;
        Ok(self.snapshot())
    }

    pub async fn request_account_info(&self) -> Result<Option<AccountSnapshot>, SessionError> {
        self.dispatch(Event::AccountInfoRequested).await?;
        Ok(self.snapshot())
    }

    pub async fn request_history(&self) -> Result<Vec<HistoryEntry>, SessionError> {
        self.dispatch(Event::HistoryRequested).await?;
        Ok(self.history_rx.borrow().clone())
    }

    /// (Re)connect to the ledger and load the account
    pub async fn connect(&self) -> Result<(), SessionError> {
        if let Err(e) = self.ledger.connect().await {
            self.notify(Notice::error(format!("Connection failed: {e}")));
            return Err(e.into());
        }
        self.notify(Notice::success("Connected to the XRP Ledger"));

        // A settling transfer refreshes the account on its own
        if self.state().is_busy() {
            return Ok(());
        }
        match self.dispatch(Event::AccountInfoRequested).await {
            Err(SessionError::Transition(e)) => {
                tracing::debug!(error = %e, "Skipped account load after connect");
                Ok(())
            }
            result => result,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.ledger.is_connected()
    }

    pub fn state(&self) -> LifecycleState {
        self.state_rx.borrow().clone()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<LifecycleState> {
        self.state_rx.clone()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.broadcast_tx.subscribe()
    }

    pub fn snapshot(&self) -> Option<AccountSnapshot> {
        self.snapshot_rx.borrow().clone()
    }

    fn notify(&self, notice: Notice) {
        let _ = self.broadcast_tx.send(SessionEvent::Notice(notice));
    }

    /// Send an event to the runtime and wait until it and its inline
    /// effects have been applied
    async fn dispatch(&self, event: Event) -> Result<(), SessionError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.command_tx
            .send(Command::with_reply(event, reply_tx))
            .await
            .map_err(|_| SessionError::Closed)?;
        reply_rx.await.map_err(|_| SessionError::Closed)?
    }
}
