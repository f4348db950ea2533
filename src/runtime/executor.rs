//! Session runtime executor

use super::submission::submit_payment;
use super::{SessionError, SessionEvent, SessionHandle};
use crate::history::{build_history, HistoryEntry};
use crate::ledger::{LedgerClient, Signer};
use crate::reconciler::{BalanceReconciler, Freshness};
use crate::state_machine::{
    transition, BalanceReport, Effect, Event, LifecycleState, Notice, SessionContext,
};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, oneshot, watch};

/// An event plus, for caller-originated events, where to send the result
pub(crate) struct Command {
    event: Event,
    reply: Option<oneshot::Sender<Result<(), SessionError>>>,
}

impl Command {
    pub(crate) fn with_reply(event: Event, reply: oneshot::Sender<Result<(), SessionError>>) -> Self {
        Self {
            event,
            reply: Some(reply),
        }
    }

    fn internal(event: Event) -> Self {
        Self { event, reply: None }
    }
}

/// Generic session runtime that can work with any ledger client and signer
pub struct SessionRuntime<L, S>
where
    L: LedgerClient + 'static,
    S: Signer + 'static,
{
    context: SessionContext,
    state: LifecycleState,
    ledger: Arc<L>,
    signer: Arc<S>,
    reconciler: BalanceReconciler<L>,
    command_rx: mpsc::Receiver<Command>,
    /// Weak so the loop ends once every handle is dropped
    command_tx: mpsc::WeakSender<Command>,
    state_tx: watch::Sender<LifecycleState>,
    history_tx: watch::Sender<Vec<HistoryEntry>>,
    broadcast_tx: broadcast::Sender<SessionEvent>,
}

impl<L, S> SessionRuntime<L, S>
where
    L: LedgerClient + 'static,
    S: Signer + 'static,
{
    pub fn new(context: SessionContext, ledger: Arc<L>, signer: Arc<S>) -> (Self, SessionHandle) {
        let (command_tx, command_rx) = mpsc::channel(32);
        let (broadcast_tx, _) = broadcast::channel(128);
        let (state_tx, state_rx) = watch::channel(LifecycleState::Idle);
        let (history_tx, history_rx) = watch::channel(Vec::new());
        let reconciler = BalanceReconciler::new(ledger.clone());

        let handle = SessionHandle {
            ledger: ledger.clone(),
            command_tx: command_tx.clone(),
            state_rx,
            snapshot_rx: reconciler.subscribe(),
            history_rx,
            broadcast_tx: broadcast_tx.clone(),
        };

        let runtime = Self {
            context,
            state: LifecycleState::Idle,
            ledger,
            signer,
            reconciler,
            command_rx,
            command_tx: command_tx.downgrade(),
            state_tx,
            history_tx,
            broadcast_tx,
        };

        (runtime, handle)
    }

    pub async fn run(mut self) {
        tracing::info!(account = %self.context.account, "Starting session runtime");

        // Process events in a loop - no recursion
        while let Some(command) = self.command_rx.recv().await {
            let result = self.process_event(command.event).await;
            match command.reply {
                Some(reply) => {
                    let _ = reply.send(result);
                }
                None => {
                    if let Err(e) = result {
                        tracing::error!(error = %e, "Error handling internal event");
                    }
                }
            }
        }

        tracing::info!(account = %self.context.account, "Session runtime stopped");
    }

    async fn process_event(&mut self, event: Event) -> Result<(), SessionError> {
        // Effects may generate follow-up events (e.g. the settlement drain)
        let mut events_to_process = vec![event];

        while let Some(current_event) = events_to_process.pop() {
            let event_name = current_event.name();

            // Pure state transition
            let result = match transition(&self.state, &self.context, current_event) {
                Ok(r) => r,
                Err(e) => {
                    tracing::warn!(state = self.state.name(), event = event_name, error = %e, "Transition rejected");
                    let _ = self.broadcast_tx.send(SessionEvent::Error {
                        message: e.to_string(),
                    });
                    return Err(e.into());
                }
            };

            let old_state = std::mem::replace(&mut self.state, result.new_state);
            if old_state.name() != self.state.name() {
                tracing::info!(
                    from = old_state.name(),
                    to = self.state.name(),
                    event = event_name,
                    "Lifecycle transition"
                );
            }

            for effect in result.effects {
                if let Some(generated_event) = self.execute_effect(effect).await? {
                    events_to_process.push(generated_event);
                }
            }
        }

        Ok(())
    }

    async fn execute_effect(&mut self, effect: Effect) -> Result<Option<Event>, SessionError> {
        match effect {
            Effect::PublishState => {
                self.state_tx.send_replace(self.state.clone());
                let _ = self.broadcast_tx.send(SessionEvent::StateChange {
                    state: self.state.clone(),
                });
                Ok(None)
            }

            Effect::Notify(notice) => {
                let _ = self.broadcast_tx.send(SessionEvent::Notice(notice));
                Ok(None)
            }

            Effect::SubmitPayment { pending } => {
                let Some(event_tx) = self.command_tx.upgrade() else {
                    return Err(SessionError::Closed);
                };
                let ledger = self.ledger.clone();
                let signer = self.signer.clone();
                let account = self.context.account.clone();

                // Runs off the event loop; the lifecycle stays in Submitting
                // until the outcome comes back as an event.
                tokio::spawn(async move {
                    let outcome =
                        submit_payment(ledger.as_ref(), signer.as_ref(), &account, &pending.intent)
                            .await;
                    if event_tx
                        .send(Command::internal(Event::SubmissionResolved { outcome }))
                        .await
                        .is_err()
                    {
                        tracing::warn!("Session closed before submission resolved");
                    }
                });
                Ok(None)
            }

            Effect::RefreshBalance { report } => {
                let freshness = self.reconciler.refresh(self.context.account.as_str()).await;
                if let Some(snapshot) = freshness.snapshot() {
                    let _ = self
                        .broadcast_tx
                        .send(SessionEvent::Snapshot(snapshot.clone()));
                }
                if let Some(notice) = balance_notice(report, &freshness) {
                    let _ = self.broadcast_tx.send(SessionEvent::Notice(notice));
                }
                Ok(None)
            }

            Effect::FetchHistory { limit } => {
                let address = self.context.account.as_str();
                let records = match self.ledger.transaction_history(address, limit).await {
                    Ok(records) => records,
                    Err(e) => {
                        let _ = self.broadcast_tx.send(SessionEvent::Notice(Notice::error(
                            format!("Error fetching transaction history: {e}"),
                        )));
                        return Err(e.into());
                    }
                };

                let entries = build_history(&records, address);
                tracing::debug!(records = records.len(), entries = entries.len(), "History rebuilt");
                if entries.is_empty() {
                    let _ = self
                        .broadcast_tx
                        .send(SessionEvent::Notice(Notice::info("No transactions found")));
                }
                self.history_tx.send_replace(entries.clone());
                let _ = self.broadcast_tx.send(SessionEvent::History(entries));
                Ok(None)
            }

            Effect::DrainSettlement => Ok(Some(Event::SettlementDrained)),
        }
    }
}

fn balance_notice(report: BalanceReport, freshness: &Freshness) -> Option<Notice> {
    let notice = match (report, freshness) {
        (BalanceReport::Quiet, _) => return None,
        (BalanceReport::Balance, Freshness::Fresh(s)) => {
            Notice::info(format!("Balance: {} XRP", s.balance))
        }
        (BalanceReport::AccountInfo, Freshness::Fresh(s)) => Notice::info(format!(
            "Account {}: balance {} XRP, sequence {}, type {}",
            s.address, s.balance, s.sequence, s.account_type
        )),
        (_, Freshness::Stale(Some(s))) => Notice::error(format!(
            "Could not refresh account data. Last known balance: {} XRP",
            s.balance
        )),
        (_, Freshness::Stale(None)) => {
            Notice::error("Could not fetch account data. Is the account funded?")
        }
    };
    Some(notice)
}
