//! Pure state transition function

use super::effect::{BalanceReport, Notice};
use super::state::{LifecycleState, PendingTransaction, SessionContext, SettlementOutcome};
use super::{Effect, Event};
use crate::intent::TransferIntent;
use thiserror::Error;

/// Result of a state transition
#[derive(Debug)]
pub struct TransitionResult {
    pub new_state: LifecycleState,
    pub effects: Vec<Effect>,
}

impl TransitionResult {
    pub fn new(state: LifecycleState) -> Self {
        Self {
            new_state: state,
            effects: vec![],
        }
    }

    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }

    pub fn with_effects(mut self, effects: impl IntoIterator<Item = Effect>) -> Self {
        self.effects.extend(effects);
        self
    }
}

/// Errors that can occur during transition. None of them change state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("No transaction is awaiting confirmation")]
    NoPendingTransfer,
    #[error("A transaction is already awaiting confirmation (confirm or cancel it first)")]
    TransferAlreadyPending,
    #[error("A transaction is being submitted, please wait for it to settle")]
    SubmissionInFlight,
    #[error("Invalid transition: {0}")]
    InvalidTransition(String),
}

/// Pure transition function
///
/// Given the same inputs it always produces the same outputs; all I/O is
/// described by the returned effects.
pub fn transition(
    state: &LifecycleState,
    context: &SessionContext,
    event: Event,
) -> Result<TransitionResult, TransitionError> {
    match (state, event) {
        // ============================================================
        // Proposal
        // ============================================================

        (LifecycleState::Idle, Event::TransferProposed { intent }) => {
            let prompt = confirmation_prompt(&intent);
            Ok(TransitionResult::new(LifecycleState::PendingConfirmation {
                pending: PendingTransaction::new(intent),
            })
            .with_effect(Effect::PublishState)
            .with_effect(Effect::notify_info(prompt)))
        }

        (LifecycleState::PendingConfirmation { .. }, Event::TransferProposed { .. }) => {
            Err(TransitionError::TransferAlreadyPending)
        }

        // ============================================================
        // Confirmation and cancellation
        // ============================================================

        (LifecycleState::PendingConfirmation { pending }, Event::UserConfirm) => {
            let pending = pending.clone().into_submitted();
            Ok(TransitionResult::new(LifecycleState::Submitting {
                pending: pending.clone(),
            })
            .with_effect(Effect::PublishState)
            .with_effect(Effect::SubmitPayment { pending }))
        }

        (LifecycleState::PendingConfirmation { .. }, Event::UserCancel) => {
            Ok(TransitionResult::new(LifecycleState::Idle)
                .with_effect(Effect::PublishState)
                .with_effect(Effect::notify_info("Transaction cancelled")))
        }

        (LifecycleState::Idle, Event::UserConfirm | Event::UserCancel) => {
            Err(TransitionError::NoPendingTransfer)
        }

        // ============================================================
        // Settlement
        // ============================================================

        (LifecycleState::Submitting { .. }, Event::SubmissionResolved { outcome }) => {
            let notice = settlement_notice(&outcome);
            let refresh = outcome.is_success().then_some(Effect::RefreshBalance {
                report: BalanceReport::Quiet,
            });
            Ok(TransitionResult::new(LifecycleState::Settled { outcome })
                .with_effect(Effect::PublishState)
                .with_effect(Effect::Notify(notice))
                .with_effects(refresh)
                .with_effect(Effect::DrainSettlement))
        }

        (LifecycleState::Settled { .. }, Event::SettlementDrained) => {
            Ok(TransitionResult::new(LifecycleState::Idle).with_effect(Effect::PublishState))
        }

        // ============================================================
        // Queries: state unchanged
        // ============================================================

        (
            LifecycleState::Idle | LifecycleState::PendingConfirmation { .. },
            Event::BalanceRequested,
        ) => Ok(TransitionResult::new(state.clone()).with_effect(Effect::RefreshBalance {
            report: BalanceReport::Balance,
        })),

        (
            LifecycleState::Idle | LifecycleState::PendingConfirmation { .. },
            Event::AccountInfoRequested,
        ) => Ok(TransitionResult::new(state.clone()).with_effect(Effect::RefreshBalance {
            report: BalanceReport::AccountInfo,
        })),

        (
            LifecycleState::Idle | LifecycleState::PendingConfirmation { .. },
            Event::HistoryRequested,
        ) => Ok(TransitionResult::new(state.clone()).with_effect(Effect::FetchHistory {
            limit: context.history_limit,
        })),

        // ============================================================
        // Busy: submission unresolved or not yet drained
        // ============================================================

        (
            LifecycleState::Submitting { .. } | LifecycleState::Settled { .. },
            Event::TransferProposed { .. }
            | Event::UserConfirm
            | Event::UserCancel
            | Event::BalanceRequested
            | Event::AccountInfoRequested
            | Event::HistoryRequested,
        ) => Err(TransitionError::SubmissionInFlight),

        // ============================================================
        // Everything else
        // ============================================================

        (state, event) => Err(TransitionError::InvalidTransition(format!(
            "No transition from {} with event {}",
            state.name(),
            event.name()
        ))),
    }
}

fn confirmation_prompt(intent: &TransferIntent) -> String {
    let mut prompt = format!(
        "Confirm transaction: send {} XRP to {}",
        intent.amount(),
        intent.destination()
    );
    if let Some(tag) = intent.destination_tag() {
        prompt.push_str(&format!(", destination tag {tag}"));
    }
    if let Some(memo) = intent.memo() {
        prompt.push_str(&format!(", memo \"{memo}\""));
    }
    prompt
}

fn settlement_notice(outcome: &SettlementOutcome) -> Notice {
    if outcome.is_success() {
        Notice::success(outcome.describe())
    } else {
        Notice::error(outcome.describe())
    }
}
