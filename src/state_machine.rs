//! Transaction lifecycle state machine
//!
//! Implements the Elm Architecture pattern with pure state transitions.

pub mod effect;
pub mod event;
mod state;
mod transition;


pub use effect::{BalanceReport, Effect, Notice, NoticeLevel};
pub use event::Event;
pub use state::{
    FailureCause, LifecycleState, PendingTransaction, SessionContext, SettlementOutcome,
};
pub use transition::{transition, TransitionError};
