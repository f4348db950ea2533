//! Payment submission
//!
//! Runs the side effects of one confirmed transfer in order: encode,
//! autofill, sign, submit and wait for finality. Every failure is folded
//! into a [`SettlementOutcome`]; nothing is retried.

use crate::intent::{Address, TransferIntent};
use crate::ledger::{LedgerClient, LedgerError, PaymentRequest, Signer, SubmitResult};
use crate::state_machine::{FailureCause, SettlementOutcome};

pub(super) async fn submit_payment<L, S>(
    ledger: &L,
    signer: &S,
    account: &Address,
    intent: &TransferIntent,
) -> SettlementOutcome
where
    L: LedgerClient + ?Sized,
    S: Signer + ?Sized,
{
    match execute(ledger, signer, account, intent).await {
        Ok(result) if result.is_success() => {
            tracing::info!(
                hash = %result.transaction_hash,
                amount = %intent.amount(),
                destination = %intent.destination(),
                "Payment settled"
            );
            SettlementOutcome::Success {
                transaction_hash: result.transaction_hash,
                amount: intent.amount(),
                destination: intent.destination().clone(),
            }
        }
        Ok(result) => {
            tracing::warn!(
                hash = %result.transaction_hash,
                result_code = %result.result_code,
                "Payment rejected by the ledger"
            );
            SettlementOutcome::Failure {
                message: format!("Ledger returned {}", result.result_code),
                result_code: result.result_code,
                cause: FailureCause::LedgerRejection,
            }
        }
        Err(e) => {
            let cause = if e.kind.is_timeout() {
                FailureCause::Timeout
            } else {
                FailureCause::Submission
            };
            tracing::error!(kind = e.kind.code(), error = %e.message, "Payment submission failed");
            SettlementOutcome::Failure {
                result_code: e.kind.code().to_string(),
                cause,
                message: e.message,
            }
        }
    }
}

async fn execute<L, S>(
    ledger: &L,
    signer: &S,
    account: &Address,
    intent: &TransferIntent,
) -> Result<SubmitResult, LedgerError>
where
    L: LedgerClient + ?Sized,
    S: Signer + ?Sized,
{
    let request = PaymentRequest::from_intent(account.as_str(), intent)?;
    let prepared = ledger.autofill(&request).await?;
    let signed = signer.sign(&prepared).await?;
    tracing::info!(
        hash = %signed.hash,
        last_ledger_sequence = ?signed.last_ledger_sequence,
        "Submitting signed payment"
    );
    ledger.submit_and_wait(&signed).await
}
