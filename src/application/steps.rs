//! The individual workflow steps. Each one reports its own failure kind and
//! leaves sequencing to the engine.

use crate::domain::currency::CurrencyCode;
use crate::domain::ports::{LedgerSession, Signer};
use crate::domain::transaction::{AccountId, Amount, TransactionDraft, TransactionOutcome};
use crate::error::{IssuanceError, Result};
use std::time::Duration;
use tracing::{debug, info};

/// Checks that `holder` already trusts `issuer` for `currency`.
pub async fn verify_trust_line(
    session: &mut dyn LedgerSession,
    holder: &AccountId,
    issuer: &AccountId,
    currency: &CurrencyCode,
) -> Result<()> {
    let view = session.query_trust_lines(holder, issuer).await?;
    debug!(lines = view.lines.len(), "fetched holder trust lines");

    if view.has_line(issuer, currency) {
        Ok(())
    } else {
        Err(IssuanceError::TrustLineMissing {
            holder: holder.to_string(),
            issuer: issuer.to_string(),
            currency: currency.to_string(),
        })
    }
}

/// Autofills, signs and submits `draft`, then waits up to `deadline` for
/// the ledger to finalize it.
///
/// Only the wait is bounded by `deadline`. When it elapses the outcome is
/// unknown and the error carries the hash for reconciliation.
pub async fn submit_and_wait(
    session: &mut dyn LedgerSession,
    signer: &dyn Signer,
    draft: TransactionDraft,
    deadline: Duration,
) -> Result<TransactionOutcome> {
    let transaction_type = draft.transaction_type();
    let prepared = session.autofill(draft).await?;
    let signed = signer.sign(&prepared).await?;
    debug!(
        transaction_type,
        hash = %signed.hash,
        sequence = prepared.sequence,
        fee = %prepared.fee,
        "submitting signed transaction"
    );

    let outcome = match tokio::time::timeout(deadline, session.submit_signed(&signed)).await {
        Ok(result) => result.map_err(|e| e.with_hash(&signed.hash))?,
        Err(_) => {
            return Err(IssuanceError::SubmissionTimeout {
                hash: Some(signed.hash),
                waited: deadline,
            });
        }
    };

    if outcome.is_success() {
        info!(transaction_type, hash = %outcome.transaction_hash, "transaction validated");
        return Ok(outcome);
    }

    let message = if outcome.finalized {
        "validated without applying its effect"
    } else {
        "refused before reaching a validated ledger"
    };
    Err(IssuanceError::SubmissionRejected {
        hash: Some(outcome.transaction_hash),
        engine_result: outcome.engine_result,
        message: message.to_string(),
    })
}

/// Pays `amount` of the issuer's `currency` to `holder`.
pub async fn issue(
    session: &mut dyn LedgerSession,
    issuer: &dyn Signer,
    holder: &AccountId,
    currency: &CurrencyCode,
    amount: &Amount,
    deadline: Duration,
) -> Result<TransactionOutcome> {
    let draft = TransactionDraft::payment(issuer.address(), holder, currency, amount);
    submit_and_wait(session, issuer, draft, deadline).await
}

/// Freezes the holder's line from the issuer's side.
pub async fn freeze(
    session: &mut dyn LedgerSession,
    issuer: &dyn Signer,
    holder: &AccountId,
    currency: &CurrencyCode,
    deadline: Duration,
) -> Result<TransactionOutcome> {
    let draft = TransactionDraft::freeze(issuer.address(), holder, currency);
    submit_and_wait(session, issuer, draft, deadline).await
}

/// Has the holder open a line to the issuer with the given limit.
pub async fn establish_trust(
    session: &mut dyn LedgerSession,
    holder: &dyn Signer,
    issuer: &AccountId,
    currency: &CurrencyCode,
    limit: &Amount,
    deadline: Duration,
) -> Result<TransactionOutcome> {
    let draft = TransactionDraft::trust_set(holder.address(), issuer, currency, limit);
    submit_and_wait(session, holder, draft, deadline).await
}
