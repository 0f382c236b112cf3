use super::transaction::TransactionOutcome;
use crate::error::{ErrorKind, IssuanceError, Result};
use serde::{Deserialize, Serialize};

/// States of one workflow run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WorkflowState {
    Idle,
    Connecting,
    EstablishingTrust,
    VerifyingTrust,
    Issuing,
    Freezing,
    Reporting,
    Done,
    Failed,
}

/// What happened to one submitted transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepReport {
    pub ok: bool,
    pub transaction_hash: Option<String>,
    pub engine_result: Option<String>,
    pub finalized: bool,
    pub error_kind: Option<ErrorKind>,
    pub error_message: Option<String>,
}

impl StepReport {
    pub fn from_result(result: &Result<TransactionOutcome>) -> Self {
        match result {
            Ok(outcome) => Self {
                ok: outcome.is_success(),
                transaction_hash: Some(outcome.transaction_hash.clone()),
                engine_result: Some(outcome.engine_result.clone()),
                finalized: outcome.finalized,
                error_kind: None,
                error_message: None,
            },
            Err(err) => Self {
                ok: false,
                transaction_hash: err.transaction_hash().map(str::to_string),
                engine_result: match err {
                    IssuanceError::SubmissionRejected { engine_result, .. } => {
                        Some(engine_result.clone())
                    }
                    _ => None,
                },
                finalized: false,
                error_kind: Some(err.kind()),
                error_message: Some(err.to_string()),
            },
        }
    }
}

/// Terminal report of one workflow run.
///
/// `ok` tracks whether the payment landed. A freeze failure after a
/// successful payment leaves `ok` set and is reported only under `freeze`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssuanceResult {
    pub ok: bool,
    pub state: WorkflowState,
    pub failed_at: Option<WorkflowState>,
    pub trust_set: Option<StepReport>,
    pub payment: Option<StepReport>,
    pub freeze: Option<StepReport>,
    pub error_kind: Option<ErrorKind>,
    pub error_message: Option<String>,
}

impl IssuanceResult {
    /// Payment landed but the requested freeze did not.
    pub fn is_partial(&self) -> bool {
        self.ok && self.freeze.as_ref().is_some_and(|freeze| !freeze.ok)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_step_report_from_timeout_keeps_hash() {
        let report = StepReport::from_result(&Err(IssuanceError::SubmissionTimeout {
            hash: Some("ABCD".into()),
            waited: Duration::from_secs(30),
        }));
        assert!(!report.ok);
        assert!(!report.finalized);
        assert_eq!(report.transaction_hash.as_deref(), Some("ABCD"));
        assert_eq!(report.error_kind, Some(ErrorKind::SubmissionTimeout));
    }

    #[test]
    fn test_step_report_from_rejection_keeps_engine_result() {
        let report = StepReport::from_result(&Err(IssuanceError::SubmissionRejected {
            hash: None,
            engine_result: "tecNO_LINE".into(),
            message: "No such line.".into(),
        }));
        assert_eq!(report.engine_result.as_deref(), Some("tecNO_LINE"));
        assert_eq!(report.error_kind, Some(ErrorKind::SubmissionRejected));
    }

    #[test]
    fn test_result_json_uses_camel_case() {
        let result = IssuanceResult {
            ok: false,
            state: WorkflowState::Failed,
            failed_at: Some(WorkflowState::VerifyingTrust),
            trust_set: None,
            payment: None,
            freeze: None,
            error_kind: Some(ErrorKind::TrustLineMissing),
            error_message: Some("missing".into()),
        };
        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["failedAt"], "VerifyingTrust");
        assert_eq!(value["errorKind"], "TrustLineMissing");
        assert!(value["payment"].is_null());
    }
}
