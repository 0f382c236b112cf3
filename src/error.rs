use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Failure taxonomy of an issuance workflow.
///
/// Every step reports its own variant; the orchestrator never collapses two
/// variants into one. The retry posture of each kind is documented on
/// [`ErrorKind`].
#[derive(Error, Debug, Clone, PartialEq)]
pub enum IssuanceError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error("invalid currency code {code:?}: {reason}")]
    InvalidCurrencyCode { code: String, reason: String },
    #[error("invalid credential: {0}")]
    InvalidCredential(String),
    #[error("holder {holder} has no {currency} trust line to issuer {issuer}")]
    TrustLineMissing {
        holder: String,
        issuer: String,
        currency: String,
    },
    #[error("cannot reach ledger node {endpoint}: {reason}")]
    Connection { endpoint: String, reason: String },
    #[error("ledger session lost: {reason}")]
    ConnectionLost {
        hash: Option<String>,
        reason: String,
    },
    #[error("ledger rejected transaction with {engine_result}: {message}")]
    SubmissionRejected {
        hash: Option<String>,
        engine_result: String,
        message: String,
    },
    #[error("transaction {} not finalized within {waited:?}", hash.as_deref().unwrap_or("<unknown>"))]
    SubmissionTimeout {
        hash: Option<String>,
        waited: Duration,
    },
    #[error("ledger node returned {code}: {message}")]
    Node { code: String, message: String },
}

/// Machine-readable error kind, serialized with the taxonomy names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorKind {
    /// Malformed or missing fields. Nothing was sent anywhere.
    InvalidRequest,
    InvalidCurrencyCode,
    /// Business rejection. No transaction was submitted.
    TrustLineMissing,
    /// The node could not be reached. Nothing was submitted.
    ConnectionError,
    /// The session dropped after it was established; ambiguous if a
    /// submission was in flight.
    ConnectionLost,
    /// Definitive refusal by the ledger. Safe to fix and retry.
    SubmissionRejected,
    /// Ambiguous. The caller must look the transaction up before resubmitting.
    SubmissionTimeout,
    InvalidCredential,
    NodeError,
}

impl IssuanceError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidRequest(_) => ErrorKind::InvalidRequest,
            Self::InvalidCurrencyCode { .. } => ErrorKind::InvalidCurrencyCode,
            Self::InvalidCredential(_) => ErrorKind::InvalidCredential,
            Self::TrustLineMissing { .. } => ErrorKind::TrustLineMissing,
            Self::Connection { .. } => ErrorKind::ConnectionError,
            Self::ConnectionLost { .. } => ErrorKind::ConnectionLost,
            Self::SubmissionRejected { .. } => ErrorKind::SubmissionRejected,
            Self::SubmissionTimeout { .. } => ErrorKind::SubmissionTimeout,
            Self::Node { .. } => ErrorKind::NodeError,
        }
    }

    /// Hash of the transaction the error refers to, when one was signed.
    pub fn transaction_hash(&self) -> Option<&str> {
        match self {
            Self::SubmissionRejected { hash, .. }
            | Self::SubmissionTimeout { hash, .. }
            | Self::ConnectionLost { hash, .. } => hash.as_deref(),
            _ => None,
        }
    }

    pub(crate) fn lost(reason: impl Into<String>) -> Self {
        Self::ConnectionLost {
            hash: None,
            reason: reason.into(),
        }
    }

    /// Attaches a transaction hash if the error does not carry one yet.
    pub fn with_hash(self, tx_hash: &str) -> Self {
        match self {
            Self::SubmissionRejected {
                hash: None,
                engine_result,
                message,
            } => Self::SubmissionRejected {
                hash: Some(tx_hash.to_string()),
                engine_result,
                message,
            },
            Self::SubmissionTimeout { hash: None, waited } => Self::SubmissionTimeout {
                hash: Some(tx_hash.to_string()),
                waited,
            },
            Self::ConnectionLost { hash: None, reason } => Self::ConnectionLost {
                hash: Some(tx_hash.to_string()),
                reason,
            },
            other => other,
        }
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("invalid {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

pub type Result<T> = std::result::Result<T, IssuanceError>;
