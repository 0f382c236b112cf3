use super::request::Credential;
use super::transaction::{
    AccountId, PreparedTransaction, SignedTransaction, TransactionDraft, TransactionOutcome,
    TrustLineView,
};
use crate::error::Result;
use async_trait::async_trait;

/// Opens sessions against ledger nodes.
#[async_trait]
pub trait LedgerConnector: Send + Sync {
    async fn connect(&self, endpoint: &str) -> Result<LedgerSessionBox>;
}

/// One exclusively owned conversation with a ledger node.
///
/// A session is never shared between workflow runs: autofilled sequence
/// numbers are only meaningful for the run that fetched them.
#[async_trait]
pub trait LedgerSession: Send {
    async fn query_trust_lines(
        &mut self,
        account: &AccountId,
        counterparty: &AccountId,
    ) -> Result<TrustLineView>;

    /// Adds sequence, fee and expiry metadata.
    async fn autofill(&mut self, draft: TransactionDraft) -> Result<PreparedTransaction>;

    /// Submits and waits until the ledger finalizes the transaction or
    /// definitively refuses it. Callers bound the wait themselves.
    async fn submit_signed(&mut self, signed: &SignedTransaction) -> Result<TransactionOutcome>;

    /// Idempotent; safe after any prior failure.
    async fn disconnect(&mut self) -> Result<()>;
}

/// Turns a credential into a signing capability.
#[async_trait]
pub trait KeyDeriver: Send + Sync {
    async fn derive_signer(&self, credential: &Credential) -> Result<SignerBox>;
}

#[async_trait]
pub trait Signer: Send + Sync {
    fn address(&self) -> &AccountId;
    fn public_key(&self) -> &str;
    fn key_type(&self) -> &str;
    async fn sign(&self, transaction: &PreparedTransaction) -> Result<SignedTransaction>;
}

pub type LedgerConnectorBox = Box<dyn LedgerConnector>;
pub type LedgerSessionBox = Box<dyn LedgerSession>;
pub type KeyDeriverBox = Box<dyn KeyDeriver>;
pub type SignerBox = Box<dyn Signer>;
