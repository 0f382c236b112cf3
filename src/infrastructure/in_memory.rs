use crate::domain::ports::{KeyDeriver, LedgerConnector, LedgerSession, LedgerSessionBox, Signer, SignerBox};
use crate::domain::request::Credential;
use crate::domain::transaction::{
    AccountId, PreparedTransaction, SignedTransaction, TES_SUCCESS, TF_SET_FREEZE,
    TransactionDraft, TransactionOutcome, TrustLine, TrustLineView,
};
use crate::error::{IssuanceError, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::hash::{DefaultHasher, Hash, Hasher};
use std::sync::Arc;
use tokio::sync::RwLock;

const BASE_LEDGER: u32 = 100;
const LEDGER_OFFSET: u32 = 20;

/// How the in-memory ledger answers a submission of a given transaction type.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum SubmitBehavior {
    /// Validated with `tesSUCCESS`; effects are applied.
    #[default]
    Finalize,
    /// Refused before validation with the given engine result.
    Reject(String),
    /// Validated, but with a non-success engine result.
    FinalizeWith(String),
    /// Never finalizes.
    Hang,
    /// The session drops mid-submission.
    DropConnection,
}

#[derive(Default)]
struct LedgerState {
    unreachable: bool,
    trust_lines: HashMap<String, Vec<TrustLine>>,
    behaviors: HashMap<String, SubmitBehavior>,
    sequences: HashMap<String, u32>,
    submitted: Vec<Value>,
    connects: usize,
    disconnects: usize,
    open_sessions: usize,
    peak_open_sessions: usize,
}

/// A thread-safe simulated ledger.
///
/// Doubles as [`LedgerConnector`] and records every interaction so tests can
/// assert on what the workflow did. `Clone` shares the underlying state.
#[derive(Default, Clone)]
pub struct InMemoryLedger {
    state: Arc<RwLock<LedgerState>>,
}

impl InMemoryLedger {
    /// Creates a new, empty ledger where every submission finalizes.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a line on `holder` trusting `issuer` for `currency`.
    pub async fn add_trust_line(&self, holder: &str, issuer: &str, currency: &str, limit: &str) {
        let mut state = self.state.write().await;
        state
            .trust_lines
            .entry(holder.to_string())
            .or_default()
            .push(TrustLine {
                account: issuer.to_string(),
                currency: currency.to_string(),
                limit: limit.to_string(),
                balance: "0".to_string(),
                freeze: false,
                freeze_peer: false,
            });
    }

    pub async fn set_behavior(&self, transaction_type: &str, behavior: SubmitBehavior) {
        let mut state = self.state.write().await;
        state
            .behaviors
            .insert(transaction_type.to_string(), behavior);
    }

    pub async fn set_unreachable(&self, unreachable: bool) {
        self.state.write().await.unreachable = unreachable;
    }

    pub async fn trust_lines(&self, account: &str) -> Vec<TrustLine> {
        let state = self.state.read().await;
        state.trust_lines.get(account).cloned().unwrap_or_default()
    }

    /// Decoded transaction JSON of every submission, in order.
    pub async fn submitted(&self) -> Vec<Value> {
        self.state.read().await.submitted.clone()
    }

    pub async fn submit_count(&self) -> usize {
        self.state.read().await.submitted.len()
    }

    pub async fn connects(&self) -> usize {
        self.state.read().await.connects
    }

    pub async fn disconnects(&self) -> usize {
        self.state.read().await.disconnects
    }

    pub async fn open_sessions(&self) -> usize {
        self.state.read().await.open_sessions
    }

    pub async fn peak_open_sessions(&self) -> usize {
        self.state.read().await.peak_open_sessions
    }
}

fn apply_effects(state: &mut LedgerState, tx: &Value) {
    if tx["TransactionType"] != "TrustSet" {
        return;
    }
    let (Some(account), Some(peer), Some(currency)) = (
        tx["Account"].as_str(),
        tx["LimitAmount"]["issuer"].as_str(),
        tx["LimitAmount"]["currency"].as_str(),
    ) else {
        return;
    };
    let flags = tx["Flags"].as_u64().unwrap_or(0);

    if flags & u64::from(TF_SET_FREEZE) != 0 {
        // Issuer-side freeze shows up as `freeze_peer` on the holder's line.
        if let Some(line) = state
            .trust_lines
            .get_mut(peer)
            .and_then(|lines| lines.iter_mut().find(|l| l.account == account && l.currency == currency))
        {
            line.freeze_peer = true;
        }
        return;
    }

    let limit = tx["LimitAmount"]["value"].as_str().unwrap_or("0").to_string();
    let lines = state.trust_lines.entry(account.to_string()).or_default();
    match lines
        .iter_mut()
        .find(|l| l.account == peer && l.currency == currency)
    {
        Some(line) => line.limit = limit,
        None => lines.push(TrustLine {
            account: peer.to_string(),
            currency: currency.to_string(),
            limit,
            balance: "0".to_string(),
            freeze: false,
            freeze_peer: false,
        }),
    }
}

#[async_trait]
impl LedgerConnector for InMemoryLedger {
    async fn connect(&self, endpoint: &str) -> Result<LedgerSessionBox> {
        let mut state = self.state.write().await;
        if state.unreachable {
            return Err(IssuanceError::Connection {
                endpoint: endpoint.to_string(),
                reason: "connection refused".to_string(),
            });
        }
        state.connects += 1;
        state.open_sessions += 1;
        state.peak_open_sessions = state.peak_open_sessions.max(state.open_sessions);
        Ok(Box::new(InMemorySession {
            ledger: self.clone(),
            open: true,
            released: false,
        }))
    }
}

/// Session handed out by [`InMemoryLedger`].
///
/// A dropped connection closes the session but does not release it; only
/// `disconnect` does, exactly once.
pub struct InMemorySession {
    ledger: InMemoryLedger,
    open: bool,
    released: bool,
}

impl InMemorySession {
    fn ensure_open(&self) -> Result<()> {
        if self.open {
            Ok(())
        } else {
            Err(IssuanceError::lost("session closed"))
        }
    }
}

#[async_trait]
impl LedgerSession for InMemorySession {
    async fn query_trust_lines(
        &mut self,
        account: &AccountId,
        counterparty: &AccountId,
    ) -> Result<TrustLineView> {
        self.ensure_open()?;
        let lines = self
            .ledger
            .trust_lines(account.as_str())
            .await
            .into_iter()
            .filter(|line| line.account == counterparty.as_str())
            .collect();
        Ok(TrustLineView::new(lines))
    }

    async fn autofill(&mut self, draft: TransactionDraft) -> Result<PreparedTransaction> {
        self.ensure_open()?;
        let mut state = self.ledger.state.write().await;
        let sequence = state
            .sequences
            .entry(draft.account.to_string())
            .or_insert(1);
        let prepared = PreparedTransaction {
            draft,
            sequence: *sequence,
            fee: "12".to_string(),
            last_ledger_sequence: BASE_LEDGER + LEDGER_OFFSET,
        };
        *sequence += 1;
        Ok(prepared)
    }

    async fn submit_signed(&mut self, signed: &SignedTransaction) -> Result<TransactionOutcome> {
        self.ensure_open()?;
        let tx: Value = hex::decode(&signed.blob)
            .ok()
            .and_then(|bytes| serde_json::from_slice(&bytes).ok())
            .ok_or_else(|| IssuanceError::SubmissionRejected {
                hash: Some(signed.hash.clone()),
                engine_result: "invalidTransaction".to_string(),
                message: "blob does not decode".to_string(),
            })?;

        let behavior = {
            let mut state = self.ledger.state.write().await;
            let kind = tx["TransactionType"].as_str().unwrap_or_default();
            let behavior = state.behaviors.get(kind).cloned().unwrap_or_default();
            if behavior == SubmitBehavior::Finalize {
                apply_effects(&mut state, &tx);
            }
            state.submitted.push(tx);
            behavior
        };

        let outcome = |engine_result: &str, finalized: bool| TransactionOutcome {
            transaction_hash: signed.hash.clone(),
            engine_result: engine_result.to_string(),
            finalized,
        };
        match behavior {
            SubmitBehavior::Finalize => Ok(outcome(TES_SUCCESS, true)),
            SubmitBehavior::Reject(code) => Ok(outcome(&code, false)),
            SubmitBehavior::FinalizeWith(code) => Ok(outcome(&code, true)),
            SubmitBehavior::Hang => std::future::pending().await,
            SubmitBehavior::DropConnection => {
                self.open = false;
                Err(IssuanceError::lost("peer reset the connection"))
            }
        }
    }

    async fn disconnect(&mut self) -> Result<()> {
        self.open = false;
        if !self.released {
            self.released = true;
            let mut state = self.ledger.state.write().await;
            state.disconnects += 1;
            state.open_sessions -= 1;
        }
        Ok(())
    }
}

/// Key deriver backed by a fixed credential → address table.
#[derive(Default, Clone)]
pub struct InMemoryKeyDeriver {
    keys: HashMap<String, String>,
}

impl InMemoryKeyDeriver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_key(mut self, seed: &str, address: &str) -> Self {
        self.keys.insert(seed.to_string(), address.to_string());
        self
    }
}

#[async_trait]
impl KeyDeriver for InMemoryKeyDeriver {
    async fn derive_signer(&self, credential: &Credential) -> Result<SignerBox> {
        let address = self
            .keys
            .get(credential.expose())
            .ok_or_else(|| IssuanceError::InvalidCredential("unknown seed".to_string()))?;
        let address = AccountId::parse(address)
            .map_err(|e| IssuanceError::InvalidCredential(e.to_string()))?;
        Ok(Box::new(InMemorySigner {
            public_key: format!("ED{}", hex::encode_upper(address.as_str())),
            address,
        }))
    }
}

/// Signs by hex-encoding the transaction JSON.
pub struct InMemorySigner {
    address: AccountId,
    public_key: String,
}

#[async_trait]
impl Signer for InMemorySigner {
    fn address(&self) -> &AccountId {
        &self.address
    }

    fn public_key(&self) -> &str {
        &self.public_key
    }

    fn key_type(&self) -> &str {
        "ed25519"
    }

    async fn sign(&self, transaction: &PreparedTransaction) -> Result<SignedTransaction> {
        let bytes = serde_json::to_vec(&transaction.to_tx_json()?)
            .map_err(|e| IssuanceError::InvalidRequest(e.to_string()))?;
        let mut hasher = DefaultHasher::new();
        bytes.hash(&mut hasher);
        Ok(SignedTransaction {
            blob: hex::encode_upper(&bytes),
            hash: format!("{:064X}", hasher.finish()),
            last_ledger_sequence: transaction.last_ledger_sequence,
        })
    }
}
