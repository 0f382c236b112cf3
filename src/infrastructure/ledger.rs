//! Ledger session over a node's JSON-RPC interface.

use super::rpc::{JsonRpcClient, RpcError, ledger_index};
use crate::config::WorkflowSettings;
use crate::domain::ports::{LedgerConnector, LedgerSession, LedgerSessionBox};
use crate::domain::transaction::{
    AccountId, PreparedTransaction, SignedTransaction, TransactionDraft, TransactionOutcome,
    TrustLine, TrustLineView,
};
use crate::error::{IssuanceError, Result};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};
use std::time::Duration;
use tracing::{debug, trace};

/// Engine result prefixes that mean the transaction was not applied and
/// will not be: malformed, failed, or locally refused.
const DEFINITIVE_PREFIXES: [&str; 3] = ["tem", "tef", "tel"];

/// Engine result reported when a transaction can no longer be included.
pub const TEF_MAX_LEDGER: &str = "tefMAX_LEDGER";

const TRUST_LINE_PAGE: u32 = 400;

#[derive(Deserialize)]
struct ServerInfoResult {
    info: ServerInfo,
}

#[derive(Deserialize)]
struct ServerInfo {
    #[serde(default)]
    build_version: String,
    #[serde(default)]
    validated_ledger: Option<ValidatedLedger>,
}

#[derive(Deserialize)]
struct ValidatedLedger {
    seq: u32,
}

#[derive(Deserialize)]
struct AccountLinesResult {
    lines: Vec<TrustLine>,
    #[serde(default)]
    marker: Option<Value>,
}

#[derive(Deserialize)]
struct AccountInfoResult {
    account_data: AccountData,
}

#[derive(Deserialize)]
struct AccountData {
    #[serde(rename = "Sequence")]
    sequence: u32,
}

#[derive(Deserialize)]
struct FeeResult {
    drops: FeeDrops,
}

#[derive(Deserialize)]
struct FeeDrops {
    base_fee: String,
    open_ledger_fee: String,
}

#[derive(Deserialize)]
struct LedgerCurrentResult {
    ledger_current_index: u32,
}

#[derive(Deserialize)]
struct LedgerResult {
    ledger_index: Value,
}

#[derive(Deserialize)]
struct SubmitResult {
    engine_result: String,
    #[serde(default)]
    engine_result_message: String,
    #[serde(default)]
    tx_json: Option<TxHash>,
}

#[derive(Deserialize)]
struct TxHash {
    hash: Option<String>,
}

#[derive(Deserialize)]
struct TxResult {
    #[serde(default)]
    validated: bool,
    #[serde(default)]
    meta: Option<TxMeta>,
}

#[derive(Deserialize)]
struct TxMeta {
    #[serde(rename = "TransactionResult")]
    transaction_result: String,
}

/// Opens [`RpcLedgerSession`]s; all sessions share one HTTP connection pool.
pub struct RpcLedgerConnector {
    http: reqwest::Client,
    settings: WorkflowSettings,
}

impl RpcLedgerConnector {
    pub fn new(http: reqwest::Client, settings: WorkflowSettings) -> Self {
        Self { http, settings }
    }
}

#[async_trait]
impl LedgerConnector for RpcLedgerConnector {
    async fn connect(&self, endpoint: &str) -> Result<LedgerSessionBox> {
        let rpc = JsonRpcClient::new(self.http.clone(), endpoint);
        let server: ServerInfoResult = rpc
            .call("server_info", json!({}))
            .await
            .map_err(|e| IssuanceError::Connection {
                endpoint: endpoint.to_string(),
                reason: e.to_string(),
            })?;
        debug!(
            endpoint,
            build = %server.info.build_version,
            validated_ledger = server.info.validated_ledger.as_ref().map(|l| l.seq),
            "connected to ledger node"
        );

        Ok(Box::new(RpcLedgerSession {
            rpc,
            poll_interval: self.settings.poll_interval(),
            ledger_offset: self.settings.ledger_offset,
            max_fee_drops: self.settings.max_fee_drops,
            open: true,
        }))
    }
}

pub struct RpcLedgerSession {
    rpc: JsonRpcClient,
    poll_interval: Duration,
    ledger_offset: u32,
    max_fee_drops: u64,
    open: bool,
}

/// Maps failures of requests that submit nothing.
fn query_error(err: RpcError) -> IssuanceError {
    match err {
        RpcError::Node { code, message } => IssuanceError::Node { code, message },
        other => IssuanceError::lost(other.to_string()),
    }
}

/// Maps failures of the `submit` request itself; the hash travels with the
/// error so the caller can reconcile.
fn submit_error(err: RpcError, hash: &str) -> IssuanceError {
    match err {
        RpcError::Node { code, message } => IssuanceError::SubmissionRejected {
            hash: Some(hash.to_string()),
            engine_result: code,
            message,
        },
        other => IssuanceError::ConnectionLost {
            hash: Some(hash.to_string()),
            reason: other.to_string(),
        },
    }
}

fn parse_drops(field: &str, value: &str) -> Result<u64> {
    value.parse().map_err(|_| IssuanceError::Node {
        code: "invalidFee".to_string(),
        message: format!("{field} {value:?} is not a drop amount"),
    })
}

impl RpcLedgerSession {
    fn ensure_open(&self) -> Result<()> {
        if self.open {
            Ok(())
        } else {
            Err(IssuanceError::lost("session closed"))
        }
    }

    async fn next_sequence(&self, account: &AccountId) -> Result<u32> {
        let params = json!({ "account": account, "ledger_index": "current" });
        match self.rpc.call::<AccountInfoResult>("account_info", params).await {
            Ok(info) => Ok(info.account_data.sequence),
            Err(err) if err.is_node_code("actNotFound") => Err(IssuanceError::SubmissionRejected {
                hash: None,
                engine_result: "actNotFound".to_string(),
                message: format!("account {account} does not exist on this ledger"),
            }),
            Err(err) => Err(query_error(err)),
        }
    }

    async fn fee_drops(&self) -> Result<u64> {
        let fee: FeeResult = self.rpc.call("fee", json!({})).await.map_err(query_error)?;
        let base = parse_drops("base_fee", &fee.drops.base_fee)?;
        let open = parse_drops("open_ledger_fee", &fee.drops.open_ledger_fee)?;
        Ok(base.max(open).min(self.max_fee_drops))
    }

    async fn validated_ledger_index(&self) -> Result<u32> {
        let ledger: LedgerResult = self
            .rpc
            .call("ledger", json!({ "ledger_index": "validated" }))
            .await
            .map_err(query_error)?;
        ledger_index(&ledger.ledger_index).ok_or_else(|| IssuanceError::Node {
            code: "invalidLedger".to_string(),
            message: format!("unreadable ledger index {}", ledger.ledger_index),
        })
    }
}

#[async_trait]
impl LedgerSession for RpcLedgerSession {
    async fn query_trust_lines(
        &mut self,
        account: &AccountId,
        counterparty: &AccountId,
    ) -> Result<TrustLineView> {
        self.ensure_open()?;
        let mut lines = Vec::new();
        let mut marker: Option<Value> = None;

        loop {
            let mut params = json!({
                "account": account,
                "peer": counterparty,
                "ledger_index": "validated",
                "limit": TRUST_LINE_PAGE,
            });
            if let Some(marker) = marker.take() {
                params["marker"] = marker;
            }

            let page: AccountLinesResult = match self.rpc.call("account_lines", params).await {
                Ok(page) => page,
                // An account that does not exist trusts nobody.
                Err(err) if err.is_node_code("actNotFound") => return Ok(TrustLineView::default()),
                Err(err) => return Err(query_error(err)),
            };
            lines.extend(page.lines);

            match page.marker {
                Some(next) => marker = Some(next),
                None => break,
            }
        }

        Ok(TrustLineView::new(lines))
    }

    async fn autofill(&mut self, draft: TransactionDraft) -> Result<PreparedTransaction> {
        self.ensure_open()?;
        let sequence = self.next_sequence(&draft.account).await?;
        let fee = self.fee_drops().await?;
        let current: LedgerCurrentResult = self
            .rpc
            .call("ledger_current", json!({}))
            .await
            .map_err(query_error)?;

        Ok(PreparedTransaction {
            draft,
            sequence,
            fee: fee.to_string(),
            last_ledger_sequence: current.ledger_current_index + self.ledger_offset,
        })
    }

    async fn submit_signed(&mut self, signed: &SignedTransaction) -> Result<TransactionOutcome> {
        self.ensure_open()?;
        let submitted: SubmitResult = self
            .rpc
            .call("submit", json!({ "tx_blob": signed.blob }))
            .await
            .map_err(|e| submit_error(e, &signed.hash))?;

        let hash = submitted
            .tx_json
            .and_then(|tx| tx.hash)
            .unwrap_or_else(|| signed.hash.clone());
        debug!(
            %hash,
            engine_result = %submitted.engine_result,
            message = %submitted.engine_result_message,
            "preliminary result"
        );

        if DEFINITIVE_PREFIXES
            .iter()
            .any(|prefix| submitted.engine_result.starts_with(prefix))
        {
            return Ok(TransactionOutcome {
                transaction_hash: hash,
                engine_result: submitted.engine_result,
                finalized: false,
            });
        }

        loop {
            tokio::time::sleep(self.poll_interval).await;

            match self
                .rpc
                .call::<TxResult>("tx", json!({ "transaction": hash }))
                .await
            {
                Ok(tx) if tx.validated => {
                    let engine_result = tx
                        .meta
                        .map(|meta| meta.transaction_result)
                        .unwrap_or(submitted.engine_result);
                    return Ok(TransactionOutcome {
                        transaction_hash: hash,
                        engine_result,
                        finalized: true,
                    });
                }
                Ok(_) => trace!(%hash, "not yet validated"),
                Err(err) if err.is_node_code("txnNotFound") => {
                    let validated = match self.validated_ledger_index().await {
                        Ok(validated) => validated,
                        // Expiry is unknown; the transaction may still apply.
                        Err(IssuanceError::Node { code, .. }) => {
                            debug!(%hash, %code, "validated ledger unavailable, still waiting");
                            continue;
                        }
                        Err(err) => return Err(err.with_hash(&hash)),
                    };
                    if validated > signed.last_ledger_sequence {
                        return Err(IssuanceError::SubmissionRejected {
                            hash: Some(hash),
                            engine_result: TEF_MAX_LEDGER.to_string(),
                            message: format!(
                                "ledger {validated} passed LastLedgerSequence {} without including it",
                                signed.last_ledger_sequence
                            ),
                        });
                    }
                }
                // Submitted already: a busy or unsynced node says nothing
                // about the outcome. Only the caller's deadline ends the wait.
                Err(RpcError::Node { code, message }) => {
                    debug!(%hash, %code, %message, "lookup refused, still waiting");
                }
                Err(err) => {
                    return Err(IssuanceError::ConnectionLost {
                        hash: Some(hash),
                        reason: err.to_string(),
                    });
                }
            }
        }
    }

    async fn disconnect(&mut self) -> Result<()> {
        // HTTP sessions hold no socket of their own; the pool reclaims it.
        self.open = false;
        Ok(())
    }
}
