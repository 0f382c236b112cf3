//! Signing capability backed by a trusted node.
//!
//! Key derivation (`wallet_propose`) and signing (`sign`, offline) both run
//! on the configured signer endpoint. Seeds are sent there and to no other
//! host.

use super::rpc::{JsonRpcClient, RpcError};
use crate::domain::ports::{KeyDeriver, Signer, SignerBox};
use crate::domain::request::Credential;
use crate::domain::transaction::{AccountId, PreparedTransaction, SignedTransaction};
use crate::error::{IssuanceError, Result};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

#[derive(Deserialize)]
struct WalletProposeResult {
    account_id: String,
    public_key_hex: String,
    #[serde(default = "default_key_type")]
    key_type: String,
}

fn default_key_type() -> String {
    "secp256k1".to_string()
}

#[derive(Deserialize)]
struct SignResult {
    tx_blob: String,
    tx_json: SignedJson,
}

#[derive(Deserialize)]
struct SignedJson {
    hash: String,
}

pub struct NodeKeyDeriver {
    rpc: JsonRpcClient,
}

impl NodeKeyDeriver {
    pub fn new(http: reqwest::Client, signer_url: &str) -> Self {
        Self {
            rpc: JsonRpcClient::new(http, signer_url),
        }
    }
}

fn signer_unreachable(rpc: &JsonRpcClient, err: RpcError) -> IssuanceError {
    IssuanceError::Connection {
        endpoint: rpc.url().to_string(),
        reason: err.to_string(),
    }
}

#[async_trait]
impl KeyDeriver for NodeKeyDeriver {
    async fn derive_signer(&self, credential: &Credential) -> Result<SignerBox> {
        credential.check_shape()?;

        let proposed: WalletProposeResult = self
            .rpc
            .call("wallet_propose", json!({ "seed": credential.expose() }))
            .await
            .map_err(|err| match err {
                RpcError::Node { code, message } => {
                    IssuanceError::InvalidCredential(format!("{code}: {message}"))
                }
                other => signer_unreachable(&self.rpc, other),
            })?;

        let address = AccountId::parse(&proposed.account_id)
            .map_err(|e| IssuanceError::InvalidCredential(e.to_string()))?;
        debug!(%address, key_type = %proposed.key_type, "derived signing key");

        Ok(Box::new(NodeSigner {
            rpc: self.rpc.clone(),
            credential: credential.clone(),
            address,
            public_key: proposed.public_key_hex,
            key_type: proposed.key_type,
        }))
    }
}

/// Signing capability for one account. Holds its seed until dropped.
pub struct NodeSigner {
    rpc: JsonRpcClient,
    credential: Credential,
    address: AccountId,
    public_key: String,
    key_type: String,
}

#[async_trait]
impl Signer for NodeSigner {
    fn address(&self) -> &AccountId {
        &self.address
    }

    fn public_key(&self) -> &str {
        &self.public_key
    }

    fn key_type(&self) -> &str {
        &self.key_type
    }

    async fn sign(&self, transaction: &PreparedTransaction) -> Result<SignedTransaction> {
        let tx_json = transaction.to_tx_json()?;
        let params = json!({
            "tx_json": tx_json,
            "seed": self.credential.expose(),
            "key_type": self.key_type,
            "offline": true,
        });

        let signed: SignResult = self
            .rpc
            .call("sign", params)
            .await
            .map_err(|err| match err {
                RpcError::Node { code, message } => IssuanceError::Node { code, message },
                other => signer_unreachable(&self.rpc, other),
            })?;

        Ok(SignedTransaction {
            blob: signed.tx_blob,
            hash: signed.tx_json.hash,
            last_ledger_sequence: transaction.last_ledger_sequence,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[tokio::test]
    async fn test_malformed_seed_never_reaches_the_node() {
        // Port 9 is discard; a request would fail as a connection error.
        let deriver = NodeKeyDeriver::new(reqwest::Client::new(), "http://127.0.0.1:9");

        let err = match deriver.derive_signer(&Credential::new("not-a-seed")).await {
            Err(err) => err,
            Ok(_) => panic!("malformed seed must be refused"),
        };

        assert_eq!(err.kind(), ErrorKind::InvalidCredential);
    }
}
