#![allow(dead_code)]

use token_issuer::application::engine::IssuanceEngine;
use token_issuer::config::{NetworkEndpoints, WorkflowSettings};
use token_issuer::domain::request::{Credential, IssuanceRequest, Network};
use token_issuer::infrastructure::in_memory::{InMemoryKeyDeriver, InMemoryLedger};

pub const ISSUER_SEED: &str = "sEdTM1uX8pu2do5XvTnutH6HsouMaM2";
pub const ISSUER: &str = "rHb9CJAWyB4rj91VRWn96DkukG4bwdtyTh";
pub const HOLDER_SEED: &str = "sEdSKaCy2JT7JaM7v95H9SxkhP9wS2r";
pub const HOLDER: &str = "rPT1Sjq2YGrBMTttX4GZHjKu9dyfzbpAYe";

pub fn settings(finalization_timeout_secs: u64) -> WorkflowSettings {
    WorkflowSettings {
        finalization_timeout_secs,
        poll_interval_ms: 10,
        ..WorkflowSettings::default()
    }
}

pub fn keys() -> InMemoryKeyDeriver {
    InMemoryKeyDeriver::new()
        .with_key(ISSUER_SEED, ISSUER)
        .with_key(HOLDER_SEED, HOLDER)
}

pub fn engine(ledger: &InMemoryLedger) -> IssuanceEngine {
    IssuanceEngine::new(
        NetworkEndpoints::default(),
        settings(1),
        Box::new(ledger.clone()),
        Box::new(keys()),
    )
}

pub fn request(currency: &str, amount: &str, freeze: bool) -> IssuanceRequest {
    IssuanceRequest {
        issuer_credential: Credential::new(ISSUER_SEED),
        holder_address: Some(HOLDER.to_string()),
        holder_credential: None,
        currency_code: currency.to_string(),
        amount: amount.to_string(),
        trust_limit: None,
        network: Network::Testnet,
        freeze_requested: freeze,
    }
}

/// Request where the holder signs its own trust line first.
pub fn trust_setup_request(limit: &str) -> IssuanceRequest {
    IssuanceRequest {
        holder_address: None,
        holder_credential: Some(Credential::new(HOLDER_SEED)),
        trust_limit: Some(limit.to_string()),
        ..request("USD", "100", false)
    }
}
