use super::currency::CurrencyCode;
use super::transaction::{AccountId, Amount, is_ripple_base58};
use crate::error::{IssuanceError, Result};
use serde::{Deserialize, Deserializer, Serialize};
use zeroize::Zeroizing;

/// The ledger network a request targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum Network {
    Testnet,
    #[serde(alias = "mainnet")]
    #[value(alias = "mainnet")]
    MainnetPrimary,
    MainnetSecondary,
}

impl std::fmt::Display for Network {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Testnet => "testnet",
            Self::MainnetPrimary => "mainnet-primary",
            Self::MainnetSecondary => "mainnet-secondary",
        })
    }
}

/// An opaque account secret. Zeroized on drop and never printed.
#[derive(Clone)]
pub struct Credential(Zeroizing<String>);

impl Credential {
    pub fn new(secret: impl Into<String>) -> Self {
        Self(Zeroizing::new(secret.into()))
    }

    pub fn expose(&self) -> &str {
        self.0.as_str()
    }

    /// Shape check done before the credential goes anywhere.
    pub fn check_shape(&self) -> Result<()> {
        let secret = self.expose();
        if secret.starts_with('s') && secret.len() >= 20 && is_ripple_base58(secret) {
            Ok(())
        } else {
            Err(IssuanceError::InvalidCredential(
                "credential is not a ledger seed".to_string(),
            ))
        }
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Credential(<redacted>)")
    }
}

impl<'de> Deserialize<'de> for Credential {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        String::deserialize(deserializer).map(|s| Self::new(s.trim()))
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum StringOrNumber {
    String(String),
    Number(serde_json::Number),
}

fn decimal_text<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<String, D::Error> {
    Ok(match StringOrNumber::deserialize(deserializer)? {
        StringOrNumber::String(s) => s,
        StringOrNumber::Number(n) => n.to_string(),
    })
}

fn optional_decimal_text<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> std::result::Result<Option<String>, D::Error> {
    Ok(
        Option::<StringOrNumber>::deserialize(deserializer)?.map(|value| match value {
            StringOrNumber::String(s) => s,
            StringOrNumber::Number(n) => n.to_string(),
        }),
    )
}

/// One token issuance as submitted by a caller.
///
/// Exactly one of `holder_address` and `holder_credential` must be set.
/// Nothing here is trusted until [`IssuanceRequest::validate`] succeeds.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssuanceRequest {
    #[serde(alias = "issuerSecret")]
    pub issuer_credential: Credential,
    #[serde(default)]
    pub holder_address: Option<String>,
    #[serde(default, alias = "holderSecret")]
    pub holder_credential: Option<Credential>,
    pub currency_code: String,
    #[serde(deserialize_with = "decimal_text")]
    pub amount: String,
    #[serde(default, alias = "limit", deserialize_with = "optional_decimal_text")]
    pub trust_limit: Option<String>,
    pub network: Network,
    #[serde(default, alias = "freeze")]
    pub freeze_requested: bool,
}

/// How the holder is identified once the request is validated.
#[derive(Debug, Clone)]
pub enum Holder {
    /// Issuer acts unilaterally; only the holder's address is known.
    Address(AccountId),
    /// Holder secret supplied; its address is derived, and it may sign a
    /// trust-line setup when a limit is given.
    Credential {
        credential: Credential,
        trust_limit: Option<Amount>,
    },
}

/// A request whose every field passed the pre-network checks.
#[derive(Debug, Clone)]
pub struct ValidatedRequest {
    pub issuer_credential: Credential,
    pub holder: Holder,
    pub currency: CurrencyCode,
    pub amount: Amount,
    pub network: Network,
    pub freeze_requested: bool,
}

impl IssuanceRequest {
    pub fn validate(self) -> Result<ValidatedRequest> {
        self.issuer_credential.check_shape()?;

        let holder_address = self
            .holder_address
            .filter(|address| !address.trim().is_empty());
        let holder = match (holder_address, self.holder_credential) {
            (Some(_), Some(_)) => {
                return Err(IssuanceError::InvalidRequest(
                    "holderAddress and holderCredential are mutually exclusive".to_string(),
                ));
            }
            (None, None) => {
                return Err(IssuanceError::InvalidRequest(
                    "one of holderAddress or holderCredential is required".to_string(),
                ));
            }
            (Some(address), None) => {
                if self.trust_limit.is_some() {
                    return Err(IssuanceError::InvalidRequest(
                        "trustLimit requires holderCredential".to_string(),
                    ));
                }
                Holder::Address(AccountId::parse(&address)?)
            }
            (None, Some(credential)) => {
                credential.check_shape()?;
                let trust_limit = self
                    .trust_limit
                    .as_deref()
                    .map(str::parse::<Amount>)
                    .transpose()?;
                Holder::Credential {
                    credential,
                    trust_limit,
                }
            }
        };

        let currency = CurrencyCode::parse(&self.currency_code)?;
        let amount = self.amount.parse::<Amount>()?;

        Ok(ValidatedRequest {
            issuer_credential: self.issuer_credential,
            holder,
            currency,
            amount,
            network: self.network,
            freeze_requested: self.freeze_requested,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use serde_json::json;

    const ISSUER_SEED: &str = "sEdTM1uX8pu2do5XvTnutH6HsouMaM2";
    const HOLDER_SEED: &str = "sEdSKaCy2JT7JaM7v95H9SxkhP9wS2r";
    const HOLDER: &str = "rPT1Sjq2YGrBMTttX4GZHjKu9dyfzbpAYe";

    fn request(body: serde_json::Value) -> IssuanceRequest {
        serde_json::from_value(body).expect("request should deserialize")
    }

    #[test]
    fn test_address_only_request_validates() {
        let validated = request(json!({
            "issuerCredential": ISSUER_SEED,
            "holderAddress": HOLDER,
            "currencyCode": "USD",
            "amount": "100",
            "network": "testnet",
        }))
        .validate()
        .unwrap();

        assert!(matches!(validated.holder, Holder::Address(ref a) if a.as_str() == HOLDER));
        assert_eq!(validated.currency.normalized(), "USD");
        assert!(!validated.freeze_requested);
    }

    #[test]
    fn test_original_field_names_are_accepted() {
        let validated = request(json!({
            "issuerSecret": ISSUER_SEED,
            "holderSecret": HOLDER_SEED,
            "currencyCode": "SOLO",
            "amount": 25.5,
            "limit": 1000,
            "freeze": true,
            "network": "mainnet",
        }))
        .validate()
        .unwrap();

        assert_eq!(validated.network, Network::MainnetPrimary);
        assert!(validated.freeze_requested);
        match validated.holder {
            Holder::Credential { trust_limit, .. } => {
                assert_eq!(trust_limit.unwrap().to_string(), "1000");
            }
            Holder::Address(_) => panic!("expected credential holder"),
        }
        assert_eq!(validated.amount.to_string(), "25.5");
    }

    #[test]
    fn test_holder_fields_are_mutually_exclusive() {
        let both = request(json!({
            "issuerCredential": ISSUER_SEED,
            "holderAddress": HOLDER,
            "holderCredential": HOLDER_SEED,
            "currencyCode": "USD",
            "amount": "1",
            "network": "testnet",
        }));
        assert_eq!(both.validate().unwrap_err().kind(), ErrorKind::InvalidRequest);

        let neither = request(json!({
            "issuerCredential": ISSUER_SEED,
            "currencyCode": "USD",
            "amount": "1",
            "network": "testnet",
        }));
        assert_eq!(neither.validate().unwrap_err().kind(), ErrorKind::InvalidRequest);
    }

    #[test]
    fn test_field_level_rejections() {
        let base = json!({
            "issuerCredential": ISSUER_SEED,
            "holderAddress": HOLDER,
            "currencyCode": "USD",
            "amount": "100",
            "network": "testnet",
        });
        let cases = [
            ("amount", json!("0"), ErrorKind::InvalidRequest),
            ("amount", json!("-5"), ErrorKind::InvalidRequest),
            ("amount", json!("lots"), ErrorKind::InvalidRequest),
            ("currencyCode", json!(""), ErrorKind::InvalidCurrencyCode),
            ("currencyCode", json!("ABCDEFGHIJKLMNOPQRSTUV"), ErrorKind::InvalidCurrencyCode),
            ("holderAddress", json!("not-an-address"), ErrorKind::InvalidRequest),
            ("issuerCredential", json!("hunter2"), ErrorKind::InvalidCredential),
            ("trustLimit", json!("10"), ErrorKind::InvalidRequest),
        ];

        for (field, value, expected) in cases {
            let mut body = base.clone();
            body[field] = value.clone();
            let err = request(body).validate().unwrap_err();
            assert_eq!(err.kind(), expected, "{field} = {value}");
        }
    }

    #[test]
    fn test_credential_debug_is_redacted() {
        let credential = Credential::new(ISSUER_SEED);
        assert!(!format!("{credential:?}").contains(ISSUER_SEED));
    }

    #[test]
    fn test_unknown_network_fails_to_deserialize() {
        let result = serde_json::from_value::<IssuanceRequest>(json!({
            "issuerCredential": ISSUER_SEED,
            "holderAddress": HOLDER,
            "currencyCode": "USD",
            "amount": "1",
            "network": "devnet",
        }));
        assert!(result.is_err());
    }
}
