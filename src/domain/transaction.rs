use super::currency::CurrencyCode;
use crate::error::{IssuanceError, Result};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Engine result of a transaction that applied cleanly.
pub const TES_SUCCESS: &str = "tesSUCCESS";

/// TrustSet flag disabling transfers through the line.
pub const TF_SET_FREEZE: u32 = 0x0010_0000;

/// Most significant digits an issued-currency amount may carry on the ledger.
pub const MAX_SIGNIFICANT_DIGITS: usize = 15;

const RIPPLE_ALPHABET: &str = "rpshnaf39wBUDNEGHJKLM4PQRST7VWXYZ2bcdeCg65jkm8oFqi1tuvAxyz";

pub(crate) fn is_ripple_base58(s: &str) -> bool {
    s.chars().all(|c| RIPPLE_ALPHABET.contains(c))
}

/// A classic ledger account address (`r...`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountId(String);

impl AccountId {
    pub fn parse(value: &str) -> Result<Self> {
        let value = value.trim();
        if !value.starts_with('r') || !(25..=35).contains(&value.len()) {
            return Err(IssuanceError::InvalidRequest(format!(
                "{value:?} is not a classic account address"
            )));
        }
        if !is_ripple_base58(value) {
            return Err(IssuanceError::InvalidRequest(format!(
                "{value:?} contains characters outside the address alphabet"
            )));
        }
        Ok(Self(value.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for AccountId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Represents a positive issued-currency amount.
///
/// Kept as a `Decimal` so the caller's string precision survives untouched,
/// and bounded to the ledger's significant-digit limit.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize)]
pub struct Amount(Decimal);

impl Amount {
    pub fn new(value: Decimal) -> Result<Self> {
        if value <= Decimal::ZERO {
            return Err(IssuanceError::InvalidRequest(
                "Amount must be positive".to_string(),
            ));
        }
        let mut mantissa = value.normalize().mantissa().unsigned_abs();
        while mantissa % 10 == 0 {
            mantissa /= 10;
        }
        let digits = mantissa.to_string().len();
        if digits > MAX_SIGNIFICANT_DIGITS {
            return Err(IssuanceError::InvalidRequest(format!(
                "Amount {value} has more than {MAX_SIGNIFICANT_DIGITS} significant digits"
            )));
        }
        Ok(Self(value))
    }

    pub fn value(&self) -> Decimal {
        self.0
    }
}

impl FromStr for Amount {
    type Err = IssuanceError;

    fn from_str(s: &str) -> Result<Self> {
        let value = Decimal::from_str_exact(s.trim())
            .map_err(|e| IssuanceError::InvalidRequest(format!("Amount {s:?} is not a decimal: {e}")))?;
        Self::new(value)
    }
}

impl TryFrom<Decimal> for Amount {
    type Error = IssuanceError;

    fn try_from(value: Decimal) -> Result<Self> {
        Self::new(value)
    }
}

impl std::fmt::Display for Amount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.normalize())
    }
}

/// One trust line as reported by the ledger, seen from the queried account.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TrustLine {
    /// The counterparty (issuer) of the line.
    pub account: String,
    pub currency: String,
    pub limit: String,
    #[serde(default)]
    pub balance: String,
    #[serde(default)]
    pub freeze: bool,
    #[serde(default)]
    pub freeze_peer: bool,
}

/// Read-only snapshot of an account's trust lines.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrustLineView {
    pub lines: Vec<TrustLine>,
}

impl TrustLineView {
    pub fn new(lines: Vec<TrustLine>) -> Self {
        Self { lines }
    }

    pub fn has_line(&self, issuer: &AccountId, currency: &CurrencyCode) -> bool {
        self.lines
            .iter()
            .any(|line| line.account == issuer.as_str() && currency.matches(&line.currency))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IssuedAmount {
    pub currency: String,
    pub issuer: AccountId,
    pub value: String,
}

fn is_zero(flags: &u32) -> bool {
    *flags == 0
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "TransactionType")]
pub enum TransactionKind {
    #[serde(rename_all = "PascalCase")]
    Payment {
        destination: AccountId,
        amount: IssuedAmount,
    },
    #[serde(rename_all = "PascalCase")]
    TrustSet {
        limit_amount: IssuedAmount,
        #[serde(skip_serializing_if = "is_zero")]
        flags: u32,
    },
}

/// An unsigned transaction before sequence and fee metadata are known.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct TransactionDraft {
    pub account: AccountId,
    #[serde(flatten)]
    pub kind: TransactionKind,
}

impl TransactionDraft {
    /// Issuer delivers `amount` of its own `currency` to `holder`.
    pub fn payment(
        issuer: &AccountId,
        holder: &AccountId,
        currency: &CurrencyCode,
        amount: &Amount,
    ) -> Self {
        Self {
            account: issuer.clone(),
            kind: TransactionKind::Payment {
                destination: holder.clone(),
                amount: IssuedAmount {
                    currency: currency.normalized().to_string(),
                    issuer: issuer.clone(),
                    value: amount.to_string(),
                },
            },
        }
    }

    /// Issuer-side freeze of the holder's line. The limit stays at zero
    /// since the issuer extends no credit of its own.
    pub fn freeze(issuer: &AccountId, holder: &AccountId, currency: &CurrencyCode) -> Self {
        Self {
            account: issuer.clone(),
            kind: TransactionKind::TrustSet {
                limit_amount: IssuedAmount {
                    currency: currency.normalized().to_string(),
                    issuer: holder.clone(),
                    value: "0".to_string(),
                },
                flags: TF_SET_FREEZE,
            },
        }
    }

    /// Holder opens (or raises) a line to the issuer.
    pub fn trust_set(
        holder: &AccountId,
        issuer: &AccountId,
        currency: &CurrencyCode,
        limit: &Amount,
    ) -> Self {
        Self {
            account: holder.clone(),
            kind: TransactionKind::TrustSet {
                limit_amount: IssuedAmount {
                    currency: currency.normalized().to_string(),
                    issuer: issuer.clone(),
                    value: limit.to_string(),
                },
                flags: 0,
            },
        }
    }

    pub fn transaction_type(&self) -> &'static str {
        match self.kind {
            TransactionKind::Payment { .. } => "Payment",
            TransactionKind::TrustSet { .. } => "TrustSet",
        }
    }
}

/// A draft with sequence, fee and expiry filled in by the ledger session.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct PreparedTransaction {
    #[serde(flatten)]
    pub draft: TransactionDraft,
    pub sequence: u32,
    /// Fee in drops, rendered as a string on the wire.
    pub fee: String,
    pub last_ledger_sequence: u32,
}

impl PreparedTransaction {
    pub fn to_tx_json(&self) -> Result<serde_json::Value> {
        serde_json::to_value(self).map_err(|e| {
            IssuanceError::InvalidRequest(format!("transaction does not serialize: {e}"))
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SignedTransaction {
    /// Hex-encoded signed transaction.
    pub blob: String,
    pub hash: String,
    pub last_ledger_sequence: u32,
}

/// Outcome of one submitted transaction. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionOutcome {
    pub transaction_hash: String,
    pub engine_result: String,
    pub finalized: bool,
}

impl TransactionOutcome {
    pub fn is_success(&self) -> bool {
        self.finalized && self.engine_result == TES_SUCCESS
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;

    const ISSUER: &str = "rHb9CJAWyB4rj91VRWn96DkukG4bwdtyTh";
    const HOLDER: &str = "rPT1Sjq2YGrBMTttX4GZHjKu9dyfzbpAYe";

    #[test]
    fn test_amount_validation() {
        assert!(Amount::new(dec!(1.0)).is_ok());
        assert!(Amount::new(dec!(0.0)).is_err());
        assert!(Amount::new(dec!(-1.0)).is_err());
        assert!("1234567890.12345".parse::<Amount>().is_ok());
        assert!("1234567890.123456".parse::<Amount>().is_err());
        assert!("ten".parse::<Amount>().is_err());
    }

    #[test]
    fn test_trailing_integer_zeros_are_not_significant() {
        assert!("1000000000000000".parse::<Amount>().is_ok());
        assert!(Amount::new(dec!(1000000000000000000)).is_ok());
        assert!(Amount::new(dec!(1234567890123450000)).is_ok());
        assert!(Amount::new(dec!(1234567890123456000)).is_err());
    }

    #[test]
    fn test_amount_keeps_string_precision() {
        let amount: Amount = "100.2500".parse().unwrap();
        assert_eq!(amount.to_string(), "100.25");
        assert_eq!(amount.value(), dec!(100.2500));
    }

    #[test]
    fn test_account_id_shape() {
        assert!(AccountId::parse(ISSUER).is_ok());
        assert!(AccountId::parse("xHb9CJAWyB4rj91VRWn96DkukG4bwdtyTh").is_err());
        assert!(AccountId::parse("rIl0OJAWyB4rj91VRWn96DkukG4bwdtyTh").is_err());
        assert!(AccountId::parse("r123").is_err());
    }

    #[test]
    fn test_payment_wire_shape() {
        let issuer = AccountId::parse(ISSUER).unwrap();
        let holder = AccountId::parse(HOLDER).unwrap();
        let currency = CurrencyCode::parse("USD").unwrap();
        let draft =
            TransactionDraft::payment(&issuer, &holder, &currency, &"100".parse().unwrap());
        let prepared = PreparedTransaction {
            draft,
            sequence: 7,
            fee: "12".into(),
            last_ledger_sequence: 120,
        };

        assert_eq!(
            prepared.to_tx_json().unwrap(),
            json!({
                "TransactionType": "Payment",
                "Account": ISSUER,
                "Destination": HOLDER,
                "Amount": {"currency": "USD", "issuer": ISSUER, "value": "100"},
                "Sequence": 7,
                "Fee": "12",
                "LastLedgerSequence": 120,
            })
        );
    }

    #[test]
    fn test_freeze_wire_shape() {
        let issuer = AccountId::parse(ISSUER).unwrap();
        let holder = AccountId::parse(HOLDER).unwrap();
        let currency = CurrencyCode::parse("GOLD").unwrap();
        let draft = TransactionDraft::freeze(&issuer, &holder, &currency);

        assert_eq!(draft.transaction_type(), "TrustSet");
        assert_eq!(
            serde_json::to_value(&draft).unwrap(),
            json!({
                "TransactionType": "TrustSet",
                "Account": ISSUER,
                "LimitAmount": {
                    "currency": currency.normalized(),
                    "issuer": HOLDER,
                    "value": "0",
                },
                "Flags": TF_SET_FREEZE,
            })
        );
    }

    #[test]
    fn test_trust_view_matching() {
        let issuer = AccountId::parse(ISSUER).unwrap();
        let currency = CurrencyCode::parse("GOLD").unwrap();
        let view = TrustLineView::new(vec![TrustLine {
            account: ISSUER.into(),
            currency: "gold".into(),
            limit: "1000".into(),
            balance: "0".into(),
            freeze: false,
            freeze_peer: false,
        }]);
        assert!(view.has_line(&issuer, &currency));

        let other = AccountId::parse(HOLDER).unwrap();
        assert!(!view.has_line(&other, &currency));
        assert!(!TrustLineView::default().has_line(&issuer, &currency));
    }
}
