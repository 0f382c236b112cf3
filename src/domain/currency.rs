use crate::error::{IssuanceError, Result};
use serde::Serialize;

/// Longest code the ledger's 160-bit currency field can hold as ASCII.
pub const MAX_CODE_LEN: usize = 20;

/// Width of the hex rendering of a 160-bit currency field.
pub const HEX_CODE_WIDTH: usize = 40;

/// A currency code in both its human form and the ledger's canonical form.
///
/// The canonical form is either the unchanged 3-character standard code or a
/// 40-digit uppercase hex string, right-padded with `'0'`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CurrencyCode {
    raw: String,
    normalized: String,
}

impl CurrencyCode {
    pub fn parse(raw: &str) -> Result<Self> {
        let normalized = normalize_currency(raw)?;
        Ok(Self {
            raw: raw.to_string(),
            normalized,
        })
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// The form sent to the ledger.
    pub fn normalized(&self) -> &str {
        &self.normalized
    }

    /// Whether a currency echoed back by a node names this code.
    ///
    /// Nodes may echo either form, so both are compared case-insensitively.
    pub fn matches(&self, echoed: &str) -> bool {
        echoed.eq_ignore_ascii_case(&self.normalized) || echoed.eq_ignore_ascii_case(&self.raw)
    }
}

impl std::fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.raw)
    }
}

fn is_standard_code(raw: &str) -> bool {
    raw.len() == 3
        && raw
            .bytes()
            .all(|b| b.is_ascii_uppercase() || b.is_ascii_digit())
}

/// Converts a human currency code into the ledger's canonical representation.
pub fn normalize_currency(raw: &str) -> Result<String> {
    let invalid = |reason: &str| IssuanceError::InvalidCurrencyCode {
        code: raw.to_string(),
        reason: reason.to_string(),
    };

    if raw.is_empty() {
        return Err(invalid("code is empty"));
    }
    if !raw.bytes().all(|b| b.is_ascii_graphic()) {
        return Err(invalid("code must be printable ASCII without spaces"));
    }
    if raw.len() > MAX_CODE_LEN {
        return Err(invalid("code is longer than 20 characters"));
    }

    if is_standard_code(raw) {
        return Ok(raw.to_string());
    }

    let mut encoded = hex::encode_upper(raw.as_bytes());
    encoded.truncate(HEX_CODE_WIDTH);
    while encoded.len() < HEX_CODE_WIDTH {
        encoded.push('0');
    }
    Ok(encoded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_standard_code_passes_through() {
        assert_eq!(normalize_currency("USD").unwrap(), "USD");
        assert_eq!(normalize_currency("B2B").unwrap(), "B2B");
    }

    #[test]
    fn test_lowercase_three_letter_code_is_hex_encoded() {
        assert_eq!(
            normalize_currency("usd").unwrap(),
            "7573640000000000000000000000000000000000"
        );
    }

    #[test]
    fn test_long_code_is_hex_padded() {
        let normalized = normalize_currency("SOLO").unwrap();
        assert_eq!(normalized, "534F4C4F00000000000000000000000000000000");
        assert_eq!(normalized.len(), HEX_CODE_WIDTH);
    }

    #[test]
    fn test_twenty_character_code_fills_the_field() {
        let code = "ABCDEFGHIJKLMNOPQRST";
        let normalized = normalize_currency(code).unwrap();
        assert_eq!(normalized, hex::encode_upper(code));
        assert_eq!(normalized.len(), HEX_CODE_WIDTH);
    }

    #[test]
    fn test_rejects_empty_long_and_non_ascii_codes() {
        for code in ["", "ABCDEFGHIJKLMNOPQRSTU", "EUR€", "A B"] {
            let err = normalize_currency(code).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidCurrencyCode, "code {code:?}");
        }
    }

    #[test]
    fn test_matches_either_form_case_insensitively() {
        let code = CurrencyCode::parse("Gold").unwrap();
        assert!(code.matches("476F6C6400000000000000000000000000000000"));
        assert!(code.matches("476f6c6400000000000000000000000000000000"));
        assert!(code.matches("GOLD"));
        assert!(!code.matches("USD"));
    }
}
