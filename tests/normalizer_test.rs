use rand::Rng;
use rand::distributions::{Alphanumeric, DistString};
use rust_decimal_macros::dec;
use token_issuer::domain::currency::{HEX_CODE_WIDTH, MAX_CODE_LEN, normalize_currency};
use token_issuer::domain::transaction::Amount;
use token_issuer::error::ErrorKind;

#[test]
fn test_normalization_is_total_over_valid_codes() {
    let mut rng = rand::thread_rng();

    for _ in 0..2_000 {
        let len = rng.gen_range(1..=MAX_CODE_LEN);
        let code = Alphanumeric.sample_string(&mut rng, len);

        let normalized = normalize_currency(&code).unwrap();
        let again = normalize_currency(&code).unwrap();
        assert_eq!(normalized, again, "not deterministic for {code:?}");

        if normalized.len() == 3 {
            assert_eq!(normalized, code);
            assert!(code.bytes().all(|b| b.is_ascii_uppercase() || b.is_ascii_digit()));
        } else {
            assert_eq!(normalized.len(), HEX_CODE_WIDTH, "{code:?}");
            assert!(normalized.bytes().all(|b| b.is_ascii_hexdigit()));
            assert_eq!(normalized, normalized.to_ascii_uppercase());

            let prefix = &normalized[..code.len() * 2];
            assert_eq!(hex::decode(prefix).unwrap(), code.as_bytes());
            assert!(normalized[code.len() * 2..].bytes().all(|b| b == b'0'));
        }
    }
}

#[test]
fn test_overlong_codes_are_rejected() {
    let mut rng = rand::thread_rng();

    for _ in 0..200 {
        let len = rng.gen_range(MAX_CODE_LEN + 1..=64);
        let code = Alphanumeric.sample_string(&mut rng, len);
        let err = normalize_currency(&code).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidCurrencyCode);
    }
}

#[test]
fn test_known_codes() {
    assert_eq!(normalize_currency("USD").unwrap(), "USD");
    assert_eq!(
        normalize_currency("SOLO").unwrap(),
        "534F4C4F00000000000000000000000000000000"
    );
    // Lowercase three-letter codes are not standard codes.
    assert_eq!(
        normalize_currency("usd").unwrap(),
        "7573640000000000000000000000000000000000"
    );
    assert_eq!(
        normalize_currency("ABCDEFGHIJKLMNOPQRST").unwrap(),
        "4142434445464748494A4B4C4D4E4F5051525354"
    );
}

#[test]
fn test_amount_bounds() {
    assert!(Amount::try_from(dec!(0.000001)).is_ok());
    assert!(Amount::try_from(dec!(123456789012345)).is_ok());
    assert!(Amount::try_from(dec!(1234567890123456)).is_err());
    assert!(Amount::try_from(dec!(0)).is_err());
    assert!(Amount::try_from(dec!(-1)).is_err());
    assert_eq!(
        "1.50".parse::<Amount>().unwrap().to_string(),
        "1.5"
    );
}
