use ethereum_types::U256;
use rust_decimal::Decimal;
use serde_json::Value;

/// Decimal places between wei and ETH.
pub const WEI_SCALE: u32 = 18;

/// Parse a base-unit amount from its JSON encoding. The marketplace
/// serializes wei values as decimal strings; some endpoints use plain
/// integers. Anything else is malformed upstream data.
pub fn parse_wei(value: &Value) -> Option<U256> {
    match value {
        Value::String(s) => U256::from_dec_str(s.trim()).ok(),
        Value::Number(n) => n.as_u64().map(U256::from),
        _ => None,
    }
}

/// Convert a wei amount to its ETH value with exact decimal division,
/// never floating point. Trailing zeros are stripped, so equal inputs yield
/// byte-identical display output regardless of source encoding.
///
/// Returns None only when the amount exceeds the 96-bit decimal mantissa
/// (~7.9e10 ETH); callers treat that like any other malformed entry.
pub fn wei_to_eth(wei: U256) -> Option<Decimal> {
    if wei.bits() > 127 {
        return None;
    }
    Decimal::try_from_i128_with_scale(wei.as_u128() as i128, WEI_SCALE)
        .ok()
        .map(|d| d.normalize())
}

/// Parse-and-convert for raw marketplace entries.
pub fn wei_value_to_eth(value: &Value) -> Option<Decimal> {
    parse_wei(value).and_then(wei_to_eth)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;

    #[test]
    fn zero_wei_is_zero() {
        assert_eq!(wei_to_eth(U256::zero()), Some(Decimal::ZERO));
        assert_eq!(wei_to_eth(U256::zero()).unwrap().to_string(), "0");
    }

    #[test]
    fn one_ether_is_one() {
        let one_eth = U256::from(10u64).pow(U256::from(18u64));
        let converted = wei_to_eth(one_eth).unwrap();
        assert_eq!(converted, dec!(1));
        assert_eq!(converted.to_string(), "1");
    }

    #[test]
    fn fractional_amounts_are_exact() {
        let v = wei_value_to_eth(&json!("1500000000000000000")).unwrap();
        assert_eq!(v.to_string(), "1.5");

        let v = wei_value_to_eth(&json!("500000000000000000")).unwrap();
        assert_eq!(v.to_string(), "0.5");

        // One wei above 1 ETH, lost entirely in f64 arithmetic.
        let v = wei_value_to_eth(&json!("1000000000000000001")).unwrap();
        assert_eq!(v.to_string(), "1.000000000000000001");
    }

    #[test]
    fn string_and_integer_encodings_agree() {
        let from_string = wei_value_to_eth(&json!("250000000000000000")).unwrap();
        let from_integer = wei_value_to_eth(&json!(250_000_000_000_000_000u64)).unwrap();
        assert_eq!(from_string, from_integer);
        assert_eq!(from_string.to_string(), from_integer.to_string());
    }

    #[test]
    fn malformed_values_are_rejected() {
        assert_eq!(parse_wei(&json!("not a number")), None);
        assert_eq!(parse_wei(&json!(-5)), None);
        assert_eq!(parse_wei(&json!(null)), None);
        assert_eq!(parse_wei(&json!(["1"])), None);
    }

    #[test]
    fn oversized_amounts_are_dropped_not_rounded() {
        assert_eq!(wei_to_eth(U256::max_value()), None);
    }
}
