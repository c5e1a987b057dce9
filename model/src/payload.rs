//! Coercion helpers for the gateway's loosely-typed JSON payloads.
//!
//! The upstream API is explicit about field-name heterogeneity: the same
//! logical field arrives under several names and several JSON types
//! depending on gateway version. Every consumer of raw payloads goes
//! through these helpers so the tolerance rules stay in one place.

use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde_json::Value;
use std::str::FromStr;

/// Return the first value present in `payload` under any of `keys`.
///
/// Presence is keyed on the field existing, not on it being non-null.
pub fn first_value<'a>(payload: &'a Value, keys: &[&str]) -> Option<&'a Value> {
    let object = payload.as_object()?;
    keys.iter().find_map(|key| object.get(*key))
}

/// Unwrap a list response that may arrive bare or inside an envelope.
pub fn unwrap_list(payload: &Value, preferred_keys: &[&str]) -> Vec<Value> {
    if let Some(rows) = payload.as_array() {
        return rows.clone();
    }
    if let Some(object) = payload.as_object() {
        for key in preferred_keys {
            if let Some(rows) = object.get(*key).and_then(Value::as_array) {
                return rows.clone();
            }
        }
    }
    Vec::new()
}

/// Coerce a value to a trimmed, non-empty string.
pub fn string_or_none(value: &Value) -> Option<String> {
    let text = match value {
        Value::String(text) => text.trim().to_string(),
        Value::Number(number) => number.to_string(),
        Value::Bool(flag) => flag.to_string(),
        _ => return None,
    };
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

/// Coerce a value to a decimal, defaulting to zero on failure.
pub fn safe_decimal(value: &Value) -> Decimal {
    decimal_or_none(value).unwrap_or(Decimal::ZERO)
}

/// Coerce a value to a decimal when it carries one.
pub fn decimal_or_none(value: &Value) -> Option<Decimal> {
    match value {
        Value::Number(number) => number
            .as_i64()
            .and_then(Decimal::from_i64)
            .or_else(|| number.as_f64().and_then(Decimal::from_f64)),
        Value::String(text) => Decimal::from_str(text.trim()).ok(),
        _ => None,
    }
}

/// Coerce a value to an integer id.
pub fn safe_int(value: &Value) -> Option<i64> {
    match value {
        Value::Number(number) => number.as_i64(),
        Value::String(text) => i64::from_str(text.trim()).ok(),
        _ => None,
    }
}

/// The gateway's notion of truth: booleans, non-zero numbers, and a small
/// set of affirmative strings.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Bool(flag) => *flag,
        Value::Number(number) => number.as_i64().map(|v| v != 0).unwrap_or_else(|| {
            number
                .as_f64()
                .map(|v| v != 0.0)
                .unwrap_or(false)
        }),
        Value::String(text) => matches!(
            text.trim().to_lowercase().as_str(),
            "1" | "true" | "yes" | "y" | "on"
        ),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;

    #[test]
    fn first_value_respects_key_order() {
        let payload = json!({"accountId": 7, "id": 9});
        let found = first_value(&payload, &["id", "accountId"]).unwrap();
        assert_eq!(found, &json!(9));
    }

    #[test]
    fn first_value_returns_present_nulls() {
        let payload = json!({"profitAndLoss": null});
        let found = first_value(&payload, &["profitAndLoss", "pnl"]).unwrap();
        assert!(found.is_null());
    }

    #[test]
    fn unwrap_list_handles_bare_and_enveloped_shapes() {
        let bare = json!([1, 2]);
        assert_eq!(unwrap_list(&bare, &["trades"]).len(), 2);

        let enveloped = json!({"data": [1, 2, 3]});
        assert_eq!(unwrap_list(&enveloped, &["trades", "data"]).len(), 3);

        let unrelated = json!({"message": "ok"});
        assert!(unwrap_list(&unrelated, &["trades"]).is_empty());
    }

    #[test]
    fn string_or_none_trims_and_rejects_empty() {
        assert_eq!(string_or_none(&json!("  x  ")), Some("x".to_string()));
        assert_eq!(string_or_none(&json!("   ")), None);
        assert_eq!(string_or_none(&json!(1759109439_i64)), Some("1759109439".to_string()));
        assert_eq!(string_or_none(&json!(null)), None);
    }

    #[test]
    fn safe_decimal_defaults_to_zero() {
        assert_eq!(safe_decimal(&json!("4245.8")), dec!(4245.8));
        assert_eq!(safe_decimal(&json!(15)), dec!(15));
        assert_eq!(safe_decimal(&json!("garbage")), Decimal::ZERO);
        assert_eq!(safe_decimal(&json!(null)), Decimal::ZERO);
    }

    #[test]
    fn is_truthy_accepts_gateway_variants() {
        for value in [json!(true), json!(1), json!("true"), json!(" YES ")] {
            assert!(is_truthy(&value), "{value} should be truthy");
        }
        for value in [json!(false), json!(0), json!("false"), json!(""), json!(null)] {
            assert!(!is_truthy(&value), "{value} should be falsy");
        }
    }
}
