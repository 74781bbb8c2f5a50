//! Mapping of raw parse-service rows into [`ContactRecord`]s.
//!
//! The service returns loosely typed JSON. Falsy values (absent, null, "",
//! false, 0) fall back to the documented defaults.

use crate::model::{ContactRecord, UNKNOWN};
use serde_json::Value;

/// Map one raw row. Never fails; unexpected shapes degrade to defaults.
pub fn record_from_raw(raw: &Value) -> ContactRecord {
    ContactRecord {
        email: text_field(raw, "email").unwrap_or_default(),
        name: text_or_unknown(raw, "name"),
        company: text_or_unknown(raw, "company"),
        product: text_or_unknown(raw, "product"),
        quantity: quantity_field(raw),
        port: text_or_unknown(raw, "port"),
        address: text_or_unknown(raw, "address"),
    }
}

/// Map a `result` array, preserving element order.
pub fn records_from_raw(rows: &[Value]) -> Vec<ContactRecord> {
    rows.iter().map(record_from_raw).collect()
}

fn text_or_unknown(raw: &Value, key: &str) -> String {
    text_field(raw, key).unwrap_or_else(|| UNKNOWN.to_string())
}

fn text_field(raw: &Value, key: &str) -> Option<String> {
    match raw.get(key)? {
        Value::Null | Value::Bool(false) => None,
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => Some(s.clone()),
        Value::Number(n) if n.as_f64() == Some(0.0) => None,
        Value::Number(n) => Some(n.to_string()),
        other => Some(other.to_string()),
    }
}

fn quantity_field(raw: &Value) -> u64 {
    match raw.get("quantity") {
        Some(Value::Number(n)) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f > 0.0).map(|f| f.trunc() as u64))
            .unwrap_or(0),
        Some(Value::String(s)) => {
            let s = s.trim();
            s.parse::<u64>()
                .ok()
                .or_else(|| {
                    s.parse::<f64>()
                        .ok()
                        .filter(|f| f.is_finite() && *f > 0.0)
                        .map(|f| f.trunc() as u64)
                })
                .unwrap_or(0)
        }
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn email_only_row_gets_defaults() {
        let r = record_from_raw(&json!({"email": "a@b.com"}));
        assert_eq!(r, ContactRecord::with_email("a@b.com"));
    }

    #[test]
    fn falsy_values_are_replaced() {
        let r = record_from_raw(&json!({
            "email": "x@y.z",
            "name": "",
            "company": null,
            "product": false,
            "quantity": 0,
            "port": 0,
            "address": "12 Dock Rd"
        }));
        assert_eq!(r.name, "Unknown");
        assert_eq!(r.company, "Unknown");
        assert_eq!(r.product, "Unknown");
        assert_eq!(r.quantity, 0);
        assert_eq!(r.port, "Unknown");
        assert_eq!(r.address, "12 Dock Rd");
    }

    #[test]
    fn missing_email_is_kept_empty() {
        let r = record_from_raw(&json!({"name": "Jane"}));
        assert_eq!(r.email, "");
        assert_eq!(r.name, "Jane");
    }

    #[test]
    fn quantity_accepts_numbers_and_numeric_strings() {
        assert_eq!(record_from_raw(&json!({"quantity": 500})).quantity, 500);
        assert_eq!(record_from_raw(&json!({"quantity": 7.9})).quantity, 7);
        assert_eq!(record_from_raw(&json!({"quantity": "42"})).quantity, 42);
        assert_eq!(record_from_raw(&json!({"quantity": -3})).quantity, 0);
        assert_eq!(record_from_raw(&json!({"quantity": "lots"})).quantity, 0);
    }

    #[test]
    fn non_string_scalars_are_stringified() {
        let r = record_from_raw(&json!({"port": 8080, "company": true}));
        assert_eq!(r.port, "8080");
        assert_eq!(r.company, "true");
    }

    #[test]
    fn order_is_preserved() {
        let rows = vec![json!({"email": "1@x"}), json!({"email": "2@x"}), json!({"email": "3@x"})];
        let emails: Vec<_> = records_from_raw(&rows).into_iter().map(|r| r.email).collect();
        assert_eq!(emails, ["1@x", "2@x", "3@x"]);
    }
}
