//! Field-probing and money-parsing primitives for storefront responses.
//!
//! The endpoint surface is unversioned and the same logical field shows up
//! under a different name from one response to the next, so every accessor
//! here takes an ordered list of candidate keys and returns the first hit.
//! Probes look at the value itself and one level down under the common
//! wrapper keys (`data`, `response`, `result`).

use serde_json::Value;

/// Wrapper keys the storefront nests payloads under.
const WRAPPER_KEYS: [&str; 3] = ["data", "response", "result"];

/// First non-null value found under any of `keys`, checking the value
/// itself and then each wrapper level.
#[must_use]
pub fn probe<'a>(value: &'a Value, keys: &[&str]) -> Option<&'a Value> {
    for key in keys {
        if let Some(found) = value.get(key) {
            if !found.is_null() {
                return Some(found);
            }
        }
    }
    for wrapper in WRAPPER_KEYS {
        if let Some(inner) = value.get(wrapper) {
            for key in keys {
                if let Some(found) = inner.get(key) {
                    if !found.is_null() {
                        return Some(found);
                    }
                }
            }
        }
    }
    None
}

/// First string-ish value under any of `keys`. Numbers are rendered to
/// their decimal form because identifiers arrive as either.
#[must_use]
pub fn first_str(value: &Value, keys: &[&str]) -> Option<String> {
    match probe(value, keys)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_owned()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[must_use]
pub fn first_bool(value: &Value, keys: &[&str]) -> Option<bool> {
    match probe(value, keys)? {
        Value::Bool(b) => Some(*b),
        Value::String(s) => match s.trim().to_lowercase().as_str() {
            "true" | "yes" | "1" => Some(true),
            "false" | "no" | "0" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

#[must_use]
pub fn first_u32(value: &Value, keys: &[&str]) -> Option<u32> {
    match probe(value, keys)? {
        Value::Number(n) => n.as_u64().and_then(|v| u32::try_from(v).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// First array under any of `keys`; also accepts the value itself being an
/// array (some list endpoints return a bare JSON array).
#[must_use]
pub fn first_array<'a>(value: &'a Value, keys: &[&str]) -> Option<&'a Vec<Value>> {
    if let Value::Array(items) = value {
        return Some(items);
    }
    match probe(value, keys)? {
        Value::Array(items) => Some(items),
        _ => None,
    }
}

/// First monetary amount under any of `keys`. Accepts plain numbers,
/// currency-prefixed strings ("₹46", "Rs. 46.50"), and comma-grouped
/// figures ("1,049").
#[must_use]
pub fn first_money(value: &Value, keys: &[&str]) -> Option<f64> {
    money(probe(value, keys)?)
}

/// Like [`first_money`] but total: a record with no recognized amount
/// yields `0.0` rather than failing the whole extraction.
#[must_use]
pub fn money_or_zero(value: &Value, keys: &[&str]) -> f64 {
    first_money(value, keys).unwrap_or(0.0)
}

/// Interpret a single JSON value as a monetary amount.
#[must_use]
pub fn money(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => first_amount_in(s),
        // One more level of nesting: {"price": {"value": 46}}.
        Value::Object(_) => first_money(value, &["value", "amount"]),
        _ => None,
    }
}

/// Scans a string for its first numeric run and parses it as an amount.
/// Grouping commas inside the run are dropped; a single dot is kept.
#[must_use]
pub fn first_amount_in(s: &str) -> Option<f64> {
    let bytes = s.as_bytes();
    let len = bytes.len();
    let mut i = 0usize;

    while i < len {
        if bytes[i].is_ascii_digit() {
            let mut num = String::new();
            let mut has_dot = false;
            while i < len {
                match bytes[i] {
                    b if b.is_ascii_digit() => num.push(b as char),
                    b',' if i + 1 < len && bytes[i + 1].is_ascii_digit() => {}
                    b'.' if !has_dot && i + 1 < len && bytes[i + 1].is_ascii_digit() => {
                        has_dot = true;
                        num.push('.');
                    }
                    _ => break,
                }
                i += 1;
            }
            return num.parse().ok();
        }
        i += 1;
    }
    None
}

/// Like [`first_amount_in`], but anchored on a currency marker when one is
/// present. Scraped cards put the unit size before the price ("500 ml" on
/// the line above "₹27"), so the first numeric run is only trusted when no
/// marker exists.
#[must_use]
pub fn priced_amount_in(s: &str) -> Option<f64> {
    let lower = s.to_lowercase();
    for marker in ["₹", "rs.", "rs ", "inr"] {
        if let Some(pos) = lower.find(marker) {
            if let Some(amount) = first_amount_in(&lower[pos + marker.len()..]) {
                return Some(amount);
            }
        }
    }
    first_amount_in(s)
}

/// Case-insensitive search for any of `phrases` across every string in the
/// JSON tree. Returns the matched phrase. Used for unavailability banners
/// that the storefront buries at arbitrary depth.
#[must_use]
pub fn find_phrase(value: &Value, phrases: &[&str]) -> Option<String> {
    match value {
        Value::String(s) => {
            let lower = s.to_lowercase();
            phrases
                .iter()
                .find(|p| lower.contains(&p.to_lowercase()))
                .map(|p| (*p).to_owned())
        }
        Value::Array(items) => items.iter().find_map(|v| find_phrase(v, phrases)),
        Value::Object(map) => map.values().find_map(|v| find_phrase(v, phrases)),
        _ => None,
    }
}
