use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

use crate::error::HubError;

/// One purity quote as published by the provider: code is the fineness
/// ("999" / "750" / "585"), label the board caption, price in whole tenge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateEntry {
    pub code: String,
    pub label: String,
    pub price: i64,
}

/// A stored generation of rates.  Value object: superseded, never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub entries: Vec<RateEntry>,
    pub captured_at: DateTime<Utc>,
}

impl Snapshot {
    pub fn new(entries: Vec<RateEntry>, captured_at: DateTime<Utc>) -> Self {
        Self { entries, captured_at }
    }
}

/// Aggregate result returned to the board after a refresh.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RatesResponse {
    pub current: Vec<RateEntry>,
    /// Empty until a second generation exists.
    pub previous: Vec<RateEntry>,
    pub last_updated: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_updated: Option<DateTime<Utc>>,
}

fn value_as_code(v: &Value) -> Option<String> {
    match v {
        Value::String(s) => {
            let s = s.trim();
            (!s.is_empty()).then(|| s.to_string())
        }
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn value_as_price(v: &Value) -> Option<i64> {
    match v {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
}

/// Decode the provider payload into validated entries.
///
/// The payload is untrusted: anything that is not an array is rejected
/// outright, and individual elements are dropped (with a warning) when the
/// code or label is missing/empty or the price is not a non-negative integer.
/// A repeated code keeps the position of its first appearance and the price
/// of its last.  A non-empty array in which nothing survives validation is
/// rejected as a whole so garbage cannot masquerade as an empty price list.
pub fn parse_rate_entries(payload: &Value) -> Result<Vec<RateEntry>, HubError> {
    let items = payload
        .as_array()
        .ok_or_else(|| HubError::Validation("expected a JSON array of rates".to_string()))?;

    let mut entries: Vec<RateEntry> = Vec::new();
    let mut index_by_code: HashMap<String, usize> = HashMap::new();

    for item in items {
        let code = item.get("code").and_then(value_as_code);
        let label = item
            .get("label")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string);
        let price = item.get("price").and_then(value_as_price).filter(|p| *p >= 0);

        let (Some(code), Some(label), Some(price)) = (code, label, price) else {
            tracing::warn!("Dropping malformed rate entry: {item}");
            continue;
        };

        match index_by_code.get(&code) {
            Some(&i) => {
                // Same semantics as building a map from the raw list: the
                // last price for a code wins, at the first seen position.
                entries[i] = RateEntry { code, label, price };
            }
            None => {
                index_by_code.insert(code.clone(), entries.len());
                entries.push(RateEntry { code, label, price });
            }
        }
    }

    if entries.is_empty() && !items.is_empty() {
        return Err(HubError::Validation(format!(
            "no valid entries among {} items",
            items.len()
        )));
    }

    Ok(entries)
}

fn price_map(entries: &[RateEntry]) -> HashMap<&str, i64> {
    entries.iter().map(|r| (r.code.as_str(), r.price)).collect()
}

/// Whether the fetched entries constitute a real change against the stored
/// current set.  Cardinality difference or any fetched code whose price is
/// absent/different in the stored set counts; the walk is over the *fetched*
/// codes only, stored-only codes are covered by the size check.
pub fn entries_differ(fetched: &[RateEntry], current: &[RateEntry]) -> bool {
    let fetched_map = price_map(fetched);
    let current_map = price_map(current);

    if fetched_map.len() != current_map.len() {
        return true;
    }
    fetched_map
        .iter()
        .any(|(code, price)| current_map.get(code) != Some(price))
}

/// Board display order: highest fineness first (999 → 750 → 585).
pub fn sorted_for_display(entries: &[RateEntry]) -> Vec<RateEntry> {
    let mut out = entries.to_vec();
    out.sort_by_key(|r| std::cmp::Reverse(r.code.parse::<i64>().unwrap_or(0)));
    out
}

/// Per-purity movement against the previous generation, in display order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceMove {
    pub code: String,
    pub label: String,
    pub price: i64,
    /// Signed difference vs the previous snapshot; 0 when the purity is new
    /// or unchanged.
    pub delta: i64,
}

pub fn price_moves(current: &[RateEntry], previous: &[RateEntry]) -> Vec<PriceMove> {
    let prev_map = price_map(previous);
    sorted_for_display(current)
        .into_iter()
        .map(|r| {
            let delta = prev_map.get(r.code.as_str()).map_or(0, |p| r.price - p);
            PriceMove {
                code: r.code,
                label: r.label,
                price: r.price,
                delta,
            }
        })
        .collect()
}
