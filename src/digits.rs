use std::collections::BTreeMap;

use serde::Serialize;

use crate::rates::RateEntry;

/// How digit tallies are folded and reported.
///
/// `fold_nine_into_six` reflects the physical board, where a "9" is a rotated
/// "6" tile, so both symbols draw from the same stock.  `track_removals`
/// additionally reports digits freed up by the previous price set.
#[derive(Debug, Clone, Copy)]
pub struct DigitPolicy {
    pub fold_nine_into_six: bool,
    pub track_removals: bool,
}

impl Default for DigitPolicy {
    fn default() -> Self {
        Self {
            fold_nine_into_six: true,
            track_removals: true,
        }
    }
}

/// Digits the operator must add to or pull from the board.  Zero deltas are
/// omitted on both sides; keys iterate in ascending digit order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DigitReport {
    pub needed: BTreeMap<char, u32>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub to_remove: BTreeMap<char, u32>,
}

fn tally(entries: &[RateEntry], fold_nine: bool) -> [i64; 10] {
    let mut counts = [0i64; 10];
    for entry in entries {
        for ch in entry.price.to_string().chars() {
            if let Some(d) = ch.to_digit(10) {
                let mut d = d as usize;
                if fold_nine && d == 9 {
                    d = 6;
                }
                counts[d] += 1;
            }
        }
    }
    counts
}

/// Per-digit difference between the current and previous price sets.
pub fn digit_deltas(
    current: &[RateEntry],
    previous: &[RateEntry],
    policy: DigitPolicy,
) -> DigitReport {
    let cur = tally(current, policy.fold_nine_into_six);
    let prev = tally(previous, policy.fold_nine_into_six);

    let mut needed = BTreeMap::new();
    let mut to_remove = BTreeMap::new();
    for d in 0..10 {
        let delta = cur[d] - prev[d];
        let symbol = char::from(b'0' + d as u8);
        if delta > 0 {
            needed.insert(symbol, delta as u32);
        } else if delta < 0 && policy.track_removals {
            to_remove.insert(symbol, (-delta) as u32);
        }
    }
    DigitReport { needed, to_remove }
}
