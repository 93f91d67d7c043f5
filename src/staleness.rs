use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

/// Freshness verdict for the board indicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Staleness {
    pub stale: bool,
    /// Whole seconds since the last real change; absent when nothing is stored.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub age_secs: Option<i64>,
}

/// Classifies a last-change timestamp against the staleness threshold.
///
/// No timestamp means stale.  Callers that read timestamps from untyped
/// sources map anything unparseable to `None` before calling in.
pub fn evaluate(
    last_updated: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
    threshold: Duration,
) -> Staleness {
    match last_updated {
        None => Staleness {
            stale: true,
            age_secs: None,
        },
        Some(t) => {
            let elapsed = now.signed_duration_since(t);
            Staleness {
                stale: elapsed >= threshold,
                age_secs: Some(elapsed.num_seconds()),
            }
        }
    }
}

pub fn is_stale(last_updated: Option<DateTime<Utc>>, now: DateTime<Utc>, threshold: Duration) -> bool {
    evaluate(last_updated, now, threshold).stale
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    fn threshold() -> Duration {
        Duration::hours(12)
    }

    #[test]
    fn absent_timestamp_is_stale() {
        let verdict = evaluate(None, at(1_000_000), threshold());
        assert!(verdict.stale);
        assert_eq!(verdict.age_secs, None);
    }

    #[test]
    fn just_under_the_threshold_is_fresh() {
        let now = at(1_000_000);
        let updated = now - Duration::hours(11) - Duration::minutes(59);
        assert!(!is_stale(Some(updated), now, threshold()));
    }

    #[test]
    fn exactly_at_the_threshold_is_stale() {
        let now = at(1_000_000);
        assert!(is_stale(Some(now - Duration::hours(12)), now, threshold()));
    }

    #[test]
    fn future_timestamp_reads_as_fresh() {
        let now = at(1_000_000);
        let verdict = evaluate(Some(now + Duration::hours(1)), now, threshold());
        assert!(!verdict.stale);
        assert_eq!(verdict.age_secs, Some(-3600));
    }
}
