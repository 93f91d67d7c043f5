use std::sync::Arc;

use chrono::{DateTime, FixedOffset, TimeZone, Utc};
use tokio::sync::watch;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::state::AppState;

/// Next wall-clock trigger strictly after `now`.
///
/// `hours` is the sorted list of local trigger hours; `offset_hours` places
/// the board's wall clock relative to UTC.  `None` when `hours` is empty or
/// the offset is out of range.
pub fn next_run_at(now: DateTime<Utc>, hours: &[u32], offset_hours: i32) -> Option<DateTime<Utc>> {
    let offset = FixedOffset::east_opt(offset_hours.checked_mul(3600)?)?;
    let local = now.with_timezone(&offset);

    for &h in hours {
        let slot = local.date_naive().and_hms_opt(h, 0, 0)?;
        let slot = offset.from_local_datetime(&slot).single()?;
        if slot > local {
            return Some(slot.with_timezone(&Utc));
        }
    }
    let first = *hours.first()?;
    let slot = local.date_naive().succ_opt()?.and_hms_opt(first, 0, 0)?;
    Some(offset.from_local_datetime(&slot).single()?.with_timezone(&Utc))
}

/// Background loop refreshing rates at the configured local hours.
///
/// The deadline is recomputed from "now" after every wake-up, so a process
/// suspended across a slot fires that slot once on resume and then moves on.
pub async fn run(state: Arc<AppState>, mut shutdown: watch::Receiver<bool>) {
    let hours = state.config.update_hours.clone();
    let offset_hours = state.config.utc_offset_hours;
    if hours.is_empty() {
        info!("scheduler disabled (no update hours configured)");
        return;
    }

    loop {
        let now = Utc::now();
        let Some(at) = next_run_at(now, &hours, offset_hours) else {
            warn!("scheduler cannot compute a next slot, stopping");
            return;
        };
        let wait = (at - now).to_std().unwrap_or_default();
        debug!("next scheduled refresh at {at}");

        tokio::select! {
            _ = sleep(wait) => {
                if let Err(e) = state.reconciler.refresh().await {
                    warn!("scheduled refresh failed: {e}");
                }
            }
            _ = shutdown.changed() => {
                info!("scheduler stopped");
                return;
            }
        }
    }
}
