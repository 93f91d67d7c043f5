use std::sync::Arc;

use chrono::Utc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::error::HubError;
use crate::fetch::RateSource;
use crate::rates::{parse_rate_entries, sorted_for_display, RateEntry, RatesResponse, Snapshot};
use crate::store::{RotationOutcome, Slot, SnapshotStore};

/// Drives the fetch-compare-rotate cycle against the snapshot store.
///
/// All store mutation happens under `gate`, so overlapping triggers (route
/// hit, scheduler tick) serialize instead of double-rotating.  Rotation
/// itself is synchronous: a refresh cancelled mid-fetch has written nothing.
pub struct Reconciler {
    source: Arc<dyn RateSource>,
    store: Arc<dyn SnapshotStore>,
    gate: Mutex<()>,
}

impl Reconciler {
    pub fn new(source: Arc<dyn RateSource>, store: Arc<dyn SnapshotStore>) -> Self {
        Self {
            source,
            store,
            gate: Mutex::new(()),
        }
    }

    /// Full refresh cycle.  Upstream trouble degrades to the last stored
    /// generations; a hard error comes back only when the store is empty too.
    pub async fn refresh(&self) -> Result<RatesResponse, HubError> {
        let _busy = self.gate.lock().await;
        match self.fetch_entries().await {
            Ok(entries) => self.reconcile(entries),
            Err(e) => self.fall_back(e),
        }
    }

    /// Store contents without touching upstream.
    pub async fn view(&self) -> Result<RatesResponse, HubError> {
        let _busy = self.gate.lock().await;
        self.assemble()
    }

    async fn fetch_entries(&self) -> Result<Vec<RateEntry>, HubError> {
        let payload = self.source.fetch().await?;
        parse_rate_entries(&payload)
    }

    fn reconcile(&self, entries: Vec<RateEntry>) -> Result<RatesResponse, HubError> {
        let count = entries.len();
        let outcome = self.store.rotate(Snapshot::new(entries, Utc::now()))?;
        match outcome {
            RotationOutcome::Initialized => info!("stored first snapshot ({count} rates)"),
            RotationOutcome::Rotated => info!("prices changed, rotated generations ({count} rates)"),
            RotationOutcome::Unchanged => debug!("prices unchanged"),
        }
        self.assemble()
    }

    fn fall_back(&self, cause: HubError) -> Result<RatesResponse, HubError> {
        if self.store.read(Slot::Current)?.is_none() {
            warn!("upstream failed with nothing stored: {cause}");
            return Err(HubError::NoData);
        }
        warn!("upstream failed, serving stored snapshot: {cause}");
        self.assemble()
    }

    fn assemble(&self) -> Result<RatesResponse, HubError> {
        let current = self.store.read(Slot::Current)?.ok_or(HubError::NoData)?;
        let previous = self.store.read(Slot::Previous)?;
        Ok(RatesResponse {
            current: sorted_for_display(&current.entries),
            previous: previous
                .as_ref()
                .map(|p| sorted_for_display(&p.entries))
                .unwrap_or_default(),
            last_updated: current.captured_at,
            previous_updated: previous.map(|p| p.captured_at),
        })
    }
}
