use std::sync::Arc;
use std::time::Duration;

use crate::config::{HubConfig, StoreBackend};
use crate::digits::DigitPolicy;
use crate::error::HubError;
use crate::fetch::HttpRateSource;
use crate::reconcile::Reconciler;
use crate::store::{MemoryStore, SnapshotStore, SqliteStore};

/// Shared application state handed to every route and the scheduler.
pub struct AppState {
    pub config: HubConfig,
    pub reconciler: Reconciler,
}

impl AppState {
    pub fn build(config: HubConfig) -> Result<Self, HubError> {
        let store: Arc<dyn SnapshotStore> = match config.store {
            StoreBackend::Memory => Arc::new(MemoryStore::new()),
            StoreBackend::Sqlite => Arc::new(SqliteStore::open(&config.db_path)?),
        };
        let source = Arc::new(HttpRateSource::new(
            &config.source_url,
            Duration::from_secs(config.fetch_timeout_s),
        )?);
        Ok(Self {
            reconciler: Reconciler::new(source, store),
            config,
        })
    }

    pub fn digit_policy(&self) -> DigitPolicy {
        DigitPolicy {
            fold_nine_into_six: self.config.fold_nine,
            track_removals: self.config.track_removals,
        }
    }

    pub fn stale_threshold(&self) -> chrono::Duration {
        chrono::Duration::hours(self.config.stale_hours as i64)
    }
}
