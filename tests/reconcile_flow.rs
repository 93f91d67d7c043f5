use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use goldrate_hub::error::HubError;
use goldrate_hub::fetch::RateSource;
use goldrate_hub::rates::Snapshot;
use goldrate_hub::reconcile::Reconciler;
use goldrate_hub::store::{MemoryStore, RotationOutcome, Slot, SnapshotStore};

/// Feeds refresh cycles a pre-scripted sequence of upstream outcomes.
struct ScriptedSource {
    responses: Mutex<VecDeque<Result<Value, HubError>>>,
}

impl ScriptedSource {
    fn new(responses: Vec<Result<Value, HubError>>) -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(responses.into()),
        })
    }
}

#[async_trait]
impl RateSource for ScriptedSource {
    async fn fetch(&self) -> Result<Value, HubError> {
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(HubError::Fetch("script exhausted".to_string())))
    }
}

fn payload(prices: &[(&str, i64)]) -> Value {
    Value::Array(
        prices
            .iter()
            .map(|(code, price)| json!({"code": code, "label": code, "price": price}))
            .collect(),
    )
}

fn reconciler_with(
    responses: Vec<Result<Value, HubError>>,
) -> (Reconciler, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    let source = ScriptedSource::new(responses);
    (
        Reconciler::new(source, Arc::clone(&store) as Arc<dyn SnapshotStore>),
        store,
    )
}

#[tokio::test]
async fn rotation_lifecycle_across_three_fetches() {
    let (reconciler, _store) = reconciler_with(vec![
        Ok(payload(&[("999", 25000), ("750", 19000)])),
        Ok(payload(&[("999", 25000), ("750", 19000)])),
        Ok(payload(&[("999", 25500), ("750", 19000)])),
        Ok(payload(&[("999", 25500), ("750", 19000)])),
    ]);

    // First fetch into an empty store.
    let first = reconciler.refresh().await.unwrap();
    assert_eq!(first.current.len(), 2);
    assert!(first.previous.is_empty());
    assert!(first.previous_updated.is_none());
    let born = first.last_updated;

    // Identical second fetch: no rotation, stable timestamp.
    tokio::time::sleep(Duration::from_millis(5)).await;
    let second = reconciler.refresh().await.unwrap();
    assert_eq!(second.last_updated, born);
    assert!(second.previous.is_empty());

    // A real change rotates and advances the timestamp.
    tokio::time::sleep(Duration::from_millis(5)).await;
    let third = reconciler.refresh().await.unwrap();
    assert_eq!(third.current[0].price, 25500);
    assert_eq!(third.previous, first.current);
    assert!(third.last_updated > born);
    assert_eq!(third.previous_updated, Some(born));

    // Another identical fetch leaves both generations alone.
    let fourth = reconciler.refresh().await.unwrap();
    assert_eq!(fourth.last_updated, third.last_updated);
    assert_eq!(fourth.previous, first.current);
    assert_eq!(fourth.previous_updated, Some(born));
}

#[tokio::test]
async fn entries_come_back_in_descending_purity_order() {
    let (reconciler, _store) = reconciler_with(vec![Ok(payload(&[
        ("585", 14000),
        ("999", 25000),
        ("750", 19000),
    ]))]);

    let view = reconciler.refresh().await.unwrap();
    let codes: Vec<&str> = view.current.iter().map(|r| r.code.as_str()).collect();
    assert_eq!(codes, vec!["999", "750", "585"]);
}

#[tokio::test]
async fn upstream_failure_serves_the_cached_generations() {
    let (reconciler, _store) = reconciler_with(vec![
        Ok(payload(&[("999", 25000)])),
        Err(HubError::Fetch("connection refused".to_string())),
    ]);

    let first = reconciler.refresh().await.unwrap();
    let fallback = reconciler.refresh().await.unwrap();
    assert_eq!(fallback.current, first.current);
    assert_eq!(fallback.last_updated, first.last_updated);
}

#[tokio::test]
async fn upstream_failure_with_an_empty_store_is_a_hard_error() {
    let (reconciler, _store) =
        reconciler_with(vec![Err(HubError::Fetch("timeout".to_string()))]);

    match reconciler.refresh().await {
        Err(HubError::NoData) => {}
        other => panic!("expected NoData, got {other:?}"),
    }
}

#[tokio::test]
async fn malformed_entries_are_dropped_before_comparison() {
    let (reconciler, _store) = reconciler_with(vec![Ok(json!([
        {"code": "999", "label": "999", "price": 25000},
        {"label": "no code", "price": 1},
        {"code": "750", "label": "750", "price": "not a number"},
        {"code": "585", "label": "585", "price": 14000},
    ]))]);

    let view = reconciler.refresh().await.unwrap();
    let codes: Vec<&str> = view.current.iter().map(|r| r.code.as_str()).collect();
    assert_eq!(codes, vec!["999", "585"]);
}

#[tokio::test]
async fn fully_invalid_payload_counts_as_a_failed_refresh() {
    let (reconciler, _store) = reconciler_with(vec![
        Ok(payload(&[("999", 25000)])),
        Ok(json!([{"bogus": true}, {"also": "bogus"}])),
    ]);

    let first = reconciler.refresh().await.unwrap();
    let fallback = reconciler.refresh().await.unwrap();
    assert_eq!(fallback.current, first.current);
    assert_eq!(fallback.last_updated, first.last_updated);
}

/// Delegates to a real store but can be armed to fail rotation.
struct FlakyStore {
    inner: MemoryStore,
    fail_rotate: AtomicBool,
}

impl FlakyStore {
    fn arm(&self) {
        self.fail_rotate.store(true, Ordering::SeqCst);
    }

    fn disarm(&self) {
        self.fail_rotate.store(false, Ordering::SeqCst);
    }
}

impl SnapshotStore for FlakyStore {
    fn read(&self, slot: Slot) -> Result<Option<Snapshot>, HubError> {
        self.inner.read(slot)
    }

    fn write(&self, slot: Slot, snapshot: &Snapshot) -> Result<(), HubError> {
        self.inner.write(slot, snapshot)
    }

    fn rotate(&self, candidate: Snapshot) -> Result<RotationOutcome, HubError> {
        if self.fail_rotate.load(Ordering::SeqCst) {
            return Err(HubError::Storage("disk full".to_string()));
        }
        self.inner.rotate(candidate)
    }
}

#[tokio::test]
async fn failed_rotation_surfaces_and_leaves_generations_intact() {
    let store = Arc::new(FlakyStore {
        inner: MemoryStore::new(),
        fail_rotate: AtomicBool::new(false),
    });
    let source = ScriptedSource::new(vec![
        Ok(payload(&[("999", 25000)])),
        Ok(payload(&[("999", 26000)])),
    ]);
    let reconciler = Reconciler::new(source, Arc::clone(&store) as Arc<dyn SnapshotStore>);

    let first = reconciler.refresh().await.unwrap();

    store.arm();
    match reconciler.refresh().await {
        Err(HubError::Storage(_)) => {}
        other => panic!("expected Storage, got {other:?}"),
    }
    store.disarm();

    let view = reconciler.view().await.unwrap();
    assert_eq!(view.current, first.current);
    assert_eq!(view.last_updated, first.last_updated);
    assert!(view.previous.is_empty());
}

#[tokio::test]
async fn concurrent_refreshes_rotate_at_most_once() {
    let changed = payload(&[("999", 26000)]);
    let (reconciler, store) = reconciler_with(vec![
        Ok(payload(&[("999", 25000)])),
        Ok(changed.clone()),
        Ok(changed),
    ]);
    let reconciler = Arc::new(reconciler);

    reconciler.refresh().await.unwrap();

    let a = Arc::clone(&reconciler);
    let b = Arc::clone(&reconciler);
    let (ra, rb) = tokio::join!(
        tokio::spawn(async move { a.refresh().await }),
        tokio::spawn(async move { b.refresh().await }),
    );
    ra.unwrap().unwrap();
    rb.unwrap().unwrap();

    // The second racer must observe "unchanged", not rotate the freshly
    // rotated value over the real history.
    let previous = store.read(Slot::Previous).unwrap().unwrap();
    assert_eq!(previous.entries[0].price, 25000);
    let current = store.read(Slot::Current).unwrap().unwrap();
    assert_eq!(current.entries[0].price, 26000);
}
