use std::sync::{Arc, RwLock};

use crate::error::HubError;
use crate::rates::{entries_differ, Snapshot};

use super::{RotationOutcome, Slot, SnapshotStore};

#[derive(Debug, Default)]
struct TwoSlots {
    current: Option<Snapshot>,
    previous: Option<Snapshot>,
}

/// In-memory snapshot store backed by `Arc<RwLock<..>>`.
///
/// Clone-friendly (cloning shares the same underlying slots).  Used by tests
/// and by deployments that are content to lose history on restart.
#[derive(Clone, Default)]
pub struct MemoryStore {
    slots: Arc<RwLock<TwoSlots>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SnapshotStore for MemoryStore {
    fn read(&self, slot: Slot) -> Result<Option<Snapshot>, HubError> {
        let slots = self
            .slots
            .read()
            .map_err(|_| HubError::Storage("slot lock poisoned".to_string()))?;
        Ok(match slot {
            Slot::Current => slots.current.clone(),
            Slot::Previous => slots.previous.clone(),
        })
    }

    fn write(&self, slot: Slot, snapshot: &Snapshot) -> Result<(), HubError> {
        let mut slots = self
            .slots
            .write()
            .map_err(|_| HubError::Storage("slot lock poisoned".to_string()))?;
        match slot {
            Slot::Current => slots.current = Some(snapshot.clone()),
            Slot::Previous => slots.previous = Some(snapshot.clone()),
        }
        Ok(())
    }

    fn rotate(&self, candidate: Snapshot) -> Result<RotationOutcome, HubError> {
        // One write guard across read-compare-swap keeps the rotation atomic.
        let mut slots = self
            .slots
            .write()
            .map_err(|_| HubError::Storage("slot lock poisoned".to_string()))?;

        match slots.current.take() {
            None => {
                slots.current = Some(candidate);
                Ok(RotationOutcome::Initialized)
            }
            Some(current) => {
                if !entries_differ(&candidate.entries, &current.entries) {
                    slots.current = Some(current);
                    return Ok(RotationOutcome::Unchanged);
                }
                slots.previous = Some(current);
                slots.current = Some(candidate);
                Ok(RotationOutcome::Rotated)
            }
        }
    }
}
