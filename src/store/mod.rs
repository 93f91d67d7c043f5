mod memory;
mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use crate::error::HubError;
use crate::rates::Snapshot;

/// The two snapshot generations the hub ever keeps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    Current,
    Previous,
}

impl Slot {
    pub fn key(self) -> &'static str {
        match self {
            Self::Current => "current",
            Self::Previous => "previous",
        }
    }
}

/// What `rotate` did with the candidate snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RotationOutcome {
    /// First-ever snapshot: `current` written, `previous` untouched.
    Initialized,
    /// Real change: old `current` moved to `previous`, candidate committed.
    Rotated,
    /// No price/cardinality change: nothing written, timestamps unchanged.
    Unchanged,
}

/// Two-slot snapshot persistence.
///
/// `rotate` is the only mutation the reconciler uses and must be atomic with
/// respect to concurrent callers: it re-checks equality against `current`
/// under the backend's own exclusion, and a failure part-way through must
/// leave both slots exactly as they were (never fewer generations than
/// before).  `write` exists for backends' internals and for tests that need
/// to seed a specific state.
pub trait SnapshotStore: Send + Sync {
    fn read(&self, slot: Slot) -> Result<Option<Snapshot>, HubError>;

    fn write(&self, slot: Slot, snapshot: &Snapshot) -> Result<(), HubError>;

    fn rotate(&self, candidate: Snapshot) -> Result<RotationOutcome, HubError>;
}
