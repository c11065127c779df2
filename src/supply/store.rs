use std::sync::{Arc, RwLock};

use crate::units::DisplayAmount;

/// A consistent pair of supply figures from a single refresh.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SupplySnapshot {
    pub total_supply: DisplayAmount,
    pub circulating_supply: DisplayAmount,
}

/// Holds the most recently published snapshot. Readers get the whole snapshot or nothing, a
/// publish swaps the entire value under the write lock.
#[derive(Debug, Default)]
pub struct SnapshotStore {
    current: RwLock<Arc<SupplySnapshot>>,
}

impl SnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Arc<SupplySnapshot> {
        self.current
            .read()
            .expect("snapshot lock poisoned")
            .clone()
    }

    pub fn publish(&self, snapshot: SupplySnapshot) {
        *self.current.write().expect("snapshot lock poisoned") = Arc::new(snapshot);
    }
}
