//! In-memory aggregate store.

use std::collections::HashMap;
use std::sync::Mutex;

use promptgrade_core::error::StoreError;
use promptgrade_core::model::OwnerAggregate;
use promptgrade_core::traits::{FunctionStore, VersionedAggregate};

/// Aggregate store backed by a process-local map, for tests and embedded
/// callers that do not need durability.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<HashMap<String, VersionedAggregate>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl FunctionStore for MemoryStore {
    fn load(&self, owner: &str) -> Result<Option<VersionedAggregate>, StoreError> {
        Ok(self.inner.lock().unwrap().get(owner).cloned())
    }

    fn save(
        &self,
        owner: &str,
        aggregate: &OwnerAggregate,
        expected: Option<u64>,
    ) -> Result<u64, StoreError> {
        let mut map = self.inner.lock().unwrap();
        let found = map.get(owner).map(|stored| stored.revision);
        if expected != found {
            return Err(StoreError::ConcurrentModification {
                owner: owner.to_string(),
                expected,
                found,
            });
        }
        let revision = found.unwrap_or(0) + 1;
        map.insert(
            owner.to_string(),
            VersionedAggregate {
                aggregate: aggregate.clone(),
                revision,
            },
        );
        Ok(revision)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_load_update_cycle() {
        let store = MemoryStore::new();
        assert!(store.load("alice").unwrap().is_none());

        let mut aggregate = OwnerAggregate::new("alice");
        let rev1 = store.save("alice", &aggregate, None).unwrap();
        assert_eq!(rev1, 1);

        let loaded = store.load("alice").unwrap().unwrap();
        assert_eq!(loaded.revision, 1);
        assert_eq!(loaded.aggregate, aggregate);

        aggregate.owner_key = "alice".into();
        let rev2 = store.save("alice", &aggregate, Some(rev1)).unwrap();
        assert_eq!(rev2, 2);
    }

    #[test]
    fn concurrent_cycles_conflict_and_retry() {
        let store = MemoryStore::new();
        let aggregate = OwnerAggregate::new("alice");
        store.save("alice", &aggregate, None).unwrap();

        // Two callers load the same revision.
        let first = store.load("alice").unwrap().unwrap();
        let second = store.load("alice").unwrap().unwrap();

        // The first write wins.
        store
            .save("alice", &first.aggregate, Some(first.revision))
            .unwrap();

        // The second must observe the conflict, not silently overwrite.
        let err = store
            .save("alice", &second.aggregate, Some(second.revision))
            .unwrap_err();
        assert!(err.is_retryable());

        // Retrying the whole cycle succeeds.
        let reloaded = store.load("alice").unwrap().unwrap();
        store
            .save("alice", &reloaded.aggregate, Some(reloaded.revision))
            .unwrap();
    }

    #[test]
    fn blind_create_over_existing_aggregate_is_rejected() {
        let store = MemoryStore::new();
        let aggregate = OwnerAggregate::new("alice");
        store.save("alice", &aggregate, None).unwrap();

        let err = store.save("alice", &aggregate, None).unwrap_err();
        assert!(matches!(
            err,
            StoreError::ConcurrentModification {
                expected: None,
                found: Some(1),
                ..
            }
        ));
    }
}
