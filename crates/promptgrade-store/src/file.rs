//! JSON-file aggregate store.
//!
//! One pretty-printed JSON file per owner under a root directory. The
//! stored document embeds the revision, so the concurrency check works
//! across processes sharing the directory.

use std::path::{Path, PathBuf};

use promptgrade_core::error::StoreError;
use promptgrade_core::model::OwnerAggregate;
use promptgrade_core::traits::{FunctionStore, VersionedAggregate};

/// Aggregate store backed by a directory of JSON files.
pub struct JsonFileStore {
    root: PathBuf,
}

impl JsonFileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, owner: &str) -> PathBuf {
        self.root.join(format!("{}.json", sanitize(owner)))
    }
}

/// Owner keys map to filenames; anything outside `[A-Za-z0-9_-]` becomes
/// an underscore.
fn sanitize(owner: &str) -> String {
    owner
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}

impl FunctionStore for JsonFileStore {
    fn load(&self, owner: &str) -> Result<Option<VersionedAggregate>, StoreError> {
        let path = self.path_for(owner);
        if !path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(&path)?;
        let stored: VersionedAggregate = serde_json::from_str(&content)?;
        Ok(Some(stored))
    }

    fn save(
        &self,
        owner: &str,
        aggregate: &OwnerAggregate,
        expected: Option<u64>,
    ) -> Result<u64, StoreError> {
        std::fs::create_dir_all(&self.root)?;

        let found = self.load(owner)?.map(|stored| stored.revision);
        if expected != found {
            return Err(StoreError::ConcurrentModification {
                owner: owner.to_string(),
                expected,
                found,
            });
        }

        let revision = found.unwrap_or(0) + 1;
        let stored = VersionedAggregate {
            aggregate: aggregate.clone(),
            revision,
        };
        let json = serde_json::to_string_pretty(&stored)?;
        std::fs::write(self.path_for(owner), json)?;
        tracing::debug!(owner, revision, "aggregate saved");
        Ok(revision)
    }
}
