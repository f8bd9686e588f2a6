// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (c) 2024 Zaparoo Project contributors

//! Persistence for user-editable mappings (the "database" layer of the
//! resolution precedence chain).

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicI64, Ordering};

use parking_lot::RwLock;
use zt_core::Mapping;

use crate::error::MappingError;

/// CRUD over the set of user-defined mappings.
pub trait MappingStore: Send + Sync {
    fn list(&self) -> Vec<Mapping>;
    fn get(&self, id: i64) -> Option<Mapping>;
    fn add(&self, mapping: Mapping) -> Result<Mapping, MappingError>;
    fn update(&self, mapping: Mapping) -> Result<(), MappingError>;
    fn remove(&self, id: i64) -> Result<(), MappingError>;

    /// Re-reads the store's backing from disk, discarding the in-memory
    /// copy. A no-op for stores with no disk backing.
    fn reload(&self) -> Result<(), MappingError> {
        Ok(())
    }
}

/// A [`MappingStore`] backed by a single JSON file, loaded in full on
/// startup and rewritten in full on every mutation. Mapping counts in
/// practice are in the tens to low hundreds, so this is simpler than a
/// real database without being a bottleneck.
pub struct JsonFileStore {
    path: PathBuf,
    mappings: RwLock<Vec<Mapping>>,
    next_id: AtomicI64,
}

impl JsonFileStore {
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, MappingError> {
        let path = path.into();
        let mappings: Vec<Mapping> = if path.exists() {
            let content = std::fs::read_to_string(&path)?;
            serde_json::from_str(&content)?
        } else {
            Vec::new()
        };
        let next_id = mappings.iter().filter_map(|m| m.id).max().unwrap_or(0) + 1;
        Ok(Self {
            path,
            mappings: RwLock::new(mappings),
            next_id: AtomicI64::new(next_id),
        })
    }

    fn persist(&self, mappings: &[Mapping]) -> Result<(), MappingError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(mappings)?;
        std::fs::write(&self.path, content)?;
        Ok(())
    }
}

impl MappingStore for JsonFileStore {
    fn list(&self) -> Vec<Mapping> {
        self.mappings.read().clone()
    }

    fn get(&self, id: i64) -> Option<Mapping> {
        self.mappings.read().iter().find(|m| m.id == Some(id)).cloned()
    }

    fn add(&self, mut mapping: Mapping) -> Result<Mapping, MappingError> {
        let mut mappings = self.mappings.write();
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        mapping.id = Some(id);
        mappings.push(mapping.clone());
        self.persist(&mappings)?;
        Ok(mapping)
    }

    fn update(&self, mapping: Mapping) -> Result<(), MappingError> {
        let mut mappings = self.mappings.write();
        let Some(existing) = mappings.iter_mut().find(|m| m.id == mapping.id) else {
            return Err(MappingError::NotFound(mapping.id.unwrap_or(-1)));
        };
        *existing = mapping;
        self.persist(&mappings)
    }

    fn remove(&self, id: i64) -> Result<(), MappingError> {
        let mut mappings = self.mappings.write();
        let before = mappings.len();
        mappings.retain(|m| m.id != Some(id));
        if mappings.len() == before {
            return Err(MappingError::NotFound(id));
        }
        self.persist(&mappings)
    }

    fn reload(&self) -> Result<(), MappingError> {
        let mappings: Vec<Mapping> = if self.path.exists() {
            let content = std::fs::read_to_string(&self.path)?;
            serde_json::from_str(&content)?
        } else {
            Vec::new()
        };
        let next_id = mappings.iter().filter_map(|m| m.id).max().unwrap_or(0) + 1;
        self.next_id.store(next_id, Ordering::SeqCst);
        *self.mappings.write() = mappings;
        Ok(())
    }
}

/// An in-process store with no disk backing, used in tests and by the
/// dispatch pipeline's demo platform.
#[derive(Default)]
pub struct MemoryStore {
    mappings: RwLock<Vec<Mapping>>,
    next_id: AtomicI64,
}

impl MappingStore for MemoryStore {
    fn list(&self) -> Vec<Mapping> {
        self.mappings.read().clone()
    }

    fn get(&self, id: i64) -> Option<Mapping> {
        self.mappings.read().iter().find(|m| m.id == Some(id)).cloned()
    }

    fn add(&self, mut mapping: Mapping) -> Result<Mapping, MappingError> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        mapping.id = Some(id);
        self.mappings.write().push(mapping.clone());
        Ok(mapping)
    }

    fn update(&self, mapping: Mapping) -> Result<(), MappingError> {
        let mut mappings = self.mappings.write();
        let Some(existing) = mappings.iter_mut().find(|m| m.id == mapping.id) else {
            return Err(MappingError::NotFound(mapping.id.unwrap_or(-1)));
        };
        *existing = mapping;
        Ok(())
    }

    fn remove(&self, id: i64) -> Result<(), MappingError> {
        let mut mappings = self.mappings.write();
        let before = mappings.len();
        mappings.retain(|m| m.id != Some(id));
        if mappings.len() == before {
            return Err(MappingError::NotFound(id));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use zt_core::{MappingType, MatchType};

    #[test]
    fn json_file_store_persists_across_reload() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("mappings.json");

        {
            let store = JsonFileStore::load(&path).expect("load");
            store
                .add(Mapping::new(MappingType::Uid, MatchType::Exact, "04a1b2", "launch.system snes"))
                .expect("add");
        }

        let reloaded = JsonFileStore::load(&path).expect("reload");
        assert_eq!(reloaded.list().len(), 1);
    }

    #[test]
    fn memory_store_assigns_increasing_ids() {
        let store = MemoryStore::default();
        let a = store
            .add(Mapping::new(MappingType::Uid, MatchType::Exact, "a", "x"))
            .expect("add a");
        let b = store
            .add(Mapping::new(MappingType::Uid, MatchType::Exact, "b", "y"))
            .expect("add b");
        assert!(b.id.unwrap() > a.id.unwrap());
    }
}
