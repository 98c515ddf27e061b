use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use petit_core::{Alias, Provider, Result, StorageError};
use tracing::trace;

/// In-memory provider backed by a [`DashMap`].
///
/// The check-then-insert in [`store`](Provider::store) runs under the
/// shard lock held by the entry API, so two stores of the same alias can
/// never both succeed. Contents are lost when the provider is dropped.
#[derive(Debug, Default)]
pub struct MemoryProvider {
    records: DashMap<String, String>,
}

impl MemoryProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            records: DashMap::with_capacity(capacity),
        }
    }

    /// Number of stored records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[async_trait]
impl Provider for MemoryProvider {
    async fn get(&self, alias: &Alias) -> Result<String> {
        self.records
            .get(alias.as_str())
            .map(|target| target.value().clone())
            .ok_or_else(|| StorageError::NotFound(alias.to_string()))
    }

    async fn exists(&self, alias: &Alias) -> Result<bool> {
        Ok(self.records.contains_key(alias.as_str()))
    }

    async fn store(&self, target: &str, alias: &Alias) -> Result<()> {
        match self.records.entry(alias.as_str().to_owned()) {
            Entry::Occupied(_) => Err(StorageError::AlreadyExists(alias.to_string())),
            Entry::Vacant(slot) => {
                slot.insert(target.to_owned());
                trace!(alias = %alias, "Stored record in memory");
                Ok(())
            }
        }
    }
}
