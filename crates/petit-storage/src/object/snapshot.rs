use super::map_object_error;
use async_trait::async_trait;
use bytes::Bytes;
use object_store::path::Path as ObjectPath;
use object_store::{ObjectStore, PutPayload};
use petit_core::{Alias, Delete, InfraError, Provider, Result, StorageError};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, trace, warn};

/// Keeps every record in memory and mirrors the whole mapping to a single
/// JSON document in an object store.
///
/// Every write uploads the full document, so throughput degrades with the
/// number of records. Writers in separate processes are not coordinated:
/// the last upload wins and may discard a concurrent addition.
#[derive(Debug)]
pub struct SnapshotObjectProvider {
    store: Arc<dyn ObjectStore>,
    path: ObjectPath,
    records: RwLock<HashMap<String, String>>,
}

impl SnapshotObjectProvider {
    /// Loads the document at `prefix/key`. A missing document is an empty
    /// mapping; a malformed one is an error.
    pub async fn open(store: Arc<dyn ObjectStore>, prefix: &ObjectPath, key: &str) -> Result<Self> {
        let path = prefix.child(key);

        let records = match store.get(&path).await {
            Ok(result) => {
                let body = result
                    .bytes()
                    .await
                    .map_err(|e| map_object_error(path.as_ref(), e))?;
                serde_json::from_slice::<HashMap<String, String>>(&body).map_err(|e| {
                    InfraError::invalid_data(format!("malformed snapshot '{path}': {e}"))
                })?
            }
            Err(object_store::Error::NotFound { .. }) => {
                debug!(path = %path, "No snapshot found, starting empty");
                HashMap::new()
            }
            Err(err) => return Err(map_object_error(path.as_ref(), err)),
        };

        debug!(path = %path, records = records.len(), "Loaded snapshot");
        Ok(Self {
            store,
            path,
            records: RwLock::new(records),
        })
    }

    /// Number of records currently held.
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    async fn upload(&self, records: &HashMap<String, String>) -> Result<()> {
        let body = serde_json::to_vec(records)
            .map_err(|e| InfraError::invalid_data(format!("failed to encode snapshot: {e}")))?;

        self.store
            .put(&self.path, PutPayload::from(Bytes::from(body)))
            .await
            .map_err(|e| map_object_error(self.path.as_ref(), e))?;
        Ok(())
    }
}

#[async_trait]
impl Provider for SnapshotObjectProvider {
    async fn get(&self, alias: &Alias) -> Result<String> {
        self.records
            .read()
            .await
            .get(alias.as_str())
            .cloned()
            .ok_or_else(|| StorageError::NotFound(alias.to_string()))
    }

    async fn exists(&self, alias: &Alias) -> Result<bool> {
        Ok(self.records.read().await.contains_key(alias.as_str()))
    }

    async fn store(&self, target: &str, alias: &Alias) -> Result<()> {
        let mut records = self.records.write().await;
        if records.contains_key(alias.as_str()) {
            return Err(StorageError::AlreadyExists(alias.to_string()));
        }

        records.insert(alias.as_str().to_owned(), target.to_owned());
        if let Err(err) = self.upload(&records).await {
            records.remove(alias.as_str());
            warn!(alias = %alias, error = %err, "Snapshot upload failed, record rolled back");
            return Err(err);
        }

        trace!(alias = %alias, "Stored record in snapshot");
        Ok(())
    }
}

#[async_trait]
impl Delete for SnapshotObjectProvider {
    async fn delete(&self, alias: &Alias) -> Result<bool> {
        let mut records = self.records.write().await;
        let Some(previous) = records.remove(alias.as_str()) else {
            return Ok(false);
        };

        if let Err(err) = self.upload(&records).await {
            records.insert(alias.as_str().to_owned(), previous);
            warn!(alias = %alias, error = %err, "Snapshot upload failed, delete rolled back");
            return Err(err);
        }

        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::test_store::TestStore;
    use object_store::memory::InMemory;
    use petit_test_infra::conformance;

    fn memory_store() -> Arc<dyn ObjectStore> {
        Arc::new(InMemory::new())
    }

    async fn provider(store: Arc<dyn ObjectStore>) -> SnapshotObjectProvider {
        SnapshotObjectProvider::open(store, &ObjectPath::from("links"), "petit.json")
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn satisfies_provider_contract() {
        conformance::basic_contract(&provider(memory_store()).await).await;
    }

    #[tokio::test]
    async fn round_trips_targets() {
        conformance::round_trips(&provider(memory_store()).await).await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_store_has_single_winner() {
        conformance::concurrent_store(Arc::new(provider(memory_store()).await), 32).await;
    }

    #[tokio::test]
    async fn document_is_json_map_and_reloads() {
        let store = memory_store();
        let first = provider(Arc::clone(&store)).await;
        first
            .store("https://example.com", &Alias::new("a").unwrap())
            .await
            .unwrap();
        first
            .store("https://example.org", &Alias::new("b").unwrap())
            .await
            .unwrap();

        let body = store
            .get(&ObjectPath::from("links/petit.json"))
            .await
            .unwrap()
            .bytes()
            .await
            .unwrap();
        let document: HashMap<String, String> = serde_json::from_slice(&body).unwrap();
        assert_eq!(document.len(), 2);
        assert_eq!(document["a"], "https://example.com");

        let reopened = provider(store).await;
        assert_eq!(reopened.len().await, 2);
        assert_eq!(
            reopened.get(&Alias::new("b").unwrap()).await.unwrap(),
            "https://example.org"
        );
    }

    #[tokio::test]
    async fn malformed_document_fails_open() {
        let store = memory_store();
        store
            .put(
                &ObjectPath::from("links/petit.json"),
                PutPayload::from_static(b"not json"),
            )
            .await
            .unwrap();

        let err = SnapshotObjectProvider::open(store, &ObjectPath::from("links"), "petit.json")
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::Infra(_)));
    }

    #[tokio::test]
    async fn delete_removes_record_from_document() {
        let store = memory_store();
        let snapshot = provider(Arc::clone(&store)).await;
        let alias = Alias::new("gone").unwrap();

        assert!(!snapshot.delete(&alias).await.unwrap());
        snapshot.store("https://example.com", &alias).await.unwrap();
        assert!(snapshot.delete(&alias).await.unwrap());
        assert!(!snapshot.exists(&alias).await.unwrap());

        let reopened = provider(store).await;
        assert!(reopened.get(&alias).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn failed_upload_rolls_back_store() {
        let store = Arc::new(TestStore::default());
        let snapshot = provider(store.clone()).await;
        let alias = Alias::new("unsaved").unwrap();

        store.fail_puts(true);
        let err = snapshot
            .store("https://example.com", &alias)
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::Infra(_)));
        assert!(!snapshot.exists(&alias).await.unwrap());
        assert_eq!(snapshot.len().await, 0);

        store.fail_puts(false);
        snapshot.store("https://example.com", &alias).await.unwrap();
        assert_eq!(snapshot.get(&alias).await.unwrap(), "https://example.com");
    }

    #[tokio::test]
    async fn failed_upload_rolls_back_delete() {
        let store = Arc::new(TestStore::default());
        let snapshot = provider(store.clone()).await;
        let alias = Alias::new("kept").unwrap();
        snapshot.store("https://example.com", &alias).await.unwrap();

        store.fail_puts(true);
        assert!(matches!(
            snapshot.delete(&alias).await.unwrap_err(),
            StorageError::Infra(_)
        ));
        assert_eq!(snapshot.get(&alias).await.unwrap(), "https://example.com");

        store.fail_puts(false);
        let reopened = provider(store).await;
        assert_eq!(reopened.get(&alias).await.unwrap(), "https://example.com");
    }
}
