use crate::alias::Alias;
use crate::error::{Result, StorageError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// A stored URL record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UrlRecord {
    /// The lookup key.
    pub alias: Alias,
    /// The URL the alias resolves to. Opaque to the storage layer.
    pub target: String,
}

/// The contract every storage backend implements.
///
/// Implementations must be safe for arbitrary concurrent use. For a single
/// alias, concurrent [`store`](Provider::store) calls must behave as some
/// serial ordering of those calls: exactly one succeeds and every other call
/// observes [`StorageError::AlreadyExists`].
#[async_trait]
pub trait Provider: Send + Sync + 'static {
    /// Returns the exact persisted target for `alias`.
    ///
    /// Returns [`StorageError::NotFound`] if the alias was never stored.
    async fn get(&self, alias: &Alias) -> Result<String>;

    /// Checks whether `alias` resolves to a record.
    ///
    /// Agrees with [`get`](Provider::get): `true` iff `get` would not
    /// return [`StorageError::NotFound`].
    async fn exists(&self, alias: &Alias) -> Result<bool> {
        match self.get(alias).await {
            Ok(_) => Ok(true),
            Err(StorageError::NotFound(_)) => Ok(false),
            Err(err) => Err(err),
        }
    }

    /// Stores `target` under `alias`.
    ///
    /// Returns [`StorageError::AlreadyExists`] and leaves the existing record
    /// untouched if the alias is taken.
    async fn store(&self, target: &str, alias: &Alias) -> Result<()>;
}

/// Providers that can remove records.
#[async_trait]
pub trait Delete: Provider {
    /// Deletes the record for `alias`.
    /// Returns `true` if the record existed and was removed.
    async fn delete(&self, alias: &Alias) -> Result<bool>;
}

#[async_trait]
impl<P: Provider + ?Sized> Provider for Arc<P> {
    async fn get(&self, alias: &Alias) -> Result<String> {
        (**self).get(alias).await
    }

    async fn exists(&self, alias: &Alias) -> Result<bool> {
        (**self).exists(alias).await
    }

    async fn store(&self, target: &str, alias: &Alias) -> Result<()> {
        (**self).store(target, alias).await
    }
}

#[async_trait]
impl<P: Delete + ?Sized> Delete for Arc<P> {
    async fn delete(&self, alias: &Alias) -> Result<bool> {
        (**self).delete(alias).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tokio::sync::Mutex;

    #[derive(Default)]
    struct TestProvider {
        items: Mutex<HashMap<String, String>>,
    }

    #[async_trait]
    impl Provider for TestProvider {
        async fn get(&self, alias: &Alias) -> Result<String> {
            let items = self.items.lock().await;
            items
                .get(alias.as_str())
                .cloned()
                .ok_or_else(|| StorageError::NotFound(alias.to_string()))
        }

        async fn store(&self, target: &str, alias: &Alias) -> Result<()> {
            let mut items = self.items.lock().await;
            if items.contains_key(alias.as_str()) {
                return Err(StorageError::AlreadyExists(alias.to_string()));
            }
            items.insert(alias.to_string(), target.to_string());
            Ok(())
        }
    }

    struct BrokenProvider;

    #[async_trait]
    impl Provider for BrokenProvider {
        async fn get(&self, _alias: &Alias) -> Result<String> {
            Err(crate::InfraError::unavailable("connection refused").into())
        }

        async fn store(&self, _target: &str, _alias: &Alias) -> Result<()> {
            Err(crate::InfraError::unavailable("connection refused").into())
        }
    }

    #[tokio::test]
    async fn default_exists_maps_not_found_to_false() {
        let provider = TestProvider::default();
        let alias = Alias::new("example").unwrap();

        assert!(!provider.exists(&alias).await.unwrap());
        provider.store("http://example.com", &alias).await.unwrap();
        assert!(provider.exists(&alias).await.unwrap());
    }

    #[tokio::test]
    async fn default_exists_propagates_infra_errors() {
        let alias = Alias::new("example").unwrap();
        let err = BrokenProvider.exists(&alias).await.unwrap_err();
        assert!(matches!(err, StorageError::Infra(_)));
    }

    #[tokio::test]
    async fn arc_delegates_to_inner_provider() {
        let provider: Arc<dyn Provider> = Arc::new(TestProvider::default());
        let alias = Alias::new("example").unwrap();

        provider.store("http://example.com", &alias).await.unwrap();
        assert_eq!(provider.get(&alias).await.unwrap(), "http://example.com");
    }
}
