use super::map_object_error;
use async_trait::async_trait;
use bytes::Bytes;
use object_store::path::Path as ObjectPath;
use object_store::{ObjectStore, PutMode, PutOptions, PutPayload};
use petit_cache::MokaTargetCache;
use petit_core::{Alias, InfraError, Provider, Result, StorageError};
use std::sync::Arc;
use tracing::{trace, warn};

/// One object per alias at `{prefix}/{alias}`, body = target.
///
/// Creates are conditional where the store supports it, so concurrent
/// writers in any process race on the store itself. Reads can go through a
/// TTL cache; only hits are cached.
#[derive(Debug)]
pub struct PerKeyObjectProvider {
    store: Arc<dyn ObjectStore>,
    prefix: ObjectPath,
    cache: Option<MokaTargetCache>,
}

impl PerKeyObjectProvider {
    pub fn new(store: Arc<dyn ObjectStore>, prefix: ObjectPath) -> Self {
        Self {
            store,
            prefix,
            cache: None,
        }
    }

    /// Serves repeated reads from `cache`.
    pub fn with_cache(mut self, cache: MokaTargetCache) -> Self {
        self.cache = Some(cache);
        self
    }

    fn path_for(&self, alias: &Alias) -> ObjectPath {
        self.prefix.child(alias.as_str())
    }

    async fn fetch(&self, alias: &Alias) -> Result<String> {
        let path = self.path_for(alias);
        let result = self
            .store
            .get(&path)
            .await
            .map_err(|e| map_object_error(alias.as_str(), e))?;
        let body = result
            .bytes()
            .await
            .map_err(|e| map_object_error(alias.as_str(), e))?;

        let target = String::from_utf8(body.to_vec()).map_err(|e| {
            InfraError::invalid_data(format!("object '{path}' is not valid UTF-8: {e}"))
        })?;
        Ok(target.trim().to_owned())
    }
}

#[async_trait]
impl Provider for PerKeyObjectProvider {
    async fn get(&self, alias: &Alias) -> Result<String> {
        match &self.cache {
            Some(cache) => cache.get_or_compute(alias, |_| self.fetch(alias)).await,
            None => self.fetch(alias).await,
        }
    }

    async fn exists(&self, alias: &Alias) -> Result<bool> {
        if let Some(cache) = &self.cache {
            if cache.get(alias).await.is_some() {
                return Ok(true);
            }
        }

        match self.store.head(&self.path_for(alias)).await {
            Ok(_) => Ok(true),
            Err(object_store::Error::NotFound { .. }) => Ok(false),
            Err(err) => Err(map_object_error(alias.as_str(), err)),
        }
    }

    async fn store(&self, target: &str, alias: &Alias) -> Result<()> {
        if self.exists(alias).await? {
            return Err(StorageError::AlreadyExists(alias.to_string()));
        }

        let path = self.path_for(alias);
        let payload = PutPayload::from(Bytes::from(target.trim().to_owned()));

        match self
            .store
            .put_opts(&path, payload.clone(), PutOptions::from(PutMode::Create))
            .await
        {
            Ok(_) => {}
            Err(object_store::Error::NotImplemented) => {
                // Without conditional creates a concurrent writer between the
                // check above and this put can be overwritten.
                warn!(alias = %alias, "Object store lacks conditional create, using plain put");
                self.store
                    .put(&path, payload)
                    .await
                    .map_err(|e| map_object_error(alias.as_str(), e))?;
            }
            Err(err) => return Err(map_object_error(alias.as_str(), err)),
        }

        trace!(alias = %alias, path = %path, "Stored record object");
        Ok(())
    }
}
