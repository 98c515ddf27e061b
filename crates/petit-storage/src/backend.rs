use crate::config::{ObjectLayout, StorageConfig};
use crate::file::FileProvider;
use crate::kv::KvProvider;
use crate::memory::MemoryProvider;
use crate::object::{store_from_url, PerKeyObjectProvider, SnapshotObjectProvider};
use crate::redis::RedisProvider;
use crate::sql::SqlProvider;
use async_trait::async_trait;
use petit_cache::MokaTargetCache;
use petit_core::{Alias, Delete, InfraError, Provider, Result};
use tracing::info;

/// The storage backend selected at startup.
#[derive(Debug)]
pub enum Backend {
    Memory(MemoryProvider),
    File(FileProvider),
    Kv(KvProvider),
    Sql(SqlProvider),
    SnapshotObject(SnapshotObjectProvider),
    PerKeyObject(PerKeyObjectProvider),
    Redis(RedisProvider),
}

macro_rules! dispatch {
    ($self:ident, $provider:ident => $body:expr) => {
        match $self {
            Backend::Memory($provider) => $body,
            Backend::File($provider) => $body,
            Backend::Kv($provider) => $body,
            Backend::Sql($provider) => $body,
            Backend::SnapshotObject($provider) => $body,
            Backend::PerKeyObject($provider) => $body,
            Backend::Redis($provider) => $body,
        }
    };
}

impl Backend {
    /// Opens the backend described by `config`, running any idempotent
    /// setup it needs (directories, tables, loading a snapshot).
    pub async fn open(config: &StorageConfig) -> Result<Self> {
        let backend = match config {
            StorageConfig::Memory => Backend::Memory(MemoryProvider::new()),
            StorageConfig::File(file) => Backend::File(FileProvider::open(&file.dir).await?),
            StorageConfig::Kv(kv) => Backend::Kv(KvProvider::open(&kv.path, &kv.table).await?),
            StorageConfig::Sql(sql) => Backend::Sql(SqlProvider::connect(sql).await?),
            StorageConfig::Object(object) => {
                let (store, prefix) = store_from_url(&object.url)?;
                match object.layout {
                    ObjectLayout::Snapshot => Backend::SnapshotObject(
                        SnapshotObjectProvider::open(store, &prefix, &object.snapshot_key).await?,
                    ),
                    ObjectLayout::PerKey => {
                        let mut provider = PerKeyObjectProvider::new(store, prefix);
                        if let Some(ttl) = object.cache_ttl() {
                            provider = provider
                                .with_cache(MokaTargetCache::with_ttl(object.cache_capacity, ttl));
                        }
                        Backend::PerKeyObject(provider)
                    }
                }
            }
            StorageConfig::Redis(redis) => {
                Backend::Redis(RedisProvider::connect(&redis.url, redis.key_prefix.as_str()).await?)
            }
        };

        info!(backend = backend.name(), "Storage backend ready");
        Ok(backend)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Backend::Memory(_) => "memory",
            Backend::File(_) => "file",
            Backend::Kv(_) => "kv",
            Backend::Sql(_) => "sql",
            Backend::SnapshotObject(_) => "snapshot-object",
            Backend::PerKeyObject(_) => "per-key-object",
            Backend::Redis(_) => "redis",
        }
    }

    /// Whether [`Delete::delete`] can succeed on this backend.
    pub fn supports_delete(&self) -> bool {
        matches!(self, Backend::Sql(_) | Backend::SnapshotObject(_))
    }
}

#[async_trait]
impl Provider for Backend {
    async fn get(&self, alias: &Alias) -> Result<String> {
        dispatch!(self, provider => provider.get(alias).await)
    }

    async fn exists(&self, alias: &Alias) -> Result<bool> {
        dispatch!(self, provider => provider.exists(alias).await)
    }

    async fn store(&self, target: &str, alias: &Alias) -> Result<()> {
        dispatch!(self, provider => provider.store(target, alias).await)
    }
}

/// Removes records on backends that support it. The others are
/// append-only and return an unsupported-operation infra error.
#[async_trait]
impl Delete for Backend {
    async fn delete(&self, alias: &Alias) -> Result<bool> {
        match self {
            Backend::Sql(provider) => provider.delete(alias).await,
            Backend::SnapshotObject(provider) => provider.delete(alias).await,
            other => Err(InfraError::unsupported(format!(
                "{} backend does not support delete",
                other.name()
            ))
            .into()),
        }
    }
}
