use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;
use typed_builder::TypedBuilder;

/// Which storage backend to run, and how to reach it.
///
/// Chosen once at startup; see [`Backend::open`](crate::Backend::open).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "backend", rename_all = "snake_case")]
pub enum StorageConfig {
    Memory,
    File(FileConfig),
    Kv(KvConfig),
    Sql(SqlConfig),
    Object(ObjectConfig),
    Redis(RedisConfig),
}

impl StorageConfig {
    /// Short name of the selected backend, for logging.
    pub fn name(&self) -> &'static str {
        match self {
            StorageConfig::Memory => "memory",
            StorageConfig::File(_) => "file",
            StorageConfig::Kv(_) => "kv",
            StorageConfig::Sql(_) => "sql",
            StorageConfig::Object(_) => "object",
            StorageConfig::Redis(_) => "redis",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, TypedBuilder)]
pub struct FileConfig {
    /// Directory holding one file per alias.
    #[builder(setter(into))]
    pub dir: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, TypedBuilder)]
pub struct KvConfig {
    /// Path of the database file.
    #[builder(setter(into))]
    pub path: PathBuf,
    #[builder(default = default_table(), setter(into))]
    #[serde(default = "default_table")]
    pub table: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, TypedBuilder)]
pub struct SqlConfig {
    /// `postgres://`, `mysql://` or `sqlite:` connection URL. In-memory
    /// SQLite (`sqlite::memory:`) always runs on a single connection.
    #[builder(setter(into))]
    pub url: String,
    #[builder(default = default_table(), setter(into))]
    #[serde(default = "default_table")]
    pub table: String,
    #[builder(default = default_alias_column(), setter(into))]
    #[serde(default = "default_alias_column")]
    pub alias_column: String,
    #[builder(default = default_target_column(), setter(into))]
    #[serde(default = "default_target_column")]
    pub target_column: String,
    #[builder(default = default_max_connections())]
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

/// How records are laid out in the object store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectLayout {
    /// One JSON document holding every record.
    #[default]
    Snapshot,
    /// One object per alias.
    PerKey,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, TypedBuilder)]
pub struct ObjectConfig {
    /// `s3://bucket/prefix`, `file:///path` or `memory://`.
    #[builder(setter(into))]
    pub url: String,
    #[builder(default)]
    #[serde(default)]
    pub layout: ObjectLayout,
    /// Object key of the snapshot document, relative to the URL prefix.
    #[builder(default = default_snapshot_key(), setter(into))]
    #[serde(default = "default_snapshot_key")]
    pub snapshot_key: String,
    /// Time-to-live of the read-through cache in per-key layout. No cache
    /// when unset.
    #[builder(default, setter(strip_option))]
    #[serde(default)]
    pub cache_ttl_secs: Option<u64>,
    #[builder(default = default_cache_capacity())]
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: u64,
}

impl ObjectConfig {
    pub fn cache_ttl(&self) -> Option<Duration> {
        self.cache_ttl_secs.map(Duration::from_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, TypedBuilder)]
pub struct RedisConfig {
    #[builder(setter(into))]
    pub url: String,
    /// Prepended to every alias to form the Redis key.
    #[builder(default, setter(into))]
    #[serde(default)]
    pub key_prefix: String,
}

fn default_table() -> String {
    "petit".to_string()
}

fn default_alias_column() -> String {
    "alias".to_string()
}

fn default_target_column() -> String {
    "url".to_string()
}

fn default_max_connections() -> u32 {
    5
}

fn default_snapshot_key() -> String {
    "petit.json".to_string()
}

fn default_cache_capacity() -> u64 {
    10_000
}
