use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use petit_storage::{
    FileConfig, KvConfig, ObjectConfig, ObjectLayout, RedisConfig, SqlConfig, StorageConfig,
};
use petit_telemetry::LogFormat;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

pub const STORAGE_CONFIG_ENV: &str = "PETIT_STORAGE_CONFIG";
pub const STORAGE_BACKEND_ENV: &str = "PETIT_STORAGE_BACKEND";
pub const DATA_DIR_ENV: &str = "PETIT_DATA_DIR";
pub const DB_PATH_ENV: &str = "PETIT_DB_PATH";
pub const DATABASE_URL_ENV: &str = "PETIT_DATABASE_URL";
pub const TABLE_ENV: &str = "PETIT_TABLE";
pub const OBJECT_URL_ENV: &str = "PETIT_OBJECT_URL";
pub const OBJECT_LAYOUT_ENV: &str = "PETIT_OBJECT_LAYOUT";
pub const CACHE_TTL_ENV: &str = "PETIT_CACHE_TTL_SECS";
pub const REDIS_URL_ENV: &str = "PETIT_REDIS_URL";
pub const KEY_PREFIX_ENV: &str = "PETIT_KEY_PREFIX";
pub const GENERATOR_ENV: &str = "PETIT_GENERATOR";
pub const ALIAS_LENGTH_ENV: &str = "PETIT_ALIAS_LENGTH";
pub const GENERATOR_PREFIX_ENV: &str = "PETIT_GENERATOR_PREFIX";
pub const BASE_URL_ENV: &str = "PETIT_BASE_URL";
pub const LOG_FORMAT_ENV: &str = "PETIT_LOG_FORMAT";

pub const DEFAULT_TABLE: &str = "petit";
pub const DEFAULT_GENERATOR_PREFIX: &str = "pt";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StorageBackendArg {
    Memory,
    File,
    Kv,
    Sql,
    Object,
    Redis,
}

impl Display for StorageBackendArg {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageBackendArg::Memory => write!(f, "memory"),
            StorageBackendArg::File => write!(f, "file"),
            StorageBackendArg::Kv => write!(f, "kv"),
            StorageBackendArg::Sql => write!(f, "sql"),
            StorageBackendArg::Object => write!(f, "object"),
            StorageBackendArg::Redis => write!(f, "redis"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ObjectLayoutArg {
    Snapshot,
    #[value(name = "per-key")]
    PerKey,
}

impl From<ObjectLayoutArg> for ObjectLayout {
    fn from(value: ObjectLayoutArg) -> Self {
        match value {
            ObjectLayoutArg::Snapshot => ObjectLayout::Snapshot,
            ObjectLayoutArg::PerKey => ObjectLayout::PerKey,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum GeneratorArg {
    Seq,
    Alphanumeric,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Store a target and print its alias.
    Shorten {
        target: String,
        /// Use this alias instead of generating one.
        #[arg(long)]
        alias: Option<String>,
    },
    /// Print the target stored for an alias.
    Resolve { alias: String },
    /// Remove an alias (sql and snapshot object storage only).
    Delete { alias: String },
}

#[derive(Debug, Parser)]
#[command(name = "petit", version, about = "Shorten, resolve and delete aliases")]
pub struct CLI {
    /// JSON storage configuration; replaces all other storage flags.
    #[arg(long, env = STORAGE_CONFIG_ENV)]
    pub storage_config: Option<PathBuf>,

    #[arg(
        long,
        env = STORAGE_BACKEND_ENV,
        value_enum,
        default_value_t = StorageBackendArg::Memory
    )]
    pub storage: StorageBackendArg,

    /// Directory of the file backend.
    #[arg(long, env = DATA_DIR_ENV, required_if_eq("storage", "file"))]
    pub data_dir: Option<PathBuf>,

    /// Database file of the kv backend.
    #[arg(long, env = DB_PATH_ENV, required_if_eq("storage", "kv"))]
    pub db_path: Option<PathBuf>,

    #[arg(long, env = DATABASE_URL_ENV, required_if_eq("storage", "sql"))]
    pub database_url: Option<String>,

    /// Table of the kv and sql backends.
    #[arg(long, env = TABLE_ENV, default_value = DEFAULT_TABLE)]
    pub table: String,

    #[arg(long, env = OBJECT_URL_ENV, required_if_eq("storage", "object"))]
    pub object_url: Option<String>,

    #[arg(
        long,
        env = OBJECT_LAYOUT_ENV,
        value_enum,
        default_value_t = ObjectLayoutArg::Snapshot
    )]
    pub object_layout: ObjectLayoutArg,

    /// Read cache time-to-live for the per-key object layout.
    #[arg(long, env = CACHE_TTL_ENV)]
    pub cache_ttl_secs: Option<u64>,

    #[arg(long, env = REDIS_URL_ENV, required_if_eq("storage", "redis"))]
    pub redis_url: Option<String>,

    #[arg(long, env = KEY_PREFIX_ENV, default_value = "")]
    pub key_prefix: String,

    #[arg(
        long,
        env = GENERATOR_ENV,
        value_enum,
        default_value_t = GeneratorArg::Alphanumeric
    )]
    pub generator: GeneratorArg,

    /// Length of generated aliases.
    #[arg(long, env = ALIAS_LENGTH_ENV, default_value_t = 5)]
    pub alias_length: usize,

    #[arg(long, env = GENERATOR_PREFIX_ENV, default_value = DEFAULT_GENERATOR_PREFIX)]
    pub generator_prefix: String,

    /// Print full short urls under this base instead of bare aliases.
    #[arg(long, env = BASE_URL_ENV)]
    pub base_url: Option<String>,

    /// Print records as JSON.
    #[arg(long)]
    pub json: bool,

    #[arg(long, env = LOG_FORMAT_ENV, default_value_t = LogFormat::Pretty)]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Command,
}

impl CLI {
    /// Storage configuration from `--storage-config`, or else from flags.
    pub fn storage_config(&self) -> anyhow::Result<StorageConfig> {
        if let Some(path) = &self.storage_config {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            return serde_json::from_str(&raw)
                .with_context(|| format!("invalid storage config in {}", path.display()));
        }

        let config = match self.storage {
            StorageBackendArg::Memory => StorageConfig::Memory,
            StorageBackendArg::File => StorageConfig::File(
                FileConfig::builder()
                    .dir(self.data_dir.clone().context("--data-dir is required")?)
                    .build(),
            ),
            StorageBackendArg::Kv => StorageConfig::Kv(
                KvConfig::builder()
                    .path(self.db_path.clone().context("--db-path is required")?)
                    .table(self.table.clone())
                    .build(),
            ),
            StorageBackendArg::Sql => StorageConfig::Sql(
                SqlConfig::builder()
                    .url(self.database_url.clone().context("--database-url is required")?)
                    .table(self.table.clone())
                    .build(),
            ),
            StorageBackendArg::Object => {
                let url = self.object_url.clone().context("--object-url is required")?;
                let config = ObjectConfig::builder()
                    .url(url)
                    .layout(self.object_layout.into());
                StorageConfig::Object(match self.cache_ttl_secs {
                    Some(ttl) => config.cache_ttl_secs(ttl).build(),
                    None => config.build(),
                })
            }
            StorageBackendArg::Redis => StorageConfig::Redis(
                RedisConfig::builder()
                    .url(self.redis_url.clone().context("--redis-url is required")?)
                    .key_prefix(self.key_prefix.clone())
                    .build(),
            ),
        };

        Ok(config)
    }
}
