//! Storage backends for petit.
//!
//! Every backend implements [`petit_core::Provider`]. [`Backend`] is the
//! closed set of them, built once from a [`StorageConfig`].

pub mod backend;
pub mod config;
pub mod file;
pub mod kv;
pub mod memory;
pub mod object;
pub mod redis;
pub mod sql;

pub use backend::Backend;
pub use config::{
    FileConfig, KvConfig, ObjectConfig, ObjectLayout, RedisConfig, SqlConfig, StorageConfig,
};
pub use file::FileProvider;
pub use kv::KvProvider;
pub use memory::MemoryProvider;
pub use object::{PerKeyObjectProvider, SnapshotObjectProvider};
pub use redis::RedisProvider;
pub use sql::{SqlDialect, SqlProvider};
