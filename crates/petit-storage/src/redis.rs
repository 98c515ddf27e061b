use async_trait::async_trait;
use petit_core::{Alias, InfraError, Provider, Result, StorageError};
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use tracing::{debug, trace, warn};

/// Redis provider: one string key per alias.
///
/// `store` is a single `SET ... NX`, so the check-then-write is atomic on
/// the server for any number of clients.
#[derive(Clone)]
pub struct RedisProvider {
    conn: ConnectionManager,
    key_prefix: String,
}

impl std::fmt::Debug for RedisProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisProvider")
            .field("key_prefix", &self.key_prefix)
            .finish_non_exhaustive()
    }
}

fn map_redis_error(operation: &str, err: redis::RedisError) -> StorageError {
    let message = format!("{operation}: {err}");

    if err.is_timeout() {
        InfraError::timeout(message)
    } else if err.is_connection_refusal() || err.is_connection_dropped() || err.is_io_error() {
        InfraError::unavailable(message)
    } else {
        InfraError::query(message)
    }
    .into()
}

impl RedisProvider {
    /// Connects to `url`. Keys are `{key_prefix}{alias}`.
    pub async fn connect(url: &str, key_prefix: impl Into<String>) -> Result<Self> {
        let client = redis::Client::open(url)
            .map_err(|e| InfraError::configuration(format!("invalid redis URL: {e}")))?;
        let conn = ConnectionManager::new(client)
            .await
            .map_err(|e| map_redis_error("failed to connect to Redis", e))?;

        let key_prefix = key_prefix.into();
        debug!(key_prefix = %key_prefix, "Connected to Redis storage");
        Ok(Self { conn, key_prefix })
    }

    fn key(&self, alias: &Alias) -> String {
        format!("{}{}", self.key_prefix, alias.as_str())
    }
}

#[async_trait]
impl Provider for RedisProvider {
    async fn get(&self, alias: &Alias) -> Result<String> {
        let mut conn = self.conn.clone();
        let target: Option<String> = conn.get(self.key(alias)).await.map_err(|e| {
            warn!(alias = %alias, error = %e, "Redis error on get");
            map_redis_error("failed to fetch value from Redis", e)
        })?;

        target.ok_or_else(|| StorageError::NotFound(alias.to_string()))
    }

    async fn exists(&self, alias: &Alias) -> Result<bool> {
        let mut conn = self.conn.clone();
        conn.exists(self.key(alias))
            .await
            .map_err(|e| map_redis_error("failed to check key in Redis", e))
    }

    async fn store(&self, target: &str, alias: &Alias) -> Result<()> {
        let mut conn = self.conn.clone();
        let reply: Option<String> = redis::cmd("SET")
            .arg(self.key(alias))
            .arg(target)
            .arg("NX")
            .query_async(&mut conn)
            .await
            .map_err(|e| map_redis_error("failed to write value to Redis", e))?;

        match reply {
            Some(_) => {
                trace!(alias = %alias, "Stored record in Redis");
                Ok(())
            }
            None => Err(StorageError::AlreadyExists(alias.to_string())),
        }
    }
}
