use async_trait::async_trait;
use petit_core::{Alias, InfraError, Provider, Result, StorageError};
use redb::{Database, ReadableTable, TableDefinition};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, trace};

/// Default table holding alias → target records.
pub const DEFAULT_TABLE: &str = "petit";

/// Embedded transactional provider backed by a single redb file.
///
/// redb admits one write transaction at a time, so the existence check and
/// the insert in [`store`](Provider::store) are serializable.
#[derive(Clone)]
pub struct KvProvider {
    db: Arc<Database>,
    table: Arc<str>,
}

impl std::fmt::Debug for KvProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KvProvider")
            .field("table", &self.table)
            .finish_non_exhaustive()
    }
}

fn map_redb_error(err: impl Into<redb::Error>) -> StorageError {
    let err: redb::Error = err.into();
    let message = err.to_string();

    match err {
        redb::Error::DatabaseAlreadyOpen => InfraError::unavailable(message),
        redb::Error::Corrupted(_)
        | redb::Error::TableTypeMismatch { .. }
        | redb::Error::TypeDefinitionChanged { .. } => InfraError::invalid_data(message),
        redb::Error::Io(_) => InfraError::io(message),
        _ => InfraError::operation(message),
    }
    .into()
}

fn map_join_error(err: tokio::task::JoinError) -> StorageError {
    InfraError::operation(format!("redb task failed: {err}")).into()
}

impl KvProvider {
    /// Opens or creates the database at `path` and ensures `table` exists.
    ///
    /// Safe to run on every start: an existing table is left as it is.
    pub async fn open(path: impl AsRef<Path>, table: impl Into<String>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let table: Arc<str> = Arc::from(table.into());

        let setup_table = Arc::clone(&table);
        let db = tokio::task::spawn_blocking(move || -> Result<Database> {
            let db = Database::create(&path).map_err(map_redb_error)?;
            let txn = db.begin_write().map_err(map_redb_error)?;
            {
                txn.open_table(definition(&setup_table))
                    .map_err(map_redb_error)?;
            }
            txn.commit().map_err(map_redb_error)?;
            debug!(path = %path.display(), table = %setup_table, "Opened redb storage");
            Ok(db)
        })
        .await
        .map_err(map_join_error)??;

        Ok(Self {
            db: Arc::new(db),
            table,
        })
    }

    pub fn table(&self) -> &str {
        &self.table
    }
}

fn definition(table: &str) -> TableDefinition<'_, &'static str, &'static str> {
    TableDefinition::new(table)
}

#[async_trait]
impl Provider for KvProvider {
    async fn get(&self, alias: &Alias) -> Result<String> {
        let db = Arc::clone(&self.db);
        let table = Arc::clone(&self.table);
        let alias = alias.clone();

        tokio::task::spawn_blocking(move || {
            let txn = db.begin_read().map_err(map_redb_error)?;
            let records = txn.open_table(definition(&table)).map_err(map_redb_error)?;
            let target = records.get(alias.as_str()).map_err(map_redb_error)?;

            target
                .map(|guard| guard.value().to_owned())
                .ok_or_else(|| StorageError::NotFound(alias.to_string()))
        })
        .await
        .map_err(map_join_error)?
    }

    async fn store(&self, target: &str, alias: &Alias) -> Result<()> {
        let db = Arc::clone(&self.db);
        let table = Arc::clone(&self.table);
        let alias = alias.clone();
        let target = target.trim().to_owned();

        tokio::task::spawn_blocking(move || {
            let txn = db.begin_write().map_err(map_redb_error)?;
            {
                let mut records = txn.open_table(definition(&table)).map_err(map_redb_error)?;
                if records.get(alias.as_str()).map_err(map_redb_error)?.is_some() {
                    // Dropping the transaction without commit aborts it.
                    return Err(StorageError::AlreadyExists(alias.to_string()));
                }
                records
                    .insert(alias.as_str(), target.as_str())
                    .map_err(map_redb_error)?;
            }
            txn.commit().map_err(map_redb_error)?;
            trace!(alias = %alias, "Stored record in redb");
            Ok(())
        })
        .await
        .map_err(map_join_error)?
    }
}
