use crate::config::SqlConfig;
use async_trait::async_trait;
use petit_core::{Alias, Delete, InfraError, Provider, Result, StorageError};
use sqlx::any::{AnyPoolOptions, AnyRow};
use sqlx::{AnyPool, Row};
use tracing::{debug, trace};

/// SQL dialects understood by [`SqlProvider`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SqlDialect {
    Postgres,
    MySql,
    Sqlite,
}

impl SqlDialect {
    /// Picks the dialect from the scheme of a connection URL.
    pub fn from_url(url: &str) -> Result<Self> {
        let scheme = url.split_once(':').map(|(scheme, _)| scheme).unwrap_or_default();
        match scheme {
            "postgres" | "postgresql" => Ok(SqlDialect::Postgres),
            "mysql" | "mariadb" => Ok(SqlDialect::MySql),
            "sqlite" => Ok(SqlDialect::Sqlite),
            other => Err(InfraError::configuration(format!(
                "unsupported database scheme '{other}'. Supported: postgres, mysql, sqlite"
            ))
            .into()),
        }
    }

    fn quote(self, ident: &str) -> String {
        match self {
            SqlDialect::MySql => format!("`{ident}`"),
            SqlDialect::Postgres | SqlDialect::Sqlite => format!("\"{ident}\""),
        }
    }

    fn placeholder(self, n: usize) -> String {
        match self {
            SqlDialect::Postgres => format!("${n}"),
            SqlDialect::MySql | SqlDialect::Sqlite => "?".to_string(),
        }
    }

    fn create_table(self, table: &str, alias: &str, target: &str) -> String {
        match self {
            SqlDialect::Postgres => format!(
                "CREATE TABLE IF NOT EXISTS {table} (
                    id BIGSERIAL PRIMARY KEY,
                    {alias} VARCHAR(255) NOT NULL UNIQUE,
                    {target} TEXT NOT NULL
                )"
            ),
            SqlDialect::MySql => format!(
                "CREATE TABLE IF NOT EXISTS {table} (
                    id BIGINT AUTO_INCREMENT PRIMARY KEY,
                    {alias} VARCHAR(255) CHARACTER SET utf8mb4 COLLATE utf8mb4_bin NOT NULL UNIQUE,
                    {target} TEXT NOT NULL
                )"
            ),
            SqlDialect::Sqlite => format!(
                "CREATE TABLE IF NOT EXISTS {table} (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    {alias} TEXT NOT NULL UNIQUE,
                    {target} TEXT NOT NULL
                )"
            ),
        }
    }
}

/// Statements rendered once at connect time. Only identifiers are
/// interpolated; alias and target values are always bound.
#[derive(Debug, Clone)]
struct Statements {
    select: String,
    exists: String,
    insert: String,
    delete: String,
}

impl Statements {
    fn new(dialect: SqlDialect, table: &str, alias: &str, target: &str) -> Self {
        let p1 = dialect.placeholder(1);
        let p2 = dialect.placeholder(2);

        Self {
            select: format!("SELECT {target} FROM {table} WHERE {alias} = {p1} LIMIT 1"),
            exists: format!("SELECT 1 FROM {table} WHERE {alias} = {p1} LIMIT 1"),
            insert: format!("INSERT INTO {table} ({alias}, {target}) VALUES ({p1}, {p2})"),
            delete: format!("DELETE FROM {table} WHERE {alias} = {p1}"),
        }
    }
}

/// Relational provider for PostgreSQL, MySQL and SQLite.
///
/// Atomicity of [`store`](Provider::store) is delegated to the unique
/// constraint on the alias column: a violating insert is reported as
/// [`StorageError::AlreadyExists`].
#[derive(Debug, Clone)]
pub struct SqlProvider {
    pool: AnyPool,
    dialect: SqlDialect,
    statements: Statements,
}

fn validate_identifier(ident: &str) -> Result<()> {
    let mut chars = ident.chars();
    let valid_start = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_');
    let valid_rest = chars.all(|c| c.is_ascii_alphanumeric() || c == '_');

    if valid_start && valid_rest && ident.len() <= 63 {
        Ok(())
    } else {
        Err(InfraError::configuration(format!("invalid SQL identifier '{ident}'")).into())
    }
}

fn is_in_memory_sqlite(url: &str) -> bool {
    let rest = url.trim_start_matches("sqlite:").trim_start_matches("//");
    let (path, query) = rest.split_once('?').unwrap_or((rest, ""));

    path == ":memory:"
        || path.is_empty()
        || query.split('&').any(|pair| pair == "mode=memory")
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .is_some_and(sqlx::error::DatabaseError::is_unique_violation)
}

fn map_sqlx_error(err: sqlx::Error) -> StorageError {
    let message = err.to_string();

    match err {
        sqlx::Error::PoolTimedOut => InfraError::timeout(message),
        sqlx::Error::PoolClosed
        | sqlx::Error::WorkerCrashed
        | sqlx::Error::Io(_)
        | sqlx::Error::Tls(_) => InfraError::unavailable(message),
        sqlx::Error::Configuration(_) => InfraError::configuration(message),
        sqlx::Error::ColumnIndexOutOfBounds { .. }
        | sqlx::Error::ColumnNotFound(_)
        | sqlx::Error::ColumnDecode { .. }
        | sqlx::Error::TypeNotFound { .. }
        | sqlx::Error::Decode(_)
        | sqlx::Error::RowNotFound => InfraError::invalid_data(message),
        _ => InfraError::query(message),
    }
    .into()
}

impl SqlProvider {
    /// Connects to the database and creates the table if it is missing.
    pub async fn connect(config: &SqlConfig) -> Result<Self> {
        let dialect = SqlDialect::from_url(&config.url)?;
        validate_identifier(&config.table)?;
        validate_identifier(&config.alias_column)?;
        validate_identifier(&config.target_column)?;

        sqlx::any::install_default_drivers();
        let options = if dialect == SqlDialect::Sqlite && is_in_memory_sqlite(&config.url) {
            // Every connection opens its own private in-memory database.
            debug!("In-memory SQLite, pinning the pool to one connection");
            AnyPoolOptions::new()
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            AnyPoolOptions::new().max_connections(config.max_connections)
        };
        let pool = options
            .connect(&config.url)
            .await
            .map_err(map_sqlx_error)?;

        let table = dialect.quote(&config.table);
        let alias = dialect.quote(&config.alias_column);
        let target = dialect.quote(&config.target_column);

        sqlx::query(&dialect.create_table(&table, &alias, &target))
            .execute(&pool)
            .await
            .map_err(map_sqlx_error)?;
        debug!(?dialect, table = %config.table, "Connected to SQL storage");

        Ok(Self {
            pool,
            dialect,
            statements: Statements::new(dialect, &table, &alias, &target),
        })
    }

    pub fn dialect(&self) -> SqlDialect {
        self.dialect
    }

    /// Returns a reference to the underlying pool.
    pub fn pool(&self) -> &AnyPool {
        &self.pool
    }
}

#[async_trait]
impl Provider for SqlProvider {
    async fn get(&self, alias: &Alias) -> Result<String> {
        let row: Option<AnyRow> = sqlx::query(&self.statements.select)
            .bind(alias.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        let Some(row) = row else {
            return Err(StorageError::NotFound(alias.to_string()));
        };

        row.try_get::<String, _>(0).map_err(map_sqlx_error)
    }

    async fn exists(&self, alias: &Alias) -> Result<bool> {
        let exists = sqlx::query(&self.statements.exists)
            .bind(alias.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)?
            .is_some();

        Ok(exists)
    }

    async fn store(&self, target: &str, alias: &Alias) -> Result<()> {
        let result = sqlx::query(&self.statements.insert)
            .bind(alias.as_str())
            .bind(target)
            .execute(&self.pool)
            .await;

        match result {
            Ok(_) => {
                trace!(alias = %alias, "Inserted record");
                Ok(())
            }
            Err(err) if is_unique_violation(&err) => {
                Err(StorageError::AlreadyExists(alias.to_string()))
            }
            Err(err) => Err(map_sqlx_error(err)),
        }
    }
}

#[async_trait]
impl Delete for SqlProvider {
    async fn delete(&self, alias: &Alias) -> Result<bool> {
        let result = sqlx::query(&self.statements.delete)
            .bind(alias.as_str())
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        Ok(result.rows_affected() > 0)
    }
}
