//! PostgreSQL client implementation
//!
//! Pooled access shared by the claim record store and the catalog store.

use crate::config::schema::PostgreSQLConfig;
use crate::domain::{ClaimwrightError, Result};
use deadpool_postgres::{Manager, ManagerConfig, Pool, RecyclingMethod, Runtime};
use secrecy::ExposeSecret;
use std::time::Duration;
use tokio_postgres::{NoTls, Row};

/// Schema bootstrap, applied by [`PostgresClient::ensure_schema`]
const SCHEMA_SQL: &str = include_str!("../../../migrations/001_claims.sql");

/// PostgreSQL client for Claimwright
///
/// Provides methods for connecting to PostgreSQL, bootstrapping the schema,
/// and running statements using connection pooling.
pub struct PostgresClient {
    pool: Pool,
    statement_timeout_ms: u64,
    safe_connection_string: String,
}

impl PostgresClient {
    /// Create a new PostgreSQL client
    ///
    /// No connection is opened until the first query.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection string is invalid or the pool cannot be built.
    pub fn new(config: &PostgreSQLConfig) -> Result<Self> {
        let conn_str = config.connection_string.expose_secret();
        let pg_config: tokio_postgres::Config = conn_str.parse().map_err(|e| {
            ClaimwrightError::Configuration(format!("Invalid PostgreSQL connection string: {e}"))
        })?;

        let manager = Manager::from_config(
            pg_config,
            NoTls,
            ManagerConfig {
                recycling_method: RecyclingMethod::Fast,
            },
        );

        let timeout = Duration::from_secs(config.connection_timeout_seconds);
        let pool = Pool::builder(manager)
            .max_size(config.max_connections)
            .runtime(Runtime::Tokio1)
            .wait_timeout(Some(timeout))
            .create_timeout(Some(timeout))
            .recycle_timeout(Some(timeout))
            .build()
            .map_err(|e| {
                ClaimwrightError::Database(format!("Failed to create connection pool: {e}"))
            })?;

        Ok(Self {
            pool,
            statement_timeout_ms: config.statement_timeout_seconds * 1000,
            safe_connection_string: redact_connection_string(conn_str.as_ref()),
        })
    }

    /// Test the connection to PostgreSQL
    pub async fn test_connection(&self) -> Result<()> {
        let client = self.get_connection().await?;

        client
            .query_one("SELECT 1", &[])
            .await
            .map_err(|e| ClaimwrightError::Database(format!("Connection test failed: {e}")))?;

        tracing::info!(
            database = %self.safe_connection_string,
            "PostgreSQL connection test successful"
        );
        Ok(())
    }

    /// Ensure the tables and indexes exist
    ///
    /// # Errors
    ///
    /// Returns an error if the schema cannot be created.
    pub async fn ensure_schema(&self) -> Result<()> {
        let client = self.get_connection().await?;

        client
            .batch_execute(SCHEMA_SQL)
            .await
            .map_err(|e| ClaimwrightError::Database(format!("Failed to execute migration: {e}")))?;

        tracing::info!("PostgreSQL schema initialized");
        Ok(())
    }

    /// Get a connection from the pool
    ///
    /// # Errors
    ///
    /// Returns an error if a connection cannot be obtained.
    pub async fn get_connection(&self) -> Result<deadpool_postgres::Object> {
        self.pool.get().await.map_err(|e| {
            ClaimwrightError::Database(format!("Failed to get connection from pool: {e}"))
        })
    }

    /// Execute a query and return rows
    pub async fn query(
        &self,
        query: &str,
        params: &[&(dyn tokio_postgres::types::ToSql + Sync)],
    ) -> Result<Vec<Row>> {
        let client = self.get_connection().await?;
        self.apply_statement_timeout(&client).await?;

        client
            .query(query, params)
            .await
            .map_err(|e| ClaimwrightError::Database(format!("Query failed: {e}")))
    }

    /// Execute a statement and return the number of affected rows
    pub async fn execute(
        &self,
        statement: &str,
        params: &[&(dyn tokio_postgres::types::ToSql + Sync)],
    ) -> Result<u64> {
        let client = self.get_connection().await?;
        self.apply_statement_timeout(&client).await?;

        client
            .execute(statement, params)
            .await
            .map_err(|e| ClaimwrightError::Database(format!("Statement execution failed: {e}")))
    }

    async fn apply_statement_timeout(&self, client: &deadpool_postgres::Object) -> Result<()> {
        client
            .batch_execute(&format!(
                "SET statement_timeout = {}",
                self.statement_timeout_ms
            ))
            .await
            .map_err(|e| {
                ClaimwrightError::Database(format!("Failed to set statement timeout: {e}"))
            })
    }

    /// Connection string with credentials removed
    pub fn connection_string_safe(&self) -> &str {
        &self.safe_connection_string
    }

    /// Pool statistics
    pub fn pool_status(&self) -> deadpool_postgres::Status {
        self.pool.status()
    }
}

/// Drops everything before the `@` so credentials never reach the logs
fn redact_connection_string(conn_str: &str) -> String {
    match conn_str.rsplit_once('@') {
        Some((_, host)) => format!("postgresql://***@{host}"),
        None => "postgresql://***".to_string(),
    }
}
