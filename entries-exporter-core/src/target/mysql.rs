//! MySQL connector and target table access.
//!
//! One `MySqlConnection` is opened per run and reused for every form, page
//! and entry; there is no pooling. When TLS is enabled the server
//! certificate and host name are verified against the CA file placed by
//! [`crate::certificate::CertificateStore`].

use super::{EntryTarget, Row, quote_identifier};
use crate::config::ConnectionConfig;
use crate::error::ExporterError;
use crate::mapping::ENTRY_ID_COLUMN;
use crate::Result;
use async_trait::async_trait;
use sqlx::mysql::{MySqlConnectOptions, MySqlConnection, MySqlSslMode};
use sqlx::Connection;
use std::collections::HashSet;
use std::path::Path;

/// Session modes that reject loosely typed values such as `''` for an
/// `INT` column. Unfilled form fields arrive as empty strings.
const STRICT_SQL_MODES: [&str; 3] = ["STRICT_TRANS_TABLES", "STRICT_ALL_TABLES", "TRADITIONAL"];

/// Builds connect options from the settings.
///
/// # Errors
/// Returns a configuration error when TLS is enabled but no CA file is
/// available; the connection is never downgraded to plain text.
pub fn connect_options(
    config: &ConnectionConfig,
    ca_path: Option<&Path>,
) -> Result<MySqlConnectOptions> {
    let options = MySqlConnectOptions::new()
        .host(&config.host)
        .port(config.port)
        .username(&config.user)
        .password(config.password.expose())
        .database(&config.name);

    if !config.use_tls {
        return Ok(options);
    }

    let ca_path = ca_path.ok_or_else(|| {
        ExporterError::configuration("TLS is enabled but no CA certificate is configured")
    })?;

    Ok(options.ssl_mode(MySqlSslMode::VerifyIdentity).ssl_ca(ca_path))
}

/// Opens a single connection to the target database.
///
/// # Errors
/// Returns `Connection` if the handshake, TLS negotiation or authentication
/// fails or does not finish within the connect timeout. There is no retry.
pub async fn connect(config: &ConnectionConfig, ca_path: Option<&Path>) -> Result<MySqlConnection> {
    let options = connect_options(config, ca_path)?;

    tracing::debug!("Connecting to {}", config);

    let mut conn = tokio::time::timeout(
        config.connect_timeout(),
        MySqlConnection::connect_with(&options),
    )
    .await
    .map_err(|_| {
        ExporterError::connection_failed(std::io::Error::new(
            std::io::ErrorKind::TimedOut,
            format!(
                "no response within {}s",
                config.connect_timeout().as_secs()
            ),
        ))
    })?
    .map_err(ExporterError::connection_failed)?;

    // Entry dates are UTC; keep TIMESTAMP columns from shifting them
    sqlx::query("SET time_zone = '+00:00'")
        .execute(&mut conn)
        .await
        .map_err(ExporterError::connection_failed)?;

    relax_sql_mode(&mut conn).await?;

    Ok(conn)
}

/// `sql_mode` with the strict modes removed, other modes kept in order.
pub fn relaxed_sql_mode(current: &str) -> String {
    current
        .split(',')
        .map(str::trim)
        .filter(|mode| !mode.is_empty())
        .filter(|mode| {
            !STRICT_SQL_MODES
                .iter()
                .any(|strict| strict.eq_ignore_ascii_case(mode))
        })
        .collect::<Vec<_>>()
        .join(",")
}

async fn relax_sql_mode(conn: &mut MySqlConnection) -> Result<()> {
    let current: String = sqlx::query_scalar("SELECT CAST(@@SESSION.sql_mode AS CHAR)")
        .fetch_one(&mut *conn)
        .await
        .map_err(ExporterError::connection_failed)?;

    let relaxed = relaxed_sql_mode(&current);
    if relaxed == current {
        return Ok(());
    }

    tracing::debug!("Session sql_mode set to '{}'", relaxed);
    sqlx::query("SET SESSION sql_mode = ?")
        .bind(relaxed)
        .execute(&mut *conn)
        .await
        .map_err(ExporterError::connection_failed)?;

    Ok(())
}

/// Connects and runs `SELECT 1`.
///
/// # Errors
/// Returns `Connection` on any failure.
pub async fn test_connection(config: &ConnectionConfig, ca_path: Option<&Path>) -> Result<()> {
    let mut conn = connect(config, ca_path).await?;

    let result: i64 = sqlx::query_scalar("SELECT 1")
        .fetch_one(&mut conn)
        .await
        .map_err(ExporterError::connection_failed)?;

    if result != 1 {
        return Err(ExporterError::configuration(
            "Basic connectivity test failed: unexpected result",
        ));
    }

    if let Err(e) = conn.close().await {
        tracing::debug!("Error closing test connection: {}", e);
    }

    Ok(())
}

/// The configured table in the target database.
pub struct MySqlTarget {
    conn: MySqlConnection,
    database: String,
    table: String,
}

impl std::fmt::Debug for MySqlTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MySqlTarget")
            .field("database", &self.database)
            .field("table", &self.table)
            .finish_non_exhaustive()
    }
}

impl MySqlTarget {
    /// Wraps an open connection.
    pub fn new(conn: MySqlConnection, config: &ConnectionConfig) -> Self {
        Self {
            conn,
            database: config.name.clone(),
            table: config.table.clone(),
        }
    }

    /// Connects and wraps the connection.
    ///
    /// # Errors
    /// See [`connect`].
    pub async fn connect(config: &ConnectionConfig, ca_path: Option<&Path>) -> Result<Self> {
        let conn = connect(config, ca_path).await?;
        Ok(Self::new(conn, config))
    }

    /// Closes the connection.
    pub async fn close(self) {
        if let Err(e) = self.conn.close().await {
            tracing::debug!("Error closing connection: {}", e);
        }
    }

    fn qualified_table(&self) -> String {
        format!(
            "{}.{}",
            quote_identifier(&self.database),
            quote_identifier(&self.table)
        )
    }
}

/// `INSERT` statement with one placeholder per row column.
pub fn insert_statement(qualified_table: &str, row: &Row) -> String {
    let columns: Vec<String> = row.columns().map(quote_identifier).collect();
    let placeholders = vec!["?"; columns.len()].join(", ");
    format!(
        "INSERT INTO {} ({}) VALUES ({})",
        qualified_table,
        columns.join(", "),
        placeholders
    )
}

#[async_trait]
impl EntryTarget for MySqlTarget {
    async fn table_columns(&mut self) -> Result<HashSet<String>> {
        let table = self.qualified_table();

        // CAST to CHAR to avoid binary collation surprises
        let columns: Vec<String> = sqlx::query_scalar(
            "SELECT CAST(COLUMN_NAME AS CHAR(255)) AS COLUMN_NAME
             FROM INFORMATION_SCHEMA.COLUMNS
             WHERE TABLE_SCHEMA = ? AND TABLE_NAME = ?",
        )
        .bind(&self.database)
        .bind(&self.table)
        .fetch_all(&mut self.conn)
        .await
        .map_err(|e| {
            ExporterError::query_failed(format!("Failed to read columns of {}", table), e)
        })?;

        Ok(columns.into_iter().collect())
    }

    async fn entry_exists(&mut self, entry_id: i64) -> Result<bool> {
        let sql = format!(
            "SELECT CAST(EXISTS(SELECT 1 FROM {} WHERE {} = ?) AS SIGNED)",
            self.qualified_table(),
            quote_identifier(ENTRY_ID_COLUMN)
        );

        let exists: i64 = sqlx::query_scalar(&sql)
            .bind(entry_id)
            .fetch_one(&mut self.conn)
            .await
            .map_err(|e| {
                ExporterError::query_failed(format!("Existence check for entry {}", entry_id), e)
            })?;

        Ok(exists != 0)
    }

    async fn insert_row(&mut self, row: &Row) -> Result<()> {
        let sql = insert_statement(&self.qualified_table(), row);

        let mut query = sqlx::query(&sql);
        for value in row.values() {
            query = query.bind(value);
        }

        query
            .execute(&mut self.conn)
            .await
            .map_err(|e| ExporterError::query_failed("Insert failed", e))?;

        Ok(())
    }

    async fn delete_entry(&mut self, entry_id: i64) -> Result<u64> {
        let sql = format!(
            "DELETE FROM {} WHERE {} = ?",
            self.qualified_table(),
            quote_identifier(ENTRY_ID_COLUMN)
        );

        let result = sqlx::query(&sql)
            .bind(entry_id)
            .execute(&mut self.conn)
            .await
            .map_err(|e| ExporterError::query_failed(format!("Delete of entry {}", entry_id), e))?;

        Ok(result.rows_affected())
    }
}
