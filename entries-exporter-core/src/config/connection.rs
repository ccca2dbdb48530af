//! Target database connection configuration.

use super::Secret;
use serde::Deserialize;
use std::time::Duration;

/// Port used when the settings store has none.
pub const DEFAULT_MYSQL_PORT: u16 = 3306;

const MAX_IDENTIFIER_LEN: usize = 64;

/// Connection parameters for the external MySQL database and the table the
/// entries are written to.
///
/// # Security
/// `Display` omits the user name and password, and `Debug` redacts the
/// password and CA certificate text.
///
/// # Example
/// ```rust
/// use entries_exporter_core::config::ConnectionConfig;
///
/// let config = ConnectionConfig::new("db.example.edu", "exporter", "leads")
///     .with_port(6446)
///     .with_table("online_entries");
///
/// assert!(config.validate().is_ok());
/// assert_eq!(config.to_string(), "ConnectionConfig(db.example.edu:6446/leads.online_entries)");
/// ```
#[derive(Clone, Deserialize)]
pub struct ConnectionConfig {
    /// Database host address
    pub host: String,
    /// Port number
    #[serde(default = "default_port")]
    pub port: u16,
    /// User name
    pub user: String,
    /// Password
    #[serde(default)]
    pub password: Secret,
    /// Database (schema) name
    pub name: String,
    /// Table the entries are written to
    #[serde(default = "default_table")]
    pub table: String,
    /// Verify the server certificate against `ca_pem`
    #[serde(default)]
    pub use_tls: bool,
    /// CA certificate in PEM format
    #[serde(default)]
    pub ca_pem: Option<String>,
    /// Handshake timeout in seconds
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
}

fn default_port() -> u16 {
    DEFAULT_MYSQL_PORT
}

fn default_table() -> String {
    "online_entries".to_string()
}

fn default_connect_timeout() -> u64 {
    30
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: DEFAULT_MYSQL_PORT,
            user: String::new(),
            password: Secret::default(),
            name: String::new(),
            table: default_table(),
            use_tls: false,
            ca_pem: None,
            connect_timeout_secs: default_connect_timeout(),
        }
    }
}

impl std::fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &self.password)
            .field("name", &self.name)
            .field("table", &self.table)
            .field("use_tls", &self.use_tls)
            .field("ca_pem", &self.ca_pem.as_ref().map(|_| "<pem>"))
            .field("connect_timeout_secs", &self.connect_timeout_secs)
            .finish()
    }
}

impl std::fmt::Display for ConnectionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "ConnectionConfig({}:{}/{}.{})",
            self.host, self.port, self.name, self.table
        )
    }
}

impl ConnectionConfig {
    /// Creates a config with defaults for everything but host, user and database.
    pub fn new(host: impl Into<String>, user: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            user: user.into(),
            name: name.into(),
            ..Default::default()
        }
    }

    /// Builder method to set port.
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Builder method to set the password.
    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Secret::new(password);
        self
    }

    /// Builder method to set the target table.
    pub fn with_table(mut self, table: impl Into<String>) -> Self {
        self.table = table.into();
        self
    }

    /// Builder method to enable TLS with a CA certificate.
    pub fn with_tls(mut self, ca_pem: impl Into<String>) -> Self {
        self.use_tls = true;
        self.ca_pem = Some(ca_pem.into());
        self
    }

    /// Handshake timeout.
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    /// CA certificate text when TLS is enabled and a non-blank certificate
    /// is configured.
    pub fn tls_ca_pem(&self) -> Option<&str> {
        if !self.use_tls {
            return None;
        }
        self.ca_pem
            .as_deref()
            .filter(|pem| !pem.trim().is_empty())
    }

    /// Validates connection configuration parameters.
    ///
    /// # Errors
    /// Returns error if a required value is empty, the port is zero, or the
    /// database / table names are not plain identifiers.
    pub fn validate(&self) -> crate::Result<()> {
        if self.host.trim().is_empty() {
            return Err(crate::error::ExporterError::configuration(
                "database host cannot be empty",
            ));
        }

        if self.port == 0 {
            return Err(crate::error::ExporterError::configuration(
                "database port must be greater than 0",
            ));
        }

        if self.user.trim().is_empty() {
            return Err(crate::error::ExporterError::configuration(
                "database user cannot be empty",
            ));
        }

        validate_identifier("database name", &self.name)?;
        validate_identifier("table name", &self.table)?;

        if self.connect_timeout_secs == 0 {
            return Err(crate::error::ExporterError::configuration(
                "connect_timeout_secs must be greater than 0",
            ));
        }

        Ok(())
    }
}

/// Accepts unquoted MySQL identifiers: ASCII letters, digits, `_` and `$`,
/// at most 64 characters.
fn validate_identifier(what: &str, value: &str) -> crate::Result<()> {
    if value.is_empty() {
        return Err(crate::error::ExporterError::configuration(format!(
            "{} cannot be empty",
            what
        )));
    }

    if value.len() > MAX_IDENTIFIER_LEN {
        return Err(crate::error::ExporterError::configuration(format!(
            "{} too long: maximum {} characters",
            what, MAX_IDENTIFIER_LEN
        )));
    }

    if !value
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
    {
        return Err(crate::error::ExporterError::configuration(format!(
            "{} contains invalid characters",
            what
        )));
    }

    Ok(())
}
