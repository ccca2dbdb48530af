//! Settings file loading, environment overrides and validation.

use super::{ConnectionConfig, Secret};
use crate::error::ExporterError;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Prefix shared by every environment override.
pub const ENV_PREFIX: &str = "ENTRIES_EXPORTER";

/// Entries requested per page when the settings do not say otherwise.
pub const DEFAULT_PAGE_SIZE: u32 = 20;

/// Largest page size accepted by the source.
pub const MAX_PAGE_SIZE: u32 = 1000;

/// Complete settings for one command run.
///
/// Loaded once, validated, then passed by reference to every component.
#[derive(Debug, Clone, Deserialize)]
pub struct ExporterSettings {
    /// Target database and table
    pub database: ConnectionConfig,
    /// Which forms to export and how to page them
    #[serde(default)]
    pub forms: FormSelection,
    /// Record retention window used by `purge`
    #[serde(default)]
    pub retention: RetentionConfig,
    /// Entry source endpoint; only `export` and `purge` need it
    #[serde(default)]
    pub source: SourceConfig,
    /// Where local files (the CA certificate) are kept
    #[serde(default)]
    pub storage: StorageConfig,
}

/// Form selection and paging.
#[derive(Debug, Clone, Deserialize)]
pub struct FormSelection {
    /// Form ids exported when the command line names none
    #[serde(default)]
    pub export: Vec<u32>,
    /// Entries per page
    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

impl Default for FormSelection {
    fn default() -> Self {
        Self {
            export: Vec::new(),
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

fn default_page_size() -> u32 {
    DEFAULT_PAGE_SIZE
}

/// Retention window.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct RetentionConfig {
    /// Number of days target rows are kept
    #[serde(default = "default_retain_days")]
    pub retain_days: u32,
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            retain_days: default_retain_days(),
        }
    }
}

fn default_retain_days() -> u32 {
    30
}

/// Gravity Forms REST API endpoint and credentials.
#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    /// Site root, e.g. `https://www.example.edu`
    pub base_url: String,
    /// REST API consumer key
    #[serde(default)]
    pub consumer_key: String,
    /// REST API consumer secret
    #[serde(default)]
    pub consumer_secret: Secret,
    /// Per-request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub timeout_secs: u64,
}

fn default_request_timeout() -> u64 {
    60
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            consumer_key: String::new(),
            consumer_secret: Secret::default(),
            timeout_secs: default_request_timeout(),
        }
    }
}

impl SourceConfig {
    /// Per-request timeout.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Local storage layout.
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Root directory for local files
    #[serde(default = "default_storage_dir")]
    pub dir: PathBuf,
    /// Site id on multi-site installs; files are kept per site
    #[serde(default)]
    pub site_id: Option<u64>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            dir: default_storage_dir(),
            site_id: None,
        }
    }
}

fn default_storage_dir() -> PathBuf {
    PathBuf::from(".")
}

impl ExporterSettings {
    /// Loads settings from a TOML file, applies `ENTRIES_EXPORTER_*`
    /// environment overrides and validates the result.
    ///
    /// # Errors
    /// Returns error if the file cannot be read or parsed, an override is
    /// malformed, or validation fails.
    pub fn load(path: &Path) -> crate::Result<Self> {
        let settings = Self::read(path)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Like [`Self::load`] but validates only the `[database]` section, for
    /// commands that never talk to the entry source.
    ///
    /// # Errors
    /// Returns error if the file cannot be read or parsed, an override is
    /// malformed, or the database settings are invalid.
    pub fn load_database(path: &Path) -> crate::Result<Self> {
        let settings = Self::read(path)?;
        settings.database.validate()?;
        Ok(settings)
    }

    fn read(path: &Path) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ExporterError::io(format!("Failed to read settings {}", path.display()), e)
        })?;

        let mut settings = Self::from_toml(&content)?;
        settings.apply_overrides(|key| std::env::var(key).ok())?;

        tracing::debug!("Loaded settings from {}", path.display());
        Ok(settings)
    }

    /// Parses settings from a TOML string without validating them.
    pub fn from_toml(content: &str) -> crate::Result<Self> {
        toml::from_str(content)
            .map_err(|e| ExporterError::serialization("Invalid settings file", e))
    }

    /// Applies overrides looked up by full variable name, e.g.
    /// `ENTRIES_EXPORTER_DB_HOST`.
    ///
    /// # Errors
    /// Returns error if `ENTRIES_EXPORTER_DB_PORT` is not a port number.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> crate::Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |suffix: &str| lookup(&format!("{}_{}", ENV_PREFIX, suffix));

        if let Some(host) = var("DB_HOST") {
            self.database.host = host;
        }
        if let Some(port) = var("DB_PORT") {
            self.database.port = port.trim().parse().map_err(|_| {
                ExporterError::configuration(format!(
                    "{}_DB_PORT must be a port number",
                    ENV_PREFIX
                ))
            })?;
        }
        if let Some(user) = var("DB_USER") {
            self.database.user = user;
        }
        if let Some(password) = var("DB_PASSWORD") {
            self.database.password = Secret::new(password);
        }
        if let Some(name) = var("DB_NAME") {
            self.database.name = name;
        }
        if let Some(table) = var("DB_TABLE") {
            self.database.table = table;
        }
        if let Some(url) = var("SOURCE_URL") {
            self.source.base_url = url;
        }
        if let Some(key) = var("SOURCE_KEY") {
            self.source.consumer_key = key;
        }
        if let Some(secret) = var("SOURCE_SECRET") {
            self.source.consumer_secret = Secret::new(secret);
        }

        Ok(())
    }

    /// Validates every section.
    ///
    /// # Errors
    /// Returns the first configuration problem found.
    pub fn validate(&self) -> crate::Result<()> {
        self.database.validate()?;

        if self.forms.page_size == 0 || self.forms.page_size > MAX_PAGE_SIZE {
            return Err(ExporterError::configuration(format!(
                "page_size must be between 1 and {}",
                MAX_PAGE_SIZE
            )));
        }

        if self.source.base_url.trim().is_empty() {
            return Err(ExporterError::configuration(
                "source base_url cannot be empty",
            ));
        }

        let url = url::Url::parse(&self.source.base_url).map_err(|e| {
            ExporterError::configuration(format!("source base_url is not a valid URL: {}", e))
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ExporterError::configuration(
                "source base_url must use http:// or https://",
            ));
        }

        if self.source.timeout_secs == 0 {
            return Err(ExporterError::configuration(
                "source timeout_secs must be greater than 0",
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    const SAMPLE: &str = r#"
        [database]
        host = "db.example.edu"
        port = 6446
        user = "exporter"
        password = "pw"
        name = "leads"
        table = "online_entries"
        use_tls = true
        ca_pem = "-----BEGIN CERTIFICATE-----"

        [forms]
        export = [1, 4, 7]

        [retention]
        retain_days = 45

        [source]
        base_url = "https://www.example.edu"
        consumer_key = "ck_123"
        consumer_secret = "cs_456"

        [storage]
        dir = "/var/lib/entries-exporter"
        site_id = 3
    "#;

    #[test]
    fn test_parse_full_settings() {
        let settings = ExporterSettings::from_toml(SAMPLE).unwrap();

        assert_eq!(settings.database.host, "db.example.edu");
        assert_eq!(settings.database.port, 6446);
        assert_eq!(settings.database.password.expose(), "pw");
        assert!(settings.database.use_tls);
        assert_eq!(settings.forms.export, vec![1, 4, 7]);
        assert_eq!(settings.forms.page_size, DEFAULT_PAGE_SIZE);
        assert_eq!(settings.retention.retain_days, 45);
        assert_eq!(settings.source.consumer_key, "ck_123");
        assert_eq!(settings.source.timeout(), Duration::from_secs(60));
        assert_eq!(settings.storage.site_id, Some(3));
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_parse_minimal_settings_uses_defaults() {
        let settings = ExporterSettings::from_toml(
            r#"
            [database]
            host = "localhost"
            user = "root"
            name = "leads"

            [source]
            base_url = "http://localhost:8080"
            "#,
        )
        .unwrap();

        assert_eq!(settings.database.port, 3306);
        assert_eq!(settings.database.table, "online_entries");
        assert!(settings.forms.export.is_empty());
        assert_eq!(settings.retention.retain_days, 30);
        assert_eq!(settings.storage.dir, PathBuf::from("."));
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_overrides_take_precedence() {
        let mut settings = ExporterSettings::from_toml(SAMPLE).unwrap();
        let env: HashMap<&str, &str> = HashMap::from([
            ("ENTRIES_EXPORTER_DB_HOST", "override.example.edu"),
            ("ENTRIES_EXPORTER_DB_PORT", "3307"),
            ("ENTRIES_EXPORTER_DB_PASSWORD", "from-env"),
            ("ENTRIES_EXPORTER_SOURCE_SECRET", "cs_env"),
        ]);

        settings
            .apply_overrides(|key| env.get(key).map(|v| (*v).to_string()))
            .unwrap();

        assert_eq!(settings.database.host, "override.example.edu");
        assert_eq!(settings.database.port, 3307);
        assert_eq!(settings.database.password.expose(), "from-env");
        assert_eq!(settings.source.consumer_secret.expose(), "cs_env");
        assert_eq!(settings.database.user, "exporter");
    }

    #[test]
    fn test_bad_port_override_is_rejected() {
        let mut settings = ExporterSettings::from_toml(SAMPLE).unwrap();
        let result = settings.apply_overrides(|key| {
            (key == "ENTRIES_EXPORTER_DB_PORT").then(|| "not-a-port".to_string())
        });
        assert!(result.is_err());
    }

    #[test]
    fn test_validation_failures() {
        let mut settings = ExporterSettings::from_toml(SAMPLE).unwrap();
        settings.forms.page_size = 0;
        assert!(settings.validate().is_err());

        let mut settings = ExporterSettings::from_toml(SAMPLE).unwrap();
        settings.source.base_url = "ftp://example.edu".to_string();
        assert!(settings.validate().is_err());

        let mut settings = ExporterSettings::from_toml(SAMPLE).unwrap();
        settings.database.table = "bad-name".to_string();
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_missing_required_section() {
        let result = ExporterSettings::from_toml("[database]\nhost = \"x\"\n");
        assert!(matches!(result, Err(ExporterError::Serialization { .. })));
    }

    #[test]
    fn test_load_reads_file_and_env() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("entries-exporter.toml");
        std::fs::write(&path, SAMPLE).unwrap();

        let settings = temp_env::with_var("ENTRIES_EXPORTER_DB_TABLE", Some("entries_v2"), || {
            ExporterSettings::load(&path)
        })
        .unwrap();

        assert_eq!(settings.database.table, "entries_v2");
    }

    #[test]
    fn test_database_only_settings_load_for_connection_test() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("entries-exporter.toml");
        std::fs::write(
            &path,
            "[database]\nhost = \"localhost\"\nuser = \"root\"\nname = \"leads\"\n",
        )
        .unwrap();

        let settings = temp_env::with_var_unset("ENTRIES_EXPORTER_SOURCE_URL", || {
            ExporterSettings::load_database(&path)
        })
        .unwrap();
        assert_eq!(settings.database.name, "leads");
        assert!(settings.source.base_url.is_empty());

        let result = temp_env::with_var_unset("ENTRIES_EXPORTER_SOURCE_URL", || {
            ExporterSettings::load(&path)
        });
        assert!(matches!(result, Err(ExporterError::Configuration { .. })));
    }

    #[test]
    fn test_load_database_still_checks_database() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("entries-exporter.toml");
        std::fs::write(
            &path,
            "[database]\nhost = \"localhost\"\nuser = \"root\"\nname = \"leads\"\ntable = \"bad-name\"\n",
        )
        .unwrap();

        let result = temp_env::with_var_unset("ENTRIES_EXPORTER_DB_TABLE", || {
            ExporterSettings::load_database(&path)
        });
        assert!(matches!(result, Err(ExporterError::Configuration { .. })));
    }

    #[test]
    fn test_load_missing_file() {
        let result = ExporterSettings::load(Path::new("/nonexistent/entries-exporter.toml"));
        assert!(matches!(result, Err(ExporterError::Io { .. })));
    }
}
