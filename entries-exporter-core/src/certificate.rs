//! Placement of the CA certificate used for TLS connections.
//!
//! The certificate text lives in the settings; the MySQL client needs it as
//! a file. The file is kept under `<storage>/entries_exporter/ssl/`, with a
//! per-site sub-directory on multi-site installs, and is removed whenever
//! TLS is disabled or the certificate text is blank.

use crate::config::{ConnectionConfig, StorageConfig};
use crate::error::ExporterError;
use crate::Result;
use std::path::{Path, PathBuf};

const CA_FILE_NAME: &str = "ca.pem";

/// Location of the CA certificate file for one site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertificateStore {
    dir: PathBuf,
}

impl CertificateStore {
    /// Builds the store for a storage root and optional site id.
    pub fn new(storage_dir: &Path, site_id: Option<u64>) -> Self {
        let mut dir = storage_dir.join("entries_exporter").join("ssl");
        if let Some(site_id) = site_id {
            dir.push(site_id.to_string());
        }
        Self { dir }
    }

    /// Builds the store from the storage settings.
    pub fn from_settings(storage: &StorageConfig) -> Self {
        Self::new(&storage.dir, storage.site_id)
    }

    /// Directory holding the certificate.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Full path of the certificate file.
    pub fn ca_path(&self) -> PathBuf {
        self.dir.join(CA_FILE_NAME)
    }

    /// Brings the certificate file in line with the connection settings.
    ///
    /// Returns the file path when TLS is in use, `None` otherwise.
    ///
    /// # Errors
    /// Returns error if the directory cannot be created or the file cannot be
    /// written or removed.
    pub fn sync(&self, connection: &ConnectionConfig) -> Result<Option<PathBuf>> {
        let ca_path = self.ca_path();

        let Some(pem) = connection.tls_ca_pem() else {
            if ca_path.exists() {
                std::fs::remove_file(&ca_path).map_err(|e| {
                    ExporterError::io(format!("Failed to remove {}", ca_path.display()), e)
                })?;
                tracing::debug!("Removed CA certificate {}", ca_path.display());
            }
            return Ok(None);
        };

        std::fs::create_dir_all(&self.dir).map_err(|e| {
            ExporterError::io(format!("Failed to create {}", self.dir.display()), e)
        })?;
        std::fs::write(&ca_path, pem).map_err(|e| {
            ExporterError::io(format!("Failed to write {}", ca_path.display()), e)
        })?;

        tracing::debug!("Wrote CA certificate {}", ca_path.display());
        Ok(Some(ca_path))
    }
}
