//! Catalog snapshot manifest.

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// File name of the manifest stored beside a directory of catalog fragments.
pub const MANIFEST_FILE: &str = ".catalog-manifest.json";

/// Metadata describing the catalog snapshot a roster was built against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct CatalogMetadata {
    /// Free-form version label of the source tables (e.g. a points publication).
    pub version: Option<String>,
    /// Timestamp at which the catalog was generated.
    pub generated_at: Option<DateTime<Utc>>,
}

impl CatalogMetadata {
    /// Load metadata from the given path, returning `None` if it does not exist.
    pub fn load(path: impl AsRef<Path>) -> Result<Option<Self>> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(None);
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read manifest {}", path.display()))?;
        let metadata = serde_json::from_str(&contents)
            .with_context(|| format!("failed to parse manifest {}", path.display()))?;
        Ok(metadata)
    }

    /// Human readable label for status lines.
    pub fn label(&self) -> String {
        match (&self.version, &self.generated_at) {
            (Some(version), Some(at)) => format!("{version} ({})", at.format("%Y-%m-%d")),
            (Some(version), None) => version.clone(),
            (None, Some(at)) => format!("generated {}", at.format("%Y-%m-%d")),
            (None, None) => "unversioned".to_string(),
        }
    }
}

/// Helper to compute the manifest path inside a catalog directory.
pub fn manifest_path(catalog_dir: impl AsRef<Path>) -> PathBuf {
    catalog_dir.as_ref().join(MANIFEST_FILE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::tempdir;

    #[test]
    fn missing_manifest_is_none() -> Result<()> {
        let dir = tempdir()?;
        assert!(CatalogMetadata::load(manifest_path(dir.path()))?.is_none());
        Ok(())
    }

    #[test]
    fn reads_manifest_and_formats_label() -> Result<()> {
        let dir = tempdir()?;
        fs::write(
            manifest_path(dir.path()),
            r#"{"version":"GHB 2018","generatedAt":"2018-07-01T10:00:00Z"}"#,
        )?;

        let metadata = CatalogMetadata::load(manifest_path(dir.path()))?.expect("manifest");
        assert_eq!(metadata.version.as_deref(), Some("GHB 2018"));
        assert_eq!(
            metadata.generated_at,
            Some(Utc.with_ymd_and_hms(2018, 7, 1, 10, 0, 0).unwrap())
        );
        assert_eq!(metadata.label(), "GHB 2018 (2018-07-01)");
        assert_eq!(CatalogMetadata::default().label(), "unversioned");
        Ok(())
    }
}
