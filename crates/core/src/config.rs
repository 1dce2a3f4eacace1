//! Application configuration: defaults, an optional TOML file and `WARSCROLL_*`
//! environment overrides, applied in that order.

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::Deserialize;

use crate::{roster::BattlelineTiers, save::FileStore};

const CONFIG_DIR: &str = "warscroll";
const CONFIG_FILE: &str = "config.toml";
const ENV_PREFIX: &str = "WARSCROLL";

/// Default catalog file name inside the data root.
pub const DEFAULT_CATALOG_FILE: &str = "catalog.json";

/// Settings resolved from defaults, the config file and `WARSCROLL_*` variables.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Directory backing the roster key-value store.
    pub data_root: PathBuf,
    /// Catalog JSON file, or a directory of JSON fragments.
    pub catalog_path: PathBuf,
    /// Threshold table for the battleline requirement.
    pub battleline_tiers: BattlelineTiers,
}

impl Default for AppConfig {
    fn default() -> Self {
        let data_root = FileStore::default_root();
        Self {
            catalog_path: data_root.join(DEFAULT_CATALOG_FILE),
            data_root,
            battleline_tiers: BattlelineTiers::default(),
        }
    }
}

impl AppConfig {
    /// Load from the user's config file and environment.
    pub fn load() -> Result<Self> {
        Self::load_from(&config_path())
    }

    /// Load with `path` as the config file. A missing file is not an error.
    pub fn load_from(path: &Path) -> Result<Self> {
        let defaults = AppConfig::default();
        let settings = Config::builder()
            .set_default("data_root", defaults.data_root.to_string_lossy().into_owned())?
            .set_default(
                "catalog_path",
                defaults.catalog_path.to_string_lossy().into_owned(),
            )?
            .set_default("battleline_tiers", "legacy")?
            .add_source(File::from(path.to_path_buf()).required(false))
            .add_source(Environment::with_prefix(ENV_PREFIX))
            .build()
            .with_context(|| format!("failed to read configuration from {}", path.display()))?;

        settings
            .try_deserialize()
            .context("invalid configuration values")
    }

    /// Directory the binary writes its log file into.
    pub fn log_dir(&self) -> PathBuf {
        self.data_root.join("logs")
    }
}

/// Location of the user's config file.
pub fn config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(CONFIG_DIR)
        .join(CONFIG_FILE)
}

/// Write a commented default config file when none exists yet.
pub fn ensure_default_config() -> Result<PathBuf> {
    let path = config_path();
    write_default_config(&path)?;
    Ok(path)
}

fn write_default_config(path: &Path) -> Result<()> {
    if path.exists() {
        return Ok(());
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    let defaults = AppConfig::default();
    let contents = format!(
        "# Directory holding saved rosters and logs.\n\
         data_root = {data_root:?}\n\
         \n\
         # Catalog JSON file, or a directory of JSON fragments merged in name order.\n\
         catalog_path = {catalog_path:?}\n\
         \n\
         # \"legacy\" keeps the 20000 point middle battleline tier, \"standard\" uses 2000.\n\
         battleline_tiers = \"legacy\"\n",
        data_root = defaults.data_root.to_string_lossy(),
        catalog_path = defaults.catalog_path.to_string_lossy(),
    );
    fs::write(path, contents).with_context(|| format!("failed to write {}", path.display()))?;
    tracing::info!("wrote default configuration to {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn file_values_override_defaults() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join(CONFIG_FILE);
        fs::write(
            &path,
            "data_root = \"/srv/rosters\"\nbattleline_tiers = \"standard\"\n",
        )?;

        let config = AppConfig::load_from(&path)?;
        assert_eq!(config.data_root, PathBuf::from("/srv/rosters"));
        assert_eq!(config.battleline_tiers, BattlelineTiers::Standard);
        assert_eq!(config.catalog_path, AppConfig::default().catalog_path);
        Ok(())
    }

    #[test]
    fn missing_file_yields_defaults() -> Result<()> {
        let dir = tempdir()?;
        let config = AppConfig::load_from(&dir.path().join(CONFIG_FILE))?;
        assert_eq!(config.battleline_tiers, BattlelineTiers::Legacy);
        assert!(config.catalog_path.ends_with(DEFAULT_CATALOG_FILE));
        Ok(())
    }

    #[test]
    fn default_file_is_written_once_and_loads() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("nested").join(CONFIG_FILE);
        write_default_config(&path)?;
        let written = fs::read_to_string(&path)?;
        assert!(written.contains("battleline_tiers = \"legacy\""));

        fs::write(&path, "battleline_tiers = \"standard\"\n")?;
        write_default_config(&path)?;
        assert_eq!(
            AppConfig::load_from(&path)?.battleline_tiers,
            BattlelineTiers::Standard
        );
        Ok(())
    }

    #[test]
    fn unknown_tiers_are_rejected() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join(CONFIG_FILE);
        fs::write(&path, "battleline_tiers = \"huge\"\n")?;
        assert!(AppConfig::load_from(&path).is_err());
        Ok(())
    }
}
