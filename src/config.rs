use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf};
use tracing::debug;

/// Locations of the reference files the pipeline reads.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct DataConfig {
    /// Reference table mapping ETF mnemonics to ISINs
    pub metadata_file: PathBuf,
    /// Instrument x ETF weight matrix covering the tracked universe
    pub composition_file: PathBuf,
    /// Directory holding one `<MNEMONIC>.csv` composition file per ETF
    pub holdings_dir: PathBuf,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct FbiProviderConfig {
    pub base_url: String,
}

impl Default for FbiProviderConfig {
    fn default() -> Self {
        FbiProviderConfig {
            base_url: "https://fbi.prod.internal".to_string(),
        }
    }
}

/// Attribute names used against the market-data service. These mirror the
/// service's own vocabulary and rarely change; they are configuration so no
/// module carries them as ambient constants.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AttributeNames {
    /// Source attribute for ISIN-keyed lookups
    pub isin: String,
    /// Target attribute holding the full market ticker
    pub ticker: String,
    /// Attribute carrying the display name that position codes derive from
    pub display_name: String,
}

impl Default for AttributeNames {
    fn default() -> Self {
        AttributeNames {
            isin: "ISIN".to_string(),
            ticker: "BBG".to_string(),
            display_name: "DisplayName".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AppConfig {
    pub data: DataConfig,
    #[serde(default)]
    pub provider: FbiProviderConfig,
    #[serde(default)]
    pub attributes: AttributeNames,
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        debug!("Loading default config");
        let config_path = Self::default_config_path()?;
        Self::load_from_path(&config_path)
    }

    pub fn default_config_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("in", "codito", "xbo")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.config_dir().join("config.yaml"))
    }

    pub fn load_from_path<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let config_str = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: Self = serde_yaml::from_str(&config_str)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;
        debug!("Successfully loaded config");
        Ok(config)
    }
}
