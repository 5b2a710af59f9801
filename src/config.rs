use crate::error::Result;
use config_file::FromConfigFile;
use log::info;
use serde::Deserialize;
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_FILE: &str = "rail_ledger.toml";

/// Where the ledger keeps its files. Every key is optional in the TOML.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub data_dir: PathBuf,
    pub tickets_file: String,
    pub mileage_file: String,
    pub widget_file: String,
    pub export_file: String,
    pub statistics_file: String,
    pub pretty_json: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("."),
            tickets_file: "tickets.json".to_string(),
            mileage_file: "mileage.json".to_string(),
            widget_file: "widget.json".to_string(),
            export_file: "tickets.csv".to_string(),
            statistics_file: "statistics.json".to_string(),
            pretty_json: true,
        }
    }
}

impl AppConfig {
    /// A missing file means defaults; a malformed one is an error.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            info!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let config = Self::from_config_file(path)?;
        info!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn tickets_path(&self) -> PathBuf {
        self.data_dir.join(&self.tickets_file)
    }

    pub fn mileage_path(&self) -> PathBuf {
        self.data_dir.join(&self.mileage_file)
    }

    pub fn widget_path(&self) -> PathBuf {
        self.data_dir.join(&self.widget_file)
    }

    pub fn export_path(&self) -> PathBuf {
        self.data_dir.join(&self.export_file)
    }

    pub fn statistics_path(&self) -> PathBuf {
        self.data_dir.join(&self.statistics_file)
    }
}
