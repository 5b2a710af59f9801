// Per-year distance log used for cost-per-mile.
use crate::error::Result;
use crate::reports::cost_per_mile;
use log::warn;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

pub const ALL_YEARS: &str = "All";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MileageData {
    pub miles: String,
    pub chains: String,
}

/// Miles and chains as typed by the user, keyed by year (or `All`).
#[derive(Debug, Clone, Default)]
pub struct MileageLog {
    path: PathBuf,
    entries: BTreeMap<String, MileageData>,
}

impl MileageLog {
    /// A missing or unreadable file starts an empty log.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let entries = match std::fs::read_to_string(&path) {
            Ok(s) => serde_json::from_str(&s).unwrap_or_else(|e| {
                warn!("Ignoring unreadable mileage file {}: {}", path.display(), e);
                BTreeMap::new()
            }),
            Err(_) => BTreeMap::new(),
        };
        Self { path, entries }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn get(&self, year: &str) -> Option<&MileageData> {
        self.entries.get(key(year))
    }

    pub fn record(&mut self, year: &str, miles: &str, chains: &str) -> Result<()> {
        self.entries.insert(
            key(year).to_string(),
            MileageData {
                miles: miles.trim().to_string(),
                chains: chains.trim().to_string(),
            },
        );
        crate::store::write_atomically(&self.path, serde_json::to_string_pretty(&self.entries)?.as_bytes())
    }

    pub fn cost_per_mile(&self, year: &str, adjusted_total: f64) -> Option<f64> {
        let data = self.get(year)?;
        cost_per_mile(&data.miles, &data.chains, adjusted_total)
    }
}

fn key(year: &str) -> &str {
    if year.is_empty() {
        ALL_YEARS
    } else {
        year
    }
}
