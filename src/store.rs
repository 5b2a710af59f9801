use crate::error::{LedgerError, Result};
use crate::reports::CountRow;
use crate::types::TicketRecord;
use log::{debug, warn};
use serde::Serialize;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Whole-collection persistence. Loading never fails: anything unreadable
/// is an empty collection. Saving replaces everything or nothing.
pub trait TicketStore {
    fn load(&self) -> Vec<TicketRecord>;
    fn save(&mut self, tickets: &[TicketRecord]) -> Result<()>;
}

/// Tickets as a JSON array in a single file.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
    pretty: bool,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            pretty: true,
        }
    }

    pub fn pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TicketStore for JsonFileStore {
    fn load(&self) -> Vec<TicketRecord> {
        let text = match std::fs::read_to_string(&self.path) {
            Ok(t) => t,
            Err(e) => {
                warn!("Error loading tickets from {}: {}", self.path.display(), e);
                return Vec::new();
            }
        };
        match serde_json::from_str(&text) {
            Ok(tickets) => tickets,
            Err(e) => {
                warn!("Error decoding tickets in {}: {}", self.path.display(), e);
                Vec::new()
            }
        }
    }

    fn save(&mut self, tickets: &[TicketRecord]) -> Result<()> {
        let bytes = if self.pretty {
            serde_json::to_vec_pretty(tickets)?
        } else {
            serde_json::to_vec(tickets)?
        };
        write_atomically(&self.path, &bytes)?;
        debug!("Saved {} tickets to {}", tickets.len(), self.path.display());
        Ok(())
    }
}

/// In-memory store, handy for callers that manage persistence themselves.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    pub tickets: Vec<TicketRecord>,
    pub saves: usize,
}

impl TicketStore for MemoryStore {
    fn load(&self) -> Vec<TicketRecord> {
        self.tickets.clone()
    }

    fn save(&mut self, tickets: &[TicketRecord]) -> Result<()> {
        self.tickets = tickets.to_vec();
        self.saves += 1;
        Ok(())
    }
}

/// Write to a sibling temp file then rename over the target.
pub fn write_atomically(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    {
        let mut file = std::fs::File::create(&tmp)?;
        file.write_all(bytes)?;
        file.sync_all()?;
    }
    std::fs::rename(&tmp, path)?;
    Ok(())
}

/// Summary handed to home-screen widgets after each successful save.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DisplaySnapshot {
    pub ticket_total: f64,
    pub compensation_total: f64,
    pub toc_distribution: Vec<(String, usize)>,
    pub ticket_types_this_year: Vec<String>,
}

impl DisplaySnapshot {
    pub fn new(ticket_total: f64, compensation_total: f64, by_toc: &[CountRow], types: Vec<String>) -> Self {
        Self {
            ticket_total,
            compensation_total,
            toc_distribution: by_toc.iter().map(|r| (r.label.clone(), r.count)).collect(),
            ticket_types_this_year: types,
        }
    }
}

/// Fire-and-forget sink for display snapshots; failures are only logged.
pub trait DisplayCache {
    fn refresh(&mut self, snapshot: &DisplaySnapshot);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoopDisplayCache;

impl DisplayCache for NoopDisplayCache {
    fn refresh(&mut self, _snapshot: &DisplaySnapshot) {}
}

/// Writes the latest snapshot to a JSON file a widget can poll.
#[derive(Debug, Clone)]
pub struct JsonDisplayCache {
    path: PathBuf,
}

impl JsonDisplayCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl DisplayCache for JsonDisplayCache {
    fn refresh(&mut self, snapshot: &DisplaySnapshot) {
        let result = serde_json::to_vec_pretty(snapshot)
            .map_err(LedgerError::from)
            .and_then(|bytes| write_atomically(&self.path, &bytes));
        if let Err(e) = result {
            warn!("Display cache refresh failed: {}", e);
        }
    }
}
