use crate::error::Result;
use crate::linker::{self, DisplayGroup, SortOrder, TicketFilter};
use crate::loader::{self, ParseOutcome};
use crate::migration;
use crate::output;
use crate::reports::{self, CountRow, TicketStatistics};
use crate::store::{DisplayCache, DisplaySnapshot, TicketStore};
use crate::types::TicketRecord;
use chrono::{Datelike, Local};
use log::{info, warn};
use std::io::{Read, Write};
use std::path::Path;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DeleteMode {
    /// Remove only the chosen leg.
    TargetOnly,
    /// Remove the chosen leg and the rest of its return group.
    #[default]
    Cascade,
}

#[derive(Debug, Clone, Default)]
pub struct ImportReport {
    pub imported: usize,
    pub errors: Vec<String>,
}

/// Statistics for one year (or all years) of the ledger.
#[derive(Debug, Clone, Default)]
pub struct StatisticsView {
    pub year: Option<String>,
    pub totals: TicketStatistics,
    pub by_toc: Vec<CountRow>,
    pub by_type: Vec<CountRow>,
}

/// The single owner of the ticket collection. Every mutation is followed by
/// a full save and, once the save succeeded, a display-cache refresh.
pub struct TicketLedger<S: TicketStore, D: DisplayCache> {
    tickets: Vec<TicketRecord>,
    store: S,
    display: D,
}

impl<S: TicketStore, D: DisplayCache> TicketLedger<S, D> {
    pub fn open(store: S, display: D) -> Self {
        let tickets = store.load();
        info!("Loaded {} tickets", tickets.len());
        Self {
            tickets,
            store,
            display,
        }
    }

    pub fn tickets(&self) -> &[TicketRecord] {
        &self.tickets
    }

    pub fn get(&self, id: Uuid) -> Option<&TicketRecord> {
        self.tickets.iter().find(|t| t.id == id)
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Parse a CSV document and append every ticket it yields.
    pub fn import_csv<R: Read>(&mut self, input: R) -> Result<ImportReport> {
        self.append(loader::parse_tickets(input))
    }

    pub fn import_file(&mut self, path: impl AsRef<Path>) -> Result<ImportReport> {
        self.append(loader::load_csv(path))
    }

    fn append(&mut self, parsed: ParseOutcome) -> Result<ImportReport> {
        let ParseOutcome { mut tickets, errors } = parsed;
        let report = ImportReport {
            imported: tickets.len(),
            errors,
        };
        if !tickets.is_empty() {
            let relinked = linker::relink_groups(&self.tickets, &mut tickets);
            if relinked > 0 {
                info!("Gave {} imported return groups a new id", relinked);
            }
            let mut next = self.tickets.clone();
            next.extend(tickets);
            self.commit(next)?;
        }
        info!(
            "Imported {} tickets ({} errors)",
            report.imported,
            report.errors.len()
        );
        Ok(report)
    }

    /// Normalise legacy inline returns into linked pairs.
    pub fn migrate(&mut self) -> Result<Vec<String>> {
        let outcome = migration::migrate(self.tickets.clone());
        self.commit(outcome.tickets)?;
        Ok(outcome.errors)
    }

    pub fn add(&mut self, ticket: TicketRecord) -> Result<()> {
        let mut next = self.tickets.clone();
        next.push(ticket);
        self.commit(next)
    }

    /// Returns `false` without saving when no record matches.
    pub fn update(&mut self, edited: &TicketRecord) -> Result<bool> {
        let mut next = self.tickets.clone();
        if !linker::apply_update(&mut next, edited) {
            return Ok(false);
        }
        self.commit(next)?;
        Ok(true)
    }

    pub fn delete(&mut self, id: Uuid, mode: DeleteMode) -> Result<Vec<TicketRecord>> {
        let mut next = self.tickets.clone();
        let removed = match mode {
            DeleteMode::TargetOnly => linker::delete_ticket(&mut next, id),
            DeleteMode::Cascade => linker::delete_journey(&mut next, id),
        };
        if !removed.is_empty() {
            self.commit(next)?;
        }
        Ok(removed)
    }

    pub fn clear_all(&mut self) -> Result<()> {
        self.commit(Vec::new())
    }

    pub fn export_csv<W: Write>(&self, writer: W) -> Result<()> {
        output::export_csv(&self.tickets, writer)
    }

    pub fn export_to(&self, path: &Path) -> Result<()> {
        output::write_csv_file(path, &self.tickets)?;
        info!("Exported {} tickets to {}", self.tickets.len(), path.display());
        Ok(())
    }

    /// Filtered (groups kept whole) then sorted copy of the collection.
    pub fn view(&self, filter: &TicketFilter, order: SortOrder) -> Vec<TicketRecord> {
        let mut tickets = linker::filter_grouped(&self.tickets, filter);
        linker::sort_tickets(&mut tickets, order);
        tickets
    }

    pub fn display_groups(&self) -> Vec<DisplayGroup<'_>> {
        linker::display_groups(&self.tickets)
    }

    pub fn available_years(&self) -> Vec<String> {
        reports::available_years(&self.tickets)
    }

    pub fn statistics(&self, year: Option<&str>) -> StatisticsView {
        let selected = reports::filter_by_year(&self.tickets, year);
        StatisticsView {
            year: year.filter(|y| !y.is_empty()).map(str::to_string),
            totals: reports::generate_statistics(&selected),
            by_toc: reports::tickets_by_toc(&selected),
            by_type: reports::tickets_by_type(&selected),
        }
    }

    pub fn snapshot(&self) -> DisplaySnapshot {
        let all: Vec<&TicketRecord> = self.tickets.iter().collect();
        let this_year = Local::now().year().to_string();
        let types = reports::filter_by_year(&self.tickets, Some(this_year.as_str()))
            .into_iter()
            .map(|t| t.ticket_type.clone())
            .collect();
        DisplaySnapshot::new(
            reports::total_spent(&all),
            reports::total_compensation(&all),
            &reports::tickets_by_toc(&all),
            types,
        )
    }

    // In-memory state only changes after the store accepted the new state.
    fn commit(&mut self, next: Vec<TicketRecord>) -> Result<()> {
        if let Err(e) = self.store.save(&next) {
            warn!("Error saving tickets: {}", e);
            return Err(e);
        }
        self.tickets = next;
        let snapshot = self.snapshot();
        self.display.refresh(&snapshot);
        Ok(())
    }
}
