//! Personal rail-ticket ledger: CSV import and export, linked return legs,
//! legacy migration, filtering and yearly statistics.
pub mod config;
pub mod error;
pub mod ledger;
pub mod linker;
pub mod loader;
pub mod migration;
pub mod mileage;
pub mod output;
pub mod reports;
pub mod store;
pub mod types;
pub mod util;

pub use error::{LedgerError, Result};
pub use ledger::{DeleteMode, ImportReport, TicketLedger};
pub use types::{TicketFormat, TicketRecord};
