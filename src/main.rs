// Entry point and interactive menu for the ticket ledger.
//
// - Option [1] imports a CSV file and prints the per-row diagnostics.
// - Options [2] and [3] list tickets and print yearly statistics.
// - Every change is saved straight away to the configured tickets file.
use env_logger::Env;
use log::error;
use rail_ledger::config::{AppConfig, DEFAULT_CONFIG_FILE};
use rail_ledger::linker::{self, SortOrder, TicketFilter};
use rail_ledger::mileage::{MileageLog, ALL_YEARS};
use rail_ledger::output;
use rail_ledger::reports::{self, CountRow, TicketStatistics};
use rail_ledger::store::{JsonDisplayCache, JsonFileStore};
use rail_ledger::types::TicketRow;
use rail_ledger::util::{format_int, format_money};
use rail_ledger::{DeleteMode, TicketLedger};
use serde::Serialize;
use std::io::{self, BufRead, Write};

type Ledger = TicketLedger<JsonFileStore, JsonDisplayCache>;

const PREVIEW_ROWS: usize = 25;

/// Written next to the tickets after every statistics run.
#[derive(Serialize)]
struct StatisticsSummary<'a> {
    year: &'a str,
    statistics: &'a TicketStatistics,
    cost_per_mile: Option<f64>,
    by_toc: &'a [CountRow],
    by_type: &'a [CountRow],
}

/// Read a single line of input after printing the common "Enter choice:" prompt.
fn read_choice() -> String {
    prompt("Enter choice: ")
}

/// Closed or unreadable input ends the program instead of looping forever.
fn prompt(label: &str) -> String {
    print!("{}", label);
    let _ = io::stdout().flush();
    match read_trimmed_line(&mut io::stdin().lock()) {
        Some(line) => line,
        None => {
            println!("\nExiting the program.");
            std::process::exit(0);
        }
    }
}

/// `None` at end of input or on a read error.
fn read_trimmed_line<R: BufRead>(input: &mut R) -> Option<String> {
    let mut buf = String::new();
    match input.read_line(&mut buf) {
        Ok(0) | Err(_) => None,
        Ok(_) => Some(buf.trim().to_string()),
    }
}

/// Y/N question; an empty answer takes `default`.
fn confirm(question: &str, default: bool) -> bool {
    loop {
        let hint = if default { "(Y/n)" } else { "(y/N)" };
        match prompt(&format!("{} {}: ", question, hint)).to_uppercase().as_str() {
            "" => return default,
            "Y" => return true,
            "N" => return false,
            _ => println!("Invalid choice. Please enter Y or N."),
        }
    }
}

fn optional(label: &str) -> Option<String> {
    let value = prompt(label);
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}

fn print_errors(errors: &[String]) {
    for e in errors {
        println!("  {}", e);
    }
}

fn ticket_rows(tickets: &[rail_ledger::TicketRecord]) -> Vec<TicketRow> {
    tickets
        .iter()
        .enumerate()
        .map(|(i, t)| TicketRow::new(i + 1, t))
        .collect()
}

/// Option [1]: import a CSV file and append its tickets.
fn handle_import(ledger: &mut Ledger) {
    let path = prompt("CSV file to import: ");
    if path.is_empty() {
        println!("No file given.\n");
        return;
    }
    match ledger.import_file(&path) {
        Ok(report) => {
            println!(
                "Imported {} tickets ({} rows rejected).",
                format_int(report.imported),
                format_int(report.errors.len())
            );
            print_errors(&report.errors);
            println!();
        }
        Err(e) => eprintln!("Import failed: {}\n", e),
    }
}

/// Option [2]: filtered, sorted listing.
fn handle_list(ledger: &Ledger) {
    let years = ledger.available_years();
    if !years.is_empty() {
        println!("Years: {}", years.join(", "));
    }
    let tocs = linker::unique_tocs(ledger.tickets());
    if !tocs.is_empty() {
        println!("Operators: {}", tocs.join(", "));
    }
    let filter = TicketFilter {
        year: optional("Year (blank for all): "),
        toc: optional("Operator (blank for all): "),
        search: optional("Search (blank for none): "),
        ..TicketFilter::default()
    };

    for (i, order) in SortOrder::ALL.iter().enumerate() {
        println!("[{}] {}", i + 1, order.label());
    }
    let order = read_choice()
        .parse::<usize>()
        .ok()
        .and_then(|n| n.checked_sub(1))
        .and_then(|n| SortOrder::ALL.get(n).copied())
        .unwrap_or_default();

    let tickets = ledger.view(&filter, order);
    println!();
    output::preview_table(
        &format!("Tickets ({})", format_int(tickets.len())),
        &ticket_rows(&tickets),
        PREVIEW_ROWS,
    );
}

/// Option [3]: statistics for one year or all years, plus a JSON summary.
fn handle_statistics(ledger: &Ledger, mileage: &MileageLog, config: &AppConfig) {
    let years = ledger.available_years();
    if !years.is_empty() {
        println!("Years: {}", years.join(", "));
    }
    let year = prompt("Year (blank for all): ");
    let view = ledger.statistics(Some(year.as_str()));
    let label = if year.is_empty() { ALL_YEARS } else { year.as_str() };

    println!();
    if let Some(latest) = linker::newest_ticket(ledger.tickets()) {
        println!(
            "Latest journey: {} → {} on {}\n",
            latest.origin, latest.destination, latest.outbound_date
        );
    }
    output::preview_table(
        &format!("Statistics ({})", label),
        &reports::statistic_rows(&view.totals),
        PREVIEW_ROWS,
    );
    let cost_per_mile = mileage.cost_per_mile(&year, view.totals.adjusted_total);
    match cost_per_mile {
        Some(cost) => println!("Cost per mile: {}\n", format_money(cost)),
        None => println!("Cost per mile: record mileage for {} first (option 7)\n", label),
    }
    output::preview_table("Tickets by Operator", &view.by_toc, PREVIEW_ROWS);
    output::preview_table("Tickets by Type", &view.by_type, PREVIEW_ROWS);

    let summary = StatisticsSummary {
        year: label,
        statistics: &view.totals,
        cost_per_mile,
        by_toc: &view.by_toc,
        by_type: &view.by_type,
    };
    let path = config.statistics_path();
    match output::write_json(&path, &summary) {
        Ok(()) => println!("(Summary saved to {})\n", path.display()),
        Err(e) => eprintln!("Write error: {}\n", e),
    }
}

/// Option [4]: export everything to the configured CSV file.
fn handle_export(ledger: &Ledger, config: &AppConfig) {
    let path = config.export_path();
    match ledger.export_to(&path) {
        Ok(()) => println!(
            "Exported {} tickets to {}\n",
            format_int(ledger.tickets().len()),
            path.display()
        ),
        Err(e) => eprintln!("Export failed: {}\n", e),
    }
}

/// Option [5]: split legacy inline returns into linked pairs.
fn handle_migrate(ledger: &mut Ledger) {
    let before = ledger.tickets().len();
    match ledger.migrate() {
        Ok(errors) => {
            let added = ledger.tickets().len().saturating_sub(before);
            println!("Migration complete: {} return legs created.", format_int(added));
            print_errors(&errors);
            println!();
        }
        Err(e) => eprintln!("Migration failed: {}\n", e),
    }
}

/// Option [6]: delete a ticket, by default together with its sibling leg.
fn handle_delete(ledger: &mut Ledger) {
    let rows = ticket_rows(ledger.tickets());
    output::preview_table("Tickets", &rows, rows.len());
    let Some(ticket) = read_choice()
        .parse::<usize>()
        .ok()
        .and_then(|n| n.checked_sub(1))
        .and_then(|n| ledger.tickets().get(n))
    else {
        println!("Invalid choice.\n");
        return;
    };
    let id = ticket.id;
    let mode = match linker::sibling_of(ledger.tickets(), ticket) {
        Some(sibling) => {
            let question = format!(
                "Also delete the linked leg {} → {} on {}?",
                sibling.origin, sibling.destination, sibling.outbound_date
            );
            if confirm(&question, true) {
                DeleteMode::Cascade
            } else {
                DeleteMode::TargetOnly
            }
        }
        None => DeleteMode::Cascade,
    };
    match ledger.delete(id, mode) {
        Ok(removed) => println!("Deleted {} tickets.\n", format_int(removed.len())),
        Err(e) => eprintln!("Delete failed: {}\n", e),
    }
}

/// Option [7]: miles and chains travelled in a year.
fn handle_mileage(mileage: &mut MileageLog) {
    let year = prompt("Year (blank for all years): ");
    let miles = prompt("Miles: ");
    let chains = prompt("Chains (0-79): ");
    match mileage.record(&year, &miles, &chains) {
        Ok(()) => println!("Mileage saved to {}\n", mileage.path().display()),
        Err(e) => eprintln!("Write error: {}\n", e),
    }
}

fn main() {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_CONFIG_FILE.to_string());
    let config = match AppConfig::load(&config_path) {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to read {}: {}", config_path, e);
            std::process::exit(1);
        }
    };

    let store = JsonFileStore::new(config.tickets_path()).pretty(config.pretty_json);
    let mut ledger = TicketLedger::open(store, JsonDisplayCache::new(config.widget_path()));
    let mut mileage = MileageLog::open(config.mileage_path());

    loop {
        println!("Rail Ledger ({} tickets)", format_int(ledger.tickets().len()));
        println!("[1] Import CSV");
        println!("[2] List tickets");
        println!("[3] Statistics");
        println!("[4] Export CSV");
        println!("[5] Migrate legacy tickets");
        println!("[6] Delete ticket");
        println!("[7] Record mileage");
        println!("[8] Exit\n");
        match read_choice().as_str() {
            "1" => handle_import(&mut ledger),
            "2" => handle_list(&ledger),
            "3" => handle_statistics(&ledger, &mileage, &config),
            "4" => handle_export(&ledger, &config),
            "5" => handle_migrate(&mut ledger),
            "6" => handle_delete(&mut ledger),
            "7" => handle_mileage(&mut mileage),
            "8" => {
                println!("Exiting the program.");
                break;
            }
            _ => println!("Invalid choice. Please enter 1 to 8.\n"),
        }
    }
}
