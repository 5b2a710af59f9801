//! CSV ticket import.
//!
//! Columns are matched by header name, never by position, and any column
//! the document lacks reads as an empty cell:
//!
//! `Origin, Destination, Price, TicketType, ClassType, TOC, OutboundDate,
//! OutboundTime, ReturnDate, ReturnTime, WasDelayed, DelayDuration,
//! PendingCompensation, Compensation, VirginPoints, LNERperks,
//! ClubAvantiJourneys, Railcard, Coach, Seat, TOC/Route-Restriction`
//!
//! Documents written by the exporter also carry `ReturnGroupID` and
//! `IsReturn`; when a row names a valid group it is imported as that leg of
//! the group instead of being split again.
use crate::types::{LoyaltyProgram, TicketFormat, TicketRecord};
use crate::util::{non_empty, normalize_price, numeric_or_none, parse_yes};
use csv::{ReaderBuilder, StringRecord};
use log::{debug, info, warn};
use std::collections::HashMap;
use std::io::Read;
use std::path::Path;
use uuid::Uuid;

/// Tickets produced by one import plus the human-readable problems found.
#[derive(Debug, Clone, Default)]
pub struct ParseOutcome {
    pub tickets: Vec<TicketRecord>,
    pub errors: Vec<String>,
}

/// Header name to column index, built once per document.
#[derive(Debug, Clone)]
pub struct HeaderMap {
    index: HashMap<String, usize>,
}

impl HeaderMap {
    pub fn new(headers: &StringRecord) -> Self {
        let mut index = HashMap::new();
        for (i, name) in headers.iter().enumerate() {
            // First occurrence wins if a header is repeated.
            index.entry(name.trim().to_string()).or_insert(i);
        }
        Self { index }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn row<'a>(&'a self, record: &'a StringRecord) -> Row<'a> {
        Row {
            headers: self,
            record,
        }
    }
}

/// Typed view of one data row.
pub struct Row<'a> {
    headers: &'a HeaderMap,
    record: &'a StringRecord,
}

impl<'a> Row<'a> {
    pub fn get(&self, name: &str) -> &'a str {
        self.headers
            .index
            .get(name)
            .and_then(|&i| self.record.get(i))
            .unwrap_or("")
    }

    fn text(&self, name: &str) -> Option<String> {
        non_empty(self.get(name))
    }

    fn number(&self, name: &str) -> Option<String> {
        numeric_or_none(self.get(name))
    }

    fn flag(&self, name: &str) -> bool {
        parse_yes(self.get(name))
    }

    fn has_required_fields(&self) -> bool {
        ![
            "Origin",
            "Destination",
            "OutboundDate",
            "OutboundTime",
            "TicketType",
            "ClassType",
        ]
        .iter()
        .any(|name| self.get(name).is_empty())
    }

    fn group(&self) -> Option<(Uuid, bool)> {
        let group = Uuid::parse_str(self.get("ReturnGroupID").trim()).ok()?;
        Some((group, self.flag("IsReturn")))
    }

    fn to_ticket(&self) -> TicketRecord {
        let ticket_type = self.get("TicketType").to_string();
        TicketRecord {
            id: Uuid::new_v4(),
            origin: self.get("Origin").to_string(),
            destination: self.get("Destination").to_string(),
            price: normalize_price(self.get("Price")),
            ticket_format: TicketFormat::classify(&ticket_type),
            ticket_type,
            class_type: self.get("ClassType").to_string(),
            toc: self.text("TOC"),
            outbound_date: self.get("OutboundDate").to_string(),
            outbound_time: self.get("OutboundTime").to_string(),
            return_date: None,
            return_time: None,
            was_delayed: self.flag("WasDelayed"),
            delay_duration: self.text("DelayDuration"),
            pending_compensation: self.flag("PendingCompensation"),
            compensation: self.text("Compensation"),
            loyalty_program: LoyaltyProgram::from_values(
                self.number("VirginPoints"),
                self.number("LNERperks"),
                self.number("ClubAvantiJourneys"),
            ),
            railcard: self.text("Railcard"),
            coach: self.text("Coach"),
            seat: self.text("Seat"),
            toc_route_restriction: self.text("TOC/Route-Restriction"),
            return_group_id: None,
            is_return: false,
        }
    }
}

/// Parse a whole CSV document. Rows missing a required field are reported
/// as `Row {n}` (the first data row is row 2) and skipped; a document that
/// cannot be read at all yields no tickets and a single error.
pub fn parse_tickets<R: Read>(input: R) -> ParseOutcome {
    match try_parse(input) {
        Ok(outcome) => {
            info!(
                "Parsed {} tickets with {} row errors",
                outcome.tickets.len(),
                outcome.errors.len()
            );
            outcome
        }
        Err(e) => {
            warn!("Error parsing CSV: {}", e);
            ParseOutcome {
                tickets: Vec::new(),
                errors: vec![format!("Error parsing CSV: {}", e)],
            }
        }
    }
}

pub fn parse_str(document: &str) -> ParseOutcome {
    parse_tickets(document.as_bytes())
}

pub fn load_csv(path: impl AsRef<Path>) -> ParseOutcome {
    let path = path.as_ref();
    match std::fs::File::open(path) {
        Ok(file) => parse_tickets(file),
        Err(e) => {
            warn!("Failed to open {}: {}", path.display(), e);
            ParseOutcome {
                tickets: Vec::new(),
                errors: vec![format!("Error parsing CSV: {}", e)],
            }
        }
    }
}

fn try_parse<R: Read>(input: R) -> Result<ParseOutcome, csv::Error> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(input);
    let headers = HeaderMap::new(rdr.headers()?);
    let grouped_layout = headers.contains("ReturnGroupID");

    let mut outcome = ParseOutcome::default();
    for (i, result) in rdr.records().enumerate() {
        let record = result?;
        let row_number = i + 2;
        let row = headers.row(&record);

        if !row.has_required_fields() {
            debug!("Row {} skipped: missing required fields", row_number);
            outcome
                .errors
                .push(format!("Row {}: Missing required fields.", row_number));
            continue;
        }

        let mut ticket = row.to_ticket();

        if let Some((group, is_return)) = grouped_layout.then(|| row.group()).flatten() {
            ticket.return_group_id = Some(group);
            ticket.is_return = is_return;
            outcome.tickets.push(ticket);
            continue;
        }

        let return_date = row.get("ReturnDate");
        let return_time = row.get("ReturnTime");
        if !return_date.is_empty() && !return_time.is_empty() {
            let (outbound, return_leg) =
                ticket.split_return(return_date.to_string(), return_time.to_string());
            outcome.tickets.push(outbound);
            outcome.tickets.push(return_leg);
        } else {
            outcome.tickets.push(ticket);
        }
    }
    let unlinked = unlink_broken_groups(&mut outcome.tickets);
    if unlinked > 0 {
        warn!("{} rows named an incomplete return group and were imported as singles", unlinked);
    }
    Ok(outcome)
}

/// A group read from a document must hold exactly one outbound and one return
/// leg. Members of any other group become standalone tickets.
fn unlink_broken_groups(tickets: &mut [TicketRecord]) -> usize {
    let mut legs: HashMap<Uuid, (usize, usize)> = HashMap::new();
    for t in tickets.iter() {
        if let Some(group) = t.return_group_id {
            let entry = legs.entry(group).or_default();
            if t.is_return {
                entry.1 += 1;
            } else {
                entry.0 += 1;
            }
        }
    }
    let mut unlinked = 0;
    for t in tickets.iter_mut() {
        let broken = t
            .return_group_id
            .and_then(|g| legs.get(&g))
            .is_some_and(|&counts| counts != (1, 1));
        if broken {
            t.return_group_id = None;
            t.is_return = false;
            unlinked += 1;
        }
    }
    unlinked
}
