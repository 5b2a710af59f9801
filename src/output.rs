use crate::error::Result;
use crate::types::TicketRecord;
use crate::util::yes_no;
use serde::Serialize;
use std::io::Write;
use std::path::Path;
use tabled::{settings::Style, Table, Tabled};

/// One exported CSV line. Field order is the column order.
#[derive(Debug, Serialize)]
pub struct ExportRow<'a> {
    #[serde(rename = "Origin")]
    pub origin: &'a str,
    #[serde(rename = "Destination")]
    pub destination: &'a str,
    #[serde(rename = "Price")]
    pub price: &'a str,
    #[serde(rename = "TicketType")]
    pub ticket_type: &'a str,
    #[serde(rename = "ClassType")]
    pub class_type: &'a str,
    #[serde(rename = "TOC")]
    pub toc: &'a str,
    #[serde(rename = "OutboundDate")]
    pub outbound_date: &'a str,
    #[serde(rename = "OutboundTime")]
    pub outbound_time: &'a str,
    #[serde(rename = "WasDelayed")]
    pub was_delayed: &'static str,
    #[serde(rename = "DelayDuration")]
    pub delay_duration: &'a str,
    #[serde(rename = "PendingCompensation")]
    pub pending_compensation: &'static str,
    #[serde(rename = "Compensation")]
    pub compensation: &'a str,
    #[serde(rename = "VirginPoints")]
    pub virgin_points: &'a str,
    #[serde(rename = "LNERperks")]
    pub lner_perks: &'a str,
    #[serde(rename = "ClubAvantiJourneys")]
    pub club_avanti_journeys: &'a str,
    #[serde(rename = "Railcard")]
    pub railcard: &'a str,
    #[serde(rename = "Coach")]
    pub coach: &'a str,
    #[serde(rename = "Seat")]
    pub seat: &'a str,
    #[serde(rename = "TOC/Route-Restriction")]
    pub toc_route_restriction: &'a str,
    #[serde(rename = "ReturnGroupID")]
    pub return_group_id: String,
    #[serde(rename = "IsReturn")]
    pub is_return: &'static str,
    #[serde(rename = "TicketFormat")]
    pub ticket_format: &'static str,
}

impl<'a> From<&'a TicketRecord> for ExportRow<'a> {
    fn from(t: &'a TicketRecord) -> Self {
        let loyalty = t.loyalty_program.as_ref();
        Self {
            origin: &t.origin,
            destination: &t.destination,
            price: &t.price,
            ticket_type: &t.ticket_type,
            class_type: &t.class_type,
            toc: t.toc.as_deref().unwrap_or(""),
            outbound_date: &t.outbound_date,
            outbound_time: &t.outbound_time,
            was_delayed: yes_no(t.was_delayed),
            delay_duration: t.delay_duration.as_deref().unwrap_or(""),
            pending_compensation: yes_no(t.pending_compensation),
            compensation: t.compensation.as_deref().unwrap_or(""),
            virgin_points: loyalty.and_then(|l| l.virgin_points.as_deref()).unwrap_or(""),
            lner_perks: loyalty.and_then(|l| l.lner_cash_value.as_deref()).unwrap_or(""),
            club_avanti_journeys: loyalty
                .and_then(|l| l.club_avanti_journeys.as_deref())
                .unwrap_or(""),
            railcard: t.railcard.as_deref().unwrap_or(""),
            coach: t.coach.as_deref().unwrap_or(""),
            seat: t.seat.as_deref().unwrap_or(""),
            toc_route_restriction: t.toc_route_restriction.as_deref().unwrap_or(""),
            return_group_id: t
                .return_group_id
                .map(|g| g.hyphenated().to_string().to_uppercase())
                .unwrap_or_default(),
            is_return: yes_no(t.is_return),
            ticket_format: t.ticket_format.as_str(),
        }
    }
}

/// Serialize tickets as CSV with a header line, quoting where needed.
pub fn export_csv<W: Write>(tickets: &[TicketRecord], writer: W) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    for t in tickets {
        wtr.serialize(ExportRow::from(t))?;
    }
    if tickets.is_empty() {
        // `serialize` writes the header lazily, so an empty export needs it by hand.
        wtr.write_record(EXPORT_COLUMNS)?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn export_csv_string(tickets: &[TicketRecord]) -> Result<String> {
    let mut buf = Vec::new();
    export_csv(tickets, &mut buf)?;
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

pub const EXPORT_COLUMNS: [&str; 22] = [
    "Origin",
    "Destination",
    "Price",
    "TicketType",
    "ClassType",
    "TOC",
    "OutboundDate",
    "OutboundTime",
    "WasDelayed",
    "DelayDuration",
    "PendingCompensation",
    "Compensation",
    "VirginPoints",
    "LNERperks",
    "ClubAvantiJourneys",
    "Railcard",
    "Coach",
    "Seat",
    "TOC/Route-Restriction",
    "ReturnGroupID",
    "IsReturn",
    "TicketFormat",
];

pub fn write_csv_file(path: &Path, tickets: &[TicketRecord]) -> Result<()> {
    let mut buf = Vec::new();
    export_csv(tickets, &mut buf)?;
    crate::store::write_atomically(path, &buf)
}

pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let s = serde_json::to_string_pretty(value)?;
    std::fs::write(path, s)?;
    Ok(())
}

pub fn preview_table<T>(title: &str, rows: &[T], max_rows: usize)
where
    T: Tabled + Clone,
{
    println!("{}", title);
    println!();
    let slice: Vec<T> = rows.iter().take(max_rows).cloned().collect();
    if slice.is_empty() {
        println!("(no rows)\n");
        return;
    }
    let table_str = Table::new(slice).with(Style::markdown()).to_string();
    println!("{}\n", table_str);
    if rows.len() > max_rows {
        println!("({} more rows not shown)\n", rows.len() - max_rows);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::parse_str;
    use crate::types::LoyaltyProgram;

    #[test]
    fn header_matches_fixed_column_order() {
        let csv = export_csv_string(&[TicketRecord::default()]).unwrap();
        let header = csv.lines().next().unwrap();
        assert_eq!(header, EXPORT_COLUMNS.join(","));
    }

    #[test]
    fn empty_export_still_has_header() {
        let csv = export_csv_string(&[]).unwrap();
        assert_eq!(csv.trim_end(), EXPORT_COLUMNS.join(","));
    }

    #[test]
    fn values_render_as_expected() {
        let (out, ret) = TicketRecord {
            origin: "Leeds".into(),
            destination: "York".into(),
            price: "£5.00".into(),
            ticket_type: "Off-Peak Return".into(),
            outbound_date: "01/01/2025".into(),
            outbound_time: "08:00".into(),
            was_delayed: true,
            compensation: Some("£1.25".into()),
            ..TicketRecord::default()
        }
        .split_return("01/01/2025".into(), "18:00".into());
        let csv = export_csv_string(&[out.clone(), ret]).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        let group = out.return_group_id.unwrap().to_string().to_uppercase();
        assert_eq!(
            lines[1],
            format!(
                "Leeds,York,£5.00,Off-Peak Return,Standard,,01/01/2025,08:00,Yes,,No,£1.25,,,,,,,,{},No,Tickets",
                group
            )
        );
        assert!(lines[2].ends_with(&format!("{},Yes,Tickets", group)));
    }

    #[test]
    fn commas_are_quoted() {
        let ticket = TicketRecord {
            origin: "Leeds, West Yorkshire".into(),
            ..TicketRecord::default()
        };
        let csv = export_csv_string(&[ticket]).unwrap();
        assert!(csv.lines().nth(1).unwrap().starts_with("\"Leeds, West Yorkshire\","));
    }

    #[test]
    fn standalone_tickets_round_trip_through_parser() {
        let tickets = vec![
            TicketRecord {
                origin: "Leeds".into(),
                destination: "Manchester Piccadilly (MAN)".into(),
                price: "£12.85".into(),
                ticket_type: "Anytime Day Travelcard".into(),
                class_type: "First".into(),
                toc: Some("TransPennine Express".into()),
                outbound_date: "17/06/2025".into(),
                outbound_time: "15:40".into(),
                was_delayed: true,
                delay_duration: Some("30-59 minutes".into()),
                pending_compensation: true,
                compensation: Some("£6.43".into()),
                loyalty_program: LoyaltyProgram::from_values(Some("40".into()), None, Some("1".into())),
                railcard: Some("Two Together".into()),
                coach: Some("A".into()),
                seat: Some("14".into()),
                toc_route_restriction: Some("TPE only, not via Huddersfield".into()),
                ticket_format: crate::types::TicketFormat::Travelcards,
                ..TicketRecord::default()
            },
            TicketRecord {
                origin: "York".into(),
                destination: "Hull".into(),
                price: "£9.00".into(),
                ticket_type: "Anytime Single".into(),
                outbound_date: "18/06/2025".into(),
                outbound_time: "07:02".into(),
                ..TicketRecord::default()
            },
        ];
        let csv = export_csv_string(&tickets).unwrap();
        let outcome = parse_str(&csv);
        assert!(outcome.errors.is_empty());
        assert_eq!(outcome.tickets.len(), tickets.len());
        for (original, parsed) in tickets.iter().zip(&outcome.tickets) {
            let parsed = TicketRecord {
                id: original.id,
                ..parsed.clone()
            };
            assert_eq!(&parsed, original);
        }
    }
}
