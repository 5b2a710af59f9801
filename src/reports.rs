use crate::types::TicketRecord;
use crate::util::{format_int, format_money, parse_f64_safe, parse_i64_safe, parse_price};
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};
use tabled::Tabled;

pub const CHAINS_PER_MILE: f64 = 80.0;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TicketStatistics {
    pub total_tickets: usize,
    pub total_spent: f64,
    pub total_compensation: f64,
    pub adjusted_total: f64,
    pub total_virgin_points: i64,
    pub total_lner_perks: f64,
    pub total_club_avanti_journeys: i64,
}

#[derive(Debug, Clone, Serialize, Tabled)]
pub struct CountRow {
    #[serde(rename = "Label")]
    #[tabled(rename = "Label")]
    pub label: String,
    #[serde(rename = "Count")]
    #[tabled(rename = "Count")]
    pub count: usize,
}

#[derive(Debug, Clone, Tabled)]
pub struct StatisticRow {
    #[tabled(rename = "Statistic")]
    pub label: String,
    #[tabled(rename = "Value")]
    pub value: String,
}

/// Tickets whose outbound date ends in `year` (the part after the last `/`).
/// `None` or an empty year keeps everything.
pub fn filter_by_year<'a>(tickets: &'a [TicketRecord], year: Option<&str>) -> Vec<&'a TicketRecord> {
    match year.filter(|y| !y.is_empty()) {
        None => tickets.iter().collect(),
        Some(year) => tickets
            .iter()
            .filter(|t| t.outbound_date.rsplit('/').next() == Some(year))
            .collect(),
    }
}

/// Sorted distinct years of all `dd/MM/yyyy` outbound dates.
pub fn available_years(tickets: &[TicketRecord]) -> Vec<String> {
    tickets
        .iter()
        .filter_map(|t| t.year().map(str::to_string))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Fares of outbound and single legs; return legs are zero-priced.
pub fn total_spent(tickets: &[&TicketRecord]) -> f64 {
    tickets
        .iter()
        .filter(|t| !t.is_return)
        .map(|t| parse_price(&t.price))
        .sum()
}

pub fn total_compensation(tickets: &[&TicketRecord]) -> f64 {
    tickets
        .iter()
        .map(|t| parse_price(t.compensation.as_deref().unwrap_or("")))
        .sum()
}

pub fn generate_statistics(tickets: &[&TicketRecord]) -> TicketStatistics {
    let total_spent = total_spent(tickets);
    let total_compensation = total_compensation(tickets);
    let loyalty = || tickets.iter().filter_map(|t| t.loyalty_program.as_ref());

    TicketStatistics {
        total_tickets: tickets.len(),
        total_spent,
        total_compensation,
        adjusted_total: total_spent - total_compensation,
        total_virgin_points: loyalty()
            .filter_map(|l| parse_i64_safe(l.virgin_points.as_deref()))
            .fold(0, i64::saturating_add),
        total_lner_perks: loyalty()
            .filter_map(|l| parse_f64_safe(l.lner_cash_value.as_deref()))
            .sum(),
        total_club_avanti_journeys: loyalty()
            .filter_map(|l| parse_i64_safe(l.club_avanti_journeys.as_deref()))
            .fold(0, i64::saturating_add),
    }
}

fn count_by<F>(tickets: &[&TicketRecord], key: F) -> Vec<CountRow>
where
    F: Fn(&TicketRecord) -> String,
{
    let mut map: HashMap<String, usize> = HashMap::new();
    for t in tickets {
        *map.entry(key(t)).or_default() += 1;
    }
    let mut rows: Vec<CountRow> = map
        .into_iter()
        .map(|(label, count)| CountRow { label, count })
        .collect();
    rows.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.label.cmp(&b.label)));
    rows
}

/// Ticket count per operator, absent operator counted as `Unknown`.
pub fn tickets_by_toc(tickets: &[&TicketRecord]) -> Vec<CountRow> {
    count_by(tickets, |t| t.toc.clone().unwrap_or_else(|| "Unknown".to_string()))
}

pub fn tickets_by_type(tickets: &[&TicketRecord]) -> Vec<CountRow> {
    count_by(tickets, |t| t.ticket_type.clone())
}

/// Spend per rail mile, where distance is `miles + chains / 80`. `None`
/// unless both inputs are numbers, chains are under a mile and the distance
/// is positive.
pub fn cost_per_mile(miles: &str, chains: &str, adjusted_total: f64) -> Option<f64> {
    let miles = parse_f64_safe(Some(miles.trim()))?;
    let chains = parse_f64_safe(Some(chains.trim()))?;
    if chains >= CHAINS_PER_MILE {
        return None;
    }
    let distance = miles + chains / CHAINS_PER_MILE;
    if distance > 0.0 {
        Some(adjusted_total / distance)
    } else {
        None
    }
}

pub fn statistic_rows(stats: &TicketStatistics) -> Vec<StatisticRow> {
    let row = |label: &str, value: String| StatisticRow {
        label: label.to_string(),
        value,
    };
    vec![
        row("Total Tickets", format_int(stats.total_tickets)),
        row("Total Spent", format_money(stats.total_spent)),
        row("Compensation Received", format_money(stats.total_compensation)),
        row("Adjusted Total (Spent - Compensation)", format_money(stats.adjusted_total)),
        row("Virgin Points Earned", format_int(stats.total_virgin_points)),
        row("LNER Perks", format_money(stats.total_lner_perks)),
        row("Club Avanti Journeys", format_int(stats.total_club_avanti_journeys)),
    ]
}
