use crate::types::{TicketFormat, TicketRecord};
use log::{info, warn};

#[derive(Debug, Clone, Default)]
pub struct MigrationOutcome {
    pub tickets: Vec<TicketRecord>,
    pub errors: Vec<String>,
    pub split: usize,
}

/// Rewrite legacy records that hold both legs inline into linked
/// outbound/return pairs.
///
/// Grouped records pass through untouched, so a second run changes nothing.
/// Ungrouped records without inline return data only get their format
/// recomputed. Invalid legacy returns are reported as `Ticket #{n}` (1-based)
/// and dropped.
pub fn migrate(tickets: Vec<TicketRecord>) -> MigrationOutcome {
    let mut outcome = MigrationOutcome::default();

    for (i, ticket) in tickets.into_iter().enumerate() {
        if ticket.is_grouped() {
            outcome.tickets.push(ticket);
            continue;
        }

        let inline = ticket
            .inline_return()
            .map(|(date, time)| (date.to_string(), time.to_string()));

        match inline {
            Some((return_date, return_time)) => {
                if !ticket.has_required_fields() {
                    warn!("Legacy ticket {} dropped: missing required fields", ticket.id);
                    outcome
                        .errors
                        .push(format!("Ticket #{}: Missing required fields.", i + 1));
                    continue;
                }
                let (outbound, return_leg) = ticket.split_return(return_date, return_time);
                outcome.tickets.push(outbound);
                outcome.tickets.push(return_leg);
                outcome.split += 1;
            }
            None => {
                let mut single = ticket;
                single.ticket_format = TicketFormat::classify(&single.ticket_type);
                single.is_return = false;
                outcome.tickets.push(single);
            }
        }
    }

    if outcome.split > 0 || !outcome.errors.is_empty() {
        info!(
            "Migrated {} legacy return tickets, {} dropped",
            outcome.split,
            outcome.errors.len()
        );
    }
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ZERO_PRICE;
    use uuid::Uuid;

    fn legacy_return() -> TicketRecord {
        TicketRecord {
            origin: "Leeds".into(),
            destination: "Scarborough".into(),
            price: "£21.40".into(),
            ticket_type: "Off-Peak Return".into(),
            outbound_date: "12/08/2023".into(),
            outbound_time: "09:12".into(),
            return_date: Some("12/08/2023".into()),
            return_time: Some("19:40".into()),
            ..TicketRecord::default()
        }
    }

    #[test]
    fn legacy_return_is_split_keeping_outbound_id() {
        let original = legacy_return();
        let id = original.id;
        let outcome = migrate(vec![original]);

        assert!(outcome.errors.is_empty());
        assert_eq!(outcome.split, 1);
        assert_eq!(outcome.tickets.len(), 2);
        let outbound = &outcome.tickets[0];
        let ret = &outcome.tickets[1];
        assert_eq!(outbound.id, id);
        assert_ne!(ret.id, id);
        assert_eq!(outbound.price, "£21.40");
        assert_eq!(ret.price, ZERO_PRICE);
        assert_eq!(ret.origin, "Scarborough");
        assert_eq!(ret.outbound_time, "19:40");
        assert!(outbound.return_date.is_none());
        assert_eq!(outbound.return_group_id, ret.return_group_id);
    }

    #[test]
    fn grouped_records_pass_through() {
        let grouped = TicketRecord {
            return_group_id: Some(Uuid::new_v4()),
            ticket_type: "Day Travelcard".into(),
            return_date: Some("01/01/2025".into()),
            return_time: Some("10:00".into()),
            ..TicketRecord::default()
        };
        let outcome = migrate(vec![grouped.clone()]);
        assert_eq!(outcome.tickets, vec![grouped]);
    }

    #[test]
    fn singles_get_format_recomputed() {
        let single = TicketRecord {
            ticket_type: "Zones 1-6 Travelcard".into(),
            return_time: Some("00:00".into()),
            ..TicketRecord::default()
        };
        let outcome = migrate(vec![single]);
        assert_eq!(outcome.tickets[0].ticket_format, TicketFormat::Travelcards);
        assert!(outcome.tickets[0].return_group_id.is_none());
    }

    #[test]
    fn invalid_legacy_return_is_dropped() {
        let mut broken = legacy_return();
        broken.class_type = String::new();
        let fine = TicketRecord::default();
        let outcome = migrate(vec![fine.clone(), broken]);
        assert_eq!(outcome.errors, vec!["Ticket #2: Missing required fields.".to_string()]);
        assert_eq!(outcome.tickets, vec![fine]);
    }

    #[test]
    fn second_run_is_a_no_op() {
        let input = vec![
            legacy_return(),
            TicketRecord {
                ticket_type: "Freedom of the North Rover".into(),
                ..TicketRecord::default()
            },
            legacy_return(),
        ];
        let first = migrate(input);
        let second = migrate(first.tickets.clone());
        assert_eq!(second.tickets, first.tickets);
        assert!(second.errors.is_empty());
        assert_eq!(second.split, 0);
    }
}
