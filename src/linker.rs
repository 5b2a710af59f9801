// Queries and edits that treat the two legs of a return group as one journey.
use crate::types::TicketRecord;
use crate::util::{parse_date_safe, parse_date_time_safe, parse_price};
use chrono::NaiveDate;
use std::cmp::Ordering;
use std::collections::{BTreeSet, HashMap, HashSet};
use uuid::Uuid;

/// One entry of a ticket listing.
#[derive(Debug, Clone, PartialEq)]
pub enum DisplayGroup<'a> {
    Single(&'a TicketRecord),
    /// Either leg may be missing when its sibling was deleted on its own.
    Return {
        group: Uuid,
        outbound: Option<&'a TicketRecord>,
        return_leg: Option<&'a TicketRecord>,
    },
}

impl<'a> DisplayGroup<'a> {
    pub fn legs(&self) -> Vec<&'a TicketRecord> {
        match self {
            Self::Single(t) => vec![*t],
            Self::Return {
                outbound,
                return_leg,
                ..
            } => outbound.iter().chain(return_leg.iter()).copied().collect(),
        }
    }
}

/// Partition tickets into singles and outbound-then-return pairs. Groups
/// keep the position of their first member in `tickets`.
pub fn display_groups(tickets: &[TicketRecord]) -> Vec<DisplayGroup<'_>> {
    let mut groups: Vec<DisplayGroup<'_>> = Vec::new();
    let mut slot: HashMap<Uuid, usize> = HashMap::new();

    for ticket in tickets {
        let Some(group) = ticket.return_group_id else {
            groups.push(DisplayGroup::Single(ticket));
            continue;
        };
        let idx = *slot.entry(group).or_insert_with(|| {
            groups.push(DisplayGroup::Return {
                group,
                outbound: None,
                return_leg: None,
            });
            groups.len() - 1
        });
        if let DisplayGroup::Return {
            outbound,
            return_leg,
            ..
        } = &mut groups[idx]
        {
            let leg = if ticket.is_return { return_leg } else { outbound };
            if leg.is_none() {
                *leg = Some(ticket);
            }
        }
    }
    groups
}

pub fn tickets_in_group(tickets: &[TicketRecord], group: Uuid) -> Vec<&TicketRecord> {
    tickets
        .iter()
        .filter(|t| t.return_group_id == Some(group))
        .collect()
}

pub fn sibling_of<'a>(tickets: &'a [TicketRecord], ticket: &TicketRecord) -> Option<&'a TicketRecord> {
    let group = ticket.return_group_id?;
    tickets
        .iter()
        .find(|t| t.return_group_id == Some(group) && t.id != ticket.id)
}

/// Apply an edited record. Inside a return group the shared journey fields
/// go to every leg while dates, times and delay stay with the edited leg.
/// Returns `false` when no record matched.
pub fn apply_update(tickets: &mut [TicketRecord], edited: &TicketRecord) -> bool {
    let Some(group) = edited.return_group_id else {
        return match tickets.iter_mut().find(|t| t.id == edited.id) {
            Some(slot) => {
                let mut replacement = edited.clone();
                replacement.set_ticket_type(edited.ticket_type.clone());
                *slot = replacement;
                true
            }
            None => false,
        };
    };

    let mut touched = false;
    for ticket in tickets.iter_mut().filter(|t| t.return_group_id == Some(group)) {
        ticket.origin = edited.origin.clone();
        ticket.destination = edited.destination.clone();
        ticket.price = edited.price.clone();
        ticket.set_ticket_type(edited.ticket_type.clone());
        ticket.class_type = edited.class_type.clone();
        ticket.toc = edited.toc.clone();
        ticket.pending_compensation = edited.pending_compensation;
        ticket.compensation = edited.compensation.clone();
        ticket.loyalty_program = edited.loyalty_program.clone();
        ticket.railcard = edited.railcard.clone();
        ticket.coach = edited.coach.clone();
        ticket.seat = edited.seat.clone();
        ticket.toc_route_restriction = edited.toc_route_restriction.clone();

        if ticket.id == edited.id {
            ticket.outbound_date = edited.outbound_date.clone();
            ticket.outbound_time = edited.outbound_time.clone();
            ticket.was_delayed = edited.was_delayed;
            ticket.delay_duration = edited.delay_duration.clone();
            ticket.return_date = edited.return_date.clone();
            ticket.return_time = edited.return_time.clone();
        }
        touched = true;
    }
    touched
}

/// Remove exactly the record with `id`; a grouped sibling is left behind.
pub fn delete_ticket(tickets: &mut Vec<TicketRecord>, id: Uuid) -> Vec<TicketRecord> {
    let (removed, kept): (Vec<_>, Vec<_>) = std::mem::take(tickets).into_iter().partition(|t| t.id == id);
    *tickets = kept;
    removed
}

/// Give every group in `incoming` that is already used by `existing` a fresh
/// id, the same one for both of its legs. Returns how many groups moved.
pub fn relink_groups(existing: &[TicketRecord], incoming: &mut [TicketRecord]) -> usize {
    let taken: HashSet<Uuid> = existing.iter().filter_map(|t| t.return_group_id).collect();
    let mut fresh: HashMap<Uuid, Uuid> = HashMap::new();
    for ticket in incoming.iter_mut() {
        if let Some(group) = ticket.return_group_id.filter(|g| taken.contains(g)) {
            ticket.return_group_id = Some(*fresh.entry(group).or_insert_with(Uuid::new_v4));
        }
    }
    fresh.len()
}

/// Remove the record with `id` together with every leg of its group.
pub fn delete_journey(tickets: &mut Vec<TicketRecord>, id: Uuid) -> Vec<TicketRecord> {
    let group = tickets
        .iter()
        .find(|t| t.id == id)
        .and_then(|t| t.return_group_id);
    let (removed, kept): (Vec<_>, Vec<_>) = std::mem::take(tickets)
        .into_iter()
        .partition(|t| t.id == id || (group.is_some() && t.return_group_id == group));
    *tickets = kept;
    removed
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoyaltyFilter {
    VirginPoints,
    LnerPerks,
    ClubAvanti,
}

/// Listing criteria; unset fields match everything.
#[derive(Debug, Clone, Default)]
pub struct TicketFilter {
    pub year: Option<String>,
    pub toc: Option<String>,
    pub class_type: Option<String>,
    /// Compared case-insensitively.
    pub ticket_type: Option<String>,
    pub delay_duration: Option<String>,
    pub loyalty: Option<LoyaltyFilter>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    /// Case-insensitive substring over origin, destination, type, TOC, class.
    pub search: Option<String>,
}

impl TicketFilter {
    pub fn is_empty(&self) -> bool {
        self.year.is_none()
            && self.toc.is_none()
            && self.class_type.is_none()
            && self.ticket_type.is_none()
            && self.delay_duration.is_none()
            && self.loyalty.is_none()
            && self.start_date.is_none()
            && self.end_date.is_none()
            && self.search.as_deref().map_or(true, |s| s.trim().is_empty())
    }

    pub fn matches(&self, ticket: &TicketRecord) -> bool {
        if let Some(year) = &self.year {
            if !ticket.outbound_date.ends_with(&format!("/{}", year)) {
                return false;
            }
        }
        if let Some(toc) = &self.toc {
            if ticket.toc.as_deref() != Some(toc.as_str()) {
                return false;
            }
        }
        if let Some(class_type) = &self.class_type {
            if &ticket.class_type != class_type {
                return false;
            }
        }
        if let Some(ticket_type) = &self.ticket_type {
            if ticket.ticket_type.to_lowercase() != ticket_type.to_lowercase() {
                return false;
            }
        }
        if let Some(delay) = &self.delay_duration {
            if ticket.delay_duration.as_deref() != Some(delay.as_str()) {
                return false;
            }
        }
        if let Some(loyalty) = self.loyalty {
            let Some(program) = &ticket.loyalty_program else {
                return false;
            };
            let present = match loyalty {
                LoyaltyFilter::VirginPoints => program.virgin_points.is_some(),
                LoyaltyFilter::LnerPerks => program.lner_cash_value.is_some(),
                LoyaltyFilter::ClubAvanti => program.club_avanti_journeys.is_some(),
            };
            if !present {
                return false;
            }
        }
        if self.start_date.is_some() || self.end_date.is_some() {
            let Some(date) = parse_date_safe(&ticket.outbound_date) else {
                return false;
            };
            if self.start_date.is_some_and(|start| date < start)
                || self.end_date.is_some_and(|end| date > end)
            {
                return false;
            }
        }
        if let Some(search) = &self.search {
            let needle = search.trim().to_lowercase();
            if !needle.is_empty() {
                let haystacks = [
                    ticket.origin.as_str(),
                    ticket.destination.as_str(),
                    ticket.ticket_type.as_str(),
                    ticket.toc.as_deref().unwrap_or(""),
                    ticket.class_type.as_str(),
                ];
                if !haystacks.iter().any(|h| h.to_lowercase().contains(&needle)) {
                    return false;
                }
            }
        }
        true
    }
}

/// Filter with return groups kept whole: if any leg matches, every leg is
/// returned. Output keeps input order.
pub fn filter_grouped(tickets: &[TicketRecord], filter: &TicketFilter) -> Vec<TicketRecord> {
    let matched_groups: HashSet<Uuid> = tickets
        .iter()
        .filter(|t| filter.matches(t))
        .filter_map(|t| t.return_group_id)
        .collect();

    tickets
        .iter()
        .filter(|t| match t.return_group_id {
            Some(group) => matched_groups.contains(&group),
            None => filter.matches(t),
        })
        .cloned()
        .collect()
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortOrder {
    #[default]
    NewestFirst,
    OldestFirst,
    PriceHighToLow,
    PriceLowToHigh,
}

impl SortOrder {
    pub const ALL: [SortOrder; 4] = [
        SortOrder::NewestFirst,
        SortOrder::OldestFirst,
        SortOrder::PriceHighToLow,
        SortOrder::PriceLowToHigh,
    ];

    pub const fn label(self) -> &'static str {
        match self {
            Self::NewestFirst => "Newest - Oldest Date",
            Self::OldestFirst => "Oldest - Newest Date",
            Self::PriceHighToLow => "Price High - Price Low",
            Self::PriceLowToHigh => "Price Low - Price High",
        }
    }
}

/// Stable sort. Tickets whose date or time does not parse go last in both
/// date orders.
pub fn sort_tickets(tickets: &mut [TicketRecord], order: SortOrder) {
    match order {
        SortOrder::NewestFirst | SortOrder::OldestFirst => {
            let newest_first = order == SortOrder::NewestFirst;
            tickets.sort_by(|a, b| {
                let ka = parse_date_time_safe(&a.outbound_date, &a.outbound_time);
                let kb = parse_date_time_safe(&b.outbound_date, &b.outbound_time);
                match (ka, kb) {
                    (Some(x), Some(y)) if newest_first => y.cmp(&x),
                    (Some(x), Some(y)) => x.cmp(&y),
                    (Some(_), None) => Ordering::Less,
                    (None, Some(_)) => Ordering::Greater,
                    (None, None) => Ordering::Equal,
                }
            });
        }
        SortOrder::PriceHighToLow => {
            tickets.sort_by(|a, b| parse_price(&b.price).total_cmp(&parse_price(&a.price)));
        }
        SortOrder::PriceLowToHigh => {
            tickets.sort_by(|a, b| parse_price(&a.price).total_cmp(&parse_price(&b.price)));
        }
    }
}

pub fn newest_ticket(tickets: &[TicketRecord]) -> Option<&TicketRecord> {
    tickets
        .iter()
        .filter_map(|t| parse_date_time_safe(&t.outbound_date, &t.outbound_time).map(|k| (k, t)))
        .max_by_key(|(k, _)| *k)
        .map(|(_, t)| t)
}

pub fn unique_tocs(tickets: &[TicketRecord]) -> Vec<String> {
    tickets
        .iter()
        .filter_map(|t| t.toc.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

pub fn unique_ticket_types(tickets: &[TicketRecord]) -> Vec<String> {
    tickets
        .iter()
        .map(|t| t.ticket_type.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

pub fn unique_delay_durations(tickets: &[TicketRecord]) -> Vec<String> {
    tickets
        .iter()
        .filter_map(|t| t.delay_duration.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{LoyaltyProgram, TicketFormat};

    fn single(origin: &str, date: &str, time: &str, price: &str) -> TicketRecord {
        TicketRecord {
            origin: origin.into(),
            destination: "York".into(),
            price: price.into(),
            ticket_type: "Anytime Single".into(),
            outbound_date: date.into(),
            outbound_time: time.into(),
            ..TicketRecord::default()
        }
    }

    fn pair(origin: &str, destination: &str, date: &str, toc: &str) -> (TicketRecord, TicketRecord) {
        TicketRecord {
            origin: origin.into(),
            destination: destination.into(),
            price: "£20.00".into(),
            ticket_type: "Off-Peak Return".into(),
            toc: Some(toc.into()),
            outbound_date: date.into(),
            outbound_time: "08:00".into(),
            ..TicketRecord::default()
        }
        .split_return(date.into(), "18:00".into())
    }

    #[test]
    fn display_groups_pair_legs_in_first_seen_order() {
        let (out, ret) = pair("Leeds", "Hull", "01/03/2025", "Northern");
        let a = single("Leeds", "02/03/2025", "10:00", "£5.00");
        // Return leg listed first: the pair must still render outbound first.
        let tickets = vec![ret.clone(), a.clone(), out.clone()];
        let groups = display_groups(&tickets);

        assert_eq!(groups.len(), 2);
        match &groups[0] {
            DisplayGroup::Return {
                outbound,
                return_leg,
                ..
            } => {
                assert_eq!(outbound.map(|t| t.id), Some(out.id));
                assert_eq!(return_leg.map(|t| t.id), Some(ret.id));
            }
            other => panic!("expected pair, got {:?}", other),
        }
        assert_eq!(groups[1], DisplayGroup::Single(&tickets[1]));
        assert_eq!(groups[0].legs().len(), 2);
    }

    #[test]
    fn orphan_leg_renders_as_half_pair() {
        let (_, ret) = pair("Leeds", "Hull", "01/03/2025", "Northern");
        let tickets = vec![ret];
        let groups = display_groups(&tickets);
        assert_eq!(groups[0].legs().len(), 1);
    }

    #[test]
    fn update_propagates_shared_fields_only() {
        let (out, ret) = pair("Leeds", "Hull", "01/03/2025", "Northern");
        let mut tickets = vec![out.clone(), ret.clone()];

        let mut edited = ret.clone();
        edited.origin = "Hull Paragon".into();
        edited.toc = Some("TransPennine Express".into());
        edited.ticket_type = "Anytime Day Travelcard".into();
        edited.compensation = Some("£4.00".into());
        edited.outbound_date = "02/03/2025".into();
        edited.outbound_time = "19:30".into();
        edited.was_delayed = true;
        edited.delay_duration = Some("30-59 minutes".into());

        assert!(apply_update(&mut tickets, &edited));

        for t in &tickets {
            assert_eq!(t.origin, "Hull Paragon");
            assert_eq!(t.toc.as_deref(), Some("TransPennine Express"));
            assert_eq!(t.compensation.as_deref(), Some("£4.00"));
            assert_eq!(t.ticket_format, TicketFormat::Travelcards);
        }
        assert_eq!(tickets[0].outbound_date, "01/03/2025");
        assert_eq!(tickets[0].outbound_time, "08:00");
        assert!(!tickets[0].was_delayed);
        assert!(tickets[0].delay_duration.is_none());
        assert_eq!(tickets[1].outbound_date, "02/03/2025");
        assert_eq!(tickets[1].outbound_time, "19:30");
        assert!(tickets[1].was_delayed);
        assert_eq!(tickets[0].id, out.id);
        assert!(tickets[1].is_return);
    }

    #[test]
    fn update_single_replaces_by_id() {
        let a = single("Leeds", "02/03/2025", "10:00", "£5.00");
        let b = single("Hull", "03/03/2025", "10:00", "£6.00");
        let mut tickets = vec![a.clone(), b.clone()];
        let mut edited = b.clone();
        edited.price = "£7.50".into();
        edited.ticket_type = "Contactless".into();

        assert!(apply_update(&mut tickets, &edited));
        assert_eq!(tickets[0], a);
        assert_eq!(tickets[1].price, "£7.50");
        assert_eq!(tickets[1].ticket_format, TicketFormat::ContactlessCards);

        let stranger = single("Bath", "01/01/2025", "10:00", "£1.00");
        assert!(!apply_update(&mut tickets, &stranger));
    }

    #[test]
    fn delete_ticket_leaves_sibling() {
        let (out, ret) = pair("Leeds", "Hull", "01/03/2025", "Northern");
        let mut tickets = vec![out.clone(), ret.clone()];
        let removed = delete_ticket(&mut tickets, out.id);
        assert_eq!(removed.len(), 1);
        assert_eq!(tickets, vec![ret.clone()]);
        assert_eq!(tickets[0].return_group_id, ret.return_group_id);
    }

    #[test]
    fn delete_journey_cascades_to_group() {
        let (out, ret) = pair("Leeds", "Hull", "01/03/2025", "Northern");
        let a = single("Leeds", "02/03/2025", "10:00", "£5.00");
        let mut tickets = vec![out.clone(), a.clone(), ret.clone()];
        let removed = delete_journey(&mut tickets, ret.id);
        assert_eq!(removed.len(), 2);
        assert_eq!(tickets, vec![a.clone()]);

        let removed = delete_journey(&mut tickets, a.id);
        assert_eq!(removed, vec![a]);
        assert!(tickets.is_empty());
    }

    #[test]
    fn relink_moves_only_colliding_groups() {
        let (out, ret) = pair("Leeds", "Hull", "01/03/2025", "Northern");
        let (other_out, other_ret) = pair("Leeds", "York", "02/03/2025", "LNER");
        let existing = vec![out.clone(), ret.clone()];
        let mut incoming = vec![out.clone(), ret.clone(), other_out.clone(), other_ret.clone()];

        assert_eq!(relink_groups(&existing, &mut incoming), 1);
        let moved = incoming[0].return_group_id;
        assert!(moved.is_some());
        assert_ne!(moved, out.return_group_id);
        assert_eq!(incoming[1].return_group_id, moved);
        assert_eq!(incoming[2].return_group_id, other_out.return_group_id);
        assert_eq!(incoming[3].return_group_id, other_ret.return_group_id);
    }

    #[test]
    fn filter_keeps_groups_whole() {
        let (out, ret) = pair("Leeds", "Hull", "01/03/2025", "Northern");
        // Return leg edited so that only the outbound mentions Leeds.
        let ret = TicketRecord {
            destination: "Bath".into(),
            ..ret
        };
        let other = single("Bath", "02/03/2025", "10:00", "£5.00");
        let tickets = vec![out.clone(), other, ret.clone()];

        let filter = TicketFilter {
            search: Some("leeds".into()),
            ..TicketFilter::default()
        };
        assert!(!filter.matches(&ret));
        let result = filter_grouped(&tickets, &filter);
        let ids: Vec<Uuid> = result.iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![out.id, ret.id]);
    }

    #[test]
    fn filter_criteria_combine() {
        let mut a = single("Leeds", "02/03/2025", "10:00", "£5.00");
        a.toc = Some("Northern".into());
        a.delay_duration = Some("15-29 minutes".into());
        a.loyalty_program = LoyaltyProgram::from_values(None, Some("2.00".into()), None);
        let mut b = single("Leeds", "02/03/2024", "10:00", "£5.00");
        b.class_type = "First".into();
        let tickets = vec![a.clone(), b.clone()];

        let by_year = TicketFilter {
            year: Some("2024".into()),
            ..TicketFilter::default()
        };
        assert_eq!(filter_grouped(&tickets, &by_year), vec![b.clone()]);

        let by_type = TicketFilter {
            ticket_type: Some("ANYTIME single".into()),
            class_type: Some("Standard".into()),
            toc: Some("Northern".into()),
            delay_duration: Some("15-29 minutes".into()),
            loyalty: Some(LoyaltyFilter::LnerPerks),
            ..TicketFilter::default()
        };
        assert_eq!(filter_grouped(&tickets, &by_type), vec![a.clone()]);

        let virgin = TicketFilter {
            loyalty: Some(LoyaltyFilter::VirginPoints),
            ..TicketFilter::default()
        };
        assert!(filter_grouped(&tickets, &virgin).is_empty());
    }

    #[test]
    fn date_range_excludes_unparseable_dates() {
        let a = single("Leeds", "02/03/2025", "10:00", "£5.00");
        let bad = single("Leeds", "Unknown", "10:00", "£5.00");
        let tickets = vec![a.clone(), bad];
        let filter = TicketFilter {
            start_date: NaiveDate::from_ymd_opt(2025, 3, 1),
            end_date: NaiveDate::from_ymd_opt(2025, 3, 2),
            ..TicketFilter::default()
        };
        assert_eq!(filter_grouped(&tickets, &filter), vec![a]);
    }

    #[test]
    fn empty_filter_returns_everything() {
        let filter = TicketFilter {
            search: Some("   ".into()),
            ..TicketFilter::default()
        };
        assert!(filter.is_empty());
        let tickets = vec![single("Leeds", "Unknown", "10:00", "£5.00")];
        assert_eq!(filter_grouped(&tickets, &filter).len(), 1);
    }

    #[test]
    fn sort_by_date_time_both_directions() {
        let early = single("A", "01/01/2025", "09:00", "£1.00");
        let late_same_day = single("B", "01/01/2025", "17:30", "£1.00");
        let later = single("C", "05/02/2025", "06:00", "£1.00");
        let broken = single("D", "soon", "06:00", "£1.00");
        let mut tickets = vec![broken.clone(), later.clone(), early.clone(), late_same_day.clone()];

        sort_tickets(&mut tickets, SortOrder::NewestFirst);
        let names: Vec<&str> = tickets.iter().map(|t| t.origin.as_str()).collect();
        assert_eq!(names, vec!["C", "B", "A", "D"]);

        sort_tickets(&mut tickets, SortOrder::OldestFirst);
        let names: Vec<&str> = tickets.iter().map(|t| t.origin.as_str()).collect();
        assert_eq!(names, vec!["A", "B", "C", "D"]);
    }

    #[test]
    fn sort_by_price_both_directions() {
        let mut tickets = vec![
            single("A", "01/01/2025", "09:00", "£12.85"),
            single("B", "01/01/2025", "09:00", "3"),
            single("C", "01/01/2025", "09:00", "n/a"),
        ];
        sort_tickets(&mut tickets, SortOrder::PriceHighToLow);
        let names: Vec<&str> = tickets.iter().map(|t| t.origin.as_str()).collect();
        assert_eq!(names, vec!["A", "B", "C"]);
        sort_tickets(&mut tickets, SortOrder::PriceLowToHigh);
        let names: Vec<&str> = tickets.iter().map(|t| t.origin.as_str()).collect();
        assert_eq!(names, vec!["C", "B", "A"]);
    }

    #[test]
    fn lookups() {
        let (out, ret) = pair("Leeds", "Hull", "01/03/2025", "Northern");
        let mut a = single("Leeds", "02/03/2025", "10:00", "£5.00");
        a.toc = Some("LNER".into());
        a.delay_duration = Some("60-119 minutes".into());
        let tickets = vec![out.clone(), ret.clone(), a.clone()];

        assert_eq!(sibling_of(&tickets, &out).map(|t| t.id), Some(ret.id));
        assert!(sibling_of(&tickets, &a).is_none());
        assert_eq!(tickets_in_group(&tickets, out.return_group_id.unwrap()).len(), 2);
        assert_eq!(newest_ticket(&tickets).map(|t| t.id), Some(a.id));
        assert_eq!(unique_tocs(&tickets), vec!["LNER".to_string(), "Northern".to_string()]);
        assert_eq!(
            unique_ticket_types(&tickets),
            vec!["Anytime Single".to_string(), "Off-Peak Return".to_string()]
        );
        assert_eq!(unique_delay_durations(&tickets), vec!["60-119 minutes".to_string()]);
    }
}
