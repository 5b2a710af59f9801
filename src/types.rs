use serde::{Deserialize, Serialize};
use tabled::Tabled;
use uuid::Uuid;

pub const ZERO_PRICE: &str = "£0.00";

/// Loyalty values attached to a ticket. Each value is kept as the numeric
/// string the user entered so it serializes exactly as it was imported.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoyaltyProgram {
    pub virgin_points: Option<String>,
    pub lner_cash_value: Option<String>,
    pub club_avanti_journeys: Option<String>,
}

impl LoyaltyProgram {
    /// Builds a program from already-validated values, or `None` when no
    /// value is present at all.
    pub fn from_values(
        virgin_points: Option<String>,
        lner_cash_value: Option<String>,
        club_avanti_journeys: Option<String>,
    ) -> Option<Self> {
        if virgin_points.is_none() && lner_cash_value.is_none() && club_avanti_journeys.is_none() {
            return None;
        }
        Some(Self {
            virgin_points,
            lner_cash_value,
            club_avanti_journeys,
        })
    }
}

/// Broad product family of a ticket, derived from its free-text type.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TicketFormat {
    #[default]
    Tickets,
    Travelcards,
    RangersRovers,
    ContactlessCards,
}

impl TicketFormat {
    /// Case-insensitive substring classification, first match wins.
    pub fn classify(ticket_type: &str) -> Self {
        let lower = ticket_type.to_lowercase();
        if lower.contains("contactless") {
            Self::ContactlessCards
        } else if lower.contains("travelcard") {
            Self::Travelcards
        } else if lower.contains("ranger") || lower.contains("rover") {
            Self::RangersRovers
        } else {
            Self::Tickets
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Tickets => "Tickets",
            Self::Travelcards => "Travelcards",
            Self::RangersRovers => "Rangers/Rovers",
            Self::ContactlessCards => "Contactless cards",
        }
    }
}

impl std::fmt::Display for TicketFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// Unknown labels fall back to `Tickets`; migration recomputes the real value.
impl From<String> for TicketFormat {
    fn from(value: String) -> Self {
        match value.as_str() {
            "Travelcards" => Self::Travelcards,
            "Rangers/Rovers" => Self::RangersRovers,
            "Contactless cards" => Self::ContactlessCards,
            _ => Self::Tickets,
        }
    }
}

impl From<TicketFormat> for String {
    fn from(value: TicketFormat) -> Self {
        value.as_str().to_string()
    }
}

/// Persisted files write an empty string where a value is absent; in memory
/// the same fields are real options.
pub(crate) mod blank {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Option<String>, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(value.as_deref().unwrap_or(""))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
        let raw: Option<String> = Option::deserialize(d)?;
        Ok(raw.filter(|s| !s.is_empty()))
    }
}

/// One fare purchase or journey leg.
///
/// Two records sharing a `return_group_id` form one return journey: the
/// outbound leg (`is_return == false`) carries the fare and the return leg
/// carries `£0.00`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketRecord {
    pub id: Uuid,
    pub origin: String,
    pub destination: String,
    pub price: String,
    pub ticket_type: String,
    pub class_type: String,
    #[serde(default, deserialize_with = "blank::deserialize")]
    pub toc: Option<String>,
    pub outbound_date: String,
    pub outbound_time: String,
    #[serde(default, with = "blank")]
    pub return_date: Option<String>,
    #[serde(default, with = "blank")]
    pub return_time: Option<String>,
    #[serde(default)]
    pub was_delayed: bool,
    #[serde(default, with = "blank")]
    pub delay_duration: Option<String>,
    #[serde(default)]
    pub pending_compensation: bool,
    #[serde(default, with = "blank")]
    pub compensation: Option<String>,
    #[serde(default)]
    pub loyalty_program: Option<LoyaltyProgram>,
    #[serde(default, deserialize_with = "blank::deserialize")]
    pub railcard: Option<String>,
    #[serde(default, deserialize_with = "blank::deserialize")]
    pub coach: Option<String>,
    #[serde(default, deserialize_with = "blank::deserialize")]
    pub seat: Option<String>,
    #[serde(default, deserialize_with = "blank::deserialize")]
    pub toc_route_restriction: Option<String>,
    #[serde(default, rename = "returnGroupID")]
    pub return_group_id: Option<Uuid>,
    #[serde(default)]
    pub is_return: bool,
    #[serde(default)]
    pub ticket_format: TicketFormat,
}

impl Default for TicketRecord {
    fn default() -> Self {
        Self {
            id: Uuid::new_v4(),
            origin: "Unknown".to_string(),
            destination: "Unknown".to_string(),
            price: ZERO_PRICE.to_string(),
            ticket_type: "N/A".to_string(),
            class_type: "Standard".to_string(),
            toc: None,
            outbound_date: "Unknown".to_string(),
            outbound_time: "00:00".to_string(),
            return_date: None,
            return_time: None,
            was_delayed: false,
            delay_duration: None,
            pending_compensation: false,
            compensation: None,
            loyalty_program: None,
            railcard: None,
            coach: None,
            seat: None,
            toc_route_restriction: None,
            return_group_id: None,
            is_return: false,
            ticket_format: TicketFormat::Tickets,
        }
    }
}

impl TicketRecord {
    /// Identity comparison; `==` compares every field.
    pub fn same_ticket(&self, other: &TicketRecord) -> bool {
        self.id == other.id
    }

    pub fn set_ticket_type(&mut self, ticket_type: impl Into<String>) {
        self.ticket_type = ticket_type.into();
        self.ticket_format = TicketFormat::classify(&self.ticket_type);
    }

    /// The fields every import and migration insists on.
    pub fn has_required_fields(&self) -> bool {
        ![
            &self.origin,
            &self.destination,
            &self.outbound_date,
            &self.outbound_time,
            &self.ticket_type,
            &self.class_type,
        ]
        .iter()
        .any(|v| v.is_empty())
    }

    /// Inline return details still stored on a single record.
    pub fn inline_return(&self) -> Option<(&str, &str)> {
        match (self.return_date.as_deref(), self.return_time.as_deref()) {
            (Some(date), Some(time)) if !date.is_empty() && !time.is_empty() => Some((date, time)),
            _ => None,
        }
    }

    pub fn is_grouped(&self) -> bool {
        self.return_group_id.is_some()
    }

    pub fn year(&self) -> Option<&str> {
        let parts: Vec<&str> = self.outbound_date.split('/').collect();
        if parts.len() == 3 {
            Some(parts[2])
        } else {
            None
        }
    }

    /// Splits a record holding both legs into an outbound/return pair sharing
    /// a fresh group. The outbound keeps this record's id and fare; the
    /// return leg gets a new id, swapped stations and no fare, delay or
    /// compensation of its own.
    pub fn split_return(self, return_date: String, return_time: String) -> (TicketRecord, TicketRecord) {
        let group = Uuid::new_v4();
        let ticket_format = TicketFormat::classify(&self.ticket_type);

        let return_leg = TicketRecord {
            id: Uuid::new_v4(),
            origin: self.destination.clone(),
            destination: self.origin.clone(),
            price: ZERO_PRICE.to_string(),
            ticket_type: self.ticket_type.clone(),
            class_type: self.class_type.clone(),
            toc: self.toc.clone(),
            outbound_date: return_date,
            outbound_time: return_time,
            return_date: None,
            return_time: None,
            was_delayed: false,
            delay_duration: None,
            pending_compensation: false,
            compensation: None,
            loyalty_program: self.loyalty_program.clone(),
            railcard: self.railcard.clone(),
            coach: self.coach.clone(),
            seat: self.seat.clone(),
            toc_route_restriction: self.toc_route_restriction.clone(),
            return_group_id: Some(group),
            is_return: true,
            ticket_format,
        };
        let outbound = TicketRecord {
            return_date: None,
            return_time: None,
            return_group_id: Some(group),
            is_return: false,
            ticket_format,
            ..self
        };
        (outbound, return_leg)
    }
}

/// Console row for ticket listings.
#[derive(Debug, Clone, Tabled)]
pub struct TicketRow {
    #[tabled(rename = "#")]
    pub index: usize,
    #[tabled(rename = "Date")]
    pub date: String,
    #[tabled(rename = "Time")]
    pub time: String,
    #[tabled(rename = "Route")]
    pub route: String,
    #[tabled(rename = "Price")]
    pub price: String,
    #[tabled(rename = "TicketType")]
    pub ticket_type: String,
    #[tabled(rename = "TOC")]
    pub toc: String,
    #[tabled(rename = "Leg")]
    pub leg: String,
}

impl TicketRow {
    pub fn new(index: usize, ticket: &TicketRecord) -> Self {
        let leg = match (ticket.is_grouped(), ticket.is_return) {
            (false, _) => "Single",
            (true, false) => "Outbound",
            (true, true) => "Return",
        };
        Self {
            index,
            date: ticket.outbound_date.clone(),
            time: ticket.outbound_time.clone(),
            route: format!("{} → {}", ticket.origin, ticket.destination),
            price: ticket.price.clone(),
            ticket_type: ticket.ticket_type.clone(),
            toc: ticket.toc.clone().unwrap_or_default(),
            leg: leg.to_string(),
        }
    }
}
