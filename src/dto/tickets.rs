use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{entity::sea_orm_active_enums::TicketStatus, models::Ticket};

#[derive(Debug, Serialize, ToSchema)]
pub struct TicketList {
    pub items: Vec<Ticket>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TicketEventSummary {
    pub id: Uuid,
    pub title: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub venue: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TicketDetail {
    pub ticket: Ticket,
    pub order_reference: String,
    pub ticket_type: String,
    pub event: TicketEventSummary,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CheckInResult {
    pub code: String,
    pub checked_in_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TicketVerification {
    pub valid: bool,
    pub status: TicketStatus,
    pub checked_in: bool,
    pub checked_in_at: Option<DateTime<Utc>>,
    pub ticket_type: String,
    pub event: TicketEventSummary,
}
