//! Pure ticketing rules shared by the services: cart pricing, payment amount
//! tolerance, the check-in window and identifier formats.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::{
    dto::orders::CartItemRequest,
    entity::ticket_types::Model as TicketTypeModel,
    error::{AppError, AppResult, Conflict},
};

/// Maximum difference between a claimed payment amount and the order total.
pub const PAYMENT_TOLERANCE: Decimal = Decimal::from_parts(1, 0, 0, false, 2);

/// How long before the event start the doors open for check-in.
pub const CHECK_IN_LEAD_HOURS: i64 = 2;

#[derive(Debug, Clone, PartialEq)]
pub struct PricedLine {
    pub ticket_type_id: Uuid,
    pub name: String,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub subtotal: Decimal,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PricedCart {
    pub event_id: Uuid,
    pub lines: Vec<PricedLine>,
    pub total: Decimal,
}

impl PricedCart {
    pub fn ticket_count(&self) -> i32 {
        self.lines.iter().map(|l| l.quantity).sum()
    }
}

/// Validate cart lines against a snapshot of the referenced ticket types and
/// price them. Lines are checked in request order; duplicates of the same
/// ticket type are priced independently.
///
/// The per-user limit applies to a single request only, not to the buyer's
/// earlier orders.
pub fn price_cart(
    items: &[CartItemRequest],
    catalog: &HashMap<Uuid, TicketTypeModel>,
    now: DateTime<Utc>,
) -> AppResult<PricedCart> {
    if items.is_empty() {
        return Err(AppError::BadRequest("Cart is empty".into()));
    }

    let mut event_id: Option<Uuid> = None;
    let mut lines = Vec::with_capacity(items.len());
    let mut total = Decimal::ZERO;

    for item in items {
        if item.quantity <= 0 {
            return Err(AppError::BadRequest("Invalid cart item".into()));
        }
        let ticket_type = catalog
            .get(&item.ticket_type_id)
            .ok_or(AppError::NotFound("Ticket type"))?;

        if !sale_open(ticket_type, now) {
            return Err(Conflict::SalesClosed(ticket_type.name.clone()).into());
        }
        if ticket_type.available() < item.quantity {
            return Err(Conflict::NotEnoughTickets(ticket_type.name.clone()).into());
        }
        if item.quantity > ticket_type.max_per_user {
            return Err(Conflict::MaxPerUserExceeded {
                name: ticket_type.name.clone(),
                max: ticket_type.max_per_user,
            }
            .into());
        }
        match event_id {
            None => event_id = Some(ticket_type.event_id),
            Some(id) if id != ticket_type.event_id => return Err(Conflict::MixedEvents.into()),
            Some(_) => {}
        }

        let subtotal = ticket_type.price * Decimal::from(item.quantity);
        total += subtotal;
        lines.push(PricedLine {
            ticket_type_id: ticket_type.id,
            name: ticket_type.name.clone(),
            quantity: item.quantity,
            unit_price: ticket_type.price,
            subtotal,
        });
    }

    let event_id = event_id.ok_or_else(|| AppError::BadRequest("Cart is empty".into()))?;
    Ok(PricedCart {
        event_id,
        lines,
        total,
    })
}

/// A ticket type is on sale when it is active and `now` falls inside its
/// optional sale window.
pub fn sale_open(ticket_type: &TicketTypeModel, now: DateTime<Utc>) -> bool {
    if !ticket_type.is_active {
        return false;
    }
    if let Some(start) = ticket_type.sale_start {
        if now < start {
            return false;
        }
    }
    if let Some(end) = ticket_type.sale_end {
        if now > end {
            return false;
        }
    }
    true
}

pub fn amount_matches(claimed: Decimal, expected: Decimal) -> bool {
    (claimed - expected).abs() <= PAYMENT_TOLERANCE
}

/// Check-in is open from `start - 2h` through `end`, both inclusive.
pub fn check_in_window(
    now: DateTime<Utc>,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Result<(), Conflict> {
    if now < start - Duration::hours(CHECK_IN_LEAD_HOURS) {
        return Err(Conflict::CheckInTooEarly);
    }
    if now > end {
        return Err(Conflict::EventEnded);
    }
    Ok(())
}

pub fn order_reference() -> String {
    format!("ORD-{}", random_hex(16))
}

pub fn ticket_code() -> String {
    format!("TKT-{}", random_hex(12))
}

fn random_hex(len: usize) -> String {
    let mut hex = Uuid::new_v4().simple().to_string();
    hex.truncate(len);
    hex.to_ascii_uppercase()
}
