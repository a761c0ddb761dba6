use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::entity::{
    events, notifications, order_items, orders, payments,
    sea_orm_active_enums::{
        EventStatus, OrderStatus, PaymentRecordStatus, PaymentStatus, Role, TicketStatus,
    },
    ticket_types, tickets, users,
};

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub username: Option<String>,
    pub role: Role,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct Event {
    pub id: Uuid,
    pub organizer_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub venue: Option<String>,
    pub city: Option<String>,
    pub category: Option<String>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub status: EventStatus,
    pub capacity: Option<i32>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TicketType {
    pub id: Uuid,
    pub event_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub quantity_total: i32,
    pub quantity_sold: i32,
    pub available_quantity: i32,
    pub sale_start: Option<DateTime<Utc>>,
    pub sale_end: Option<DateTime<Utc>>,
    pub max_per_user: i32,
    pub is_active: bool,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct Order {
    pub id: Uuid,
    pub user_id: Uuid,
    pub event_id: Uuid,
    pub reference: String,
    pub total_amount: Decimal,
    pub payment_status: PaymentStatus,
    pub order_status: OrderStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct OrderItem {
    pub id: Uuid,
    pub order_id: Uuid,
    pub ticket_type_id: Uuid,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub subtotal: Decimal,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct Ticket {
    pub id: Uuid,
    pub order_id: Uuid,
    pub ticket_type_id: Uuid,
    pub code: String,
    pub status: TicketStatus,
    pub checked_in_at: Option<DateTime<Utc>>,
    pub qr_code_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct Payment {
    pub id: Uuid,
    pub order_id: Uuid,
    pub provider: String,
    pub provider_ref: String,
    pub amount: Decimal,
    pub status: PaymentRecordStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct Notification {
    pub id: Uuid,
    pub title: String,
    pub message: String,
    pub kind: String,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

impl From<users::Model> for User {
    fn from(model: users::Model) -> Self {
        Self {
            id: model.id,
            email: model.email,
            username: model.username,
            role: model.role,
            is_active: model.is_active,
            created_at: model.created_at.with_timezone(&Utc),
        }
    }
}

impl From<events::Model> for Event {
    fn from(model: events::Model) -> Self {
        Self {
            id: model.id,
            organizer_id: model.organizer_id,
            title: model.title,
            description: model.description,
            venue: model.venue,
            city: model.city,
            category: model.category,
            start_time: model.start_time.with_timezone(&Utc),
            end_time: model.end_time.with_timezone(&Utc),
            status: model.status,
            capacity: model.capacity,
            created_at: model.created_at.with_timezone(&Utc),
        }
    }
}

impl From<ticket_types::Model> for TicketType {
    fn from(model: ticket_types::Model) -> Self {
        Self {
            available_quantity: model.available(),
            id: model.id,
            event_id: model.event_id,
            name: model.name,
            description: model.description,
            price: model.price,
            quantity_total: model.quantity_total,
            quantity_sold: model.quantity_sold,
            sale_start: model.sale_start.map(|dt| dt.with_timezone(&Utc)),
            sale_end: model.sale_end.map(|dt| dt.with_timezone(&Utc)),
            max_per_user: model.max_per_user,
            is_active: model.is_active,
        }
    }
}

impl From<orders::Model> for Order {
    fn from(model: orders::Model) -> Self {
        Self {
            id: model.id,
            user_id: model.user_id,
            event_id: model.event_id,
            reference: model.reference,
            total_amount: model.total_amount,
            payment_status: model.payment_status,
            order_status: model.order_status,
            created_at: model.created_at.with_timezone(&Utc),
            updated_at: model.updated_at.with_timezone(&Utc),
        }
    }
}

impl From<order_items::Model> for OrderItem {
    fn from(model: order_items::Model) -> Self {
        Self {
            id: model.id,
            order_id: model.order_id,
            ticket_type_id: model.ticket_type_id,
            quantity: model.quantity,
            unit_price: model.unit_price,
            subtotal: model.subtotal,
        }
    }
}

impl From<tickets::Model> for Ticket {
    fn from(model: tickets::Model) -> Self {
        Self {
            id: model.id,
            order_id: model.order_id,
            ticket_type_id: model.ticket_type_id,
            code: model.code,
            status: model.status,
            checked_in_at: model.checked_in_at.map(|dt| dt.with_timezone(&Utc)),
            qr_code_url: model.qr_image_url,
            created_at: model.created_at.with_timezone(&Utc),
        }
    }
}

impl From<payments::Model> for Payment {
    fn from(model: payments::Model) -> Self {
        Self {
            id: model.id,
            order_id: model.order_id,
            provider: model.provider,
            provider_ref: model.provider_ref,
            amount: model.amount,
            status: model.status,
            created_at: model.created_at.with_timezone(&Utc),
        }
    }
}

impl From<notifications::Model> for Notification {
    fn from(model: notifications::Model) -> Self {
        Self {
            id: model.id,
            title: model.title,
            message: model.message,
            kind: model.kind,
            is_read: model.is_read,
            created_at: model.created_at.with_timezone(&Utc),
        }
    }
}
