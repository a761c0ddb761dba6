use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::{Order, OrderItem, Payment, Ticket};

#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct CartItemRequest {
    pub ticket_type_id: Uuid,
    pub quantity: i32,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateOrderRequest {
    pub cart_items: Vec<CartItemRequest>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderCreated {
    pub id: Uuid,
    pub reference: String,
    pub total_amount: Decimal,
    pub payment_required: bool,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderDetail {
    pub order: Order,
    pub items: Vec<OrderItem>,
    pub tickets: Vec<Ticket>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderList {
    pub items: Vec<Order>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PaymentList {
    pub items: Vec<Payment>,
}
