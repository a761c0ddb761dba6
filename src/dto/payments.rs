use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::entity::sea_orm_active_enums::{PaymentRecordStatus, PaymentStatus};

#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct CreatePaymentRequest {
    pub order_id: Uuid,
    pub provider: String,
    pub provider_ref: String,
    pub amount: Decimal,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PaymentOrderSummary {
    pub id: Uuid,
    pub reference: String,
    pub payment_status: PaymentStatus,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PaymentResult {
    pub payment_id: Uuid,
    pub status: PaymentRecordStatus,
    pub order: PaymentOrderSummary,
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CallbackOutcome {
    Success,
    Failed,
}

#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct PaymentCallbackRequest {
    pub provider_ref: String,
    pub status: CallbackOutcome,
}
