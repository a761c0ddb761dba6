use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::entity::sea_orm_active_enums::Role;

#[derive(Debug, Clone, Copy, Deserialize, Serialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DecisionAction {
    Approve,
    Reject,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct EventDecisionRequest {
    pub action: DecisionAction,
    pub comment: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateRoleRequest {
    pub role: Role,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateUserStatusRequest {
    pub is_active: bool,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RoleCount {
    pub role: String,
    pub count: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UserStats {
    pub total: i64,
    pub active: i64,
    pub by_role: Vec<RoleCount>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct EventStats {
    pub total: i64,
    pub pending: i64,
    pub approved: i64,
    pub rejected: i64,
    pub cancelled: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderStats {
    pub total: i64,
    pub completed: i64,
    pub cancelled: i64,
    pub revenue: Decimal,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TicketStats {
    pub issued: i64,
    pub checked_in: i64,
    pub cancelled: i64,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct Statistics {
    pub users: UserStats,
    pub events: EventStats,
    pub orders: OrderStats,
    pub tickets: TicketStats,
}
