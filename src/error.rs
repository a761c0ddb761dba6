use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use crate::response::{ApiResponse, Meta};

/// A request that is well formed but collides with the current state of an
/// order, ticket, event or inventory counter.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Conflict {
    #[error("Not enough tickets available for {0}")]
    NotEnoughTickets(String),

    #[error("Maximum {max} tickets allowed per user for {name}")]
    MaxPerUserExceeded { name: String, max: i32 },

    #[error("All tickets must be for the same event")]
    MixedEvents,

    #[error("Ticket sales are closed for {0}")]
    SalesClosed(String),

    #[error("Event is not open for sales")]
    EventNotOnSale,

    #[error("Order is already paid")]
    AlreadyPaid,

    #[error("Payment with this reference already exists")]
    DuplicatePayment,

    #[error("Order is cancelled")]
    OrderCancelled,

    #[error("Order is already cancelled")]
    AlreadyCancelled,

    #[error("Cannot cancel order with completed payment. Please request refund.")]
    PaidOrder,

    #[error("Cannot cancel order for event that has already started")]
    EventStarted,

    #[error("Ticket already checked in")]
    AlreadyCheckedIn,

    #[error("Ticket is not valid")]
    TicketNotValid,

    #[error("Check-in opens 2 hours before event starts")]
    CheckInTooEarly,

    #[error("Event has ended")]
    EventEnded,

    #[error("Event has been cancelled")]
    EventCancelled,

    #[error("Event is not pending approval")]
    EventNotPending,

    #[error("Cannot delete event with existing orders. Cancel instead.")]
    EventHasOrders,
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("Forbidden")]
    Forbidden,

    #[error(transparent)]
    Conflict(#[from] Conflict),

    #[error("Database error")]
    DbError(#[from] sqlx::Error),

    #[error("ORM error")]
    OrmError(#[from] sea_orm::DbErr),

    #[error("Internal Server Error")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::BadRequest(_) | AppError::Conflict(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::DbError(_) | AppError::OrmError(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

#[derive(Serialize)]
struct ErrorData {
    error: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        match &self {
            AppError::DbError(err) => tracing::error!(error = %err, "database error"),
            AppError::OrmError(err) => tracing::error!(error = %err, "orm error"),
            AppError::Internal(err) => tracing::error!(error = ?err, "internal error"),
            _ => {}
        }

        let message = self.to_string();
        let body = ApiResponse {
            message: message.clone(),
            data: Some(ErrorData { error: message }),
            meta: Some(Meta::empty()),
        };

        (status, axum::Json(body)).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conflicts_surface_as_bad_request_with_reason() {
        let err = AppError::from(Conflict::NotEnoughTickets("VIP".into()));
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.to_string(), "Not enough tickets available for VIP");
    }

    #[test]
    fn internal_failures_do_not_leak_details() {
        let err = AppError::from(anyhow::anyhow!("connection string postgres://secret"));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.to_string(), "Internal Server Error");
    }

    #[test]
    fn not_found_names_the_resource() {
        assert_eq!(AppError::NotFound("Ticket").to_string(), "Ticket not found");
        assert_eq!(AppError::NotFound("Ticket").status(), StatusCode::NOT_FOUND);
    }
}
