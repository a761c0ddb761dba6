use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{get, post},
};
use uuid::Uuid;

use crate::{
    dto::tickets::{CheckInResult, TicketDetail, TicketList, TicketVerification},
    error::AppResult,
    middleware::auth::AuthUser,
    response::ApiResponse,
    routes::params::PageQuery,
    services::ticket_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_tickets))
        .route("/verify/{code}", get(verify_ticket))
        .route("/{id}", get(get_ticket))
        .route("/{id}/check-in", post(check_in))
}

#[utoipa::path(
    get,
    path = "/api/tickets",
    params(PageQuery),
    responses(
        (status = 200, description = "Tickets owned by the current user", body = ApiResponse<TicketList>),
        (status = 401, description = "Unauthorized"),
    ),
    security(("bearer_auth" = [])),
    tag = "Tickets"
)]
pub async fn list_tickets(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<PageQuery>,
) -> AppResult<Json<ApiResponse<TicketList>>> {
    let resp = ticket_service::list_tickets(&state, &user, query).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/tickets/{id}",
    params(
        ("id" = Uuid, Path, description = "Ticket ID")
    ),
    responses(
        (status = 200, description = "Ticket with QR code and event details", body = ApiResponse<TicketDetail>),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Ticket not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Tickets"
)]
pub async fn get_ticket(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<TicketDetail>>> {
    let resp = ticket_service::get_ticket(&state, &user, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/tickets/{id}/check-in",
    params(
        ("id" = Uuid, Path, description = "Ticket ID")
    ),
    responses(
        (status = 200, description = "Ticket checked in", body = ApiResponse<CheckInResult>),
        (status = 400, description = "Already checked in, not valid, or outside the check-in window"),
        (status = 403, description = "Only the event organizer or an admin can check in"),
        (status = 404, description = "Ticket not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Tickets"
)]
pub async fn check_in(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<CheckInResult>>> {
    let resp = ticket_service::check_in(&state, &user, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/tickets/verify/{code}",
    params(
        ("code" = String, Path, description = "Ticket code")
    ),
    responses(
        (status = 200, description = "Ticket validity", body = ApiResponse<TicketVerification>),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Ticket not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Tickets"
)]
pub async fn verify_ticket(
    State(state): State<AppState>,
    user: AuthUser,
    Path(code): Path<String>,
) -> AppResult<Json<ApiResponse<TicketVerification>>> {
    let resp = ticket_service::verify_ticket(&state, &user, &code).await?;
    Ok(Json(resp))
}
