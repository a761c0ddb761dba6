use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{get, patch, post, put},
};
use uuid::Uuid;

use crate::{
    dto::{
        admin::{EventDecisionRequest, Statistics, UpdateRoleRequest, UpdateUserStatusRequest},
        events::EventList,
        orders::OrderList,
    },
    error::AppResult,
    middleware::auth::AuthUser,
    models::{Event, User},
    response::ApiResponse,
    routes::params::{OrderListQuery, PageQuery},
    services::{admin_service, order_service},
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/events/pending", get(list_pending_events))
        .route("/events/{id}/decision", post(decide_event))
        .route("/users/{id}/role", patch(update_user_role))
        .route("/users/{id}/status", put(update_user_status))
        .route("/orders", get(list_all_orders))
        .route("/stats", get(statistics))
}

#[utoipa::path(
    get,
    path = "/api/admin/events/pending",
    params(PageQuery),
    responses(
        (status = 200, description = "Events awaiting review", body = ApiResponse<EventList>),
        (status = 403, description = "Forbidden"),
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn list_pending_events(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<PageQuery>,
) -> AppResult<Json<ApiResponse<EventList>>> {
    let resp = admin_service::list_pending_events(&state, &user, query).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/admin/events/{id}/decision",
    params(
        ("id" = Uuid, Path, description = "Event ID")
    ),
    request_body = EventDecisionRequest,
    responses(
        (status = 200, description = "Event approved or rejected", body = ApiResponse<Event>),
        (status = 400, description = "Event is not pending approval"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Event not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn decide_event(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<EventDecisionRequest>,
) -> AppResult<Json<ApiResponse<Event>>> {
    let resp = admin_service::decide_event(&state, &user, id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    patch,
    path = "/api/admin/users/{id}/role",
    params(
        ("id" = Uuid, Path, description = "User ID")
    ),
    request_body = UpdateRoleRequest,
    responses(
        (status = 200, description = "Role updated", body = ApiResponse<User>),
        (status = 400, description = "Administrators cannot demote themselves"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "User not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn update_user_role(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateRoleRequest>,
) -> AppResult<Json<ApiResponse<User>>> {
    let resp = admin_service::update_role(&state, &user, id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    put,
    path = "/api/admin/users/{id}/status",
    params(
        ("id" = Uuid, Path, description = "User ID")
    ),
    request_body = UpdateUserStatusRequest,
    responses(
        (status = 200, description = "Account activated or deactivated", body = ApiResponse<User>),
        (status = 400, description = "Administrators cannot deactivate themselves"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "User not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn update_user_status(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateUserStatusRequest>,
) -> AppResult<Json<ApiResponse<User>>> {
    let resp = admin_service::update_user_status(&state, &user, id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/admin/orders",
    params(OrderListQuery),
    responses(
        (status = 200, description = "Get all orders (admin only)", body = ApiResponse<OrderList>),
        (status = 403, description = "Forbidden"),
        (status = 500, description = "Internal Server Error"),
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn list_all_orders(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<OrderListQuery>,
) -> AppResult<Json<ApiResponse<OrderList>>> {
    let resp = order_service::list_all_orders(&state, &user, query).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/admin/stats",
    responses(
        (status = 200, description = "Platform statistics", body = ApiResponse<Statistics>),
        (status = 403, description = "Forbidden"),
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn statistics(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<Statistics>>> {
    let resp = admin_service::statistics(&state, &user).await?;
    Ok(Json(resp))
}
