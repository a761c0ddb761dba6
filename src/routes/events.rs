use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
};
use uuid::Uuid;

use crate::{
    dto::events::{
        CreateEventRequest, CreateTicketTypeRequest, EventDetail, EventList, UpdateEventRequest,
    },
    error::AppResult,
    middleware::auth::AuthUser,
    models::{Event, TicketType},
    response::ApiResponse,
    routes::params::EventListQuery,
    services::event_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_events).post(create_event))
        .route("/{id}", get(get_event).put(update_event).delete(delete_event))
        .route("/{id}/ticket-types", post(add_ticket_type))
        .route("/{id}/cancel", post(cancel_event))
}

#[utoipa::path(
    get,
    path = "/api/events",
    params(EventListQuery),
    responses(
        (status = 200, description = "Events, soonest first", body = ApiResponse<EventList>),
    ),
    security(()),
    tag = "Events"
)]
pub async fn list_events(
    State(state): State<AppState>,
    Query(query): Query<EventListQuery>,
) -> AppResult<Json<ApiResponse<EventList>>> {
    let resp = event_service::list_events(&state, query).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/events/{id}",
    params(
        ("id" = Uuid, Path, description = "Event ID")
    ),
    responses(
        (status = 200, description = "Event with active ticket types", body = ApiResponse<EventDetail>),
        (status = 404, description = "Event not found"),
    ),
    security(()),
    tag = "Events"
)]
pub async fn get_event(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<EventDetail>>> {
    let resp = event_service::get_event(&state, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/events",
    request_body = CreateEventRequest,
    responses(
        (status = 201, description = "Event submitted for approval", body = ApiResponse<EventDetail>),
        (status = 400, description = "Invalid event"),
        (status = 403, description = "Organizer role required"),
    ),
    security(("bearer_auth" = [])),
    tag = "Events"
)]
pub async fn create_event(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreateEventRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<EventDetail>>)> {
    let resp = event_service::create_event(&state, &user, payload).await?;
    Ok((StatusCode::CREATED, Json(resp)))
}

#[utoipa::path(
    post,
    path = "/api/events/{id}/ticket-types",
    params(
        ("id" = Uuid, Path, description = "Event ID")
    ),
    request_body = CreateTicketTypeRequest,
    responses(
        (status = 201, description = "Ticket type created", body = ApiResponse<TicketType>),
        (status = 400, description = "Invalid ticket type"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Event not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Events"
)]
pub async fn add_ticket_type(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<CreateTicketTypeRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<TicketType>>)> {
    let resp = event_service::add_ticket_type(&state, &user, id, payload).await?;
    Ok((StatusCode::CREATED, Json(resp)))
}

#[utoipa::path(
    put,
    path = "/api/events/{id}",
    params(
        ("id" = Uuid, Path, description = "Event ID")
    ),
    request_body = UpdateEventRequest,
    responses(
        (status = 200, description = "Event updated", body = ApiResponse<Event>),
        (status = 400, description = "Invalid times or event cancelled"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Event not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Events"
)]
pub async fn update_event(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateEventRequest>,
) -> AppResult<Json<ApiResponse<Event>>> {
    let resp = event_service::update_event(&state, &user, id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/events/{id}/cancel",
    params(
        ("id" = Uuid, Path, description = "Event ID")
    ),
    responses(
        (status = 200, description = "Event cancelled", body = ApiResponse<Event>),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Event not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Events"
)]
pub async fn cancel_event(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Event>>> {
    let resp = event_service::cancel_event(&state, &user, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    delete,
    path = "/api/events/{id}",
    params(
        ("id" = Uuid, Path, description = "Event ID")
    ),
    responses(
        (status = 200, description = "Event deleted"),
        (status = 400, description = "Event has orders"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Event not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Events"
)]
pub async fn delete_event(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    let resp = event_service::delete_event(&state, &user, id).await?;
    Ok(Json(resp))
}
