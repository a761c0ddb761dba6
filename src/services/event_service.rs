use chrono::Utc;
use sea_orm::ActiveValue::NotSet;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, EntityTrait, ModelTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use uuid::Uuid;

use crate::{
    audit,
    dto::events::{
        CreateEventRequest, CreateTicketTypeRequest, EventDetail, EventList, UpdateEventRequest,
    },
    entity::{
        events::{ActiveModel as EventActive, Column as EventCol, Entity as Events, Model as EventModel},
        orders::{Column as OrderCol, Entity as Orders},
        sea_orm_active_enums::EventStatus,
        ticket_types::{ActiveModel as TicketTypeActive, Column as TicketTypeCol, Entity as TicketTypes},
    },
    error::{AppError, AppResult, Conflict},
    middleware::auth::{AuthUser, Capability},
    models::{Event, TicketType},
    response::{ApiResponse, Meta},
    routes::params::EventListQuery,
    state::AppState,
};

const DEFAULT_MAX_PER_USER: i32 = 10;

/// Submit a new event for approval, together with its initial ticket types.
pub async fn create_event(
    state: &AppState,
    user: &AuthUser,
    payload: CreateEventRequest,
) -> AppResult<ApiResponse<EventDetail>> {
    user.require(Capability::CreateEvents)?;

    let title = payload.title.trim().to_string();
    if title.is_empty() {
        return Err(AppError::BadRequest("Title is required".into()));
    }
    if payload.start_time >= payload.end_time {
        return Err(AppError::BadRequest("End time must be after start time".into()));
    }
    if payload.start_time <= Utc::now() {
        return Err(AppError::BadRequest("Event must start in the future".into()));
    }
    if matches!(payload.capacity, Some(c) if c <= 0) {
        return Err(AppError::BadRequest("Capacity must be positive".into()));
    }
    for ticket_type in &payload.ticket_types {
        validate_ticket_type(ticket_type)?;
    }

    let txn = state.orm.begin().await?;

    let event = EventActive {
        id: Set(Uuid::new_v4()),
        organizer_id: Set(user.user_id),
        title: Set(title),
        description: Set(payload.description),
        venue: Set(payload.venue),
        city: Set(payload.city),
        category: Set(payload.category),
        start_time: Set(payload.start_time.into()),
        end_time: Set(payload.end_time.into()),
        status: Set(EventStatus::Pending),
        capacity: Set(payload.capacity),
        created_at: NotSet,
        updated_at: NotSet,
    }
    .insert(&txn)
    .await?;

    let mut ticket_types: Vec<TicketType> = Vec::with_capacity(payload.ticket_types.len());
    for request in payload.ticket_types {
        ticket_types.push(insert_ticket_type(&txn, event.id, request).await?.into());
    }

    txn.commit().await?;

    tracing::info!(event_id = %event.id, organizer_id = %user.user_id, "event submitted");
    audit::record(
        &state.orm,
        user.user_id,
        "event_create",
        "events",
        serde_json::json!({ "event_id": event.id }),
    )
    .await;

    Ok(ApiResponse::ok(
        "Event created and pending approval",
        EventDetail {
            event: event.into(),
            ticket_types,
        },
    ))
}

fn validate_ticket_type(request: &CreateTicketTypeRequest) -> AppResult<()> {
    if request.name.trim().is_empty() {
        return Err(AppError::BadRequest("Ticket type name is required".into()));
    }
    if request.price.is_sign_negative() {
        return Err(AppError::BadRequest("Price cannot be negative".into()));
    }
    if request.quantity_total < 0 {
        return Err(AppError::BadRequest("Quantity cannot be negative".into()));
    }
    if matches!(request.max_per_user, Some(m) if m < 1) {
        return Err(AppError::BadRequest("max_per_user must be at least 1".into()));
    }
    if let (Some(start), Some(end)) = (request.sale_start, request.sale_end) {
        if start >= end {
            return Err(AppError::BadRequest("Sale end must be after sale start".into()));
        }
    }
    Ok(())
}

async fn insert_ticket_type<C: ConnectionTrait>(
    conn: &C,
    event_id: Uuid,
    request: CreateTicketTypeRequest,
) -> AppResult<crate::entity::ticket_types::Model> {
    let model = TicketTypeActive {
        id: Set(Uuid::new_v4()),
        event_id: Set(event_id),
        name: Set(request.name.trim().to_string()),
        description: Set(request.description),
        price: Set(request.price),
        quantity_total: Set(request.quantity_total),
        quantity_sold: Set(0),
        sale_start: Set(request.sale_start.map(Into::into)),
        sale_end: Set(request.sale_end.map(Into::into)),
        max_per_user: Set(request.max_per_user.unwrap_or(DEFAULT_MAX_PER_USER)),
        is_active: Set(true),
        created_at: NotSet,
    }
    .insert(conn)
    .await?;
    Ok(model)
}

pub async fn list_events(state: &AppState, query: EventListQuery) -> AppResult<ApiResponse<EventList>> {
    let (page, limit, offset) = query.pagination().normalize();

    let mut condition =
        Condition::all().add(EventCol::Status.eq(query.status.unwrap_or(EventStatus::Approved)));
    if let Some(category) = query.category.as_deref() {
        condition = condition.add(EventCol::Category.eq(category));
    }
    if let Some(city) = query.city.as_deref() {
        condition = condition.add(EventCol::City.eq(city));
    }
    if query.upcoming.unwrap_or(true) {
        condition = condition.add(EventCol::StartTime.gt(Utc::now()));
    }

    let finder = Events::find()
        .filter(condition)
        .order_by_asc(EventCol::StartTime);

    let total = finder.clone().count(&state.orm).await? as i64;
    let items = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(Event::from)
        .collect();

    Ok(ApiResponse::success(
        "OK",
        EventList { items },
        Some(Meta::new(page, limit, total)),
    ))
}

pub async fn get_event(state: &AppState, id: Uuid) -> AppResult<ApiResponse<EventDetail>> {
    let event = find_event(state, id).await?;
    let ticket_types = event
        .find_related(TicketTypes)
        .filter(TicketTypeCol::IsActive.eq(true))
        .order_by_asc(TicketTypeCol::Price)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(TicketType::from)
        .collect();

    Ok(ApiResponse::ok(
        "OK",
        EventDetail {
            event: event.into(),
            ticket_types,
        },
    ))
}

pub async fn add_ticket_type(
    state: &AppState,
    user: &AuthUser,
    event_id: Uuid,
    payload: CreateTicketTypeRequest,
) -> AppResult<ApiResponse<TicketType>> {
    let event = find_event(state, event_id).await?;
    user.require(Capability::ManageEvent {
        organizer_id: event.organizer_id,
    })?;
    validate_ticket_type(&payload)?;

    let ticket_type = insert_ticket_type(&state.orm, event.id, payload).await?;
    tracing::info!(event_id = %event.id, ticket_type_id = %ticket_type.id, "ticket type added");

    Ok(ApiResponse::ok("Ticket type created", ticket_type.into()))
}

/// Edit an event in place. Times are validated against each other after
/// merging with the stored values; `major_changes` puts the event back into
/// the approval queue.
pub async fn update_event(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateEventRequest,
) -> AppResult<ApiResponse<Event>> {
    let event = find_event(state, id).await?;
    user.require(Capability::ManageEvent {
        organizer_id: event.organizer_id,
    })?;
    if event.status == EventStatus::Cancelled {
        return Err(Conflict::EventCancelled.into());
    }

    let title = match payload.title.as_deref().map(str::trim) {
        Some("") => return Err(AppError::BadRequest("Title is required".into())),
        Some(title) => Some(title.to_string()),
        None => None,
    };
    let start_time = payload
        .start_time
        .unwrap_or_else(|| event.start_time.with_timezone(&Utc));
    let end_time = payload
        .end_time
        .unwrap_or_else(|| event.end_time.with_timezone(&Utc));
    if start_time >= end_time {
        return Err(AppError::BadRequest("End time must be after start time".into()));
    }
    if matches!(payload.capacity, Some(c) if c <= 0) {
        return Err(AppError::BadRequest("Capacity must be positive".into()));
    }

    let mut active: EventActive = event.into();
    if let Some(title) = title {
        active.title = Set(title);
    }
    if payload.description.is_some() {
        active.description = Set(payload.description);
    }
    if payload.venue.is_some() {
        active.venue = Set(payload.venue);
    }
    if payload.city.is_some() {
        active.city = Set(payload.city);
    }
    if payload.category.is_some() {
        active.category = Set(payload.category);
    }
    if payload.capacity.is_some() {
        active.capacity = Set(payload.capacity);
    }
    active.start_time = Set(start_time.into());
    active.end_time = Set(end_time.into());
    if payload.major_changes {
        active.status = Set(EventStatus::Pending);
    }
    active.updated_at = Set(Utc::now().into());
    let event = active.update(&state.orm).await?;

    tracing::info!(event_id = %event.id, resubmitted = payload.major_changes, "event updated");
    audit::record(
        &state.orm,
        user.user_id,
        "event_update",
        "events",
        serde_json::json!({ "event_id": event.id, "major_changes": payload.major_changes }),
    )
    .await;

    Ok(ApiResponse::ok("Event updated successfully", event.into()))
}

pub async fn cancel_event(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<Event>> {
    let event = find_event(state, id).await?;
    user.require(Capability::ManageEvent {
        organizer_id: event.organizer_id,
    })?;

    let mut active: EventActive = event.into();
    active.status = Set(EventStatus::Cancelled);
    active.updated_at = Set(Utc::now().into());
    let event = active.update(&state.orm).await?;

    tracing::info!(event_id = %event.id, "event cancelled");
    audit::record(
        &state.orm,
        user.user_id,
        "event_cancel",
        "events",
        serde_json::json!({ "event_id": event.id }),
    )
    .await;

    Ok(ApiResponse::ok("Event cancelled", event.into()))
}

/// Remove an event that never sold anything. Events with orders have to be
/// cancelled instead so the order history stays intact.
pub async fn delete_event(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    let event = find_event(state, id).await?;
    user.require(Capability::ManageEvent {
        organizer_id: event.organizer_id,
    })?;

    let orders = Orders::find()
        .filter(OrderCol::EventId.eq(event.id))
        .count(&state.orm)
        .await?;
    if orders > 0 {
        return Err(Conflict::EventHasOrders.into());
    }

    let event_id = event.id;
    event.delete(&state.orm).await?;

    tracing::info!(%event_id, "event deleted");
    audit::record(
        &state.orm,
        user.user_id,
        "event_delete",
        "events",
        serde_json::json!({ "event_id": event_id }),
    )
    .await;

    Ok(ApiResponse::ok(
        "Event deleted",
        serde_json::json!({ "id": event_id }),
    ))
}

async fn find_event(state: &AppState, id: Uuid) -> AppResult<EventModel> {
    Events::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound("Event"))
}
