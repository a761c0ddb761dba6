use chrono::Utc;
use sea_orm::sea_query::LockType;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, JoinType, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, RelationTrait, Set, TransactionTrait,
};
use uuid::Uuid;

use crate::{
    domain,
    dto::tickets::{CheckInResult, TicketDetail, TicketEventSummary, TicketList, TicketVerification},
    entity::{
        events::{Entity as Events, Model as EventModel},
        orders::{Column as OrderCol, Entity as Orders, Model as OrderModel},
        sea_orm_active_enums::{EventStatus, TicketStatus},
        ticket_types::{Entity as TicketTypes, Model as TicketTypeModel},
        tickets::{self, ActiveModel as TicketActive, Column as TicketCol, Entity as Tickets, Model as TicketModel},
    },
    error::{AppError, AppResult, Conflict},
    middleware::auth::{AuthUser, Capability},
    models::Ticket,
    notify,
    qr::{self, QR_CONTENT_TYPE},
    response::{ApiResponse, Meta},
    routes::params::PageQuery,
    state::AppState,
};

pub async fn list_tickets(
    state: &AppState,
    user: &AuthUser,
    query: PageQuery,
) -> AppResult<ApiResponse<TicketList>> {
    let (page, limit, offset) = query.pagination().normalize();

    let finder = Tickets::find()
        .join(JoinType::InnerJoin, tickets::Relation::Orders.def())
        .filter(OrderCol::UserId.eq(user.user_id))
        .order_by_desc(TicketCol::CreatedAt);

    let total = finder.clone().count(&state.orm).await? as i64;
    let items = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(Ticket::from)
        .collect();

    Ok(ApiResponse::success(
        "OK",
        TicketList { items },
        Some(Meta::new(page, limit, total)),
    ))
}

/// Fetch a ticket with its event context. The QR image is rendered and stored
/// the first time anyone looks at the ticket.
pub async fn get_ticket(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<TicketDetail>> {
    let ticket = Tickets::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound("Ticket"))?;
    let (order, ticket_type, event) = load_context(state, &ticket).await?;

    user.require(Capability::ViewTicket {
        owner_id: order.user_id,
        organizer_id: event.organizer_id,
    })?;

    let ticket = if ticket.qr_image_url.is_some() {
        ticket
    } else {
        materialize_qr(state, ticket, event.id).await?
    };

    Ok(ApiResponse::ok(
        "OK",
        TicketDetail {
            ticket: ticket.into(),
            order_reference: order.reference,
            ticket_type: ticket_type.name,
            event: event_summary(&event),
        },
    ))
}

async fn materialize_qr(state: &AppState, ticket: TicketModel, event_id: Uuid) -> AppResult<TicketModel> {
    let payload = qr::ticket_payload(&ticket.code, event_id, ticket.id);
    let image = qr::render_svg(&payload)?;
    let url = state.images.store(image, QR_CONTENT_TYPE).await?;

    let mut active: TicketActive = ticket.into();
    active.qr_image_url = Set(Some(url));
    let ticket = active.update(&state.orm).await?;

    tracing::debug!(ticket_id = %ticket.id, "ticket qr stored");
    Ok(ticket)
}

/// Admit a ticket holder at the door. The ticket row is locked for the
/// duration so a ticket can only ever be scanned in once.
pub async fn check_in(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<CheckInResult>> {
    let txn = state.orm.begin().await?;

    let ticket = Tickets::find_by_id(id)
        .lock(LockType::Update)
        .one(&txn)
        .await?
        .ok_or(AppError::NotFound("Ticket"))?;

    let order = Orders::find_by_id(ticket.order_id)
        .one(&txn)
        .await?
        .ok_or(AppError::NotFound("Order"))?;
    let event = Events::find_by_id(order.event_id)
        .one(&txn)
        .await?
        .ok_or(AppError::NotFound("Event"))?;

    user.require(Capability::CheckInTicket {
        organizer_id: event.organizer_id,
    })?;

    if ticket.checked_in_at.is_some() {
        return Err(Conflict::AlreadyCheckedIn.into());
    }
    if ticket.status != TicketStatus::Valid {
        return Err(Conflict::TicketNotValid.into());
    }
    if event.status == EventStatus::Cancelled {
        return Err(Conflict::EventCancelled.into());
    }

    let now = Utc::now();
    domain::check_in_window(
        now,
        event.start_time.with_timezone(&Utc),
        event.end_time.with_timezone(&Utc),
    )?;

    let mut active: TicketActive = ticket.into();
    active.checked_in_at = Set(Some(now.into()));
    active.status = Set(TicketStatus::Used);
    let ticket = active.update(&txn).await?;

    txn.commit().await?;

    tracing::info!(
        ticket_id = %ticket.id,
        event_id = %event.id,
        checked_in_by = %user.user_id,
        "ticket checked in"
    );
    notify::notify(
        &state.orm,
        order.user_id,
        "Ticket Checked In",
        &format!("Your ticket {} was checked in for {}.", ticket.code, event.title),
        notify::TICKET_CHECKED_IN,
    )
    .await;

    Ok(ApiResponse::ok(
        "Ticket checked in successfully",
        CheckInResult {
            code: ticket.code,
            checked_in_at: now,
        },
    ))
}

/// Look a ticket up by the code printed on it.
pub async fn verify_ticket(
    state: &AppState,
    user: &AuthUser,
    code: &str,
) -> AppResult<ApiResponse<TicketVerification>> {
    let ticket = Tickets::find()
        .filter(TicketCol::Code.eq(code))
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound("Ticket"))?;
    let (order, ticket_type, event) = load_context(state, &ticket).await?;

    user.require(Capability::ViewTicket {
        owner_id: order.user_id,
        organizer_id: event.organizer_id,
    })?;

    Ok(ApiResponse::ok(
        "OK",
        TicketVerification {
            valid: ticket.status == TicketStatus::Valid
                && ticket.checked_in_at.is_none()
                && event.status != EventStatus::Cancelled,
            status: ticket.status,
            checked_in: ticket.checked_in_at.is_some(),
            checked_in_at: ticket.checked_in_at.map(|dt| dt.with_timezone(&Utc)),
            ticket_type: ticket_type.name,
            event: event_summary(&event),
        },
    ))
}

async fn load_context(
    state: &AppState,
    ticket: &TicketModel,
) -> AppResult<(OrderModel, TicketTypeModel, EventModel)> {
    let order = Orders::find_by_id(ticket.order_id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound("Order"))?;
    let ticket_type = TicketTypes::find_by_id(ticket.ticket_type_id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound("Ticket type"))?;
    let event = Events::find_by_id(order.event_id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound("Event"))?;
    Ok((order, ticket_type, event))
}

fn event_summary(event: &EventModel) -> TicketEventSummary {
    TicketEventSummary {
        id: event.id,
        title: event.title.clone(),
        start_time: event.start_time.with_timezone(&Utc),
        end_time: event.end_time.with_timezone(&Utc),
        venue: event.venue.clone(),
    }
}
