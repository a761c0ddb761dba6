use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::{
    audit,
    dto::{
        admin::{
            DecisionAction, EventDecisionRequest, EventStats, OrderStats, RoleCount, Statistics,
            TicketStats, UpdateRoleRequest, UpdateUserStatusRequest, UserStats,
        },
        events::EventList,
    },
    entity::{
        events::{ActiveModel as EventActive, Column as EventCol, Entity as Events},
        sea_orm_active_enums::{EventStatus, Role},
        users::{ActiveModel as UserActive, Entity as Users},
    },
    error::{AppError, AppResult, Conflict},
    middleware::auth::{AuthUser, Capability},
    models::{Event, User},
    notify,
    response::{ApiResponse, Meta},
    routes::params::PageQuery,
    state::AppState,
};

pub async fn list_pending_events(
    state: &AppState,
    user: &AuthUser,
    query: PageQuery,
) -> AppResult<ApiResponse<EventList>> {
    user.require(Capability::Administer)?;
    let (page, limit, offset) = query.pagination().normalize();

    let finder = Events::find()
        .filter(EventCol::Status.eq(EventStatus::Pending))
        .order_by_asc(EventCol::CreatedAt);

    let total = finder.clone().count(&state.orm).await? as i64;
    let items = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(Event::from)
        .collect();

    let meta = Meta::new(page, limit, total);
    Ok(ApiResponse::success("Pending events", EventList { items }, Some(meta)))
}

/// Approve or reject an event that is waiting for review and tell its
/// organizer.
pub async fn decide_event(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: EventDecisionRequest,
) -> AppResult<ApiResponse<Event>> {
    user.require(Capability::Administer)?;

    let event = Events::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound("Event"))?;
    if event.status != EventStatus::Pending {
        return Err(Conflict::EventNotPending.into());
    }

    let organizer_id = event.organizer_id;
    let mut active: EventActive = event.into();
    active.status = Set(match payload.action {
        DecisionAction::Approve => EventStatus::Approved,
        DecisionAction::Reject => EventStatus::Rejected,
    });
    active.updated_at = Set(Utc::now().into());
    let event = active.update(&state.orm).await?;

    let comment = payload
        .comment
        .as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty());
    let (title, kind, mut message) = match payload.action {
        DecisionAction::Approve => (
            "Event Approved",
            notify::EVENT_APPROVED,
            format!("Your event \"{}\" has been approved and is now on sale.", event.title),
        ),
        DecisionAction::Reject => (
            "Event Rejected",
            notify::EVENT_REJECTED,
            format!("Your event \"{}\" has been rejected.", event.title),
        ),
    };
    if let Some(comment) = comment {
        message.push_str(&format!(" Comment: {comment}"));
    }
    notify::notify(&state.orm, organizer_id, title, &message, kind).await;

    tracing::info!(event_id = %event.id, action = ?payload.action, "event reviewed");
    audit::record(
        &state.orm,
        user.user_id,
        "event_decision",
        "events",
        serde_json::json!({ "event_id": event.id, "action": payload.action, "comment": comment }),
    )
    .await;

    Ok(ApiResponse::ok("Event reviewed", event.into()))
}

pub async fn update_role(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateRoleRequest,
) -> AppResult<ApiResponse<User>> {
    user.require(Capability::Administer)?;
    if id == user.user_id && payload.role != Role::Admin {
        return Err(AppError::BadRequest("Administrators cannot demote themselves".into()));
    }

    let target = Users::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound("User"))?;
    let previous = target.role;

    let mut active: UserActive = target.into();
    active.role = Set(payload.role);
    let updated = active.update(&state.orm).await?;

    if previous != updated.role {
        notify::notify(
            &state.orm,
            updated.id,
            "Role Updated",
            &format!("Your role has been changed to {}.", role_name(updated.role)),
            notify::ROLE_CHANGE,
        )
        .await;
    }

    audit::record(
        &state.orm,
        user.user_id,
        "user_role_update",
        "users",
        serde_json::json!({ "user_id": updated.id, "from": previous, "to": updated.role }),
    )
    .await;

    Ok(ApiResponse::ok("Role updated", updated.into()))
}

/// Enable or disable an account. Disabled accounts cannot log in.
pub async fn update_user_status(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateUserStatusRequest,
) -> AppResult<ApiResponse<User>> {
    user.require(Capability::Administer)?;
    if id == user.user_id && !payload.is_active {
        return Err(AppError::BadRequest(
            "Administrators cannot deactivate themselves".into(),
        ));
    }

    let target = Users::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound("User"))?;
    let was_active = target.is_active;

    let mut active: UserActive = target.into();
    active.is_active = Set(payload.is_active);
    let updated = active.update(&state.orm).await?;

    let action = if updated.is_active { "activated" } else { "deactivated" };
    if was_active != updated.is_active {
        notify::notify(
            &state.orm,
            updated.id,
            "Account Status Changed",
            &format!("Your account has been {action} by an administrator."),
            notify::ACCOUNT_STATUS,
        )
        .await;
    }

    tracing::info!(user_id = %updated.id, is_active = updated.is_active, "user status updated");
    audit::record(
        &state.orm,
        user.user_id,
        "user_status_update",
        "users",
        serde_json::json!({ "user_id": updated.id, "is_active": updated.is_active }),
    )
    .await;

    Ok(ApiResponse::ok(format!("User account {action}"), updated.into()))
}

fn role_name(role: Role) -> &'static str {
    match role {
        Role::User => "user",
        Role::Organizer => "organizer",
        Role::Admin => "admin",
    }
}

#[derive(Debug, FromRow)]
struct RoleRow {
    role: String,
    count: i64,
}

#[derive(Debug, FromRow)]
struct EventRow {
    total: i64,
    pending: i64,
    approved: i64,
    rejected: i64,
    cancelled: i64,
}

#[derive(Debug, FromRow)]
struct OrderRow {
    total: i64,
    completed: i64,
    cancelled: i64,
    revenue: Decimal,
}

#[derive(Debug, FromRow)]
struct TicketRow {
    issued: i64,
    checked_in: i64,
    cancelled: i64,
}

/// Platform-wide counters. Aggregates go straight to Postgres through sqlx
/// on the ORM's pool.
pub async fn statistics(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<Statistics>> {
    user.require(Capability::Administer)?;
    let pool = state.orm.get_postgres_connection_pool();

    let stats = Statistics {
        users: user_stats(pool).await?,
        events: event_stats(pool).await?,
        orders: order_stats(pool).await?,
        tickets: ticket_stats(pool).await?,
    };

    Ok(ApiResponse::ok("Statistics", stats))
}

async fn user_stats(pool: &PgPool) -> AppResult<UserStats> {
    let (total, active): (i64, i64) = sqlx::query_as(
        "SELECT COUNT(*), COUNT(*) FILTER (WHERE is_active) FROM users",
    )
    .fetch_one(pool)
    .await?;

    let by_role = sqlx::query_as::<_, RoleRow>(
        "SELECT role, COUNT(*) AS count FROM users GROUP BY role ORDER BY role",
    )
    .fetch_all(pool)
    .await?
    .into_iter()
    .map(|row| RoleCount {
        role: row.role,
        count: row.count,
    })
    .collect();

    Ok(UserStats {
        total,
        active,
        by_role,
    })
}

async fn event_stats(pool: &PgPool) -> AppResult<EventStats> {
    let row = sqlx::query_as::<_, EventRow>(
        r#"
        SELECT
            COUNT(*) AS total,
            COUNT(*) FILTER (WHERE status = 'pending') AS pending,
            COUNT(*) FILTER (WHERE status = 'approved') AS approved,
            COUNT(*) FILTER (WHERE status = 'rejected') AS rejected,
            COUNT(*) FILTER (WHERE status = 'cancelled') AS cancelled
        FROM events
        "#,
    )
    .fetch_one(pool)
    .await?;

    Ok(EventStats {
        total: row.total,
        pending: row.pending,
        approved: row.approved,
        rejected: row.rejected,
        cancelled: row.cancelled,
    })
}

async fn order_stats(pool: &PgPool) -> AppResult<OrderStats> {
    let row = sqlx::query_as::<_, OrderRow>(
        r#"
        SELECT
            COUNT(*) AS total,
            COUNT(*) FILTER (WHERE payment_status = 'completed') AS completed,
            COUNT(*) FILTER (WHERE order_status = 'cancelled') AS cancelled,
            COALESCE(SUM(total_amount) FILTER (WHERE payment_status = 'completed'), 0) AS revenue
        FROM orders
        "#,
    )
    .fetch_one(pool)
    .await?;

    Ok(OrderStats {
        total: row.total,
        completed: row.completed,
        cancelled: row.cancelled,
        revenue: row.revenue,
    })
}

async fn ticket_stats(pool: &PgPool) -> AppResult<TicketStats> {
    let row = sqlx::query_as::<_, TicketRow>(
        r#"
        SELECT
            COUNT(*) AS issued,
            COUNT(*) FILTER (WHERE checked_in_at IS NOT NULL) AS checked_in,
            COUNT(*) FILTER (WHERE status = 'cancelled') AS cancelled
        FROM tickets
        "#,
    )
    .fetch_one(pool)
    .await?;

    Ok(TicketStats {
        issued: row.issued,
        checked_in: row.checked_in,
        cancelled: row.cancelled,
    })
}
