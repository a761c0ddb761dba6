use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};
use uuid::Uuid;

use crate::{
    dto::notifications::NotificationList,
    entity::notifications::{ActiveModel as NotificationActive, Column as NotificationCol, Entity as Notifications},
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::Notification,
    response::{ApiResponse, Meta},
    routes::params::PageQuery,
    state::AppState,
};

pub async fn list_notifications(
    state: &AppState,
    user: &AuthUser,
    query: PageQuery,
) -> AppResult<ApiResponse<NotificationList>> {
    let (page, limit, offset) = query.pagination().normalize();

    let finder = Notifications::find()
        .filter(NotificationCol::UserId.eq(user.user_id))
        .order_by_desc(NotificationCol::CreatedAt);

    let total = finder.clone().count(&state.orm).await? as i64;
    let items = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(Notification::from)
        .collect();

    Ok(ApiResponse::success(
        "OK",
        NotificationList { items },
        Some(Meta::new(page, limit, total)),
    ))
}

/// Someone else's notification is reported as missing rather than forbidden.
pub async fn mark_read(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<Notification>> {
    let notification = Notifications::find_by_id(id)
        .filter(NotificationCol::UserId.eq(user.user_id))
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound("Notification"))?;

    if notification.is_read {
        return Ok(ApiResponse::ok("Notification marked as read", notification.into()));
    }

    let mut active: NotificationActive = notification.into();
    active.is_read = Set(true);
    let notification = active.update(&state.orm).await?;

    Ok(ApiResponse::ok("Notification marked as read", notification.into()))
}
