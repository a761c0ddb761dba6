use sea_orm::{ActiveModelTrait, ActiveValue::NotSet, ConnectionTrait, Set};
use uuid::Uuid;

use crate::{entity::notifications::ActiveModel as NotificationActive, error::AppResult};

pub const PAYMENT_SUCCESS: &str = "payment_success";
pub const PAYMENT_FAILED: &str = "payment_failed";
pub const TICKET_CHECKED_IN: &str = "ticket_checked_in";
pub const EVENT_APPROVED: &str = "event_approved";
pub const EVENT_REJECTED: &str = "event_rejected";
pub const ROLE_CHANGE: &str = "role_change";
pub const ACCOUNT_STATUS: &str = "account_status";
pub const WELCOME: &str = "welcome";

pub async fn create_notification<C: ConnectionTrait>(
    conn: &C,
    user_id: Uuid,
    title: &str,
    message: &str,
    kind: &str,
) -> AppResult<()> {
    NotificationActive {
        id: Set(Uuid::new_v4()),
        user_id: Set(user_id),
        title: Set(title.to_string()),
        message: Set(message.to_string()),
        kind: Set(kind.to_string()),
        is_read: Set(false),
        created_at: NotSet,
    }
    .insert(conn)
    .await?;
    Ok(())
}

/// Fire-and-forget delivery: the caller's work is already committed and must
/// not be undone because a notification could not be written.
pub async fn notify<C: ConnectionTrait>(
    conn: &C,
    user_id: Uuid,
    title: &str,
    message: &str,
    kind: &str,
) {
    if let Err(err) = create_notification(conn, user_id, title, message, kind).await {
        tracing::warn!(error = %err, %user_id, kind, "notification failed");
    }
}
