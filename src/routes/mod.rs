use axum::Router;

use crate::state::AppState;

pub mod admin;
pub mod auth;
pub mod doc;
pub mod events;
pub mod health;
pub mod notifications;
pub mod orders;
pub mod params;
pub mod payments;
pub mod tickets;

// Build the API router without binding state; it will be provided at the top level.
pub fn create_api_router() -> Router<AppState> {
    Router::new()
        .nest("/auth", auth::router())
        .nest("/events", events::router())
        .nest("/orders", orders::router())
        .nest("/payments", payments::router())
        .nest("/tickets", tickets::router())
        .nest("/notifications", notifications::router())
        .nest("/admin", admin::router())
}
