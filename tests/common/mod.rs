// Shared fixtures for the database-backed integration tests.
#![allow(dead_code)]

use chrono::{DateTime, Duration, Utc};
use event_ticketing_api::{
    config::AppConfig,
    db::{create_orm_conn, run_migrations},
    dto::orders::{CartItemRequest, CreateOrderRequest},
    entity::{
        events::{ActiveModel as EventActive, Model as EventModel},
        sea_orm_active_enums::{EventStatus, Role},
        ticket_types::{ActiveModel as TicketTypeActive, Entity as TicketTypes, Model as TicketTypeModel},
        users::ActiveModel as UserActive,
    },
    middleware::auth::AuthUser,
    services::order_service,
    state::AppState,
};
use rust_decimal::Decimal;
use sea_orm::ActiveValue::NotSet;
use sea_orm::{ActiveModelTrait, EntityTrait, Set};
use uuid::Uuid;

pub fn database_url() -> Option<String> {
    std::env::var("TEST_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .ok()
}

/// Connected, migrated state, or `None` when no database is configured.
pub async fn setup_state() -> anyhow::Result<Option<AppState>> {
    setup_state_with(|_| {}).await
}

pub async fn setup_state_with(
    configure: impl FnOnce(&mut AppConfig),
) -> anyhow::Result<Option<AppState>> {
    let Some(database_url) = database_url() else {
        eprintln!("Skipping test: set TEST_DATABASE_URL or DATABASE_URL to run integration tests.");
        return Ok(None);
    };

    let orm = create_orm_conn(&database_url).await?;
    run_migrations(&orm).await?;

    let mut config = AppConfig::for_tests(database_url);
    configure(&mut config);
    Ok(Some(AppState::new(orm, config)))
}

pub fn unique_email(prefix: &str) -> String {
    format!("{}{}@example.com", prefix, Uuid::new_v4().simple())
}

pub async fn create_user(state: &AppState, role: Role) -> anyhow::Result<AuthUser> {
    let user = UserActive {
        id: Set(Uuid::new_v4()),
        email: Set(unique_email("fixture")),
        username: Set(None),
        password_hash: Set("dummy".into()),
        role: Set(role),
        is_active: Set(true),
        created_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    Ok(AuthUser {
        user_id: user.id,
        role: user.role,
    })
}

pub async fn create_event(
    state: &AppState,
    organizer: &AuthUser,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    status: EventStatus,
) -> anyhow::Result<EventModel> {
    let event = EventActive {
        id: Set(Uuid::new_v4()),
        organizer_id: Set(organizer.user_id),
        title: Set(format!("Fixture event {}", Uuid::new_v4().simple())),
        description: Set(None),
        venue: Set(Some("Main Hall".into())),
        city: Set(Some("Testville".into())),
        category: Set(Some("music".into())),
        start_time: Set(start.into()),
        end_time: Set(end.into()),
        status: Set(status),
        capacity: Set(None),
        created_at: NotSet,
        updated_at: NotSet,
    }
    .insert(&state.orm)
    .await?;
    Ok(event)
}

/// An approved event one week out.
pub async fn upcoming_event(state: &AppState, organizer: &AuthUser) -> anyhow::Result<EventModel> {
    let start = Utc::now() + Duration::days(7);
    create_event(state, organizer, start, start + Duration::hours(4), EventStatus::Approved).await
}

pub async fn create_ticket_type(
    state: &AppState,
    event_id: Uuid,
    name: &str,
    price: Decimal,
    total: i32,
    sold: i32,
    max_per_user: i32,
) -> anyhow::Result<TicketTypeModel> {
    let ticket_type = TicketTypeActive {
        id: Set(Uuid::new_v4()),
        event_id: Set(event_id),
        name: Set(name.to_string()),
        description: Set(None),
        price: Set(price),
        quantity_total: Set(total),
        quantity_sold: Set(sold),
        sale_start: Set(None),
        sale_end: Set(None),
        max_per_user: Set(max_per_user),
        is_active: Set(true),
        created_at: NotSet,
    }
    .insert(&state.orm)
    .await?;
    Ok(ticket_type)
}

pub async fn reload_ticket_type(state: &AppState, id: Uuid) -> anyhow::Result<TicketTypeModel> {
    TicketTypes::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or_else(|| anyhow::anyhow!("ticket type {id} disappeared"))
}

pub fn cart(lines: &[(Uuid, i32)]) -> CreateOrderRequest {
    CreateOrderRequest {
        cart_items: lines
            .iter()
            .map(|(ticket_type_id, quantity)| CartItemRequest {
                ticket_type_id: *ticket_type_id,
                quantity: *quantity,
            })
            .collect(),
    }
}

/// Place an order and return its id.
pub async fn place_order(
    state: &AppState,
    buyer: &AuthUser,
    lines: &[(Uuid, i32)],
) -> anyhow::Result<Uuid> {
    let resp = order_service::create_order(state, buyer, cart(lines)).await?;
    let created = resp
        .data
        .ok_or_else(|| anyhow::anyhow!("order response without data"))?;
    Ok(created.id)
}

pub fn price(units: i64, scale: u32) -> Decimal {
    Decimal::new(units, scale)
}
