use chrono::{Duration, Utc};
use event_ticketing_api::{
    config::AppConfig,
    db::{create_orm_conn, run_migrations},
    entity::{
        events::{ActiveModel as EventActive, Column as EventCol, Entity as Events},
        sea_orm_active_enums::{EventStatus, Role},
        ticket_types::ActiveModel as TicketTypeActive,
        users::{ActiveModel as UserActive, Column as UserCol, Entity as Users},
    },
    services::auth_service::hash_password,
};
use rust_decimal::Decimal;
use sea_orm::ActiveValue::NotSet;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set,
};
use uuid::Uuid;

const DEMO_EVENT_TITLE: &str = "RustConf Live";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env()?;

    let orm = create_orm_conn(&config.database_url).await?;
    // Ensure migrations are applied.
    run_migrations(&orm).await?;

    let admin_id = ensure_user(&orm, "admin@example.com", "admin12345", Role::Admin).await?;
    let organizer_id =
        ensure_user(&orm, "organizer@example.com", "organizer123", Role::Organizer).await?;
    let user_id = ensure_user(&orm, "user@example.com", "user12345", Role::User).await?;
    seed_event(&orm, organizer_id).await?;

    println!(
        "Seed completed. Admin ID: {admin_id}, Organizer ID: {organizer_id}, User ID: {user_id}"
    );
    Ok(())
}

async fn ensure_user(
    orm: &DatabaseConnection,
    email: &str,
    password: &str,
    role: Role,
) -> anyhow::Result<Uuid> {
    if let Some(existing) = Users::find()
        .filter(UserCol::Email.eq(email))
        .one(orm)
        .await?
    {
        let id = existing.id;
        let mut active: UserActive = existing.into();
        active.role = Set(role);
        active.update(orm).await?;
        println!("Ensured user {email} (role={role:?})");
        return Ok(id);
    }

    let password_hash = hash_password(password).map_err(|e| anyhow::anyhow!(e.to_string()))?;
    let user = UserActive {
        id: Set(Uuid::new_v4()),
        email: Set(email.to_string()),
        username: Set(email.split('@').next().map(str::to_string)),
        password_hash: Set(password_hash),
        role: Set(role),
        is_active: Set(true),
        created_at: NotSet,
    }
    .insert(orm)
    .await?;

    println!("Ensured user {email} (role={role:?})");
    Ok(user.id)
}

async fn seed_event(orm: &DatabaseConnection, organizer_id: Uuid) -> anyhow::Result<()> {
    let exists = Events::find()
        .filter(EventCol::Title.eq(DEMO_EVENT_TITLE))
        .one(orm)
        .await?;
    if exists.is_some() {
        println!("Demo event already present");
        return Ok(());
    }

    let start = Utc::now() + Duration::days(30);
    let event = EventActive {
        id: Set(Uuid::new_v4()),
        organizer_id: Set(organizer_id),
        title: Set(DEMO_EVENT_TITLE.to_string()),
        description: Set(Some("Two days of talks about systems programming".into())),
        venue: Set(Some("Convention Center Hall A".into())),
        city: Set(Some("Jakarta".into())),
        category: Set(Some("conference".into())),
        start_time: Set(start.into()),
        end_time: Set((start + Duration::hours(8)).into()),
        status: Set(EventStatus::Approved),
        capacity: Set(Some(600)),
        created_at: NotSet,
        updated_at: NotSet,
    }
    .insert(orm)
    .await?;

    let tiers = [
        ("General Admission", Decimal::new(50_00, 2), 500, 10),
        ("VIP", Decimal::new(150_00, 2), 100, 4),
    ];
    for (name, price, quantity, max_per_user) in tiers {
        TicketTypeActive {
            id: Set(Uuid::new_v4()),
            event_id: Set(event.id),
            name: Set(name.to_string()),
            description: Set(None),
            price: Set(price),
            quantity_total: Set(quantity),
            quantity_sold: Set(0),
            sale_start: Set(None),
            sale_end: Set(None),
            max_per_user: Set(max_per_user),
            is_active: Set(true),
            created_at: NotSet,
        }
        .insert(orm)
        .await?;
    }

    println!("Seeded event {DEMO_EVENT_TITLE} ({})", event.id);
    Ok(())
}
