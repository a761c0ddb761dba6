// Checkout and cancellation against a real Postgres.

use std::collections::HashSet;

use chrono::{Duration, Utc};
use event_ticketing_api::{
    entity::{
        orders::{Column as OrderCol, Entity as Orders},
        tickets::{Column as TicketCol, Entity as Tickets},
        sea_orm_active_enums::{EventStatus, OrderStatus, PaymentStatus, Role, TicketStatus},
    },
    error::{AppError, Conflict},
    routes::params::OrderListQuery,
    services::order_service,
};
use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter};
use serial_test::serial;

mod common;
use common::{
    cart, create_event, create_ticket_type, create_user, place_order, price, reload_ticket_type,
    setup_state, upcoming_event,
};

#[tokio::test]
#[serial]
async fn availability_and_per_user_limit_are_enforced() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };
    let organizer = create_user(&state, Role::Organizer).await?;
    let buyer = create_user(&state, Role::User).await?;
    let event = upcoming_event(&state, &organizer).await?;
    let vip = create_ticket_type(&state, event.id, "VIP", price(5000, 2), 10, 8, 5).await?;

    let err = order_service::create_order(&state, &buyer, cart(&[(vip.id, 3)]))
        .await
        .unwrap_err();
    assert!(
        matches!(err, AppError::Conflict(Conflict::NotEnoughTickets(ref name)) if name == "VIP"),
        "unexpected error: {err:?}"
    );
    assert_eq!(err.to_string(), "Not enough tickets available for VIP");

    place_order(&state, &buyer, &[(vip.id, 2)]).await?;
    let vip = reload_ticket_type(&state, vip.id).await?;
    assert_eq!(vip.quantity_sold, 10);
    assert_eq!(vip.available(), 0);

    let general = create_ticket_type(&state, event.id, "General", price(2000, 2), 100, 0, 5).await?;
    let err = order_service::create_order(&state, &buyer, cart(&[(general.id, 6)]))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        AppError::Conflict(Conflict::MaxPerUserExceeded { max: 5, .. })
    ));
    assert_eq!(reload_ticket_type(&state, general.id).await?.quantity_sold, 0);

    Ok(())
}

#[tokio::test]
#[serial]
async fn created_order_prices_lines_and_issues_one_ticket_per_unit() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };
    let organizer = create_user(&state, Role::Organizer).await?;
    let buyer = create_user(&state, Role::User).await?;
    let event = upcoming_event(&state, &organizer).await?;
    let general = create_ticket_type(&state, event.id, "General", price(2550, 2), 50, 0, 10).await?;
    let vip = create_ticket_type(&state, event.id, "VIP", price(10000, 2), 10, 0, 4).await?;

    let resp = order_service::create_order(&state, &buyer, cart(&[(general.id, 3), (vip.id, 2)])).await?;
    assert_eq!(resp.message, "Order created successfully");
    let created = resp.data.expect("order data");
    assert!(created.payment_required);
    assert!(created.reference.starts_with("ORD-"));
    assert_eq!(created.total_amount, price(27650, 2));

    let detail = order_service::get_order(&state, &buyer, created.id)
        .await?
        .data
        .expect("order detail");
    assert_eq!(detail.order.payment_status, PaymentStatus::Pending);
    assert_eq!(detail.order.order_status, OrderStatus::Processing);

    let item_total: rust_decimal::Decimal = detail.items.iter().map(|i| i.subtotal).sum();
    assert_eq!(item_total, detail.order.total_amount);
    for item in &detail.items {
        assert_eq!(item.subtotal, item.unit_price * rust_decimal::Decimal::from(item.quantity));
    }

    assert_eq!(detail.tickets.len(), 5);
    assert!(detail.tickets.iter().all(|t| t.status == TicketStatus::Valid));
    let codes: HashSet<_> = detail.tickets.iter().map(|t| t.code.clone()).collect();
    assert_eq!(codes.len(), 5);

    assert_eq!(reload_ticket_type(&state, general.id).await?.quantity_sold, 3);
    assert_eq!(reload_ticket_type(&state, vip.id).await?.quantity_sold, 2);

    let mine = order_service::list_orders(&state, &buyer, OrderListQuery::default())
        .await?
        .data
        .expect("order list");
    assert!(mine.items.iter().any(|o| o.id == created.id));

    let stranger = create_user(&state, Role::User).await?;
    let err = order_service::get_order(&state, &stranger, created.id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden));

    Ok(())
}

#[tokio::test]
#[serial]
async fn failed_line_leaves_no_trace() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };
    let organizer = create_user(&state, Role::Organizer).await?;
    let buyer = create_user(&state, Role::User).await?;
    let event = upcoming_event(&state, &organizer).await?;
    let plenty = create_ticket_type(&state, event.id, "General", price(1000, 2), 100, 0, 10).await?;
    let scarce = create_ticket_type(&state, event.id, "Backstage", price(9000, 2), 2, 1, 10).await?;

    let err = order_service::create_order(&state, &buyer, cart(&[(plenty.id, 4), (scarce.id, 2)]))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(Conflict::NotEnoughTickets(_))));

    assert_eq!(reload_ticket_type(&state, plenty.id).await?.quantity_sold, 0);
    assert_eq!(reload_ticket_type(&state, scarce.id).await?.quantity_sold, 1);
    let orders = Orders::find()
        .filter(OrderCol::UserId.eq(buyer.user_id))
        .count(&state.orm)
        .await?;
    assert_eq!(orders, 0);

    Ok(())
}

#[tokio::test]
#[serial]
async fn cart_rules_reject_mixed_events_and_closed_catalogs() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };
    let organizer = create_user(&state, Role::Organizer).await?;
    let buyer = create_user(&state, Role::User).await?;
    let first = upcoming_event(&state, &organizer).await?;
    let second = upcoming_event(&state, &organizer).await?;
    let a = create_ticket_type(&state, first.id, "A", price(1000, 2), 10, 0, 10).await?;
    let b = create_ticket_type(&state, second.id, "B", price(1000, 2), 10, 0, 10).await?;

    let err = order_service::create_order(&state, &buyer, cart(&[(a.id, 1), (b.id, 1)]))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(Conflict::MixedEvents)));

    let err = order_service::create_order(&state, &buyer, cart(&[]))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));

    let err = order_service::create_order(&state, &buyer, cart(&[(a.id, 0)]))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));

    let err = order_service::create_order(&state, &buyer, cart(&[(uuid::Uuid::new_v4(), 1)]))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound("Ticket type")));

    let start = Utc::now() + Duration::days(3);
    let pending = create_event(&state, &organizer, start, start + Duration::hours(2), EventStatus::Pending).await?;
    let unapproved = create_ticket_type(&state, pending.id, "Early", price(1000, 2), 10, 0, 10).await?;
    let err = order_service::create_order(&state, &buyer, cart(&[(unapproved.id, 1)]))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(Conflict::EventNotOnSale)));
    assert_eq!(reload_ticket_type(&state, unapproved.id).await?.quantity_sold, 0);

    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[serial]
async fn concurrent_checkouts_for_the_last_seat_admit_exactly_one() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };
    let organizer = create_user(&state, Role::Organizer).await?;
    let event = upcoming_event(&state, &organizer).await?;
    let last = create_ticket_type(&state, event.id, "Last seat", price(4200, 2), 1, 0, 1).await?;

    let mut handles = Vec::new();
    for _ in 0..2 {
        let state = state.clone();
        let buyer = create_user(&state, Role::User).await?;
        let ticket_type_id = last.id;
        handles.push(tokio::spawn(async move {
            order_service::create_order(&state, &buyer, cart(&[(ticket_type_id, 1)])).await
        }));
    }

    let mut successes = 0;
    for handle in handles {
        match handle.await? {
            Ok(_) => successes += 1,
            Err(err) => assert!(
                matches!(err, AppError::Conflict(Conflict::NotEnoughTickets(_))),
                "unexpected error: {err:?}"
            ),
        }
    }

    assert_eq!(successes, 1);
    assert_eq!(reload_ticket_type(&state, last.id).await?.quantity_sold, 1);
    Ok(())
}

#[tokio::test]
#[serial]
async fn cancelling_releases_inventory_and_voids_tickets() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };
    let organizer = create_user(&state, Role::Organizer).await?;
    let buyer = create_user(&state, Role::User).await?;
    let event = upcoming_event(&state, &organizer).await?;
    let general = create_ticket_type(&state, event.id, "General", price(1500, 2), 20, 5, 10).await?;

    let order_id = place_order(&state, &buyer, &[(general.id, 3)]).await?;
    assert_eq!(reload_ticket_type(&state, general.id).await?.quantity_sold, 8);

    let stranger = create_user(&state, Role::User).await?;
    let err = order_service::cancel_order(&state, &stranger, order_id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden));

    let cancelled = order_service::cancel_order(&state, &buyer, order_id)
        .await?
        .data
        .expect("cancelled order");
    assert_eq!(cancelled.order_status, OrderStatus::Cancelled);
    assert_eq!(reload_ticket_type(&state, general.id).await?.quantity_sold, 5);

    let detail = order_service::get_order(&state, &buyer, order_id)
        .await?
        .data
        .expect("order detail");
    assert!(detail.tickets.iter().all(|t| t.status == TicketStatus::Cancelled));

    let err = order_service::cancel_order(&state, &buyer, order_id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(Conflict::AlreadyCancelled)));
    assert_eq!(reload_ticket_type(&state, general.id).await?.quantity_sold, 5);

    Ok(())
}

#[tokio::test]
#[serial]
async fn orders_cannot_be_cancelled_once_the_event_started() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };
    let organizer = create_user(&state, Role::Organizer).await?;
    let buyer = create_user(&state, Role::User).await?;
    let start = Utc::now() - Duration::minutes(30);
    let event = create_event(&state, &organizer, start, start + Duration::hours(3), EventStatus::Approved).await?;
    let general = create_ticket_type(&state, event.id, "Walk-in", price(1000, 2), 10, 0, 10).await?;

    let order_id = place_order(&state, &buyer, &[(general.id, 1)]).await?;
    let err = order_service::cancel_order(&state, &buyer, order_id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(Conflict::EventStarted)));
    assert_eq!(reload_ticket_type(&state, general.id).await?.quantity_sold, 1);

    Ok(())
}

#[tokio::test]
#[serial]
async fn very_large_orders_issue_every_ticket() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };
    let organizer = create_user(&state, Role::Organizer).await?;
    let buyer = create_user(&state, Role::User).await?;
    let event = upcoming_event(&state, &organizer).await?;
    let stadium = create_ticket_type(&state, event.id, "Stadium", price(100, 2), 20_000, 0, 20_000).await?;

    let order_id = place_order(&state, &buyer, &[(stadium.id, 10_001)]).await?;

    let issued = Tickets::find()
        .filter(TicketCol::OrderId.eq(order_id))
        .count(&state.orm)
        .await?;
    assert_eq!(issued, 10_001);
    assert_eq!(reload_ticket_type(&state, stadium.id).await?.quantity_sold, 10_001);

    Ok(())
}
