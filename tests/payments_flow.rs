// Payment confirmation, idempotency and gateway callbacks.

use event_ticketing_api::{
    dto::payments::{CallbackOutcome, CreatePaymentRequest, PaymentCallbackRequest},
    entity::{
        notifications::{Column as NotificationCol, Entity as Notifications},
        payments::{Column as PaymentCol, Entity as Payments},
        sea_orm_active_enums::{OrderStatus, PaymentRecordStatus, PaymentStatus, Role},
    },
    error::{AppError, Conflict},
    notify,
    services::{event_service, order_service, payment_service},
    state::AppState,
};
use rust_decimal::Decimal;
use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter};
use serial_test::serial;
use uuid::Uuid;

mod common;
use common::{create_ticket_type, create_user, place_order, price, setup_state, setup_state_with, upcoming_event};

fn payment(order_id: Uuid, provider_ref: &str, amount: Decimal) -> CreatePaymentRequest {
    CreatePaymentRequest {
        order_id,
        provider: "mockpay".into(),
        provider_ref: provider_ref.into(),
        amount,
    }
}

async fn payments_for(state: &AppState, order_id: Uuid) -> anyhow::Result<u64> {
    Ok(Payments::find()
        .filter(PaymentCol::OrderId.eq(order_id))
        .count(&state.orm)
        .await?)
}

#[tokio::test]
#[serial]
async fn amount_tolerance_and_replays_are_handled() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };
    let organizer = create_user(&state, Role::Organizer).await?;
    let buyer = create_user(&state, Role::User).await?;
    let event = upcoming_event(&state, &organizer).await?;
    let general = create_ticket_type(&state, event.id, "General", price(10000, 2), 10, 0, 5).await?;
    let order_id = place_order(&state, &buyer, &[(general.id, 1)]).await?;

    let err = payment_service::create_payment(&state, &buyer, payment(order_id, "ref-high", price(10002, 2)))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(ref msg) if msg == "Payment amount does not match order total"));
    assert_eq!(payments_for(&state, order_id).await?, 0);

    let provider_ref = format!("ref-{}", Uuid::new_v4().simple());
    let paid = payment_service::create_payment(&state, &buyer, payment(order_id, &provider_ref, price(10001, 2)))
        .await?
        .data
        .expect("payment result");
    assert_eq!(paid.status, PaymentRecordStatus::Success);
    assert_eq!(paid.order.payment_status, PaymentStatus::Completed);

    let order = order_service::get_order(&state, &buyer, order_id)
        .await?
        .data
        .expect("order detail")
        .order;
    assert_eq!(order.order_status, OrderStatus::Confirmed);

    let err = payment_service::create_payment(&state, &buyer, payment(order_id, &provider_ref, price(10000, 2)))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(Conflict::DuplicatePayment)));

    let other_ref = format!("ref-{}", Uuid::new_v4().simple());
    let err = payment_service::create_payment(&state, &buyer, payment(order_id, &other_ref, price(10000, 2)))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(Conflict::AlreadyPaid)));
    assert_eq!(payments_for(&state, order_id).await?, 1);

    let notified = Notifications::find()
        .filter(NotificationCol::UserId.eq(buyer.user_id))
        .filter(NotificationCol::Kind.eq(notify::PAYMENT_SUCCESS))
        .count(&state.orm)
        .await?;
    assert_eq!(notified, 1);

    let err = order_service::cancel_order(&state, &buyer, order_id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(Conflict::PaidOrder)));

    Ok(())
}

#[tokio::test]
#[serial]
async fn only_the_buyer_pays_and_cancelled_orders_are_refused() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };
    let organizer = create_user(&state, Role::Organizer).await?;
    let buyer = create_user(&state, Role::User).await?;
    let admin = create_user(&state, Role::Admin).await?;
    let event = upcoming_event(&state, &organizer).await?;
    let general = create_ticket_type(&state, event.id, "General", price(5000, 2), 10, 0, 5).await?;
    let order_id = place_order(&state, &buyer, &[(general.id, 2)]).await?;

    let err = payment_service::create_payment(&state, &admin, payment(order_id, "admin-ref", price(10000, 2)))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden));

    let err = payment_service::create_payment(&state, &buyer, payment(Uuid::new_v4(), "ghost", price(100, 2)))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound("Order")));

    order_service::cancel_order(&state, &buyer, order_id).await?;
    let err = payment_service::create_payment(&state, &buyer, payment(order_id, "late", price(10000, 2)))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(Conflict::OrderCancelled)));
    assert_eq!(payments_for(&state, order_id).await?, 0);

    Ok(())
}

#[tokio::test]
#[serial]
async fn gateway_callback_settles_pending_payment_once() -> anyhow::Result<()> {
    let Some(state) = setup_state_with(|config| {
        config.payment_auto_confirm = false;
        config.payment_callback_secret = Some("s3cret".into());
    })
    .await?
    else {
        return Ok(());
    };
    let organizer = create_user(&state, Role::Organizer).await?;
    let buyer = create_user(&state, Role::User).await?;
    let event = upcoming_event(&state, &organizer).await?;
    let general = create_ticket_type(&state, event.id, "General", price(7500, 2), 10, 0, 5).await?;
    let order_id = place_order(&state, &buyer, &[(general.id, 1)]).await?;
    let provider_ref = format!("gw-{}", Uuid::new_v4().simple());

    let pending = payment_service::create_payment(&state, &buyer, payment(order_id, &provider_ref, price(7500, 2)))
        .await?
        .data
        .expect("payment result");
    assert_eq!(pending.status, PaymentRecordStatus::Pending);
    assert_eq!(pending.order.payment_status, PaymentStatus::Pending);

    let callback = || PaymentCallbackRequest {
        provider_ref: provider_ref.clone(),
        status: CallbackOutcome::Success,
    };

    let err = payment_service::handle_callback(&state, "mockpay", Some("wrong"), callback())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Unauthorized(_)));

    let settled = payment_service::handle_callback(&state, "mockpay", Some("s3cret"), callback())
        .await?
        .data
        .expect("callback result");
    assert_eq!(settled.status, PaymentRecordStatus::Success);
    assert_eq!(settled.order.payment_status, PaymentStatus::Completed);

    let replay = payment_service::handle_callback(
        &state,
        "mockpay",
        Some("s3cret"),
        PaymentCallbackRequest {
            provider_ref: provider_ref.clone(),
            status: CallbackOutcome::Failed,
        },
    )
    .await?;
    assert_eq!(replay.message, "Callback already applied");
    let replay = replay.data.expect("callback result");
    assert_eq!(replay.status, PaymentRecordStatus::Success);
    assert_eq!(replay.order.payment_status, PaymentStatus::Completed);

    let notified = Notifications::find()
        .filter(NotificationCol::UserId.eq(buyer.user_id))
        .filter(NotificationCol::Kind.eq(notify::PAYMENT_SUCCESS))
        .count(&state.orm)
        .await?;
    assert_eq!(notified, 1);

    let err = payment_service::handle_callback(
        &state,
        "otherpay",
        Some("s3cret"),
        callback(),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::NotFound("Payment")));

    Ok(())
}

#[tokio::test]
#[serial]
async fn failed_callback_marks_the_order_failed() -> anyhow::Result<()> {
    let Some(state) = setup_state_with(|config| config.payment_auto_confirm = false).await? else {
        return Ok(());
    };
    let organizer = create_user(&state, Role::Organizer).await?;
    let buyer = create_user(&state, Role::User).await?;
    let event = upcoming_event(&state, &organizer).await?;
    let general = create_ticket_type(&state, event.id, "General", price(2000, 2), 10, 0, 5).await?;
    let order_id = place_order(&state, &buyer, &[(general.id, 1)]).await?;
    let provider_ref = format!("gw-{}", Uuid::new_v4().simple());

    payment_service::create_payment(&state, &buyer, payment(order_id, &provider_ref, price(2000, 2))).await?;
    let failed = payment_service::handle_callback(
        &state,
        "mockpay",
        None,
        PaymentCallbackRequest {
            provider_ref,
            status: CallbackOutcome::Failed,
        },
    )
    .await?
    .data
    .expect("callback result");
    assert_eq!(failed.status, PaymentRecordStatus::Failed);
    assert_eq!(failed.order.payment_status, PaymentStatus::Failed);

    let payments = order_service::list_order_payments(&state, &buyer, order_id)
        .await?
        .data
        .expect("payment list");
    assert_eq!(payments.items.len(), 1);
    assert_eq!(payments.items[0].status, PaymentRecordStatus::Failed);

    Ok(())
}

#[tokio::test]
#[serial]
async fn a_provider_reference_belongs_to_one_order() -> anyhow::Result<()> {
    let Some(state) = setup_state_with(|config| config.payment_auto_confirm = false).await? else {
        return Ok(());
    };
    let organizer = create_user(&state, Role::Organizer).await?;
    let first_buyer = create_user(&state, Role::User).await?;
    let second_buyer = create_user(&state, Role::User).await?;
    let event = upcoming_event(&state, &organizer).await?;
    let general = create_ticket_type(&state, event.id, "General", price(4000, 2), 10, 0, 5).await?;
    let first_order = place_order(&state, &first_buyer, &[(general.id, 1)]).await?;
    let second_order = place_order(&state, &second_buyer, &[(general.id, 1)]).await?;
    let shared_ref = format!("shared-{}", Uuid::new_v4().simple());

    payment_service::create_payment(&state, &first_buyer, payment(first_order, &shared_ref, price(4000, 2)))
        .await?;
    let err = payment_service::create_payment(&state, &second_buyer, payment(second_order, &shared_ref, price(4000, 2)))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(Conflict::DuplicatePayment)));
    assert_eq!(payments_for(&state, second_order).await?, 0);

    let settled = payment_service::handle_callback(
        &state,
        "mockpay",
        None,
        PaymentCallbackRequest {
            provider_ref: shared_ref.clone(),
            status: CallbackOutcome::Success,
        },
    )
    .await?
    .data
    .expect("callback result");
    assert_eq!(settled.order.id, first_order);
    assert_eq!(settled.order.payment_status, PaymentStatus::Completed);

    let pending_left = Payments::find()
        .filter(PaymentCol::ProviderRef.eq(shared_ref.as_str()))
        .filter(PaymentCol::Status.eq(PaymentRecordStatus::Pending))
        .count(&state.orm)
        .await?;
    assert_eq!(pending_left, 0);

    Ok(())
}

#[tokio::test]
#[serial]
async fn orders_of_a_cancelled_event_cannot_be_paid() -> anyhow::Result<()> {
    let Some(state) = setup_state().await? else {
        return Ok(());
    };
    let organizer = create_user(&state, Role::Organizer).await?;
    let buyer = create_user(&state, Role::User).await?;
    let event = upcoming_event(&state, &organizer).await?;
    let general = create_ticket_type(&state, event.id, "General", price(2500, 2), 10, 0, 5).await?;
    let order_id = place_order(&state, &buyer, &[(general.id, 1)]).await?;

    event_service::cancel_event(&state, &organizer, event.id).await?;

    let provider_ref = format!("ref-{}", Uuid::new_v4().simple());
    let err = payment_service::create_payment(&state, &buyer, payment(order_id, &provider_ref, price(2500, 2)))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(Conflict::EventCancelled)));
    assert_eq!(err.to_string(), "Event has been cancelled");
    assert_eq!(payments_for(&state, order_id).await?, 0);

    Ok(())
}
