use chrono::Utc;
use sea_orm::ActiveValue::NotSet;
use sea_orm::sea_query::LockType;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseTransaction, DbErr, EntityTrait, QueryFilter,
    QuerySelect, Set, SqlErr, TransactionTrait,
};
use uuid::Uuid;

use crate::{
    audit, domain,
    dto::payments::{
        CallbackOutcome, CreatePaymentRequest, PaymentCallbackRequest, PaymentOrderSummary,
        PaymentResult,
    },
    entity::{
        events::Entity as Events,
        orders::{ActiveModel as OrderActive, Entity as Orders, Model as OrderModel},
        payments::{ActiveModel as PaymentActive, Column as PaymentCol, Entity as Payments, Model as PaymentModel},
        sea_orm_active_enums::{EventStatus, OrderStatus, PaymentRecordStatus, PaymentStatus},
    },
    error::{AppError, AppResult, Conflict},
    middleware::auth::{AuthUser, Capability},
    models::Payment,
    notify,
    response::ApiResponse,
    state::AppState,
};

/// Record a payment for an order.
///
/// `(order_id, provider_ref)` is the idempotency key: a replayed request is
/// rejected as a duplicate and never produces a second payment row. A
/// reference already used with the same provider for another order is
/// rejected the same way, so gateway callbacks always resolve to one payment. With
/// auto-confirm enabled the gateway is treated as having accepted the charge.
pub async fn create_payment(
    state: &AppState,
    user: &AuthUser,
    payload: CreatePaymentRequest,
) -> AppResult<ApiResponse<PaymentResult>> {
    let provider = payload.provider.trim().to_string();
    let provider_ref = payload.provider_ref.trim().to_string();
    if provider.is_empty() {
        return Err(AppError::BadRequest("provider is required".into()));
    }
    if provider_ref.is_empty() {
        return Err(AppError::BadRequest("provider_ref is required".into()));
    }

    let txn = state.orm.begin().await?;

    let order = Orders::find_by_id(payload.order_id)
        .lock(LockType::Update)
        .one(&txn)
        .await?
        .ok_or(AppError::NotFound("Order"))?;

    user.require(Capability::ActOnOrder {
        owner_id: order.user_id,
    })?;

    // A provider reference identifies one charge: it may be replayed for the
    // same order, but never reused by a different one.
    let existing = Payments::find()
        .filter(PaymentCol::ProviderRef.eq(provider_ref.as_str()))
        .filter(
            Condition::any()
                .add(PaymentCol::OrderId.eq(order.id))
                .add(PaymentCol::Provider.eq(provider.as_str())),
        )
        .one(&txn)
        .await?;
    if existing.is_some() {
        return Err(Conflict::DuplicatePayment.into());
    }
    if order.payment_status == PaymentStatus::Completed {
        return Err(Conflict::AlreadyPaid.into());
    }
    if order.order_status == OrderStatus::Cancelled {
        return Err(Conflict::OrderCancelled.into());
    }
    let event = Events::find_by_id(order.event_id)
        .one(&txn)
        .await?
        .ok_or(AppError::NotFound("Event"))?;
    if event.status == EventStatus::Cancelled {
        return Err(Conflict::EventCancelled.into());
    }
    if !domain::amount_matches(payload.amount, order.total_amount) {
        return Err(AppError::BadRequest(
            "Payment amount does not match order total".into(),
        ));
    }

    let raw_payload = serde_json::to_value(&payload).ok();
    let payment = PaymentActive {
        id: Set(Uuid::new_v4()),
        order_id: Set(order.id),
        provider: Set(provider),
        provider_ref: Set(provider_ref),
        amount: Set(payload.amount),
        status: Set(PaymentRecordStatus::Pending),
        raw_payload: Set(raw_payload),
        created_at: NotSet,
        updated_at: NotSet,
    }
    .insert(&txn)
    .await
    .map_err(duplicate_or_db)?;

    let (payment, order) = if state.config.payment_auto_confirm {
        settle(&txn, payment, order, CallbackOutcome::Success).await?
    } else {
        (payment, order)
    };

    txn.commit().await?;

    tracing::info!(
        payment_id = %payment.id,
        order_id = %order.id,
        status = ?payment.status,
        "payment recorded"
    );
    announce(state, &payment, &order).await;
    audit::record(
        &state.orm,
        user.user_id,
        "payment_create",
        "payments",
        serde_json::json!({ "payment_id": payment.id, "order_id": order.id }),
    )
    .await;

    let message = match payment.status {
        PaymentRecordStatus::Success => "Payment processed successfully",
        PaymentRecordStatus::Pending => "Payment awaiting provider confirmation",
        PaymentRecordStatus::Failed => "Payment failed",
    };
    Ok(ApiResponse::ok(message, payment_result(&payment, &order)))
}

/// Apply an asynchronous gateway notification. Replays of a callback that
/// was already applied leave everything untouched and report the stored
/// state.
pub async fn handle_callback(
    state: &AppState,
    provider: &str,
    secret: Option<&str>,
    payload: PaymentCallbackRequest,
) -> AppResult<ApiResponse<PaymentResult>> {
    if let Some(expected) = state.config.payment_callback_secret.as_deref() {
        if secret != Some(expected) {
            return Err(AppError::Unauthorized("Invalid callback signature".into()));
        }
    }

    let txn = state.orm.begin().await?;

    let payment = Payments::find()
        .filter(PaymentCol::Provider.eq(provider))
        .filter(PaymentCol::ProviderRef.eq(payload.provider_ref.as_str()))
        .lock(LockType::Update)
        .one(&txn)
        .await?
        .ok_or(AppError::NotFound("Payment"))?;

    let order = Orders::find_by_id(payment.order_id)
        .lock(LockType::Update)
        .one(&txn)
        .await?
        .ok_or(AppError::NotFound("Order"))?;

    if payment.status != PaymentRecordStatus::Pending {
        txn.rollback().await?;
        tracing::debug!(payment_id = %payment.id, "payment callback replayed");
        return Ok(ApiResponse::ok(
            "Callback already applied",
            payment_result(&payment, &order),
        ));
    }

    let (payment, order) = settle(&txn, payment, order, payload.status).await?;
    txn.commit().await?;

    tracing::info!(
        payment_id = %payment.id,
        order_id = %order.id,
        status = ?payment.status,
        "payment callback applied"
    );
    announce(state, &payment, &order).await;

    Ok(ApiResponse::ok("Callback applied", payment_result(&payment, &order)))
}

pub async fn get_payment(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<Payment>> {
    let payment = Payments::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound("Payment"))?;
    let order = Orders::find_by_id(payment.order_id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound("Order"))?;
    user.require(Capability::ViewOrder {
        owner_id: order.user_id,
    })?;

    Ok(ApiResponse::ok("OK", payment.into()))
}

/// Move a pending payment to its final state and carry the order along.
async fn settle(
    txn: &DatabaseTransaction,
    payment: PaymentModel,
    order: OrderModel,
    outcome: CallbackOutcome,
) -> AppResult<(PaymentModel, OrderModel)> {
    let now = Utc::now();

    let mut payment: PaymentActive = payment.into();
    payment.status = Set(match outcome {
        CallbackOutcome::Success => PaymentRecordStatus::Success,
        CallbackOutcome::Failed => PaymentRecordStatus::Failed,
    });
    payment.updated_at = Set(now.into());
    let payment = payment.update(txn).await?;

    // A cancelled order keeps its state; the payment row records what the
    // provider did and a refund is handled out of band.
    if order.order_status == OrderStatus::Cancelled {
        return Ok((payment, order));
    }

    let mut active: OrderActive = order.into();
    match outcome {
        CallbackOutcome::Success => {
            active.payment_status = Set(PaymentStatus::Completed);
            active.order_status = Set(OrderStatus::Confirmed);
        }
        CallbackOutcome::Failed => {
            active.payment_status = Set(PaymentStatus::Failed);
        }
    }
    active.updated_at = Set(now.into());
    let order = active.update(txn).await?;

    Ok((payment, order))
}

async fn announce(state: &AppState, payment: &PaymentModel, order: &OrderModel) {
    match payment.status {
        PaymentRecordStatus::Success => {
            notify::notify(
                &state.orm,
                order.user_id,
                "Payment Successful!",
                &format!(
                    "Your payment of {} for order {} was successful.",
                    payment.amount, order.reference
                ),
                notify::PAYMENT_SUCCESS,
            )
            .await
        }
        PaymentRecordStatus::Failed => {
            notify::notify(
                &state.orm,
                order.user_id,
                "Payment Failed",
                &format!("Your payment for order {} did not go through.", order.reference),
                notify::PAYMENT_FAILED,
            )
            .await
        }
        PaymentRecordStatus::Pending => {}
    }
}

fn payment_result(payment: &PaymentModel, order: &OrderModel) -> PaymentResult {
    PaymentResult {
        payment_id: payment.id,
        status: payment.status,
        order: PaymentOrderSummary {
            id: order.id,
            reference: order.reference.clone(),
            payment_status: order.payment_status,
        },
    }
}

fn duplicate_or_db(err: DbErr) -> AppError {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => Conflict::DuplicatePayment.into(),
        _ => err.into(),
    }
}
