use std::collections::HashMap;

use chrono::Utc;
use sea_orm::ActiveValue::NotSet;
use sea_orm::sea_query::{Expr, LockType};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseTransaction, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use uuid::Uuid;

use crate::{
    audit,
    domain::{self, PricedCart},
    dto::orders::{CreateOrderRequest, OrderCreated, OrderDetail, OrderList, PaymentList},
    entity::{
        events::Entity as Events,
        order_items::{ActiveModel as OrderItemActive, Column as OrderItemCol, Entity as OrderItems},
        orders::{ActiveModel as OrderActive, Column as OrderCol, Entity as Orders},
        payments::{Column as PaymentCol, Entity as Payments},
        sea_orm_active_enums::{EventStatus, OrderStatus, PaymentStatus, TicketStatus},
        ticket_types::{Column as TicketTypeCol, Entity as TicketTypes, Model as TicketTypeModel},
        tickets::{ActiveModel as TicketActive, Column as TicketCol, Entity as Tickets},
    },
    error::{AppError, AppResult, Conflict},
    middleware::auth::{AuthUser, Capability},
    models::Order,
    response::{ApiResponse, Meta},
    routes::params::{OrderListQuery, SortOrder},
    state::AppState,
};

const TICKET_INSERT_BATCH: usize = 1000;

/// Turn a cart into an order with one ticket per purchased unit.
///
/// Every referenced ticket type is locked `FOR UPDATE` (ascending id, so two
/// checkouts never wait on each other in opposite order) before availability
/// is read, and the counter itself only moves through a conditional update.
/// Any failure drops the transaction and nothing is written.
pub async fn create_order(
    state: &AppState,
    user: &AuthUser,
    payload: CreateOrderRequest,
) -> AppResult<ApiResponse<OrderCreated>> {
    if payload.cart_items.is_empty() {
        return Err(AppError::BadRequest("Cart is empty".into()));
    }

    let txn = state.orm.begin().await?;

    let mut ids: Vec<Uuid> = payload.cart_items.iter().map(|i| i.ticket_type_id).collect();
    ids.sort();
    ids.dedup();

    let catalog: HashMap<Uuid, TicketTypeModel> = TicketTypes::find()
        .filter(TicketTypeCol::Id.is_in(ids))
        .order_by_asc(TicketTypeCol::Id)
        .lock(LockType::Update)
        .all(&txn)
        .await?
        .into_iter()
        .map(|tt| (tt.id, tt))
        .collect();

    let priced = domain::price_cart(&payload.cart_items, &catalog, Utc::now())?;

    let event = Events::find_by_id(priced.event_id)
        .one(&txn)
        .await?
        .ok_or(AppError::NotFound("Event"))?;
    if event.status != EventStatus::Approved {
        return Err(Conflict::EventNotOnSale.into());
    }

    let order = OrderActive {
        id: Set(Uuid::new_v4()),
        user_id: Set(user.user_id),
        event_id: Set(priced.event_id),
        reference: Set(domain::order_reference()),
        total_amount: Set(priced.total),
        payment_status: Set(PaymentStatus::Pending),
        order_status: Set(OrderStatus::Processing),
        created_at: NotSet,
        updated_at: NotSet,
    }
    .insert(&txn)
    .await?;

    issue_lines(&txn, order.id, &priced).await?;

    txn.commit().await?;

    tracing::info!(
        order_id = %order.id,
        reference = %order.reference,
        tickets = priced.ticket_count(),
        "order created"
    );
    audit::record(
        &state.orm,
        user.user_id,
        "order_create",
        "orders",
        serde_json::json!({ "order_id": order.id, "total_amount": order.total_amount }),
    )
    .await;

    Ok(ApiResponse::ok(
        "Order created successfully",
        OrderCreated {
            id: order.id,
            reference: order.reference,
            total_amount: order.total_amount,
            payment_required: true,
        },
    ))
}

async fn issue_lines(txn: &DatabaseTransaction, order_id: Uuid, priced: &PricedCart) -> AppResult<()> {
    let mut tickets = Vec::with_capacity(priced.ticket_count().max(0) as usize);

    for line in &priced.lines {
        OrderItemActive {
            id: Set(Uuid::new_v4()),
            order_id: Set(order_id),
            ticket_type_id: Set(line.ticket_type_id),
            quantity: Set(line.quantity),
            unit_price: Set(line.unit_price),
            subtotal: Set(line.subtotal),
            created_at: NotSet,
        }
        .insert(txn)
        .await?;

        // sold + q <= total, written as sold <= total - q
        let reserved = TicketTypes::update_many()
            .col_expr(
                TicketTypeCol::QuantitySold,
                Expr::col(TicketTypeCol::QuantitySold).add(line.quantity),
            )
            .filter(TicketTypeCol::Id.eq(line.ticket_type_id))
            .filter(
                Expr::col(TicketTypeCol::QuantitySold)
                    .lte(Expr::col(TicketTypeCol::QuantityTotal).sub(line.quantity)),
            )
            .exec(txn)
            .await?;
        if reserved.rows_affected == 0 {
            return Err(Conflict::NotEnoughTickets(line.name.clone()).into());
        }

        for _ in 0..line.quantity {
            tickets.push(TicketActive {
                id: Set(Uuid::new_v4()),
                order_id: Set(order_id),
                ticket_type_id: Set(line.ticket_type_id),
                code: Set(domain::ticket_code()),
                status: Set(TicketStatus::Valid),
                checked_in_at: Set(None),
                qr_image_url: Set(None),
                created_at: NotSet,
            });
        }
    }

    // Postgres caps a statement at 65535 bind parameters.
    for batch in tickets.chunks(TICKET_INSERT_BATCH) {
        Tickets::insert_many(batch.to_vec()).exec(txn).await?;
    }
    Ok(())
}

/// Cancel an unpaid order before its event starts and hand the seats back.
pub async fn cancel_order(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<Order>> {
    let txn = state.orm.begin().await?;

    let order = Orders::find_by_id(id)
        .lock(LockType::Update)
        .one(&txn)
        .await?
        .ok_or(AppError::NotFound("Order"))?;

    user.require(Capability::ActOnOrder {
        owner_id: order.user_id,
    })?;

    if order.order_status == OrderStatus::Cancelled {
        return Err(Conflict::AlreadyCancelled.into());
    }
    if order.payment_status == PaymentStatus::Completed {
        return Err(Conflict::PaidOrder.into());
    }

    let event = Events::find_by_id(order.event_id)
        .one(&txn)
        .await?
        .ok_or(AppError::NotFound("Event"))?;
    if event.start_time <= Utc::now() {
        return Err(Conflict::EventStarted.into());
    }

    let items = OrderItems::find()
        .filter(OrderItemCol::OrderId.eq(order.id))
        .order_by_asc(OrderItemCol::TicketTypeId)
        .all(&txn)
        .await?;

    for item in &items {
        let released = TicketTypes::update_many()
            .col_expr(
                TicketTypeCol::QuantitySold,
                Expr::col(TicketTypeCol::QuantitySold).sub(item.quantity),
            )
            .filter(TicketTypeCol::Id.eq(item.ticket_type_id))
            .filter(TicketTypeCol::QuantitySold.gte(item.quantity))
            .exec(&txn)
            .await?;
        if released.rows_affected == 0 {
            return Err(AppError::Internal(anyhow::anyhow!(
                "inventory underflow releasing ticket type {}",
                item.ticket_type_id
            )));
        }
    }

    Tickets::update_many()
        .col_expr(TicketCol::Status, Expr::value(TicketStatus::Cancelled))
        .filter(TicketCol::OrderId.eq(order.id))
        .exec(&txn)
        .await?;

    let mut active: OrderActive = order.into();
    active.order_status = Set(OrderStatus::Cancelled);
    active.updated_at = Set(Utc::now().into());
    let order = active.update(&txn).await?;

    txn.commit().await?;

    tracing::info!(order_id = %order.id, "order cancelled");
    audit::record(
        &state.orm,
        user.user_id,
        "order_cancel",
        "orders",
        serde_json::json!({ "order_id": order.id }),
    )
    .await;

    Ok(ApiResponse::ok("Order cancelled successfully", order.into()))
}

pub async fn list_orders(
    state: &AppState,
    user: &AuthUser,
    query: OrderListQuery,
) -> AppResult<ApiResponse<OrderList>> {
    let condition = Condition::all().add(OrderCol::UserId.eq(user.user_id));
    find_orders(state, condition, query).await
}

/// Orders across all buyers, for administrators.
pub async fn list_all_orders(
    state: &AppState,
    user: &AuthUser,
    query: OrderListQuery,
) -> AppResult<ApiResponse<OrderList>> {
    user.require(Capability::Administer)?;
    find_orders(state, Condition::all(), query).await
}

async fn find_orders(
    state: &AppState,
    mut condition: Condition,
    query: OrderListQuery,
) -> AppResult<ApiResponse<OrderList>> {
    let (page, limit, offset) = query.pagination().normalize();
    if let Some(status) = query.order_status {
        condition = condition.add(OrderCol::OrderStatus.eq(status));
    }
    if let Some(status) = query.payment_status {
        condition = condition.add(OrderCol::PaymentStatus.eq(status));
    }

    let mut finder = Orders::find().filter(condition);
    finder = match query.sort_order.unwrap_or(SortOrder::Desc) {
        SortOrder::Asc => finder.order_by_asc(OrderCol::CreatedAt),
        SortOrder::Desc => finder.order_by_desc(OrderCol::CreatedAt),
    };

    let total = finder.clone().count(&state.orm).await? as i64;

    let orders = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(Order::from)
        .collect();

    Ok(ApiResponse::success(
        "OK",
        OrderList { items: orders },
        Some(Meta::new(page, limit, total)),
    ))
}

pub async fn get_order(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<OrderDetail>> {
    let order = Orders::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound("Order"))?;
    user.require(Capability::ViewOrder {
        owner_id: order.user_id,
    })?;

    let items = OrderItems::find()
        .filter(OrderItemCol::OrderId.eq(order.id))
        .all(&state.orm)
        .await?
        .into_iter()
        .map(Into::into)
        .collect();

    let tickets = Tickets::find()
        .filter(TicketCol::OrderId.eq(order.id))
        .order_by_asc(TicketCol::CreatedAt)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(Into::into)
        .collect();

    Ok(ApiResponse::ok(
        "OK",
        OrderDetail {
            order: order.into(),
            items,
            tickets,
        },
    ))
}

pub async fn list_order_payments(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<PaymentList>> {
    let order = Orders::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound("Order"))?;
    user.require(Capability::ViewOrder {
        owner_id: order.user_id,
    })?;

    let payments = Payments::find()
        .filter(PaymentCol::OrderId.eq(order.id))
        .order_by_asc(PaymentCol::CreatedAt)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(Into::into)
        .collect();

    Ok(ApiResponse::ok("OK", PaymentList { items: payments }))
}
