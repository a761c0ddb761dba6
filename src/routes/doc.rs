use utoipa::{
    Modify, OpenApi,
    openapi::{
        self,
        OpenApi as OpenApiSpec,
        security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    },
};
use utoipa_scalar::{Scalar, Servable};

use crate::{
    dto::{
        admin::{
            DecisionAction, EventDecisionRequest, EventStats, OrderStats, RoleCount, Statistics,
            TicketStats, UpdateRoleRequest, UpdateUserStatusRequest, UserStats,
        },
        auth::{LoginRequest, LoginResponse, RegisterRequest},
        events::{
            CreateEventRequest, CreateTicketTypeRequest, EventDetail, EventList, UpdateEventRequest,
        },
        notifications::NotificationList,
        orders::{CartItemRequest, CreateOrderRequest, OrderCreated, OrderDetail, OrderList, PaymentList},
        payments::{
            CallbackOutcome, CreatePaymentRequest, PaymentCallbackRequest, PaymentOrderSummary,
            PaymentResult,
        },
        tickets::{CheckInResult, TicketDetail, TicketEventSummary, TicketList, TicketVerification},
    },
    entity::sea_orm_active_enums::{
        EventStatus, OrderStatus, PaymentRecordStatus, PaymentStatus, Role, TicketStatus,
    },
    models::{Event, Notification, Order, OrderItem, Payment, Ticket, TicketType, User},
    response::{ApiResponse, Meta},
    routes::{admin, auth, events, health, notifications, orders, params, payments, tickets},
};

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        auth::register,
        auth::login,
        auth::me,
        events::list_events,
        events::get_event,
        events::create_event,
        events::update_event,
        events::add_ticket_type,
        events::cancel_event,
        events::delete_event,
        orders::create_order,
        orders::list_orders,
        orders::get_order,
        orders::cancel_order,
        orders::list_order_payments,
        payments::create_payment,
        payments::payment_callback,
        payments::get_payment,
        tickets::list_tickets,
        tickets::get_ticket,
        tickets::check_in,
        tickets::verify_ticket,
        notifications::list_notifications,
        notifications::mark_read,
        admin::list_pending_events,
        admin::decide_event,
        admin::update_user_role,
        admin::update_user_status,
        admin::list_all_orders,
        admin::statistics
    ),
    components(
        schemas(
            Role,
            EventStatus,
            OrderStatus,
            PaymentStatus,
            PaymentRecordStatus,
            TicketStatus,
            User,
            Event,
            TicketType,
            Order,
            OrderItem,
            Ticket,
            Payment,
            Notification,
            RegisterRequest,
            LoginRequest,
            LoginResponse,
            CreateEventRequest,
            CreateTicketTypeRequest,
            UpdateEventRequest,
            EventDetail,
            EventList,
            CartItemRequest,
            CreateOrderRequest,
            OrderCreated,
            OrderDetail,
            OrderList,
            PaymentList,
            CreatePaymentRequest,
            PaymentCallbackRequest,
            CallbackOutcome,
            PaymentOrderSummary,
            PaymentResult,
            TicketList,
            TicketDetail,
            TicketEventSummary,
            CheckInResult,
            TicketVerification,
            NotificationList,
            DecisionAction,
            EventDecisionRequest,
            UpdateRoleRequest,
            UpdateUserStatusRequest,
            RoleCount,
            UserStats,
            EventStats,
            OrderStats,
            TicketStats,
            Statistics,
            params::Pagination,
            params::SortOrder,
            Meta,
            ApiResponse<OrderCreated>,
            ApiResponse<OrderDetail>,
            ApiResponse<PaymentResult>,
            ApiResponse<TicketDetail>,
            ApiResponse<EventDetail>,
            ApiResponse<Statistics>
        )
    ),
    security(
        ("bearer_auth" = [])
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Health check endpoint"),
        (name = "Auth", description = "Authentication endpoints"),
        (name = "Events", description = "Event catalog and ticket types"),
        (name = "Orders", description = "Checkout and order management"),
        (name = "Payments", description = "Payments and gateway callbacks"),
        (name = "Tickets", description = "Tickets, QR codes and check-in"),
        (name = "Notifications", description = "In-app notifications"),
        (name = "Admin", description = "Admin endpoints"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}
