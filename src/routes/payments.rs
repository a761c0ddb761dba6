use axum::{
    Json, Router,
    extract::{Path, State},
    http::HeaderMap,
    routing::{get, post},
};
use uuid::Uuid;

use crate::{
    dto::payments::{CreatePaymentRequest, PaymentCallbackRequest, PaymentResult},
    error::AppResult,
    middleware::auth::AuthUser,
    models::Payment,
    response::ApiResponse,
    services::payment_service,
    state::AppState,
};

pub const CALLBACK_SECRET_HEADER: &str = "x-callback-secret";

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_payment))
        .route("/callback/{provider}", post(payment_callback))
        .route("/{id}", get(get_payment))
}

#[utoipa::path(
    post,
    path = "/api/payments",
    request_body = CreatePaymentRequest,
    responses(
        (status = 200, description = "Payment recorded", body = ApiResponse<PaymentResult>),
        (status = 400, description = "Already paid, duplicate reference, cancelled order or amount mismatch"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Order not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Payments"
)]
pub async fn create_payment(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreatePaymentRequest>,
) -> AppResult<Json<ApiResponse<PaymentResult>>> {
    let resp = payment_service::create_payment(&state, &user, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/payments/callback/{provider}",
    params(
        ("provider" = String, Path, description = "Payment provider name"),
        ("x-callback-secret" = Option<String>, Header, description = "Shared secret, required when configured")
    ),
    request_body = PaymentCallbackRequest,
    responses(
        (status = 200, description = "Callback applied or already applied", body = ApiResponse<PaymentResult>),
        (status = 401, description = "Invalid callback secret"),
        (status = 404, description = "Payment not found"),
    ),
    security(()),
    tag = "Payments"
)]
pub async fn payment_callback(
    State(state): State<AppState>,
    Path(provider): Path<String>,
    headers: HeaderMap,
    Json(payload): Json<PaymentCallbackRequest>,
) -> AppResult<Json<ApiResponse<PaymentResult>>> {
    let secret = headers
        .get(CALLBACK_SECRET_HEADER)
        .and_then(|value| value.to_str().ok());
    let resp = payment_service::handle_callback(&state, &provider, secret, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/payments/{id}",
    params(
        ("id" = Uuid, Path, description = "Payment ID")
    ),
    responses(
        (status = 200, description = "Payment", body = ApiResponse<Payment>),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Payment not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Payments"
)]
pub async fn get_payment(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Payment>>> {
    let resp = payment_service::get_payment(&state, &user, id).await?;
    Ok(Json(resp))
}
