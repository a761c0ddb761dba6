use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use event_ticketing_api::{
    app::build_app,
    config::AppConfig,
    entity::sea_orm_active_enums::Role,
    routes::health::health_check,
    services::auth_service::issue_token,
    state::AppState,
};
use sea_orm::DatabaseConnection;
use tower::ServiceExt;
use uuid::Uuid;

// Requests below are rejected before any query runs, so no database is needed.
fn offline_app() -> (axum::Router, AppConfig) {
    let config = AppConfig::for_tests("postgres://offline");
    let app = build_app(AppState::new(DatabaseConnection::Disconnected, config.clone()));
    (app, config)
}

#[tokio::test]
async fn health_check_returns_ok() {
    let response = health_check().await;
    assert_eq!(response.0.message, "Health check");

    let data = response.0.data.expect("health data");
    assert_eq!(data.status, "ok");
}

#[tokio::test]
async fn health_route_answers_with_a_request_id() {
    let (app, _) = offline_app();
    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("x-request-id"));
}

#[tokio::test]
async fn protected_routes_require_a_bearer_token() {
    let (app, _) = offline_app();
    let response = app
        .oneshot(Request::builder().uri("/api/orders").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let (app, _) = offline_app();
    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/tickets")
                .header("authorization", "Bearer not-a-jwt")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let (app, _) = offline_app();
    let response = app
        .oneshot(Request::builder().uri("/api/auth/me").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn admin_routes_reject_regular_users() {
    let (app, config) = offline_app();
    let token = issue_token(&config, Uuid::new_v4(), Role::User).unwrap();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/admin/stats")
                .header("authorization", format!("Bearer {token}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn unknown_paths_fall_back_to_not_found() {
    let (app, _) = offline_app();
    let response = app
        .oneshot(Request::builder().uri("/nope").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
