//! Router-level tests that exercise the middleware chain without a live
//! MongoDB: authentication and role guards reject requests before any
//! storage call is made.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use http_body_util::BodyExt;
use tower::ServiceExt;

use certcourse_api::config::Config;
use certcourse_api::middlewares::auth::{JwtClaims, JwtService};
use certcourse_api::{create_router, AppState};

const TEST_SECRET: &str = "test-secret";

async fn test_app() -> axum::Router {
    // Port 27099 on purpose: nothing listens there, so DB-touching paths
    // fail fast instead of accidentally finding a developer's local Mongo.
    let config = Config {
        mongo_uri: "mongodb://127.0.0.1:27099/?serverSelectionTimeoutMS=200".to_string(),
        mongo_database: "certcourse_test".to_string(),
        jwt_secret: TEST_SECRET.to_string(),
        course_name: "Test Course".to_string(),
        bind_addr: "127.0.0.1:0".to_string(),
    };

    // The driver connects lazily, so building state without a running
    // MongoDB is fine for middleware-level tests.
    let mongo_client = mongodb::Client::with_uri_str(&config.mongo_uri)
        .await
        .expect("client construction is lazy");
    let mongo = mongo_client.database(&config.mongo_database);

    create_router(Arc::new(AppState { config, mongo }))
}

fn token_for_role(role: &str) -> String {
    let now = chrono::Utc::now().timestamp();
    JwtService::new(TEST_SECRET)
        .generate_token(JwtClaims {
            sub: "507f1f77bcf86cd799439011".to_string(),
            role: role.to_string(),
            exp: (now + 3600) as usize,
            iat: now as usize,
        })
        .unwrap()
}

#[tokio::test]
async fn protected_routes_require_a_token() {
    let app = test_app().await;

    for (method, uri) in [
        ("GET", "/api/v1/progress"),
        ("GET", "/api/v1/questions/topic/1"),
        ("GET", "/api/v1/auth/me"),
        ("GET", "/admin/stats"),
    ] {
        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method(method)
                    .uri(uri)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(
            response.status(),
            StatusCode::UNAUTHORIZED,
            "{} {} should reject anonymous requests",
            method,
            uri
        );
    }
}

#[tokio::test]
async fn garbage_bearer_token_is_rejected() {
    let app = test_app().await;

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/v1/progress")
                .header(header::AUTHORIZATION, "Bearer not-a-jwt")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn advisors_cannot_reach_admin_routes() {
    let app = test_app().await;
    let token = token_for_role("advisor");

    let response = app
        .oneshot(
            Request::builder()
                .uri("/admin/stats")
                .header(header::AUTHORIZATION, format!("Bearer {}", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn register_rejects_invalid_payload_before_any_write() {
    let app = test_app().await;

    // Malformed JSON is rejected by the extractor.
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/v1/auth/register")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from("{not json"))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // A structurally valid body with a bad email fails validation.
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/v1/auth/register")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(
                    r#"{
                        "id_number": "12345678",
                        "name": "Test User",
                        "email": "not-an-email",
                        "phone": "3001234567",
                        "password": "secret123"
                    }"#,
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["success"], false);
    assert!(json["message"].as_str().unwrap().contains("Validation"));
}

#[tokio::test]
async fn metrics_endpoint_requires_basic_auth() {
    let app = test_app().await;

    let response = app
        .oneshot(
            Request::builder()
                .uri("/metrics")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn health_reports_degraded_without_mongo() {
    let app = test_app().await;

    let response = app
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    // No MongoDB behind the lazy client: the probe times out and the
    // endpoint degrades instead of crashing.
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["status"], "degraded");
    assert!(json["dependencies"]["mongodb"].is_object());
}
