use axum::{
    extract::Request,
    http::{header, HeaderValue, Method},
    middleware::{self, Next},
    response::Response,
    routing::{get, post, put},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

pub mod config;
pub mod errors;
pub mod extractors;
pub mod handlers;
pub mod metrics;
pub mod middlewares;
pub mod models;
pub mod services;

pub use config::Config;
pub use services::AppState;

/// CSP middleware adds Content-Security-Policy header to all responses
async fn csp_middleware(request: Request, next: Next) -> Response {
    let mut response = next.run(request).await;
    response.headers_mut().insert(
        header::CONTENT_SECURITY_POLICY,
        HeaderValue::from_static(
            "default-src 'self'; \
             script-src 'self' 'unsafe-inline'; \
             style-src 'self' 'unsafe-inline'; \
             img-src 'self' data: https:; \
             connect-src 'self'",
        ),
    );
    response
}

pub fn create_router(app_state: std::sync::Arc<services::AppState>) -> Router {
    // CORS for the public certificate verification endpoint: third parties
    // check codes from arbitrary origins.
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE])
        .allow_origin(tower_http::cors::Any);

    Router::new()
        // Public endpoints (no auth required)
        .route("/health", get(handlers::health_check))
        // Metrics endpoint with Basic Auth protection
        .route(
            "/metrics",
            get(handlers::metrics_handler)
                .layer(middleware::from_fn(handlers::metrics_auth_middleware)),
        )
        // Public certificate verification (unauthenticated by design)
        .route(
            "/api/v1/certificates/verify/{code}",
            get(handlers::progress::verify_certificate).layer(cors),
        )
        // Auth endpoints (mixed: some public, some protected)
        .nest("/api/v1/auth", auth_routes(app_state.clone()))
        // Protected quiz and progress endpoints (require JWT)
        .nest(
            "/api/v1/questions",
            questions_routes().layer(middleware::from_fn_with_state(
                app_state.clone(),
                middlewares::auth::auth_middleware,
            )),
        )
        .nest(
            "/api/v1/progress",
            progress_routes().layer(middleware::from_fn_with_state(
                app_state.clone(),
                middlewares::auth::auth_middleware,
            )),
        )
        .nest(
            "/admin",
            admin_routes().layer(middleware::from_fn_with_state(
                app_state.clone(),
                middlewares::auth::auth_middleware,
            )),
        )
        .with_state(app_state)
        .layer(middleware::from_fn(csp_middleware)) // Apply CSP to all responses
        .layer(middleware::from_fn(
            middlewares::metrics::metrics_middleware,
        ))
        .layer(TraceLayer::new_for_http())
}

fn questions_routes() -> Router<std::sync::Arc<services::AppState>> {
    Router::new()
        .route(
            "/topic/{topic}",
            get(handlers::questions::get_topic_questions),
        )
        .route("/verify", post(handlers::questions::verify_answers))
}

fn progress_routes() -> Router<std::sync::Arc<services::AppState>> {
    Router::new()
        .route("/", get(handlers::progress::get_progress))
        .route("/topic/{topic}", put(handlers::progress::update_progress))
        .route("/certificate", get(handlers::progress::get_certificate))
}

fn admin_routes() -> Router<std::sync::Arc<services::AppState>> {
    Router::new()
        // User management
        .route(
            "/users",
            get(handlers::admin::list_users).post(handlers::admin::create_user),
        )
        .route(
            "/users/{id}",
            get(handlers::admin::get_user).patch(handlers::admin::update_user),
        )
        .route(
            "/users/{id}/status",
            post(handlers::admin::toggle_user_status),
        )
        .route(
            "/users/{id}/reset-password",
            post(handlers::admin::reset_user_password),
        )
        .route(
            "/users/{id}/reset-progress",
            post(handlers::admin::reset_user_progress),
        )
        .route(
            "/users/{id}/sessions",
            get(handlers::admin::list_user_sessions),
        )
        // Question management
        .route(
            "/questions",
            get(handlers::admin::list_questions).post(handlers::admin::create_question),
        )
        .route(
            "/questions/{id}",
            put(handlers::admin::update_question).delete(handlers::admin::delete_question),
        )
        // Course statistics
        .route("/stats", get(handlers::admin::get_statistics))
        .route_layer(middleware::from_fn(
            middlewares::auth::admin_guard_middleware,
        ))
}

fn auth_routes(
    app_state: std::sync::Arc<services::AppState>,
) -> Router<std::sync::Arc<services::AppState>> {
    // Public routes
    let public_routes = Router::new()
        .route("/register", post(handlers::auth::register))
        .route("/login", post(handlers::auth::login));

    // Protected routes (require JWT auth)
    let protected_routes = Router::new()
        .route("/me", get(handlers::auth::get_current_user))
        .route("/logout", post(handlers::auth::logout))
        .route_layer(middleware::from_fn_with_state(
            app_state.clone(),
            middlewares::auth::auth_middleware,
        ));

    public_routes.merge(protected_routes)
}
