use axum::{
    extract::DefaultBodyLimit,
    middleware::{from_fn, from_fn_with_state},
    routing::{delete, get, post, put},
    Router,
};

use http::{header, Method};
use std::net::SocketAddr;
use tower_http::{
    cors::CorsLayer,
    services::ServeDir,
    trace::{DefaultMakeSpan, DefaultOnFailure, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};

use tracing::Level;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod config;
mod db;
mod error;
mod player;
mod state;

mod storage;

mod models {
    pub mod course;
    pub mod note;
    pub mod user;
}

mod repositories {
    pub mod course;
    pub mod note;
    pub mod user;
}

mod services {
    pub mod auth;
    pub mod catalog;
    pub mod mailer;
    pub mod media;
    pub mod otp;
    pub mod payment;
    pub mod signer;
}

mod handlers {
    pub mod auth;
    pub mod courses;
    pub mod media;
    pub mod notes;
    pub mod payments;
    pub mod uploads;
}

mod middleware_layer {
    pub mod auth;
    pub mod rate_limit;
}

mod validation {
    pub mod auth;
}

use config::Config;
use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    dotenvy::dotenv().ok();

    let config = Config::from_env()?;
    tracing::info!("✅ Configuration loaded successfully");

    let state = AppState::new(&config).await?;
    tracing::info!("✅ AppState initialized");

    let cors = CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::RANGE]);

    let signup_routes = Router::new()
        .route("/api/auth/signup-init", post(handlers::auth::signup_init))
        .route_layer(from_fn_with_state(
            state.clone(),
            middleware_layer::rate_limit::rate_limit_signup,
        ))
        .with_state(state.clone());

    let login_routes = Router::new()
        .route("/api/auth/login", post(handlers::auth::login))
        .route_layer(from_fn_with_state(
            state.clone(),
            middleware_layer::rate_limit::rate_limit_login,
        ))
        .with_state(state.clone());

    // Token in the query string, checked per range request in the handler.
    let public_routes = Router::new()
        .route("/api/auth/signup-verify", post(handlers::auth::signup_verify))
        .route("/api/stream", get(handlers::media::stream))
        .route("/api/courses", get(handlers::courses::list_courses))
        .route("/api/courses/{id}", get(handlers::courses::get_course))
        .route("/api/notes", get(handlers::notes::list_notes))
        .route("/api/notes/{id}", get(handlers::notes::get_note))
        .with_state(state.clone());

    let protected_routes = Router::new()
        .route("/api/auth/me", get(handlers::auth::me))
        .route("/api/media/sign", get(handlers::media::sign_key))
        .route("/api/courses/progress", post(handlers::courses::mark_progress))
        .route("/api/payment/create-order", post(handlers::payments::create_order))
        .route("/api/payment/verify", post(handlers::payments::verify_payment))
        .route_layer(from_fn_with_state(
            state.clone(),
            middleware_layer::auth::require_auth,
        ))
        .with_state(state.clone());

    let admin_routes = Router::new()
        .route("/api/upload", post(handlers::uploads::upload_file))
        .route("/api/upload/multiple", post(handlers::uploads::upload_files))
        .route("/api/courses", post(handlers::courses::upsert_course))
        .route("/api/courses/{id}", delete(handlers::courses::delete_course))
        .route(
            "/api/courses/{id}/modules",
            post(handlers::courses::add_module),
        )
        .route(
            "/api/courses/{id}/modules/{idx}/videos",
            post(handlers::courses::add_video),
        )
        .route(
            "/api/courses/{id}/modules/{idx}/videos/{video_id}",
            put(handlers::courses::update_video),
        )
        .route(
            "/api/courses/{id}/modules/{idx}/videos/{video_id}",
            delete(handlers::courses::delete_video),
        )
        .route("/api/notes", post(handlers::notes::upsert_note))
        .route("/api/notes/{id}", delete(handlers::notes::delete_note))
        .route(
            "/api/admin/reset-courses",
            delete(handlers::courses::reset_catalog),
        )
        .route_layer(from_fn(middleware_layer::auth::require_admin))
        .route_layer(from_fn_with_state(
            state.clone(),
            middleware_layer::auth::require_auth,
        ))
        .with_state(state.clone());

    let app = Router::new()
        .merge(signup_routes)
        .merge(login_routes)
        .merge(public_routes)
        .merge(protected_routes)
        .merge(admin_routes)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::default())
                .on_request(DefaultOnRequest::default().level(Level::DEBUG))
                .on_response(DefaultOnResponse::default().level(Level::DEBUG))
                .on_failure(DefaultOnFailure::default().level(Level::ERROR)),
        )
        .layer(DefaultBodyLimit::max(500 * 1024 * 1024))
        .layer(cors)
        .fallback_service(ServeDir::new("dist"));

    let addr = SocketAddr::from(([0, 0, 0, 0], state.config.port));
    tracing::info!("🚀 Server listening on http://{}", addr);
    tracing::info!("✅ All systems operational");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
