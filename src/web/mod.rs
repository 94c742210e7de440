// Web server: Axum HTTP surface for the analyzer.
//
// Product routes authenticate with the `api_key` header, which resolves to a
// Product; the product id is the tenant id for vault lookups. Product
// creation uses the separate admin key.

use std::sync::Arc;

use anyhow::Result;
use axum::http::{header, HeaderName, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::analyzer::Analyzer;
use crate::config::Config;

pub mod auth;
pub mod handlers;

/// Shared application state threaded through all Axum handlers.
#[derive(Clone)]
pub struct AppState {
    pub analyzer: Arc<Analyzer>,
    pub config: Arc<Config>,
}

/// Start the Axum web server and block until it exits.
pub async fn run_server(config: Config, analyzer: Arc<Analyzer>, port: u16, bind: &str) -> Result<()> {
    let state = AppState {
        analyzer,
        config: Arc::new(config),
    };

    let app = build_router(state);

    let addr = format!("{bind}:{port}");
    info!("toxlens listening on http://{addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

pub fn build_router(state: AppState) -> Router {
    // Product routes (require a valid api_key header)
    let product_api = Router::new()
        .route("/analyze/input", post(handlers::analyze::input))
        .route("/analyze/output", post(handlers::analyze::output))
        .route("/manager/add_vault", post(handlers::manager::add_vault))
        .route("/manager/vault", delete(handlers::manager::delete_vault))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            auth::require_api_key,
        ));

    // Admin routes (require the admin key)
    let admin_api = Router::new()
        .route("/manager/products", post(handlers::manager::create_product))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            auth::require_admin_key,
        ));

    // Public routes (no auth)
    let public_api = Router::new()
        .route("/health", get(health))
        .route("/manager/vault_example", get(handlers::manager::vault_example));

    Router::new()
        .merge(product_api)
        .merge(admin_api)
        .merge(public_api)
        .layer(
            CorsLayer::new()
                .allow_origin(tower_http::cors::Any)
                .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
                .allow_headers([header::CONTENT_TYPE, HeaderName::from_static(auth::API_KEY_HEADER)]),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Liveness probe: always returns 200 OK.
async fn health() -> impl IntoResponse {
    (
        StatusCode::OK,
        axum::Json(serde_json::json!({ "status": "ok" })),
    )
}

/// Typed JSON error response helper.
pub fn api_error(status: StatusCode, message: &str) -> Response {
    (status, axum::Json(serde_json::json!({ "detail": message }))).into_response()
}
