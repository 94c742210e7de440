// Auth middleware: api key resolution.
//
// Product requests carry `api_key: <key>`. The key is hashed and looked up
// in the products table; the resolved Product goes into the request
// extensions for handlers to extract. Admin requests compare the header
// against TOXLENS_ADMIN_API_KEY in constant time.

use axum::extract::{Request, State};
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::Response;
use tracing::error;

use super::{api_error, AppState};

/// Header carrying the product or admin key.
pub const API_KEY_HEADER: &str = "api_key";

/// Axum middleware: resolve the api key to a Product or reject with 403.
pub async fn require_api_key(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let Some(api_key) = header_key(&request) else {
        return api_error(StatusCode::FORBIDDEN, "API key is missing");
    };

    let product = match state.analyzer.db().get_product_by_api_key(&api_key).await {
        Ok(Some(product)) => product,
        Ok(None) => return api_error(StatusCode::FORBIDDEN, "Invalid API key"),
        Err(e) => {
            error!(error = %e, "DB error resolving api key");
            return api_error(StatusCode::INTERNAL_SERVER_ERROR, "Database error");
        }
    };

    request.extensions_mut().insert(product);
    next.run(request).await
}

/// Axum middleware: require the configured admin key.
pub async fn require_admin_key(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    if state.config.require_admin_key().is_err() {
        return api_error(StatusCode::FORBIDDEN, "Admin API is disabled");
    }
    let Some(api_key) = header_key(&request) else {
        return api_error(StatusCode::FORBIDDEN, "API key is missing");
    };
    if !constant_time_eq(&api_key, &state.config.admin_api_key) {
        return api_error(StatusCode::FORBIDDEN, "Invalid API key");
    }
    next.run(request).await
}

fn header_key(request: &Request) -> Option<String> {
    request
        .headers()
        .get(API_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Constant-time string comparison to prevent timing attacks.
fn constant_time_eq(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.bytes()
        .zip(b.bytes())
        .fold(0u8, |acc, (x, y)| acc | (x ^ y))
        == 0
}
