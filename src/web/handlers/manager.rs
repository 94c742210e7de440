// Vault and product management handlers.
//
// POST   /manager/add_vault     : register (or replace) the caller's vault
// DELETE /manager/vault         : remove the caller's vault
// GET    /manager/vault_example : JSON Schema of the vault, with examples
// POST   /manager/products      : create a product (admin key)

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json};
use serde::{Deserialize, Serialize};

use crate::db::models::{NewProduct, Product, ProductMode};
use crate::vault::Vault;
use crate::web::{api_error, AppState};

#[derive(Debug, Serialize)]
pub struct VaultExample {
    /// The schema as a JSON string, for clients that store it verbatim.
    pub vault_schema: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateProduct {
    pub product_name: String,
    #[serde(default)]
    pub mode: ProductMode,
}

#[derive(Debug, Serialize)]
pub struct CreatedProduct {
    #[serde(flatten)]
    pub product: Product,
    /// Shown once; only a digest is stored.
    pub api_key: String,
}

/// POST /manager/add_vault
pub async fn add_vault(
    State(state): State<AppState>,
    Extension(product): Extension<Product>,
    Json(vault): Json<Vault>,
) -> impl IntoResponse {
    state
        .analyzer
        .vaults()
        .register(&product.tenant_id(), vault);
    StatusCode::CREATED
}

/// DELETE /manager/vault
pub async fn delete_vault(
    State(state): State<AppState>,
    Extension(product): Extension<Product>,
) -> Response {
    match state.analyzer.vaults().remove(&product.tenant_id()) {
        Ok(_) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => api_error(StatusCode::BAD_REQUEST, &e.to_string()),
    }
}

/// GET /manager/vault_example
pub async fn vault_example() -> Json<VaultExample> {
    Json(VaultExample {
        vault_schema: Vault::schema().to_string(),
    })
}

/// POST /manager/products
pub async fn create_product(
    State(state): State<AppState>,
    Json(body): Json<CreateProduct>,
) -> Response {
    let new = NewProduct::new(body.product_name, body.mode);
    match state.analyzer.db().insert_product(&new).await {
        Ok(product) => (
            StatusCode::CREATED,
            Json(CreatedProduct {
                product,
                api_key: new.api_key,
            }),
        )
            .into_response(),
        Err(e) => {
            tracing::error!(error = %e, "DB error creating product");
            api_error(StatusCode::INTERNAL_SERVER_ERROR, "Database error")
        }
    }
}
