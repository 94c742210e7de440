// Analysis handlers.
//
// POST /analyze/input : screen an inbound request text
// POST /analyze/output: screen an outbound response text
//
// Both return the verdict ({metric, reject_flg, reasons}) after the result
// row is written.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json};
use serde::Deserialize;
use uuid::Uuid;

use crate::analyzer::AnalysisRequest;
use crate::db::models::Product;
use crate::error::AnalyzerError;
use crate::verdict::Direction;
use crate::web::{api_error, AppState};

#[derive(Debug, Deserialize)]
pub struct InputRequest {
    pub request_id: Uuid,
    pub input_text: String,
    pub analyzer_name: String,
}

#[derive(Debug, Deserialize)]
pub struct OutputRequest {
    pub response_id: Uuid,
    pub output_text: String,
    pub analyzer_name: String,
}

/// POST /analyze/input
pub async fn input(
    State(state): State<AppState>,
    Extension(product): Extension<Product>,
    Json(body): Json<InputRequest>,
) -> Response {
    let tenant_id = product.tenant_id();
    let request = AnalysisRequest {
        direction: Direction::Input,
        tenant_id: &tenant_id,
        correlation_id: body.request_id,
        analyzer_name: &body.analyzer_name,
        text: &body.input_text,
    };
    run(&state, &product, request).await
}

/// POST /analyze/output
pub async fn output(
    State(state): State<AppState>,
    Extension(product): Extension<Product>,
    Json(body): Json<OutputRequest>,
) -> Response {
    let tenant_id = product.tenant_id();
    let request = AnalysisRequest {
        direction: Direction::Output,
        tenant_id: &tenant_id,
        correlation_id: body.response_id,
        analyzer_name: &body.analyzer_name,
        text: &body.output_text,
    };
    run(&state, &product, request).await
}

async fn run(state: &AppState, product: &Product, request: AnalysisRequest<'_>) -> Response {
    match state.analyzer.analyze(request).await {
        Ok(verdict) => (StatusCode::OK, Json(verdict)).into_response(),
        Err(e) => error_response(product, &e),
    }
}

fn error_response(product: &Product, error: &AnalyzerError) -> Response {
    match error {
        AnalyzerError::Vault(_) => api_error(
            StatusCode::BAD_REQUEST,
            &format!(
                "Product {} has no vault for this analyzer.",
                product.product_name
            ),
        ),
        AnalyzerError::Inference(e) => {
            tracing::error!(error = %e, product = %product.product_name, "Inference failed");
            api_error(StatusCode::INTERNAL_SERVER_ERROR, "Inference failed")
        }
        AnalyzerError::Storage(e) => {
            tracing::error!(error = %e, product = %product.product_name, "Failed to store result");
            api_error(StatusCode::INTERNAL_SERVER_ERROR, "Database error")
        }
    }
}
