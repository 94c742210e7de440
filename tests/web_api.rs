// HTTP-level tests for the API router without opening sockets.
//
// The router is driven directly via tower::ServiceExt::oneshot, backed by a
// fixed inference fixture and the in-memory database.

#![cfg(feature = "web")]

use std::path::PathBuf;
use std::sync::Arc;

use axum::body::{self, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt as _;
use uuid::Uuid;

use toxlens::analyzer::Analyzer;
use toxlens::config::{Config, DEFAULT_MAX_TOKENS};
use toxlens::db::models::{NewProduct, ProductMode};
use toxlens::db::{Database, MemoryDatabase};
use toxlens::inference::traits::{InferenceOutput, StaticInference};
use toxlens::vault::{TenantVault, Vault};
use toxlens::verdict::Direction;
use toxlens::web::{build_router, AppState};

const BODY_LIMIT: usize = 1024 * 1024;
const ADMIN_KEY: &str = "admin-secret";

struct Harness {
    app: Router,
    db: Arc<MemoryDatabase>,
    vaults: Arc<TenantVault>,
    api_key: String,
    tenant_id: String,
}

async fn harness() -> Harness {
    let output = InferenceOutput {
        p_a: 0.1,
        p_b: 0.05,
        token_weights: vec![0.9, 0.05, 0.05, 0.6, 0.3, 0.7],
        token_spans: vec![(0, 0), (0, 3), (4, 7), (8, 14), (19, 28), (0, 0)],
        is_special: vec![true, false, false, false, false, true],
    };
    let db = Arc::new(MemoryDatabase::new());
    let vaults = Arc::new(TenantVault::new());

    let new = NewProduct::new("chat-bot", ProductMode::Sync);
    let product = db.insert_product(&new).await.expect("insert product");

    let analyzer = Arc::new(Analyzer::new(
        Arc::new(StaticInference::new(output)),
        Arc::clone(&vaults),
        db.clone(),
    ));
    let config = Config {
        db_path: ":memory:".to_string(),
        model_dir: PathBuf::from("/nonexistent"),
        model_url: String::new(),
        max_tokens: DEFAULT_MAX_TOKENS,
        admin_api_key: ADMIN_KEY.to_string(),
    };

    Harness {
        app: build_router(AppState {
            analyzer,
            config: Arc::new(config),
        }),
        db,
        vaults,
        api_key: new.api_key,
        tenant_id: product.tenant_id(),
    }
}

fn post(uri: &str, key: Option<&str>, payload: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(key) = key {
        builder = builder.header("api_key", key);
    }
    builder
        .body(Body::from(payload.to_string()))
        .expect("build request")
}

async fn json_body(resp: axum::response::Response) -> Value {
    let bytes = body::to_bytes(resp.into_body(), BODY_LIMIT)
        .await
        .expect("read body");
    serde_json::from_slice(&bytes).expect("parse json")
}

fn vault_json() -> Value {
    serde_json::to_value(Vault::example()).unwrap()
}

#[tokio::test]
async fn health_is_public() {
    let h = harness().await;
    let req = Request::builder()
        .uri("/health")
        .body(Body::empty())
        .unwrap();

    let resp = h.app.oneshot(req).await.unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(json_body(resp).await["status"], "ok");
}

#[tokio::test]
async fn vault_example_returns_schema_string() {
    let h = harness().await;
    let req = Request::builder()
        .uri("/manager/vault_example")
        .body(Body::empty())
        .unwrap();

    let resp = h.app.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let body = json_body(resp).await;
    let schema: Value = serde_json::from_str(body["vault_schema"].as_str().unwrap()).unwrap();
    assert_eq!(schema["properties"]["top_k_tokens"]["examples"][0], 3);
}

#[tokio::test]
async fn product_routes_require_api_key() {
    let h = harness().await;

    let missing = h
        .app
        .clone()
        .oneshot(post("/manager/add_vault", None, vault_json()))
        .await
        .unwrap();
    let wrong = h
        .app
        .oneshot(post("/manager/add_vault", Some("nope"), vault_json()))
        .await
        .unwrap();

    assert_eq!(missing.status(), StatusCode::FORBIDDEN);
    assert_eq!(wrong.status(), StatusCode::FORBIDDEN);
    assert!(h.vaults.is_empty());
}

#[tokio::test]
async fn add_vault_registers_under_product_id() {
    let h = harness().await;

    let resp = h
        .app
        .oneshot(post("/manager/add_vault", Some(&h.api_key), vault_json()))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::CREATED);
    assert_eq!(h.vaults.lookup(&h.tenant_id), Ok(Vault::example()));
}

#[tokio::test]
async fn analyze_without_vault_is_bad_request() {
    let h = harness().await;
    let payload = json!({
        "request_id": Uuid::new_v4(),
        "input_text": "You are stupid and worthless",
        "analyzer_name": "toxicity",
    });

    let resp = h
        .app
        .oneshot(post("/analyze/input", Some(&h.api_key), payload))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert!(json_body(resp).await["detail"].is_string());
    assert_eq!(h.db.result_count().await, 0);
}

#[tokio::test]
async fn analyze_input_returns_verdict_and_stores_it() {
    let h = harness().await;
    h.vaults.register(&h.tenant_id, Vault::example());
    let request_id = Uuid::new_v4();
    let payload = json!({
        "request_id": request_id,
        "input_text": "You are stupid and worthless",
        "analyzer_name": "toxicity",
    });

    let resp = h
        .app
        .oneshot(post("/analyze/input", Some(&h.api_key), payload))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let body = json_body(resp).await;
    assert_eq!(body["reject_flg"], true);
    assert_eq!(body["reasons"][0]["start"], 8);
    assert_eq!(body["reasons"][0]["stop"], 14);

    let stored = h
        .db
        .get_result(Direction::Input, request_id)
        .await
        .unwrap()
        .expect("stored result");
    assert!(stored.reject_flg);
}

#[tokio::test]
async fn analyze_output_uses_output_threshold() {
    let h = harness().await;
    h.vaults.register(
        &h.tenant_id,
        Vault {
            toxicity_threshold_output: 0.95,
            toxicity_threshold_input: 0.5,
            attention_threshold_percentile: 0.85,
            top_k_tokens: 3,
        },
    );
    let response_id = Uuid::new_v4();
    let payload = json!({
        "response_id": response_id,
        "output_text": "You are stupid and worthless",
        "analyzer_name": "toxicity",
    });

    let resp = h
        .app
        .oneshot(post("/analyze/output", Some(&h.api_key), payload))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    // 0.905 is under the output threshold of 0.95.
    assert_eq!(json_body(resp).await["reject_flg"], false);
    assert!(h
        .db
        .get_result(Direction::Output, response_id)
        .await
        .unwrap()
        .is_some());
}

#[tokio::test]
async fn delete_vault_then_delete_again() {
    let h = harness().await;
    h.vaults.register(&h.tenant_id, Vault::example());

    let delete = |key: String| {
        Request::builder()
            .method("DELETE")
            .uri("/manager/vault")
            .header("api_key", key)
            .body(Body::empty())
            .unwrap()
    };

    let first = h.app.clone().oneshot(delete(h.api_key.clone())).await.unwrap();
    let second = h.app.oneshot(delete(h.api_key.clone())).await.unwrap();

    assert_eq!(first.status(), StatusCode::NO_CONTENT);
    assert_eq!(second.status(), StatusCode::BAD_REQUEST);
    assert!(h.vaults.is_empty());
}

#[tokio::test]
async fn create_product_requires_admin_key() {
    let h = harness().await;
    let payload = json!({ "product_name": "search", "mode": "async" });

    let denied = h
        .app
        .clone()
        .oneshot(post("/manager/products", Some(&h.api_key), payload.clone()))
        .await
        .unwrap();
    assert_eq!(denied.status(), StatusCode::FORBIDDEN);

    let created = h
        .app
        .oneshot(post("/manager/products", Some(ADMIN_KEY), payload))
        .await
        .unwrap();
    assert_eq!(created.status(), StatusCode::CREATED);

    let body = json_body(created).await;
    assert_eq!(body["product_name"], "search");
    assert_eq!(body["mode"], "async");
    let key = body["api_key"].as_str().unwrap();
    let product = h.db.get_product_by_api_key(key).await.unwrap();
    assert_eq!(product.map(|p| p.product_name), Some("search".to_string()));
}
