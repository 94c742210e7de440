// Data models: Rust structs that map to database rows.
//
// These are separate from the queries so the analyzer and web layer can use
// them without depending on rusqlite directly.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::verdict::VerdictResult;

/// How a product integrates with the analyzer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ProductMode {
    Sync,
    #[default]
    Async,
}

impl ProductMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProductMode::Sync => "sync",
            ProductMode::Async => "async",
        }
    }
}

impl fmt::Display for ProductMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ProductMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s {
            "sync" => Ok(ProductMode::Sync),
            "async" => Ok(ProductMode::Async),
            other => anyhow::bail!("unknown product mode '{other}', expected sync or async"),
        }
    }
}

/// A registered product (tenant). The product id doubles as the tenant id
/// for vault lookups.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub product_id: Uuid,
    pub product_name: String,
    pub mode: ProductMode,
}

impl Product {
    pub fn tenant_id(&self) -> String {
        self.product_id.to_string()
    }
}

/// Request to create a product. The api key is generated here and only the
/// plaintext copy returned to the caller ever leaves the process.
#[derive(Debug, Clone)]
pub struct NewProduct {
    pub product_name: String,
    pub api_key: String,
    pub mode: ProductMode,
}

impl NewProduct {
    pub fn new(product_name: impl Into<String>, mode: ProductMode) -> Self {
        Self {
            product_name: product_name.into(),
            api_key: Uuid::new_v4().to_string(),
            mode,
        }
    }
}

/// Stored form of an api key.
pub fn hash_api_key(api_key: &str) -> String {
    hex::encode(Sha256::digest(api_key.as_bytes()))
}

/// One persisted analysis outcome, keyed by the caller's correlation id
/// (request_id for inputs, response_id for outputs).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisRecord {
    pub result_id: Uuid,
    pub correlation_id: Uuid,
    pub analyzer_name: String,
    pub metric: f64,
    pub reject_flg: bool,
    /// One JSON-encoded reason per entry; `None` when nothing was flagged.
    pub reasons: Option<Vec<String>>,
    pub created_at: String,
}

impl AnalysisRecord {
    /// Build the stored row for a verdict. Fails only if a reason cannot be
    /// encoded as JSON.
    pub fn from_verdict(
        correlation_id: Uuid,
        analyzer_name: &str,
        verdict: &VerdictResult,
    ) -> serde_json::Result<Self> {
        Ok(Self {
            result_id: Uuid::new_v4(),
            correlation_id,
            analyzer_name: analyzer_name.to_string(),
            metric: verdict.metric,
            reject_flg: verdict.reject_flag,
            reasons: verdict.serialized_reasons()?,
            created_at: chrono::Utc::now().to_rfc3339(),
        })
    }
}
