// Per-tenant threshold configuration ("vaults").
//
// The store is an explicitly constructed value shared through Arc, not a
// process-wide singleton. One RwLock guards the whole map: vaults are
// replaced wholesale, so a reader sees either the old vault or the new one.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::VaultError;

/// Thresholds controlling rejection and reason-span selection for one tenant.
///
/// No range validation happens here: a threshold outside [0, 1] is accepted
/// and simply never (or always) triggers rejection.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Vault {
    /// Reject outbound text whose toxicity exceeds this value.
    pub toxicity_threshold_output: f64,
    /// Reject inbound text whose toxicity exceeds this value.
    pub toxicity_threshold_input: f64,
    /// Quantile of token attention a token must reach to count as a reason.
    pub attention_threshold_percentile: f64,
    /// Carried for configuration compatibility; does not bound the reasons.
    pub top_k_tokens: u32,
}

impl Vault {
    /// The documented example configuration.
    pub fn example() -> Self {
        Self {
            toxicity_threshold_output: 0.8,
            toxicity_threshold_input: 0.8,
            attention_threshold_percentile: 0.85,
            top_k_tokens: 3,
        }
    }

    /// JSON Schema describing the vault fields, with example values, for
    /// client-side discoverability.
    pub fn schema() -> serde_json::Value {
        let example = Self::example();
        serde_json::json!({
            "title": "Vault",
            "type": "object",
            "properties": {
                "toxicity_threshold_output": {
                    "title": "Toxicity Threshold Output",
                    "type": "number",
                    "examples": [example.toxicity_threshold_output],
                },
                "toxicity_threshold_input": {
                    "title": "Toxicity Threshold Input",
                    "type": "number",
                    "examples": [example.toxicity_threshold_input],
                },
                "attention_threshold_percentile": {
                    "title": "Attention Threshold Percentile",
                    "type": "number",
                    "minimum": 0.0,
                    "maximum": 1.0,
                    "examples": [example.attention_threshold_percentile],
                },
                "top_k_tokens": {
                    "title": "Top K Tokens",
                    "type": "integer",
                    "minimum": 0,
                    "examples": [example.top_k_tokens],
                },
            },
            "required": [
                "toxicity_threshold_output",
                "toxicity_threshold_input",
                "attention_threshold_percentile",
                "top_k_tokens",
            ],
        })
    }
}

/// In-memory tenant id → vault mapping.
#[derive(Debug, Default)]
pub struct TenantVault {
    vaults: RwLock<HashMap<String, Vault>>,
}

impl TenantVault {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or fully replace the vault for `tenant_id`. Last write wins.
    pub fn register(&self, tenant_id: &str, vault: Vault) {
        // A panicking writer cannot leave a half-written vault behind, so a
        // poisoned lock still guards consistent data.
        let mut vaults = self.vaults.write().unwrap_or_else(PoisonError::into_inner);
        let replaced = vaults.insert(tenant_id.to_string(), vault).is_some();
        info!(tenant = %tenant_id, replaced, "Registered vault");
    }

    /// Copy out the vault for `tenant_id`.
    pub fn lookup(&self, tenant_id: &str) -> Result<Vault, VaultError> {
        let vaults = self.vaults.read().unwrap_or_else(PoisonError::into_inner);
        vaults
            .get(tenant_id)
            .copied()
            .ok_or_else(|| VaultError::NotConfigured(tenant_id.to_string()))
    }

    /// Delete the vault for `tenant_id`. Removing an absent tenant is an error.
    pub fn remove(&self, tenant_id: &str) -> Result<Vault, VaultError> {
        let mut vaults = self.vaults.write().unwrap_or_else(PoisonError::into_inner);
        let removed = vaults
            .remove(tenant_id)
            .ok_or_else(|| VaultError::NotConfigured(tenant_id.to_string()))?;
        info!(tenant = %tenant_id, "Removed vault");
        Ok(removed)
    }

    pub fn len(&self) -> usize {
        self.vaults.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
