// Analyzer service: the unit invoked once per inbound or outbound text.
//
// lookup vault → evaluate → append result → return verdict. Any failure
// before the append returns early, so a missing vault or failed inference
// never leaves a row behind.

use std::sync::Arc;

use tracing::{info, warn};
use uuid::Uuid;

use crate::db::models::AnalysisRecord;
use crate::db::Database;
use crate::error::AnalyzerError;
use crate::inference::traits::InferenceAdapter;
use crate::vault::TenantVault;
use crate::verdict::{Direction, VerdictEngine, VerdictResult};

/// One text to analyze, as received from the caller.
#[derive(Debug, Clone)]
pub struct AnalysisRequest<'a> {
    pub direction: Direction,
    pub tenant_id: &'a str,
    /// request_id for inputs, response_id for outputs.
    pub correlation_id: Uuid,
    pub analyzer_name: &'a str,
    pub text: &'a str,
}

pub struct Analyzer {
    engine: VerdictEngine,
    vaults: Arc<TenantVault>,
    db: Arc<dyn Database>,
}

impl Analyzer {
    pub fn new(
        adapter: Arc<dyn InferenceAdapter>,
        vaults: Arc<TenantVault>,
        db: Arc<dyn Database>,
    ) -> Self {
        Self {
            engine: VerdictEngine::new(adapter),
            vaults,
            db,
        }
    }

    pub fn vaults(&self) -> &Arc<TenantVault> {
        &self.vaults
    }

    pub fn db(&self) -> &Arc<dyn Database> {
        &self.db
    }

    /// Analyze one text for a tenant and persist the outcome.
    pub async fn analyze(&self, request: AnalysisRequest<'_>) -> Result<VerdictResult, AnalyzerError> {
        let vault = self.vaults.lookup(request.tenant_id)?;

        let verdict = self
            .engine
            .evaluate(request.text, &vault, request.direction)
            .await
            .inspect_err(|e| {
                warn!(
                    tenant = %request.tenant_id,
                    correlation_id = %request.correlation_id,
                    error = %e,
                    "Evaluation failed"
                )
            })?;

        let record =
            AnalysisRecord::from_verdict(request.correlation_id, request.analyzer_name, &verdict)
                .map_err(|e| AnalyzerError::Storage(e.into()))?;
        self.db
            .append_result(request.direction, &record)
            .await
            .map_err(AnalyzerError::Storage)?;

        info!(
            direction = %request.direction,
            tenant = %request.tenant_id,
            correlation_id = %request.correlation_id,
            metric = verdict.metric,
            reject = verdict.reject_flag,
            reasons = verdict.reasons.len(),
            "Analyzed text"
        );

        Ok(verdict)
    }
}
