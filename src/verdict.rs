// Verdict engine: one classifier round trip turned into accept/reject plus
// the reason spans behind it.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{AnalyzerError, SalienceError};
use crate::inference::traits::InferenceAdapter;
use crate::scoring::salience::{self, Span};
use crate::scoring::toxicity;
use crate::vault::Vault;

/// Which side of the third-party product the text came from. Selects the
/// vault threshold and the result table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Inbound request text, judged against `toxicity_threshold_input`.
    Input,
    /// Outbound response text, judged against `toxicity_threshold_output`.
    Output,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Input => "input",
            Direction::Output => "output",
        }
    }

    pub fn threshold(&self, vault: &Vault) -> f64 {
        match self {
            Direction::Input => vault.toxicity_threshold_input,
            Direction::Output => vault.toxicity_threshold_output,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Direction {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s {
            "input" => Ok(Direction::Input),
            "output" => Ok(Direction::Output),
            other => anyhow::bail!("unknown direction '{other}', expected input or output"),
        }
    }
}

/// One reason span. `additional_metric` is the whole-text toxicity score,
/// repeated on every reason.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Reason {
    #[serde(flatten)]
    pub span: Span,
    pub additional_metric: f64,
}

/// Outcome of one analysis call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerdictResult {
    pub metric: f64,
    #[serde(rename = "reject_flg")]
    pub reject_flag: bool,
    pub reasons: Vec<Reason>,
}

impl VerdictResult {
    /// Reasons as one JSON string each, the shape the result store keeps.
    /// `None` when there are no reasons.
    pub fn serialized_reasons(&self) -> serde_json::Result<Option<Vec<String>>> {
        if self.reasons.is_empty() {
            return Ok(None);
        }
        self.reasons
            .iter()
            .map(serde_json::to_string)
            .collect::<serde_json::Result<Vec<_>>>()
            .map(Some)
    }
}

/// Runs inference once per text and assembles the verdict.
pub struct VerdictEngine {
    adapter: Arc<dyn InferenceAdapter>,
}

impl VerdictEngine {
    pub fn new(adapter: Arc<dyn InferenceAdapter>) -> Self {
        Self { adapter }
    }

    /// Score `text` against `vault` for the given direction.
    ///
    /// Rejection is strict: a metric equal to the threshold passes. A text
    /// with no scorable tokens yields an empty reason list. Inference
    /// failures and malformed inference output are returned unmodified; there
    /// is no retry.
    pub async fn evaluate(
        &self,
        text: &str,
        vault: &Vault,
        direction: Direction,
    ) -> Result<VerdictResult, AnalyzerError> {
        let output = self
            .adapter
            .infer(text)
            .await
            .map_err(AnalyzerError::Inference)?;

        let metric = toxicity::score(output.p_a, output.p_b);

        let spans = match salience::extract(
            &output.token_weights,
            &output.token_spans,
            &output.is_special,
            text,
            vault.attention_threshold_percentile,
            vault.top_k_tokens,
        ) {
            Ok(spans) => spans,
            Err(SalienceError::EmptyInput) => {
                warn!(direction = %direction, "No scorable tokens, returning verdict without reasons");
                Vec::new()
            }
            Err(e @ SalienceError::LengthMismatch { .. }) => {
                return Err(AnalyzerError::Inference(anyhow::Error::new(e)));
            }
        };

        let reject_flag = metric > direction.threshold(vault);
        let reasons: Vec<Reason> = spans
            .into_iter()
            .map(|span| Reason {
                span,
                additional_metric: metric,
            })
            .collect();

        debug!(
            direction = %direction,
            metric,
            reject_flag,
            reasons = reasons.len(),
            text_preview = %crate::output::truncate_chars(text, 50),
            "Evaluated text"
        );

        Ok(VerdictResult {
            metric,
            reject_flag,
            reasons,
        })
    }
}
