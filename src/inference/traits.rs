// Inference adapter trait: the boundary to the classifier model.
//
// The default implementation runs a local ONNX export of a bi-headed
// sequence classifier. Everything downstream (scoring, salience, verdicts)
// only sees InferenceOutput, so tests swap in fixed fixtures.

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Everything one forward pass yields for a single text.
///
/// The three token vectors are parallel: entry `i` of each describes the
/// same token. Offsets are character positions in the original
/// (untruncated) text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InferenceOutput {
    /// Sigmoid output of the "non-toxic" head.
    pub p_a: f64,
    /// Sigmoid output of the secondary toxic-category head.
    pub p_b: f64,
    /// Attention from the classification token, last layer, head-averaged.
    pub token_weights: Vec<f64>,
    /// `[start, end)` character offsets per token.
    pub token_spans: Vec<(usize, usize)>,
    /// True for classifier-internal marker tokens ([CLS], [SEP], ...).
    pub is_special: Vec<bool>,
}

/// Trait for running the classifier on one text.
///
/// Implementations must be callable from many tasks at once and must return
/// all outputs of one call together; a shared model serializes internally.
#[async_trait]
pub trait InferenceAdapter: Send + Sync {
    async fn infer(&self, text: &str) -> Result<InferenceOutput>;
}

/// Adapter that returns the same output for every text.
///
/// Used by tests and the `check --fixture` debugging path.
#[derive(Debug, Clone)]
pub struct StaticInference {
    output: InferenceOutput,
}

impl StaticInference {
    pub fn new(output: InferenceOutput) -> Self {
        Self { output }
    }
}

#[async_trait]
impl InferenceAdapter for StaticInference {
    async fn infer(&self, _text: &str) -> Result<InferenceOutput> {
        Ok(self.output.clone())
    }
}
