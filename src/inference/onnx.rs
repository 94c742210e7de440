// Local ONNX inference adapter for a bi-headed toxicity classifier.
//
// The model is an ONNX export of a BERT-style sequence classifier with two
// outputs:
//   logits      [1, labels]               raw head outputs (pre-sigmoid)
//   attentions  [1, heads, seq, seq]      last-layer attention probabilities
// The first and last label heads feed the toxicity score; the attention row
// of the classification token, averaged over heads, feeds salience.
//
// Tokenization uses character offsets so reason spans index the original
// text directly, including when long inputs are truncated.

use std::path::Path;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use async_trait::async_trait;
use ort::session::Session;
use ort::value::Tensor;
use tokenizers::{Tokenizer, TruncationParams};
use tracing::debug;

use super::download::{MODEL_FILE, TOKENIZER_FILE};
use super::traits::{InferenceAdapter, InferenceOutput};
use crate::scoring::toxicity::sigmoid;

/// Name of the classification output in the ONNX graph.
const LOGITS_OUTPUT: &str = "logits";

/// Name of the last-layer attention output in the ONNX graph.
const ATTENTION_OUTPUT: &str = "attentions";

/// Local ONNX classifier. Holds the session and tokenizer behind Arc so the
/// CPU-bound work can move to spawn_blocking.
pub struct OnnxInferenceAdapter {
    // ort::Session::run takes &mut self. The mutex also makes one text's
    // logits and attention come from the same forward pass.
    session: Arc<Mutex<Session>>,
    tokenizer: Arc<Tokenizer>,
}

impl OnnxInferenceAdapter {
    /// Load the ONNX model and tokenizer from `model_dir`, truncating inputs
    /// to `max_tokens` tokens.
    ///
    /// Expects `model.onnx` and `tokenizer.json` to exist in `model_dir`.
    /// Call `download::download_model()` first if they don't.
    pub fn load(model_dir: &Path, max_tokens: usize) -> Result<Self> {
        let model_path = model_dir.join(MODEL_FILE);
        let tokenizer_path = model_dir.join(TOKENIZER_FILE);

        if !model_path.exists() {
            anyhow::bail!(
                "Model file not found: {}\nRun `toxlens download-model` to download it.",
                model_path.display()
            );
        }
        if !tokenizer_path.exists() {
            anyhow::bail!(
                "Tokenizer file not found: {}\nRun `toxlens download-model` to download it.",
                tokenizer_path.display()
            );
        }

        let session = Session::builder()
            .context("Failed to create ONNX session builder")?
            .commit_from_file(&model_path)
            .with_context(|| format!("Failed to load ONNX model from {}", model_path.display()))?;

        let mut tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| anyhow::anyhow!("Failed to load tokenizer: {}", e))?;
        tokenizer
            .with_truncation(Some(TruncationParams {
                max_length: max_tokens,
                ..Default::default()
            }))
            .map_err(|e| anyhow::anyhow!("Failed to configure truncation: {}", e))?;

        debug!(max_tokens, "Loaded ONNX classifier from {}", model_dir.display());

        Ok(Self {
            session: Arc::new(Mutex::new(session)),
            tokenizer: Arc::new(tokenizer),
        })
    }
}

#[async_trait]
impl InferenceAdapter for OnnxInferenceAdapter {
    async fn infer(&self, text: &str) -> Result<InferenceOutput> {
        let session = Arc::clone(&self.session);
        let tokenizer = Arc::clone(&self.tokenizer);
        let text = text.to_string();

        tokio::task::spawn_blocking(move || run_inference(&session, &tokenizer, &text))
            .await
            .context("spawn_blocking panicked")?
    }
}

/// Tokenize, run one forward pass, and unpack both outputs.
fn run_inference(
    session: &Mutex<Session>,
    tokenizer: &Tokenizer,
    text: &str,
) -> Result<InferenceOutput> {
    let encoding = tokenizer
        .encode_char_offsets(text, true)
        .map_err(|e| anyhow::anyhow!("Tokenization failed: {}", e))?;

    let seq_len = encoding.get_ids().len();
    let widen = |values: &[u32]| values.iter().map(|&v| v as i64).collect::<Vec<i64>>();
    let shape = [1_i64, seq_len as i64];

    let input_ids = Tensor::from_array((shape, widen(encoding.get_ids())))
        .context("Failed to create input_ids tensor")?;
    let attention_mask = Tensor::from_array((shape, widen(encoding.get_attention_mask())))
        .context("Failed to create attention_mask tensor")?;
    let token_type_ids = Tensor::from_array((shape, widen(encoding.get_type_ids())))
        .context("Failed to create token_type_ids tensor")?;

    let (logits, attention_dims, attention) = {
        let mut session = session
            .lock()
            .map_err(|e| anyhow::anyhow!("Session lock poisoned: {}", e))?;

        let outputs = session
            .run(ort::inputs! {
                "input_ids" => input_ids,
                "attention_mask" => attention_mask,
                "token_type_ids" => token_type_ids
            })
            .context("ONNX inference failed")?;

        let (_shape, logits) = outputs[LOGITS_OUTPUT]
            .try_extract_tensor::<f32>()
            .context("Failed to extract logits tensor")?;
        let (attention_shape, attention) = outputs[ATTENTION_OUTPUT]
            .try_extract_tensor::<f32>()
            .context("Failed to extract attention tensor")?;

        (
            logits.to_vec(),
            attention_shape.iter().copied().collect::<Vec<i64>>(),
            attention.to_vec(),
        )
    };

    let (p_a, p_b) = head_probabilities(&logits)?;
    let token_weights = cls_attention(&attention_dims, &attention, seq_len)?;

    let output = InferenceOutput {
        p_a,
        p_b,
        token_weights,
        token_spans: encoding.get_offsets().to_vec(),
        is_special: encoding
            .get_special_tokens_mask()
            .iter()
            .map(|&m| m == 1)
            .collect(),
    };

    debug!(
        p_a,
        p_b,
        tokens = seq_len,
        text_preview = %crate::output::truncate_chars(text, 50),
        "ONNX inference complete"
    );

    Ok(output)
}

/// Sigmoid the first and last head logits.
fn head_probabilities(logits: &[f32]) -> Result<(f64, f64)> {
    match (logits.first(), logits.last()) {
        (Some(&a), Some(&b)) if logits.len() >= 2 => Ok((sigmoid(a as f64), sigmoid(b as f64))),
        _ => anyhow::bail!(
            "Expected at least 2 logits from the classifier, got {}",
            logits.len()
        ),
    }
}

/// Average the classification token's attention row over all heads.
///
/// `dims` must be `[1, heads, seq_len, seq_len]` with `data` laid out
/// row-major.
fn cls_attention(dims: &[i64], data: &[f32], seq_len: usize) -> Result<Vec<f64>> {
    let [batch, heads, rows, cols] = dims else {
        anyhow::bail!("Expected 4-d attention tensor, got shape {:?}", dims);
    };
    if *batch != 1 || *rows as usize != seq_len || *cols as usize != seq_len || *heads < 1 {
        anyhow::bail!(
            "Attention shape {:?} does not match [1, heads, {seq_len}, {seq_len}]",
            dims
        );
    }

    let heads = *heads as usize;
    if data.len() != heads * seq_len * seq_len {
        anyhow::bail!(
            "Attention tensor has {} values, expected {}",
            data.len(),
            heads * seq_len * seq_len
        );
    }

    let mut weights = vec![0.0_f64; seq_len];
    for head in 0..heads {
        // Row 0 of this head: attention from the classification token.
        let row = &data[head * seq_len * seq_len..head * seq_len * seq_len + seq_len];
        for (w, &a) in weights.iter_mut().zip(row) {
            *w += a as f64;
        }
    }
    for w in &mut weights {
        *w /= heads as f64;
    }

    Ok(weights)
}
