// Attention salience: which parts of the text drove the verdict.
//
// Input is the classifier's per-token attention (the classification token's
// row of the last layer, averaged over heads) plus each token's character
// offsets. Output is a list of non-overlapping character spans, each grown
// to whole-word boundaries so callers never see half a word highlighted.
//
// Selection is percentile based: every token at or above the chosen quantile
// of the (renormalized) weights is salient. Ties at the threshold are all
// kept, so more tokens than `(1 - percentile) * n` can be selected.

use serde::{Deserialize, Serialize};

use crate::error::SalienceError;

/// Characters that end a word when expanding a token span.
pub const WORD_DELIMITERS: [char; 10] = [' ', '\n', '\t', '.', ',', '!', '?', ';', ':', '-'];

/// Half-open character interval `[start, end)` over the original text.
///
/// Positions count Unicode scalar values, not bytes. Serialized with the
/// field names `start` / `stop` that downstream result consumers expect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    #[serde(rename = "stop")]
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Inclusive-endpoint overlap test. Spans that merely touch count as
    /// overlapping.
    pub fn overlaps(&self, other: &Span) -> bool {
        other.start <= self.end && self.start <= other.end
    }

    /// The covered slice of `text`, by character position.
    pub fn slice(&self, text: &str) -> String {
        text.chars().skip(self.start).take(self.len()).collect()
    }
}

/// Extract word-aligned salient spans from per-token attention weights.
///
/// `token_weights`, `token_spans` and `is_special` are parallel vectors, one
/// entry per token. Special tokens are dropped before normalization so their
/// attention mass does not shift the threshold. `top_k` is accepted for
/// configuration compatibility and does not bound the result.
///
/// Returns `SalienceError::EmptyInput` when no non-special token remains.
pub fn extract(
    token_weights: &[f64],
    token_spans: &[(usize, usize)],
    is_special: &[bool],
    text: &str,
    percentile: f64,
    _top_k: u32,
) -> Result<Vec<Span>, SalienceError> {
    if token_weights.len() != token_spans.len() || token_weights.len() != is_special.len() {
        return Err(SalienceError::LengthMismatch {
            weights: token_weights.len(),
            spans: token_spans.len(),
            specials: is_special.len(),
        });
    }

    let (weights, offsets): (Vec<f64>, Vec<(usize, usize)>) = token_weights
        .iter()
        .zip(token_spans)
        .zip(is_special)
        .filter(|(_, special)| !**special)
        .map(|((w, span), _)| (*w, *span))
        .unzip();

    if weights.is_empty() {
        return Err(SalienceError::EmptyInput);
    }

    let weights = normalize(&weights);
    let threshold = quantile(&weights, percentile).ok_or(SalienceError::EmptyInput)?;

    let chars: Vec<char> = text.chars().collect();
    let expanded = weights
        .iter()
        .zip(&offsets)
        .filter(|(w, _)| **w >= threshold)
        .filter_map(|(_, &(start, end))| expand_to_word(&chars, start, end));

    Ok(remove_overlapping(expanded))
}

/// Rescale weights to sum to 1. All-zero (or non-finite) mass is left as is,
/// which makes every token tie at the threshold.
fn normalize(weights: &[f64]) -> Vec<f64> {
    let total: f64 = weights.iter().sum();
    if total > 0.0 && total.is_finite() {
        weights.iter().map(|w| w / total).collect()
    } else {
        weights.to_vec()
    }
}

/// Linear-interpolation quantile. `q` is clamped to [0, 1]. `None` for an
/// empty slice.
pub fn quantile(values: &[f64], q: f64) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    let q = if q.is_nan() { 0.0 } else { q.clamp(0.0, 1.0) };
    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f64;

    Some(sorted[lo] + (sorted[hi] - sorted[lo]) * frac)
}

/// Grow `[start, end)` outward until the neighbouring character is a word
/// delimiter or the text boundary. Offsets past the end of the text are
/// clamped; a span that is still empty after expansion yields `None`.
fn expand_to_word(chars: &[char], start: usize, end: usize) -> Option<Span> {
    let mut end = end.min(chars.len());
    let mut start = start.min(end);

    while start > 0 && !WORD_DELIMITERS.contains(&chars[start - 1]) {
        start -= 1;
    }
    while end < chars.len() && !WORD_DELIMITERS.contains(&chars[end]) {
        end += 1;
    }

    let span = Span::new(start, end);
    (!span.is_empty()).then_some(span)
}

/// Keep each span only if it overlaps nothing kept so far. This is a filter,
/// not a union: a later, wider span loses to an earlier narrower one.
fn remove_overlapping(spans: impl IntoIterator<Item = Span>) -> Vec<Span> {
    let mut kept: Vec<Span> = Vec::new();
    for span in spans {
        if !kept.iter().any(|k| k.overlaps(&span)) {
            kept.push(span);
        }
    }
    kept
}
