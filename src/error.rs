// Domain error types.
//
// Plumbing (config, storage, model loading) uses anyhow like the rest of the
// crate. These enums exist where callers need to tell failures apart: a
// missing vault is a client problem, a failed inference is ours.

use thiserror::Error;

/// Errors from the per-tenant vault store.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VaultError {
    #[error("no vault configured for tenant {0}")]
    NotConfigured(String),
}

/// Errors from attention salience extraction.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SalienceError {
    /// Every token was a special token (or the text produced no tokens).
    #[error("no non-special tokens to score")]
    EmptyInput,

    /// The inference output vectors disagree on the number of tokens.
    #[error(
        "token vectors have mismatched lengths: {weights} weights, {spans} spans, {specials} special flags"
    )]
    LengthMismatch {
        weights: usize,
        spans: usize,
        specials: usize,
    },
}

/// Errors surfaced by the verdict engine and the analyzer service.
#[derive(Error, Debug)]
pub enum AnalyzerError {
    #[error(transparent)]
    Vault(#[from] VaultError),

    /// The inference adapter failed or returned malformed output.
    #[error("inference failed: {0:#}")]
    Inference(anyhow::Error),

    /// The result sink rejected the write.
    #[error("failed to persist analysis result: {0:#}")]
    Storage(anyhow::Error),
}

impl AnalyzerError {
    /// True when the tenant has no registered vault.
    pub fn is_not_configured(&self) -> bool {
        matches!(self, AnalyzerError::Vault(VaultError::NotConfigured(_)))
    }
}
