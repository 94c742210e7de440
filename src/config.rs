use std::env;
use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::inference::download;

/// Default tokenizer truncation length (BERT-style models).
pub const DEFAULT_MAX_TOKENS: usize = 512;

/// Central configuration loaded from environment variables.
///
/// All secrets come from env vars (never hardcoded). The .env file
/// is loaded automatically at startup via dotenvy.
#[derive(Debug, Clone)]
pub struct Config {
    pub db_path: String,
    /// Directory containing model.onnx and tokenizer.json
    pub model_dir: PathBuf,
    /// Base URL `download-model` fetches from
    pub model_url: String,
    /// Tokenizer truncation length
    pub max_tokens: usize,
    /// Admin key for product creation. Empty disables the admin routes.
    pub admin_api_key: String,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self> {
        let model_dir = env::var("TOXLENS_MODEL_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| download::default_model_dir());

        let max_tokens = match env::var("TOXLENS_MAX_TOKENS") {
            Ok(raw) => raw
                .parse::<usize>()
                .with_context(|| format!("TOXLENS_MAX_TOKENS must be a positive integer, got '{raw}'"))?,
            Err(_) => DEFAULT_MAX_TOKENS,
        };
        if max_tokens == 0 {
            anyhow::bail!("TOXLENS_MAX_TOKENS must be greater than zero");
        }

        Ok(Self {
            db_path: env::var("TOXLENS_DB_PATH").unwrap_or_else(|_| "./toxlens.db".to_string()),
            model_dir,
            model_url: env::var("TOXLENS_MODEL_URL")
                .unwrap_or_else(|_| download::DEFAULT_MODEL_URL.to_string()),
            max_tokens,
            admin_api_key: env::var("TOXLENS_ADMIN_API_KEY").unwrap_or_default(),
        })
    }

    /// Check that the classifier files are in place.
    pub fn require_model(&self) -> Result<()> {
        if !download::model_files_present(&self.model_dir) {
            anyhow::bail!(
                "Model files not found in {}\n\
                 Run `toxlens download-model` to download them,\n\
                 or set TOXLENS_MODEL_DIR to a directory with model.onnx and tokenizer.json.",
                self.model_dir.display()
            );
        }
        Ok(())
    }

    /// Check that the admin api key is configured.
    /// Call this before exposing product management.
    pub fn require_admin_key(&self) -> Result<()> {
        if self.admin_api_key.is_empty() {
            anyhow::bail!(
                "TOXLENS_ADMIN_API_KEY not set. Add it to your .env file to enable product management."
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_with_model_dir(dir: PathBuf) -> Config {
        Config {
            db_path: ":memory:".to_string(),
            model_dir: dir,
            model_url: download::DEFAULT_MODEL_URL.to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
            admin_api_key: String::new(),
        }
    }

    #[test]
    fn test_require_model_missing() {
        let config = config_with_model_dir(std::env::temp_dir().join("toxlens-config-missing"));
        let err = config.require_model().unwrap_err();
        assert!(err.to_string().contains("download-model"));
    }

    #[test]
    fn test_require_admin_key_empty() {
        let config = config_with_model_dir(PathBuf::from("."));
        assert!(config.require_admin_key().is_err());
        let config = Config {
            admin_api_key: "root".to_string(),
            ..config
        };
        assert!(config.require_admin_key().is_ok());
    }
}
