use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use futures::stream::{self, StreamExt};
use tracing::info;

use toxlens::config::Config;
use toxlens::inference::onnx::OnnxInferenceAdapter;
use toxlens::inference::traits::{InferenceAdapter, InferenceOutput, StaticInference};
use toxlens::output::terminal;
use toxlens::vault::Vault;
use toxlens::verdict::{Direction, VerdictEngine};

/// toxlens: toxicity screening that explains itself.
///
/// Scores request and response text with a local classifier and points at
/// the words that drove the decision.
#[derive(Parser)]
#[command(name = "toxlens", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the result database
    #[cfg(feature = "sqlite")]
    Init,

    /// Download the ONNX classifier and tokenizer
    DownloadModel,

    /// Register a product and print its api key
    #[cfg(feature = "sqlite")]
    AddProduct {
        /// Human-readable product name
        #[arg(long)]
        name: String,

        /// Integration mode: sync or async
        #[arg(long, default_value = "async")]
        mode: String,
    },

    /// Print the vault JSON Schema with example values
    VaultExample,

    /// Score text locally and show the reason spans
    Check {
        /// Text to score (omit when using --file)
        text: Option<String>,

        /// Judge against the output threshold instead of the input threshold
        #[arg(long)]
        output: bool,

        /// Vault JSON file (defaults to the example vault)
        #[arg(long)]
        vault: Option<PathBuf>,

        /// Score every non-empty line of this file
        #[arg(long)]
        file: Option<PathBuf>,

        /// Use a fixed inference output (JSON) instead of the model
        #[arg(long)]
        fixture: Option<PathBuf>,

        /// Number of texts to score in parallel (default: 4)
        #[arg(long, default_value = "4")]
        concurrency: usize,
    },

    /// Start the HTTP API
    #[cfg(feature = "web")]
    Serve {
        /// Port to listen on (default: 8000)
        #[arg(long, default_value = "8000")]
        port: u16,

        /// Address to bind (default: 127.0.0.1)
        #[arg(long, default_value = "127.0.0.1")]
        bind: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if missing)
    let _ = dotenvy::dotenv();

    // Set up structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("toxlens=info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        #[cfg(feature = "sqlite")]
        Commands::Init => {
            info!("Initializing toxlens database...");
            let config = Config::load()?;
            let db = toxlens::db::initialize_sqlite(&config.db_path)?;
            let table_count = db.table_count().await?;
            println!("Database initialized at: {}", config.db_path);
            println!("Tables created: {table_count}");
            println!("\nNext: cargo run -- download-model");
        }

        Commands::DownloadModel => {
            let config = Config::load()?;
            toxlens::inference::download::download_model(&config.model_url, &config.model_dir)
                .await?;
            println!("\nModel files saved to {}", config.model_dir.display());
        }

        #[cfg(feature = "sqlite")]
        Commands::AddProduct { name, mode } => {
            let config = Config::load()?;
            let db = toxlens::db::open_sqlite(&config.db_path)?;
            let new = toxlens::db::models::NewProduct::new(name, mode.parse()?);
            let product = db.insert_product(&new).await?;
            println!("Product created: {}", product.product_name.bold());
            println!("  product_id: {}", product.product_id);
            println!("  mode:       {}", product.mode);
            println!("  api_key:    {}", new.api_key.yellow());
            println!(
                "\n{}",
                "Store the api key now; only its digest is kept.".dimmed()
            );
        }

        Commands::VaultExample => {
            println!("{}", serde_json::to_string_pretty(&Vault::schema())?);
        }

        Commands::Check {
            text,
            output,
            vault,
            file,
            fixture,
            concurrency,
        } => {
            let config = Config::load()?;
            let direction = if output {
                Direction::Output
            } else {
                Direction::Input
            };
            let vault = match vault {
                Some(path) => read_json::<Vault>(&path)?,
                None => Vault::example(),
            };
            let texts = collect_texts(text, file.as_deref())?;
            let adapter = create_adapter(&config, fixture.as_deref())?;
            run_check(adapter, vault, direction, texts, concurrency).await?;
        }

        #[cfg(feature = "web")]
        Commands::Serve { port, bind } => {
            let config = Config::load()?;
            let adapter = create_adapter(&config, None)?;
            let db = open_result_store(&config)?;
            let analyzer = Arc::new(toxlens::analyzer::Analyzer::new(
                adapter,
                Arc::new(toxlens::vault::TenantVault::new()),
                db,
            ));
            toxlens::web::run_server(config, analyzer, port, &bind).await?;
        }
    }

    Ok(())
}

/// Create the inference adapter: a fixture file when given, else the ONNX model.
fn create_adapter(config: &Config, fixture: Option<&Path>) -> Result<Arc<dyn InferenceAdapter>> {
    if let Some(path) = fixture {
        info!("Using fixed inference output from {}", path.display());
        let output = read_json::<InferenceOutput>(path)?;
        return Ok(Arc::new(StaticInference::new(output)));
    }

    config.require_model()?;
    info!("Using local ONNX classifier");
    let adapter = OnnxInferenceAdapter::load(&config.model_dir, config.max_tokens)?;
    Ok(Arc::new(adapter))
}

/// SQLite when compiled in, otherwise an in-memory store.
#[cfg(feature = "web")]
fn open_result_store(config: &Config) -> Result<Arc<dyn toxlens::db::Database>> {
    #[cfg(feature = "sqlite")]
    {
        toxlens::db::initialize_sqlite(&config.db_path)
    }
    #[cfg(not(feature = "sqlite"))]
    {
        tracing::warn!(
            db_path = %config.db_path,
            "Built without the 'sqlite' feature; results are kept in memory only"
        );
        Ok(Arc::new(toxlens::db::MemoryDatabase::new()))
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("Invalid JSON in {}", path.display()))
}

fn collect_texts(text: Option<String>, file: Option<&Path>) -> Result<Vec<String>> {
    match (text, file) {
        (Some(text), None) => Ok(vec![text]),
        (None, Some(path)) => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            Ok(raw
                .lines()
                .map(str::trim)
                .filter(|l| !l.is_empty())
                .map(str::to_string)
                .collect())
        }
        (Some(_), Some(_)) => anyhow::bail!("Pass either TEXT or --file, not both"),
        (None, None) => anyhow::bail!("Nothing to check: pass TEXT or --file"),
    }
}

/// Evaluate every text, `concurrency` at a time, printing in input order.
async fn run_check(
    adapter: Arc<dyn InferenceAdapter>,
    vault: Vault,
    direction: Direction,
    texts: Vec<String>,
    concurrency: usize,
) -> Result<()> {
    terminal::display_vault(&vault);

    let engine = VerdictEngine::new(adapter);
    let engine = &engine;
    let vault = &vault;

    let results: Vec<_> = stream::iter(texts)
        .map(|text| async move {
            let verdict = engine.evaluate(&text, vault, direction).await;
            (text, verdict)
        })
        .buffered(concurrency.max(1))
        .collect()
        .await;

    let total = results.len();
    let mut rejected = 0usize;
    for (text, verdict) in results {
        let verdict = verdict.with_context(|| {
            format!("Failed to score: {}", toxlens::output::truncate_chars(&text, 50))
        })?;
        if verdict.reject_flag {
            rejected += 1;
        }
        terminal::display_verdict(&text, direction, &verdict);
        println!();
    }

    println!("{rejected} of {total} texts rejected");
    Ok(())
}
