//! Kubejudge - automated answer verification for Kubernetes RAG evaluation.
//!
//! This service verifies machine-generated answers against reference
//! answers, combining structural checks (manifest field diffs, shell
//! syntax), live dry-run execution, and LLM-judged fact checking into one
//! normalized verdict per entry.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tokio::net::TcpListener;

mod api;
mod batch;
mod config;
mod domain;
mod engine;
mod error;
mod llm;
mod logging;
mod tools;

use crate::api::build_router;
use crate::config::Config;
use crate::engine::{LlmEntailmentJudge, VerificationCoordinator};
use crate::llm::OpenAiChatClient;
use crate::tools::KubeToolchain;

#[derive(Parser)]
#[command(name = "kubejudge", version, about)]
struct Cli {
    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand)]
enum Cmd {
    /// Run the HTTP verification service.
    Serve,
    /// Verify a JSON entry file and write the augmented results.
    Batch {
        /// Processed entries (JSON array).
        #[arg(long, short)]
        input: PathBuf,
        /// Where to write evaluated entries.
        #[arg(long, short)]
        output: PathBuf,
    },
}

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// The verification coordinator.
    pub coordinator: Arc<VerificationCoordinator>,
}

fn build_coordinator(config: &Config) -> anyhow::Result<Arc<VerificationCoordinator>> {
    let client = Arc::new(OpenAiChatClient::new(config.llm.clone()).map_err(|e| {
        tracing::error!(error = %e, "Failed to build completion client");
        anyhow::anyhow!("Completion client error: {}", e)
    })?);

    let tools = Arc::new(KubeToolchain::new(config.tools.clone()));
    let judge = Arc::new(LlmEntailmentJudge::new(client.clone()));

    Ok(Arc::new(VerificationCoordinator::new(
        tools,
        client,
        judge,
        config.tools.clone(),
        config.verification.clone(),
    )))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load environment variables from .env file (if present)
    // This is optional and won't fail if .env doesn't exist
    if let Err(e) = dotenvy::dotenv() {
        eprintln!("Note: No .env file loaded ({e})");
    }

    // Initialize logging
    logging::init();

    tracing::info!("Starting Kubejudge v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config = Config::load().map_err(|e| {
        tracing::error!(error = %e, "Failed to load configuration");
        anyhow::anyhow!("Configuration error: {}", e)
    })?;

    tracing::info!(
        model = %config.llm.model,
        llm_concurrency = config.llm.max_concurrency,
        namespace = %config.tools.namespace,
        scoring = ?config.verification.scoring,
        "Configuration loaded"
    );

    let coordinator = build_coordinator(&config)?;

    match cli.cmd {
        Cmd::Serve => {
            let state = AppState { coordinator };
            let app = build_router(state);

            let addr = format!("{}:{}", config.server.host, config.server.port);
            let listener = TcpListener::bind(&addr).await?;

            tracing::info!(address = %addr, "Server listening");
            axum::serve(listener, app).await?;
        }
        Cmd::Batch { input, output } => {
            let count = batch::run_file(
                coordinator,
                &input,
                &output,
                config.verification.max_concurrent_entries,
            )
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Batch run failed");
                anyhow::anyhow!("Batch error: {}", e)
            })?;

            tracing::info!(count, output = %output.display(), "Wrote evaluated entries");
        }
    }

    Ok(())
}
