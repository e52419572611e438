use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;

use rag_chat_backend::core::config::{AppPaths, ConfigService, IndexBackend};
use rag_chat_backend::core::logging;
use rag_chat_backend::diagnostics::{self, CheckStatus, DiagnosticReport};
use rag_chat_backend::embedding::build_embedder;
use rag_chat_backend::vector::build_index;

/// Checks credentials, the model file and the index, then runs a sample query.
#[derive(Parser)]
#[command(name = "diagnose", about = "Check a deployment end to end", version)]
struct Cli {
    /// Print the effective configuration (secrets redacted)
    #[arg(long)]
    show_config: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    dotenvy::dotenv().ok();
    logging::init_cli();
    let cli = Cli::parse();

    let paths = Arc::new(AppPaths::new());
    let config = ConfigService::new(paths.clone());
    if cli.show_config {
        let raw = config.load_config().context("Failed to load configuration")?;
        println!(
            "{}",
            serde_json::to_string_pretty(&config.redact_sensitive_values(&raw))?
        );
    }
    let settings = config
        .load_settings()
        .context("Failed to load configuration")?;

    let mut report = DiagnosticReport::default();
    let mut proceed = diagnostics::check_environment(&settings, &paths, &mut report);

    if proceed && settings.index.backend == IndexBackend::Pinecone {
        proceed = diagnostics::check_index_listing(&settings, &mut report).await;
    }

    if proceed {
        match (build_index(&settings).await, build_embedder(&settings.embedding).await) {
            (Ok(index), Ok(embedder)) => {
                diagnostics::check_contents(index.as_ref(), embedder.as_ref(), &mut report).await;
            }
            (Err(err), _) => report.push("index", CheckStatus::Critical, err.to_string()),
            (_, Err(err)) => report.push("embeddings", CheckStatus::Critical, err.to_string()),
        }
    }

    print!("{}", report);
    if report.has_critical() {
        return Ok(ExitCode::FAILURE);
    }
    Ok(ExitCode::SUCCESS)
}
