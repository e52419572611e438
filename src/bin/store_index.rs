use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;

use rag_chat_backend::core::config::{AppPaths, ConfigService};
use rag_chat_backend::core::logging;
use rag_chat_backend::embedding::build_embedder;
use rag_chat_backend::rag::IngestPipeline;
use rag_chat_backend::vector::build_index;

/// Loads every PDF of a directory plus web pages into the vector index.
#[derive(Parser)]
#[command(name = "store-index", about = "Bulk-load documents into the vector index", version)]
struct Cli {
    /// Directory of PDFs (default: the uploads directory)
    #[arg(long)]
    pdf_dir: Option<PathBuf>,

    /// Web page to ingest; repeatable (default: ingest.default_urls)
    #[arg(long = "url")]
    urls: Vec<String>,

    /// Ingest only the PDF directory
    #[arg(long)]
    no_urls: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    logging::init_cli();
    let cli = Cli::parse();

    let paths = Arc::new(AppPaths::new());
    let settings = ConfigService::new(paths.clone())
        .load_settings()
        .context("Failed to load configuration")?;

    let pdf_dir = cli
        .pdf_dir
        .unwrap_or_else(|| settings.ingest.uploads_path(&paths));
    let urls = if cli.no_urls {
        Vec::new()
    } else if cli.urls.is_empty() {
        settings.ingest.default_urls.clone()
    } else {
        cli.urls
    };

    println!("Starting data ingestion...");
    let embedder = build_embedder(&settings.embedding)
        .await
        .context("Failed to initialize embedding provider")?;
    let index = build_index(&settings)
        .await
        .context("Failed to connect to vector index")?;
    let pipeline = IngestPipeline::from_settings(&settings.ingest, embedder, index)?;

    println!("Pushing to index: {}...", settings.index.name);
    let report = pipeline
        .ingest_directory(&pdf_dir, &urls)
        .await
        .with_context(|| format!("Error pushing to index '{}'", settings.index.name))?;

    println!(
        "Successfully ingested {} documents ({} chunks).",
        report.documents, report.chunks
    );
    Ok(())
}
