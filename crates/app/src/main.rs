mod server;

use std::sync::Arc;

use anyhow::Context;
use chrono::Utc;
use clap::{Parser, Subcommand};
use lawgpt_core::{
    ingest_path, ChunkingConfig, FlatIndex, GeminiChat, GeminiEmbedder, GenerationConfig,
    HistoryLog, IngestOptions, QaEngine, Retriever, RetrieverPolicy, Settings,
};
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "lawgpt", version, about = "Legal research assistant API")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Ingest a document or folder and rebuild the vector index.
    Ingest {
        /// PDF/DOCX file, or a folder scanned recursively.
        #[arg(long)]
        path: std::path::PathBuf,
    },
    /// Start the HTTP API server.
    Serve {
        /// Bind host; falls back to API_HOST, then 0.0.0.0.
        #[arg(long, env = "API_HOST")]
        host: Option<String>,
        /// Bind port; falls back to API_PORT, then 8800.
        #[arg(long, env = "API_PORT")]
        port: Option<u16>,
    },
    /// Answer one question on the console.
    Ask {
        question: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(fmt::layer())
        .init();

    let cli = Cli::parse();
    let settings = Settings::from_env().context("invalid configuration")?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        started_at = %Utc::now().to_rfc3339(),
        "lawgpt boot"
    );

    match cli.command {
        Command::Ingest { path } => {
            let embedder = GeminiEmbedder::new(
                &settings.google_api_key,
                &settings.embedding_model,
                settings.request_timeout,
            )?;
            let options = IngestOptions {
                chunking: ChunkingConfig {
                    chunk_size: settings.chunk_size,
                    chunk_overlap: settings.chunk_overlap,
                },
            };

            let (_index, report) =
                ingest_path(&path, &embedder, &options, &settings.index_dir).await?;

            for skipped in &report.skipped {
                warn!(path = %skipped.path.display(), reason = %skipped.reason, "skipped document");
            }
            println!(
                "{} chunks from {} file(s) indexed at {} ({} skipped)",
                report.chunks,
                report.files,
                settings.index_dir.display(),
                report.skipped.len()
            );
        }
        Command::Serve { host, port } => {
            let engine = Arc::new(build_engine(&settings)?);
            let host = host.unwrap_or_else(|| settings.api_host.clone());
            let port = port.unwrap_or(settings.api_port);
            server::serve(engine, &format!("{host}:{port}")).await?;
        }
        Command::Ask { question } => {
            let engine = build_engine(&settings)?;
            match engine.answer(&question).await {
                Ok(result) => println!("{}", result.text),
                Err(error) => {
                    warn!(%error, "question failed");
                    println!("{}", error.user_message());
                }
            }
        }
    }

    Ok(())
}

/// Wires the query-time engine: persisted index, remote embedder and LLM,
/// and the on-disk conversation history.
fn build_engine(settings: &Settings) -> anyhow::Result<QaEngine> {
    let index = FlatIndex::open(&settings.index_dir).with_context(|| {
        format!(
            "could not load the vector index from {}; run `lawgpt ingest` first",
            settings.index_dir.display()
        )
    })?;
    info!(entries = index.len(), "vector index loaded");

    let embedder = GeminiEmbedder::new(
        &settings.google_api_key,
        &settings.embedding_model,
        settings.request_timeout,
    )?;

    let policy = RetrieverPolicy {
        search_k: settings.retriever_search_k,
        fetch_k: settings.retriever_fetch_k,
        ..RetrieverPolicy::default()
    };
    let retriever = Retriever::new(index, Arc::new(embedder), policy);

    let llm = GeminiChat::new(
        &settings.google_api_key,
        &settings.llm_model,
        GenerationConfig {
            temperature: settings.temperature,
            max_output_tokens: settings.max_tokens,
            top_p: settings.top_p,
            top_k: settings.top_k,
        },
        settings.request_timeout,
    )?;

    let history = HistoryLog::load(&settings.history_file).with_context(|| {
        format!(
            "could not load conversation history from {}",
            settings.history_file.display()
        )
    })?;
    info!(entries = history.len(), "conversation history loaded");

    Ok(QaEngine::new(retriever, Arc::new(llm), history))
}
