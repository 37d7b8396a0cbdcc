//! Command-line surface: `batch` parses a folder into JSON Lines, `serve` runs the HTTP API.
//!
//! Both commands probe the inference endpoint before doing any work, so an
//! unreachable daemon aborts the run up front instead of failing every file.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;

use crate::config::Config;
use crate::llm_client::OllamaClient;
use crate::models::resume::OutputRow;
use crate::parsing::pipeline::{collect_documents, PipelineConfig, ResumePipeline};
use crate::routes::build_router;
use crate::state::AppState;

#[derive(Parser, Debug)]
#[command(
    name = "resume_parser",
    version,
    about = "Extract name, email and skills from PDF/DOCX resumes with a local LLM."
)]
pub struct Cli {
    /// Inference endpoint base address (overrides OLLAMA_HOST)
    #[arg(long, global = true)]
    pub host: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Parse every PDF/DOCX in a folder and write one JSON line per file
    Batch(BatchArgs),

    /// Serve the HTTP parsing API
    Serve(ServeArgs),
}

#[derive(Args, Debug)]
pub struct BatchArgs {
    /// Folder with PDF/DOCX resumes
    #[arg(long)]
    pub resumes: PathBuf,

    /// Ollama model tag (overrides RESUME_MODEL)
    #[arg(long)]
    pub model: Option<String>,

    /// Output JSON Lines file
    #[arg(long = "dump-json", default_value = "preds.jsonl")]
    pub dump_json: PathBuf,
}

#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Ollama model tag (overrides RESUME_MODEL)
    #[arg(long)]
    pub model: Option<String>,

    /// Listen port (overrides PORT)
    #[arg(long)]
    pub port: Option<u16>,
}

impl Cli {
    pub async fn run(self, config: Config) -> Result<()> {
        match self.command {
            Commands::Batch(args) => {
                let config = config.with_overrides(self.host, args.model.clone());
                run_batch(args, config).await
            }
            Commands::Serve(args) => {
                let mut config = config.with_overrides(self.host, args.model.clone());
                if let Some(port) = args.port {
                    config.port = port;
                }
                run_serve(config).await
            }
        }
    }
}

fn build_pipeline(config: &Config) -> ResumePipeline {
    ResumePipeline::new(
        Arc::new(OllamaClient::new(config.ollama_host.clone())),
        PipelineConfig {
            model: config.model.clone(),
        },
    )
}

async fn run_batch(args: BatchArgs, config: Config) -> Result<()> {
    let pipeline = build_pipeline(&config);
    pipeline.ensure_reachable().await?;

    let paths = collect_documents(&args.resumes)?;
    info!(
        "Parsing {} resume(s) from {} with model {}",
        paths.len(),
        args.resumes.display(),
        pipeline.model()
    );

    let file = File::create(&args.dump_json)
        .with_context(|| format!("Cannot create '{}'", args.dump_json.display()))?;
    let mut out = BufWriter::new(file);

    let mut failed = 0usize;
    // Rows are written as they complete so a long batch leaves partial output behind.
    for path in &paths {
        let row = pipeline.parse_timed(path).await.into_row();
        if row.is_error() {
            failed += 1;
        }
        write_row(&mut out, &row)?;
        info!("{}", row.to_json_line()?);
    }
    out.flush()?;

    info!(
        "Wrote {} row(s) to {} (processed={}, failed={})",
        paths.len(),
        args.dump_json.display(),
        paths.len() - failed,
        failed
    );
    Ok(())
}

fn write_row<W: Write>(out: &mut W, row: &OutputRow) -> Result<()> {
    writeln!(out, "{}", row.to_json_line()?)?;
    Ok(())
}

async fn run_serve(config: Config) -> Result<()> {
    let pipeline = build_pipeline(&config);
    pipeline.ensure_reachable().await?;
    info!(
        "Inference endpoint {} reachable (model: {})",
        pipeline.endpoint(),
        pipeline.model()
    );

    let state = AppState {
        pipeline: Arc::new(pipeline),
        config: config.clone(),
    };

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
