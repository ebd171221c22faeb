//! paperloom CLI: ingest one research-paper PDF from Cloud Storage.
//!
//! Loads config from the environment, builds the pipeline over the real
//! Google clients, and runs it once for the given object name.

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use config::PipelineConfig;
use paperloom::pipeline::{initial_state, keys, PipelineBuilder};
use paperloom::tasks::{BigQueryWarehouse, GcsObjectStore, VertexLlm};

#[derive(Parser, Debug)]
#[command(name = "paperloom")]
#[command(about = "paperloom — ingest a research paper PDF into the warehouse")]
struct Args {
    /// Object name of the PDF in the configured storage bucket
    #[arg(value_name = "OBJECT")]
    object: String,

    /// Verbose: log node enter/exit and state updates
    #[arg(short, long)]
    verbose: bool,
}

fn init_tracing(verbose: bool) {
    let default = if verbose {
        "paperloom=debug,cli=debug"
    } else {
        "paperloom=info,cli=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .init();
}

async fn run(args: &Args) -> Result<(), Box<dyn std::error::Error>> {
    let config = PipelineConfig::from_env()?;
    let timeout = config.request_timeout();

    let store = Arc::new(GcsObjectStore::new(
        &config.google_storage_bucket_name,
        &config.google_access_token,
        timeout,
    )?);
    let warehouse = Arc::new(BigQueryWarehouse::new(
        &config.google_project_id,
        &config.bigquery_dataset_id,
        &config.google_access_token,
        timeout,
    )?);
    let llm = Arc::new(VertexLlm::new(
        &config.google_project_id,
        &config.google_location,
        &config.vertex_ai_model,
        &config.google_access_token,
        timeout,
    )?);

    let graph = PipelineBuilder::new(store, warehouse, llm).build()?;
    let final_state = graph.invoke(initial_state(args.object.clone())).await?;

    match final_state.state.get(keys::PROCESSED) {
        Some(serde_json::Value::Bool(true)) => {
            tracing::info!(object = %args.object, "Paper already ingested, nothing to do");
        }
        _ => {
            let paper_id = final_state
                .state
                .get(keys::PAPER_ID)
                .and_then(|v| v.as_str())
                .unwrap_or("unknown");
            tracing::info!(object = %args.object, paper_id = %paper_id, "Paper ingested");
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    init_tracing(args.verbose);
    match run(&args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "Ingestion failed");
            ExitCode::FAILURE
        }
    }
}
