use std::io;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::io::BufReader;
use tracing::error;
use tracing_subscriber::EnvFilter;

use pdf_rag_chat::store::{self, VectorStore};
use pdf_rag_chat::{
    ingest_pdf, validate_system, Provider, RagPipeline, RagResult, Settings, Shell, SystemStatus,
};

#[derive(Parser)]
#[command(name = "pdf-rag-chat")]
#[command(version = "0.1")]
#[command(about = "Ask questions about a PDF, answered only from its content", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load PDF_PATH, split and embed it, and replace the stored collection
    Ingest,
    /// Interactive question loop over the ingested PDF
    Chat,
}

fn init_tracing(default_filter: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();
    let settings = Settings::from_env();

    match cli.command {
        Commands::Ingest => {
            init_tracing("info");
            ingest_command(&settings).await
        }
        Commands::Chat => {
            init_tracing("error");
            chat_command(&settings).await
        }
    }
}

async fn ingest_command(settings: &Settings) -> Result<()> {
    let run = async {
        let provider = Provider::from_config(&settings.resolve_provider()?);
        let store = store::connect(&settings.database_url).await?;
        ingest_pdf(settings, &provider, store.as_ref()).await
    };
    let report = run.await.inspect_err(|e| error!("Ingestion failed: {e}"))?;

    println!(
        "Ingested {} pages into {} chunks (collection '{}')",
        report.pages, report.chunks, settings.collection_name
    );
    Ok(())
}

async fn open_session(settings: &Settings) -> RagResult<(Box<dyn VectorStore>, SystemStatus)> {
    settings.resolve_provider()?;
    let store = store::connect(&settings.database_url).await?;
    let status = validate_system(settings, store.as_ref()).await?;
    Ok((store, status))
}

async fn chat_command(settings: &Settings) -> Result<()> {
    let mut shell = Shell::new(BufReader::new(tokio::io::stdin()), io::stdout());
    shell.clear_screen()?;
    shell.print_header()?;

    let (store, status) = match open_session(settings).await {
        Ok(session) => session,
        Err(e) => {
            shell.print_startup_error(&e)?;
            return Ok(());
        }
    };
    shell.print_status(&status)?;

    let provider = Provider::from_config(&status.provider);
    let pipeline = RagPipeline::new(settings, &provider, &provider, store.as_ref());
    shell
        .run(&pipeline, tokio::signal::ctrl_c())
        .await
        .context("interactive session failed")
}
