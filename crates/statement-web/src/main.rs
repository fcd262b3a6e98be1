use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use statement_core::{StatementMetadata, StatementRenderer, StatementStore, write_atomic};
use statement_web::config::Config;
use statement_web::server;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "statement-web", version, about = "Render account statement PDFs from spreadsheets")]
struct Cli {
    /// Config file (defaults to ./config.toml when present)
    #[arg(long, env = "STATEMENT_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Upload store directory (overrides storage.data_dir)
    #[arg(long, env = "DATA_DIR", global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP server (default)
    Serve {
        /// Listen address (overrides server.addr)
        #[arg(long, env = "STATEMENT_ADDR")]
        addr: Option<String>,
    },
    /// Render one spreadsheet + metadata record to a PDF file
    Render {
        #[arg(long)]
        spreadsheet: PathBuf,
        /// JSON metadata record
        #[arg(long)]
        metadata: PathBuf,
        #[arg(long)]
        output: PathBuf,
        /// Statement date as DD/MM/YYYY (default: today)
        #[arg(long, value_parser = parse_date)]
        as_of: Option<NaiveDate>,
    },
    /// Render the newest spreadsheet in the store with the newest metadata record
    RenderLatest {
        /// Statement date as DD/MM/YYYY (default: today)
        #[arg(long, value_parser = parse_date)]
        as_of: Option<NaiveDate>,
    },
}

fn parse_date(s: &str) -> std::result::Result<NaiveDate, String> {
    NaiveDate::parse_from_str(s, "%d/%m/%Y").map_err(|e| format!("expected DD/MM/YYYY: {e}"))
}

/// Write a rendered statement; the file only appears once complete.
fn write_pdf(output: &Path, pdf: &[u8]) -> Result<()> {
    let output = if output.parent().is_some_and(|p| p.as_os_str().is_empty()) {
        Path::new(".").join(output)
    } else {
        output.to_path_buf()
    };
    write_atomic(&output, pdf).with_context(|| format!("Failed to write {}", output.display()))
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(dir) = cli.data_dir {
        config.storage.data_dir = dir;
    }
    let today = || Local::now().date_naive();

    match cli.command.unwrap_or(Command::Serve { addr: None }) {
        Command::Serve { addr } => {
            if let Some(addr) = addr {
                config.server.addr = addr;
            }
            server::serve(&config).await?;
        }
        Command::Render {
            spreadsheet,
            metadata: metadata_path,
            output,
            as_of,
        } => {
            let metadata = StatementMetadata::load(&metadata_path)
                .with_context(|| format!("Failed to read metadata record {}", metadata_path.display()))?;
            let renderer = StatementRenderer::new(config.labels.clone());
            let pdf = renderer
                .render_file(&spreadsheet, &metadata, as_of.unwrap_or_else(today))
                .with_context(|| format!("Failed to render {}", spreadsheet.display()))?;
            write_pdf(&output, &pdf)?;
            tracing::info!(output = %output.display(), bytes = pdf.len(), "statement written");
        }
        Command::RenderLatest { as_of } => {
            let store = StatementStore::open(&config.storage.data_dir)
                .with_context(|| format!("Failed to open data dir {}", config.storage.data_dir.display()))?;
            let rendered = StatementRenderer::new(config.labels.clone())
                .render_latest(&store, as_of.unwrap_or_else(today))
                .context("Failed to render latest upload")?;
            println!("{}", rendered.path.display());
        }
    }

    Ok(())
}
