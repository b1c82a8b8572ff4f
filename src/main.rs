use anyhow::Result;
use clap::{Parser, Subcommand};
use pdf_a11y_scan::utils::logging;
use pdf_a11y_scan::{App, Config, ReportSummary};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "pdf-a11y-scan")]
#[command(about = "Accessibility analysis of PDF and web page links with batched remote scans")]
#[command(version)]
struct Cli {
    /// Optional TOML configuration file (environment variables override it)
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze the input sheet (default)
    Run {
        /// Delete earlier output and persisted results before starting
        #[arg(long)]
        reset: bool,
    },

    /// Summarize persisted scan results
    Summary,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    logging::init();

    let cli = Cli::parse();
    let mut config = Config::load(cli.config.as_deref())?;

    match cli.command.unwrap_or(Commands::Run { reset: false }) {
        Commands::Run { reset } => {
            config.reset |= reset;
            App::initialize(config).await?.run().await?;
        }
        Commands::Summary => {
            let summary = ReportSummary::load(&config.results_dir).await?;
            summary.log(&config.results_dir);
        }
    }

    Ok(())
}
