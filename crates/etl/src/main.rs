use std::path::PathBuf;

use anyhow::{Context, Result};
use billing_etl::{pipeline, PipelineConfig};
use billing_storage::{
    parse_month, PageRequest, SummaryFilter, SummaryReader, DEFAULT_PAGE_SIZE,
};
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "billing-etl",
    version,
    about = "Repair a billing export and load its monthly summary",
    long_about = "Reads the raw billing export, repairs and normalizes every line, \
                  writes the normalized and monthly summary CSV exports and replaces \
                  the summary table in the SQLite database."
)]
struct Cli {
    /// Pipeline configuration file (TOML)
    #[arg(short, long, global = true, env = "BILLING_ETL_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the whole pipeline and print the run report as JSON
    Run(RunArgs),
    /// Print one page of the loaded summary as JSON
    Query(QueryArgs),
}

#[derive(Args)]
struct RunArgs {
    /// Raw billing export
    #[arg(short, long)]
    input: Option<PathBuf>,
    /// Normalized CSV export
    #[arg(long)]
    normalized_export: Option<PathBuf>,
    /// Monthly summary CSV export
    #[arg(long)]
    summary_export: Option<PathBuf>,
    /// SQLite database receiving the summary table
    #[arg(short, long, env = "BILLING_DATABASE")]
    database: Option<PathBuf>,
}

impl RunArgs {
    fn apply(self, config: &mut PipelineConfig) {
        if let Some(input) = self.input {
            config.input = input;
        }
        if let Some(path) = self.normalized_export {
            config.normalized_export = path;
        }
        if let Some(path) = self.summary_export {
            config.summary_export = path;
        }
        if let Some(database) = self.database {
            config.database = database;
        }
    }
}

#[derive(Args)]
struct QueryArgs {
    /// SQLite database holding the summary table
    #[arg(short, long, env = "BILLING_DATABASE")]
    database: Option<PathBuf>,
    /// Creditor substring (case-insensitive)
    #[arg(long)]
    creditor: Option<String>,
    /// Status substring (case-insensitive)
    #[arg(long)]
    status: Option<String>,
    /// Month in YYYY-MM format
    #[arg(long)]
    month: Option<String>,
    #[arg(long, default_value_t = 1)]
    page: u32,
    #[arg(long, default_value_t = DEFAULT_PAGE_SIZE)]
    page_size: u32,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut config = PipelineConfig::load_or_default(cli.config.as_deref())
        .context("Failed to load pipeline configuration")?;

    match cli.command {
        Commands::Run(args) => {
            args.apply(&mut config);
            let report = pipeline::run(&config)
                .await
                .context("Billing pipeline failed")?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        Commands::Query(args) => {
            let database = args.database.unwrap_or(config.database);
            let filter = SummaryFilter {
                creditor: args.creditor,
                status: args.status,
                month: args.month.as_deref().map(parse_month).transpose()?,
            };
            let page = PageRequest::new(args.page, args.page_size)?;

            let reader = SummaryReader::open(&database)
                .await
                .with_context(|| format!("Failed to open {}", database.display()))?;
            let result = reader.list(&filter, page).await?;
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
    }

    Ok(())
}
