//! Billing summary API
//!
//! Endpoints:
//! - GET /health - Health check
//! - GET /summary - Paginated monthly summary (creditor, status, month filters)
//! - GET /summary/aggregations - Totals per status, per creditor and overall
//! - GET /summary/months - Months present in the summary
//! - GET /summary/creditors - Creditors present in the summary

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod routes;

use routes::{router, AppState};

#[derive(Parser)]
#[command(name = "billing-server", version, about = "Serve the monthly billing summary over HTTP")]
struct Args {
    /// SQLite database written by billing-etl
    #[arg(long, env = "BILLING_DATABASE", default_value = "resumo.db")]
    database: PathBuf,

    /// Address to listen on
    #[arg(long, env = "BILLING_BIND", default_value = "127.0.0.1:8000")]
    bind: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    if !args.database.exists() {
        tracing::warn!(
            database = %args.database.display(),
            "database not found yet, summary endpoints answer 503 until the pipeline runs"
        );
    }

    let app = router(Arc::new(AppState::new(args.database)));

    let listener = tokio::net::TcpListener::bind(&args.bind)
        .await
        .with_context(|| format!("Failed to bind {}", args.bind))?;
    info!(bind = %args.bind, "billing summary API listening");

    axum::serve(listener, app).await?;

    Ok(())
}
