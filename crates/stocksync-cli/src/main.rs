use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use std::path::PathBuf;
use stocksync_engine::{build_resolution_index, reconcile_batch, BatchMode, SyncRunArgs};
use tracing::info;

#[derive(Parser)]
#[command(name = "stocksync")]
#[command(about = "Batch EAN13 quantity synchronization into a storefront catalog", long_about = None)]
struct Cli {
    /// Quantities file: one `<ean13>;<quantity>` row per line, no header.
    input: PathBuf,

    /// Config file: `<db_name> <db_user> <db_password> <table_prefix>`.
    config: PathBuf,

    /// Batch failure policy (best-effort | atomic)
    #[arg(long, default_value = "best-effort")]
    mode: String,

    /// Write the batch outcome as JSON to this path.
    #[arg(long)]
    report: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env.local if present (dev convenience). Silent if absent —
    // production injects env vars directly.
    let _ = dotenvy::from_filename(".env.local");

    init_tracing();

    let cli = Cli::parse();
    let mode = BatchMode::parse(&cli.mode)?;

    let started_at_utc = Utc::now();
    info!(
        input_path = %cli.input.display(),
        config_path = %cli.config.display(),
        "started execution"
    );

    let config = stocksync_config::load_sync_config(&cli.config)
        .with_context(|| format!("failed to read config: {}", cli.config.display()))?;
    info!(
        db_name = %config.db_name,
        db_user = %config.db_user,
        table_prefix = %config.table_prefix,
        "parsed config"
    );

    let records = stocksync_input::read_quantity_records(&cli.input)
        .with_context(|| format!("failed to parse quantities: {}", cli.input.display()))?;
    info!(num = records.len(), "parsed quantities");

    let pool = stocksync_db::connect(&config).await?;
    stocksync_db::status(&pool).await?;
    info!("connected and pinged database");

    let mut gateway = stocksync_db::MySqlCatalog::new(pool, &config.table_prefix)?;

    let index = build_resolution_index(&mut gateway, &records).await;
    info!(
        entries = index.len(),
        lookup_failures = index.lookup_failures,
        "built secondary id index"
    );

    let outcome = reconcile_batch(
        &mut gateway,
        &records,
        &index,
        SyncRunArgs {
            mode,
            sync_id: None,
        },
    )
    .await?;
    let finished_at_utc = Utc::now();

    if let Some(path) = &cli.report {
        let report = serde_json::json!({
            "started_at_utc": started_at_utc.to_rfc3339(),
            "finished_at_utc": finished_at_utc.to_rfc3339(),
            "outcome": outcome,
        });
        std::fs::write(path, serde_json::to_vec_pretty(&report)?)
            .with_context(|| format!("write report failed: {}", path.display()))?;
    }

    println!("sync_id={}", outcome.sync_id);
    println!("mode={}", outcome.mode.as_str());
    println!("records_total={}", outcome.results.len());
    println!("records_failed={}", outcome.failed_records());
    println!("batch_succeeded={}", outcome.succeeded);

    Ok(())
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .init();
}
