//! Lectern catalog browser
//!
//! Mounts one catalog view against a JSON-RPC endpoint, runs a single load
//! and prints the results.
//!
//! Usage:
//!   CATALOG_RPC_URL=http://localhost:8069/jsonrpc lectern --search tolkien

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use lectern_catalog::prefs::PreferenceStore;
use lectern_catalog::{
    CatalogConfig, CatalogSource, CatalogView, FilterKey, ReloadOutcome, ResultStatus,
    RpcCatalogSource,
};

/// Command line arguments.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// URL query string to seed filters from, e.g. "category=3&order=date_desc".
    #[arg(long)]
    params: Option<String>,

    /// Search term applied on top of the seeded filters.
    #[arg(long)]
    search: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let args = Args::parse();
    let config = CatalogConfig::from_env().context("failed to load configuration")?;
    let source: Arc<dyn CatalogSource> =
        Arc::new(RpcCatalogSource::from_config(&config).context("failed to create RPC source")?);
    info!(source = source.name(), limit = config.result_limit, "catalog source ready");

    let store = PreferenceStore::new(&config.prefs_path);
    let mut prefs = store.load().await?;

    let view = CatalogView::mount(source, &config, args.params.as_deref());
    let outcome = match args.search.as_deref() {
        Some(term) => {
            prefs.remember_search(term);
            view.set_filter(FilterKey::Search, term).await
        }
        None => view.reload().await,
    };
    info!(?outcome, query = %view.query_string(), "catalog load settled");

    let results = view.results();
    match results.status() {
        ResultStatus::Loaded => {
            for record in &results.records {
                let marker = if prefs.is_bookmarked(record.id) { "*" } else { " " };
                println!(
                    "{marker} {:>6}  {}",
                    record.id,
                    record.display_name().unwrap_or("(untitled)")
                );
            }
        }
        ResultStatus::NoResults => println!("No records match the current filters."),
        ResultStatus::Failed => {
            let message = results.error.as_deref().unwrap_or("unknown error");
            eprintln!("Catalog unavailable: {message}");
        }
        ResultStatus::NotLoaded | ResultStatus::Loading => {
            eprintln!("Catalog load did not complete ({outcome:?})");
        }
    }

    view.teardown();
    store.save(&prefs).await?;

    if outcome == ReloadOutcome::Failed {
        std::process::exit(1);
    }
    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,lectern_catalog=debug"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
