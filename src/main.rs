//! # Horus Compliance News
//!
//! Batch pipeline behind the Horus.AI legal/compliance news site. It pulls
//! news records from four Feishu bitable tables, caches them as static JSON
//! snapshot files, and serves a merged, filterable, recency-sorted view over
//! those snapshots.
//!
//! ## Usage
//!
//! ```sh
//! # Refresh all four category snapshots
//! horus_compliance_news fetch --all --data-dir ./data
//!
//! # Query the merged view
//! horus_compliance_news query --category 全部资讯 --search 芯片
//! ```
//!
//! ## Architecture
//!
//! Data flows in one direction:
//! 1. **Fetch**: one batch job per category pages through the bitable search
//!    API (up to 100 records, 10 pages) and writes a snapshot file
//! 2. **Aggregate**: the engine loads whatever snapshots exist, normalizes
//!    each record, merges, and sorts by recency
//! 3. **Filter**: query subcommands evaluate filter predicates over the
//!    merged view and print JSON for the front end

use clap::Parser;
use futures::stream::{self, StreamExt};
use std::error::Error;
use std::path::Path;
use tracing::{debug, error, info};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod api;
mod cli;
mod engine;
mod fetch;
mod models;
mod outputs;
mod sources;
mod utils;

use api::{BitableClient, CategorySearch, FEISHU_BASE_URL, FeishuCredentials};
use cli::{Cli, Command};
use fetch::{FetchOptions, fetch_category};
use models::FilterRequest;
use sources::{ALL_SOURCES, DataSource};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!("horus_compliance_news starting up");

    let args = Cli::parse();
    debug!(?args.command, "Parsed CLI arguments");

    match args.command {
        Command::Fetch {
            category,
            all,
            data_dir,
            app_id,
            app_secret,
        } => {
            run_fetch(category, all, &data_dir, app_id, app_secret).await?;
        }
        Command::Query {
            data_dir,
            category,
            publisher,
            field,
            industry,
            search,
        } => {
            let items = engine::load_all(Path::new(&data_dir));
            let request = FilterRequest {
                category,
                publisher,
                field,
                industry,
                search,
            };
            let filtered = engine::filter_news(&items, &request);
            info!(total = items.len(), matched = filtered.len(), "Filtered news");
            println!("{}", serde_json::to_string_pretty(&filtered)?);
        }
        Command::Options { data_dir } => {
            let items = engine::load_all(Path::new(&data_dir));
            let options = engine::filter_options(&items);
            println!("{}", serde_json::to_string_pretty(&options)?);
        }
        Command::Stats { data_dir } => {
            let items = engine::load_all(Path::new(&data_dir));
            let stats = engine::news_stats(&items);
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
    }

    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        secs = elapsed.as_secs(),
        millis = elapsed.subsec_millis(),
        "Execution complete"
    );

    Ok(())
}

/// Run the fetch jobs for the selected categories.
///
/// The jobs share no state, so `--all` runs the four categories as
/// independent concurrent tasks. A failure in one category never blocks the
/// others, but any failure makes the whole invocation exit non-zero.
async fn run_fetch(
    category: Option<String>,
    all: bool,
    data_dir: &str,
    app_id: String,
    app_secret: String,
) -> Result<(), Box<dyn Error>> {
    let selected: Vec<DataSource> = if all {
        ALL_SOURCES.to_vec()
    } else {
        let slug = category.ok_or("pass --category <slug> or --all")?;
        let source = DataSource::from_slug(&slug)
            .ok_or_else(|| format!("unknown category slug: {slug}"))?;
        vec![source]
    };

    // Fail on an unwritable data directory before any network call.
    utils::ensure_writable_dir(data_dir).await?;

    let credentials = FeishuCredentials { app_id, app_secret };
    let client = BitableClient::authenticate(FEISHU_BASE_URL, &credentials).await?;
    let options = FetchOptions::default();

    let results: Vec<(DataSource, Result<(), Box<dyn Error>>)> = stream::iter(selected)
        .map(|source| {
            let client = &client;
            let options = &options;
            async move {
                let outcome = fetch_one(client, source, options, data_dir).await;
                (source, outcome)
            }
        })
        .buffer_unordered(ALL_SOURCES.len())
        .collect()
        .await;

    let mut failed = 0usize;
    for (source, outcome) in results {
        match outcome {
            Ok(()) => info!(source = source.slug(), "Category fetch succeeded"),
            Err(e) => {
                error!(source = source.slug(), error = %e, "Category fetch failed");
                failed += 1;
            }
        }
    }

    if failed > 0 {
        return Err(format!("{failed} category fetch(es) failed").into());
    }
    Ok(())
}

/// Fetch one category and persist its snapshot. The write only happens after
/// the fetch loop has fully completed.
async fn fetch_one(
    client: &BitableClient,
    source: DataSource,
    options: &FetchOptions,
    data_dir: &str,
) -> Result<(), Box<dyn Error>> {
    let searcher = CategorySearch { client, source };
    let snapshot = fetch_category(&searcher, source, options).await?;
    let path = outputs::json::write_snapshot(&snapshot, source, data_dir).await?;
    info!(
        path = %path.display(),
        records = snapshot.total_records,
        "Snapshot persisted"
    );
    Ok(())
}
