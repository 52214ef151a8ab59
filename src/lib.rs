pub mod attribute_provider;
pub mod cache;
pub mod codes;
pub mod composition;
pub mod config;
pub mod enrich;
pub mod error;
pub mod exposure_provider;
pub mod log;
pub mod metadata;
pub mod providers;
pub mod resolver;
pub mod ui;

use crate::attribute_provider::AttributeProvider;
use anyhow::Result;
use std::sync::Arc;
use tracing::{debug, info};

/// Runs the overlap + POSE pipeline for one target ETF and prints the
/// resulting table.
pub async fn run(target: &str, config_path: Option<&str>) -> Result<()> {
    info!("Overlap pipeline starting...");

    let config = match config_path {
        Some(path) => config::AppConfig::load_from_path(path)?,
        None => config::AppConfig::load()?,
    };
    debug!("Loaded config: {config:#?}");

    // One resolution cache per process, shared by every orchestration call
    let resolution_cache = Arc::new(cache::Cache::<String, Option<String>>::new());
    let fbi = Arc::new(providers::fbi::FbiProvider::new(&config.provider.base_url));
    let resolver = resolver::TickerResolver::new(
        Arc::clone(&fbi) as Arc<dyn AttributeProvider>,
        Arc::clone(&resolution_cache),
        &config.attributes.isin,
        &config.attributes.ticker,
    );

    let metadata = metadata::MetadataStore::load(&config.data.metadata_file)?;
    let matrix = composition::CompositionMatrix::load(&config.data.composition_file)?;
    let holdings_file = config.data.holdings_dir.join(format!("{target}.csv"));
    let bond_universe = composition::load_bond_universe(&holdings_file)?;

    let pb = ui::new_progress_bar(matrix.etfs().len().saturating_sub(1) as u64, true);
    pb.set_message("Resolving tickers...");

    let rows = enrich::overlap_with_pose(
        target,
        &matrix,
        &bond_universe,
        &metadata,
        &resolver,
        fbi.as_ref(),
        fbi.as_ref(),
        &config.attributes,
        pb,
    )
    .await?;

    println!("{}", enrich::display_as_table(target, &rows));
    Ok(())
}
