//! The overlap + POSE orchestrator.
//!
//! Composes the overlap engine with the identifier chain: ranked ETFs are
//! mapped mnemonic -> ISIN -> market ticker -> display name -> position code,
//! and the position exposure fetched for the codes is merged back onto the
//! ranking. A broken link anywhere in one row's chain leaves that row's POSE
//! empty without touching the other rows.

use comfy_table::Cell;
use indicatif::ProgressBar;
use std::collections::HashMap;
use tracing::debug;

use crate::attribute_provider::AttributeProvider;
use crate::codes;
use crate::composition::{self, CompositionMatrix};
use crate::config::AttributeNames;
use crate::error::PipelineError;
use crate::exposure_provider::ExposureProvider;
use crate::metadata::MetadataStore;
use crate::resolver::TickerResolver;
use crate::ui;

#[derive(Debug, Clone)]
pub struct OverlapRow {
    pub etf: String,
    pub score: f64,
    pub pose: Option<f64>,
}

/// Runs one orchestration call for `target`.
///
/// POSE is resolved only for ETFs that appear in the ranking, tickers and
/// codes are de-duplicated before their one batched call each, and batch
/// responses are merged by key, never by position. A failed batched call is
/// fatal; a missing link in a single row's chain is not.
pub async fn overlap_with_pose(
    target: &str,
    matrix: &CompositionMatrix,
    bond_universe: &[String],
    metadata: &MetadataStore,
    resolver: &TickerResolver,
    attributes: &dyn AttributeProvider,
    exposures: &dyn ExposureProvider,
    names: &AttributeNames,
    pb: ProgressBar,
) -> Result<Vec<OverlapRow>, PipelineError> {
    let ranking = composition::compute_overlap(matrix, target, bond_universe)?;

    // Resolve tickers for the ranked ETFs only, in ranking order.
    let mut ticker_for: HashMap<String, String> = HashMap::new();
    for (etf, _) in &ranking {
        match metadata.isin_for(etf) {
            Some(isin) => {
                if let Some(ticker) = resolver.resolve(isin).await {
                    ticker_for.insert(etf.clone(), ticker);
                }
            }
            None => debug!("No ISIN on record for ETF {etf}"),
        }
        pb.inc(1);
    }
    pb.finish_and_clear();

    // One bulk display-name fetch over the distinct formatted tickers.
    let mut formatted: Vec<String> = ticker_for
        .values()
        .map(|t| codes::format_equity_ticker(t))
        .collect();
    formatted.sort();
    formatted.dedup();
    let display_names = attributes
        .fetch_bulk_attribute(&names.ticker, &formatted, &names.display_name)
        .await?;

    // Tickers with a known display name get a position code.
    let mut code_for: HashMap<String, String> = HashMap::new();
    for (etf, ticker) in &ticker_for {
        if let Some(name) = display_names.get(&codes::format_equity_ticker(ticker)) {
            code_for.insert(etf.clone(), codes::position_code(name));
        }
    }

    // One batched exposure fetch over the distinct codes.
    let mut code_batch: Vec<String> = code_for.values().cloned().collect();
    code_batch.sort();
    code_batch.dedup();
    let pose_map = exposures.fetch_position_exposure(&code_batch).await?;

    let rows = ranking
        .into_iter()
        .map(|(etf, score)| {
            let pose = code_for.get(&etf).and_then(|code| pose_map.get(code)).copied();
            OverlapRow { etf, score, pose }
        })
        .collect();
    Ok(rows)
}

/// Renders the ranking as a styled table. The score column is named after
/// the target ETF.
pub fn display_as_table(target: &str, rows: &[OverlapRow]) -> String {
    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("ETF"),
        ui::header_cell(target),
        ui::header_cell("POSE"),
    ]);

    for row in rows {
        table.add_row(vec![
            Cell::new(&row.etf),
            ui::score_cell(row.score),
            ui::format_optional_cell(row.pose, |p| format!("{p:.4}")),
        ]);
    }

    format!(
        "Overlap vs {}\n\n{}",
        ui::style_text(target, ui::StyleType::Title),
        table
    )
}
