//! Error types for the overlap pipeline.

use thiserror::Error;

/// Errors that abort an orchestration call.
///
/// Per-row resolution gaps are not represented here. A row whose identifier
/// chain breaks keeps its overlap score and loses only its POSE value.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Required reference file is missing or malformed
    #[error("data source error: {0}")]
    DataSource(String),

    /// Target ETF has no column in the composition matrix
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A batched market-data call failed as a whole
    #[error("market-data service error: {0}")]
    Service(#[from] anyhow::Error),
}
