//! Reference table mapping ETF mnemonics to ISINs.

use crate::error::PipelineError;
use std::collections::HashMap;
use std::path::Path;
use tracing::debug;

const MNEMONIC_COLUMN: &str = "ETF_TICKER";
const ISIN_COLUMN: &str = "ISIN";

/// Static ETF reference data, loaded once per orchestration call.
#[derive(Debug)]
pub struct MetadataStore {
    isin_by_mnemonic: HashMap<String, String>,
}

impl MetadataStore {
    /// Reads the delimited reference file. Column names and values are
    /// trimmed, rows missing either field are dropped, and the first ISIN per
    /// mnemonic wins (exact duplicate pairs collapse).
    pub fn load(path: &Path) -> Result<Self, PipelineError> {
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_path(path)
            .map_err(|e| {
                PipelineError::DataSource(format!(
                    "failed to open ETF metadata file {}: {e}",
                    path.display()
                ))
            })?;

        let headers = reader
            .headers()
            .map_err(|e| {
                PipelineError::DataSource(format!(
                    "failed to read headers of {}: {e}",
                    path.display()
                ))
            })?
            .clone();

        let mnemonic_col = column_index(&headers, MNEMONIC_COLUMN, path)?;
        let isin_col = column_index(&headers, ISIN_COLUMN, path)?;

        let mut isin_by_mnemonic = HashMap::new();
        for record in reader.records() {
            let record = record.map_err(|e| {
                PipelineError::DataSource(format!("malformed row in {}: {e}", path.display()))
            })?;
            let mnemonic = record.get(mnemonic_col).unwrap_or("");
            let isin = record.get(isin_col).unwrap_or("");
            if mnemonic.is_empty() || isin.is_empty() {
                continue;
            }
            isin_by_mnemonic
                .entry(mnemonic.to_string())
                .or_insert_with(|| isin.to_string());
        }

        debug!(
            "Loaded {} ETF records from {}",
            isin_by_mnemonic.len(),
            path.display()
        );
        Ok(MetadataStore { isin_by_mnemonic })
    }

    pub fn isin_for(&self, mnemonic: &str) -> Option<&str> {
        self.isin_by_mnemonic.get(mnemonic).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.isin_by_mnemonic.len()
    }

    pub fn is_empty(&self) -> bool {
        self.isin_by_mnemonic.is_empty()
    }
}

fn column_index(
    headers: &csv::StringRecord,
    name: &str,
    path: &Path,
) -> Result<usize, PipelineError> {
    headers.iter().position(|h| h == name).ok_or_else(|| {
        PipelineError::DataSource(format!(
            "ETF metadata file {} is missing the {name} column",
            path.display()
        ))
    })
}
