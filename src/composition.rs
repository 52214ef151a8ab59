//! Composition matrix, bond universe, and the overlap engine.

use crate::error::PipelineError;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use tracing::debug;

const INSTRUMENT_COLUMN: &str = "Instrument";
const PRODUCT_CLASS_COLUMN: &str = "ProductClass";
const BOND_CLASS: &str = "Bond";

/// Instrument x ETF weight table covering the tracked universe.
///
/// The source file's column order is preserved; equal overlap scores keep
/// that order in the ranking.
pub struct CompositionMatrix {
    etfs: Vec<String>,
    weights: HashMap<String, Vec<f64>>,
}

impl CompositionMatrix {
    /// Loads the wide matrix file: an `Instrument` column plus one numeric
    /// weight column per ETF mnemonic. Absent or non-numeric cells normalize
    /// to zero weight.
    pub fn load(path: &Path) -> Result<Self, PipelineError> {
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_path(path)
            .map_err(|e| {
                PipelineError::DataSource(format!(
                    "failed to open composition matrix {}: {e}",
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

        let instrument_col = headers
            .iter()
            .position(|h| h == INSTRUMENT_COLUMN)
            .ok_or_else(|| {
                PipelineError::DataSource(format!(
                    "composition matrix {} is missing the {INSTRUMENT_COLUMN} column",
                    path.display()
                ))
            })?;

        let etfs: Vec<String> = headers
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != instrument_col)
            .map(|(_, h)| h.to_string())
            .collect();

        let mut weights = HashMap::new();
        for record in reader.records() {
            let record = record.map_err(|e| {
                PipelineError::DataSource(format!("malformed row in {}: {e}", path.display()))
            })?;
            let instrument = record.get(instrument_col).unwrap_or("");
            if instrument.is_empty() {
                continue;
            }
            let row: Vec<f64> = record
                .iter()
                .enumerate()
                .filter(|(i, _)| *i != instrument_col)
                .map(|(_, field)| field.parse().unwrap_or(0.0))
                .collect();
            weights.insert(instrument.to_string(), row);
        }

        debug!(
            "Loaded composition matrix {}: {} instruments x {} ETFs",
            path.display(),
            weights.len(),
            etfs.len()
        );
        Ok(CompositionMatrix { etfs, weights })
    }

    #[cfg(test)]
    pub(crate) fn from_parts(etfs: Vec<String>, weights: HashMap<String, Vec<f64>>) -> Self {
        CompositionMatrix { etfs, weights }
    }

    /// ETF mnemonics in source column order.
    pub fn etfs(&self) -> &[String] {
        &self.etfs
    }

    fn column(&self, etf: &str) -> Option<usize> {
        self.etfs.iter().position(|e| e == etf)
    }

    /// Weight of an instrument in one ETF column; instruments or cells the
    /// matrix does not carry weigh zero.
    fn weight_at(&self, instrument: &str, column: usize) -> f64 {
        self.weights
            .get(instrument)
            .and_then(|row| row.get(column))
            .copied()
            .unwrap_or(0.0)
    }
}

/// Reads one ETF's own composition file and returns its bond instruments in
/// file order, de-duplicated.
pub fn load_bond_universe(path: &Path) -> Result<Vec<String>, PipelineError> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| {
            PipelineError::DataSource(format!(
                "failed to open composition file {}: {e}",
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

    let instrument_col = find_column(&headers, INSTRUMENT_COLUMN, path)?;
    let class_col = find_column(&headers, PRODUCT_CLASS_COLUMN, path)?;

    let mut seen = HashSet::new();
    let mut universe = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| {
            PipelineError::DataSource(format!("malformed row in {}: {e}", path.display()))
        })?;
        let instrument = record.get(instrument_col).unwrap_or("");
        let class = record.get(class_col).unwrap_or("");
        if instrument.is_empty() || class != BOND_CLASS {
            continue;
        }
        if seen.insert(instrument.to_string()) {
            universe.push(instrument.to_string());
        }
    }

    debug!(
        "Bond universe from {}: {} instruments",
        path.display(),
        universe.len()
    );
    Ok(universe)
}

fn find_column(
    headers: &csv::StringRecord,
    name: &str,
    path: &Path,
) -> Result<usize, PipelineError> {
    headers.iter().position(|h| h == name).ok_or_else(|| {
        PipelineError::DataSource(format!(
            "composition file {} is missing the {name} column",
            path.display()
        ))
    })
}

/// Scores every other ETF against `target` by summing `min(weight)` over the
/// bond universe.
///
/// The result is descending by score; equal scores keep the matrix's column
/// order (stable sort, no secondary key). The target never appears in its
/// own ranking. An empty universe yields all-zero scores in column order.
pub fn compute_overlap(
    matrix: &CompositionMatrix,
    target: &str,
    bond_universe: &[String],
) -> Result<Vec<(String, f64)>, PipelineError> {
    let target_col = matrix.column(target).ok_or_else(|| {
        PipelineError::Configuration(format!(
            "ETF '{target}' has no column in the composition matrix"
        ))
    })?;

    let mut scores: Vec<(String, f64)> =
        Vec::with_capacity(matrix.etfs.len().saturating_sub(1));
    for (col, etf) in matrix.etfs.iter().enumerate() {
        if col == target_col {
            continue;
        }
        let score: f64 = bond_universe
            .iter()
            .map(|instrument| {
                matrix
                    .weight_at(instrument, target_col)
                    .min(matrix.weight_at(instrument, col))
            })
            .sum();
        scores.push((etf.clone(), score));
    }
    scores.sort_by(|a, b| b.1.total_cmp(&a.1));
    Ok(scores)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn matrix(etfs: &[&str], rows: &[(&str, &[f64])]) -> CompositionMatrix {
        CompositionMatrix {
            etfs: etfs.iter().map(|e| e.to_string()).collect(),
            weights: rows
                .iter()
                .map(|(instrument, weights)| (instrument.to_string(), weights.to_vec()))
                .collect(),
        }
    }

    fn write_csv(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().expect("Failed to create temp file");
        file.write_all(content.as_bytes())
            .expect("Failed to write csv");
        file
    }

    #[test]
    fn test_overlap_is_min_weight_sum() {
        let m = matrix(
            &["A", "B"],
            &[("i1", &[3.0, 5.0]), ("i2", &[0.0, 2.0])],
        );
        let universe = vec!["i1".to_string(), "i2".to_string()];

        let scores = compute_overlap(&m, "A", &universe).unwrap();
        assert_eq!(scores, vec![("B".to_string(), 3.0)]);
    }

    #[test]
    fn test_target_never_in_ranking() {
        let m = matrix(
            &["A", "B", "C"],
            &[("i1", &[1.0, 2.0, 3.0])],
        );
        let universe = vec!["i1".to_string()];

        let scores = compute_overlap(&m, "B", &universe).unwrap();
        assert!(scores.iter().all(|(etf, _)| etf != "B"));
        assert_eq!(scores.len(), 2);
    }

    #[test]
    fn test_sorting_descending_and_stable_on_ties() {
        let m = matrix(
            &["A", "B", "C", "D"],
            &[("i1", &[2.0, 1.0, 2.0, 1.0]), ("i2", &[2.0, 1.0, 1.5, 1.0])],
        );
        let universe = vec!["i1".to_string(), "i2".to_string()];

        // B: 1+1=2, C: 2+1.5=3.5, D: 1+1=2. C wins; B and D tie and keep
        // their column order.
        let scores = compute_overlap(&m, "A", &universe).unwrap();
        let etfs: Vec<&str> = scores.iter().map(|(e, _)| e.as_str()).collect();
        assert_eq!(etfs, vec!["C", "B", "D"]);
        assert_eq!(scores[0].1, 3.5);
        assert_eq!(scores[1].1, 2.0);
        assert_eq!(scores[2].1, 2.0);
    }

    #[test]
    fn test_empty_universe_gives_zeros_in_column_order() {
        let m = matrix(
            &["A", "B", "C"],
            &[("i1", &[1.0, 2.0, 3.0])],
        );

        let scores = compute_overlap(&m, "A", &[]).unwrap();
        assert_eq!(
            scores,
            vec![("B".to_string(), 0.0), ("C".to_string(), 0.0)]
        );
    }

    #[test]
    fn test_unknown_instrument_contributes_zero() {
        let m = matrix(&["A", "B"], &[("i1", &[1.0, 1.0])]);
        let universe = vec!["i1".to_string(), "not-in-matrix".to_string()];

        let scores = compute_overlap(&m, "A", &universe).unwrap();
        assert_eq!(scores, vec![("B".to_string(), 1.0)]);
    }

    #[test]
    fn test_missing_target_column_is_fatal() {
        let m = matrix(&["A", "B"], &[("i1", &[1.0, 1.0])]);

        let result = compute_overlap(&m, "Z", &["i1".to_string()]);
        assert!(matches!(result, Err(PipelineError::Configuration(_))));
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("'Z' has no column")
        );
    }

    #[test]
    fn test_matrix_load_normalizes_absent_weights() {
        let file = write_csv(
            "Instrument,IEAC,EUN5\n\
             XS001,0.5,\n\
             XS002,n/a,0.25\n",
        );

        let m = CompositionMatrix::load(file.path()).unwrap();
        assert_eq!(m.etfs(), &["IEAC".to_string(), "EUN5".to_string()]);
        assert_eq!(m.weight_at("XS001", 0), 0.5);
        assert_eq!(m.weight_at("XS001", 1), 0.0);
        assert_eq!(m.weight_at("XS002", 0), 0.0);
        assert_eq!(m.weight_at("XS002", 1), 0.25);
    }

    #[test]
    fn test_matrix_load_requires_instrument_column() {
        let file = write_csv("Isin,IEAC\nXS001,0.5\n");

        let result = CompositionMatrix::load(file.path());
        assert!(matches!(result, Err(PipelineError::DataSource(_))));
    }

    #[test]
    fn test_bond_universe_filters_and_deduplicates() {
        let file = write_csv(
            "Instrument,ProductClass,Weight\n\
             XS001,Bond,0.5\n\
             EQ001,Equity,0.2\n\
             XS002, Bond ,0.1\n\
             XS001,Bond,0.5\n",
        );

        let universe = load_bond_universe(file.path()).unwrap();
        assert_eq!(universe, vec!["XS001".to_string(), "XS002".to_string()]);
    }

    #[test]
    fn test_bond_universe_requires_product_class_column() {
        let file = write_csv("Instrument,Weight\nXS001,0.5\n");

        let result = load_bond_universe(file.path());
        assert!(matches!(result, Err(PipelineError::DataSource(_))));
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("missing the ProductClass column")
        );
    }
}
