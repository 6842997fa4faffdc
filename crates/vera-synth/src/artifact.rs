//! Packaged output of one synthesis run.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use vera_core::{ColumnSummary, CorrelationMap, Error, NumericTable, Result, Timestamp};

use crate::marginal::ColumnStrategy;

/// Synthetic table plus the metadata needed to display and export it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SynthesisArtifact {
    /// Session id, or the label of an ad-hoc dataset
    pub session_id: String,
    /// Suggested export file name
    pub filename: String,
    pub created_at: Timestamp,
    /// The synthetic rows
    pub table: NumericTable,
    /// Significant correlations of the source data (the targets)
    pub original_correlations: CorrelationMap,
    /// Significant correlations of the final synthetic table
    pub synthetic_correlations: CorrelationMap,
    /// How each column's marginal was produced, in column order
    pub strategies: Vec<ColumnStrategy>,
}

/// `synthetic_data_<label>_<YYYYMMDD_HHMMSS>.csv`
pub fn export_filename(label: &str, at: Timestamp) -> String {
    format!("synthetic_data_{}_{}.csv", label, at.compact_utc())
}

impl SynthesisArtifact {
    pub fn row_count(&self) -> usize {
        self.table.n_rows()
    }

    /// Header row of column names, one synthetic row per line, no index column
    pub fn to_csv(&self) -> String {
        self.table.to_csv()
    }

    /// Write the CSV into `dir` under the suggested file name
    pub fn write_csv(&self, dir: &Path) -> Result<PathBuf> {
        if !dir.is_dir() {
            return Err(Error::Export(format!(
                "export directory {} does not exist",
                dir.display()
            )));
        }

        let path = dir.join(&self.filename);
        std::fs::write(&path, self.to_csv())?;
        Ok(path)
    }

    /// Summary statistics of the synthetic columns
    pub fn summary(&self) -> Vec<ColumnSummary> {
        self.table.describe()
    }

    /// Side-by-side correlation report, one line per pair seen in either map
    pub fn correlation_report(&self) -> Vec<String> {
        let mut pairs: Vec<_> = self
            .original_correlations
            .iter()
            .chain(self.synthetic_correlations.iter())
            .map(|(pair, _)| pair.clone())
            .collect();
        pairs.sort();
        pairs.dedup();

        let fmt = |r: Option<f64>| r.map(|v| format!("{:.2}", v)).unwrap_or_else(|| "-".into());

        pairs
            .into_iter()
            .map(|pair| {
                let original = self.original_correlations.get(&pair.first, &pair.second);
                let synthetic = self.synthetic_correlations.get(&pair.first, &pair.second);
                format!("{}: original {} / synthetic {}", pair, fmt(original), fmt(synthetic))
            })
            .collect()
    }
}
