//! Significant pairwise correlations of a numeric table.

use vera_core::{CorrelationMap, FieldPair, NumericTable};

use crate::stats::{pearson, round2};

/// Extracts Pearson correlations whose magnitude exceeds a threshold
#[derive(Debug, Clone, Copy)]
pub struct CorrelationExtractor {
    /// Pairs with |r| <= threshold are not significant
    pub threshold: f64,
}

impl Default for CorrelationExtractor {
    fn default() -> Self {
        Self { threshold: 0.3 }
    }
}

impl CorrelationExtractor {
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }

    /// Significant pairs, rounded to two decimals.
    ///
    /// Pairs involving a zero-variance column have no defined correlation and
    /// are left out.
    pub fn extract(&self, table: &NumericTable) -> CorrelationMap {
        let mut map = CorrelationMap::new();
        let columns = table.columns();

        for i in 0..columns.len() {
            for j in (i + 1)..columns.len() {
                let Some(r) = pearson(table.column(i), table.column(j)) else {
                    continue;
                };
                if r.abs() > self.threshold {
                    map.insert(FieldPair::new(&columns[i], &columns[j]), round2(r));
                }
            }
        }

        map
    }
}
