//! Numeric tables, correlation maps and column summaries.

use ndarray::{Array2, ArrayView1, ArrayViewMut1, Axis};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::error::{Error, Result};
use crate::types::ResponseRecord;

/// Rectangular rows × named numeric columns
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NumericTable {
    columns: Vec<String>,
    /// Row-major storage, shape (n_rows, n_cols)
    data: Array2<f64>,
}

impl NumericTable {
    pub fn new(columns: Vec<String>, data: Array2<f64>) -> Result<Self> {
        if data.ncols() != columns.len() {
            return Err(Error::ShapeMismatch {
                expected: columns.len(),
                actual: data.ncols(),
            });
        }

        let unique: BTreeSet<&str> = columns.iter().map(String::as_str).collect();
        if unique.len() != columns.len() {
            return Err(Error::InvalidResponse("duplicate column names".into()));
        }

        Ok(Self { columns, data })
    }

    /// Build from named columns of equal length
    pub fn from_columns(columns: Vec<(String, Vec<f64>)>) -> Result<Self> {
        let n_rows = columns.first().map(|(_, v)| v.len()).unwrap_or(0);
        let mut data = Array2::zeros((n_rows, columns.len()));

        for (j, (name, values)) in columns.iter().enumerate() {
            if values.len() != n_rows {
                return Err(Error::InvalidResponse(format!(
                    "column '{}' has {} values, expected {}",
                    name,
                    values.len(),
                    n_rows
                )));
            }
            for (i, &v) in values.iter().enumerate() {
                data[[i, j]] = v;
            }
        }

        Self::new(columns.into_iter().map(|(name, _)| name).collect(), data)
    }

    /// Assemble a table from decrypted response records.
    ///
    /// A field becomes a column when it is not excluded and every record
    /// carries it as a finite number. Fields missing from some records are
    /// left out rather than dropping those records. Columns come out in
    /// lexicographic order.
    pub fn from_records(records: &[ResponseRecord], excluded: &[String]) -> Self {
        let excluded: BTreeSet<&str> = excluded.iter().map(String::as_str).collect();

        // field -> (records carrying it, all values numeric)
        let mut candidates: BTreeMap<&str, (usize, bool)> = BTreeMap::new();
        for record in records {
            for (field, value) in record.iter() {
                if excluded.contains(field) {
                    continue;
                }
                let (seen, numeric) = candidates.entry(field).or_insert((0, true));
                *seen += 1;
                *numeric &= value.is_numeric();
            }
        }

        let columns: Vec<String> = candidates
            .into_iter()
            .filter(|&(_, (seen, numeric))| numeric && seen == records.len())
            .map(|(field, _)| field.to_string())
            .collect();

        let rows: Vec<Vec<f64>> = records
            .iter()
            .filter_map(|record| {
                columns
                    .iter()
                    .map(|c| record.numeric(c))
                    .collect::<Option<Vec<f64>>>()
            })
            .collect();

        let mut data = Array2::zeros((rows.len(), columns.len()));
        for (i, row) in rows.iter().enumerate() {
            for (j, &v) in row.iter().enumerate() {
                data[[i, j]] = v;
            }
        }

        Self { columns, data }
    }

    /// Parse an uploaded comma-separated dataset.
    ///
    /// Columns where every non-empty cell is a number are kept; rows with an
    /// empty or non-finite (`nan`, `inf`) cell in a kept column are dropped.
    pub fn from_csv_str(text: &str) -> Result<Self> {
        let mut lines = text.lines().filter(|l| !l.trim().is_empty());

        let header = lines
            .next()
            .ok_or_else(|| Error::InvalidResponse("empty CSV input".into()))?;
        let header = split_csv_line(header)?;

        let mut cells: Vec<Vec<String>> = Vec::new();
        for (n, line) in lines.enumerate() {
            let row = split_csv_line(line)?;
            if row.len() != header.len() {
                return Err(Error::InvalidResponse(format!(
                    "row {} has {} cells, header has {}",
                    n + 1,
                    row.len(),
                    header.len()
                )));
            }
            cells.push(row);
        }

        let kept: Vec<usize> = (0..header.len())
            .filter(|&j| {
                let mut non_empty = cells.iter().map(|r| r[j].trim()).filter(|c| !c.is_empty());
                let mut any_finite = false;
                let all_numeric = non_empty.all(|c| match c.parse::<f64>() {
                    Ok(v) => {
                        any_finite |= v.is_finite();
                        true
                    }
                    Err(_) => false,
                });
                any_finite && all_numeric
            })
            .collect();

        let rows: Vec<Vec<f64>> = cells
            .iter()
            .filter_map(|r| {
                kept.iter()
                    .map(|&j| parse_finite(&r[j]))
                    .collect::<Option<Vec<f64>>>()
            })
            .collect();

        let columns: Vec<String> = kept.iter().map(|&j| header[j].clone()).collect();
        let mut data = Array2::zeros((rows.len(), columns.len()));
        for (i, row) in rows.iter().enumerate() {
            for (j, &v) in row.iter().enumerate() {
                data[[i, j]] = v;
            }
        }

        Self::new(columns, data)
    }

    /// Render as CSV: header row, one line per row, no index column
    pub fn to_csv(&self) -> String {
        let mut out = String::new();
        let header: Vec<String> = self.columns.iter().map(|c| escape_csv_cell(c)).collect();
        out.push_str(&header.join(","));
        out.push('\n');

        for row in self.data.axis_iter(Axis(0)) {
            let line: Vec<String> = row.iter().map(|v| v.to_string()).collect();
            out.push_str(&line.join(","));
            out.push('\n');
        }

        out
    }

    pub fn n_rows(&self) -> usize {
        self.data.nrows()
    }

    pub fn n_cols(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.n_rows() == 0 || self.n_cols() == 0
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn column(&self, index: usize) -> ArrayView1<'_, f64> {
        self.data.column(index)
    }

    pub fn column_mut(&mut self, index: usize) -> ArrayViewMut1<'_, f64> {
        self.data.column_mut(index)
    }

    pub fn column_by_name(&self, name: &str) -> Result<ArrayView1<'_, f64>> {
        self.column_index(name)
            .map(|j| self.data.column(j))
            .ok_or_else(|| Error::UnknownColumn(name.to_string()))
    }

    pub fn data(&self) -> &Array2<f64> {
        &self.data
    }

    /// Observed (min, max) of a column, `None` for an empty table
    pub fn column_range(&self, index: usize) -> Option<(f64, f64)> {
        let col = self.data.column(index);
        if col.is_empty() {
            return None;
        }
        let min = col.iter().copied().fold(f64::INFINITY, f64::min);
        let max = col.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        Some((min, max))
    }

    /// Per-column summary statistics
    pub fn describe(&self) -> Vec<ColumnSummary> {
        self.columns
            .iter()
            .enumerate()
            .filter_map(|(j, name)| {
                let values: Vec<f64> = self.data.column(j).to_vec();
                ColumnSummary::from_values(name, &values)
            })
            .collect()
    }
}

fn parse_finite(cell: &str) -> Option<f64> {
    cell.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

fn escape_csv_cell(cell: &str) -> String {
    if cell.contains(&[',', '"', '\n'][..]) {
        format!("\"{}\"", cell.replace('"', "\"\""))
    } else {
        cell.to_string()
    }
}

fn split_csv_line(line: &str) -> Result<Vec<String>> {
    let mut cells = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.trim_end_matches('\r').chars().peekable();

    while let Some(c) = chars.next() {
        match (c, in_quotes) {
            ('"', true) if chars.peek() == Some(&'"') => {
                current.push('"');
                chars.next();
            }
            ('"', true) => in_quotes = false,
            ('"', false) if current.is_empty() => in_quotes = true,
            (',', false) => cells.push(std::mem::take(&mut current)),
            (c, _) => current.push(c),
        }
    }

    if in_quotes {
        return Err(Error::InvalidResponse(format!("unterminated quote in '{}'", line)));
    }

    cells.push(current);
    Ok(cells)
}

/// Unordered field pair, stored lexicographically first-then-second
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FieldPair {
    pub first: String,
    pub second: String,
}

impl FieldPair {
    pub fn new(a: impl Into<String>, b: impl Into<String>) -> Self {
        let (a, b) = (a.into(), b.into());
        if a <= b {
            Self { first: a, second: b }
        } else {
            Self { first: b, second: a }
        }
    }

    /// Human-readable label, e.g. `"stress and sleep"`
    pub fn label(&self) -> String {
        format!("{} and {}", self.first, self.second)
    }

    pub fn parse(label: &str) -> Option<Self> {
        label.split_once(" and ").map(|(a, b)| Self::new(a, b))
    }
}

impl fmt::Display for FieldPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} and {}", self.first, self.second)
    }
}

impl Serialize for FieldPair {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.label())
    }
}

impl<'de> Deserialize<'de> for FieldPair {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let label = String::deserialize(deserializer)?;
        FieldPair::parse(&label)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid field pair '{}'", label)))
    }
}

/// Field pair → Pearson coefficient in [-1, 1]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CorrelationMap(BTreeMap<FieldPair, f64>);

impl CorrelationMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, pair: FieldPair, coefficient: f64) {
        self.0.insert(pair, coefficient);
    }

    pub fn get(&self, a: &str, b: &str) -> Option<f64> {
        self.0.get(&FieldPair::new(a, b)).copied()
    }

    pub fn contains(&self, a: &str, b: &str) -> bool {
        self.0.contains_key(&FieldPair::new(a, b))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&FieldPair, f64)> {
        self.0.iter().map(|(k, v)| (k, *v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Compact one-line rendering for logs and reports
    pub fn summary(&self) -> String {
        if self.0.is_empty() {
            return "none".to_string();
        }
        self.0
            .iter()
            .map(|(pair, r)| format!("{}: {:.2}", pair, r))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Summary statistics of one column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnSummary {
    pub name: String,
    pub count: usize,
    pub mean: f64,
    /// Sample standard deviation (n - 1 denominator)
    pub std: f64,
    pub min: f64,
    pub q25: f64,
    pub median: f64,
    pub q75: f64,
    pub max: f64,
}

impl ColumnSummary {
    pub fn from_values(name: &str, values: &[f64]) -> Option<Self> {
        if values.is_empty() {
            return None;
        }

        let n = values.len();
        let mean = values.iter().sum::<f64>() / n as f64;
        let std = if n > 1 {
            (values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1) as f64).sqrt()
        } else {
            0.0
        };

        let mut sorted = values.to_vec();
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

        Some(Self {
            name: name.to_string(),
            count: n,
            mean,
            std,
            min: sorted[0],
            q25: quantile(&sorted, 0.25),
            median: quantile(&sorted, 0.5),
            q75: quantile(&sorted, 0.75),
            max: sorted[n - 1],
        })
    }
}

/// Linear-interpolated quantile of sorted data
fn quantile(sorted: &[f64], q: f64) -> f64 {
    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f64;
    sorted[lo] + (sorted[hi] - sorted[lo]) * frac
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn excluded() -> Vec<String> {
        vec!["_id".to_string(), "submitted_at".to_string()]
    }

    #[test]
    fn test_from_records_drops_text_and_bookkeeping() {
        let records = vec![
            ResponseRecord::new()
                .with("stress", 4)
                .with("sleep", 6.5)
                .with("gender", "Female")
                .with("submitted_at", 1_700_000_000),
            ResponseRecord::new()
                .with("stress", 7)
                .with("sleep", 5.0)
                .with("gender", "Male")
                .with("submitted_at", 1_700_000_100),
        ];

        let table = NumericTable::from_records(&records, &excluded());

        assert_eq!(table.columns(), &["sleep".to_string(), "stress".to_string()]);
        assert_eq!(table.n_rows(), 2);
        assert_eq!(table.column_by_name("stress").unwrap().to_vec(), vec![4.0, 7.0]);
    }

    #[test]
    fn test_from_records_mixed_column_is_not_numeric() {
        let records = vec![
            ResponseRecord::new().with("a", 1).with("b", 2),
            ResponseRecord::new().with("a", "n/a").with("b", 3),
        ];

        let table = NumericTable::from_records(&records, &[]);
        assert_eq!(table.columns(), &["b".to_string()]);
        assert_eq!(table.n_rows(), 2);
    }

    #[test]
    fn test_from_records_drops_partially_answered_fields() {
        let records = vec![
            ResponseRecord::new().with("a", 1).with("b", 2).with("optional", 9),
            ResponseRecord::new().with("a", 5).with("b", 3),
            ResponseRecord::new().with("a", 4).with("b", 8),
        ];

        let table = NumericTable::from_records(&records, &[]);
        assert_eq!(table.columns(), &["a".to_string(), "b".to_string()]);
        assert_eq!(table.n_rows(), 3);
    }

    #[test]
    fn test_from_records_non_finite_field_is_not_numeric() {
        let records = vec![
            ResponseRecord::new().with("a", 1).with("b", f64::NAN),
            ResponseRecord::new().with("a", 2).with("b", 3.0),
        ];

        let table = NumericTable::from_records(&records, &[]);
        assert_eq!(table.columns(), &["a".to_string()]);
        assert_eq!(table.n_rows(), 2);
    }

    #[test]
    fn test_new_rejects_shape_mismatch() {
        let result = NumericTable::new(vec!["x".into()], array![[1.0, 2.0]]);
        assert!(matches!(result, Err(Error::ShapeMismatch { .. })));
    }

    #[test]
    fn test_csv_parse_keeps_numeric_columns() {
        let text = "age,gender,\"score, total\"\n21,F,10.5\n22,M,\n30,\"X, Y\",7\n";
        let table = NumericTable::from_csv_str(text).unwrap();

        assert_eq!(table.columns(), &["age".to_string(), "score, total".to_string()]);
        assert_eq!(table.n_rows(), 2);
        assert_eq!(table.column(1).to_vec(), vec![10.5, 7.0]);
    }

    #[test]
    fn test_csv_parse_drops_non_finite_rows() {
        let table = NumericTable::from_csv_str("a,b\n1,2\nnan,3\n2,5\ninf,7\n4,-inf\n4,1\n").unwrap();

        assert_eq!(table.columns(), &["a".to_string(), "b".to_string()]);
        assert_eq!(table.n_rows(), 3);
        assert_eq!(table.column(0).to_vec(), vec![1.0, 2.0, 4.0]);
        assert!(table.data().iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_csv_parse_drops_all_nan_column() {
        let table = NumericTable::from_csv_str("a,b\n1,NaN\n2,nan\n").unwrap();
        assert_eq!(table.columns(), &["a".to_string()]);
        assert_eq!(table.n_rows(), 2);
    }

    #[test]
    fn test_csv_parse_rejects_ragged_rows() {
        let result = NumericTable::from_csv_str("a,b\n1,2\n3\n");
        assert!(matches!(result, Err(Error::InvalidResponse(_))));
        assert!(NumericTable::from_csv_str("").is_err());
    }

    #[test]
    fn test_to_csv_layout() {
        let table = NumericTable::from_columns(vec![
            ("x".to_string(), vec![1.0, 2.5]),
            ("y".to_string(), vec![-3.0, 4.0]),
        ])
        .unwrap();

        assert_eq!(table.to_csv(), "x,y\n1,-3\n2.5,4\n");
        let back = NumericTable::from_csv_str(&table.to_csv()).unwrap();
        assert_eq!(back, table);
    }

    #[test]
    fn test_field_pair_is_canonical() {
        let pair = FieldPair::new("y", "x");
        assert_eq!(pair.first, "x");
        assert_eq!(pair.label(), "x and y");
        assert_eq!(FieldPair::parse("y and x"), Some(pair));
    }

    #[test]
    fn test_correlation_map_serializes_labels() {
        let mut map = CorrelationMap::new();
        map.insert(FieldPair::new("stress", "sleep"), -0.62);

        let json = serde_json::to_string(&map).unwrap();
        assert_eq!(json, r#"{"sleep and stress":-0.62}"#);

        let back: CorrelationMap = serde_json::from_str(&json).unwrap();
        assert_eq!(back.get("stress", "sleep"), Some(-0.62));
    }

    #[test]
    fn test_column_summary() {
        let summary = ColumnSummary::from_values("x", &[4.0, 1.0, 3.0, 2.0]).unwrap();
        assert_eq!(summary.count, 4);
        assert_eq!(summary.min, 1.0);
        assert_eq!(summary.max, 4.0);
        assert!((summary.mean - 2.5).abs() < 1e-12);
        assert!((summary.median - 2.5).abs() < 1e-12);
        assert!((summary.q25 - 1.75).abs() < 1e-12);
        assert!((summary.std - 1.2909944487).abs() < 1e-9);
        assert!(ColumnSummary::from_values("x", &[]).is_none());
    }
}
