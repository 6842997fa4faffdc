//! Clipping synthetic columns into the observed domain.

use vera_core::{Error, NumericTable, Result};

use crate::stats::min_max;

/// Clips every synthetic column into [min, max] of the matching original column
#[derive(Debug, Clone, Copy, Default)]
pub struct BoundsEnforcer;

impl BoundsEnforcer {
    pub fn new() -> Self {
        Self
    }

    /// Return a clipped copy of `synthetic`. Columns are matched by name.
    pub fn enforce(&self, synthetic: &NumericTable, original: &NumericTable) -> Result<NumericTable> {
        let mut clipped = synthetic.clone();

        for (j, name) in synthetic.columns().iter().enumerate() {
            let source = original.column_by_name(name)?;
            let (lo, hi) = min_max(source).ok_or_else(|| Error::InsufficientData {
                required: 1,
                available: 0,
            })?;

            for value in clipped.column_mut(j).iter_mut() {
                *value = (*value).clamp(lo, hi);
            }
        }

        Ok(clipped)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(columns: Vec<(&str, Vec<f64>)>) -> NumericTable {
        NumericTable::from_columns(
            columns
                .into_iter()
                .map(|(name, values)| (name.to_string(), values))
                .collect(),
        )
        .unwrap()
    }

    #[test]
    fn test_values_are_clipped_per_column() {
        let original = table(vec![("a", vec![1.0, 3.0]), ("b", vec![-2.0, 2.0])]);
        let synthetic = table(vec![
            ("a", vec![0.0, 2.0, 5.0]),
            ("b", vec![-9.0, 0.5, 9.0]),
        ]);

        let clipped = BoundsEnforcer::new().enforce(&synthetic, &original).unwrap();

        assert_eq!(clipped.column(0).to_vec(), vec![1.0, 2.0, 3.0]);
        assert_eq!(clipped.column(1).to_vec(), vec![-2.0, 0.5, 2.0]);
        // input untouched
        assert_eq!(synthetic.column(0).to_vec(), vec![0.0, 2.0, 5.0]);
    }

    #[test]
    fn test_columns_matched_by_name_not_position() {
        let original = table(vec![("a", vec![0.0, 1.0]), ("b", vec![10.0, 20.0])]);
        let synthetic = table(vec![("b", vec![5.0, 25.0]), ("a", vec![-1.0, 0.5])]);

        let clipped = BoundsEnforcer::new().enforce(&synthetic, &original).unwrap();

        assert_eq!(clipped.column(0).to_vec(), vec![10.0, 20.0]);
        assert_eq!(clipped.column(1).to_vec(), vec![0.0, 0.5]);
    }

    #[test]
    fn test_unknown_column_is_an_error() {
        let original = table(vec![("a", vec![0.0, 1.0])]);
        let synthetic = table(vec![("z", vec![5.0])]);

        assert!(matches!(
            BoundsEnforcer::new().enforce(&synthetic, &original),
            Err(Error::UnknownColumn(_))
        ));
    }
}
