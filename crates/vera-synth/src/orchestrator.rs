//! Synthesis orchestrator: runs the full pipeline for one session.

use rand::rngs::StdRng;
use rand::SeedableRng;
use std::panic::{catch_unwind, AssertUnwindSafe};
use vera_core::{Error, NumericTable, ResponseRecord, Result, SessionId, SynthesisConfig, Timestamp};

use crate::adjuster::CorrelationAdjuster;
use crate::artifact::{export_filename, SynthesisArtifact};
use crate::bounds::BoundsEnforcer;
use crate::correlation::CorrelationExtractor;
use crate::marginal::MarginalSynthesizer;

/// Minimum usable rows for a synthesis run
pub const MIN_ROWS: usize = 2;

/// Sequences extraction, marginal synthesis, adjustment and bounding
#[derive(Debug, Clone, Default)]
pub struct SynthesisOrchestrator {
    config: SynthesisConfig,
}

impl SynthesisOrchestrator {
    pub fn new(config: SynthesisConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SynthesisConfig {
        &self.config
    }

    /// Synthesize a session's decrypted responses.
    ///
    /// Returns `None` for both insufficient data and synthesis failures; the
    /// reason is logged.
    pub fn synthesize_session(
        &self,
        session_id: &SessionId,
        records: &[ResponseRecord],
    ) -> Option<SynthesisArtifact> {
        Self::settle(session_id.as_str(), self.try_synthesize_session(session_id, records))
    }

    pub fn try_synthesize_session(
        &self,
        session_id: &SessionId,
        records: &[ResponseRecord],
    ) -> Result<SynthesisArtifact> {
        let table = NumericTable::from_records(records, &self.config.excluded_fields);
        tracing::debug!(
            session_id = %session_id,
            records = records.len(),
            rows = table.n_rows(),
            columns = table.n_cols(),
            "assembled numeric table"
        );
        self.try_synthesize_table(session_id.as_str(), &table)
    }

    /// Synthesize an already assembled table; `label` stands in for the
    /// session id in the export file name
    pub fn synthesize_table(&self, label: &str, table: &NumericTable) -> Option<SynthesisArtifact> {
        Self::settle(label, self.try_synthesize_table(label, table))
    }

    pub fn try_synthesize_table(&self, label: &str, table: &NumericTable) -> Result<SynthesisArtifact> {
        match catch_unwind(AssertUnwindSafe(|| self.run(label, table))) {
            Ok(result) => result,
            Err(payload) => {
                let message = payload
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| payload.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                Err(Error::Synthesis(message))
            }
        }
    }

    fn run(&self, label: &str, original: &NumericTable) -> Result<SynthesisArtifact> {
        if original.n_cols() == 0 || original.n_rows() < MIN_ROWS {
            return Err(Error::InsufficientData {
                required: MIN_ROWS,
                available: if original.n_cols() == 0 { 0 } else { original.n_rows() },
            });
        }

        let cfg = &self.config;
        let mut rng = match cfg.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let extractor = CorrelationExtractor::new(cfg.significance_threshold);
        let targets = extractor.extract(original);
        tracing::debug!(session_id = label, targets = %targets.summary(), "extracted target correlations");

        let (synthetic, strategies) =
            MarginalSynthesizer::new(cfg.num_samples, cfg.grid_points).synthesize(original, &mut rng)?;

        let adjuster = CorrelationAdjuster {
            max_iterations: cfg.max_iterations,
            tolerance: cfg.tolerance,
            spurious_threshold: cfg.spurious_threshold,
            convergence_epsilon: cfg.convergence_epsilon,
            noise_scale: cfg.noise_scale,
        };
        let outcome = adjuster.adjust(&synthetic, &targets, &mut rng);
        tracing::debug!(
            session_id = label,
            iterations = outcome.iterations,
            converged = outcome.converged,
            score = outcome.best_score,
            "adjusted correlations"
        );

        let table = BoundsEnforcer::new().enforce(&outcome.table, original)?;
        let synthetic_correlations = extractor.extract(&table);

        let created_at = Timestamp::now();
        Ok(SynthesisArtifact {
            session_id: label.to_string(),
            filename: export_filename(label, created_at),
            created_at,
            table,
            original_correlations: targets,
            synthetic_correlations,
            strategies,
        })
    }

    fn settle(label: &str, result: Result<SynthesisArtifact>) -> Option<SynthesisArtifact> {
        match result {
            Ok(artifact) => {
                tracing::info!(
                    session_id = label,
                    rows = artifact.row_count(),
                    filename = %artifact.filename,
                    "synthetic dataset generated"
                );
                Some(artifact)
            }
            Err(e) if e.is_insufficient_data() => {
                tracing::warn!(session_id = label, "no synthetic data available: {}", e);
                None
            }
            Err(e) => {
                tracing::error!(session_id = label, "synthesis failed: {}", e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::pearson;

    fn seeded() -> SynthesisOrchestrator {
        SynthesisOrchestrator::new(SynthesisConfig::default().with_seed(42))
    }

    fn record(x: i64, y: i64) -> ResponseRecord {
        ResponseRecord::new()
            .with("x", x)
            .with("y", y)
            .with("session_id", "abc")
            .with("submitted_at", 1_700_000_000i64)
    }

    #[test]
    fn test_single_row_is_no_artifact() {
        let id = SessionId::from("one");
        let orchestrator = seeded();

        assert!(orchestrator.synthesize_session(&id, &[record(1, 2)]).is_none());
        let err = orchestrator.try_synthesize_session(&id, &[record(1, 2)]).unwrap_err();
        assert!(err.is_insufficient_data());
    }

    #[test]
    fn test_no_numeric_columns_is_no_artifact() {
        let records = vec![
            ResponseRecord::new().with("gender", "female"),
            ResponseRecord::new().with("gender", "male"),
        ];
        let err = seeded()
            .try_synthesize_session(&SessionId::from("text"), &records)
            .unwrap_err();
        assert!(err.is_insufficient_data());
    }

    #[test]
    fn test_perfect_correlation_end_to_end() {
        let id = SessionId::from("e2e");
        let records = vec![record(1, 2), record(2, 4), record(3, 6)];

        let artifact = seeded().synthesize_session(&id, &records).unwrap();

        assert_eq!(artifact.table.columns(), &["x".to_string(), "y".to_string()]);
        assert_eq!(artifact.row_count(), 100);
        assert_eq!(artifact.original_correlations.get("x", "y"), Some(1.0));
        assert_eq!(artifact.original_correlations.len(), 1);

        let x = artifact.table.column(0);
        let y = artifact.table.column(1);
        assert!(x.iter().all(|v| (1.0..=3.0).contains(v)));
        assert!(y.iter().all(|v| (2.0..=6.0).contains(v)));

        let r = pearson(x, y).unwrap();
        assert!(r > 0.9, "synthetic correlation {}", r);
        assert!(artifact.filename.starts_with("synthetic_data_e2e_"));
        assert!(artifact.filename.ends_with(".csv"));
    }

    #[test]
    fn test_constant_column_stays_constant() {
        let table = NumericTable::from_columns(vec![
            ("c".to_string(), vec![7.0; 6]),
            ("x".to_string(), vec![1.0, 4.0, 2.0, 8.0, 5.0, 3.0]),
        ])
        .unwrap();

        let artifact = seeded().synthesize_table("upload", &table).unwrap();

        assert!(artifact.table.column(0).iter().all(|&v| v == 7.0));
        assert!(artifact.original_correlations.is_empty());
    }

    #[test]
    fn test_non_finite_cells_never_reach_output() {
        let table = NumericTable::from_columns(vec![
            ("a".to_string(), vec![1.0, f64::NAN, 2.0, 4.0, f64::INFINITY]),
            ("b".to_string(), vec![2.0, 3.0, 5.0, 1.0, 4.0]),
        ])
        .unwrap();

        let artifact = seeded().synthesize_table("nan", &table).unwrap();

        let a = artifact.table.column(0);
        assert!(a.iter().all(|&v| v.is_finite() && (1.0..=4.0).contains(&v)));
        assert!(artifact.table.data().iter().all(|v| v.is_finite()));
        assert!(!artifact.to_csv().contains("NaN"));
        assert!(!artifact.to_csv().contains("inf"));
    }

    #[test]
    fn test_seeded_runs_are_reproducible() {
        let table = NumericTable::from_columns(vec![
            ("a".to_string(), vec![1.0, 2.0, 3.0, 4.0, 5.0]),
            ("b".to_string(), vec![2.0, 1.0, 4.0, 3.0, 6.0]),
        ])
        .unwrap();

        let first = seeded().synthesize_table("r", &table).unwrap();
        let second = seeded().synthesize_table("r", &table).unwrap();
        assert_eq!(first.table, second.table);
    }

    #[test]
    fn test_bookkeeping_fields_are_excluded() {
        let records = vec![record(1, 5), record(2, 3), record(3, 4)];
        let artifact = seeded()
            .synthesize_session(&SessionId::from("bk"), &records)
            .unwrap();
        assert!(artifact.table.column_index("submitted_at").is_none());
        assert!(artifact.table.column_index("session_id").is_none());
    }
}
