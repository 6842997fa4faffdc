//! Expiry batch: synthesize, then delete, every expired session.

use std::path::PathBuf;
use std::sync::Arc;
use vera_core::{SessionId, Timestamp, VeraConfig};
use vera_synth::{SynthesisArtifact, SynthesisOrchestrator};

use crate::store::{ResponseStore, SessionRecord, SessionStore};

/// Outcome counters of one cleanup batch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JanitorReport {
    /// Expired sessions seen
    pub sessions: usize,
    /// Sessions that produced a synthetic dataset
    pub artifacts: usize,
    /// Sessions with no synthetic data (insufficient data or failure)
    pub skipped: usize,
    /// Raw responses deleted
    pub records_deleted: usize,
    /// Store or export operations that failed
    pub failures: usize,
}

/// Sequential expiry driver
pub struct ExpiryJanitor<S> {
    store: Arc<S>,
    orchestrator: SynthesisOrchestrator,
    export_dir: Option<PathBuf>,
}

impl<S: SessionStore + ResponseStore> ExpiryJanitor<S> {
    pub fn new(store: Arc<S>, orchestrator: SynthesisOrchestrator) -> Self {
        Self {
            store,
            orchestrator,
            export_dir: None,
        }
    }

    pub fn from_config(store: Arc<S>, config: &VeraConfig) -> Self {
        Self {
            store,
            orchestrator: SynthesisOrchestrator::new(config.synthesis.clone()),
            export_dir: config.export.output_dir.clone(),
        }
    }

    /// Write each artifact as CSV into `dir`
    pub fn with_export_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.export_dir = Some(dir.into());
        self
    }

    /// Process every session expired at `now` and return the artifacts produced
    pub fn cleanup_expired_sessions(&self, now: Timestamp) -> Vec<SynthesisArtifact> {
        self.run_batch(now).0
    }

    /// Same as [`cleanup_expired_sessions`](Self::cleanup_expired_sessions), with counters
    pub fn run_batch(&self, now: Timestamp) -> (Vec<SynthesisArtifact>, JanitorReport) {
        let mut report = JanitorReport::default();
        let mut artifacts = Vec::new();

        let expired = match self.store.list_expired_sessions(now) {
            Ok(expired) => expired,
            Err(e) => {
                tracing::error!("failed to list expired sessions: {}", e);
                report.failures += 1;
                return (artifacts, report);
            }
        };

        for session in &expired {
            report.sessions += 1;
            if let Some(artifact) = self.process_session(session, &mut report) {
                artifacts.push(artifact);
            }
        }

        tracing::info!(
            sessions = report.sessions,
            artifacts = report.artifacts,
            skipped = report.skipped,
            records_deleted = report.records_deleted,
            failures = report.failures,
            "expired session cleanup finished"
        );

        (artifacts, report)
    }

    fn process_session(
        &self,
        session: &SessionRecord,
        report: &mut JanitorReport,
    ) -> Option<SynthesisArtifact> {
        let id = &session.session_id;

        // An unreadable session counts as a failed synthesis; expiry still deletes it
        let artifact = match self.store.fetch_decrypted_records(id) {
            Ok(records) => {
                tracing::info!(session_id = %id, responses = records.len(), "synthesizing expired session");
                self.orchestrator.synthesize_session(id, &records)
            }
            Err(e) => {
                tracing::error!(session_id = %id, "failed to fetch responses: {}", e);
                report.failures += 1;
                None
            }
        };

        match &artifact {
            Some(artifact) => {
                report.artifacts += 1;
                self.export(artifact, report);
            }
            None => report.skipped += 1,
        }

        self.purge(id, report);
        artifact
    }

    fn export(&self, artifact: &SynthesisArtifact, report: &mut JanitorReport) {
        let Some(dir) = &self.export_dir else {
            return;
        };

        match artifact.write_csv(dir) {
            Ok(path) => {
                tracing::info!(session_id = %artifact.session_id, path = %path.display(), "synthetic dataset exported")
            }
            Err(e) => {
                tracing::error!(session_id = %artifact.session_id, "export failed: {}", e);
                report.failures += 1;
            }
        }
    }

    fn purge(&self, id: &SessionId, report: &mut JanitorReport) {
        match self.store.delete_records(id) {
            Ok(n) => report.records_deleted += n,
            Err(e) => {
                tracing::error!(session_id = %id, "failed to delete responses: {}", e);
                report.failures += 1;
            }
        }

        if let Err(e) = self.store.delete_session(id) {
            tracing::error!(session_id = %id, "failed to delete session: {}", e);
            report.failures += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{InMemoryStore, StoredResponse};
    use vera_core::{ResponseRecord, SurveyType, SynthesisConfig};

    fn at(secs: i64) -> Timestamp {
        Timestamp::from_nanos(secs * 1_000_000_000)
    }

    fn janitor(store: &Arc<InMemoryStore>) -> ExpiryJanitor<InMemoryStore> {
        ExpiryJanitor::new(
            Arc::clone(store),
            SynthesisOrchestrator::new(SynthesisConfig::default().with_seed(5)),
        )
    }

    fn session_with(store: &InMemoryStore, start: i64, values: &[(i64, i64)]) -> SessionRecord {
        let session = SessionRecord::new(SurveyType::SubstanceUse, at(start), chrono::Duration::minutes(10));
        store.insert_session(session.clone()).unwrap();
        for (n, &(peer, wb)) in values.iter().enumerate() {
            store
                .store_response(StoredResponse {
                    session_id: session.session_id.clone(),
                    survey: session.survey,
                    record: ResponseRecord::new()
                        .with("peer_pressure", peer)
                        .with("well_being", wb),
                    submitted_at: at(start + n as i64),
                    expires_at: session.expires_at,
                })
                .unwrap();
        }
        session
    }

    #[test]
    fn test_live_sessions_are_untouched() {
        let store = Arc::new(InMemoryStore::new());
        session_with(&store, 0, &[(1, 9), (5, 4)]);

        let (artifacts, report) = janitor(&store).run_batch(at(599));
        assert!(artifacts.is_empty());
        assert_eq!(report, JanitorReport::default());
        assert_eq!(store.response_count(), 2);
    }

    #[test]
    fn test_expired_session_is_synthesized_then_deleted() {
        let store = Arc::new(InMemoryStore::new());
        let session = session_with(&store, 0, &[(2, 9), (5, 6), (8, 3)]);

        let (artifacts, report) = janitor(&store).run_batch(at(600));

        assert_eq!(artifacts.len(), 1);
        assert_eq!(artifacts[0].session_id, session.session_id.as_str());
        assert_eq!(artifacts[0].row_count(), 100);
        assert_eq!(artifacts[0].original_correlations.get("peer_pressure", "well_being"), Some(-1.0));
        assert_eq!(report.records_deleted, 3);
        assert_eq!(store.session_count(), 0);
        assert_eq!(store.response_count(), 0);
    }

    #[test]
    fn test_insufficient_data_is_still_deleted() {
        let store = Arc::new(InMemoryStore::new());
        session_with(&store, 0, &[(4, 4)]);
        session_with(&store, 0, &[]);

        let (artifacts, report) = janitor(&store).run_batch(at(1000));

        assert!(artifacts.is_empty());
        assert_eq!(report.sessions, 2);
        assert_eq!(report.skipped, 2);
        assert_eq!(store.session_count(), 0);
        assert_eq!(store.response_count(), 0);
    }

    #[test]
    fn test_exports_csv_when_configured() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(InMemoryStore::new());
        session_with(&store, 0, &[(1, 2), (3, 3), (6, 7)]);

        let artifacts = janitor(&store)
            .with_export_dir(dir.path())
            .cleanup_expired_sessions(at(600));

        let path = dir.path().join(&artifacts[0].filename);
        let csv = std::fs::read_to_string(path).unwrap();
        assert!(csv.starts_with("peer_pressure,well_being\n"));
    }
}
