//! Session links, validation and response submission for one survey.

use std::sync::Arc;
use url::Url;
use vera_core::{
    Error, ResponseRecord, Result, SessionId, SurveyConfig, SurveySchema, SurveyType, Timestamp,
};

use crate::store::{ResponseStats, ResponseStore, SessionRecord, SessionStore, StoredResponse};

/// Issues and validates sessions for a single survey deployment
pub struct SessionManager<S> {
    config: SurveyConfig,
    schema: SurveySchema,
    duration: chrono::Duration,
    store: Arc<S>,
}

impl<S: SessionStore + ResponseStore> SessionManager<S> {
    pub fn new(config: SurveyConfig, store: Arc<S>) -> Self {
        Self {
            schema: SurveySchema::for_survey(config.survey),
            duration: chrono::Duration::minutes(config.session_duration_minutes),
            config,
            store,
        }
    }

    pub fn survey(&self) -> SurveyType {
        self.config.survey
    }

    pub fn schema(&self) -> &SurveySchema {
        &self.schema
    }

    /// Open a new session and return its shareable link with the expiry time
    pub fn generate_session_link(&self, now: Timestamp) -> Result<(String, Timestamp)> {
        let session = SessionRecord::new(self.config.survey, now, self.duration);
        let link = format!("{}?session={}", self.config.base_url, session.session_id);
        let expires_at = session.expires_at;

        tracing::info!(
            session_id = %session.session_id,
            survey = self.config.survey.slug(),
            expires_at = %expires_at,
            "session created"
        );

        self.store.insert_session(session)?;
        Ok((link, expires_at))
    }

    /// The session must exist, be active, belong to this survey and not be expired
    pub fn validate_session(&self, session_id: &SessionId, now: Timestamp) -> Result<SessionRecord> {
        let session = self
            .store
            .get_session(session_id)?
            .ok_or_else(|| Error::InvalidSession(format!("unknown session {}", session_id)))?;

        if !session.is_active {
            return Err(Error::InvalidSession(format!("session {} is inactive", session_id)));
        }
        if session.survey != self.config.survey {
            return Err(Error::InvalidSession(format!(
                "session {} belongs to {}",
                session_id,
                session.survey.slug()
            )));
        }
        if session.is_expired(now) {
            return Err(Error::SessionExpired(session_id.to_string()));
        }

        Ok(session)
    }

    pub fn session_expiry(&self, session_id: &SessionId) -> Result<Option<Timestamp>> {
        Ok(self.store.get_session(session_id)?.map(|s| s.expires_at))
    }

    /// Validate and store one submission under an explicit session id
    pub fn submit_response(
        &self,
        session_id: &SessionId,
        record: ResponseRecord,
        now: Timestamp,
    ) -> Result<()> {
        let session = self.validate_session(session_id, now)?;
        self.schema.validate(&record)?;

        self.store.store_response(StoredResponse {
            session_id: session.session_id,
            survey: session.survey,
            record,
            submitted_at: now,
            expires_at: session.expires_at,
        })?;

        tracing::debug!(session_id = %session_id, "response stored");
        Ok(())
    }

    pub fn response_stats(&self, now: Timestamp) -> Result<ResponseStats> {
        self.store.active_response_count(self.config.survey, now)
    }
}

/// Extract the session id from a link's `session` query parameter
pub fn session_id_from_link(link: &str) -> Option<SessionId> {
    let url = Url::parse(link).ok()?;
    url.query_pairs()
        .find(|(key, _)| key == "session")
        .map(|(_, value)| value.into_owned())
        .filter(|value| !value.is_empty())
        .map(SessionId::from)
}
