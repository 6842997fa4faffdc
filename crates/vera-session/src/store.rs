//! Persistence interfaces for sessions and responses, with an in-memory
//! implementation.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use vera_core::{ResponseRecord, Result, SessionId, SurveyType, Timestamp};

/// A time-bounded grant to submit responses to one survey
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub session_id: SessionId,
    pub survey: SurveyType,
    pub created_at: Timestamp,
    pub expires_at: Timestamp,
    pub is_active: bool,
}

impl SessionRecord {
    pub fn new(survey: SurveyType, created_at: Timestamp, duration: chrono::Duration) -> Self {
        Self {
            session_id: SessionId::new(),
            survey,
            created_at,
            expires_at: created_at.plus(duration),
            is_active: true,
        }
    }

    pub fn is_expired(&self, now: Timestamp) -> bool {
        self.expires_at <= now
    }
}

/// One stored submission
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredResponse {
    pub session_id: SessionId,
    pub survey: SurveyType,
    pub record: ResponseRecord,
    pub submitted_at: Timestamp,
    pub expires_at: Timestamp,
}

impl StoredResponse {
    /// The record as handed to synthesis, bookkeeping fields included
    pub fn decrypted(&self) -> ResponseRecord {
        self.record
            .clone()
            .with("session_id", self.session_id.as_str())
            .with("submitted_at", self.submitted_at.to_string())
            .with("expires_at", self.expires_at.to_string())
    }
}

/// Count of live responses for a survey
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ResponseStats {
    pub total_responses: usize,
    pub last_updated: Option<Timestamp>,
}

/// Response persistence
pub trait ResponseStore: Send + Sync {
    fn store_response(&self, response: StoredResponse) -> Result<()>;

    /// Decrypted field→value records of one session, in submission order
    fn fetch_decrypted_records(&self, session_id: &SessionId) -> Result<Vec<ResponseRecord>>;

    /// Delete every response of a session, returning how many were removed
    fn delete_records(&self, session_id: &SessionId) -> Result<usize>;

    /// Responses of `survey` that have not yet expired at `now`
    fn active_response_count(&self, survey: SurveyType, now: Timestamp) -> Result<ResponseStats>;
}

/// Session persistence
pub trait SessionStore: Send + Sync {
    fn insert_session(&self, session: SessionRecord) -> Result<()>;

    fn get_session(&self, session_id: &SessionId) -> Result<Option<SessionRecord>>;

    /// Sessions expired at `now`, oldest expiry first
    fn list_expired_sessions(&self, now: Timestamp) -> Result<Vec<SessionRecord>>;

    /// Returns whether a session was removed
    fn delete_session(&self, session_id: &SessionId) -> Result<bool>;
}

/// In-process store for both sessions and responses
#[derive(Default)]
pub struct InMemoryStore {
    sessions: RwLock<HashMap<SessionId, SessionRecord>>,
    responses: RwLock<Vec<StoredResponse>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn session_count(&self) -> usize {
        self.sessions.read().len()
    }

    pub fn response_count(&self) -> usize {
        self.responses.read().len()
    }
}

impl ResponseStore for InMemoryStore {
    fn store_response(&self, response: StoredResponse) -> Result<()> {
        self.responses.write().push(response);
        Ok(())
    }

    fn fetch_decrypted_records(&self, session_id: &SessionId) -> Result<Vec<ResponseRecord>> {
        let responses = self.responses.read();
        Ok(responses
            .iter()
            .filter(|r| &r.session_id == session_id)
            .map(StoredResponse::decrypted)
            .collect())
    }

    fn delete_records(&self, session_id: &SessionId) -> Result<usize> {
        let mut responses = self.responses.write();
        let before = responses.len();
        responses.retain(|r| &r.session_id != session_id);
        Ok(before - responses.len())
    }

    fn active_response_count(&self, survey: SurveyType, now: Timestamp) -> Result<ResponseStats> {
        let responses = self.responses.read();
        let live = responses
            .iter()
            .filter(|r| r.survey == survey && r.expires_at > now);

        let mut stats = ResponseStats::default();
        for response in live {
            stats.total_responses += 1;
            stats.last_updated = stats.last_updated.max(Some(response.submitted_at));
        }
        Ok(stats)
    }
}

impl SessionStore for InMemoryStore {
    fn insert_session(&self, session: SessionRecord) -> Result<()> {
        self.sessions
            .write()
            .insert(session.session_id.clone(), session);
        Ok(())
    }

    fn get_session(&self, session_id: &SessionId) -> Result<Option<SessionRecord>> {
        Ok(self.sessions.read().get(session_id).cloned())
    }

    fn list_expired_sessions(&self, now: Timestamp) -> Result<Vec<SessionRecord>> {
        let mut expired: Vec<SessionRecord> = self
            .sessions
            .read()
            .values()
            .filter(|s| s.is_expired(now))
            .cloned()
            .collect();
        expired.sort_by(|a, b| {
            a.expires_at
                .cmp(&b.expires_at)
                .then_with(|| a.session_id.cmp(&b.session_id))
        });
        Ok(expired)
    }

    fn delete_session(&self, session_id: &SessionId) -> Result<bool> {
        Ok(self.sessions.write().remove(session_id).is_some())
    }
}
