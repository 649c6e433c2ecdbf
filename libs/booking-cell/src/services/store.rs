use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tokio::sync::RwLock;
use tracing::{debug, info};
use uuid::Uuid;

use crate::models::{BookingError, HomeDetails};
use crate::services::draft::BookingForm;

/// A booking form held by the service, with the catalogs it was opened against.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftSession {
    pub id: Uuid,
    pub form: BookingForm,
    #[serde(skip)]
    pub catalogs: HomeDetails,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl DraftSession {
    pub fn new(form: BookingForm, catalogs: HomeDetails) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            form,
            catalogs,
            created_at: now,
            updated_at: now,
        }
    }
}

/// In-memory store of open booking forms. Each form is only mutated under
/// the write lock.
///
/// Forms untouched for longer than `max_idle` are dropped whenever a new one
/// is stored, so abandoned forms do not pile up.
#[derive(Debug)]
pub struct DraftStore {
    drafts: RwLock<HashMap<Uuid, DraftSession>>,
    max_idle: Duration,
}

impl Default for DraftStore {
    fn default() -> Self {
        Self::with_max_idle(Duration::minutes(shared_config::DEFAULT_DRAFT_IDLE_MINUTES))
    }
}

impl DraftStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_idle(max_idle: Duration) -> Self {
        Self {
            drafts: RwLock::new(HashMap::new()),
            max_idle,
        }
    }

    pub async fn insert(&self, session: DraftSession) -> DraftSession {
        debug!("Storing draft {}", session.id);
        let mut drafts = self.drafts.write().await;
        Self::evict_idle(&mut drafts, self.max_idle);
        drafts.insert(session.id, session.clone());
        session
    }

    /// Drops every form idle for longer than `max_idle`. Returns how many went.
    pub async fn sweep_idle(&self) -> usize {
        Self::evict_idle(&mut *self.drafts.write().await, self.max_idle)
    }

    fn evict_idle(drafts: &mut HashMap<Uuid, DraftSession>, max_idle: Duration) -> usize {
        let cutoff = Utc::now() - max_idle;
        let before = drafts.len();
        drafts.retain(|_, session| session.updated_at >= cutoff);

        let evicted = before - drafts.len();
        if evicted > 0 {
            info!("Evicted {} idle drafts", evicted);
        }
        evicted
    }

    pub async fn get(&self, id: Uuid) -> Result<DraftSession, BookingError> {
        self.drafts
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or(BookingError::DraftSessionNotFound(id))
    }

    /// Runs `mutate` on the stored session. The session is only replaced when
    /// `mutate` succeeds, so a failed mutation leaves the form untouched.
    pub async fn update<F>(&self, id: Uuid, mutate: F) -> Result<DraftSession, BookingError>
    where
        F: FnOnce(&mut DraftSession) -> Result<(), BookingError>,
    {
        let mut drafts = self.drafts.write().await;
        let stored = drafts.get_mut(&id).ok_or(BookingError::DraftSessionNotFound(id))?;

        let mut working = stored.clone();
        mutate(&mut working)?;
        working.updated_at = Utc::now();
        *stored = working.clone();

        Ok(working)
    }

    pub async fn remove(&self, id: Uuid) -> Result<DraftSession, BookingError> {
        self.drafts
            .write()
            .await
            .remove(&id)
            .ok_or(BookingError::DraftSessionNotFound(id))
    }

    pub async fn len(&self) -> usize {
        self.drafts.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DraftError;
    use assert_matches::assert_matches;
    use chrono::NaiveDate;

    #[tokio::test]
    async fn failed_mutation_keeps_stored_form() {
        let store = DraftStore::new();
        let session = store.insert(DraftSession::new(BookingForm::new(), HomeDetails::default())).await;

        let result = store
            .update(session.id, |draft| {
                draft.form.add_draft(NaiveDate::from_ymd_opt(2025, 6, 10).unwrap())?;
                draft.form.set_slot(5, "1000-1045")?;
                Ok(())
            })
            .await;

        assert_matches!(result, Err(BookingError::Draft(DraftError::DraftNotFound(5))));
        assert!(store.get(session.id).await.unwrap().form.sessions().is_empty());
    }

    #[tokio::test]
    async fn missing_draft_is_reported() {
        let store = DraftStore::new();
        let id = Uuid::new_v4();

        assert_matches!(store.get(id).await, Err(BookingError::DraftSessionNotFound(missing)) if missing == id);
        assert_matches!(store.remove(id).await, Err(BookingError::DraftSessionNotFound(_)));
    }

    #[tokio::test]
    async fn remove_returns_the_session() {
        let store = DraftStore::new();
        let session = store.insert(DraftSession::new(BookingForm::new(), HomeDetails::default())).await;

        assert_eq!(store.len().await, 1);
        assert_eq!(store.remove(session.id).await.unwrap().id, session.id);
        assert_eq!(store.len().await, 0);
    }

    #[tokio::test]
    async fn idle_drafts_are_evicted_on_insert() {
        let store = DraftStore::with_max_idle(Duration::minutes(30));

        let mut stale = DraftSession::new(BookingForm::new(), HomeDetails::default());
        stale.updated_at = Utc::now() - Duration::minutes(45);
        let stale = store.insert(stale).await;

        let mut recent = DraftSession::new(BookingForm::new(), HomeDetails::default());
        recent.updated_at = Utc::now() - Duration::minutes(10);
        let recent = store.insert(recent).await;

        assert_matches!(store.get(stale.id).await, Err(BookingError::DraftSessionNotFound(_)));
        assert!(store.get(recent.id).await.is_ok());
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn touching_a_draft_keeps_it_alive() {
        let store = DraftStore::with_max_idle(Duration::minutes(30));

        let mut session = DraftSession::new(BookingForm::new(), HomeDetails::default());
        session.updated_at = Utc::now() - Duration::minutes(45);
        let session = store.insert(session).await;

        store.update(session.id, |_| Ok(())).await.unwrap();
        assert_eq!(store.sweep_idle().await, 0);
        assert!(store.get(session.id).await.is_ok());
    }
}
