use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use futures::future::{AbortHandle, Abortable};
use tracing::{debug, info, warn};

use crate::models::ActionError;

/// Backend actions currently in progress, keyed by what they act on.
///
/// At most one action runs per key; a second attempt is rejected instead of
/// racing the first. Pending actions can be aborted by key.
#[derive(Debug, Default)]
pub struct InFlightActions {
    pending: Mutex<HashMap<String, (u64, AbortHandle)>>,
    next_id: AtomicU64,
}

/// Removes its entry on drop, unless the key has since been reused.
struct PendingAction<'a> {
    owner: &'a InFlightActions,
    key: String,
    id: u64,
}

impl Drop for PendingAction<'_> {
    fn drop(&mut self) {
        let mut pending = self.owner.lock();
        if pending.get(&self.key).is_some_and(|(id, _)| *id == self.id) {
            pending.remove(&self.key);
        }
    }
}

impl InFlightActions {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, (u64, AbortHandle)>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn submit_key(draft_id: impl std::fmt::Display) -> String {
        format!("submit:{}", draft_id)
    }

    pub fn payment_key(booking_id: &str) -> String {
        format!("collect-payment:{}", booking_id)
    }

    pub fn check_in_key(booking_id: &str, session_id: &str) -> String {
        format!("check-in:{}:{}", booking_id, session_id)
    }

    pub fn is_pending(&self, key: &str) -> bool {
        self.lock().contains_key(key)
    }

    /// Fails with `AlreadyInFlight` while an action under `key` is pending.
    pub fn ensure_idle(&self, key: &str) -> Result<(), ActionError> {
        if self.is_pending(key) {
            warn!("Rejected change while {} is pending", key);
            return Err(ActionError::AlreadyInFlight(key.to_string()));
        }
        Ok(())
    }

    /// Runs `action` under `key`, or fails at once if that key is busy.
    pub async fn run<F>(&self, key: impl Into<String>, action: F) -> Result<F::Output, ActionError>
    where
        F: Future,
    {
        let key = key.into();
        let (handle, registration) = AbortHandle::new_pair();

        let guard = {
            let mut pending = self.lock();
            if pending.contains_key(&key) {
                warn!("Rejected duplicate action {}", key);
                return Err(ActionError::AlreadyInFlight(key));
            }

            let id = self.next_id.fetch_add(1, Ordering::Relaxed);
            pending.insert(key.clone(), (id, handle));
            PendingAction {
                owner: self,
                key: key.clone(),
                id,
            }
        };

        debug!("Action {} started", key);
        let result = Abortable::new(action, registration).await;
        drop(guard);

        result.map_err(|_| {
            info!("Action {} aborted", key);
            ActionError::Aborted(key)
        })
    }

    /// Aborts the pending action under `key`. Returns whether one was pending.
    pub fn cancel(&self, key: &str) -> bool {
        match self.lock().remove(key) {
            Some((_, handle)) => {
                handle.abort();
                info!("Cancelled pending action {}", key);
                true
            }
            None => false,
        }
    }
}
