//! Local session cache.
//!
//! Single source of truth for what the UI currently believes about the
//! logged-in user.  The cache hydrates once from the document store at
//! construction and serves every read from memory, so the UI can render
//! before any network round trip completes.  Every mutation is written
//! through to storage immediately; a failed write is logged and the
//! in-memory state keeps the attempted change.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use kynecta_shared::constants::{SESSION_KEY, SESSION_SCHEMA_VERSION};
use kynecta_shared::UserSnapshot;
use kynecta_store::{get_json, put_json, KeyValueStore};

/// Persisted layout of the session document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
struct SessionRecord {
    /// Bumped whenever the document layout changes; a mismatched version
    /// is discarded at hydration, never best-effort parsed.
    schema_version: u32,
    is_authenticated: bool,
    is_offline_mode: bool,
    offline_user: Option<UserSnapshot>,
    last_auth_at: Option<DateTime<Utc>>,
}

impl Default for SessionRecord {
    fn default() -> Self {
        Self {
            schema_version: SESSION_SCHEMA_VERSION,
            is_authenticated: false,
            is_offline_mode: false,
            offline_user: None,
            last_auth_at: None,
        }
    }
}

/// Offline-aware view of the authenticated user.
pub struct SessionCache {
    store: Arc<dyn KeyValueStore>,
    record: Mutex<SessionRecord>,
}

impl SessionCache {
    /// Hydrate the cache from the store.  An absent, unreadable, or
    /// version-mismatched document yields the default "not authenticated"
    /// state, and the unusable document is removed.
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        let record = hydrate(store.as_ref());
        Self {
            store,
            record: Mutex::new(record),
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.lock().is_authenticated
    }

    pub fn is_offline_mode(&self) -> bool {
        self.lock().is_offline_mode
    }

    /// The cached identity, copied out.
    pub fn offline_user(&self) -> Option<UserSnapshot> {
        self.lock().offline_user.clone()
    }

    /// When the current session was last established.
    pub fn last_auth_at(&self) -> Option<DateTime<Utc>> {
        self.lock().last_auth_at
    }

    /// Record a sign-in.  `offline` marks the session as established from
    /// the local cache rather than freshly verified; the user snapshot is
    /// always stored so offline mode never lacks an identity to fall back
    /// to.
    pub fn set_authenticated(&self, user: UserSnapshot, offline: bool) {
        let mut record = self.lock();
        record.is_authenticated = true;
        record.is_offline_mode = offline;
        record.offline_user = Some(user);
        record.last_auth_at = Some(Utc::now());
        self.persist(&record);
    }

    /// Replace the cached identity with a freshly fetched profile and
    /// leave offline mode.  No-op when not authenticated.
    pub fn refresh_user(&self, user: UserSnapshot) {
        let mut record = self.lock();
        if !record.is_authenticated {
            return;
        }
        record.offline_user = Some(user);
        record.is_offline_mode = false;
        self.persist(&record);
    }

    /// Reset to the default "not authenticated" state.  Callers that own
    /// an outbox must clear it alongside so messages queued under the old
    /// identity are never replayed under no identity.
    pub fn clear(&self) {
        let mut record = self.lock();
        *record = SessionRecord::default();
        self.persist(&record);
    }

    fn lock(&self) -> MutexGuard<'_, SessionRecord> {
        self.record.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn persist(&self, record: &SessionRecord) {
        if let Err(e) = put_json(self.store.as_ref(), SESSION_KEY, record) {
            warn!(error = %e, "failed to persist session; storage lags memory until the next successful write");
        }
    }
}

fn hydrate(store: &dyn KeyValueStore) -> SessionRecord {
    match get_json::<SessionRecord>(store, SESSION_KEY) {
        Ok(Some(record)) if record.schema_version == SESSION_SCHEMA_VERSION => {
            debug!(
                authenticated = record.is_authenticated,
                offline = record.is_offline_mode,
                "session hydrated"
            );
            record
        }
        Ok(Some(record)) => {
            warn!(
                found = record.schema_version,
                expected = SESSION_SCHEMA_VERSION,
                "discarding session document with unsupported schema version"
            );
            discard(store);
            SessionRecord::default()
        }
        Ok(None) => SessionRecord::default(),
        Err(e) => {
            warn!(error = %e, "discarding unreadable session document");
            discard(store);
            SessionRecord::default()
        }
    }
}

fn discard(store: &dyn KeyValueStore) {
    if let Err(e) = store.remove(SESSION_KEY) {
        debug!(error = %e, "could not remove session document");
    }
}
