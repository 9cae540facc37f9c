//! Durable outbox queue.
//!
//! Ordered holding area for messages that could not be sent immediately.
//! Entries are kept in memory in strict append order and mirrored to the
//! document store on every mutation; the queue is the only place pending
//! outbound messages exist, and a dequeued entry cannot be recovered.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use kynecta_shared::constants::{OUTBOX_KEY, OUTBOX_SCHEMA_VERSION};
use kynecta_shared::{generate_local_id, MessagePayload, MessageStatus, QueuedMessage};
use kynecta_store::{get_json, put_json, KeyValueStore};

/// Persisted layout of the outbox document.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct OutboxRecord {
    /// Bumped whenever the document layout changes; a mismatched version
    /// is discarded at hydration.
    schema_version: u32,
    entries: Vec<QueuedMessage>,
}

/// FIFO queue of not-yet-delivered outgoing messages.
pub struct OutboxQueue {
    store: Arc<dyn KeyValueStore>,
    entries: Mutex<Vec<QueuedMessage>>,
}

impl OutboxQueue {
    /// Hydrate the queue from the store.  An absent, unreadable, or
    /// version-mismatched document yields an empty queue, and the unusable
    /// document is removed.
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        let entries = hydrate(store.as_ref());
        Self {
            store,
            entries: Mutex::new(entries),
        }
    }

    /// Append a message and return its local id, for the optimistic
    /// "pending" UI element keyed by it.
    pub fn enqueue(&self, payload: MessagePayload) -> String {
        let mut entries = self.lock();

        let mut entry = QueuedMessage::new(payload);
        // Ids embed a millisecond timestamp plus randomness; regenerate on
        // the off chance of a collision so uniqueness stays absolute.
        while entries.iter().any(|e| e.local_id == entry.local_id) {
            entry.local_id = generate_local_id();
        }

        let local_id = entry.local_id.clone();
        entries.push(entry);
        self.persist(&entries);

        debug!(local_id = %local_id, pending = entries.len(), "message queued");
        local_id
    }

    /// Remove the entry with the given id.  Removing an absent id is a
    /// no-op, not an error.
    pub fn dequeue(&self, local_id: &str) {
        let mut entries = self.lock();
        let before = entries.len();
        entries.retain(|e| e.local_id != local_id);
        if entries.len() != before {
            self.persist(&entries);
        }
    }

    /// Record a failed delivery attempt: the entry moves to `Failed` and
    /// its attempt counter is incremented.  Returns the new attempt count,
    /// or `None` when the id is no longer queued.
    pub fn mark_failed(&self, local_id: &str) -> Option<u32> {
        let mut entries = self.lock();
        let entry = entries.iter_mut().find(|e| e.local_id == local_id)?;
        entry.status = MessageStatus::Failed;
        entry.attempts += 1;
        let attempts = entry.attempts;
        self.persist(&entries);
        Some(attempts)
    }

    /// Snapshot of all pending entries, insertion order preserved.
    pub fn list(&self) -> Vec<QueuedMessage> {
        self.lock().clone()
    }

    /// Number of pending entries.
    pub fn count(&self) -> usize {
        self.lock().len()
    }

    /// Discard every pending entry (sign-out path).
    pub fn clear(&self) {
        let mut entries = self.lock();
        entries.clear();
        self.persist(&entries);
    }

    fn lock(&self) -> MutexGuard<'_, Vec<QueuedMessage>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn persist(&self, entries: &[QueuedMessage]) {
        let record = OutboxRecord {
            schema_version: OUTBOX_SCHEMA_VERSION,
            entries: entries.to_vec(),
        };
        if let Err(e) = put_json(self.store.as_ref(), OUTBOX_KEY, &record) {
            warn!(error = %e, "failed to persist outbox; storage lags memory until the next successful write");
        }
    }
}

fn hydrate(store: &dyn KeyValueStore) -> Vec<QueuedMessage> {
    match get_json::<OutboxRecord>(store, OUTBOX_KEY) {
        Ok(Some(record)) if record.schema_version == OUTBOX_SCHEMA_VERSION => {
            debug!(pending = record.entries.len(), "outbox hydrated");
            record.entries
        }
        Ok(Some(record)) => {
            warn!(
                found = record.schema_version,
                expected = OUTBOX_SCHEMA_VERSION,
                "discarding outbox document with unsupported schema version"
            );
            discard(store);
            Vec::new()
        }
        Ok(None) => Vec::new(),
        Err(e) => {
            warn!(error = %e, "discarding unreadable outbox document");
            discard(store);
            Vec::new()
        }
    }
}

fn discard(store: &dyn KeyValueStore) {
    if let Err(e) = store.remove(OUTBOX_KEY) {
        debug!(error = %e, "could not remove outbox document");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kynecta_store::{Database, MemoryStore};

    fn payload(n: u32) -> MessagePayload {
        MessagePayload::new(
            "text",
            serde_json::json!({ "text": format!("message {n}") }),
            format!("recipient-{n}"),
        )
    }

    #[test]
    fn list_preserves_enqueue_order() {
        let queue = OutboxQueue::new(Arc::new(MemoryStore::new()));

        let ids: Vec<String> = (0..5).map(|n| queue.enqueue(payload(n))).collect();

        let listed: Vec<String> = queue.list().into_iter().map(|e| e.local_id).collect();
        assert_eq!(listed, ids);
        assert_eq!(queue.count(), 5);
    }

    #[test]
    fn dequeue_is_idempotent() {
        let queue = OutboxQueue::new(Arc::new(MemoryStore::new()));
        let id = queue.enqueue(payload(0));
        queue.enqueue(payload(1));

        queue.dequeue(&id);
        assert_eq!(queue.count(), 1);

        // Second removal of the same id changes nothing.
        queue.dequeue(&id);
        assert_eq!(queue.count(), 1);
    }

    #[test]
    fn mark_failed_updates_status_and_attempts() {
        let queue = OutboxQueue::new(Arc::new(MemoryStore::new()));
        let id = queue.enqueue(payload(0));

        assert_eq!(queue.mark_failed(&id), Some(1));
        assert_eq!(queue.mark_failed(&id), Some(2));

        let entry = &queue.list()[0];
        assert_eq!(entry.status, MessageStatus::Failed);
        assert_eq!(entry.attempts, 2);

        assert_eq!(queue.mark_failed("no-such-id"), None);
    }

    #[test]
    fn clear_discards_everything() {
        let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        let queue = OutboxQueue::new(store.clone());
        queue.enqueue(payload(0));
        queue.enqueue(payload(1));

        queue.clear();
        assert_eq!(queue.count(), 0);

        let rehydrated = OutboxQueue::new(store);
        assert_eq!(rehydrated.count(), 0);
    }

    #[test]
    fn entries_survive_rehydration() {
        let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        let queue = OutboxQueue::new(store.clone());
        let ids: Vec<String> = (0..3).map(|n| queue.enqueue(payload(n))).collect();
        drop(queue);

        let rehydrated = OutboxQueue::new(store);
        let listed: Vec<String> = rehydrated.list().into_iter().map(|e| e.local_id).collect();
        assert_eq!(listed, ids);
    }

    #[test]
    fn entries_survive_database_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("outbox.db");

        let id = {
            let store: Arc<dyn KeyValueStore> = Arc::new(Database::open_at(&path).unwrap());
            OutboxQueue::new(store.clone()).enqueue(payload(0))
        };

        let store: Arc<dyn KeyValueStore> = Arc::new(Database::open_at(&path).unwrap());
        let queue = OutboxQueue::new(store);
        assert_eq!(queue.count(), 1);
        assert_eq!(queue.list()[0].local_id, id);
    }

    #[test]
    fn corrupt_document_falls_back_to_empty_and_is_discarded() {
        let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        store.put(OUTBOX_KEY, "][").unwrap();

        let queue = OutboxQueue::new(store.clone());
        assert_eq!(queue.count(), 0);
        assert_eq!(store.get(OUTBOX_KEY).unwrap(), None);
    }
}
