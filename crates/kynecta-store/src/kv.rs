//! The key-value document contract and its SQLite implementation.
//!
//! Keys are plain strings, values are serialized JSON documents.  Reads and
//! writes are synchronous; callers that need typed access go through the
//! [`get_json`] / [`put_json`] helpers so every round trip is a full
//! serialize/deserialize copy.

use chrono::Utc;
use rusqlite::{params, OptionalExtension};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::database::Database;
use crate::error::Result;

/// String-keyed document storage: one JSON blob per key, no transactions,
/// no expiry.
pub trait KeyValueStore: Send + Sync {
    /// Fetch the raw document stored under `key`, if any.
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Store `value` under `key`, replacing any previous document.
    fn put(&self, key: &str, value: &str) -> Result<()>;

    /// Delete the document stored under `key`.  Removing an absent key is
    /// a no-op.
    fn remove(&self, key: &str) -> Result<()>;
}

/// Fetch and deserialize the document stored under `key`.
///
/// Returns `Ok(None)` when the key is absent; a present-but-malformed
/// document surfaces as a `Serde` error so callers can discard it
/// deterministically.
pub fn get_json<T: DeserializeOwned>(store: &dyn KeyValueStore, key: &str) -> Result<Option<T>> {
    match store.get(key)? {
        Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
        None => Ok(None),
    }
}

/// Serialize `value` and store it under `key`.
pub fn put_json<T: Serialize>(store: &dyn KeyValueStore, key: &str, value: &T) -> Result<()> {
    let raw = serde_json::to_string(value)?;
    store.put(key, &raw)
}

impl KeyValueStore for Database {
    fn get(&self, key: &str) -> Result<Option<String>> {
        self.with_conn(|conn| {
            let value = conn
                .query_row(
                    "SELECT value FROM kv_entries WHERE key = ?1",
                    params![key],
                    |row| row.get(0),
                )
                .optional()?;
            Ok(value)
        })
    }

    fn put(&self, key: &str, value: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO kv_entries (key, value, updated_at)
                 VALUES (?1, ?2, ?3)
                 ON CONFLICT(key) DO UPDATE SET
                     value = excluded.value,
                     updated_at = excluded.updated_at",
                params![key, value, Utc::now().to_rfc3339()],
            )?;
            Ok(())
        })
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute("DELETE FROM kv_entries WHERE key = ?1", params![key])?;
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    fn open_test_db(dir: &tempfile::TempDir) -> Database {
        Database::open_at(&dir.path().join("kv.db")).unwrap()
    }

    #[test]
    fn put_get_remove_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let db = open_test_db(&dir);

        assert_eq!(db.get("missing").unwrap(), None);

        db.put("session", r#"{"ok":true}"#).unwrap();
        assert_eq!(db.get("session").unwrap().as_deref(), Some(r#"{"ok":true}"#));

        db.remove("session").unwrap();
        assert_eq!(db.get("session").unwrap(), None);

        // Removing an absent key is a no-op.
        db.remove("session").unwrap();
    }

    #[test]
    fn put_replaces_existing_document() {
        let dir = tempfile::tempdir().unwrap();
        let db = open_test_db(&dir);

        db.put("k", "one").unwrap();
        db.put("k", "two").unwrap();
        assert_eq!(db.get("k").unwrap().as_deref(), Some("two"));
    }

    #[test]
    fn documents_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("kv.db");

        {
            let db = Database::open_at(&path).unwrap();
            db.put("outbox", "[]").unwrap();
        }

        let db = Database::open_at(&path).unwrap();
        assert_eq!(db.get("outbox").unwrap().as_deref(), Some("[]"));
    }

    #[test]
    fn typed_helpers_round_trip() {
        #[derive(Debug, PartialEq, Serialize, Deserialize)]
        struct Doc {
            n: u32,
            tag: String,
        }

        let dir = tempfile::tempdir().unwrap();
        let db = open_test_db(&dir);

        let doc = Doc {
            n: 7,
            tag: "hello".into(),
        };
        put_json(&db, "doc", &doc).unwrap();

        let restored: Option<Doc> = get_json(&db, "doc").unwrap();
        assert_eq!(restored, Some(doc));
    }

    #[test]
    fn typed_get_rejects_malformed_document() {
        let dir = tempfile::tempdir().unwrap();
        let db = open_test_db(&dir);

        db.put("doc", "not json at all").unwrap();

        let result: Result<Option<serde_json::Value>> = get_json(&db, "doc");
        assert!(matches!(result, Err(crate::StoreError::Serde(_))));
    }
}
