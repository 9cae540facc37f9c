//! Core domain types.
//!
//! Every struct derives `Serialize` and `Deserialize`: session and outbox
//! state cross a storage boundary as JSON documents, and a full round trip
//! through serde is the copy semantics the cache relies on (values are
//! copied, never aliased, between memory and storage).

use chrono::{DateTime, Utc};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// User
// ---------------------------------------------------------------------------

/// The minimal identity fields needed to render UI without a network call.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserSnapshot {
    /// Backend-assigned unique identifier.
    pub id: String,
    /// Display name shown in the UI.
    pub display_name: String,
    /// Email address; absent for anonymous/guest accounts.
    pub email: Option<String>,
    /// Avatar URL, if the user has uploaded one.
    pub avatar_url: Option<String>,
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// What the UI currently believes about the logged-in user.
///
/// `is_offline_mode == true` always comes with `offline_user` populated:
/// offline mode means identity is trusted from the local cache, so there
/// must be a cached identity to trust.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionState {
    /// Whether a user is signed in (freshly verified or from cache).
    pub is_authenticated: bool,
    /// Whether the sign-in was established from the local cache while
    /// the device had no network path.
    pub is_offline_mode: bool,
    /// Cached identity used to render the UI in offline mode.
    pub offline_user: Option<UserSnapshot>,
    /// Number of messages currently waiting in the outbox.
    pub queued_messages: usize,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            is_authenticated: false,
            is_offline_mode: false,
            offline_user: None,
            queued_messages: 0,
        }
    }
}

// ---------------------------------------------------------------------------
// Outbox
// ---------------------------------------------------------------------------

/// Body of an outgoing chat message.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MessagePayload {
    /// Client-generated id so the backend can deduplicate a payload that
    /// is delivered twice across a crash or overlapping-drain window.
    pub message_id: Uuid,
    /// Message kind ("text", "image", ...).
    pub kind: String,
    /// Kind-specific content.
    pub body: serde_json::Value,
    /// Backend id of the recipient.
    pub recipient_id: String,
}

impl MessagePayload {
    pub fn new(
        kind: impl Into<String>,
        body: serde_json::Value,
        recipient_id: impl Into<String>,
    ) -> Self {
        Self {
            message_id: Uuid::new_v4(),
            kind: kind.into(),
            body,
            recipient_id: recipient_id.into(),
        }
    }
}

/// Delivery state of a queued message.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum MessageStatus {
    /// Waiting for the next drain pass.
    Queued,
    /// Delivered; the entry is removed from the queue on this transition.
    Sent,
    /// At least one delivery attempt failed; retried on the next pass.
    Failed,
}

/// A message composed while the device had no network path.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct QueuedMessage {
    /// Locally unique id, `<unix-millis>-<8 hex chars>`; keys the
    /// optimistic "pending" UI element.
    pub local_id: String,
    /// The message body to hand to the remote send operation.
    pub payload: MessagePayload,
    /// When the message was composed.
    pub created_at: DateTime<Utc>,
    /// Current delivery state.
    pub status: MessageStatus,
    /// Delivery attempts so far; entries that exhaust the configured
    /// ceiling are dropped from the queue.
    pub attempts: u32,
}

impl QueuedMessage {
    /// Wrap a payload as a fresh queue entry.
    pub fn new(payload: MessagePayload) -> Self {
        Self {
            local_id: generate_local_id(),
            payload,
            created_at: Utc::now(),
            status: MessageStatus::Queued,
            attempts: 0,
        }
    }
}

/// Generate a locally unique, roughly monotonic id: millisecond timestamp
/// plus four random bytes.
pub fn generate_local_id() -> String {
    let millis = Utc::now().timestamp_millis();
    let mut suffix = [0u8; 4];
    rand::thread_rng().fill_bytes(&mut suffix);
    format!("{}-{}", millis, hex::encode(suffix))
}

// ---------------------------------------------------------------------------
// Drain report
// ---------------------------------------------------------------------------

/// Aggregate outcome of one outbox drain pass.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct DrainReport {
    /// Messages delivered and removed from the queue.
    pub synced_count: usize,
    /// Messages that failed and stay queued for the next pass.
    pub failed_count: usize,
    /// Messages discarded after exhausting their allowed attempts.
    pub dropped_count: usize,
}

impl DrainReport {
    /// True iff at least one message was delivered.
    pub fn synced(&self) -> bool {
        self.synced_count > 0
    }
}
