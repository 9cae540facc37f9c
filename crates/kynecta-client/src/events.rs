//! Notifications sent from the service to the embedding UI.
//!
//! The UI surface for all of these is passive: counts and dismissible
//! notices, never modal error states.

use serde::Serialize;

use kynecta_shared::{DrainReport, UserSnapshot};

/// Events emitted over the client event channel.
#[derive(Debug, Clone, Serialize)]
pub enum ClientEvent {
    /// The device gained or lost its network path; disables or re-enables
    /// send controls.
    ConnectivityChanged { online: bool },

    /// A message was buffered for later delivery; keys the optimistic
    /// "pending" element in the conversation view.
    MessageQueued { local_id: String },

    /// An outbox drain pass finished.
    OutboxDrained { report: DrainReport },

    /// The cached identity was replaced with a freshly fetched profile.
    ProfileRefreshed { user: UserSnapshot },

    /// The session (and with it the outbox) was cleared.
    SessionCleared,
}
