//! Contracts for the remote operations this crate consumes.
//!
//! The messaging backend and the identity profile endpoint are external
//! collaborators; the cache only ever talks to them through these traits.
//! Network-level failures and server rejections are deliberately the same
//! error surface: both mean "keep the message queued, retry on the next
//! drain trigger".

use async_trait::async_trait;
use thiserror::Error;

use kynecta_shared::{MessagePayload, UserSnapshot};

/// A remote operation failed.
#[derive(Error, Debug)]
pub enum SendError {
    /// The request never reached the backend (DNS, TCP, TLS, timeout).
    #[error("network error: {0}")]
    Network(String),

    /// The backend answered with a non-success status.
    #[error("rejected by server: {0}")]
    Rejected(String),
}

/// The messaging backend's send operation.
#[async_trait]
pub trait MessageTransport: Send + Sync {
    /// Deliver one message.  Implementations must not retry internally;
    /// retry policy belongs to the drain loop.
    async fn send(&self, payload: &MessagePayload) -> Result<(), SendError>;
}

/// The identity provider's profile endpoint, used to replace the cached
/// snapshot once the device is back online.
#[async_trait]
pub trait ProfileService: Send + Sync {
    async fn fetch_profile(&self) -> Result<UserSnapshot, SendError>;
}
