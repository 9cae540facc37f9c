//! # kynecta-sync
//!
//! The offline-aware heart of the Kynecta client: a local session cache the
//! UI can read synchronously before any network round trip completes, a
//! durable outbox for messages composed without a network path, a
//! connectivity state machine, and the coordinator that drains the outbox
//! against the remote send operation once connectivity returns.
//!
//! Nothing in this crate raises a fatal error.  Storage failures degrade to
//! default state and are logged; send failures are recorded on the queued
//! message and retried on the next drain trigger.

pub mod connectivity;
pub mod coordinator;
pub mod outbox;
pub mod remote;
pub mod session;

pub use connectivity::{ConnectivityMonitor, LinkState, LinkTransition};
pub use coordinator::SyncCoordinator;
pub use outbox::OutboxQueue;
pub use remote::{MessageTransport, ProfileService, SendError};
pub use session::SessionCache;
