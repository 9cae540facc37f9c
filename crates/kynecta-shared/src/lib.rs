//! # kynecta-shared
//!
//! Domain types shared across the Kynecta client crates: the session view
//! the UI renders from, the outbox entries buffered while the device has no
//! network path, and the report produced by an outbox drain.

pub mod constants;
pub mod types;

pub use types::*;
