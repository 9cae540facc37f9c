//! # kynecta-store
//!
//! Durable key-value document storage for the Kynecta client.
//!
//! The session and outbox caches persist their state as JSON documents
//! keyed by string: one document per key, no transactions, no expiry.
//! The [`KeyValueStore`] trait captures that contract; [`Database`] is the
//! SQLite-backed implementation used in production and [`MemoryStore`] the
//! throwaway in-memory one used in tests and ephemeral profiles.

pub mod database;
pub mod kv;
pub mod memory;
pub mod migrations;

mod error;

pub use database::Database;
pub use error::StoreError;
pub use kv::{get_json, put_json, KeyValueStore};
pub use memory::MemoryStore;
