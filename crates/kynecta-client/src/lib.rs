//! # kynecta-client
//!
//! Headless client runtime for the Kynecta offline cache.  Wires the
//! session cache, outbox, and sync coordinator into one explicitly
//! constructed [`SyncService`], loads configuration from the environment,
//! and provides the HTTP adapters for the remote backend.

pub mod config;
pub mod events;
pub mod http;
pub mod service;

use tracing_subscriber::{fmt, EnvFilter};

pub use config::ClientConfig;
pub use events::ClientEvent;
pub use http::HttpBackend;
pub use service::{SendDisposition, SyncService};

/// Initialise the global tracing subscriber.  Call once at process start;
/// `RUST_LOG` overrides the default filter.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new("kynecta_client=debug,kynecta_sync=debug,kynecta_store=info,warn")
    });

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();
}
