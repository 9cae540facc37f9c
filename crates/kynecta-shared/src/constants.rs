/// Application name
pub const APP_NAME: &str = "Kynecta";

/// Storage key of the serialized session document
pub const SESSION_KEY: &str = "kynecta.session";

/// Storage key of the serialized outbox document
pub const OUTBOX_KEY: &str = "kynecta.outbox";

/// Current schema version of the session document
pub const SESSION_SCHEMA_VERSION: u32 = 1;

/// Current schema version of the outbox document
pub const OUTBOX_SCHEMA_VERSION: u32 = 1;

/// Ceiling on delivery attempts before a queued message is dropped
pub const DEFAULT_MAX_SEND_ATTEMPTS: u32 = 5;

/// Default capacity of the client event channel
pub const DEFAULT_EVENT_CAPACITY: usize = 256;

/// Default base URL of the Kynecta HTTP backend
pub const DEFAULT_API_URL: &str = "http://localhost:8080";
