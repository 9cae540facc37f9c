//! The sync service: explicit composition of the session cache, outbox,
//! connectivity monitor, and sync coordinator.
//!
//! Constructed once at process start and passed by reference to whatever
//! needs it.  Platform connectivity notifications are fed in through
//! [`SyncService::handle_link_change`] (or the spawnable
//! [`SyncService::run_link_events`] pump); the Offline -> Online edge
//! triggers exactly one drain attempt plus a profile refresh.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use kynecta_shared::{DrainReport, MessagePayload, SessionState, UserSnapshot};
use kynecta_store::{Database, KeyValueStore, StoreError};
use kynecta_sync::{
    ConnectivityMonitor, LinkState, LinkTransition, MessageTransport, OutboxQueue, ProfileService,
    SessionCache, SyncCoordinator,
};

use crate::config::ClientConfig;
use crate::events::ClientEvent;

/// What happened to a message handed to [`SyncService::send_message`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendDisposition {
    /// Delivered directly to the backend.
    Delivered,
    /// Buffered in the outbox under this local id.
    Queued(String),
}

/// Central service object owning the offline cache.
pub struct SyncService {
    session: SessionCache,
    outbox: Arc<OutboxQueue>,
    coordinator: SyncCoordinator,
    transport: Arc<dyn MessageTransport>,
    profile: Arc<dyn ProfileService>,
    monitor: Mutex<ConnectivityMonitor>,
    events: mpsc::Sender<ClientEvent>,
}

impl SyncService {
    /// Build the service over an already-open store.
    ///
    /// Returns the service plus the receiving half of the event channel;
    /// the embedder forwards those events to its UI layer.
    pub fn new(
        store: Arc<dyn KeyValueStore>,
        transport: Arc<dyn MessageTransport>,
        profile: Arc<dyn ProfileService>,
        config: &ClientConfig,
    ) -> (Arc<Self>, mpsc::Receiver<ClientEvent>) {
        let (events_tx, events_rx) = mpsc::channel(config.event_capacity);

        let session = SessionCache::new(store.clone());
        let outbox = Arc::new(OutboxQueue::new(store));
        let coordinator = SyncCoordinator::new(
            outbox.clone(),
            transport.clone(),
            config.max_send_attempts,
        );

        let service = Arc::new(Self {
            session,
            outbox,
            coordinator,
            transport,
            profile,
            monitor: Mutex::new(ConnectivityMonitor::default()),
            events: events_tx,
        });

        (service, events_rx)
    }

    /// Build the service over the default on-disk database, honouring
    /// `config.data_dir` when set.
    pub fn open_default(
        transport: Arc<dyn MessageTransport>,
        profile: Arc<dyn ProfileService>,
        config: &ClientConfig,
    ) -> Result<(Arc<Self>, mpsc::Receiver<ClientEvent>), StoreError> {
        let database = match &config.data_dir {
            Some(dir) => {
                std::fs::create_dir_all(dir)?;
                Database::open_at(&dir.join("kynecta.db"))?
            }
            None => Database::new()?,
        };
        Ok(Self::new(Arc::new(database), transport, profile, config))
    }

    /// What the UI should currently render: auth fields from the session
    /// cache plus the live outbox count.
    pub fn session_state(&self) -> SessionState {
        SessionState {
            is_authenticated: self.session.is_authenticated(),
            is_offline_mode: self.session.is_offline_mode(),
            offline_user: self.session.offline_user(),
            queued_messages: self.outbox.count(),
        }
    }

    /// Record a sign-in.  `offline` marks the identity as trusted from
    /// the local cache rather than freshly verified.
    pub fn sign_in(&self, user: UserSnapshot, offline: bool) {
        info!(user = %user.id, offline, "signed in");
        self.session.set_authenticated(user, offline);
    }

    /// Clear the session and discard every queued message: messages
    /// composed under the old identity must not be replayed under no
    /// identity.  An in-flight drain finishes against its snapshot; its
    /// removals on the now-empty queue are no-ops.
    pub async fn sign_out(&self) {
        self.session.clear();
        self.outbox.clear();
        info!("signed out, session and outbox cleared");
        self.emit(ClientEvent::SessionCleared).await;
    }

    /// Whether the monitor currently believes the device is online.
    pub fn is_online(&self) -> bool {
        self.lock_monitor().state() == LinkState::Online
    }

    /// Send a message now if possible, otherwise buffer it.
    ///
    /// A failed direct send degrades to the outbox as well, so the
    /// message is retried on the next drain instead of surfacing a hard
    /// error.
    pub async fn send_message(&self, payload: MessagePayload) -> SendDisposition {
        if self.is_online() {
            match self.transport.send(&payload).await {
                Ok(()) => return SendDisposition::Delivered,
                Err(e) => warn!(error = %e, "direct send failed, queueing message"),
            }
        }

        let local_id = self.outbox.enqueue(payload);
        self.emit(ClientEvent::MessageQueued {
            local_id: local_id.clone(),
        })
        .await;
        SendDisposition::Queued(local_id)
    }

    /// Manual "send now": one drain attempt outside any connectivity
    /// transition.
    pub async fn sync_now(&self) -> DrainReport {
        let report = self.coordinator.drain().await;
        self.emit(ClientEvent::OutboxDrained { report }).await;
        report
    }

    /// Feed one platform connectivity notification into the service.
    pub async fn handle_link_change(&self, online: bool) {
        let transition = self.lock_monitor().observe(online);

        match transition {
            Some(LinkTransition::WentOnline) => {
                info!("connectivity restored");
                self.emit(ClientEvent::ConnectivityChanged { online: true })
                    .await;

                let report = self.coordinator.drain().await;
                self.emit(ClientEvent::OutboxDrained { report }).await;

                self.refresh_profile().await;
            }
            Some(LinkTransition::WentOffline) => {
                info!("connectivity lost");
                self.emit(ClientEvent::ConnectivityChanged { online: false })
                    .await;
            }
            None => {}
        }
    }

    /// Consume platform connectivity notifications until the channel
    /// closes.
    pub async fn run_link_events(self: Arc<Self>, mut link_rx: mpsc::Receiver<bool>) {
        info!("connectivity bridge started");
        while let Some(online) = link_rx.recv().await {
            self.handle_link_change(online).await;
        }
        info!("connectivity bridge stopped");
    }

    /// Spawn [`Self::run_link_events`] on the current tokio runtime.
    pub fn spawn_link_events(
        self: &Arc<Self>,
        link_rx: mpsc::Receiver<bool>,
    ) -> tokio::task::JoinHandle<()> {
        let service = Arc::clone(self);
        tokio::spawn(service.run_link_events(link_rx))
    }

    /// Replace the cached identity with a freshly fetched profile.  A
    /// failed fetch keeps the cached snapshot; the session simply stays
    /// in offline mode until the next opportunity.
    async fn refresh_profile(&self) {
        if !self.session.is_authenticated() {
            return;
        }

        match self.profile.fetch_profile().await {
            Ok(user) => {
                self.session.refresh_user(user.clone());
                self.emit(ClientEvent::ProfileRefreshed { user }).await;
            }
            Err(e) => {
                debug!(error = %e, "profile refresh failed, keeping cached snapshot");
            }
        }
    }

    fn lock_monitor(&self) -> MutexGuard<'_, ConnectivityMonitor> {
        self.monitor.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn emit(&self, event: ClientEvent) {
        // A dropped receiver means the embedder stopped listening; the
        // service keeps working without it.
        let _ = self.events.send(event).await;
    }
}
