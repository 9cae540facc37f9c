//! Outbox drain coordination.
//!
//! A drain pass snapshots the queue, then hands each entry to the remote
//! send operation strictly in enqueue order, one at a time.  Messages
//! enqueued during a pass belong to the next pass.  A single in-flight
//! flag guards against overlapping passes: the second trigger is dropped
//! while one is running, so no message is handed to the transport twice
//! within an overlapping window.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{debug, info, warn};

use kynecta_shared::DrainReport;

use crate::outbox::OutboxQueue;
use crate::remote::MessageTransport;

/// Drains the outbox against the remote send operation.
pub struct SyncCoordinator {
    outbox: Arc<OutboxQueue>,
    transport: Arc<dyn MessageTransport>,
    /// Delivery attempts allowed per message before it is dropped.
    max_send_attempts: u32,
    in_flight: AtomicBool,
}

impl SyncCoordinator {
    pub fn new(
        outbox: Arc<OutboxQueue>,
        transport: Arc<dyn MessageTransport>,
        max_send_attempts: u32,
    ) -> Self {
        Self {
            outbox,
            transport,
            max_send_attempts,
            in_flight: AtomicBool::new(false),
        }
    }

    /// Whether a drain pass is currently running.
    pub fn is_draining(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Attempt to deliver every currently queued message.
    ///
    /// Sends are serialized; a failed send does not block later entries.
    /// If a pass is already running the trigger is dropped and an empty
    /// report returned; the caller re-triggers after completion (the next
    /// connectivity edge or manual retry does this naturally).
    pub async fn drain(&self) -> DrainReport {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!("drain already in progress, dropping trigger");
            return DrainReport::default();
        }
        let _guard = InFlightGuard(&self.in_flight);

        let snapshot = self.outbox.list();
        if snapshot.is_empty() {
            return DrainReport::default();
        }

        debug!(pending = snapshot.len(), "draining outbox");
        let mut report = DrainReport::default();

        for entry in snapshot {
            match self.transport.send(&entry.payload).await {
                Ok(()) => {
                    self.outbox.dequeue(&entry.local_id);
                    report.synced_count += 1;
                }
                Err(e) => {
                    warn!(local_id = %entry.local_id, error = %e, "send failed");
                    match self.outbox.mark_failed(&entry.local_id) {
                        Some(attempts) if attempts >= self.max_send_attempts => {
                            self.outbox.dequeue(&entry.local_id);
                            report.dropped_count += 1;
                            warn!(
                                local_id = %entry.local_id,
                                attempts,
                                "dropping message after repeated delivery failures"
                            );
                        }
                        Some(_) => report.failed_count += 1,
                        // The entry was removed mid-pass (session cleared);
                        // nothing left to retry.
                        None => {}
                    }
                }
            }
        }

        info!(
            synced = report.synced_count,
            failed = report.failed_count,
            dropped = report.dropped_count,
            "outbox drain complete"
        );
        report
    }
}

/// Clears the in-flight flag when the pass ends, however it ends.
struct InFlightGuard<'a>(&'a AtomicBool);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::collections::VecDeque;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use tokio::sync::Semaphore;

    use kynecta_shared::{MessagePayload, MessageStatus};
    use kynecta_store::MemoryStore;

    use crate::remote::SendError;

    fn payload(n: u32) -> MessagePayload {
        MessagePayload::new(
            "text",
            serde_json::json!({ "text": format!("message {n}") }),
            format!("recipient-{n}"),
        )
    }

    fn new_outbox() -> Arc<OutboxQueue> {
        Arc::new(OutboxQueue::new(Arc::new(MemoryStore::new())))
    }

    /// Transport that replays a scripted sequence of outcomes and records
    /// every payload it was handed.
    struct ScriptedTransport {
        script: Mutex<VecDeque<Result<(), SendError>>>,
        sent: Mutex<Vec<String>>,
    }

    impl ScriptedTransport {
        fn new(script: Vec<Result<(), SendError>>) -> Arc<Self> {
            Arc::new(Self {
                script: Mutex::new(script.into()),
                sent: Mutex::new(Vec::new()),
            })
        }

        fn sent(&self) -> Vec<String> {
            self.sent.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl MessageTransport for ScriptedTransport {
        async fn send(&self, payload: &MessagePayload) -> Result<(), SendError> {
            self.sent.lock().unwrap().push(payload.recipient_id.clone());
            self.script
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Err(SendError::Network("script exhausted".into())))
        }
    }

    /// Transport that signals when a send starts and blocks until released.
    struct GatedTransport {
        entered: Semaphore,
        release: Semaphore,
        sent: Mutex<Vec<String>>,
    }

    impl GatedTransport {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                entered: Semaphore::const_new(0),
                release: Semaphore::const_new(0),
                sent: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl MessageTransport for GatedTransport {
        async fn send(&self, payload: &MessagePayload) -> Result<(), SendError> {
            self.sent.lock().unwrap().push(payload.recipient_id.clone());
            self.entered.add_permits(1);
            self.release.acquire().await.unwrap().forget();
            Ok(())
        }
    }

    #[tokio::test]
    async fn drain_reports_mixed_outcome_and_keeps_failures_queued() {
        let outbox = new_outbox();
        outbox.enqueue(payload(1));
        outbox.enqueue(payload(2));
        outbox.enqueue(payload(3));

        let transport = ScriptedTransport::new(vec![
            Ok(()),
            Err(SendError::Network("no route".into())),
            Ok(()),
        ]);
        let coordinator = SyncCoordinator::new(outbox.clone(), transport.clone(), 5);

        let report = coordinator.drain().await;

        assert!(report.synced());
        assert_eq!(report.synced_count, 2);
        assert_eq!(report.failed_count, 1);
        assert_eq!(report.dropped_count, 0);

        // Only the failed message remains, marked for the next pass.
        let remaining = outbox.list();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].payload.recipient_id, "recipient-2");
        assert_eq!(remaining[0].status, MessageStatus::Failed);
        assert_eq!(remaining[0].attempts, 1);

        // Sends happened strictly in enqueue order.
        assert_eq!(
            transport.sent(),
            vec!["recipient-1", "recipient-2", "recipient-3"]
        );
    }

    #[tokio::test]
    async fn drain_of_empty_queue_is_a_noop() {
        let transport = ScriptedTransport::new(vec![]);
        let coordinator = SyncCoordinator::new(new_outbox(), transport.clone(), 5);

        let report = coordinator.drain().await;

        assert!(!report.synced());
        assert!(transport.sent().is_empty());
    }

    #[tokio::test]
    async fn message_is_dropped_after_exhausting_attempts() {
        let outbox = new_outbox();
        outbox.enqueue(payload(1));

        let transport = ScriptedTransport::new(vec![
            Err(SendError::Rejected("503".into())),
            Err(SendError::Rejected("503".into())),
        ]);
        let coordinator = SyncCoordinator::new(outbox.clone(), transport, 2);

        let first = coordinator.drain().await;
        assert_eq!(first.failed_count, 1);
        assert_eq!(outbox.count(), 1);

        let second = coordinator.drain().await;
        assert_eq!(second.failed_count, 0);
        assert_eq!(second.dropped_count, 1);
        assert_eq!(outbox.count(), 0);
    }

    #[tokio::test]
    async fn overlapping_drain_is_dropped_and_nothing_is_double_sent() {
        let outbox = new_outbox();
        outbox.enqueue(payload(1));
        outbox.enqueue(payload(2));

        let transport = GatedTransport::new();
        let coordinator = Arc::new(SyncCoordinator::new(outbox, transport.clone(), 5));

        let first = {
            let coordinator = coordinator.clone();
            tokio::spawn(async move { coordinator.drain().await })
        };

        // Wait until the first send is in flight, then trigger again.
        transport.entered.acquire().await.unwrap().forget();
        assert!(coordinator.is_draining());

        let second = coordinator.drain().await;
        assert_eq!(second, DrainReport::default());
        assert_eq!(transport.sent.lock().unwrap().len(), 1);

        transport.release.add_permits(2);
        let report = first.await.unwrap();

        assert_eq!(report.synced_count, 2);
        let sent = transport.sent.lock().unwrap().clone();
        assert_eq!(sent, vec!["recipient-1", "recipient-2"]);
    }

    #[tokio::test]
    async fn messages_enqueued_during_a_pass_wait_for_the_next_one() {
        let outbox = new_outbox();
        outbox.enqueue(payload(1));

        let transport = GatedTransport::new();
        let coordinator = Arc::new(SyncCoordinator::new(outbox.clone(), transport.clone(), 5));

        let pass = {
            let coordinator = coordinator.clone();
            tokio::spawn(async move { coordinator.drain().await })
        };

        transport.entered.acquire().await.unwrap().forget();
        outbox.enqueue(payload(2));

        transport.release.add_permits(1);
        let report = pass.await.unwrap();

        // The late arrival was not part of the snapshot.
        assert_eq!(report.synced_count, 1);
        assert_eq!(outbox.count(), 1);
        assert_eq!(outbox.list()[0].payload.recipient_id, "recipient-2");
    }
}
