use serde::Serialize;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

/// Name of the event fired once the whole queue has been flushed.
pub const UPLOADS_FLUSHED: &str = "uploads-flushed";

/// Milestones of the offline upload lifecycle, as seen by UI consumers.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "kebab-case")]
pub enum SyncEvent {
    /// Saved locally, will sync later.
    #[serde(rename_all = "camelCase")]
    UploadQueued { id: i64, name: String },
    #[serde(rename_all = "camelCase")]
    UploadSynced {
        id: i64,
        name: String,
        path: String,
        file_id: String,
    },
    #[serde(rename_all = "camelCase")]
    UploadFailed {
        id: i64,
        name: String,
        error: String,
        parked: bool,
    },
    /// Every pending upload reached the remote.
    UploadsFlushed,
}

impl SyncEvent {
    pub fn name(&self) -> &'static str {
        match self {
            SyncEvent::UploadQueued { .. } => "upload-queued",
            SyncEvent::UploadSynced { .. } => "upload-synced",
            SyncEvent::UploadFailed { .. } => "upload-failed",
            SyncEvent::UploadsFlushed => UPLOADS_FLUSHED,
        }
    }
}

/// Process-wide fire-and-forget broadcast of [`SyncEvent`]s.
///
/// Only subscribers registered at publish time see an event; nothing is replayed.
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<SyncEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Never blocks and never fails; returns how many subscribers were reached.
    pub fn publish(&self, event: SyncEvent) -> usize {
        tracing::debug!("📣 {}", event.name());
        self.tx.send(event).unwrap_or(0)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SyncEvent> {
        self.tx.subscribe()
    }

    /// Runs `handler` for every event on its own task, so a panicking
    /// handler only takes down that task.
    pub fn spawn_listener<F>(&self, mut handler: F) -> JoinHandle<()>
    where
        F: FnMut(SyncEvent) + Send + 'static,
    {
        let mut rx = self.subscribe();
        tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(event) => handler(event),
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!("Event listener lagged, skipped {} events", skipped);
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        })
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_publish_without_subscribers_is_a_noop() {
        let bus = EventBus::default();
        assert_eq!(bus.publish(SyncEvent::UploadsFlushed), 0);
    }

    #[tokio::test]
    async fn test_late_subscribers_miss_past_events() {
        let bus = EventBus::default();
        let mut early = bus.subscribe();
        bus.publish(SyncEvent::UploadsFlushed);
        let mut late = bus.subscribe();

        assert_eq!(early.recv().await.unwrap(), SyncEvent::UploadsFlushed);
        assert!(late.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_panicking_listener_does_not_reach_publisher() {
        let bus = EventBus::default();
        let failing = bus.spawn_listener(|_| panic!("listener bug"));
        let mut healthy = bus.subscribe();

        assert_eq!(bus.publish(SyncEvent::UploadsFlushed), 2);
        assert_eq!(healthy.recv().await.unwrap(), SyncEvent::UploadsFlushed);
        assert!(failing.await.unwrap_err().is_panic());
    }

    #[test]
    fn test_event_wire_format() {
        let json = serde_json::to_value(SyncEvent::UploadQueued {
            id: 7,
            name: "report.pdf".into(),
        })
        .unwrap();
        assert_eq!(json["event"], "upload-queued");
        assert_eq!(json["id"], 7);
        assert_eq!(
            serde_json::to_value(SyncEvent::UploadsFlushed).unwrap()["event"],
            UPLOADS_FLUSHED
        );
    }
}
