use std::sync::Arc;
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;
use crate::account_infra::aggregator::AggregatedSnapshot;
use crate::observability::metrics::SNAPSHOTS_PUBLISHED;

pub type SnapshotSlot = Option<Arc<AggregatedSnapshot>>;

/// Single-slot, overwrite-latest mailbox between the polling worker and
/// consumers.
///
/// Readers always get a whole snapshot, the previous one or the new one.
/// There is no history: a consumer that reads slowly only sees the latest.
pub struct SnapshotPublisher {
    slot: watch::Sender<SnapshotSlot>,
}

impl SnapshotPublisher {
    pub fn new() -> Self {
        let (slot, _) = watch::channel(None);
        SnapshotPublisher { slot }
    }

    /// Replace the slot. Returns `false` and keeps the current snapshot when
    /// `snapshot` is older than it, so `generated_at` never goes backwards.
    pub fn publish(&self, snapshot: Arc<AggregatedSnapshot>) -> bool {
        let replaced = self.slot.send_if_modified(|current| {
            if let Some(existing) = current {
                if snapshot.generated_at < existing.generated_at {
                    return false;
                }
            }
            *current = Some(Arc::clone(&snapshot));
            true
        });

        if replaced {
            SNAPSHOTS_PUBLISHED.inc();
        } else {
            tracing::warn!(
                generated_at = %snapshot.generated_at,
                "Dropping snapshot older than the published one"
            );
        }
        replaced
    }

    /// Latest snapshot without blocking. Two calls with no publish in
    /// between return the same allocation.
    pub fn latest(&self) -> SnapshotSlot {
        self.slot.borrow().clone()
    }

    /// Change notification: `changed().await` wakes on every publish.
    pub fn subscribe(&self) -> watch::Receiver<SnapshotSlot> {
        self.slot.subscribe()
    }

    /// Stream of published snapshots, starting with the current one if any.
    pub fn updates(&self) -> impl futures::Stream<Item = Arc<AggregatedSnapshot>> + use<> {
        use futures::StreamExt;
        WatchStream::new(self.slot.subscribe()).filter_map(|slot| async move { slot })
    }
}

impl Default for SnapshotPublisher {
    fn default() -> Self {
        Self::new()
    }
}
