// * Single-task event dispatcher
// * Resolver workers and the review pass only enqueue events; one task owns the consumer

use crate::notify::events::{GroupSnapshot, ItemSnapshot, ResultEvent, ResultNotifier};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

/// Cloneable sender side of the dispatcher.
#[derive(Debug, Clone)]
pub struct NotifierHandle {
    tx: mpsc::UnboundedSender<ResultEvent>,
    token: CancellationToken,
}

impl NotifierHandle {
    pub fn clear(&self) {
        self.send(ResultEvent::Cleared);
    }

    pub fn group_added(&self, group: GroupSnapshot) {
        self.send(ResultEvent::GroupAdded(group));
    }

    pub fn item_added(&self, group_seq: u64, item: ItemSnapshot) {
        self.send(ResultEvent::ItemAdded { group_seq, item });
    }

    // ! No resolution completion may reach the consumer after stop
    pub fn group_updated(&self, group: GroupSnapshot) {
        if self.token.is_cancelled() {
            trace!(seq = group.seq, "Dropping group update after stop");
            return;
        }
        self.send(ResultEvent::GroupUpdated(group));
    }

    fn send(&self, event: ResultEvent) {
        if self.tx.send(event).is_err() {
            debug!("Result dispatcher is gone; event dropped");
        }
    }
}

/// Spawns the task owning `notifier`.
///
/// The task ends once every handle is dropped and returns the notifier.
pub fn spawn_dispatcher<N: ResultNotifier>(
    mut notifier: N,
    token: CancellationToken,
) -> (NotifierHandle, JoinHandle<N>) {
    let (tx, mut rx) = mpsc::unbounded_channel::<ResultEvent>();
    let handle = NotifierHandle {
        tx,
        token: token.clone(),
    };

    let task = tokio::spawn(async move {
        let mut delivered = 0usize;
        while let Some(event) = rx.recv().await {
            // * Updates queued before stop but dispatched after it are dropped too
            if token.is_cancelled() && matches!(event, ResultEvent::GroupUpdated(_)) {
                continue;
            }
            event.deliver(&mut notifier);
            delivered += 1;
        }
        debug!(delivered, "Result dispatcher finished");
        notifier
    });

    (handle, task)
}
