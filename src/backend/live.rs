use std::future::Future;

use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;

/// Collections a write can touch. Change marks are coarse on purpose:
/// subscribers re-run their query and push the whole result set, they
/// never try to patch incrementally.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Collection {
    Users,
    Classes,
    Meetings,
    Chats,
    Messages,
    Notifications,
}

/// Process-wide change notification bus. Every committed write calls
/// `notify`; live queries listen and refresh.
#[derive(Debug, Clone)]
pub struct ChangeBus {
    tx: broadcast::Sender<Collection>,
}

impl ChangeBus {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(256);
        Self { tx }
    }

    pub fn notify(&self, collection: Collection) {
        // No receivers is fine (nobody is watching yet).
        let _ = self.tx.send(collection);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Collection> {
        self.tx.subscribe()
    }
}

impl Default for ChangeBus {
    fn default() -> Self {
        Self::new()
    }
}

/// A standing subscription to a filtered/sorted query. The pump task
/// delivers an initial snapshot and then the full result set again after
/// every relevant change. Dropping the handle aborts the pump, which is
/// the teardown contract callers must honor when switching views.
pub struct LiveQuery<T> {
    rx: mpsc::UnboundedReceiver<Vec<T>>,
    task: JoinHandle<()>,
}

impl<T> LiveQuery<T> {
    /// Next pushed snapshot; `None` once the subscription is closed.
    pub async fn recv(&mut self) -> Option<Vec<T>> {
        self.rx.recv().await
    }
}

impl<T> Drop for LiveQuery<T> {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Subscribe to `query`, refreshing whenever any of `collections` is
/// marked changed. Query failures are logged and skipped; the
/// subscription stays up and heals on the next change.
pub fn watch<T, F, Fut>(bus: &ChangeBus, collections: Vec<Collection>, query: F) -> LiveQuery<T>
where
    T: Send + 'static,
    F: Fn() -> Fut + Send + 'static,
    Fut: Future<Output = crate::common::error::Result<Vec<T>>> + Send + 'static,
{
    let mut changes = bus.subscribe();
    let (tx, rx) = mpsc::unbounded_channel();

    let task = tokio::spawn(async move {
        match query().await {
            Ok(rows) => {
                if tx.send(rows).is_err() {
                    return;
                }
            }
            Err(e) => log::warn!("[LIVE] Initial snapshot failed: {}", e),
        }

        loop {
            let refresh = match changes.recv().await {
                Ok(c) => collections.contains(&c),
                // Missed marks: refresh unconditionally to catch up.
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    log::warn!("[LIVE] Subscription lagged by {} change marks", n);
                    true
                }
                Err(broadcast::error::RecvError::Closed) => break,
            };
            if !refresh {
                continue;
            }
            match query().await {
                Ok(rows) => {
                    if tx.send(rows).is_err() {
                        break;
                    }
                }
                Err(e) => log::warn!("[LIVE] Snapshot refresh failed: {}", e),
            }
        }
    });

    LiveQuery { rx, task }
}
