//! Per-kind adapter between the notification source and the mirror.
//!
//! Each adapter turns add/update/delete notifications for one resource kind
//! into store mutations and bus publications. Per-notification errors are
//! local: a malformed object is logged and skipped, never stopping the loop.

use std::sync::Arc;

use bytes::Bytes;
use tokio::sync::watch;
use tracing::{debug, error, info};

use crate::domain::Resource;

use super::events::EventBus;
use super::keys::resource_key;
use super::source::{WatchEvent, WatchReceiver};
use super::store::MirrorStore;

/// Controls a running adapter. Cloneable; `stop` is idempotent.
#[derive(Clone)]
pub struct AdapterHandle {
    stop_tx: watch::Sender<bool>,
}

impl AdapterHandle {
    /// Signal the adapter to stop. Unblocks `run` promptly; stopping one
    /// adapter never affects another.
    pub fn stop(&self) {
        // send_replace rather than send: stop must succeed even when the
        // run loop has already exited and dropped its receiver.
        self.stop_tx.send_replace(true);
    }
}

/// One watcher per resource kind, feeding the shared store and bus.
pub struct ResourceAdapter<T: Resource> {
    store: Arc<dyn MirrorStore>,
    bus: Arc<EventBus>,
    events: WatchReceiver<T>,
    stop_rx: watch::Receiver<bool>,
}

impl<T: Resource> ResourceAdapter<T> {
    pub fn new(
        store: Arc<dyn MirrorStore>,
        bus: Arc<EventBus>,
        events: WatchReceiver<T>,
    ) -> (Self, AdapterHandle) {
        let (stop_tx, stop_rx) = watch::channel(false);
        (
            Self {
                store,
                bus,
                events,
                stop_rx,
            },
            AdapterHandle { stop_tx },
        )
    }

    /// Consume notifications until the source closes or stop is signalled.
    pub async fn run(mut self) {
        info!(kind = %T::KIND, "Resource adapter running");

        loop {
            tokio::select! {
                changed = self.stop_rx.changed() => {
                    if changed.is_err() || *self.stop_rx.borrow() {
                        break;
                    }
                }
                event = self.events.recv() => {
                    match event {
                        Some(event) => self.apply(event),
                        None => {
                            debug!(kind = %T::KIND, "Notification source closed");
                            break;
                        }
                    }
                }
            }
        }

        info!(kind = %T::KIND, "Resource adapter stopped");
    }

    fn apply(&self, event: WatchEvent<T>) {
        let object = event.object();
        let key = match resource_key(T::KIND, object.namespace(), object.name()) {
            Ok(key) => key,
            Err(err) => {
                error!(
                    kind = %T::KIND,
                    namespace = object.namespace(),
                    name = object.name(),
                    error = %err,
                    "Unable to build resource key"
                );
                return;
            }
        };

        match event {
            WatchEvent::Added(object) | WatchEvent::Modified(object) => {
                debug!(kind = %T::KIND, key, "Applying upsert notification");

                let serialized = match serde_json::to_vec(&object) {
                    Ok(serialized) => Bytes::from(serialized),
                    Err(err) => {
                        // Store left unchanged: better a stale last-known
                        // value than a partial write.
                        error!(
                            kind = %T::KIND,
                            key,
                            error = %err,
                            "Unable to serialize resource"
                        );
                        return;
                    }
                };

                self.store.set(&key, serialized);
            }
            WatchEvent::Deleted(_) => {
                debug!(kind = %T::KIND, key, "Applying delete notification");

                if let Err(err) = self.store.delete(&key) {
                    // Absence is the postcondition; an already-missing key
                    // (eviction, duplicate delete) is not a failure.
                    debug!(kind = %T::KIND, key, error = %err, "Delete found no entry");
                }
            }
        }

        // Published unconditionally so subscribers always re-query for
        // ground truth.
        self.bus.publish(&key);
    }
}
