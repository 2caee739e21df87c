//! Change-event fan-out.
//!
//! Adapters publish the storage key of every mutated resource; live
//! consumers subscribe and re-query the store for ground truth. The payload
//! deliberately carries no value and no add/update/delete distinction.

use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use metrics::{counter, gauge};
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::mpsc::{self, Receiver, Sender};
use tracing::{debug, info, warn};

use super::lock::mutex_lock;

const SOURCE: &str = "mirror::events";

const METRIC_EVENTS_PUBLISHED: &str = "floe_events_published_total";
const METRIC_EVENTS_DROPPED: &str = "floe_events_dropped_total";
const METRIC_BUS_SUBSCRIBERS: &str = "floe_bus_subscribers";

/// In-process publish/subscribe registry for change keys.
///
/// Delivery is non-blocking from the publisher's perspective: each
/// subscriber has a bounded queue and a full queue drops the new payload
/// (counted and logged) rather than stalling the publisher or other
/// subscribers. Per-subscriber FIFO order is preserved; there is no ordering
/// guarantee across subscribers.
pub struct EventBus {
    subscribers: Mutex<Vec<Sender<String>>>,
    dropped: AtomicU64,
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            subscribers: Mutex::new(Vec::new()),
            dropped: AtomicU64::new(0),
        }
    }

    /// Add a subscriber queue. The bus holds the sending half only; the
    /// consumer owns the receiver and must drain it promptly.
    pub fn register(&self, tx: Sender<String>) {
        let mut subscribers = mutex_lock(&self.subscribers, SOURCE, "register");
        info!(
            subscriber_count_before = subscribers.len(),
            subscriber_count_after = subscribers.len() + 1,
            "Registering event subscriber"
        );
        subscribers.push(tx);
        gauge!(METRIC_BUS_SUBSCRIBERS).set(subscribers.len() as f64);
    }

    /// Remove a subscriber by channel identity. No-op when absent.
    pub fn unregister(&self, tx: &Sender<String>) {
        let mut subscribers = mutex_lock(&self.subscribers, SOURCE, "unregister");
        let before = subscribers.len();
        subscribers.retain(|candidate| !candidate.same_channel(tx));
        if subscribers.len() != before {
            info!(
                subscriber_count_before = before,
                subscriber_count_after = subscribers.len(),
                "Unregistered event subscriber"
            );
        }
        gauge!(METRIC_BUS_SUBSCRIBERS).set(subscribers.len() as f64);
    }

    /// Publish a change key to every registered subscriber.
    ///
    /// The lock covers only the registry sweep; each dispatch is an
    /// independent `try_send`, so a slow subscriber loses its own payloads
    /// without affecting anyone else. Closed subscribers are pruned.
    pub fn publish(&self, key: &str) {
        let mut subscribers = mutex_lock(&self.subscribers, SOURCE, "publish");
        debug!(
            key,
            subscriber_count = subscribers.len(),
            "Publishing change event"
        );

        let mut closed = false;
        for tx in subscribers.iter() {
            match tx.try_send(key.to_string()) {
                Ok(()) => {}
                Err(TrySendError::Full(_)) => {
                    self.dropped.fetch_add(1, Ordering::Relaxed);
                    counter!(METRIC_EVENTS_DROPPED).increment(1);
                    warn!(key, "Dropped change event for slow subscriber");
                }
                Err(TrySendError::Closed(_)) => closed = true,
            }
        }
        if closed {
            subscribers.retain(|tx| !tx.is_closed());
            gauge!(METRIC_BUS_SUBSCRIBERS).set(subscribers.len() as f64);
        }

        counter!(METRIC_EVENTS_PUBLISHED).increment(1);
    }

    /// Create, register, and hand back a subscription that unregisters
    /// itself when dropped.
    pub fn subscribe(self: &Arc<Self>, depth: NonZeroUsize) -> Subscription {
        let (tx, rx) = mpsc::channel(depth.get());
        self.register(tx.clone());
        Subscription {
            bus: Arc::clone(self),
            tx,
            rx,
        }
    }

    /// Total payloads dropped on full subscriber queues since start.
    pub fn dropped_events(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    pub fn subscriber_count(&self) -> usize {
        mutex_lock(&self.subscribers, SOURCE, "subscriber_count").len()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

/// A live subscriber's receiving end. Dropping it unregisters the queue.
pub struct Subscription {
    bus: Arc<EventBus>,
    tx: Sender<String>,
    rx: Receiver<String>,
}

impl Subscription {
    /// Receive the next change key; `None` once the subscription is closed.
    pub async fn recv(&mut self) -> Option<String> {
        self.rx.recv().await
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.bus.unregister(&self.tx);
    }
}
