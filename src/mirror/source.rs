//! Interface boundary with the change-notification source.
//!
//! The upstream collaborator (watch feed, informer, test fixture) delivers
//! per-object, already-ordered notifications over a channel. Floe does not
//! implement watch, resync, or reconnect logic; it only reacts.

use tokio::sync::mpsc;

use crate::domain::Resource;

/// A single change notification for one object.
///
/// Updates carry only the new state; the previous state is never consumed,
/// so the source is free to drop it.
#[derive(Debug, Clone)]
pub enum WatchEvent<T: Resource> {
    Added(T),
    Modified(T),
    Deleted(T),
}

impl<T: Resource> WatchEvent<T> {
    /// The object carried by the notification.
    pub fn object(&self) -> &T {
        match self {
            WatchEvent::Added(object)
            | WatchEvent::Modified(object)
            | WatchEvent::Deleted(object) => object,
        }
    }
}

/// Sending half handed to the notification source for one kind.
pub type WatchSender<T> = mpsc::UnboundedSender<WatchEvent<T>>;

/// Receiving half consumed by that kind's [`super::adapter::ResourceAdapter`].
pub type WatchReceiver<T> = mpsc::UnboundedReceiver<WatchEvent<T>>;

/// A fresh notification channel for one kind.
pub fn watch_channel<T: Resource>() -> (WatchSender<T>, WatchReceiver<T>) {
    mpsc::unbounded_channel()
}
