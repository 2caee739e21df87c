//! Floe mirror core: the watch-cache-broadcast pipeline.
//!
//! Change notifications flow through one [`ResourceAdapter`] per kind into
//! the shared bounded [`MirrorStore`], and every mutation's storage key is
//! fanned out on the [`EventBus`] to live subscribers. Request handlers read
//! through the typed [`access`] functions or, kind-string-generically,
//! through the [`KindRegistry`].
//!
//! The store is purely in-memory: state is rebuilt from a full re-list on
//! every start, and an evicted entry simply appears absent until the next
//! notification re-populates it.

pub mod access;
mod adapter;
mod events;
pub mod keys;
mod lock;
mod registry;
mod source;
mod store;

pub use adapter::{AdapterHandle, ResourceAdapter};
pub use events::{EventBus, Subscription};
pub use keys::{KeyError, prefix_key, resource_key};
pub use registry::KindRegistry;
pub use source::{WatchEvent, WatchReceiver, WatchSender, watch_channel};
pub use store::{LruMirrorStore, MirrorStore, StoreError, StoreStats};
