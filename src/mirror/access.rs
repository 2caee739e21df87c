//! Typed read operations over the mirror store.
//!
//! Callers never see low-level errors: a bad key, missing entry, or decode
//! failure surfaces as `None`, an empty or partial list, or zero, with the
//! diagnostic detail in logs only. `get_one` deliberately does not
//! distinguish "not found" from "decode error".

use tracing::error;

use crate::domain::Resource;

use super::keys::{prefix_key, resource_key};
use super::store::MirrorStore;

/// Fetch one resource by identity, or `None` on any failure.
pub fn get_one<T: Resource>(store: &dyn MirrorStore, namespace: &str, name: &str) -> Option<T> {
    let key = match resource_key(T::KIND, namespace, name) {
        Ok(key) => key,
        Err(err) => {
            error!(
                kind = %T::KIND,
                namespace,
                name,
                error = %err,
                "Unable to build resource key"
            );
            return None;
        }
    };

    let value = store.get(&key).ok()?;

    match serde_json::from_slice(&value) {
        Ok(resource) => Some(resource),
        Err(err) => {
            error!(kind = %T::KIND, key, error = %err, "Unable to decode cached resource");
            None
        }
    }
}

/// List all resources of a kind (within `namespace` for scoped kinds),
/// ordered by name ascending.
///
/// A decode failure for one entry is logged and skipped; partial results are
/// preferred over an all-or-nothing failure.
pub fn get_all<T: Resource>(store: &dyn MirrorStore, namespace: &str) -> Vec<T> {
    let prefix = match prefix_key(T::KIND, namespace) {
        Ok(prefix) => prefix,
        Err(err) => {
            error!(
                kind = %T::KIND,
                namespace,
                error = %err,
                "Unable to build listing prefix"
            );
            return Vec::new();
        }
    };

    // The scan is key-ordered and the prefix is fixed, so iteration order is
    // exactly name order.
    let entries = store.get_all(&prefix);
    let mut resources = Vec::with_capacity(entries.len());
    for (key, value) in entries {
        match serde_json::from_slice(&value) {
            Ok(resource) => resources.push(resource),
            Err(err) => {
                error!(kind = %T::KIND, key, error = %err, "Skipping undecodable cached entry");
            }
        }
    }
    resources
}

/// Count resources of a kind (within `namespace` for scoped kinds).
pub fn count<T: Resource>(store: &dyn MirrorStore, namespace: &str) -> u64 {
    let prefix = match prefix_key(T::KIND, namespace) {
        Ok(prefix) => prefix,
        Err(err) => {
            error!(
                kind = %T::KIND,
                namespace,
                error = %err,
                "Unable to build counting prefix"
            );
            return 0;
        }
    };

    store.count(&prefix) as u64
}
