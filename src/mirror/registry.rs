//! Kind registry: type-erased read dispatch.
//!
//! The HTTP surface works with kind strings; the accessor layer works with
//! concrete types. The registry bridges the two with one closure set per
//! kind, so adding a kind is a single `entry::<T>()` line in
//! [`KindRegistry::with_defaults`].

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;
use tracing::error;

use crate::domain::ResourceKind;
use crate::domain::resources::{
    ClusterRole, ConfigMap, CronJob, DaemonSet, Deployment, Ingress, Job, Namespace, Node,
    PersistentVolume, PersistentVolumeClaim, Pod, ReplicaSet, Resource, Secret, Service,
    ServiceAccount, StatefulSet, StorageClass,
};

use super::access;
use super::store::MirrorStore;

type GetFn = Box<dyn Fn(&dyn MirrorStore, &str, &str) -> Option<Value> + Send + Sync>;
type ListFn = Box<dyn Fn(&dyn MirrorStore, &str) -> Vec<Value> + Send + Sync>;
type CountFn = Box<dyn Fn(&dyn MirrorStore, &str) -> u64 + Send + Sync>;

struct KindEntry {
    get: GetFn,
    list: ListFn,
    count: CountFn,
}

/// Read dispatch table over the closed kind set.
pub struct KindRegistry {
    entries: HashMap<ResourceKind, KindEntry>,
}

impl KindRegistry {
    /// Registry covering every supported kind.
    pub fn with_defaults() -> Arc<Self> {
        let mut registry = Self {
            entries: HashMap::new(),
        };

        registry.entry::<Namespace>();
        registry.entry::<Node>();
        registry.entry::<PersistentVolume>();
        registry.entry::<StorageClass>();
        registry.entry::<ClusterRole>();
        registry.entry::<Pod>();
        registry.entry::<Deployment>();
        registry.entry::<StatefulSet>();
        registry.entry::<DaemonSet>();
        registry.entry::<ReplicaSet>();
        registry.entry::<Job>();
        registry.entry::<CronJob>();
        registry.entry::<Service>();
        registry.entry::<Ingress>();
        registry.entry::<ConfigMap>();
        registry.entry::<Secret>();
        registry.entry::<PersistentVolumeClaim>();
        registry.entry::<ServiceAccount>();

        Arc::new(registry)
    }

    fn entry<T: Resource>(&mut self) {
        self.entries.insert(
            T::KIND,
            KindEntry {
                get: Box::new(|store, namespace, name| {
                    access::get_one::<T>(store, namespace, name).and_then(to_json)
                }),
                list: Box::new(|store, namespace| {
                    access::get_all::<T>(store, namespace)
                        .into_iter()
                        .filter_map(to_json)
                        .collect()
                }),
                count: Box::new(|store, namespace| access::count::<T>(store, namespace)),
            },
        );
    }

    pub fn get(
        &self,
        store: &dyn MirrorStore,
        kind: ResourceKind,
        namespace: &str,
        name: &str,
    ) -> Option<Value> {
        let entry = self.entries.get(&kind)?;
        (entry.get)(store, namespace, name)
    }

    pub fn list(&self, store: &dyn MirrorStore, kind: ResourceKind, namespace: &str) -> Vec<Value> {
        match self.entries.get(&kind) {
            Some(entry) => (entry.list)(store, namespace),
            None => Vec::new(),
        }
    }

    pub fn count(&self, store: &dyn MirrorStore, kind: ResourceKind, namespace: &str) -> u64 {
        match self.entries.get(&kind) {
            Some(entry) => (entry.count)(store, namespace),
            None => 0,
        }
    }
}

fn to_json<T: Resource>(resource: T) -> Option<Value> {
    match serde_json::to_value(&resource) {
        Ok(value) => Some(value),
        Err(err) => {
            error!(kind = %T::KIND, error = %err, "Unable to re-encode resource");
            None
        }
    }
}
