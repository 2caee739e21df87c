//! The closed set of resource kinds floe mirrors.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A mirrored resource kind.
///
/// The enumeration is closed: every kind floe can store, list, or watch is a
/// variant here. Each kind carries a stable storage tag; changing a tag
/// invalidates all cached entries of that kind, so tags are append-only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    // Cluster-scoped
    Namespace,
    Node,
    PersistentVolume,
    StorageClass,
    ClusterRole,

    // Namespace-scoped
    Pod,
    Deployment,
    StatefulSet,
    DaemonSet,
    ReplicaSet,
    Job,
    CronJob,
    Service,
    Ingress,
    ConfigMap,
    Secret,
    PersistentVolumeClaim,
    ServiceAccount,
}

/// Error raised when a kind string is not in the closed enumeration.
#[derive(Debug, Clone, Error)]
#[error("unsupported resource kind `{0}`")]
pub struct ParseKindError(pub String);

impl ResourceKind {
    /// All supported kinds, cluster-scoped first.
    pub const ALL: [ResourceKind; 18] = [
        ResourceKind::Namespace,
        ResourceKind::Node,
        ResourceKind::PersistentVolume,
        ResourceKind::StorageClass,
        ResourceKind::ClusterRole,
        ResourceKind::Pod,
        ResourceKind::Deployment,
        ResourceKind::StatefulSet,
        ResourceKind::DaemonSet,
        ResourceKind::ReplicaSet,
        ResourceKind::Job,
        ResourceKind::CronJob,
        ResourceKind::Service,
        ResourceKind::Ingress,
        ResourceKind::ConfigMap,
        ResourceKind::Secret,
        ResourceKind::PersistentVolumeClaim,
        ResourceKind::ServiceAccount,
    ];

    /// Lowercase canonical name, used in URLs and logs.
    pub fn name(self) -> &'static str {
        match self {
            ResourceKind::Namespace => "namespace",
            ResourceKind::Node => "node",
            ResourceKind::PersistentVolume => "persistentvolume",
            ResourceKind::StorageClass => "storageclass",
            ResourceKind::ClusterRole => "clusterrole",
            ResourceKind::Pod => "pod",
            ResourceKind::Deployment => "deployment",
            ResourceKind::StatefulSet => "statefulset",
            ResourceKind::DaemonSet => "daemonset",
            ResourceKind::ReplicaSet => "replicaset",
            ResourceKind::Job => "job",
            ResourceKind::CronJob => "cronjob",
            ResourceKind::Service => "service",
            ResourceKind::Ingress => "ingress",
            ResourceKind::ConfigMap => "configmap",
            ResourceKind::Secret => "secret",
            ResourceKind::PersistentVolumeClaim => "persistentvolumeclaim",
            ResourceKind::ServiceAccount => "serviceaccount",
        }
    }

    /// Stable storage-key tag. Distinct per kind, fixed forever.
    pub fn tag(self) -> &'static str {
        match self {
            ResourceKind::Namespace => "namespace",
            ResourceKind::Node => "node",
            ResourceKind::PersistentVolume => "pv",
            ResourceKind::StorageClass => "sc",
            ResourceKind::ClusterRole => "clusterrole",
            ResourceKind::Pod => "pd",
            ResourceKind::Deployment => "deploy",
            ResourceKind::StatefulSet => "st",
            ResourceKind::DaemonSet => "ds",
            ResourceKind::ReplicaSet => "rs",
            ResourceKind::Job => "job",
            ResourceKind::CronJob => "cronjob",
            ResourceKind::Service => "svc",
            ResourceKind::Ingress => "ing",
            ResourceKind::ConfigMap => "cm",
            ResourceKind::Secret => "secret",
            ResourceKind::PersistentVolumeClaim => "pvc",
            ResourceKind::ServiceAccount => "sa",
        }
    }

    /// Whether point lookups of this kind require a namespace.
    pub fn is_namespaced(self) -> bool {
        !matches!(
            self,
            ResourceKind::Namespace
                | ResourceKind::Node
                | ResourceKind::PersistentVolume
                | ResourceKind::StorageClass
                | ResourceKind::ClusterRole
        )
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ResourceKind {
    type Err = ParseKindError;

    /// Accepts the lowercase canonical name or the API object's PascalCase
    /// `kind` field (`pod` and `Pod` both resolve to [`ResourceKind::Pod`]).
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let lowered = value.to_ascii_lowercase();
        ResourceKind::ALL
            .into_iter()
            .find(|kind| kind.name() == lowered)
            .ok_or_else(|| ParseKindError(value.to_string()))
    }
}
