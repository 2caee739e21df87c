//! Canonical storage-key scheme.
//!
//! Every cached entry lives under a key derived from its identity:
//!
//! - cluster-scoped kinds: `<tag>/<name>`
//! - namespace-scoped kinds: `ns/<namespace>/<tag>/<name>`
//!
//! An empty name yields the prefix used for listing and counting. The tag is
//! a mandatory path segment, so no kind's keys can prefix another kind's and
//! two distinct identities never collide.

use thiserror::Error;

use crate::domain::ResourceKind;

/// Errors from key construction. Deterministic and caller-input-driven;
/// never retried.
#[derive(Debug, Clone, Error)]
pub enum KeyError {
    #[error("namespaced kind `{kind}` requires a namespace (name: `{name}`)")]
    MissingNamespace { kind: ResourceKind, name: String },
}

/// Build the storage key for `(kind, namespace, name)`.
///
/// Passing an empty `name` produces the list/count prefix for the kind (and
/// namespace, when scoped). Namespaced kinds always require a namespace:
/// listings are namespace-restricted, and the all-namespaces enumeration of
/// a namespaced kind is unsupported by design.
pub fn resource_key(kind: ResourceKind, namespace: &str, name: &str) -> Result<String, KeyError> {
    if !kind.is_namespaced() {
        return Ok(format!("{}/{}", kind.tag(), name));
    }

    if namespace.is_empty() {
        return Err(KeyError::MissingNamespace {
            kind,
            name: name.to_string(),
        });
    }

    Ok(format!("ns/{}/{}/{}", namespace, kind.tag(), name))
}

/// The list/count prefix for a kind, shorthand for an empty-name key.
pub fn prefix_key(kind: ResourceKind, namespace: &str) -> Result<String, KeyError> {
    resource_key(kind, namespace, "")
}
