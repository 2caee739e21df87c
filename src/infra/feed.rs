//! Watch-feed collaborator: JSON-lines change notifications.
//!
//! The binary consumes watch events shaped like
//! `kubectl get <kind> --watch --output-watch-events -o json` output, one
//! JSON document per line:
//!
//! ```json
//! {"type":"ADDED","object":{"kind":"Pod","metadata":{"name":"web-1",...}}}
//! ```
//!
//! The feed owns watch/resync/reconnect concerns; floe only reacts. Each
//! line is resolved to a kind via the object's `kind` field and injected
//! into that kind's adapter channel. Malformed or unsupported lines are
//! logged and skipped; only failure to read the feed itself is fatal.

use std::collections::HashMap;

use metrics::counter;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tracing::{debug, info, warn};

use crate::domain::{ParseKindError, Resource, ResourceKind};
use crate::mirror::{WatchEvent, WatchReceiver, watch_channel};

use super::error::InfraError;

const METRIC_FEED_LINES: &str = "floe_feed_lines_total";
const METRIC_FEED_REJECTED: &str = "floe_feed_rejected_total";

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("line is not a watch event: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("watch event object has no `kind` field")]
    MissingKind,
    #[error(transparent)]
    UnsupportedKind(#[from] ParseKindError),
    #[error("kind `{kind}` is not routed")]
    UnroutedKind { kind: ResourceKind },
    #[error("kind `{kind}` is already routed")]
    DuplicateKind { kind: ResourceKind },
    #[error("unable to decode `{kind}` object: {source}")]
    Decode {
        kind: ResourceKind,
        source: serde_json::Error,
    },
    #[error("adapter for `{kind}` is gone")]
    ChannelClosed { kind: ResourceKind },
}

/// Wire-level action of a watch event line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
enum FeedAction {
    Added,
    Modified,
    Deleted,
    // Emitted by the watch API for progress/fault reporting; not a
    // resource change, so both are ignored.
    Bookmark,
    Error,
}

#[derive(Debug, Deserialize)]
struct FeedRecord {
    r#type: FeedAction,
    object: Value,
}

type InjectFn = Box<dyn Fn(FeedAction, Value) -> Result<(), FeedError> + Send + Sync>;

/// Demultiplexes feed lines into per-kind adapter channels.
pub struct FeedRouter {
    routes: HashMap<ResourceKind, InjectFn>,
}

impl FeedRouter {
    pub fn new() -> Self {
        Self {
            routes: HashMap::new(),
        }
    }

    /// Route `T`'s notifications to a fresh channel and return the receiving
    /// half for that kind's adapter. Each kind may be routed once.
    pub fn register<T: Resource>(&mut self) -> Result<WatchReceiver<T>, FeedError> {
        if self.routes.contains_key(&T::KIND) {
            return Err(FeedError::DuplicateKind { kind: T::KIND });
        }

        let (tx, rx) = watch_channel::<T>();
        self.routes.insert(
            T::KIND,
            Box::new(move |action, object| {
                let object: T = serde_json::from_value(object).map_err(|source| {
                    FeedError::Decode {
                        kind: T::KIND,
                        source,
                    }
                })?;
                let event = match action {
                    FeedAction::Added => WatchEvent::Added(object),
                    FeedAction::Modified => WatchEvent::Modified(object),
                    FeedAction::Deleted => WatchEvent::Deleted(object),
                    FeedAction::Bookmark | FeedAction::Error => return Ok(()),
                };
                tx.send(event)
                    .map_err(|_| FeedError::ChannelClosed { kind: T::KIND })
            }),
        );
        Ok(rx)
    }

    /// Parse and route one feed line.
    pub fn dispatch(&self, line: &str) -> Result<(), FeedError> {
        let record: FeedRecord = serde_json::from_str(line)?;

        let kind: ResourceKind = record
            .object
            .get("kind")
            .and_then(Value::as_str)
            .ok_or(FeedError::MissingKind)?
            .parse()?;

        let inject = self
            .routes
            .get(&kind)
            .ok_or(FeedError::UnroutedKind { kind })?;
        inject(record.r#type, record.object)
    }
}

impl Default for FeedRouter {
    fn default() -> Self {
        Self::new()
    }
}

/// Consume the feed until end of stream, routing every line.
///
/// Per-line failures are logged and skipped so one malformed notification
/// never stops the remaining stream; a read error is surfaced to the caller.
pub async fn run_feed<R>(reader: R, router: FeedRouter) -> Result<(), InfraError>
where
    R: AsyncRead + Unpin,
{
    let mut lines = BufReader::new(reader).lines();
    let mut consumed: u64 = 0;

    while let Some(line) = lines
        .next_line()
        .await
        .map_err(|err| InfraError::feed(format!("unable to read watch feed: {err}")))?
    {
        if line.trim().is_empty() {
            continue;
        }

        consumed += 1;
        counter!(METRIC_FEED_LINES).increment(1);

        if let Err(err) = router.dispatch(&line) {
            counter!(METRIC_FEED_REJECTED).increment(1);
            match err {
                FeedError::UnsupportedKind(_) | FeedError::UnroutedKind { .. } => {
                    debug!(error = %err, "Skipping feed line for unwatched kind");
                }
                _ => warn!(error = %err, "Skipping malformed feed line"),
            }
        }
    }

    info!(lines = consumed, "Watch feed reached end of stream");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::resources::{Node, Pod};

    fn line(action: &str, kind: &str, namespace: &str, name: &str) -> String {
        format!(
            r#"{{"type":"{action}","object":{{"kind":"{kind}","metadata":{{"name":"{name}","namespace":"{namespace}"}}}}}}"#
        )
    }

    #[tokio::test]
    async fn routes_lines_to_the_registered_kind() {
        let mut router = FeedRouter::new();
        let mut pods = router.register::<Pod>().unwrap();
        let mut nodes = router.register::<Node>().unwrap();

        router
            .dispatch(&line("ADDED", "Pod", "default", "web-1"))
            .unwrap();
        router.dispatch(&line("DELETED", "Node", "", "node-a")).unwrap();

        match pods.recv().await.unwrap() {
            WatchEvent::Added(pod) => assert_eq!(pod.metadata.name, "web-1"),
            other => panic!("unexpected event {other:?}"),
        }
        match nodes.recv().await.unwrap() {
            WatchEvent::Deleted(node) => assert_eq!(node.metadata.name, "node-a"),
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[test]
    fn duplicate_registration_is_rejected() {
        let mut router = FeedRouter::new();
        let _rx = router.register::<Pod>().unwrap();
        assert!(matches!(
            router.register::<Pod>(),
            Err(FeedError::DuplicateKind { .. })
        ));
    }

    #[test]
    fn unsupported_and_unrouted_kinds_are_distinct_errors() {
        let mut router = FeedRouter::new();
        let _rx = router.register::<Pod>().unwrap();

        assert!(matches!(
            router.dispatch(&line("ADDED", "Gizmo", "default", "x")),
            Err(FeedError::UnsupportedKind(_))
        ));
        assert!(matches!(
            router.dispatch(&line("ADDED", "Node", "", "node-a")),
            Err(FeedError::UnroutedKind { .. })
        ));
    }

    #[test]
    fn bookmark_lines_are_ignored() {
        let mut router = FeedRouter::new();
        let mut pods = router.register::<Pod>().unwrap();

        router
            .dispatch(&line("BOOKMARK", "Pod", "default", ""))
            .unwrap();
        assert!(pods.try_recv().is_err());
    }

    #[tokio::test]
    async fn run_feed_skips_bad_lines_and_finishes() {
        let mut router = FeedRouter::new();
        let mut pods = router.register::<Pod>().unwrap();

        let feed = format!(
            "not json\n{}\n\n{}\n",
            line("ADDED", "Pod", "default", "web-1"),
            line("ADDED", "Gizmo", "default", "x"),
        );

        run_feed(feed.as_bytes(), router).await.unwrap();

        assert!(matches!(
            pods.recv().await,
            Some(WatchEvent::Added(pod)) if pod.metadata.name == "web-1"
        ));
    }
}
