//! End-to-end pipeline coverage: watch feed lines in, per-kind adapters
//! mutating the bounded store, keys fanned out on the bus, reads through the
//! typed accessors.

use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Duration;

use floe::domain::Resource;
use floe::domain::resources::{Deployment, Node, Pod};
use floe::infra::feed::{FeedRouter, run_feed};
use floe::mirror::{
    AdapterHandle, EventBus, LruMirrorStore, MirrorStore, ResourceAdapter, Subscription, access,
};
use tokio::task::JoinHandle;

const RECV_TIMEOUT: Duration = Duration::from_secs(2);

struct Pipeline {
    store: Arc<dyn MirrorStore>,
    bus: Arc<EventBus>,
    router: FeedRouter,
    handles: Vec<AdapterHandle>,
    tasks: Vec<JoinHandle<()>>,
}

impl Pipeline {
    fn with_capacity(capacity: usize) -> Self {
        Self {
            store: Arc::new(LruMirrorStore::new(NonZeroUsize::new(capacity).unwrap())),
            bus: Arc::new(EventBus::new()),
            router: FeedRouter::new(),
            handles: Vec::new(),
            tasks: Vec::new(),
        }
    }

    fn new() -> Self {
        Self::with_capacity(64)
    }

    fn watch<T: Resource>(&mut self) {
        let events = self.router.register::<T>().unwrap();
        let (adapter, handle) =
            ResourceAdapter::new(self.store.clone(), self.bus.clone(), events);
        self.handles.push(handle);
        self.tasks.push(tokio::spawn(adapter.run()));
    }

    fn subscribe(&self) -> Subscription {
        self.bus.subscribe(NonZeroUsize::new(128).unwrap())
    }

    /// Route one line and wait for its publication, proving the store
    /// mutation preceding it has landed.
    async fn step(&self, sub: &mut Subscription, line: &str) -> String {
        self.router.dispatch(line).unwrap();
        tokio::time::timeout(RECV_TIMEOUT, sub.recv())
            .await
            .expect("publication within timeout")
            .expect("subscription alive")
    }

    /// Feed a whole stream and wait for the adapters to drain it.
    async fn run_to_end(self, feed: &str) -> Arc<dyn MirrorStore> {
        let Pipeline {
            store,
            router,
            tasks,
            handles: _handles,
            ..
        } = self;

        run_feed(feed.as_bytes(), router).await.unwrap();
        // Dropping the router closed the per-kind channels; the adapters
        // drain what is buffered and exit.
        for task in tasks {
            tokio::time::timeout(RECV_TIMEOUT, task)
                .await
                .expect("adapter exits after feed close")
                .unwrap();
        }
        store
    }
}

fn line(action: &str, kind: &str, namespace: &str, name: &str) -> String {
    format!(
        r#"{{"type":"{action}","object":{{"kind":"{kind}","metadata":{{"name":"{name}","namespace":"{namespace}"}}}}}}"#
    )
}

#[tokio::test]
async fn added_object_is_stored_published_and_readable() {
    let mut pipeline = Pipeline::new();
    pipeline.watch::<Pod>();
    let mut sub = pipeline.subscribe();

    let key = pipeline
        .step(&mut sub, &line("ADDED", "Pod", "default", "web-1"))
        .await;
    assert_eq!(key, "ns/default/pd/web-1");

    let pod: Pod = access::get_one(pipeline.store.as_ref(), "default", "web-1")
        .expect("pod resident after add");
    assert_eq!(pod.metadata.name, "web-1");
    assert_eq!(pod.metadata.namespace, "default");
    assert_eq!(access::count::<Pod>(pipeline.store.as_ref(), "default"), 1);
}

#[tokio::test]
async fn deleted_object_disappears_but_still_publishes() {
    let mut pipeline = Pipeline::new();
    pipeline.watch::<Pod>();
    let mut sub = pipeline.subscribe();

    pipeline
        .step(&mut sub, &line("ADDED", "Pod", "default", "web-1"))
        .await;
    let key = pipeline
        .step(&mut sub, &line("DELETED", "Pod", "default", "web-1"))
        .await;

    assert_eq!(key, "ns/default/pd/web-1");
    assert!(access::get_one::<Pod>(pipeline.store.as_ref(), "default", "web-1").is_none());
    assert_eq!(access::count::<Pod>(pipeline.store.as_ref(), "default"), 0);
}

#[tokio::test]
async fn modified_object_replaces_stored_state() {
    let mut pipeline = Pipeline::new();
    pipeline.watch::<Pod>();
    let mut sub = pipeline.subscribe();

    pipeline
        .step(&mut sub, &line("ADDED", "Pod", "default", "web-1"))
        .await;

    let modified = r#"{"type":"MODIFIED","object":{"kind":"Pod","metadata":{"name":"web-1","namespace":"default"},"status":{"phase":"Running"}}}"#;
    pipeline.step(&mut sub, modified).await;

    let pod: Pod = access::get_one(pipeline.store.as_ref(), "default", "web-1").unwrap();
    assert_eq!(pod.status.phase.as_deref(), Some("Running"));
    assert_eq!(access::count::<Pod>(pipeline.store.as_ref(), "default"), 1);
}

#[tokio::test]
async fn cluster_scoped_keys_omit_the_namespace_segment() {
    let mut pipeline = Pipeline::new();
    pipeline.watch::<Node>();
    let mut sub = pipeline.subscribe();

    let key = pipeline
        .step(&mut sub, &line("ADDED", "Node", "", "node-a"))
        .await;
    assert_eq!(key, "node/node-a");

    let node: Node =
        access::get_one(pipeline.store.as_ref(), "", "node-a").expect("node resident");
    assert_eq!(node.metadata.name, "node-a");
}

#[tokio::test]
async fn feed_stream_populates_multiple_kinds_and_namespaces() {
    let mut pipeline = Pipeline::new();
    pipeline.watch::<Pod>();
    pipeline.watch::<Node>();
    pipeline.watch::<Deployment>();

    let feed = [
        line("ADDED", "Pod", "default", "web-2"),
        line("ADDED", "Pod", "default", "web-1"),
        line("ADDED", "Pod", "other", "web-9"),
        line("ADDED", "Node", "", "node-a"),
        line("ADDED", "Deployment", "default", "api"),
        "this line is not json".to_string(),
        line("ADDED", "Gizmo", "default", "ignored"),
    ]
    .join("\n");

    let store = pipeline.run_to_end(&feed).await;

    let pods: Vec<Pod> = access::get_all(store.as_ref(), "default");
    let names: Vec<&str> = pods.iter().map(|p| p.metadata.name.as_str()).collect();
    assert_eq!(names, ["web-1", "web-2"]);

    assert_eq!(access::count::<Pod>(store.as_ref(), "other"), 1);
    assert_eq!(access::count::<Node>(store.as_ref(), ""), 1);
    assert_eq!(access::count::<Deployment>(store.as_ref(), "default"), 1);
}

#[tokio::test]
async fn eviction_at_capacity_surfaces_as_absence() {
    let mut pipeline = Pipeline::with_capacity(2);
    pipeline.watch::<Pod>();

    let feed = [
        line("ADDED", "Pod", "default", "web-1"),
        line("ADDED", "Pod", "default", "web-2"),
        line("ADDED", "Pod", "default", "web-3"),
    ]
    .join("\n");

    let store = pipeline.run_to_end(&feed).await;

    // Oldest entry was displaced; the mirror simply no longer has it.
    assert_eq!(access::count::<Pod>(store.as_ref(), "default"), 2);
    assert!(access::get_one::<Pod>(store.as_ref(), "default", "web-1").is_none());
    assert!(access::get_one::<Pod>(store.as_ref(), "default", "web-3").is_some());
    assert_eq!(store.stats().evictions, 1);
}

#[tokio::test]
async fn publications_fan_out_to_every_subscriber() {
    let mut pipeline = Pipeline::new();
    pipeline.watch::<Pod>();
    let mut first = pipeline.subscribe();
    let mut second = pipeline.subscribe();

    let key = pipeline
        .step(&mut first, &line("ADDED", "Pod", "default", "web-1"))
        .await;

    let other = tokio::time::timeout(RECV_TIMEOUT, second.recv())
        .await
        .expect("second subscriber sees the publication")
        .unwrap();
    assert_eq!(key, other);
}
