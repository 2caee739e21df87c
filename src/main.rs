use std::{process, sync::Arc, time::Duration};

use floe::{
    config,
    domain::Resource,
    domain::resources::{
        ClusterRole, ConfigMap, CronJob, DaemonSet, Deployment, Ingress, Job, Namespace, Node,
        PersistentVolume, PersistentVolumeClaim, Pod, ReplicaSet, Secret, Service, ServiceAccount,
        StatefulSet, StorageClass,
    },
    error::AppError,
    infra::{
        error::InfraError,
        feed::{FeedRouter, run_feed},
        http::{AppState, build_router},
        telemetry,
    },
    mirror::{
        AdapterHandle, EventBus, KindRegistry, LruMirrorStore, MirrorStore, ResourceAdapter,
    },
};
use tokio::task::JoinHandle;
use tracing::{Dispatch, Level, dispatcher, error, info};
use tracing_subscriber::fmt as tracing_fmt;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    if dispatcher::has_been_set() {
        error!(error = %error, "application error");
        return;
    }

    let subscriber = tracing_fmt().with_max_level(Level::ERROR).finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()?;

    let command = cli_args
        .command
        .unwrap_or(config::Command::Serve(Box::<config::ServeArgs>::default()));

    telemetry::init(&settings.logging)?;

    match command {
        config::Command::Serve(_) => run_serve(settings).await,
    }
}

async fn run_serve(settings: config::Settings) -> Result<(), AppError> {
    let store: Arc<dyn MirrorStore> =
        Arc::new(LruMirrorStore::new(settings.mirror.store_capacity));
    let bus = Arc::new(EventBus::new());
    let registry = KindRegistry::with_defaults();

    let mut feed_router = FeedRouter::new();
    let watchers = spawn_adapters(&mut feed_router, &store, &bus)?;
    let feed_task = spawn_feed(&settings, feed_router).await?;

    let state = AppState {
        store: store.clone(),
        bus,
        registry,
        subscriber_queue_depth: settings.mirror.subscriber_queue_depth,
    };
    let router = build_router(state);

    let listener = tokio::net::TcpListener::bind(settings.server.addr)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;
    info!(addr = %settings.server.addr, "Floe mirror listening");

    let result = axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|err| AppError::unexpected(format!("server error: {err}")));

    shutdown(watchers, feed_task, store, settings.server.graceful_shutdown).await;

    result
}

struct Watchers {
    handles: Vec<(&'static str, AdapterHandle)>,
    tasks: Vec<(&'static str, JoinHandle<()>)>,
}

fn spawn_adapters(
    router: &mut FeedRouter,
    store: &Arc<dyn MirrorStore>,
    bus: &Arc<EventBus>,
) -> Result<Watchers, AppError> {
    let mut watchers = Watchers {
        handles: Vec::new(),
        tasks: Vec::new(),
    };

    spawn_adapter::<Namespace>(router, store, bus, &mut watchers)?;
    spawn_adapter::<Node>(router, store, bus, &mut watchers)?;
    spawn_adapter::<PersistentVolume>(router, store, bus, &mut watchers)?;
    spawn_adapter::<StorageClass>(router, store, bus, &mut watchers)?;
    spawn_adapter::<ClusterRole>(router, store, bus, &mut watchers)?;
    spawn_adapter::<Pod>(router, store, bus, &mut watchers)?;
    spawn_adapter::<Deployment>(router, store, bus, &mut watchers)?;
    spawn_adapter::<StatefulSet>(router, store, bus, &mut watchers)?;
    spawn_adapter::<DaemonSet>(router, store, bus, &mut watchers)?;
    spawn_adapter::<ReplicaSet>(router, store, bus, &mut watchers)?;
    spawn_adapter::<Job>(router, store, bus, &mut watchers)?;
    spawn_adapter::<CronJob>(router, store, bus, &mut watchers)?;
    spawn_adapter::<Service>(router, store, bus, &mut watchers)?;
    spawn_adapter::<Ingress>(router, store, bus, &mut watchers)?;
    spawn_adapter::<ConfigMap>(router, store, bus, &mut watchers)?;
    spawn_adapter::<Secret>(router, store, bus, &mut watchers)?;
    spawn_adapter::<PersistentVolumeClaim>(router, store, bus, &mut watchers)?;
    spawn_adapter::<ServiceAccount>(router, store, bus, &mut watchers)?;

    Ok(watchers)
}

// Wiring failure here is fatal: the process must not claim readiness with a
// kind unwatched.
fn spawn_adapter<T: Resource>(
    router: &mut FeedRouter,
    store: &Arc<dyn MirrorStore>,
    bus: &Arc<EventBus>,
    watchers: &mut Watchers,
) -> Result<(), AppError> {
    let events = router.register::<T>()?;
    let (adapter, handle) = ResourceAdapter::new(store.clone(), bus.clone(), events);
    watchers.handles.push((T::KIND.name(), handle));
    watchers
        .tasks
        .push((T::KIND.name(), tokio::spawn(adapter.run())));
    Ok(())
}

async fn spawn_feed(
    settings: &config::Settings,
    router: FeedRouter,
) -> Result<JoinHandle<()>, AppError> {
    let task = match settings.feed.path.as_ref() {
        Some(path) => {
            let file = tokio::fs::File::open(path).await.map_err(|err| {
                InfraError::feed(format!("unable to open watch feed {}: {err}", path.display()))
            })?;
            info!(path = %path.display(), "Consuming watch feed from file");
            tokio::spawn(consume_feed(file, router))
        }
        None => {
            info!("Consuming watch feed from stdin");
            tokio::spawn(consume_feed(tokio::io::stdin(), router))
        }
    };
    Ok(task)
}

async fn consume_feed<R>(reader: R, router: FeedRouter)
where
    R: tokio::io::AsyncRead + Unpin,
{
    // End of feed leaves the mirror serving last-known state; a read error
    // does the same, with the cause in the logs.
    if let Err(err) = run_feed(reader, router).await {
        error!(error = %err, "Watch feed terminated");
    }
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(error = %err, "Unable to listen for shutdown signal");
        return;
    }
    info!("Shutdown signal received");
}

/// Best-effort ordered teardown: stop the feed, stop every adapter, then
/// close the store. Failures are collected and reported without preventing
/// the remaining components from shutting down.
async fn shutdown(
    watchers: Watchers,
    feed_task: JoinHandle<()>,
    store: Arc<dyn MirrorStore>,
    graceful_shutdown: Duration,
) {
    feed_task.abort();

    for (_, handle) in &watchers.handles {
        handle.stop();
    }

    let mut failures: Vec<String> = Vec::new();
    for (kind, task) in watchers.tasks {
        match tokio::time::timeout(graceful_shutdown, task).await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => failures.push(format!("{kind}: {err}")),
            Err(_) => failures.push(format!("{kind}: did not stop within {graceful_shutdown:?}")),
        }
    }

    if failures.is_empty() {
        info!("All resource adapters stopped");
    } else {
        error!(failures = ?failures, "Some resource adapters failed to stop cleanly");
    }

    store.close();
}
