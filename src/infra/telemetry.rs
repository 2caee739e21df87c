use std::sync::Once;

use metrics::{Unit, describe_counter, describe_gauge};
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    EnvFilter, fmt,
    layer::{Layer, SubscriberExt},
    util::SubscriberInitExt,
};

use crate::config::{LogFormat, LoggingSettings};

use super::error::InfraError;

static METRIC_DESCRIPTIONS: Once = Once::new();

/// Install a global tracing subscriber using the provided logging settings.
pub fn init(logging: &LoggingSettings) -> Result<(), InfraError> {
    describe_metrics();

    let env_filter = EnvFilter::builder()
        .with_default_directive(logging.level.into())
        .from_env_lossy();

    let fmt_layer = match logging.format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(true)
            .with_target(true)
            .boxed(),
        LogFormat::Compact => fmt::layer().compact().with_target(true).boxed(),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(ErrorLayer::default())
        .with(fmt_layer)
        .try_init()
        .map_err(|err| {
            InfraError::telemetry(format!("failed to install tracing subscriber: {err}"))
        })
}

fn describe_metrics() {
    METRIC_DESCRIPTIONS.call_once(|| {
        describe_counter!(
            "floe_store_hit_total",
            Unit::Count,
            "Total number of mirror store hits."
        );
        describe_counter!(
            "floe_store_miss_total",
            Unit::Count,
            "Total number of mirror store misses."
        );
        describe_counter!(
            "floe_store_evict_total",
            Unit::Count,
            "Total number of mirror store evictions due to capacity."
        );
        describe_counter!(
            "floe_events_published_total",
            Unit::Count,
            "Total number of change events published on the bus."
        );
        describe_counter!(
            "floe_events_dropped_total",
            Unit::Count,
            "Total number of change events dropped on full subscriber queues."
        );
        describe_gauge!(
            "floe_bus_subscribers",
            Unit::Count,
            "Current number of registered event-bus subscribers."
        );
        describe_counter!(
            "floe_feed_lines_total",
            Unit::Count,
            "Total number of watch-feed lines consumed."
        );
        describe_counter!(
            "floe_feed_rejected_total",
            Unit::Count,
            "Total number of watch-feed lines rejected as malformed or unsupported."
        );
    });
}
