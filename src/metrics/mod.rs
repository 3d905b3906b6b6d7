use lazy_static::lazy_static;
use prometheus::Encoder;
use prometheus::IntCounterVec;
use prometheus::Opts;
use prometheus::Registry;
use prometheus::TextEncoder;
use tracing::warn;

lazy_static! {
    pub static ref DISPATCHED_EVENTS_METRIC: IntCounterVec = IntCounterVec::new(
        Opts::new("dispatched_events", "Notifications handed to resolvers"),
        &["kind"]
    )
    .expect("metric can not be created");

    pub static ref WATCH_RETRIES_METRIC: IntCounterVec = IntCounterVec::new(
        Opts::new("watch_retries", "Watch channel reconnect attempts"),
        &["namespace"]
    )
    .expect("metric can not be created");

    pub static ref RESYNC_ROUNDS_METRIC: IntCounterVec = IntCounterVec::new(
        Opts::new("resync_rounds", "Full snapshot rounds, including the initial one"),
        &["namespace"]
    )
    .expect("metric can not be created");

    pub static ref REPORTED_ERRORS_METRIC: IntCounterVec = IntCounterVec::new(
        Opts::new("reported_errors", "Errors handed to the session error sink"),
        &["namespace"]
    )
    .expect("metric can not be created");

    pub static ref REGISTRY: Registry = {
        let registry = Registry::new_custom(Some("nswatch".to_string()), None)
            .expect("registry can not be created");
        register_custom_metrics(&registry);
        registry
    };
}

pub(crate) fn register_custom_metrics(registry: &Registry) {
    registry
        .register(Box::new(DISPATCHED_EVENTS_METRIC.clone()))
        .expect("collector can be registered");
    registry
        .register(Box::new(WATCH_RETRIES_METRIC.clone()))
        .expect("collector can be registered");
    registry
        .register(Box::new(RESYNC_ROUNDS_METRIC.clone()))
        .expect("collector can be registered");
    registry
        .register(Box::new(REPORTED_ERRORS_METRIC.clone()))
        .expect("collector can be registered");
}

/// Export session metrics in the Prometheus text format
pub fn gather_metrics() -> String {
    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&REGISTRY.gather(), &mut buffer) {
        warn!("could not encode custom metrics: {}", e);
    }
    match String::from_utf8(buffer) {
        Ok(v) => v,
        Err(e) => {
            warn!("custom metrics could not be from_utf8'd: {}", e);
            String::default()
        }
    }
}
