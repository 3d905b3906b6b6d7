use std::time::Duration;

use bytes::Bytes;
use parking_lot::Mutex;
use tokio::time::Instant;

use crate::ChangeEvent;
use crate::Error;
use crate::ErrorSink;
use crate::EventKind;
use crate::KeyValue;
use crate::Resolver;
use crate::WatchEvent;
use crate::WatchEventType;
use crate::WatchResponse;

pub fn kv(
    key: &str,
    value: &str,
    revision: i64,
) -> KeyValue {
    KeyValue {
        key: Bytes::copy_from_slice(key.as_bytes()),
        value: Bytes::copy_from_slice(value.as_bytes()),
        create_revision: revision,
        mod_revision: revision,
        version: 1,
        timestamp: 1_700_000_000_000 + revision,
    }
}

pub fn put_event(kv: KeyValue) -> WatchEvent {
    WatchEvent {
        event_type: WatchEventType::Put,
        kv: Some(kv),
        prev_kv: None,
    }
}

pub fn delete_event(kv: KeyValue) -> WatchEvent {
    WatchEvent {
        event_type: WatchEventType::Delete,
        kv: Some(kv),
        prev_kv: None,
    }
}

pub fn batch(events: Vec<WatchEvent>) -> WatchResponse {
    let revision = events
        .iter()
        .filter_map(|e| e.kv.as_ref().map(|kv| kv.mod_revision))
        .max()
        .unwrap_or_default();
    WatchResponse::from_events(revision, events)
}

/// Resolver that keeps every notification it receives, in order
#[derive(Debug, Default)]
pub struct RecordingResolver {
    events: Mutex<Vec<ChangeEvent>>,
}

impl RecordingResolver {
    pub fn events(&self) -> Vec<ChangeEvent> {
        self.events.lock().clone()
    }

    /// `(kind, unscoped key)` pairs in delivery order
    pub fn calls(&self) -> Vec<(EventKind, String)> {
        self.events
            .lock()
            .iter()
            .map(|e| (e.kind, e.key_str().into_owned()))
            .collect()
    }

    pub fn count(
        &self,
        kind: EventKind,
    ) -> usize {
        self.events.lock().iter().filter(|e| e.kind == kind).count()
    }

    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    fn record(
        &self,
        event: &ChangeEvent,
    ) {
        self.events.lock().push(event.clone());
    }
}

impl Resolver for RecordingResolver {
    fn on_put(
        &self,
        event: &ChangeEvent,
    ) {
        self.record(event);
    }

    fn on_delete(
        &self,
        event: &ChangeEvent,
    ) {
        self.record(event);
    }

    fn on_snapshot_entry(
        &self,
        entry: &ChangeEvent,
    ) {
        self.record(entry);
    }
}

/// Error sink that keeps every report with the (tokio) time it arrived
#[derive(Debug, Default)]
pub struct RecordingSink {
    reports: Mutex<Vec<(Instant, String)>>,
}

impl RecordingSink {
    pub fn messages(&self) -> Vec<String> {
        self.reports.lock().iter().map(|(_, m)| m.clone()).collect()
    }

    pub fn instants(&self) -> Vec<Instant> {
        self.reports.lock().iter().map(|(t, _)| *t).collect()
    }

    pub fn len(&self) -> usize {
        self.reports.lock().len()
    }
}

impl ErrorSink for RecordingSink {
    fn report(
        &self,
        err: &Error,
    ) {
        self.reports.lock().push((Instant::now(), err.to_string()));
    }
}

/// Poll `condition` every millisecond until it holds or `timeout` elapses.
/// Returns whether the condition was met.
pub async fn wait_until<F>(
    timeout: Duration,
    mut condition: F,
) -> bool
where
    F: FnMut() -> bool,
{
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(1)).await;
    }
    condition()
}
