use std::sync::Arc;

use bytes::Bytes;
use tracing::debug;

use crate::metrics::DISPATCHED_EVENTS_METRIC;
use crate::metrics::REPORTED_ERRORS_METRIC;
use crate::metrics::RESYNC_ROUNDS_METRIC;
use crate::namespace;
use crate::ChangeEvent;
use crate::Error;
use crate::ErrorSink;
use crate::EventKind;
use crate::GetOptions;
use crate::KeyValue;
use crate::KvStore;
use crate::Resolver;
use crate::RetryPolicy;
use crate::WatchEventType;
use crate::WatchResponse;

/// State shared by the session handle and its worker.
///
/// Immutable after build: the prefix is wrapped exactly once, here.
pub(crate) struct WatchContext {
    pub(crate) client: Arc<dyn KvStore>,
    pub(crate) namespace: String,
    pub(crate) prefix: String,
    pub(crate) resolver: Arc<dyn Resolver>,
    pub(crate) error_sink: Arc<dyn ErrorSink>,
    pub(crate) retry: RetryPolicy,
}

impl WatchContext {
    pub(crate) fn new(
        client: Arc<dyn KvStore>,
        namespace: String,
        resolver: Arc<dyn Resolver>,
        error_sink: Arc<dyn ErrorSink>,
        retry: RetryPolicy,
    ) -> Self {
        let prefix = namespace::wrap(&namespace);
        Self {
            client,
            namespace,
            prefix,
            resolver,
            error_sink,
            retry,
        }
    }

    pub(crate) fn report(
        &self,
        err: &Error,
    ) {
        REPORTED_ERRORS_METRIC.with_label_values(&[&self.namespace]).inc();
        self.error_sink.report(err);
    }

    /// Full fetch under the prefix, each key dispatched as a snapshot entry
    /// in store order. A failed fetch is reported and dispatches nothing.
    ///
    /// Returns the number of entries dispatched.
    pub(crate) async fn resync(&self) -> usize {
        RESYNC_ROUNDS_METRIC.with_label_values(&[&self.namespace]).inc();

        let kvs = match self
            .client
            .get(self.prefix.as_bytes(), GetOptions { with_prefix: true })
            .await
        {
            Ok(kvs) => kvs,
            Err(e) => {
                self.report(&Error::Snapshot {
                    prefix: self.prefix.clone(),
                    source: Box::new(e),
                });
                return 0;
            }
        };

        for kv in &kvs {
            let entry = self.change_event(EventKind::Snapshot, kv);
            self.resolver.on_snapshot_entry(&entry);
            DISPATCHED_EVENTS_METRIC.with_label_values(&["snapshot"]).inc();
        }
        debug!("resync under {} dispatched {} entries", self.prefix, kvs.len());
        kvs.len()
    }

    /// Dispatch one healthy watch batch, in batch order.
    ///
    /// Events without a current key/value are skipped. Returns the highest
    /// revision seen in the batch.
    pub(crate) fn dispatch_batch(
        &self,
        resp: &WatchResponse,
    ) -> i64 {
        let mut last_revision = resp.header_revision;

        for event in &resp.events {
            let Some(kv) = event.kv.as_ref() else {
                continue;
            };

            match event.event_type {
                WatchEventType::Put => {
                    let change = self.change_event(EventKind::Put, kv);
                    self.resolver.on_put(&change);
                }
                WatchEventType::Delete => {
                    let change = self.change_event(EventKind::Delete, kv);
                    self.resolver.on_delete(&change);
                }
            }
            let kind = match event.event_type {
                WatchEventType::Put => "put",
                WatchEventType::Delete => "delete",
            };
            debug!("dispatched {} of {:?} at revision {}", kind, String::from_utf8_lossy(&kv.key), kv.mod_revision);
            DISPATCHED_EVENTS_METRIC.with_label_values(&[kind]).inc();
            last_revision = last_revision.max(kv.mod_revision);
        }

        last_revision
    }

    fn change_event(
        &self,
        kind: EventKind,
        kv: &KeyValue,
    ) -> ChangeEvent {
        ChangeEvent {
            kind,
            raw: kv.to_string(),
            namespace: self.namespace.clone(),
            key: Bytes::copy_from_slice(namespace::unwrap(&self.prefix, &kv.key)),
            value: kv.value.clone(),
            timestamp: kv.timestamp,
            version: kv.version,
            revision: kv.mod_revision,
        }
    }
}
