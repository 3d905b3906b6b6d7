//! Resolver capability
//!
//! The embedding application receives the change feed through a
//! [`Resolver`]. Calls are made inline on the session worker, one at a time,
//! in delivery order: a slow resolver stalls the watch loop.

use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
#[cfg(test)]
use mockall::automock;
use tracing::info;

/// Origin of a notification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// Key created or updated, from the watch channel
    Put,
    /// Key deleted, from the watch channel
    Delete,
    /// Key present during a full snapshot
    Snapshot,
}

impl fmt::Display for EventKind {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        let s = match self {
            EventKind::Put => "put",
            EventKind::Delete => "delete",
            EventKind::Snapshot => "snapshot",
        };
        f.write_str(s)
    }
}

/// A single store mutation or snapshot entry, scoped to the session's namespace
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    pub kind: EventKind,
    /// Diagnostic rendering of the raw key/value as received from the store
    pub raw: String,
    /// Namespace as configured, not the wrapped prefix
    pub namespace: String,
    /// Key with the scoped prefix removed
    pub key: Bytes,
    pub value: Bytes,
    pub timestamp: i64,
    /// Per-key version
    pub version: i64,
    /// Store revision of the mutation
    pub revision: i64,
}

impl ChangeEvent {
    pub fn key_str(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.key)
    }

    pub fn value_str(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.value)
    }
}

/// Receiver of namespace-scoped notifications
#[cfg_attr(test, automock)]
pub trait Resolver: Send + Sync + 'static {
    fn on_put(
        &self,
        event: &ChangeEvent,
    );

    fn on_delete(
        &self,
        event: &ChangeEvent,
    );

    /// Called once per key for the initial snapshot and every periodic resync
    fn on_snapshot_entry(
        &self,
        entry: &ChangeEvent,
    );
}

impl<R: Resolver + ?Sized> Resolver for Arc<R> {
    fn on_put(
        &self,
        event: &ChangeEvent,
    ) {
        (**self).on_put(event)
    }

    fn on_delete(
        &self,
        event: &ChangeEvent,
    ) {
        (**self).on_delete(event)
    }

    fn on_snapshot_entry(
        &self,
        entry: &ChangeEvent,
    ) {
        (**self).on_snapshot_entry(entry)
    }
}

/// Default resolver, logs every notification
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingResolver;

impl LoggingResolver {
    fn log(
        &self,
        event: &ChangeEvent,
    ) {
        info!(
            kind = %event.kind,
            namespace = %event.namespace,
            key = %event.key_str(),
            value = %event.value_str(),
            timestamp = event.timestamp,
            version = event.version,
            "resolver {}",
            event.raw
        );
    }
}

impl Resolver for LoggingResolver {
    fn on_put(
        &self,
        event: &ChangeEvent,
    ) {
        self.log(event);
    }

    fn on_delete(
        &self,
        event: &ChangeEvent,
    ) {
        self.log(event);
    }

    fn on_snapshot_entry(
        &self,
        entry: &ChangeEvent,
    ) {
        self.log(entry);
    }
}
