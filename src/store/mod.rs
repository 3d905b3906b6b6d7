//! Store client abstraction
//!
//! The session consumes a coordination store through the [`KvStore`] trait:
//! a prefix snapshot, a live change stream and a close. Any etcd-like client
//! can be plugged in; [`MemKvStore`] is the in-process implementation used by
//! tests and the demo binary.

mod mem;
pub use mem::*;


use std::fmt;
use std::pin::Pin;

use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;
#[cfg(test)]
use mockall::automock;

use crate::Result;

/// Live stream of watch batches. The end of the stream means the store
/// closed the channel.
pub type WatchStream = Pin<Box<dyn Stream<Item = WatchResponse> + Send>>;

/// A key with its value and revision metadata, as stored
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyValue {
    /// Full key, including the scoped prefix
    pub key: Bytes,
    pub value: Bytes,
    /// Store revision at which the key was created
    pub create_revision: i64,
    /// Store revision of the last modification
    pub mod_revision: i64,
    /// Per-key modification counter, reset when the key is deleted
    pub version: i64,
    /// Modification time in milliseconds, 0 when the store does not stamp
    pub timestamp: i64,
}

impl fmt::Display for KeyValue {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(
            f,
            "key:{:?} create_revision:{} mod_revision:{} version:{} value:{:?}",
            String::from_utf8_lossy(&self.key),
            self.create_revision,
            self.mod_revision,
            self.version,
            String::from_utf8_lossy(&self.value),
        )
    }
}

/// Type of a watch notification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchEventType {
    /// Key was inserted or updated
    Put,
    /// Key was deleted
    Delete,
}

/// One mutation reported by a watch channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchEvent {
    pub event_type: WatchEventType,
    /// Current key/value; events without one are skipped by the session
    pub kv: Option<KeyValue>,
    /// Key/value before the mutation, present when requested with `with_prev_kv`
    pub prev_kv: Option<KeyValue>,
}

/// One batch delivered by a watch channel
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WatchResponse {
    /// Store revision observed when the batch was produced
    pub header_revision: i64,
    pub events: Vec<WatchEvent>,
    /// The store cancelled this watch
    pub canceled: bool,
    /// Error reported by the store, if any
    pub error: Option<String>,
}

impl WatchResponse {
    pub fn from_events(
        header_revision: i64,
        events: Vec<WatchEvent>,
    ) -> Self {
        Self {
            header_revision,
            events,
            canceled: false,
            error: None,
        }
    }

    /// Error batch, as sent by a store that cancels the watch
    pub fn failure(reason: impl Into<String>) -> Self {
        Self {
            canceled: true,
            error: Some(reason.into()),
            ..Default::default()
        }
    }

    /// Whether this batch signals an error rather than carrying events
    pub fn is_failure(&self) -> bool {
        self.canceled || self.error.is_some()
    }

    pub fn failure_reason(&self) -> String {
        match &self.error {
            Some(e) => e.clone(),
            None if self.canceled => "watch canceled".to_string(),
            None => "no error".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GetOptions {
    /// Match every key starting with the given bytes instead of the exact key
    pub with_prefix: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WatchOptions {
    /// Watch every key starting with the given bytes instead of the exact key
    pub with_prefix: bool,
    /// Attach the previous key/value to each event
    pub with_prev_kv: bool,
    /// Replay mutations from this revision on; `None` starts from the
    /// store's current state
    pub start_revision: Option<i64>,
}

/// Coordination store client consumed by a watch session.
///
/// The handle is shared: the session holds an `Arc` and calls
/// [`close`](KvStore::close) when it shuts down.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait KvStore: Send + Sync + 'static {
    /// Fetch the current key/values, in key order
    ///
    /// # Errors
    /// - [`Error::StoreClosed`](crate::Error::StoreClosed) once the client is closed
    /// - [`Error::Store`](crate::Error::Store) for any transport or server failure
    async fn get(
        &self,
        key: &[u8],
        opts: GetOptions,
    ) -> Result<Vec<KeyValue>>;

    /// Open a watch channel.
    ///
    /// Failures are delivered inside the stream, as an error batch or as the
    /// end of the stream, never as a return value.
    async fn watch(
        &self,
        key: &[u8],
        opts: WatchOptions,
    ) -> WatchStream;

    /// Release the client
    async fn close(&self) -> Result<()>;
}
