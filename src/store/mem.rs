use std::collections::BTreeMap;
use std::collections::VecDeque;

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tracing::debug;
use tracing::trace;

use super::GetOptions;
use super::KeyValue;
use super::KvStore;
use super::WatchEvent;
use super::WatchEventType;
use super::WatchOptions;
use super::WatchResponse;
use super::WatchStream;
use crate::constants::MEM_STORE_HISTORY_LIMIT;
use crate::time::get_now_as_millis;
use crate::Error;
use crate::Result;

/// In-memory revisioned key-value store
///
/// Behaves like a single etcd member: every mutation bumps a global
/// revision, keys carry create/mod revisions and a per-key version, and
/// watchers receive one batch per mutation. Also exposes fault injection
/// to simulate dropped watch channels.
#[derive(Debug, Default)]
pub struct MemKvStore {
    inner: Mutex<MemState>,
}

#[derive(Debug, Default)]
struct MemState {
    data: BTreeMap<Bytes, KeyValue>,
    revision: i64,
    /// Recent mutations kept for `start_revision` replay
    history: VecDeque<WatchEvent>,
    watchers: Vec<MemWatcher>,
    closed: bool,
}

#[derive(Debug)]
struct MemWatcher {
    key: Bytes,
    opts: WatchOptions,
    tx: mpsc::UnboundedSender<WatchResponse>,
}

impl MemWatcher {
    fn matches(
        &self,
        key: &[u8],
    ) -> bool {
        matches_key(&self.key, self.opts.with_prefix, key)
    }

    /// Returns false once the receiving side is gone
    fn send(
        &self,
        revision: i64,
        event: &WatchEvent,
    ) -> bool {
        let mut event = event.clone();
        if !self.opts.with_prev_kv {
            event.prev_kv = None;
        }
        self.tx.send(WatchResponse::from_events(revision, vec![event])).is_ok()
    }
}

fn matches_key(
    watched: &[u8],
    with_prefix: bool,
    key: &[u8],
) -> bool {
    if with_prefix {
        key.starts_with(watched)
    } else {
        key == watched
    }
}

impl MemKvStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or update a key, returns the new store revision
    pub fn put(
        &self,
        key: impl AsRef<[u8]>,
        value: impl AsRef<[u8]>,
    ) -> i64 {
        let mut state = self.inner.lock();
        state.revision += 1;
        let revision = state.revision;
        let key = Bytes::copy_from_slice(key.as_ref());

        let prev = state.data.get(&key).cloned();
        let kv = KeyValue {
            key: key.clone(),
            value: Bytes::copy_from_slice(value.as_ref()),
            create_revision: prev.as_ref().map(|p| p.create_revision).unwrap_or(revision),
            mod_revision: revision,
            version: prev.as_ref().map(|p| p.version).unwrap_or(0) + 1,
            timestamp: get_now_as_millis(),
        };
        state.data.insert(key, kv.clone());
        trace!("put revision={} {}", revision, kv);

        state.publish(WatchEvent {
            event_type: WatchEventType::Put,
            kv: Some(kv),
            prev_kv: prev,
        });
        revision
    }

    /// Delete a key, returns the new store revision or `None` if the key
    /// did not exist
    pub fn delete(
        &self,
        key: impl AsRef<[u8]>,
    ) -> Option<i64> {
        let mut state = self.inner.lock();
        let prev = state.data.remove(key.as_ref())?;
        state.revision += 1;
        let revision = state.revision;

        let tombstone = KeyValue {
            key: prev.key.clone(),
            mod_revision: revision,
            timestamp: get_now_as_millis(),
            ..Default::default()
        };
        state.publish(WatchEvent {
            event_type: WatchEventType::Delete,
            kv: Some(tombstone),
            prev_kv: Some(prev),
        });
        Some(revision)
    }

    /// Current store revision
    pub fn revision(&self) -> i64 {
        self.inner.lock().revision
    }

    pub fn is_closed(&self) -> bool {
        self.inner.lock().closed
    }

    /// Number of watch channels still open, dropped receivers are pruned
    pub fn watcher_count(&self) -> usize {
        let mut state = self.inner.lock();
        state.watchers.retain(|w| !w.tx.is_closed());
        state.watchers.len()
    }

    /// Drop every watch channel, ending the streams as a lost connection would
    pub fn disconnect_watchers(&self) {
        let mut state = self.inner.lock();
        debug!("disconnecting {} watchers", state.watchers.len());
        state.watchers.clear();
    }

    /// Send an error batch to every watcher and cancel their watches
    pub fn inject_watch_error(
        &self,
        reason: &str,
    ) {
        let mut state = self.inner.lock();
        for w in state.watchers.drain(..) {
            let _ = w.tx.send(WatchResponse::failure(reason));
        }
    }
}

impl MemState {
    fn publish(
        &mut self,
        event: WatchEvent,
    ) {
        let revision = self.revision;
        let key = event.kv.as_ref().map(|kv| kv.key.clone()).unwrap_or_default();

        self.watchers
            .retain(|w| !w.tx.is_closed() && (!w.matches(&key) || w.send(revision, &event)));

        self.history.push_back(event);
        while self.history.len() > MEM_STORE_HISTORY_LIMIT {
            self.history.pop_front();
        }
    }
}

#[async_trait]
impl KvStore for MemKvStore {
    async fn get(
        &self,
        key: &[u8],
        opts: GetOptions,
    ) -> Result<Vec<KeyValue>> {
        let state = self.inner.lock();
        if state.closed {
            return Err(Error::StoreClosed);
        }

        if !opts.with_prefix {
            return Ok(state.data.get(key).cloned().into_iter().collect());
        }

        Ok(state
            .data
            .range(Bytes::copy_from_slice(key)..)
            .take_while(|(k, _)| k.starts_with(key))
            .map(|(_, kv)| kv.clone())
            .collect())
    }

    async fn watch(
        &self,
        key: &[u8],
        opts: WatchOptions,
    ) -> WatchStream {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut state = self.inner.lock();

        if state.closed {
            let _ = tx.send(WatchResponse::failure("store client is closed"));
            return Box::pin(UnboundedReceiverStream::new(rx));
        }

        let watcher = MemWatcher {
            key: Bytes::copy_from_slice(key),
            opts,
            tx,
        };

        if let Some(start) = opts.start_revision {
            let replay = state.history.iter().filter(|e| {
                e.kv.as_ref()
                    .map(|kv| kv.mod_revision >= start && watcher.matches(&kv.key))
                    .unwrap_or(false)
            });
            for event in replay {
                let revision = event.kv.as_ref().map(|kv| kv.mod_revision).unwrap_or_default();
                watcher.send(revision, event);
            }
        }

        debug!(
            "watch opened on {:?} from revision {:?}",
            String::from_utf8_lossy(key),
            opts.start_revision
        );
        state.watchers.push(watcher);
        Box::pin(UnboundedReceiverStream::new(rx))
    }

    async fn close(&self) -> Result<()> {
        let mut state = self.inner.lock();
        state.closed = true;
        state.watchers.clear();
        Ok(())
    }
}
