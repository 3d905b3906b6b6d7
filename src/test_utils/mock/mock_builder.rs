use std::collections::VecDeque;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use futures::StreamExt;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;

use crate::Error;
use crate::GetOptions;
use crate::KeyValue;
use crate::MockKvStore;
use crate::WatchOptions;
use crate::WatchResponse;
use crate::WatchStream;

/// Handles kept by the test after the mock has been moved into a session
#[derive(Clone, Default)]
pub struct MockStoreProbe {
    pub watch_calls: Arc<Mutex<Vec<WatchOptions>>>,
    pub watch_prefixes: Arc<Mutex<Vec<Vec<u8>>>>,
    pub get_calls: Arc<Mutex<Vec<(Vec<u8>, GetOptions)>>>,
    pub close_calls: Arc<AtomicUsize>,
}

impl MockStoreProbe {
    pub fn watch_count(&self) -> usize {
        self.watch_calls.lock().len()
    }

    pub fn get_count(&self) -> usize {
        self.get_calls.lock().len()
    }

    pub fn close_count(&self) -> usize {
        self.close_calls.load(Ordering::SeqCst)
    }
}

pub struct MockStoreBuilder {
    snapshot: Option<Vec<KeyValue>>,
    streams: VecDeque<WatchStream>,
    close_error: Option<String>,
}

impl Default for MockStoreBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl MockStoreBuilder {
    pub fn new() -> Self {
        Self {
            snapshot: Some(Vec::new()),
            streams: VecDeque::new(),
            close_error: None,
        }
    }

    pub fn with_snapshot(
        mut self,
        kvs: Vec<KeyValue>,
    ) -> Self {
        self.snapshot = Some(kvs);
        self
    }

    /// Every `get` fails with a store error
    pub fn with_failing_snapshot(mut self) -> Self {
        self.snapshot = None;
        self
    }

    /// A watch stream that ends immediately, as a dropped connection
    pub fn with_closed_stream(mut self) -> Self {
        self.streams.push_back(Box::pin(futures::stream::empty()));
        self
    }

    /// A watch stream that yields the given batches and then ends
    pub fn with_finite_stream(
        mut self,
        batches: Vec<WatchResponse>,
    ) -> Self {
        self.streams.push_back(futures::stream::iter(batches).boxed());
        self
    }

    /// A watch stream fed by the returned sender; it ends when the sender
    /// is dropped
    pub fn with_channel_stream(
        &mut self
    ) -> mpsc::UnboundedSender<WatchResponse> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.streams.push_back(Box::pin(UnboundedReceiverStream::new(rx)));
        tx
    }

    pub fn with_close_error(
        mut self,
        reason: &str,
    ) -> Self {
        self.close_error = Some(reason.to_string());
        self
    }

    pub fn build(self) -> (MockKvStore, MockStoreProbe) {
        let probe = MockStoreProbe::default();
        let mut store = MockKvStore::new();

        let snapshot = self.snapshot;
        let get_calls = probe.get_calls.clone();
        store.expect_get().returning(move |key, opts| {
            get_calls.lock().push((key.to_vec(), opts));
            match &snapshot {
                Some(kvs) => Ok(kvs.clone()),
                None => Err(Error::Store("connection refused".to_string())),
            }
        });

        let streams = Mutex::new(self.streams);
        let watch_calls = probe.watch_calls.clone();
        let watch_prefixes = probe.watch_prefixes.clone();
        store.expect_watch().returning(move |key, opts| {
            watch_calls.lock().push(opts);
            watch_prefixes.lock().push(key.to_vec());
            streams
                .lock()
                .pop_front()
                .unwrap_or_else(|| Box::pin(futures::stream::pending::<WatchResponse>()))
        });

        let close_error = self.close_error;
        let close_calls = probe.close_calls.clone();
        store.expect_close().returning(move || {
            close_calls.fetch_add(1, Ordering::SeqCst);
            match &close_error {
                Some(reason) => Err(Error::Store(reason.clone())),
                None => Ok(()),
            }
        });

        (store, probe)
    }
}
