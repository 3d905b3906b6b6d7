//! Watch session
//!
//! A [`WatchSession`] keeps a resolver in sync with every key under one
//! namespace of a coordination store:
//! - [`start`](WatchSession::start) dispatches a full snapshot, then spawns
//!   the single background worker
//! - the worker forwards live watch batches, re-runs the snapshot on every
//!   resync tick and reconnects after a dropped watch channel
//! - [`close`](WatchSession::close) cancels the worker and waits for it
//!
//! # Basic Usage
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use nswatch::{LoggingResolver, MemKvStore, WatchSession};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() {
//!     let store = Arc::new(MemKvStore::new());
//!     store.put("/services/api", "10.0.0.1:8080");
//!
//!     let mut session = WatchSession::builder()
//!         .client(store.clone())
//!         .namespace("services")
//!         .ttl(Duration::from_secs(60))
//!         .resolver(LoggingResolver)
//!         .build()
//!         .unwrap();
//!
//!     session.start().await;
//!     store.put("/services/web", "10.0.0.2:8080");
//!     session.close().await;
//! }
//! ```

mod builder;
mod context;
mod worker;

pub use builder::*;
pub(crate) use context::*;
pub(crate) use worker::*;


use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use tracing::info;
use tracing::info_span;
use tracing::warn;
use tracing::Instrument;

use crate::constants::SESSION_ID_LEN;
use crate::Error;

/// Namespace-scoped change feed over a coordination store
pub struct WatchSession {
    id: String,
    ctx: Arc<WatchContext>,
    resync_interval: Duration,
    /// Cancellation signal observed by the worker
    shutdown: CancellationToken,
    /// Set before cancelling so a concurrently failing watch channel is not
    /// reconnected
    closed: Arc<AtomicBool>,
    /// Completion barrier
    handle: Option<JoinHandle<()>>,
    started: bool,
}

impl WatchSession {
    /// Create a configured session builder
    pub fn builder() -> WatchSessionBuilder {
        WatchSessionBuilder::new()
    }

    pub(crate) fn new(
        ctx: WatchContext,
        resync_interval: Duration,
    ) -> Self {
        Self {
            id: nanoid::nanoid!(SESSION_ID_LEN),
            ctx: Arc::new(ctx),
            resync_interval,
            shutdown: CancellationToken::new(),
            closed: Arc::new(AtomicBool::new(false)),
            handle: None,
            started: false,
        }
    }

    /// Dispatch the current state of the namespace, then start watching.
    ///
    /// The snapshot runs on the caller's task and has been fully delivered
    /// to the resolver when this returns. A failed snapshot is reported to
    /// the error sink and the worker is spawned regardless.
    ///
    /// Must be called from within a tokio runtime. Calling it twice, or after
    /// [`close`](WatchSession::close), does nothing.
    pub async fn start(&mut self) {
        if self.started || self.shutdown.is_cancelled() {
            warn!(session = %self.id, "watch session already started or closed, ignoring start");
            return;
        }
        self.started = true;

        let dispatched = self.ctx.resync().await;
        info!(
            session = %self.id,
            "watch session started on {} with {} keys",
            self.ctx.prefix,
            dispatched
        );

        let worker = SessionWorker::new(
            self.ctx.clone(),
            self.resync_interval,
            self.shutdown.clone(),
            self.closed.clone(),
        );
        let span = info_span!("watch_session", id = %self.id, namespace = %self.ctx.namespace);
        self.handle = Some(tokio::spawn(worker.run().instrument(span)));
    }

    /// Stop the worker and wait until it has closed the store client and
    /// exited. There is no timeout: a hanging store close blocks here.
    pub async fn close(&mut self) {
        self.closed.store(true, Ordering::Release);
        self.shutdown.cancel();

        let Some(handle) = self.handle.take() else {
            debug!(session = %self.id, "no running worker to join");
            return;
        };
        if let Err(e) = handle.await {
            self.ctx
                .report(&Error::Fatal(format!("watch session worker failed: {}", e)));
        }
        info!(session = %self.id, "watch session closed");
    }

    /// Whether the background worker is alive
    pub fn is_running(&self) -> bool {
        self.handle.as_ref().map(|h| !h.is_finished()).unwrap_or(false)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn namespace(&self) -> &str {
        &self.ctx.namespace
    }

    /// Wrapped namespace, e.g. `/ns/`
    pub fn prefix(&self) -> &str {
        &self.ctx.prefix
    }

    pub fn resync_interval(&self) -> Duration {
        self.resync_interval
    }
}

impl Drop for WatchSession {
    fn drop(&mut self) {
        self.closed.store(true, Ordering::Release);
        self.shutdown.cancel();
    }
}

impl std::fmt::Debug for WatchSession {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("WatchSession")
            .field("id", &self.id)
            .field("prefix", &self.ctx.prefix)
            .field("resync_interval", &self.resync_interval)
            .field("running", &self.is_running())
            .finish()
    }
}
