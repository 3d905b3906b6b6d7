use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use tokio::time::interval_at;
use tokio::time::Instant;
use tokio::time::Interval;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use tracing::info;
use tracing::warn;

use super::WatchContext;
use crate::metrics::WATCH_RETRIES_METRIC;
use crate::Error;
use crate::WatchOptions;
use crate::WatchResponse;
use crate::WatchStream;

/// Control loop states.
///
/// ```text
/// Connecting -> Watching <-> Retrying
///      \            |           /
///       +------> Closed <------+
/// ```
pub(crate) enum SessionState {
    /// Open a fresh watch channel
    Connecting,
    /// Multiplex watch batches, resync ticks and shutdown
    Watching(WatchStream),
    /// Watch channel lost, back off before reconnecting
    Retrying,
    /// Terminal
    Closed,
}

impl std::fmt::Debug for SessionState {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        let name = match self {
            SessionState::Connecting => "Connecting",
            SessionState::Watching(_) => "Watching",
            SessionState::Retrying => "Retrying",
            SessionState::Closed => "Closed",
        };
        f.write_str(name)
    }
}

/// The single background task of a session
pub(crate) struct SessionWorker {
    ctx: Arc<WatchContext>,
    resync_interval: Duration,
    shutdown: CancellationToken,
    closed: Arc<AtomicBool>,
    /// Highest revision delivered so far, 0 before the first batch
    last_revision: i64,
    /// Consecutive reconnects since the last healthy batch
    retries: usize,
}

impl SessionWorker {
    pub(crate) fn new(
        ctx: Arc<WatchContext>,
        resync_interval: Duration,
        shutdown: CancellationToken,
        closed: Arc<AtomicBool>,
    ) -> Self {
        Self {
            ctx,
            resync_interval,
            shutdown,
            closed,
            last_revision: 0,
            retries: 0,
        }
    }

    pub(crate) async fn run(mut self) {
        let mut resync = self.resync_timer();
        let mut state = SessionState::Connecting;

        loop {
            debug!(?state, "watch session transition");
            state = match state {
                SessionState::Connecting => self.connect().await,
                SessionState::Watching(stream) => self.watch(stream, &mut resync).await,
                SessionState::Retrying => self.backoff().await,
                SessionState::Closed => break,
            };
        }

        self.shutdown_client().await;
        drop(resync);
        info!("watch session worker exited");
    }

    /// Ticks every `resync_interval`, the first tick one interval after start.
    /// Missed ticks are delayed, not bursted.
    fn resync_timer(&self) -> Interval {
        let mut interval = interval_at(Instant::now() + self.resync_interval, self.resync_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        interval
    }

    async fn connect(&mut self) -> SessionState {
        let opts = WatchOptions {
            with_prefix: true,
            with_prev_kv: true,
            start_revision: self.resume_revision(),
        };

        tokio::select! {
            biased;
            _ = self.shutdown.cancelled() => SessionState::Closed,
            stream = self.ctx.client.watch(self.ctx.prefix.as_bytes(), opts) => {
                debug!("watch channel opened on {} from {:?}", self.ctx.prefix, opts.start_revision);
                SessionState::Watching(stream)
            }
        }
    }

    /// Services exactly one wakeup source
    async fn watch(
        &mut self,
        mut stream: WatchStream,
        resync: &mut Interval,
    ) -> SessionState {
        tokio::select! {
            biased;
            // P0: shutdown received
            _ = self.shutdown.cancelled() => {
                info!("watch session context is done");
                SessionState::Closed
            }

            batch = stream.next() => self.on_batch(batch, stream),

            // Consistency backstop
            _ = resync.tick() => {
                self.ctx.resync().await;
                SessionState::Watching(stream)
            }
        }
    }

    fn on_batch(
        &mut self,
        batch: Option<WatchResponse>,
        stream: WatchStream,
    ) -> SessionState {
        let reason = match batch {
            Some(resp) if !resp.is_failure() => {
                let revision = self.ctx.dispatch_batch(&resp);
                self.last_revision = self.last_revision.max(revision);
                self.retries = 0;
                return SessionState::Watching(stream);
            }
            Some(resp) => resp.failure_reason(),
            None => "watch stream ended".to_string(),
        };
        drop(stream);

        if self.closed.load(Ordering::Acquire) {
            debug!("watch channel lost after explicit close: {}", reason);
            return SessionState::Closed;
        }

        self.ctx.report(&Error::WatchChannel {
            reason,
            backoff: self.ctx.retry.backoff(),
        });
        SessionState::Retrying
    }

    async fn backoff(&mut self) -> SessionState {
        let policy = self.ctx.retry;
        self.retries += 1;

        if !policy.is_unlimited() && self.retries > policy.max_retries {
            self.ctx.report(&Error::RetriesExhausted(policy.max_retries));
            warn!("watch reconnect abandoned, serving resync ticks only");
            return SessionState::Watching(Box::pin(futures::stream::pending::<WatchResponse>()));
        }

        tokio::select! {
            biased;
            _ = self.shutdown.cancelled() => SessionState::Closed,
            _ = tokio::time::sleep(policy.backoff()) => {
                WATCH_RETRIES_METRIC.with_label_values(&[&self.ctx.namespace]).inc();
                info!("watch session start retry ... (attempt {})", self.retries);
                SessionState::Connecting
            }
        }
    }

    fn resume_revision(&self) -> Option<i64> {
        if self.ctx.retry.resume_from_last_revision && self.last_revision > 0 {
            Some(self.last_revision + 1)
        } else {
            None
        }
    }

    async fn shutdown_client(&self) {
        if let Err(e) = self.ctx.client.close().await {
            self.ctx.report(&e);
        }
    }
}
