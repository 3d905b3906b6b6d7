use std::sync::Arc;
use std::time::Duration;

use super::WatchContext;
use super::WatchSession;
use crate::Error;
use crate::ErrorSink;
use crate::KvStore;
use crate::LoggingResolver;
use crate::Resolver;
use crate::RetryPolicy;
use crate::StderrErrorSink;
use crate::WatcherConfig;
use crate::Result;

pub struct WatchSessionBuilder {
    client: Option<Arc<dyn KvStore>>,
    config: WatcherConfig,
    resolver: Arc<dyn Resolver>,
    error_sink: Arc<dyn ErrorSink>,
}

impl Default for WatchSessionBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl WatchSessionBuilder {
    /// Create a new builder with default config, the logging resolver and
    /// the stderr error sink
    pub fn new() -> Self {
        Self {
            client: None,
            config: WatcherConfig::default(),
            resolver: Arc::new(LoggingResolver),
            error_sink: Arc::new(StderrErrorSink),
        }
    }

    /// Store client handle (required). The session closes it on shutdown.
    pub fn client<S: KvStore>(
        mut self,
        client: Arc<S>,
    ) -> Self {
        self.client = Some(client);
        self
    }

    /// Same as [`client`](WatchSessionBuilder::client) for an already
    /// type-erased handle
    pub fn shared_client(
        mut self,
        client: Arc<dyn KvStore>,
    ) -> Self {
        self.client = Some(client);
        self
    }

    /// Namespace to watch, wrapped into `/namespace/` once at build time
    pub fn namespace(
        mut self,
        namespace: impl Into<String>,
    ) -> Self {
        self.config.namespace = namespace.into();
        self
    }

    /// Set resync interval (default: 10 minutes)
    ///
    /// Rounded up to whole milliseconds, so only a zero `ttl` is rejected at
    /// build time.
    pub fn ttl(
        mut self,
        ttl: Duration,
    ) -> Self {
        let partial = u128::from(ttl.subsec_nanos() % 1_000_000 != 0);
        self.config.resync_interval_ms = u64::try_from(ttl.as_millis() + partial).unwrap_or(u64::MAX);
        self
    }

    /// Set resolver (default: [`LoggingResolver`])
    pub fn resolver(
        mut self,
        resolver: impl Resolver,
    ) -> Self {
        self.resolver = Arc::new(resolver);
        self
    }

    /// Set error sink (default: [`StderrErrorSink`])
    pub fn error_sink(
        mut self,
        sink: impl ErrorSink,
    ) -> Self {
        self.error_sink = Arc::new(sink);
        self
    }

    /// Same as [`error_sink`](WatchSessionBuilder::error_sink) for a sink
    /// shared with other sessions
    pub fn shared_error_sink(
        mut self,
        sink: Arc<dyn ErrorSink>,
    ) -> Self {
        self.error_sink = sink;
        self
    }

    /// Set reconnect policy (default: 3s fixed backoff, unlimited retries)
    pub fn retry_policy(
        mut self,
        retry: RetryPolicy,
    ) -> Self {
        self.config.retry = retry;
        self
    }

    /// Completely replaces namespace, ttl and retry policy
    ///
    /// # Warning: Configuration Override
    /// This will discard all previous settings configured through
    /// [`namespace`](WatchSessionBuilder::namespace),
    /// [`ttl`](WatchSessionBuilder::ttl) or
    /// [`retry_policy`](WatchSessionBuilder::retry_policy).
    ///
    /// # Example
    /// ```ignore
    /// let config = WatcherConfig::load(None)?;
    /// let session = WatchSession::builder()
    ///     .client(store)
    ///     .set_config(config)
    ///     .build()?;
    /// ```
    pub fn set_config(
        mut self,
        config: WatcherConfig,
    ) -> Self {
        self.config = config;
        self
    }

    /// Build the session with current configuration
    ///
    /// # Errors
    /// - [`Error::MissingClient`] if no store client was supplied
    /// - [`Error::Config`] if the configuration does not validate
    ///
    /// Either error is also reported to the error sink.
    pub fn build(self) -> Result<WatchSession> {
        let Some(client) = self.client else {
            let err = Error::MissingClient;
            self.error_sink.report(&err);
            return Err(err);
        };

        let config = match self.config.validate() {
            Ok(config) => config,
            Err(err) => {
                self.error_sink.report(&err);
                return Err(err);
            }
        };

        let ctx = WatchContext::new(
            client,
            config.namespace,
            self.resolver,
            self.error_sink,
            config.retry,
        );
        Ok(WatchSession::new(ctx, Duration::from_millis(config.resync_interval_ms)))
    }
}
