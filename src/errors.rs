//! Watch Session Error Hierarchy
//!
//! Defines the error types surfaced by a watch session, categorized by the
//! stage that produced them. Apart from construction and configuration
//! loading, none of these are returned to the caller: they are delivered to
//! the session's [`ErrorSink`](crate::ErrorSink).

use std::time::Duration;

use config::ConfigError;

#[doc(hidden)]
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Configuration source could not be read or deserialized
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Session built without a store client
    #[error("client is empty")]
    MissingClient,

    /// Full resync over the scoped prefix failed
    #[error("Snapshot fetch under {prefix} failed: {source}")]
    Snapshot {
        prefix: String,
        #[source]
        source: Box<Error>,
    },

    /// Watch channel reported an error or was closed by the store
    #[error("{reason}, watch chan closed, retry again {backoff:?} later")]
    WatchChannel { reason: String, backoff: Duration },

    /// Reconnect ceiling reached, live events are suspended until close
    #[error("Watch reconnect abandoned after {0} attempts")]
    RetriesExhausted(usize),

    /// Operation attempted on a store client that was already closed
    #[error("Store client is closed")]
    StoreClosed,

    /// Store-client failure with context
    #[error("Store error: {0}")]
    Store(String),

    /// Unrecoverable failures, e.g. a panicked worker
    #[error("Fatal error: {0}")]
    Fatal(String),
}

impl Error {
    /// Whether the error was produced by the store client rather than by the
    /// session itself
    pub fn is_store_error(&self) -> bool {
        match self {
            Error::StoreClosed | Error::Store(_) => true,
            Error::Snapshot { source, .. } => source.is_store_error(),
            _ => false,
        }
    }
}
