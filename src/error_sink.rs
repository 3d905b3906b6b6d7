//! Error reporting capability
//!
//! Runtime failures of a session (snapshot fetches, dropped watch channels,
//! store close) are never returned to the caller. They are handed to the
//! session's [`ErrorSink`], which decides whether to log, alert or abort.

use std::backtrace::Backtrace;

use tracing::error;

use crate::Error;

/// Fire-and-forget receiver of session errors.
///
/// Any `Fn(&Error) + Send + Sync` closure is an `ErrorSink`.
pub trait ErrorSink: Send + Sync + 'static {
    fn report(
        &self,
        err: &Error,
    );
}

impl<F> ErrorSink for F
where
    F: Fn(&Error) + Send + Sync + 'static,
{
    fn report(
        &self,
        err: &Error,
    ) {
        self(err)
    }
}

/// Default sink: writes the error and a stack trace to stderr
#[derive(Debug, Clone, Copy, Default)]
pub struct StderrErrorSink;

impl ErrorSink for StderrErrorSink {
    fn report(
        &self,
        err: &Error,
    ) {
        error!(store = err.is_store_error(), "nswatch watcher error: {}", err);
        eprintln!("nswatch watcher error:{} \n{}", err, Backtrace::force_capture());
    }
}
