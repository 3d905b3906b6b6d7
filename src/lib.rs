//! # nswatch
//!
//! Resilient change-feed watcher over a namespaced key-value coordination
//! store (etcd-style).
//!
//! A [`WatchSession`] delivers, to an application supplied [`Resolver`]:
//! - a full snapshot of the namespace when started
//! - live put/delete notifications from the store's watch channel
//! - periodic full resyncs as an eventual-consistency backstop
//!
//! Dropped watch channels are reopened after a fixed backoff. Runtime
//! failures never reach the caller; they go to the session's [`ErrorSink`].

mod config;
mod constants;
mod error_sink;
mod errors;
pub mod metrics;
pub mod namespace;
mod resolver;
mod session;
mod store;
mod utils;

pub use config::*;
pub use error_sink::*;
pub use errors::*;
pub use resolver::*;
pub use session::*;
pub use store::*;
pub(crate) use utils::*;

//-----------------------------------------------------------
// Test utils

#[cfg(test)]
pub mod test_utils;
