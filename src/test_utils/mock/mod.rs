//! Mocked store client for isolating the watch session control loop.
//!
//! [`MockStoreBuilder`] configures a [mockall] generated `MockKvStore` with:
//! - a fixed snapshot (or a failing one) for every `get`
//! - a queue of scripted watch streams, one per `watch` call, falling back
//!   to a stream that never yields once the queue is drained
//! - a recorded list of the `WatchOptions` of every `watch` call
//!
//! [mockall]: https://docs.rs/mockall/latest/mockall/

mod mock_builder;

pub use mock_builder::*;
