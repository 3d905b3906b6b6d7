//! the test_utils folder here will share utils or test components between
//! session, store and resolver unit tests
mod common;
mod mock;

pub use common::*;
pub use mock::*;
