//! Best-effort reconciliation of content sets against an online source.
//!
//! [`UpdateQueue::update`] resolves every item of a [`SharedSet`] on a
//! shared, fixed-size [`ResolutionPool`](pool::ResolutionPool). Each item is
//! looked up in the local [snapshot](setsync_snapshot) first and, on a miss,
//! against the online source with exactly one request. The pool size is
//! therefore also the ceiling on concurrent online requests, no matter how
//! many sets are being updated at once.
//!
//! The snapshot itself is fetched in the background by the
//! [`bootstrap`] module the first time a queue is created without one.
//! Until it's ready, every item simply goes online.
//!
//! Nothing in here returns an error to the caller. Failures are logged, and
//! an item whose online lookup failed is left with its online id cleared.

pub mod bootstrap;
pub mod error;
pub mod pipeline;
pub mod pool;
mod queue;
mod set;

pub use crate::queue::{Completion, DEFAULT_CONCURRENCY, QueueOptions, UpdateHandle, UpdateQueue};
pub use crate::set::SharedSet;
