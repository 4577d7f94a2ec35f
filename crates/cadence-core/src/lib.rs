//! Cadence Core - primitives shared by the frame scheduler
//!
//! Provides the building blocks the timing and engine crates are made of:
//! - `CadenceError` / `Result`: the workspace error type
//! - `SpinLock`: a lightweight lock for few-instruction critical sections
//! - `InstancePool`: a bounded free list for reusable instances
//! - `DeferredList`: a list that buffers structural changes until an
//!   explicit apply step
//! - `CancellationSource` / `CancellationToken`: cooperative cancellation

mod cancel;
mod deferred;
mod error;
mod pool;
mod spin;

pub use cancel::{CancellationSource, CancellationToken};
pub use deferred::DeferredList;
pub use error::{CadenceError, Result};
pub use pool::InstancePool;
pub use spin::{SpinLock, SpinLockGuard};
