//! Cadence Timing - frame phases and timing points
//!
//! A frame is a fixed sequence of phases. Each waitable phase owns a timing
//! point holding a queue of posted callbacks and suspended awaiters; when the
//! frame loop enters a phase it drains that queue. Awaitables are pooled and
//! versioned so a handle that outlives its source's recycling turns into a
//! harmless stale token instead of completing the wrong waiter.

mod phase;
mod point;
mod point_list;
mod source;

pub use phase::{CurrentPhase, FramePhase, PhaseTracker};
pub use point::{delay_frames, TimingPoint};
pub use point_list::{LayerTimingPoints, TimingPointList};
pub use source::{set_pool_capacity, AwaitableStatus, FrameAwaitable, WaitSource};
