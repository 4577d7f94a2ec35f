//! Pooled wait sources and the awaitable handle over them
//!
//! A `WaitSource` is the shared state behind one suspension: the timing point
//! queue holds one side, the `FrameAwaitable` handle the other. Sources are
//! recycled through a thread-local pool; each recycle bumps a version counter
//! so stale handles and stale queue entries left over from a previous rental
//! are rejected instead of touching the new waiter.

use std::cell::{Cell, RefCell};
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll};

use cadence_core::{CadenceError, CancellationToken, InstancePool, Result};

const DEFAULT_POOL_CAPACITY: usize = 256;

thread_local! {
    static SOURCE_POOL: InstancePool<Rc<WaitSource>> =
        InstancePool::new(DEFAULT_POOL_CAPACITY);
}

/// Set how many recycled wait sources the current thread keeps around
pub fn set_pool_capacity(capacity: usize) {
    SOURCE_POOL.with(|pool| pool.set_max(capacity));
}

#[cfg(test)]
fn pool_len() -> usize {
    SOURCE_POOL.with(|pool| pool.len())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SourceState {
    Free,
    Pending,
    Completed,
    Canceled,
}

/// Outcome of a wait as observed through the handle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AwaitableStatus {
    Pending,
    Completed,
    Canceled,
    /// The source was recycled out from under this handle
    Stale,
}

/// Shared state of one suspension.
///
/// Single-threaded by construction; the pool hands each instance to one
/// screen's frame loop at a time.
pub struct WaitSource {
    state: Cell<SourceState>,
    version: Cell<u32>,
    continuation: RefCell<Option<Box<dyn FnOnce()>>>,
    cancel: RefCell<Option<CancellationToken>>,
}

impl WaitSource {
    fn new() -> Self {
        Self {
            state: Cell::new(SourceState::Free),
            version: Cell::new(0),
            continuation: RefCell::new(None),
            cancel: RefCell::new(None),
        }
    }

    /// Rent a source from the pool (or allocate) and arm it for one wait
    fn rent(cancel: CancellationToken) -> (Rc<WaitSource>, u32) {
        let source = SOURCE_POOL
            .with(|pool| pool.try_rent_fast())
            .unwrap_or_else(|| Rc::new(WaitSource::new()));
        debug_assert_eq!(source.state.get(), SourceState::Free);
        source.state.set(SourceState::Pending);
        *source.cancel.borrow_mut() = Some(cancel);
        let token = source.version.get();
        (source, token)
    }

    /// Reset the source and hand it back to the pool.
    ///
    /// The version bump is what invalidates every outstanding handle and
    /// queue entry pointing at the previous rental.
    fn recycle(this: &Rc<Self>) {
        this.state.set(SourceState::Free);
        this.version.set(this.version.get().wrapping_add(1));
        *this.continuation.borrow_mut() = None;
        *this.cancel.borrow_mut() = None;
        SOURCE_POOL.with(|pool| pool.return_instance(Rc::clone(this)));
    }

    fn matches(&self, token: u32) -> bool {
        self.version.get() == token
    }

    /// Whether the wait tied to `token` is still pending
    pub fn is_pending(&self, token: u32) -> bool {
        self.matches(token) && self.state.get() == SourceState::Pending
    }

    /// Whether the cancellation token armed with this rental fired
    pub fn cancel_requested(&self, token: u32) -> bool {
        self.matches(token)
            && self
                .cancel
                .borrow()
                .as_ref()
                .is_some_and(|cancel| cancel.is_canceled())
    }

    /// Complete the wait, running the registered continuation if any.
    ///
    /// A stale or already-settled token is ignored; queue drains may race
    /// with cancellation and recycling.
    pub fn complete(&self, token: u32) {
        self.settle(token, SourceState::Completed);
    }

    /// Cancel the wait, running the registered continuation if any
    pub fn abort(&self, token: u32) {
        self.settle(token, SourceState::Canceled);
    }

    fn settle(&self, token: u32, state: SourceState) {
        if !self.is_pending(token) {
            return;
        }
        self.state.set(state);
        if let Some(continuation) = self.continuation.borrow_mut().take() {
            continuation();
        }
    }
}

/// Handle for one frame-loop wait.
///
/// Usable either as a `Future` or through the manual `status` / `register` /
/// `try_result` surface. The result can be consumed once; consuming it
/// recycles the underlying source, and any further use of the handle reports
/// `AwaitTwice`.
pub struct FrameAwaitable {
    source: Rc<WaitSource>,
    token: u32,
}

impl FrameAwaitable {
    pub(crate) fn rent(cancel: CancellationToken) -> (FrameAwaitable, Rc<WaitSource>, u32) {
        let (source, token) = WaitSource::rent(cancel);
        let handle = FrameAwaitable {
            source: Rc::clone(&source),
            token,
        };
        (handle, source, token)
    }

    /// An awaitable that is already completed
    pub fn completed() -> FrameAwaitable {
        let (handle, source, token) = FrameAwaitable::rent(CancellationToken::never());
        source.complete(token);
        handle
    }

    /// An awaitable that is already canceled
    pub fn canceled() -> FrameAwaitable {
        let (handle, source, token) = FrameAwaitable::rent(CancellationToken::never());
        source.abort(token);
        handle
    }

    pub fn status(&self) -> AwaitableStatus {
        if !self.source.matches(self.token) {
            return AwaitableStatus::Stale;
        }
        match self.source.state.get() {
            SourceState::Pending => AwaitableStatus::Pending,
            SourceState::Completed => AwaitableStatus::Completed,
            SourceState::Canceled => AwaitableStatus::Canceled,
            SourceState::Free => AwaitableStatus::Stale,
        }
    }

    /// Register a continuation to run when the wait settles.
    ///
    /// Runs immediately if the wait already settled. Replaces any previously
    /// registered continuation.
    pub fn register(&self, continuation: impl FnOnce() + 'static) {
        match self.status() {
            AwaitableStatus::Pending => {
                *self.source.continuation.borrow_mut() = Some(Box::new(continuation));
            }
            _ => continuation(),
        }
    }

    /// Take the result if the wait has settled.
    ///
    /// `Ok(())` on completion, `Canceled` on cancellation; either consumes
    /// the handle's claim and recycles the source. `NotCompleted` while still
    /// pending, `AwaitTwice` once consumed.
    pub fn try_result(&self) -> Result<()> {
        match self.status() {
            AwaitableStatus::Pending => Err(CadenceError::NotCompleted),
            AwaitableStatus::Completed => {
                WaitSource::recycle(&self.source);
                Ok(())
            }
            AwaitableStatus::Canceled => {
                WaitSource::recycle(&self.source);
                Err(CadenceError::Canceled)
            }
            AwaitableStatus::Stale => Err(CadenceError::AwaitTwice),
        }
    }
}

impl Future for FrameAwaitable {
    type Output = Result<()>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match self.status() {
            AwaitableStatus::Pending => {
                if self.source.cancel_requested(self.token) {
                    self.source.abort(self.token);
                    return Poll::Ready(self.try_result());
                }
                let waker = cx.waker().clone();
                self.register(move || waker.wake());
                Poll::Pending
            }
            AwaitableStatus::Completed | AwaitableStatus::Canceled => {
                Poll::Ready(self.try_result())
            }
            AwaitableStatus::Stale => Poll::Ready(Err(CadenceError::AwaitTwice)),
        }
    }
}

impl Drop for FrameAwaitable {
    fn drop(&mut self) {
        // An unconsumed settled result still recycles; a pending source is
        // left for its queue entry to settle and drop normally.
        match self.status() {
            AwaitableStatus::Completed | AwaitableStatus::Canceled => {
                WaitSource::recycle(&self.source);
            }
            AwaitableStatus::Pending | AwaitableStatus::Stale => {}
        }
    }
}
