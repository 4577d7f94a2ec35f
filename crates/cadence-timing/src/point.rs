//! Timing points: per-phase queues of posted callbacks and waiters

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use cadence_core::{CancellationToken, Result};

use crate::phase::{CurrentPhase, PhaseTracker};
use crate::source::{FrameAwaitable, WaitSource};

enum QueueItem {
    Posted(Box<dyn FnOnce()>),
    Waiter { source: Rc<WaitSource>, token: u32 },
}

/// The scheduling queue of one frame phase.
///
/// Work arrives either as a posted callback or as a suspended waiter; the
/// frame loop drains the queue when it enters the phase. Entries enqueued
/// while a drain is in progress are kept for the next drain, so a waiter that
/// re-awaits its own phase resumes next frame rather than in the same pass.
pub struct TimingPoint {
    target: CurrentPhase,
    tracker: RefCell<Option<Rc<PhaseTracker>>>,
    queue: RefCell<VecDeque<QueueItem>>,
}

impl TimingPoint {
    pub fn new(target: CurrentPhase, tracker: Rc<PhaseTracker>) -> Self {
        Self {
            target,
            tracker: RefCell::new(Some(tracker)),
            queue: RefCell::new(VecDeque::new()),
        }
    }

    /// A point not yet tied to any frame loop.
    ///
    /// Layers create their points before being attached to a screen;
    /// `attach` ties them to the screen's tracker on activation.
    pub fn detached(target: CurrentPhase) -> Self {
        Self {
            target,
            tracker: RefCell::new(None),
            queue: RefCell::new(VecDeque::new()),
        }
    }

    pub fn attach(&self, tracker: Rc<PhaseTracker>) {
        *self.tracker.borrow_mut() = Some(tracker);
    }

    pub fn target(&self) -> CurrentPhase {
        self.target
    }

    pub fn queued_len(&self) -> usize {
        self.queue.borrow().len()
    }

    /// Enqueue a callback to run at the next drain of this point
    pub fn post(&self, f: impl FnOnce() + 'static) {
        self.queue
            .borrow_mut()
            .push_back(QueueItem::Posted(Box::new(f)));
    }

    /// An awaitable that settles at the next drain of this point.
    ///
    /// The waiter is enqueued here, at creation time, so completion does not
    /// depend on when (or whether) the handle is first polled. A token that
    /// is already canceled yields an already-canceled awaitable without
    /// touching the queue.
    pub fn next(&self, cancel: CancellationToken) -> FrameAwaitable {
        if cancel.is_canceled() {
            return FrameAwaitable::canceled();
        }
        let (handle, source, token) = FrameAwaitable::rent(cancel);
        self.queue
            .borrow_mut()
            .push_back(QueueItem::Waiter { source, token });
        handle
    }

    /// Like `next`, but already completed if the frame loop has reached this
    /// point's phase in the current frame
    pub fn next_or_now(&self, cancel: CancellationToken) -> FrameAwaitable {
        let reached = self
            .tracker
            .borrow()
            .as_ref()
            .is_some_and(|tracker| tracker.current().has_reached(self.target));
        if reached {
            FrameAwaitable::completed()
        } else {
            self.next(cancel)
        }
    }

    /// Drain the entries queued before this call.
    ///
    /// Posted callbacks run, pending waiters settle (canceled ones abort).
    /// Entries added during the drain stay queued for the next one.
    pub fn do_queued_events(&self) {
        let count = self.queue.borrow().len();
        for _ in 0..count {
            let item = match self.queue.borrow_mut().pop_front() {
                Some(item) => item,
                None => break,
            };
            match item {
                QueueItem::Posted(f) => f(),
                QueueItem::Waiter { source, token } => {
                    if source.cancel_requested(token) {
                        source.abort(token);
                    } else {
                        source.complete(token);
                    }
                }
            }
        }
    }

    /// Flush the queue without running anything to completion.
    ///
    /// Posted callbacks are dropped; waiters are aborted so their owners
    /// observe cancellation instead of hanging on a queue that will never
    /// drain again.
    pub fn abort_all_events(&self) {
        loop {
            let item = match self.queue.borrow_mut().pop_front() {
                Some(item) => item,
                None => break,
            };
            match item {
                QueueItem::Posted(f) => drop(f),
                QueueItem::Waiter { source, token } => source.abort(token),
            }
        }
    }
}

/// Suspend for `frames` consecutive drains of `point`
pub async fn delay_frames(
    point: &TimingPoint,
    frames: u32,
    cancel: CancellationToken,
) -> Result<()> {
    for _ in 0..frames {
        point.next(cancel.clone()).await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::AwaitableStatus;
    use cadence_core::CancellationSource;
    use std::cell::RefCell as StdRefCell;
    use std::future::Future;

    fn update_point() -> TimingPoint {
        let tracker = PhaseTracker::shared();
        TimingPoint::new(CurrentPhase::Update, tracker)
    }

    #[test]
    fn test_posted_events_run_in_order() {
        let point = update_point();
        let order = Rc::new(StdRefCell::new(Vec::new()));
        for i in 0..3 {
            let order = Rc::clone(&order);
            point.post(move || order.borrow_mut().push(i));
        }
        point.do_queued_events();
        assert_eq!(*order.borrow(), vec![0, 1, 2]);
        assert_eq!(point.queued_len(), 0);
    }

    #[test]
    fn test_reentrant_post_defers_to_next_drain() {
        let point = Rc::new(update_point());
        let fired = Rc::new(StdRefCell::new(Vec::new()));
        let inner_point = Rc::clone(&point);
        let inner_fired = Rc::clone(&fired);
        point.post(move || {
            inner_fired.borrow_mut().push("first");
            let fired = Rc::clone(&inner_fired);
            inner_point.post(move || fired.borrow_mut().push("second"));
        });
        point.do_queued_events();
        assert_eq!(*fired.borrow(), vec!["first"]);
        assert_eq!(point.queued_len(), 1);
        point.do_queued_events();
        assert_eq!(*fired.borrow(), vec!["first", "second"]);
    }

    #[test]
    fn test_waiter_completes_at_drain() {
        let point = update_point();
        let handle = point.next(CancellationToken::never());
        assert_eq!(handle.status(), AwaitableStatus::Pending);
        point.do_queued_events();
        assert_eq!(handle.status(), AwaitableStatus::Completed);
        assert!(handle.try_result().is_ok());
    }

    #[test]
    fn test_canceled_token_skips_the_queue() {
        let point = update_point();
        let cancel = CancellationSource::new();
        cancel.cancel();
        let handle = point.next(cancel.token());
        assert_eq!(point.queued_len(), 0);
        assert_eq!(handle.status(), AwaitableStatus::Canceled);
    }

    #[test]
    fn test_cancellation_between_enqueue_and_drain() {
        let point = update_point();
        let cancel = CancellationSource::new();
        let handle = point.next(cancel.token());
        cancel.cancel();
        point.do_queued_events();
        assert_eq!(handle.status(), AwaitableStatus::Canceled);
    }

    #[test]
    fn test_abort_all_cancels_every_waiter() {
        let point = update_point();
        let first = point.next(CancellationToken::never());
        let second = point.next(CancellationToken::never());
        let fired = Rc::new(StdRefCell::new(false));
        {
            let fired = Rc::clone(&fired);
            point.post(move || *fired.borrow_mut() = true);
        }
        point.abort_all_events();
        assert_eq!(first.status(), AwaitableStatus::Canceled);
        assert_eq!(second.status(), AwaitableStatus::Canceled);
        assert!(!*fired.borrow());
        assert_eq!(point.queued_len(), 0);
    }

    #[test]
    fn test_next_or_now_when_phase_reached() {
        let tracker = PhaseTracker::shared();
        let point = TimingPoint::new(CurrentPhase::Update, Rc::clone(&tracker));
        tracker.set(CurrentPhase::LateUpdate);
        let handle = point.next_or_now(CancellationToken::never());
        assert_eq!(handle.status(), AwaitableStatus::Completed);
        assert_eq!(point.queued_len(), 0);
    }

    #[test]
    fn test_next_or_now_before_phase_queues() {
        let tracker = PhaseTracker::shared();
        let point = TimingPoint::new(CurrentPhase::Update, Rc::clone(&tracker));
        tracker.set(CurrentPhase::EarlyUpdate);
        let handle = point.next_or_now(CancellationToken::never());
        assert_eq!(handle.status(), AwaitableStatus::Pending);
        point.do_queued_events();
        assert_eq!(handle.status(), AwaitableStatus::Completed);
    }

    #[test]
    fn test_detached_point_never_reports_now() {
        let point = TimingPoint::detached(CurrentPhase::BeforeRendering);
        let handle = point.next_or_now(CancellationToken::never());
        assert_eq!(handle.status(), AwaitableStatus::Pending);
        point.do_queued_events();
        assert!(handle.try_result().is_ok());
    }

    #[test]
    fn test_delay_frames() {
        let point = Rc::new(update_point());
        let counted = Rc::new(StdRefCell::new(None));
        let mut task = Box::pin({
            let point = Rc::clone(&point);
            let counted = Rc::clone(&counted);
            async move {
                let result = delay_frames(&point, 3, CancellationToken::never()).await;
                *counted.borrow_mut() = Some(result.is_ok());
            }
        });
        let waker = futures::task::noop_waker();
        let mut cx = std::task::Context::from_waker(&waker);
        for _ in 0..3 {
            assert!(counted.borrow().is_none());
            assert!(task.as_mut().poll(&mut cx).is_pending());
            point.do_queued_events();
        }
        assert!(task.as_mut().poll(&mut cx).is_ready());
        assert_eq!(*counted.borrow(), Some(true));
    }

    #[test]
    fn test_delay_frames_canceled_midway() {
        let point = Rc::new(update_point());
        let cancel = CancellationSource::new();
        let outcome = Rc::new(StdRefCell::new(None));
        let mut task = Box::pin({
            let point = Rc::clone(&point);
            let token = cancel.token();
            let outcome = Rc::clone(&outcome);
            async move {
                let result = delay_frames(&point, 5, token).await;
                *outcome.borrow_mut() = Some(result);
            }
        });
        let waker = futures::task::noop_waker();
        let mut cx = std::task::Context::from_waker(&waker);
        assert!(task.as_mut().poll(&mut cx).is_pending());
        point.do_queued_events();
        cancel.cancel();
        assert!(task.as_mut().poll(&mut cx).is_ready());
        match outcome.borrow().as_ref() {
            Some(Err(err)) => assert!(err.is_canceled()),
            other => panic!("expected cancellation, got {other:?}"),
        };
    }
}
