//! Timing point sets owned by screens and layers

use std::rc::Rc;

use cadence_core::{CancellationToken, Result};

use crate::phase::{CurrentPhase, FramePhase, PhaseTracker};
use crate::point::TimingPoint;

/// The timing points of one screen's frame loop, one per waitable phase.
///
/// Also owns the internal end-of-frame point the loop drains while
/// finalizing; `next_frame` uses it to tell "later this frame" apart from
/// "next frame".
pub struct TimingPointList {
    tracker: Rc<PhaseTracker>,
    frame_initializing: TimingPoint,
    early_update: TimingPoint,
    update: TimingPoint,
    late_update: TimingPoint,
    before_rendering: TimingPoint,
    after_rendering: TimingPoint,
    end_of_frame: TimingPoint,
}

impl TimingPointList {
    pub fn new(tracker: Rc<PhaseTracker>) -> Self {
        let point = |target| TimingPoint::new(target, Rc::clone(&tracker));
        Self {
            frame_initializing: point(CurrentPhase::FrameInitializing),
            early_update: point(CurrentPhase::EarlyUpdate),
            update: point(CurrentPhase::Update),
            late_update: point(CurrentPhase::LateUpdate),
            before_rendering: point(CurrentPhase::BeforeRendering),
            after_rendering: point(CurrentPhase::AfterRendering),
            end_of_frame: point(CurrentPhase::FrameFinalizing),
            tracker,
        }
    }

    pub fn frame_initializing(&self) -> &TimingPoint {
        &self.frame_initializing
    }

    pub fn early_update(&self) -> &TimingPoint {
        &self.early_update
    }

    pub fn update(&self) -> &TimingPoint {
        &self.update
    }

    pub fn late_update(&self) -> &TimingPoint {
        &self.late_update
    }

    pub fn before_rendering(&self) -> &TimingPoint {
        &self.before_rendering
    }

    pub fn after_rendering(&self) -> &TimingPoint {
        &self.after_rendering
    }

    /// The internal point drained while the frame is finalizing
    pub fn end_of_frame(&self) -> &TimingPoint {
        &self.end_of_frame
    }

    /// The point of a waitable phase
    pub fn point(&self, phase: FramePhase) -> &TimingPoint {
        match phase {
            FramePhase::FrameInitializing => &self.frame_initializing,
            FramePhase::EarlyUpdate => &self.early_update,
            FramePhase::Update => &self.update,
            FramePhase::LateUpdate => &self.late_update,
            FramePhase::BeforeRendering => &self.before_rendering,
            FramePhase::AfterRendering => &self.after_rendering,
        }
    }

    /// Suspend until `phase` of the next frame.
    ///
    /// Unlike `point(phase).next()`, which resumes at the next drain even if
    /// that drain is later in the current frame, this first rides out the
    /// current frame (when one is in progress) and only then waits for the
    /// phase.
    pub async fn next_frame(&self, phase: FramePhase, cancel: CancellationToken) -> Result<()> {
        if !self.tracker.is_out_of_frame_loop() {
            self.end_of_frame.next_or_now(cancel.clone()).await?;
        }
        self.point(phase).next(cancel).await
    }

    /// Abort every queued event on every point
    pub fn abort_all_events(&self) {
        for phase in FramePhase::ALL {
            self.point(phase).abort_all_events();
        }
        self.end_of_frame.abort_all_events();
    }
}

/// Rendering-bracket timing points owned by a layer.
///
/// Created detached; a layer gets tied to a screen only on activation, at
/// which point `attach` binds both points to the screen's tracker.
pub struct LayerTimingPoints {
    before_rendering: TimingPoint,
    after_rendering: TimingPoint,
}

impl Default for LayerTimingPoints {
    fn default() -> Self {
        Self::new()
    }
}

impl LayerTimingPoints {
    pub fn new() -> Self {
        Self {
            before_rendering: TimingPoint::detached(CurrentPhase::Rendering),
            after_rendering: TimingPoint::detached(CurrentPhase::Rendering),
        }
    }

    pub fn attach(&self, tracker: &Rc<PhaseTracker>) {
        self.before_rendering.attach(Rc::clone(tracker));
        self.after_rendering.attach(Rc::clone(tracker));
    }

    pub fn before_rendering(&self) -> &TimingPoint {
        &self.before_rendering
    }

    pub fn after_rendering(&self) -> &TimingPoint {
        &self.after_rendering
    }

    pub fn abort_all_events(&self) {
        self.before_rendering.abort_all_events();
        self.after_rendering.abort_all_events();
    }
}
