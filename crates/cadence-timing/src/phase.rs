//! Frame phases and the per-screen phase marker

use std::cell::Cell;
use std::rc::Rc;

use cadence_core::{CadenceError, Result};

/// A phase of the frame loop that work can be scheduled into.
///
/// The numeric values order the waitable phases within a frame; `CurrentPhase`
/// reuses them so the two enums compare directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum FramePhase {
    FrameInitializing = 1,
    EarlyUpdate = 2,
    Update = 3,
    LateUpdate = 4,
    BeforeRendering = 5,
    AfterRendering = 6,
}

impl FramePhase {
    pub const ALL: [FramePhase; 6] = [
        FramePhase::FrameInitializing,
        FramePhase::EarlyUpdate,
        FramePhase::Update,
        FramePhase::LateUpdate,
        FramePhase::BeforeRendering,
        FramePhase::AfterRendering,
    ];
}

impl From<FramePhase> for CurrentPhase {
    fn from(phase: FramePhase) -> Self {
        match phase {
            FramePhase::FrameInitializing => CurrentPhase::FrameInitializing,
            FramePhase::EarlyUpdate => CurrentPhase::EarlyUpdate,
            FramePhase::Update => CurrentPhase::Update,
            FramePhase::LateUpdate => CurrentPhase::LateUpdate,
            FramePhase::BeforeRendering => CurrentPhase::BeforeRendering,
            FramePhase::AfterRendering => CurrentPhase::AfterRendering,
        }
    }
}

/// Where the frame loop currently is.
///
/// Extends `FramePhase` with markers that cannot be waited on: outside the
/// loop entirely, inside rendering, and the internal end-of-frame drain.
/// `Rendering` and `FrameFinalizing` sit outside the comparable range, so
/// ordered questions about them are answered by `has_reached`, not `<`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum CurrentPhase {
    OutOfFrameLoop = 0,
    FrameInitializing = 1,
    EarlyUpdate = 2,
    Update = 3,
    LateUpdate = 4,
    BeforeRendering = 5,
    AfterRendering = 6,
    Rendering = 100,
    FrameFinalizing = 101,
}

impl CurrentPhase {
    /// Whether this marker participates in ordered comparison
    pub fn is_comparable(self) -> bool {
        let value = self as u8;
        (1..=6).contains(&value)
    }

    pub fn is_out_of_frame_loop(self) -> bool {
        self == CurrentPhase::OutOfFrameLoop
    }

    /// Whether the loop has reached `target` this frame.
    ///
    /// Equality answers for every pair of markers; an ordered answer exists
    /// only when both sides are comparable.
    pub fn has_reached(self, target: CurrentPhase) -> bool {
        if self == target {
            return true;
        }
        if self.is_comparable() && target.is_comparable() {
            return self as u8 >= target as u8;
        }
        false
    }

    pub fn from_value(value: u8) -> Result<Self> {
        match value {
            0 => Ok(CurrentPhase::OutOfFrameLoop),
            1 => Ok(CurrentPhase::FrameInitializing),
            2 => Ok(CurrentPhase::EarlyUpdate),
            3 => Ok(CurrentPhase::Update),
            4 => Ok(CurrentPhase::LateUpdate),
            5 => Ok(CurrentPhase::BeforeRendering),
            6 => Ok(CurrentPhase::AfterRendering),
            100 => Ok(CurrentPhase::Rendering),
            101 => Ok(CurrentPhase::FrameFinalizing),
            other => Err(CadenceError::InvalidPhase(other)),
        }
    }
}

/// Per-screen record of where the frame loop is.
///
/// Each screen runs its own frame loop, so the marker lives on the screen
/// rather than in any shared state. Shared by `Rc` between the screen and its
/// timing points.
#[derive(Debug)]
pub struct PhaseTracker {
    current: Cell<CurrentPhase>,
}

impl Default for PhaseTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl PhaseTracker {
    pub fn new() -> Self {
        Self {
            current: Cell::new(CurrentPhase::OutOfFrameLoop),
        }
    }

    pub fn shared() -> Rc<Self> {
        Rc::new(Self::new())
    }

    pub fn current(&self) -> CurrentPhase {
        self.current.get()
    }

    pub fn set(&self, phase: CurrentPhase) {
        self.current.set(phase);
    }

    pub fn is_out_of_frame_loop(&self) -> bool {
        self.current.get().is_out_of_frame_loop()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_waitable_phase_order() {
        assert!(FramePhase::FrameInitializing < FramePhase::EarlyUpdate);
        assert!(FramePhase::EarlyUpdate < FramePhase::Update);
        assert!(FramePhase::Update < FramePhase::LateUpdate);
        assert!(FramePhase::LateUpdate < FramePhase::BeforeRendering);
        assert!(FramePhase::BeforeRendering < FramePhase::AfterRendering);
    }

    #[test]
    fn test_has_reached_within_comparable_range() {
        let update = CurrentPhase::Update;
        assert!(update.has_reached(CurrentPhase::FrameInitializing));
        assert!(update.has_reached(CurrentPhase::EarlyUpdate));
        assert!(update.has_reached(CurrentPhase::Update));
        assert!(!update.has_reached(CurrentPhase::LateUpdate));
        assert!(!update.has_reached(CurrentPhase::AfterRendering));
    }

    #[test]
    fn test_has_reached_outside_comparable_range() {
        // Non-comparable markers only answer equality.
        assert!(CurrentPhase::Rendering.has_reached(CurrentPhase::Rendering));
        assert!(!CurrentPhase::Rendering.has_reached(CurrentPhase::Update));
        assert!(!CurrentPhase::Update.has_reached(CurrentPhase::Rendering));
        assert!(CurrentPhase::FrameFinalizing.has_reached(CurrentPhase::FrameFinalizing));
        assert!(!CurrentPhase::FrameFinalizing.has_reached(CurrentPhase::Rendering));
        assert!(!CurrentPhase::OutOfFrameLoop.has_reached(CurrentPhase::FrameInitializing));
        assert!(CurrentPhase::OutOfFrameLoop.has_reached(CurrentPhase::OutOfFrameLoop));
    }

    #[test]
    fn test_from_value_round_trip() {
        for phase in [
            CurrentPhase::OutOfFrameLoop,
            CurrentPhase::Update,
            CurrentPhase::Rendering,
            CurrentPhase::FrameFinalizing,
        ] {
            assert_eq!(CurrentPhase::from_value(phase as u8).unwrap(), phase);
        }
        assert!(CurrentPhase::from_value(7).is_err());
        assert!(CurrentPhase::from_value(255).is_err());
    }

    #[test]
    fn test_tracker_starts_out_of_loop() {
        let tracker = PhaseTracker::new();
        assert!(tracker.is_out_of_frame_loop());
        tracker.set(CurrentPhase::Update);
        assert_eq!(tracker.current(), CurrentPhase::Update);
        assert!(!tracker.is_out_of_frame_loop());
    }
}
