//! Monotonic lifecycle states for frame objects and layers

/// Lifecycle of a frame object (and of a screen).
///
/// Transitions only ever move forward; nothing goes back to `New` or skips
/// from `New` straight to `Alive`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LifeState {
    New,
    Activating,
    Alive,
    Terminating,
    Dead,
}

impl LifeState {
    /// `Alive` or `Terminating`: the object participates in frame dispatch
    pub fn is_running(self) -> bool {
        matches!(self, LifeState::Alive | LifeState::Terminating)
    }
}

/// Lifecycle of a layer, same shape and ordering as `LifeState`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LayerLifeState {
    New,
    Activating,
    Alive,
    Terminating,
    Dead,
}

impl LayerLifeState {
    pub fn is_running(self) -> bool {
        matches!(self, LayerLifeState::Alive | LayerLifeState::Terminating)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_states_are_ordered() {
        assert!(LifeState::New < LifeState::Activating);
        assert!(LifeState::Activating < LifeState::Alive);
        assert!(LifeState::Alive < LifeState::Terminating);
        assert!(LifeState::Terminating < LifeState::Dead);
    }

    #[test]
    fn test_running_states() {
        assert!(!LifeState::New.is_running());
        assert!(!LifeState::Activating.is_running());
        assert!(LifeState::Alive.is_running());
        assert!(LifeState::Terminating.is_running());
        assert!(!LifeState::Dead.is_running());

        assert!(LayerLifeState::Alive.is_running());
        assert!(!LayerLifeState::Dead.is_running());
    }
}
