//! Per-layer object store with deferred add/remove and phase dispatch

use std::rc::Rc;

use cadence_core::DeferredList;

use crate::lifecycle::LifeState;
use crate::object::FrameObject;

/// The objects currently associated with one layer.
///
/// Additions and removals requested mid-frame are buffered and applied at the
/// frame boundaries; applying an addition is what advances the object to
/// `Alive`, applying a removal is what makes it `Dead`.
pub struct ObjectStore {
    list: DeferredList<Rc<dyn FrameObject>>,
}

impl Default for ObjectStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ObjectStore {
    pub fn new() -> Self {
        Self {
            list: DeferredList::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.list.len()
    }

    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }

    pub fn snapshot(&self) -> Vec<Rc<dyn FrameObject>> {
        self.list.snapshot()
    }

    pub(crate) fn add(&self, object: Rc<dyn FrameObject>) {
        self.list.add(object);
    }

    pub(crate) fn remove(&self, object: Rc<dyn FrameObject>) {
        self.list.remove(object);
    }

    /// Apply pending additions, advancing each surviving object to `Alive`.
    ///
    /// An object that was terminated while its addition was still pending is
    /// not promoted; its buffered removal settles it in `apply_remove`.
    pub(crate) fn apply_add(&self) {
        self.list.apply_add(|object| {
            if object.core().state() != LifeState::Activating {
                return false;
            }
            object.core().set_state(LifeState::Alive);
            object.on_alive();
            true
        });
    }

    /// Apply pending removals, advancing each removed object to `Dead`
    pub(crate) fn apply_remove(&self) {
        self.list.apply_remove_by(Rc::ptr_eq, |object| {
            object.core().set_state(LifeState::Dead);
            object.core().clear_owner();
            object.on_dead();
        });
    }

    pub(crate) fn early_update(&self) {
        self.list.for_each(|object| {
            if !object.core().is_frozen() {
                object.early_update();
            }
        });
    }

    pub(crate) fn update(&self) {
        self.list.for_each(|object| {
            if !object.core().is_frozen() {
                object.update();
            }
        });
    }

    pub(crate) fn late_update(&self) {
        self.list.for_each(|object| {
            if !object.core().is_frozen() {
                object.late_update();
            }
        });
    }

    /// Frozen objects still render
    pub(crate) fn render(&self) {
        self.list.for_each(|object| object.render());
    }
}
