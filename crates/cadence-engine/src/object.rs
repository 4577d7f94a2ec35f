//! Frame objects and their activation/termination protocol

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use async_trait::async_trait;
use cadence_core::{CadenceError, CancellationToken, Result};
use cadence_timing::FramePhase;

use crate::layer::Layer;
use crate::lifecycle::LifeState;
use crate::screen::Screen;

/// Shared state every frame object carries.
///
/// Concrete object types embed one and hand it out through
/// `FrameObject::core`; the scheduler owns every mutation of it.
pub struct ObjectCore {
    state: Cell<LifeState>,
    frozen: Cell<bool>,
    owner: RefCell<Option<Weak<dyn Layer>>>,
}

impl Default for ObjectCore {
    fn default() -> Self {
        Self::new()
    }
}

impl ObjectCore {
    pub fn new() -> Self {
        Self {
            state: Cell::new(LifeState::New),
            frozen: Cell::new(false),
            owner: RefCell::new(None),
        }
    }

    pub fn state(&self) -> LifeState {
        self.state.get()
    }

    pub(crate) fn set_state(&self, state: LifeState) {
        debug_assert!(state >= self.state.get());
        self.state.set(state);
    }

    /// Frozen objects skip update dispatch but still render
    pub fn is_frozen(&self) -> bool {
        self.frozen.get()
    }

    pub fn set_frozen(&self, frozen: bool) {
        self.frozen.set(frozen);
    }

    /// The layer this object is (or was last) activated onto
    pub fn layer(&self) -> Option<Rc<dyn Layer>> {
        self.owner.borrow().as_ref().and_then(Weak::upgrade)
    }

    /// The screen reached through the owning layer
    pub fn screen(&self) -> Option<Rc<Screen>> {
        self.layer().and_then(|layer| layer.core().screen())
    }

    pub(crate) fn set_owner(&self, layer: &Rc<dyn Layer>) {
        *self.owner.borrow_mut() = Some(Rc::downgrade(layer));
    }

    pub(crate) fn clear_owner(&self) {
        *self.owner.borrow_mut() = None;
    }
}

/// A drawable/updatable entity driven by a screen's frame loop.
///
/// The scheduler is the only way in and out: `activate_object` brings an
/// object from `New` to `Alive`, `terminate_object` takes it to `Dead`. The
/// per-phase hooks run every frame while the object is in its layer's store.
#[async_trait(?Send)]
pub trait FrameObject {
    fn core(&self) -> &ObjectCore;

    /// Runs while the object is `Activating`; may suspend. Failure rolls the
    /// activation back.
    async fn on_activating(&self) -> Result<()> {
        Ok(())
    }

    /// Runs exactly once, when the pending addition is applied
    fn on_alive(&self) {}

    fn on_terminating(&self) {}

    /// Runs when the pending removal is applied; the object is `Dead`
    fn on_dead(&self) {}

    fn early_update(&self) {}

    fn update(&self) {}

    fn late_update(&self) {}

    fn render(&self) {}
}

/// Bring `object` from `New` to `Alive` on `layer`, resuming at `phase`.
///
/// Must be called on the thread whose context is the layer's screen. An
/// object that is already past activation just waits for the next `phase`
/// drain; a second call while the first is still `Activating` is a usage
/// error. If `on_activating` fails the object is terminated best-effort and
/// the hook's error is returned.
pub async fn activate_object(
    object: Rc<dyn FrameObject>,
    layer: Rc<dyn Layer>,
    phase: FramePhase,
    cancel: CancellationToken,
) -> Result<()> {
    let screen = layer.core().screen().ok_or(CadenceError::LayerDetached)?;
    if !screen.is_current_context() {
        return Err(CadenceError::ContextMismatch(screen.name().to_owned()));
    }
    match object.core().state() {
        LifeState::Activating => return Err(CadenceError::AlreadyActivating),
        state if state >= LifeState::Alive => {
            return screen.timings().point(phase).next(cancel).await;
        }
        _ => {}
    }

    object.core().set_owner(&layer);
    object.core().set_state(LifeState::Activating);
    if let Err(err) = object.on_activating().await {
        // Compensating termination; only its own errors are swallowed.
        let _ = terminate_object(Rc::clone(&object), cancel.clone()).await;
        return Err(err);
    }

    // Structural changes happen inside a frame, not between frames.
    if screen.current_phase().is_out_of_frame_loop() {
        screen
            .timings()
            .frame_initializing()
            .next(cancel.clone())
            .await?;
    }
    layer.core().objects().add(Rc::clone(&object));
    screen.timings().next_frame(phase, cancel).await?;

    // The screen may have begun teardown while the activation was parked.
    if object.core().state() < LifeState::Alive {
        return Err(CadenceError::Canceled);
    }
    Ok(())
}

/// Take `object` to `Terminating` and wait for the removal to be applied.
///
/// A no-op for objects that never activated or are already on the way out.
/// Resumes after the end-of-frame step that made the object `Dead`.
pub async fn terminate_object(object: Rc<dyn FrameObject>, cancel: CancellationToken) -> Result<()> {
    let state = object.core().state();
    if state == LifeState::New || state >= LifeState::Terminating {
        return Ok(());
    }
    let layer = object.core().layer().ok_or(CadenceError::LayerDetached)?;
    let screen = layer.core().screen().ok_or(CadenceError::LayerDetached)?;
    if !screen.is_current_context() {
        return Err(CadenceError::ContextMismatch(screen.name().to_owned()));
    }

    object.core().set_state(LifeState::Terminating);
    layer.core().objects().remove(Rc::clone(&object));
    object.on_terminating();
    screen.timings().end_of_frame().next(cancel).await
}
