//! Rendering layers and the collection a screen iterates

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use async_trait::async_trait;
use cadence_core::{CadenceError, CancellationSource, CancellationToken, DeferredList, Result};
use cadence_timing::{FramePhase, LayerTimingPoints};

use crate::lifecycle::LayerLifeState;
use crate::object::terminate_object;
use crate::screen::Screen;
use crate::store::ObjectStore;

/// Shared state every layer carries.
///
/// Owns the layer's object store and its rendering-bracket timing points;
/// the points stay detached until the layer is activated onto a screen.
pub struct LayerCore {
    state: Cell<LayerLifeState>,
    visible: Cell<bool>,
    sort_key: Cell<i32>,
    timings: LayerTimingPoints,
    objects: ObjectStore,
    running: CancellationSource,
    owner: RefCell<Option<Weak<Screen>>>,
}

impl LayerCore {
    pub fn new(sort_key: i32) -> Self {
        Self {
            state: Cell::new(LayerLifeState::New),
            visible: Cell::new(true),
            sort_key: Cell::new(sort_key),
            timings: LayerTimingPoints::new(),
            objects: ObjectStore::new(),
            running: CancellationSource::new(),
            owner: RefCell::new(None),
        }
    }

    pub fn state(&self) -> LayerLifeState {
        self.state.get()
    }

    pub(crate) fn set_state(&self, state: LayerLifeState) {
        debug_assert!(state >= self.state.get());
        self.state.set(state);
    }

    /// Invisible layers keep updating but skip rendering
    pub fn is_visible(&self) -> bool {
        self.visible.get()
    }

    pub fn set_visible(&self, visible: bool) {
        self.visible.set(visible);
    }

    /// Layers render in ascending sort-key order
    pub fn sort_key(&self) -> i32 {
        self.sort_key.get()
    }

    pub fn timings(&self) -> &LayerTimingPoints {
        &self.timings
    }

    pub fn objects(&self) -> &ObjectStore {
        &self.objects
    }

    /// A token canceled when the layer begins terminating
    pub fn running_token(&self) -> CancellationToken {
        self.running.token()
    }

    pub fn screen(&self) -> Option<Rc<Screen>> {
        self.owner.borrow().as_ref().and_then(Weak::upgrade)
    }

    pub(crate) fn set_owner(&self, screen: &Rc<Screen>) {
        *self.owner.borrow_mut() = Some(Rc::downgrade(screen));
    }

    pub(crate) fn clear_owner(&self) {
        *self.owner.borrow_mut() = None;
    }
}

/// A rendering layer driven by a screen's frame loop.
///
/// The default `render` drains the layer's before-rendering point, runs the
/// rendering hooks around the object store, then drains the after-rendering
/// point, pumping the screen's executor after each drain so resumed waits run
/// inside the bracket they waited for.
#[async_trait(?Send)]
pub trait Layer {
    fn core(&self) -> &LayerCore;

    async fn on_activating(&self) -> Result<()> {
        Ok(())
    }

    fn on_alive(&self) {}

    fn on_terminating(&self) {}

    fn on_dead(&self) {}

    fn on_rendering(&self, _screen: &Screen) {}

    fn on_rendered(&self, _screen: &Screen) {}

    fn render(&self, screen: &Screen) {
        let core = self.core();
        core.timings().before_rendering().do_queued_events();
        screen.pump();
        self.on_rendering(screen);
        core.objects().render();
        self.on_rendered(screen);
        core.timings().after_rendering().do_queued_events();
        screen.pump();
    }
}

/// The stock concrete layer: a plain container of frame objects.
///
/// Engines with custom rendering subclass the trait instead; most object
/// hosting needs nothing beyond the default hooks.
pub struct WorldLayer {
    core: LayerCore,
}

impl WorldLayer {
    pub fn new(sort_key: i32) -> Rc<WorldLayer> {
        Rc::new(WorldLayer {
            core: LayerCore::new(sort_key),
        })
    }
}

impl Layer for WorldLayer {
    fn core(&self) -> &LayerCore {
        &self.core
    }
}

/// The layers of one screen, in sort-key order.
///
/// Structural changes are buffered like everywhere else: additions apply
/// while the frame is initializing, removals while it is finalizing, and each
/// boundary also applies the object stores of the layers present.
pub struct LayerCollection {
    list: DeferredList<Rc<dyn Layer>>,
}

impl Default for LayerCollection {
    fn default() -> Self {
        Self::new()
    }
}

impl LayerCollection {
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

    pub fn snapshot(&self) -> Vec<Rc<dyn Layer>> {
        self.list.snapshot()
    }

    pub(crate) fn add(&self, layer: Rc<dyn Layer>) {
        self.list.add(layer);
    }

    pub(crate) fn remove(&self, layer: Rc<dyn Layer>) {
        self.list.remove(layer);
    }

    pub(crate) fn apply_add(&self) {
        let added = self.list.apply_add(|layer| {
            if layer.core().state() != LayerLifeState::Activating {
                return false;
            }
            layer.core().set_state(LayerLifeState::Alive);
            layer.on_alive();
            true
        });
        if added {
            self.list
                .sort_by(|a, b| a.core().sort_key().cmp(&b.core().sort_key()));
        }
        self.list.for_each(|layer| layer.core().objects().apply_add());
    }

    pub(crate) fn apply_remove(&self) {
        self.list
            .for_each(|layer| layer.core().objects().apply_remove());
        self.list.apply_remove_by(Rc::ptr_eq, |layer| {
            // A dying layer's removal settles any objects still buffered.
            layer.core().objects().apply_remove();
            layer.core().set_state(LayerLifeState::Dead);
            layer.core().timings().abort_all_events();
            layer.core().clear_owner();
            layer.on_dead();
        });
    }

    pub(crate) fn early_update(&self) {
        self.list.for_each(|layer| layer.core().objects().early_update());
    }

    pub(crate) fn update(&self) {
        self.list.for_each(|layer| layer.core().objects().update());
    }

    pub(crate) fn late_update(&self) {
        self.list.for_each(|layer| layer.core().objects().late_update());
    }

    pub(crate) fn render(&self, screen: &Screen) {
        self.list.for_each(|layer| {
            if layer.core().state() == LayerLifeState::Alive && layer.core().is_visible() {
                layer.render(screen);
            }
        });
    }
}

/// Bring `layer` from `New` to `Alive` on `screen`.
///
/// Mirrors the object protocol one level up: same context matching, same
/// idempotency, same compensating termination on a failed hook. Attaching
/// binds the layer's timing points to the screen's frame loop.
pub async fn activate_layer(
    layer: Rc<dyn Layer>,
    screen: Rc<Screen>,
    cancel: CancellationToken,
) -> Result<()> {
    if !screen.is_current_context() {
        return Err(CadenceError::ContextMismatch(screen.name().to_owned()));
    }
    match layer.core().state() {
        LayerLifeState::Activating => return Err(CadenceError::AlreadyActivating),
        state if state >= LayerLifeState::Alive => {
            return screen
                .timings()
                .point(FramePhase::FrameInitializing)
                .next(cancel)
                .await;
        }
        _ => {}
    }

    layer.core().set_owner(&screen);
    layer.core().timings().attach(screen.tracker());
    layer.core().set_state(LayerLifeState::Activating);
    if let Err(err) = layer.on_activating().await {
        let _ = terminate_layer(Rc::clone(&layer), cancel.clone()).await;
        return Err(err);
    }

    if screen.current_phase().is_out_of_frame_loop() {
        screen
            .timings()
            .frame_initializing()
            .next(cancel.clone())
            .await?;
    }
    screen.layers().add(Rc::clone(&layer));
    screen
        .timings()
        .next_frame(FramePhase::FrameInitializing, cancel)
        .await?;

    if layer.core().state() < LayerLifeState::Alive {
        return Err(CadenceError::Canceled);
    }
    Ok(())
}

/// Take `layer` to `Terminating`, terminating its objects first.
///
/// Object termination failures are ignored; the layer comes out regardless.
/// Resumes after the end-of-frame step that made the layer `Dead`.
pub async fn terminate_layer(layer: Rc<dyn Layer>, cancel: CancellationToken) -> Result<()> {
    let state = layer.core().state();
    if state == LayerLifeState::New || state >= LayerLifeState::Terminating {
        return Ok(());
    }
    let screen = layer.core().screen().ok_or(CadenceError::LayerDetached)?;
    if !screen.is_current_context() {
        return Err(CadenceError::ContextMismatch(screen.name().to_owned()));
    }

    layer.core().set_state(LayerLifeState::Terminating);
    layer.core().running.cancel();
    let pending: Vec<_> = layer
        .core()
        .objects()
        .snapshot()
        .into_iter()
        .map(|object| terminate_object(object, cancel.clone()))
        .collect();
    let _ = futures::future::join_all(pending).await;

    layer.on_terminating();
    screen.layers().remove(Rc::clone(&layer));
    screen.timings().end_of_frame().next(cancel).await
}
