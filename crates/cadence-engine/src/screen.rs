//! Screens: one frame loop, one executor, one set of timing points

use std::cell::{Cell, RefCell};
use std::future::Future;
use std::rc::{Rc, Weak};

use cadence_core::{CadenceError, CancellationSource, CancellationToken, Result};
use cadence_timing::{CurrentPhase, PhaseTracker, TimingPointList};
use futures::executor::{LocalPool, LocalSpawner};
use futures::task::LocalSpawnExt;

use crate::clock::FrameClock;
use crate::layer::{terminate_layer, LayerCollection};
use crate::lifecycle::LifeState;

/// One render target and the frame loop that drives it.
///
/// A screen owns its phase tracker, timing points, layer collection, clock
/// and a single-threaded executor. Suspended work (activations, `next` waits)
/// lives on the executor and is pumped after every queue drain, so tasks
/// resume inside the phase that woke them.
pub struct Screen {
    name: String,
    weak: Weak<Screen>,
    state: Cell<LifeState>,
    tracker: Rc<PhaseTracker>,
    timings: TimingPointList,
    layers: LayerCollection,
    executor: RefCell<LocalPool>,
    spawner: LocalSpawner,
    clock: RefCell<FrameClock>,
    running: CancellationSource,
    in_context: Cell<bool>,
    close_requested: Cell<bool>,
    frame_count: Cell<u64>,
}

impl Screen {
    pub fn new(name: impl Into<String>) -> Rc<Screen> {
        let tracker = PhaseTracker::shared();
        let executor = LocalPool::new();
        let spawner = executor.spawner();
        Rc::new_cyclic(|weak| Screen {
            name: name.into(),
            weak: Weak::clone(weak),
            state: Cell::new(LifeState::New),
            timings: TimingPointList::new(Rc::clone(&tracker)),
            tracker,
            layers: LayerCollection::new(),
            executor: RefCell::new(executor),
            spawner,
            clock: RefCell::new(FrameClock::new()),
            running: CancellationSource::new(),
            in_context: Cell::new(false),
            close_requested: Cell::new(false),
            frame_count: Cell::new(0),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn life_state(&self) -> LifeState {
        self.state.get()
    }

    pub(crate) fn set_life_state(&self, state: LifeState) {
        debug_assert!(state >= self.state.get());
        self.state.set(state);
    }

    pub fn tracker(&self) -> &Rc<PhaseTracker> {
        &self.tracker
    }

    pub fn current_phase(&self) -> CurrentPhase {
        self.tracker.current()
    }

    pub fn timings(&self) -> &TimingPointList {
        &self.timings
    }

    pub fn layers(&self) -> &LayerCollection {
        &self.layers
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count.get()
    }

    /// Total elapsed frame-loop time in seconds
    pub fn total_time(&self) -> f64 {
        self.clock.borrow().total_time()
    }

    /// Seconds between the last two frames
    pub fn delta_time(&self) -> f64 {
        self.clock.borrow().delta_time()
    }

    /// Whether this screen is the driving thread's current context
    pub fn is_current_context(&self) -> bool {
        self.in_context.get()
    }

    pub(crate) fn set_in_context(&self, in_context: bool) {
        self.in_context.set(in_context);
    }

    /// A token canceled when the screen begins teardown
    pub fn running_token(&self) -> CancellationToken {
        self.running.token()
    }

    /// Ask the screen to tear down at the start of its next frame
    pub fn request_close(&self) {
        self.close_requested.set(true);
    }

    pub fn is_close_requested(&self) -> bool {
        self.close_requested.get()
    }

    /// Spawn a task on this screen's executor
    pub fn spawn(&self, future: impl Future<Output = ()> + 'static) -> Result<()> {
        self.spawner
            .spawn_local(future)
            .map_err(|_| CadenceError::ExecutorShutDown)
    }

    /// Run the executor until every spawned task is parked again.
    ///
    /// Re-entrant calls (a running task draining a queue that pumps) are
    /// no-ops; the outer run picks up whatever was woken.
    pub fn pump(&self) {
        if let Ok(mut executor) = self.executor.try_borrow_mut() {
            executor.run_until_stalled();
        }
    }

    /// Suspend until at least `seconds` of frame-loop time have passed
    pub async fn delay_time(&self, seconds: f64, cancel: CancellationToken) -> Result<()> {
        let start = self.total_time();
        while self.total_time() - start < seconds {
            self.timings.update().next(cancel.clone()).await?;
        }
        Ok(())
    }

    /// Drive one full frame: every phase in order, draining each phase's
    /// timing point and pumping the executor so resumed tasks run inside
    /// the phase they waited for.
    pub fn handle_once(&self) {
        self.tracker.set(CurrentPhase::FrameInitializing);
        self.clock.borrow_mut().tick();
        if self.close_requested.get() && self.state.get() == LifeState::Alive {
            self.begin_teardown();
        }
        self.layers.apply_add();
        self.timings.frame_initializing().do_queued_events();
        self.pump();

        self.tracker.set(CurrentPhase::EarlyUpdate);
        self.timings.early_update().do_queued_events();
        self.pump();
        self.layers.early_update();

        self.tracker.set(CurrentPhase::Update);
        self.timings.update().do_queued_events();
        self.pump();
        self.layers.update();

        self.tracker.set(CurrentPhase::LateUpdate);
        self.timings.late_update().do_queued_events();
        self.pump();
        self.layers.late_update();

        self.tracker.set(CurrentPhase::BeforeRendering);
        self.timings.before_rendering().do_queued_events();
        self.pump();

        self.tracker.set(CurrentPhase::Rendering);
        self.layers.render(self);

        self.tracker.set(CurrentPhase::AfterRendering);
        self.timings.after_rendering().do_queued_events();
        self.pump();

        self.tracker.set(CurrentPhase::FrameFinalizing);
        self.layers.apply_remove();
        self.timings.end_of_frame().do_queued_events();
        self.pump();

        self.tracker.set(CurrentPhase::OutOfFrameLoop);
        self.frame_count.set(self.frame_count.get() + 1);
    }

    /// Start tearing the screen down: cancel the running token and spawn the
    /// task that terminates every layer, then marks the screen `Dead`.
    fn begin_teardown(&self) {
        self.set_life_state(LifeState::Terminating);
        self.running.cancel();
        let screen = match self.weak.upgrade() {
            Some(screen) => screen,
            None => return,
        };
        let layers = self.layers.snapshot();
        let spawned = self.spawn(async move {
            let pending: Vec<_> = layers
                .into_iter()
                .map(|layer| terminate_layer(layer, CancellationToken::never()))
                .collect();
            let _ = futures::future::join_all(pending).await;
            screen.set_life_state(LifeState::Dead);
        });
        if spawned.is_err() {
            self.set_life_state(LifeState::Dead);
        }
    }

    /// Final cleanup once the screen is `Dead`.
    ///
    /// Aborts every queued event and pumps one last time so every waiter
    /// observes cancellation instead of hanging on a loop that stopped.
    pub(crate) fn teardown(&self) {
        debug_assert!(self.state.get() >= LifeState::Terminating);
        self.timings.abort_all_events();
        for layer in self.layers.snapshot() {
            layer.core().timings().abort_all_events();
        }
        self.pump();
        // A screen removed mid-teardown finishes here: the aborts above
        // resumed its termination tasks, so the final pump ran them out.
        if self.state.get() != LifeState::Dead {
            self.set_life_state(LifeState::Dead);
        }
    }
}
