//! The engine driver: owns the screens and the per-frame entry point

use std::cell::Cell;
use std::rc::Rc;
use std::thread::{self, ThreadId};
use std::time::Instant;

use cadence_core::{CadenceError, DeferredList, Result};
use cadence_timing::set_pool_capacity;

use crate::config::EngineConfig;
use crate::lifecycle::LifeState;
use crate::screen::Screen;

/// The root driver.
///
/// Exactly one thread may drive an engine: `run` records the caller as the
/// main thread and every `handle_once`/`stop` after that must come from it.
/// Screens are added and removed through the usual deferred-mutation
/// pattern, so a screen added mid-frame is first iterated on the following
/// `handle_once`.
pub struct Engine {
    config: EngineConfig,
    screens: DeferredList<Rc<Screen>>,
    main_thread: Cell<Option<ThreadId>>,
    handling: Cell<bool>,
    started: Cell<Option<Instant>>,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl Engine {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            screens: DeferredList::new(),
            main_thread: Cell::new(None),
            handling: Cell::new(false),
            started: Cell::new(None),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn is_running(&self) -> bool {
        self.main_thread.get().is_some()
    }

    /// Whether the calling thread is the recorded main thread
    pub fn is_thread_main(&self) -> bool {
        self.main_thread.get() == Some(thread::current().id())
    }

    /// Record the calling thread as the main thread and start the clock
    pub fn run(&self) -> Result<()> {
        if self.is_running() {
            return Err(CadenceError::AlreadyRunning);
        }
        self.main_thread.set(Some(thread::current().id()));
        self.started.set(Some(Instant::now()));
        set_pool_capacity(self.config.max_pooled_waiters);
        log::info!("engine started on {:?}", thread::current().id());
        Ok(())
    }

    /// Stop the engine. A no-op when not running.
    pub fn stop(&self) -> Result<()> {
        if !self.is_running() {
            return Ok(());
        }
        if !self.is_thread_main() {
            return Err(CadenceError::NotMainThread);
        }
        self.main_thread.set(None);
        self.started.set(None);
        log::info!("engine stopped");
        Ok(())
    }

    /// Seconds since `run`, or zero when not running
    pub fn running_real_time(&self) -> f64 {
        self.started
            .get()
            .map_or(0.0, |started| started.elapsed().as_secs_f64())
    }

    /// Queue a screen for addition at the next `handle_once`
    pub fn add_screen(&self, screen: Rc<Screen>) -> Result<()> {
        if !self.is_running() {
            return Err(CadenceError::NotRunning);
        }
        self.screens.add(screen);
        Ok(())
    }

    /// Queue a screen for removal; it is torn down at the end of the frame
    pub fn remove_screen(&self, screen: &Rc<Screen>) -> Result<()> {
        if !self.is_running() {
            return Err(CadenceError::NotRunning);
        }
        screen.request_close();
        self.screens.remove(Rc::clone(screen));
        Ok(())
    }

    /// Screens currently iterated by `handle_once`
    pub fn screen_count(&self) -> usize {
        self.screens.len()
    }

    /// The screen currently in context on the driving thread, if any
    pub fn current_context(&self) -> Option<Rc<Screen>> {
        self.screens.find(|screen| screen.is_current_context())
    }

    /// Drive one frame across every screen.
    ///
    /// Applies pending screen additions, runs each screen's frame with that
    /// screen set as the thread's context, then applies pending removals.
    /// Returns whether any screens remain.
    pub fn handle_once(&self) -> Result<bool> {
        if !self.is_running() {
            return Err(CadenceError::NotRunning);
        }
        if !self.is_thread_main() {
            return Err(CadenceError::NotMainThread);
        }
        if self.handling.get() {
            return Err(CadenceError::ReentrantHandleOnce);
        }
        self.handling.set(true);
        let _guard = HandlingGuard(&self.handling);

        self.screens.apply_add(|screen| {
            screen.set_life_state(LifeState::Alive);
            true
        });

        for screen in self.screens.snapshot() {
            screen.set_in_context(true);
            screen.handle_once();
            screen.set_in_context(false);
            if screen.life_state() == LifeState::Dead {
                self.screens.remove(Rc::clone(&screen));
            }
        }

        self.screens.apply_remove_by(Rc::ptr_eq, |screen| {
            // A removal queued for a screen that was never added leaves the
            // screen still New; there is nothing to tear down.
            if screen.life_state() != LifeState::New {
                screen.teardown();
            }
        });

        if self.config.trace_frames {
            log::debug!("frame handled, {} screen(s) remain", self.screens.len());
        }
        Ok(!self.screens.is_empty())
    }
}

struct HandlingGuard<'a>(&'a Cell<bool>);

impl Drop for HandlingGuard<'_> {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handle_once_requires_run() {
        let engine = Engine::default();
        assert!(matches!(
            engine.handle_once(),
            Err(CadenceError::NotRunning)
        ));
    }

    #[test]
    fn test_run_twice_is_rejected() {
        let engine = Engine::default();
        engine.run().unwrap();
        assert!(matches!(engine.run(), Err(CadenceError::AlreadyRunning)));
    }

    #[test]
    fn test_stop_when_not_running_is_noop() {
        let engine = Engine::default();
        assert!(engine.stop().is_ok());
        assert!(!engine.is_running());
    }

    #[test]
    fn test_run_then_stop() {
        let engine = Engine::default();
        engine.run().unwrap();
        assert!(engine.is_running());
        assert!(engine.is_thread_main());
        assert!(engine.running_real_time() >= 0.0);
        engine.stop().unwrap();
        assert!(!engine.is_running());
        assert_eq!(engine.running_real_time(), 0.0);
    }

    #[test]
    fn test_wrong_thread_is_rejected() {
        let engine = Engine::default();
        // Record another thread's id as main so this thread is the wrong one.
        let other = std::thread::spawn(|| std::thread::current().id())
            .join()
            .unwrap();
        engine.main_thread.set(Some(other));
        assert!(engine.is_running());
        assert!(!engine.is_thread_main());
        assert!(matches!(
            engine.handle_once(),
            Err(CadenceError::NotMainThread)
        ));
        assert!(matches!(engine.stop(), Err(CadenceError::NotMainThread)));
    }

    #[test]
    fn test_reentrant_handle_once_is_rejected() {
        let engine = Engine::default();
        engine.run().unwrap();
        engine.handling.set(true);
        assert!(matches!(
            engine.handle_once(),
            Err(CadenceError::ReentrantHandleOnce)
        ));
        engine.handling.set(false);
        assert!(engine.handle_once().is_ok());
    }

    #[test]
    fn test_zero_screens_returns_false() {
        let engine = Engine::default();
        engine.run().unwrap();
        assert_eq!(engine.handle_once().unwrap(), false);
    }

    #[test]
    fn test_add_screen_requires_run() {
        let engine = Engine::default();
        assert!(matches!(
            engine.add_screen(Screen::new("main")),
            Err(CadenceError::NotRunning)
        ));
    }

    #[test]
    fn test_added_screen_joins_next_frame() {
        let engine = Engine::default();
        engine.run().unwrap();
        engine.add_screen(Screen::new("main")).unwrap();
        // Pending addition is not visible until applied by handle_once.
        assert_eq!(engine.screen_count(), 0);
        assert!(engine.handle_once().unwrap());
        assert_eq!(engine.screen_count(), 1);
    }

    #[test]
    fn test_screen_becomes_alive_and_counts_frames() {
        let engine = Engine::default();
        engine.run().unwrap();
        let screen = Screen::new("main");
        engine.add_screen(Rc::clone(&screen)).unwrap();
        assert_eq!(screen.life_state(), LifeState::New);
        engine.handle_once().unwrap();
        assert_eq!(screen.life_state(), LifeState::Alive);
        assert_eq!(screen.frame_count(), 1);
        engine.handle_once().unwrap();
        assert_eq!(screen.frame_count(), 2);
    }

    #[test]
    fn test_removed_screen_is_torn_down() {
        let engine = Engine::default();
        engine.run().unwrap();
        let screen = Screen::new("main");
        engine.add_screen(Rc::clone(&screen)).unwrap();
        engine.handle_once().unwrap();
        screen.request_close();
        // Frame 1: teardown begins and finishes (no layers), screen removed.
        let remaining = engine.handle_once().unwrap();
        assert!(!remaining);
        assert_eq!(screen.life_state(), LifeState::Dead);
        assert_eq!(engine.screen_count(), 0);
    }

    #[test]
    fn test_remove_unknown_screen_is_harmless() {
        let engine = Engine::default();
        engine.run().unwrap();
        let stray = Screen::new("stray");
        engine.remove_screen(&stray).unwrap();
        assert!(engine.handle_once().is_ok());
        assert_eq!(stray.life_state(), LifeState::New);
        assert_eq!(engine.screen_count(), 0);
    }

    #[test]
    fn test_context_follows_handled_screen() {
        let engine = Engine::default();
        engine.run().unwrap();
        let screen = Screen::new("main");
        engine.add_screen(Rc::clone(&screen)).unwrap();
        engine.handle_once().unwrap();
        // Outside handle_once no screen is in context.
        assert!(!screen.is_current_context());
        assert!(engine.current_context().is_none());
    }
}
