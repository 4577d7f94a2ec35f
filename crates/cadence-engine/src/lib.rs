//! Cadence Engine - screens, layers and frame objects
//!
//! Sits on top of `cadence-timing`: a `Screen` drives the frame phases and
//! pumps a single-threaded executor; `Layer`s and `FrameObject`s enter and
//! leave the loop through the activation/termination protocol; the `Engine`
//! owns the screens and exposes the one `handle_once` entry point a windowing
//! shell calls per frame.

mod clock;
mod config;
mod engine;
mod layer;
mod lifecycle;
mod object;
mod screen;
mod store;

pub use clock::FrameClock;
pub use config::EngineConfig;
pub use engine::Engine;
pub use layer::{activate_layer, terminate_layer, Layer, LayerCollection, LayerCore, WorldLayer};
pub use lifecycle::{LayerLifeState, LifeState};
pub use object::{activate_object, terminate_object, FrameObject, ObjectCore};
pub use screen::Screen;
pub use store::ObjectStore;

pub use cadence_core::{CadenceError, CancellationSource, CancellationToken, Result};
pub use cadence_timing::{CurrentPhase, FramePhase};
