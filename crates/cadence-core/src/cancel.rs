//! Cooperative cancellation for single-threaded schedulers

use std::cell::Cell;
use std::rc::Rc;

/// Owner side of a cancellation pair.
///
/// Cancellation is one-way and sticky: once `cancel` is called every token
/// handed out before or after reports canceled.
#[derive(Default)]
pub struct CancellationSource {
    flag: Rc<Cell<bool>>,
}

impl CancellationSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn token(&self) -> CancellationToken {
        CancellationToken {
            flag: Some(Rc::clone(&self.flag)),
        }
    }

    pub fn cancel(&self) {
        self.flag.set(true);
    }

    pub fn is_canceled(&self) -> bool {
        self.flag.get()
    }
}

/// Observer side of a cancellation pair.
///
/// `CancellationToken::never()` (also the `Default`) is a token that can
/// never be canceled, for callers that have nothing to cancel with.
#[derive(Clone, Default)]
pub struct CancellationToken {
    flag: Option<Rc<Cell<bool>>>,
}

impl CancellationToken {
    /// A token that never reports canceled
    pub fn never() -> Self {
        Self::default()
    }

    pub fn is_canceled(&self) -> bool {
        self.flag.as_ref().is_some_and(|flag| flag.get())
    }
}
