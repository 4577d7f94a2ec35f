//! Error types for Cadence

use thiserror::Error;

/// The main error type for Cadence operations
#[derive(Debug, Error)]
pub enum CadenceError {
    #[error("The engine is not running")]
    NotRunning,

    #[error("The engine is already running")]
    AlreadyRunning,

    #[error("Current thread is not the engine main thread")]
    NotMainThread,

    #[error("handle_once is not re-entrant")]
    ReentrantHandleOnce,

    #[error("Context mismatch: {0}")]
    ContextMismatch(String),

    #[error("Activation is already in progress")]
    AlreadyActivating,

    #[error("The layer is not associated with a screen")]
    LayerDetached,

    #[error("The awaitable is not completed yet")]
    NotCompleted,

    #[error("The awaitable cannot be awaited twice")]
    AwaitTwice,

    #[error("Operation canceled")]
    Canceled,

    #[error("The screen executor is shut down")]
    ExecutorShutDown,

    #[error("Invalid frame phase value: {0}")]
    InvalidPhase(u8),

    #[error("Hook failed: {0}")]
    HookFailed(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl CadenceError {
    /// Whether this is the expected cancellation outcome rather than a failure
    pub fn is_canceled(&self) -> bool {
        matches!(self, CadenceError::Canceled)
    }
}

/// Result type alias for Cadence operations
pub type Result<T> = std::result::Result<T, CadenceError>;
