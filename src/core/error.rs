//=========================================================================
// Lifecycle Errors
//=========================================================================
//
// Error taxonomy for the scene lifecycle core.
//
// Hierarchy:
//   SceneError
//     ├─ Config(ConfigError)    duplicate/unknown names (fatal)
//     ├─ Load(LoadError)        load unit failures (fatal to transition)
//     ├─ Resolve(ResolveError)  container misses and cycles
//     └─ state machine guards   NotInitialized, TransitionInProgress, ...
//
// Every error propagates to the call that initiated the work. Nothing in
// the core logs-and-continues.
//
//=========================================================================

//=== External Dependencies ===============================================

use thiserror::Error;

//=== ConfigError =========================================================

/// Misconfiguration of scenes or scene services.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// Two scene configs share one name.
    #[error("scene `{0}` is declared more than once")]
    DuplicateScene(String),

    /// A scene declares the same repository/interactor type twice.
    #[error("scene `{scene}` declares `{service}` more than once")]
    DuplicateService { scene: String, service: &'static str },

    /// The requested scene is not in the scene map.
    #[error("scene `{0}` is not in the scene map")]
    UnknownScene(String),
}

//=== LoadError ===========================================================

/// Failure inside the loading pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoadError {
    /// A unit's load operation returned an error.
    #[error("load unit `{unit}` failed: {reason}")]
    UnitFailed { unit: String, reason: String },

    /// A unit reported loaded and later reverted within the same cycle.
    #[error("load unit `{unit}` reverted to unloaded")]
    UnitReverted { unit: String },
}

//=== ResolveError ========================================================

/// Failure while resolving a type through the container.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    /// Nothing is registered for the requested type in this scope.
    #[error("`{service}` is not registered in scope `{scope}` (chain: {})", .chain.join(" -> "))]
    NotRegistered {
        scope: String,
        service: &'static str,
        chain: Vec<&'static str>,
    },

    /// The requested type is already being built further up the stack.
    #[error("dependency cycle in scope `{scope}`: {}", .chain.join(" -> "))]
    Cycle {
        scope: String,
        chain: Vec<&'static str>,
    },

    /// The stored instance is not of the requested type.
    #[error("`{expected}` was requested but the registration holds another type")]
    TypeMismatch { expected: &'static str },

    /// A factory refused to build its instance.
    #[error("factory for `{service}` failed: {reason}")]
    Factory { service: &'static str, reason: String },
}

//=== SceneError ==========================================================

/// Top-level error returned by the scene manager.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SceneError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Load(#[from] LoadError),

    #[error(transparent)]
    Resolve(#[from] ResolveError),

    /// The scene map has not been built yet.
    #[error("scene map is not initialized")]
    NotInitialized,

    /// The operation is not valid in the current state.
    #[error("operation `{operation}` is invalid in state {state}")]
    InvalidState {
        operation: &'static str,
        state: String,
    },

    /// `load_current_scene` was called without an initial scene.
    #[error("no initial scene is configured")]
    NoInitialScene,

    /// A transition is already running.
    #[error("cannot load `{requested}` while `{loading}` is still loading")]
    TransitionInProgress { requested: String, loading: String },

    /// The active scene does not declare the requested service.
    #[error("`{service}` is not declared by the active scene")]
    NotRegistered { service: &'static str },

    /// The service is declared but the scene has not finished loading.
    #[error("`{service}` is declared by `{scene}` but not constructed yet")]
    NotConstructed {
        service: &'static str,
        scene: String,
    },

    /// `initialize()` was requested twice for one instance.
    #[error("`{service}` is already initialized")]
    AlreadyInitialized { service: &'static str },
}

//=========================================================================
// Tests
//=========================================================================
