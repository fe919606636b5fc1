//=========================================================================
// Prelude
//=========================================================================
//
// Convenience module that re-exports commonly used types and traits.
//
// Usage:
//   use railway_runner::prelude::*;
//
//=========================================================================

//=== Public API ==========================================================

// Game facade
pub use crate::game::{Game, GameBuilder};

// Scene system
pub use crate::core::scene::{
    Interactor, Repository, SceneConfig, SceneEvent, SceneManager, SceneState, TransitionStatus,
};

// Loading pipeline
pub use crate::core::loading::{next_frame, FrameDelayUnit, LoadFuture, LoadUnit, TimedDelayUnit};

// Dependency container
pub use crate::core::container::{Container, Registrations};

// Errors
pub use crate::core::error::{ConfigError, LoadError, ResolveError, SceneError};
