//=========================================================================
// Scene Lifecycle Core
//
// Everything between "a scene was requested" and "its services are ready
// for gameplay code".
//
// Responsibilities:
// - Sequence asynchronous load units per scene (`loading`)
// - Build per-scene repositories and interactors through a scoped
//   dependency container (`container`)
// - Own the scene map and drive transitions (`scene`)
//
// Notes:
// The core is single-threaded. Loading work is expressed as `!Send`
// futures polled once per frame by the owning `SceneManager`; nothing in
// here spawns threads.
//
//=========================================================================

//=== Module Declarations =================================================

pub mod container;
pub mod error;
pub mod loading;
pub mod scene;

//=== Public API ==========================================================

pub use container::{Container, DiagnosticsInfo, Lifetime, Registrations, ResolveInfo, TypeKey};
pub use error::{ConfigError, LoadError, ResolveError, SceneError};
pub use loading::{FrameDelayUnit, LoadUnit, LoadingPipeline, TimedDelayUnit};
pub use scene::{
    Interactor, Repository, SceneConfig, SceneEvent, SceneManager, SceneState, TransitionStatus,
};
