//=========================================================================
// Scene System
//=========================================================================
//
// Manages the scene lifecycle: scene map, staged loading, per-scene
// repositories and interactors.
//
// Architecture:
//   SceneManager
//     ├─ scenes: HashMap<String, Rc<SceneConfig>>
//     ├─ loader: FrameScheduler<pipeline result>
//     └─ active: Option<ActiveScene>
//                  ├─ container:    Container (scene scope)
//                  ├─ repositories: ServiceRegistry
//                  └─ interactors:  ServiceRegistry
//
// Flow:
//   load_new_scene() → teardown() → pipeline.run() (ticked by update())
//                    → create_all_repositories/interactors → initialize
//                    → SceneActive → SceneEvent::Ready
//
//=========================================================================

//=== Module Declarations =================================================

mod config;
mod events;
mod registry;
mod scene_manager;

//=== Public API ==========================================================

pub use config::{SceneConfig, SceneConfigBuilder, UnitFactory};
pub use events::{EventChannel, SceneEvent};
pub use registry::{Service, ServiceKind, ServiceRegistry};
pub use scene_manager::{SceneManager, SceneState, TransitionStatus};

//=== Service Traits ======================================================

/// Per-scene state holder, created on scene entry and dropped on exit.
///
/// Both hooks default to doing nothing. State that changes after
/// construction lives behind `Cell`/`RefCell`, since instances are shared
/// through `Rc`.
///
/// # Minimal Implementation
///
/// ```rust
/// # use railway_runner::prelude::*;
/// struct ScoreRepository {
///     score: std::cell::Cell<u32>,
/// }
///
/// impl Repository for ScoreRepository {}
/// ```
pub trait Repository: 'static {
    /// Called once after the scene's services are constructed, before the
    /// scene is marked active.
    fn initialize(&self) {}

    /// Called when the owning scene tears down.
    fn dispose(&self) {}
}

/// Per-scene use-case logic, with the same lifecycle as [`Repository`].
pub trait Interactor: 'static {
    /// Called once after the scene's services are constructed, before the
    /// scene is marked active.
    fn initialize(&self) {}

    /// Called when the owning scene tears down.
    fn dispose(&self) {}
}
