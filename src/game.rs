//=========================================================================
// Railway Runner Game
//
// Main entry point and coordinator for the scene lifecycle.
//
// Architecture:
// ```text
//     GameBuilder  ──build()──>  Game  ──run()──>  [initial scene active]
//         │                        │
//         ├─ with_tps()            └─ owns SceneManager
//         ├─ with_channel_capacity()    ticks update() at TPS
//         ├─ with_scene()               until the scene is active
//         └─ with_component()
// ```
//
//=========================================================================

//=== External Dependencies ===============================================

use std::rc::Rc;
use std::thread;
use std::time::{Duration, Instant};

use log::{error, info};

//=== Internal Dependencies ===============================================

use crate::core::container::Container;
use crate::core::error::{ResolveError, SceneError};
use crate::core::scene::{SceneConfig, SceneManager, SceneState, TransitionStatus};

//=== GameBuilder =========================================================

/// Builder for configuring and constructing a [`Game`].
///
/// # Default Values
///
/// - **TPS**: 60.0 (pipeline ticks per second)
/// - **Channel capacity**: 128 undelivered scene events per subscriber
/// - **Diagnostics**: on
///
/// # Examples
///
/// ```no_run
/// use railway_runner::prelude::*;
///
/// struct Score;
/// impl Repository for Score {}
///
/// let mut game = GameBuilder::new()
///     .with_tps(120.0)
///     .with_scene(
///         SceneConfig::builder("Main")
///             .repository(|_| Ok(Score))
///             .build()
///             .unwrap(),
///     )
///     .with_initial_scene("Main")
///     .build();
///
/// game.run().unwrap();
/// ```
pub struct GameBuilder {
    tps: f64,
    channel_capacity: usize,
    diagnostics: bool,
    initial_scene: Option<String>,
    scenes: Vec<SceneConfig>,
    shared: Vec<Box<dyn FnOnce(&mut SceneManager)>>,
}

impl GameBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self {
            tps: 60.0,
            channel_capacity: 128,
            diagnostics: true,
            initial_scene: None,
            scenes: Vec::new(),
            shared: Vec::new(),
        }
    }

    /// Sets the target ticks per second used while a scene loads.
    ///
    /// Default: 60.0
    ///
    /// # Panics
    ///
    /// Panics if `tps <= 0.0`.
    pub fn with_tps(mut self, tps: f64) -> Self {
        assert!(tps > 0.0, "TPS must be positive, got {}", tps);
        self.tps = tps;
        self
    }

    /// Sets how many scene events may wait in each subscriber's queue
    /// before new ones are dropped for that subscriber.
    ///
    /// Default: 128
    ///
    /// # Panics
    ///
    /// Panics if `capacity == 0`.
    pub fn with_channel_capacity(mut self, capacity: usize) -> Self {
        assert!(capacity > 0, "Channel capacity must be positive");
        self.channel_capacity = capacity;
        self
    }

    /// Turns container build tracing on or off.
    ///
    /// Default: true
    pub fn with_diagnostics(mut self, enabled: bool) -> Self {
        self.diagnostics = enabled;
        self
    }

    /// Scene loaded by [`Game::run`].
    pub fn with_initial_scene(mut self, name: impl Into<String>) -> Self {
        self.initial_scene = Some(name.into());
        self
    }

    /// Adds a scene to the scene map.
    pub fn with_scene(mut self, config: SceneConfig) -> Self {
        self.scenes.push(config);
        self
    }

    /// Shares an existing instance with every scene.
    pub fn with_component<T: 'static>(mut self, instance: Rc<T>) -> Self {
        self.shared.push(Box::new(move |manager| {
            manager
                .shared_registrations_mut()
                .register_component(instance);
        }));
        self
    }

    /// Registers a factory whose product is shared within each scene.
    pub fn with_singleton<T, F>(mut self, factory: F) -> Self
    where
        T: 'static,
        F: Fn(&mut Container) -> Result<T, ResolveError> + 'static,
    {
        self.shared.push(Box::new(move |manager| {
            manager.shared_registrations_mut().register_singleton(factory);
        }));
        self
    }

    /// Builds the game.
    ///
    /// Scenes are declared on the owned [`SceneManager`] but the scene map
    /// is only built by [`Game::run`] (or [`Game::init`]).
    pub fn build(self) -> Game {
        info!(
            "Building game (TPS: {}, channel: {}, diagnostics: {})",
            self.tps, self.channel_capacity, self.diagnostics
        );

        let mut scene_manager = SceneManager::with_settings(self.channel_capacity, self.diagnostics);
        for register in self.shared {
            register(&mut scene_manager);
        }

        if let Some(initial) = self.initial_scene {
            scene_manager.set_initial_scene(initial);
        }

        Game {
            scene_manager,
            pending: self.scenes,
            tps: self.tps,
            channel_capacity: self.channel_capacity,
        }
    }
}

impl Default for GameBuilder {
    fn default() -> Self {
        Self::new()
    }
}

//=== Game ================================================================

/// Railway Runner runtime.
///
/// Owns the [`SceneManager`]; gameplay code borrows it through
/// [`Game::scene_manager`].
pub struct Game {
    scene_manager: SceneManager,
    pending: Vec<SceneConfig>,
    tps: f64,
    channel_capacity: usize,
}

impl Game {
    //--- Initialization ---------------------------------------------------

    /// Declares the configured scenes and builds the scene map.
    ///
    /// Calling it again after success is an [`SceneError::InvalidState`].
    pub fn init(&mut self) -> Result<(), SceneError> {
        info!("Initializing scene map");

        for config in self.pending.drain(..) {
            self.scene_manager.register_scene(config)?;
        }
        self.scene_manager.init_scenes_map()
    }

    //--- Execution --------------------------------------------------------

    /// Builds the scene map, loads the initial scene and blocks until it is
    /// active.
    ///
    /// # Lifecycle
    ///
    /// 1. `init_scenes_map()`
    /// 2. `load_current_scene()`
    /// 3. One `update()` per tick at the configured TPS
    /// 4. Returns once the scene is active, or with the first error
    pub fn run(&mut self) -> Result<(), SceneError> {
        info!("Starting game (TPS: {})", self.tps);

        //--- 1. Scene map -------------------------------------------------
        if self.scene_manager.state() == &SceneState::Uninitialized {
            self.init()?;
        }

        //--- 2. Initial scene ---------------------------------------------
        self.scene_manager.load_current_scene()?;

        //--- 3. Tick until active -----------------------------------------
        let frame_duration = Duration::from_secs_f64(1.0 / self.tps);
        loop {
            let frame_start = Instant::now();

            match self.tick() {
                Ok(TransitionStatus::Activated(scene)) => {
                    info!("Game running in scene {}", scene);
                    return Ok(());
                }
                Ok(TransitionStatus::Idle) => return Ok(()),
                Ok(TransitionStatus::Loading { .. }) => {}
                Err(err) => {
                    error!("Initial scene failed to load: {}", err);
                    return Err(err);
                }
            }

            //--- 4. Maintain pacing ---------------------------------------
            let elapsed = frame_start.elapsed();
            if elapsed < frame_duration {
                thread::sleep(frame_duration - elapsed);
            }
        }
    }

    /// Advances the running transition by one frame.
    pub fn tick(&mut self) -> Result<TransitionStatus, SceneError> {
        self.scene_manager.update()
    }

    //--- Accessors --------------------------------------------------------

    pub fn scene_manager(&self) -> &SceneManager {
        &self.scene_manager
    }

    pub fn scene_manager_mut(&mut self) -> &mut SceneManager {
        &mut self.scene_manager
    }

    pub fn tps(&self) -> f64 {
        self.tps
    }

    pub fn channel_capacity(&self) -> usize {
        self.channel_capacity
    }
}

//=========================================================================
// Unit Tests
//=========================================================================
