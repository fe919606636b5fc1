//=========================================================================
// Scene Manager
//=========================================================================
//
// State machine owning the scene map, the in-flight loading pipeline and
// the active scene's services.
//
// States:
//   Uninitialized ─init_scenes_map()─> SceneMapReady
//   SceneMapReady | SceneActive(_) ─load_new_scene()─> Loading(name)
//   Loading(name) ─pipeline done + services built─> SceneActive(name)
//   Loading(name) ─failure─> SceneMapReady
//
// Ordering per transition:
//   teardown(previous) → pipeline (ticked by update()) → repositories
//   → interactors → initialize → swap in → SceneEvent::Ready
//
//=========================================================================

//=== External Dependencies ===============================================

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::future::poll_fn;
use std::rc::Rc;
use std::task::{Context, Poll};

use crossbeam_channel::Receiver;
use futures::task::noop_waker_ref;
use log::{debug, error, info, warn};

//=== Internal Dependencies ===============================================

use super::registry::ActiveScene;
use super::{EventChannel, SceneConfig, SceneEvent, ServiceKind, ServiceRegistry};
use crate::core::container::{Container, DiagnosticsInfo, LogSink, Registrations, TypeKey};
use crate::core::error::{ConfigError, LoadError, SceneError};
use crate::core::loading::{FrameScheduler, LoadProgress, PipelineReport};

//=== SceneState ==========================================================

/// Lifecycle state of the [`SceneManager`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SceneState {
    /// Scenes are being declared; nothing can load yet.
    Uninitialized,

    /// The scene map is built and no scene is active.
    SceneMapReady,

    /// A transition towards the named scene is running.
    Loading(String),

    /// The named scene is active.
    SceneActive(String),
}

impl fmt::Display for SceneState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Uninitialized => f.write_str("Uninitialized"),
            Self::SceneMapReady => f.write_str("SceneMapReady"),
            Self::Loading(name) => write!(f, "Loading({name})"),
            Self::SceneActive(name) => write!(f, "SceneActive({name})"),
        }
    }
}

//=== TransitionStatus ====================================================

/// Result of one [`SceneManager::update`] tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransitionStatus {
    /// No transition is running.
    Idle,

    /// The pipeline is still running.
    Loading {
        scene: String,
        loaded: usize,
        total: usize,
    },

    /// The named scene became active during this tick.
    Activated(String),
}

//=== SceneManager ========================================================

/// Owns scene configs and drives scene transitions.
///
/// Constructed explicitly and passed by reference to whatever needs it;
/// there is no process-wide instance.
pub struct SceneManager {
    state: SceneState,
    declared: Vec<SceneConfig>,
    scenes: HashMap<String, Rc<SceneConfig>>,
    initial_scene: Option<String>,
    shared: Registrations,
    active: Option<ActiveScene>,
    loader: FrameScheduler<Result<PipelineReport, LoadError>>,
    progress: LoadProgress,
    last_report: Option<PipelineReport>,
    last_active: Option<String>,
    events: EventChannel,
    diagnostics: bool,
}

impl SceneManager {
    //--- Construction -----------------------------------------------------

    /// Creates a manager with diagnostics on and room for 128 undelivered
    /// events.
    pub fn new() -> Self {
        Self::with_settings(128, true)
    }

    /// Creates a manager with an explicit event capacity and diagnostics
    /// switch.
    pub fn with_settings(event_capacity: usize, diagnostics: bool) -> Self {
        Self {
            state: SceneState::Uninitialized,
            declared: Vec::new(),
            scenes: HashMap::new(),
            initial_scene: None,
            shared: Registrations::new(),
            active: None,
            loader: FrameScheduler::new(),
            progress: LoadProgress::default(),
            last_report: None,
            last_active: None,
            events: EventChannel::new(event_capacity),
            diagnostics,
        }
    }

    //--- Registration -----------------------------------------------------

    /// Declares a scene. Only valid before [`SceneManager::init_scenes_map`].
    pub fn register_scene(&mut self, config: SceneConfig) -> Result<(), SceneError> {
        self.expect_uninitialized("register_scene")?;
        debug!("Declared scene {}", config.name());
        self.declared.push(config);
        Ok(())
    }

    /// Declares a scene and makes it the one [`SceneManager::load_current_scene`]
    /// loads.
    pub fn register_default(&mut self, config: SceneConfig) -> Result<(), SceneError> {
        let name = config.name().to_string();
        self.register_scene(config)?;
        if let Some(previous) = self.initial_scene.replace(name) {
            warn!("Initial scene {} replaced", previous);
        }
        Ok(())
    }

    /// Sets the scene loaded by [`SceneManager::load_current_scene`].
    pub fn set_initial_scene(&mut self, name: impl Into<String>) {
        self.initial_scene = Some(name.into());
    }

    /// Registrations shared by every scene scope (views, game-wide
    /// singletons). Scene services override entries of the same type.
    pub fn shared_registrations_mut(&mut self) -> &mut Registrations {
        &mut self.shared
    }

    /// Builds the scene map from the declared configs.
    pub fn init_scenes_map(&mut self) -> Result<(), SceneError> {
        self.expect_uninitialized("init_scenes_map")?;

        let mut names = HashSet::new();
        for config in &self.declared {
            if !names.insert(config.name()) {
                error!("Scene {} is declared more than once", config.name());
                return Err(ConfigError::DuplicateScene(config.name().to_string()).into());
            }
        }

        if let Some(initial) = &self.initial_scene {
            if !names.contains(initial.as_str()) {
                return Err(ConfigError::UnknownScene(initial.clone()).into());
            }
        }

        self.scenes = self
            .declared
            .drain(..)
            .map(|config| (config.name().to_string(), Rc::new(config)))
            .collect();
        self.state = SceneState::SceneMapReady;

        info!("Scene map ready ({} scenes)", self.scenes.len());
        Ok(())
    }

    //--- Transitions ------------------------------------------------------

    /// Starts loading the initial scene.
    pub fn load_current_scene(&mut self) -> Result<(), SceneError> {
        let name = self.initial_scene.clone().ok_or(SceneError::NoInitialScene)?;
        self.load_new_scene(&name)
    }

    /// Starts a transition towards `name`.
    ///
    /// Validates the request, tears down the active scene and installs the
    /// new scene's pipeline. The pipeline advances on [`SceneManager::update`]
    /// (or by awaiting [`SceneManager::finish_loading`]).
    ///
    /// Errors returned here leave the active scene untouched. A failure
    /// reported later by `update` (unit error, resolution error, cycle)
    /// happens after teardown and leaves no scene active.
    pub fn load_new_scene(&mut self, name: &str) -> Result<(), SceneError> {
        match &self.state {
            SceneState::Uninitialized => return Err(SceneError::NotInitialized),
            SceneState::Loading(loading) => {
                warn!("Rejected load of {} while {} is loading", name, loading);
                return Err(SceneError::TransitionInProgress {
                    requested: name.to_string(),
                    loading: loading.clone(),
                });
            }
            SceneState::SceneMapReady | SceneState::SceneActive(_) => {}
        }

        let config = self
            .scenes
            .get(name)
            .cloned()
            .ok_or_else(|| ConfigError::UnknownScene(name.to_string()))?;

        let from = self.current_scene().map(str::to_string);
        info!("Scene transition {} -> {} started", from.as_deref().unwrap_or("<none>"), name);
        self.events.publish(SceneEvent::TransitionStarted {
            from,
            to: name.to_string(),
        });

        self.teardown();

        let pipeline = config.build_pipeline().with_events(self.events.clone());
        self.progress = pipeline.progress();
        self.loader.spawn(pipeline.run());
        self.state = SceneState::Loading(name.to_string());
        Ok(())
    }

    /// Starts loading the initial scene and waits for it to become active.
    pub async fn load_current_scene_async(&mut self) -> Result<(), SceneError> {
        self.load_current_scene()?;
        self.finish_loading().await
    }

    /// Starts a transition towards `name` and waits for it to complete.
    pub async fn load_new_scene_async(&mut self, name: &str) -> Result<(), SceneError> {
        self.load_new_scene(name)?;
        self.finish_loading().await
    }

    /// Resolves when the running transition completes. Resolves at once
    /// when nothing is loading.
    pub async fn finish_loading(&mut self) -> Result<(), SceneError> {
        poll_fn(|cx| self.poll_transition(cx)).await
    }

    /// Advances the running transition by one frame.
    pub fn update(&mut self) -> Result<TransitionStatus, SceneError> {
        let SceneState::Loading(scene) = &self.state else {
            return Ok(TransitionStatus::Idle);
        };
        let scene = scene.clone();

        let mut cx = Context::from_waker(noop_waker_ref());
        match self.poll_transition(&mut cx) {
            Poll::Pending => Ok(TransitionStatus::Loading {
                scene,
                loaded: self.progress.loaded(),
                total: self.progress.total(),
            }),
            Poll::Ready(result) => result.map(|()| TransitionStatus::Activated(scene)),
        }
    }

    fn poll_transition(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), SceneError>> {
        let SceneState::Loading(scene) = &self.state else {
            return Poll::Ready(Ok(()));
        };
        let scene = scene.clone();

        match self.loader.poll_task(cx) {
            Poll::Pending => Poll::Pending,
            Poll::Ready(result) => Poll::Ready(self.complete_transition(scene, result)),
        }
    }

    //--- complete_transition() --------------------------------------------
    //
    // Builds the new scene once its pipeline is done and swaps it in, or
    // abandons the transition.
    //
    fn complete_transition(
        &mut self,
        scene: String,
        result: Result<PipelineReport, LoadError>,
    ) -> Result<(), SceneError> {
        let outcome = result
            .map_err(SceneError::from)
            .and_then(|report| self.activate(&scene).map(|active| (active, report)));

        match outcome {
            Ok((active, report)) => {
                self.active = Some(active);
                self.state = SceneState::SceneActive(scene.clone());
                self.last_active = Some(scene.clone());
                info!("Scene {} active after {:?}", scene, report.elapsed);
                self.last_report = Some(report);
                self.events.publish(SceneEvent::Ready(scene));
                Ok(())
            }
            Err(err) => {
                error!("Scene transition to {} failed: {}", scene, err);
                self.state = SceneState::SceneMapReady;
                self.events.publish(SceneEvent::TransitionFailed {
                    scene,
                    reason: err.to_string(),
                });
                Err(err)
            }
        }
    }

    fn activate(&self, scene: &str) -> Result<ActiveScene, SceneError> {
        let config = self
            .scenes
            .get(scene)
            .ok_or_else(|| ConfigError::UnknownScene(scene.to_string()))?;

        let mut table = self.shared.clone();
        table.merge(&config.registrations());

        let mut container = Container::new(scene, table);
        if self.diagnostics {
            container = container.with_diagnostics(Box::new(LogSink));
        }

        let repositories = config.create_all_repositories(&mut container)?;
        let interactors = config.create_all_interactors(&mut container)?;
        let active = ActiveScene {
            name: scene.to_string(),
            container,
            repositories,
            interactors,
        };

        if let Err(err) = active.initialize_all() {
            active.teardown();
            return Err(err);
        }
        Ok(active)
    }

    /// Tears down the active scene's services in reverse creation order.
    ///
    /// Returns `false` (and does nothing) when no scene is active.
    pub fn teardown(&mut self) -> bool {
        let Some(active) = self.active.take() else {
            return false;
        };

        info!("Tearing down scene {}", active.name);
        self.events.publish(SceneEvent::TearingDown(active.name.clone()));
        active.teardown();

        if matches!(self.state, SceneState::SceneActive(_)) {
            self.state = SceneState::SceneMapReady;
        }
        true
    }

    //--- Service Lookup ---------------------------------------------------

    /// Returns the active scene's repository of type `T`.
    pub fn get_repository<T: 'static>(&self) -> Result<Rc<T>, SceneError> {
        self.lookup::<T>(ServiceKind::Repository)
    }

    /// Returns the active scene's interactor of type `T`.
    pub fn get_interactor<T: 'static>(&self) -> Result<Rc<T>, SceneError> {
        self.lookup::<T>(ServiceKind::Interactor)
    }

    fn lookup<T: 'static>(&self, kind: ServiceKind) -> Result<Rc<T>, SceneError> {
        if let Some(active) = &self.active {
            return match kind {
                ServiceKind::Repository => active.repositories.get::<T>(),
                ServiceKind::Interactor => active.interactors.get::<T>(),
            };
        }

        let key = TypeKey::of::<T>();
        if let SceneState::Loading(scene) = &self.state {
            let declared = self
                .scenes
                .get(scene)
                .is_some_and(|config| config.declares(kind, key));
            if declared {
                return Err(SceneError::NotConstructed {
                    service: key.name(),
                    scene: scene.clone(),
                });
            }
        }

        Err(SceneError::NotRegistered { service: key.name() })
    }

    //--- Queries ----------------------------------------------------------

    pub fn state(&self) -> &SceneState {
        &self.state
    }

    /// Name of the active scene.
    pub fn current_scene(&self) -> Option<&str> {
        self.active.as_ref().map(|active| active.name.as_str())
    }

    /// Last scene that became active, even if it has since been torn down.
    pub fn last_active_scene(&self) -> Option<&str> {
        self.last_active.as_deref()
    }

    pub fn is_loading(&self) -> bool {
        matches!(self.state, SceneState::Loading(_))
    }

    /// Progress of the running (or last) pipeline.
    pub fn loading_progress(&self) -> &LoadProgress {
        &self.progress
    }

    /// Report of the last completed pipeline.
    pub fn last_report(&self) -> Option<&PipelineReport> {
        self.last_report.as_ref()
    }

    pub fn repositories(&self) -> Option<&ServiceRegistry> {
        self.active.as_ref().map(|active| &active.repositories)
    }

    pub fn interactors(&self) -> Option<&ServiceRegistry> {
        self.active.as_ref().map(|active| &active.interactors)
    }

    /// Build trees recorded while activating the current scene.
    pub fn last_traces(&self) -> &[DiagnosticsInfo] {
        self.active.as_ref().map(ActiveScene::traces).unwrap_or(&[])
    }

    /// Scene names in the map, sorted.
    pub fn scene_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.scenes.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Receiver for lifecycle notifications published from now on.
    pub fn subscribe(&self) -> Receiver<SceneEvent> {
        self.events.subscribe()
    }

    fn expect_uninitialized(&self, operation: &'static str) -> Result<(), SceneError> {
        match self.state {
            SceneState::Uninitialized => Ok(()),
            _ => Err(SceneError::InvalidState {
                operation,
                state: self.state.to_string(),
            }),
        }
    }
}

impl Default for SceneManager {
    fn default() -> Self {
        Self::new()
    }
}

//=========================================================================
// Tests
//=========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::ResolveError;
    use crate::core::loading::{next_frame, FrameDelayUnit, LoadFuture, LoadUnit};
    use crate::core::scene::{Interactor, Repository};
    use futures::FutureExt;
    use std::cell::{Cell, RefCell};

    //--- Fixtures ---------------------------------------------------------

    type Journal = Rc<RefCell<Vec<String>>>;

    struct Rails {
        journal: Journal,
        initialized: Cell<bool>,
    }

    impl Repository for Rails {
        fn initialize(&self) {
            self.initialized.set(true);
            self.journal.borrow_mut().push("init Rails".into());
        }

        fn dispose(&self) {
            self.journal.borrow_mut().push("dispose Rails".into());
        }
    }

    struct Ride {
        _rails: Rc<Rails>,
        journal: Journal,
    }

    impl Interactor for Ride {
        fn initialize(&self) {
            self.journal.borrow_mut().push("init Ride".into());
        }

        fn dispose(&self) {
            self.journal.borrow_mut().push("dispose Ride".into());
        }
    }

    struct Menu;
    impl Repository for Menu {}

    struct Echo;
    impl Interactor for Echo {}

    struct BrokenUnit;

    impl LoadUnit for BrokenUnit {
        fn name(&self) -> &str {
            "broken"
        }

        fn is_loaded(&self) -> bool {
            false
        }

        fn load(&mut self) -> LoadFuture<'_> {
            async {
                next_frame().await;
                Err(LoadError::UnitFailed {
                    unit: "broken".into(),
                    reason: "missing archive".into(),
                })
            }
            .boxed_local()
        }
    }

    fn railway(journal: &Journal) -> SceneConfig {
        let (j1, j2) = (Rc::clone(journal), Rc::clone(journal));
        SceneConfig::builder("Railway")
            .repository(move |_| {
                Ok(Rails {
                    journal: Rc::clone(&j1),
                    initialized: Cell::new(false),
                })
            })
            .interactor(move |c| {
                Ok(Ride {
                    _rails: c.resolve::<Rails>()?,
                    journal: Rc::clone(&j2),
                })
            })
            .load_unit(|| FrameDelayUnit::new("terrain", 2, true))
            .build()
            .unwrap()
    }

    fn menu() -> SceneConfig {
        SceneConfig::builder("Menu")
            .repository(|_| Ok(Menu))
            .build()
            .unwrap()
    }

    fn manager(journal: &Journal) -> SceneManager {
        let mut manager = SceneManager::with_settings(64, false);
        manager.register_default(railway(journal)).unwrap();
        manager.register_scene(menu()).unwrap();
        manager.register_scene(SceneConfig::empty("SampleScene")).unwrap();
        manager.init_scenes_map().unwrap();
        manager
    }

    fn run_to_completion(manager: &mut SceneManager) -> Result<TransitionStatus, SceneError> {
        loop {
            match manager.update()? {
                TransitionStatus::Loading { .. } => continue,
                status => return Ok(status),
            }
        }
    }

    //--- Scene Map --------------------------------------------------------

    #[test]
    fn init_scenes_map_moves_to_ready() {
        let manager = manager(&Journal::default());
        assert_eq!(manager.state(), &SceneState::SceneMapReady);
        assert_eq!(manager.scene_names(), ["Menu", "Railway", "SampleScene"]);
    }

    #[test]
    fn duplicate_scene_name_fails_init() {
        let mut manager = SceneManager::new();
        manager.register_scene(menu()).unwrap();
        manager.register_scene(menu()).unwrap();

        assert_eq!(
            manager.init_scenes_map(),
            Err(ConfigError::DuplicateScene("Menu".into()).into())
        );
        assert_eq!(manager.state(), &SceneState::Uninitialized);
    }

    #[test]
    fn registration_after_init_is_rejected() {
        let mut manager = manager(&Journal::default());
        assert!(matches!(
            manager.register_scene(menu()),
            Err(SceneError::InvalidState { .. })
        ));
        assert!(matches!(
            manager.init_scenes_map(),
            Err(SceneError::InvalidState { .. })
        ));
    }

    #[test]
    fn loading_before_init_fails() {
        let mut manager = SceneManager::new();
        assert_eq!(manager.load_new_scene("Menu"), Err(SceneError::NotInitialized));
    }

    #[test]
    fn unknown_scene_is_a_config_error() {
        let mut manager = manager(&Journal::default());
        assert_eq!(
            manager.load_new_scene("Nowhere"),
            Err(ConfigError::UnknownScene("Nowhere".into()).into())
        );
        assert_eq!(manager.state(), &SceneState::SceneMapReady);
    }

    #[test]
    fn rejected_request_keeps_active_scene() {
        let journal = Journal::default();
        let mut manager = manager(&journal);
        pollster::block_on(manager.load_new_scene_async("Railway")).unwrap();
        let rails = manager.get_repository::<Rails>().unwrap();
        let events = manager.subscribe();

        assert_eq!(
            manager.load_new_scene("Nowhere"),
            Err(ConfigError::UnknownScene("Nowhere".into()).into())
        );

        assert_eq!(manager.state(), &SceneState::SceneActive("Railway".into()));
        assert!(Rc::ptr_eq(&rails, &manager.get_repository::<Rails>().unwrap()));
        assert!(!journal.borrow().iter().any(|entry| entry.starts_with("dispose")));
        assert!(events.try_recv().is_err());
    }

    //--- Transitions ------------------------------------------------------

    #[test]
    fn current_scene_loads_through_states() {
        let journal = Journal::default();
        let mut manager = manager(&journal);

        manager.load_current_scene().unwrap();
        assert_eq!(manager.state(), &SceneState::Loading("Railway".into()));

        assert_eq!(
            manager.update(),
            Ok(TransitionStatus::Loading {
                scene: "Railway".into(),
                loaded: 0,
                total: 1
            })
        );
        assert!(manager.update().unwrap() != TransitionStatus::Activated("Railway".into()));
        assert_eq!(
            manager.update(),
            Ok(TransitionStatus::Activated("Railway".into()))
        );
        assert_eq!(manager.state(), &SceneState::SceneActive("Railway".into()));
        assert_eq!(manager.update(), Ok(TransitionStatus::Idle));

        let rails = manager.get_repository::<Rails>().unwrap();
        assert!(rails.initialized.get());
        assert_eq!(*journal.borrow(), ["init Rails", "init Ride"]);
    }

    #[test]
    fn empty_scene_activates() {
        let mut manager = manager(&Journal::default());
        manager.load_new_scene("SampleScene").unwrap();

        assert_eq!(
            manager.update(),
            Ok(TransitionStatus::Activated("SampleScene".into()))
        );
        assert!(manager.repositories().is_some_and(ServiceRegistry::is_empty));
        assert!(manager.interactors().is_some_and(ServiceRegistry::is_empty));
    }

    #[test]
    fn concurrent_transition_is_rejected() {
        let mut manager = manager(&Journal::default());
        manager.load_new_scene("Railway").unwrap();

        assert_eq!(
            manager.load_new_scene("Menu"),
            Err(SceneError::TransitionInProgress {
                requested: "Menu".into(),
                loading: "Railway".into()
            })
        );
        assert_eq!(
            run_to_completion(&mut manager),
            Ok(TransitionStatus::Activated("Railway".into()))
        );
    }

    #[test]
    fn previous_scene_is_torn_down_before_loading() {
        let journal = Journal::default();
        let mut manager = manager(&journal);
        let events = manager.subscribe();

        pollster::block_on(manager.load_new_scene_async("Railway")).unwrap();
        journal.borrow_mut().clear();
        while events.try_recv().is_ok() {}

        manager.load_new_scene("Menu").unwrap();

        // Teardown happened synchronously, before any unit was polled.
        assert_eq!(*journal.borrow(), ["dispose Ride", "dispose Rails"]);
        assert_eq!(
            events.try_iter().collect::<Vec<_>>(),
            [
                SceneEvent::TransitionStarted {
                    from: Some("Railway".into()),
                    to: "Menu".into()
                },
                SceneEvent::TearingDown("Railway".into()),
            ]
        );
        assert!(matches!(
            manager.get_repository::<Rails>(),
            Err(SceneError::NotRegistered { .. })
        ));
    }

    #[test]
    fn round_trip_yields_fresh_instances_with_same_types() {
        let journal = Journal::default();
        let mut manager = manager(&journal);

        pollster::block_on(manager.load_new_scene_async("Railway")).unwrap();
        let first = manager.get_repository::<Rails>().unwrap();
        let first_keys: Vec<_> = manager.repositories().unwrap().keys().collect();

        pollster::block_on(manager.load_new_scene_async("Menu")).unwrap();
        assert!(manager.get_repository::<Rails>().is_err());
        assert!(manager.get_repository::<Menu>().is_ok());

        pollster::block_on(manager.load_new_scene_async("Railway")).unwrap();
        let second = manager.get_repository::<Rails>().unwrap();
        let second_keys: Vec<_> = manager.repositories().unwrap().keys().collect();

        assert_eq!(first_keys, second_keys);
        assert!(!Rc::ptr_eq(&first, &second));
    }

    #[test]
    fn explicit_teardown_is_idempotent() {
        let journal = Journal::default();
        let mut manager = manager(&journal);
        pollster::block_on(manager.load_current_scene_async()).unwrap();

        assert!(manager.teardown());
        assert_eq!(manager.state(), &SceneState::SceneMapReady);
        assert!(!manager.teardown());
        assert_eq!(manager.state(), &SceneState::SceneMapReady);
        assert_eq!(manager.last_active_scene(), Some("Railway"));
        assert_eq!(journal.borrow().iter().filter(|e| e.starts_with("dispose")).count(), 2);
    }

    #[test]
    fn ready_event_published_exactly_once() {
        let mut manager = manager(&Journal::default());
        let events = manager.subscribe();

        manager.load_current_scene().unwrap();
        run_to_completion(&mut manager).unwrap();
        manager.update().unwrap();
        manager.update().unwrap();

        let ready = events
            .try_iter()
            .filter(|event| matches!(event, SceneEvent::Ready(_)))
            .count();
        assert_eq!(ready, 1);
    }

    #[test]
    fn late_subscriber_sees_only_its_transition() {
        let mut manager = SceneManager::with_settings(8, false);
        manager.register_scene(menu()).unwrap();
        manager.register_scene(SceneConfig::empty("SampleScene")).unwrap();
        manager.init_scenes_map().unwrap();

        for scene in ["Menu", "SampleScene", "Menu", "SampleScene", "Menu"] {
            pollster::block_on(manager.load_new_scene_async(scene)).unwrap();
        }

        let events = manager.subscribe();
        pollster::block_on(manager.load_new_scene_async("SampleScene")).unwrap();

        assert_eq!(
            events.try_iter().collect::<Vec<_>>(),
            [
                SceneEvent::TransitionStarted {
                    from: Some("Menu".into()),
                    to: "SampleScene".into()
                },
                SceneEvent::TearingDown("Menu".into()),
                SceneEvent::Ready("SampleScene".into()),
            ]
        );
    }

    #[test]
    fn every_subscriber_sees_ready() {
        let mut manager = manager(&Journal::default());
        let view = manager.subscribe();
        let hud = manager.subscribe();

        pollster::block_on(manager.load_new_scene_async("Menu")).unwrap();

        for events in [view, hud] {
            assert!(events
                .try_iter()
                .any(|event| event == SceneEvent::Ready("Menu".into())));
        }
    }

    //--- Lookup -----------------------------------------------------------

    #[test]
    fn lookup_distinguishes_unregistered_from_unconstructed() {
        let mut manager = manager(&Journal::default());
        manager.load_new_scene("Railway").unwrap();

        assert!(matches!(
            manager.get_repository::<Rails>(),
            Err(SceneError::NotConstructed { .. })
        ));
        assert!(matches!(
            manager.get_repository::<Menu>(),
            Err(SceneError::NotRegistered { .. })
        ));
        assert!(matches!(
            manager.get_interactor::<Rails>(),
            Err(SceneError::NotRegistered { .. })
        ));
    }

    //--- Failures ---------------------------------------------------------

    #[test]
    fn unit_failure_abandons_transition() {
        let mut manager = SceneManager::with_settings(16, false);
        manager
            .register_scene(
                SceneConfig::builder("Broken")
                    .repository(|_| Ok(Menu))
                    .load_unit(|| BrokenUnit)
                    .build()
                    .unwrap(),
            )
            .unwrap();
        manager.register_scene(menu()).unwrap();
        manager.init_scenes_map().unwrap();
        let events = manager.subscribe();

        pollster::block_on(manager.load_new_scene_async("Menu")).unwrap();
        let result = pollster::block_on(manager.load_new_scene_async("Broken"));

        assert!(matches!(result, Err(SceneError::Load(LoadError::UnitFailed { .. }))));
        assert_eq!(manager.state(), &SceneState::SceneMapReady);
        assert_eq!(manager.current_scene(), None);
        assert_eq!(manager.last_active_scene(), Some("Menu"));
        assert!(events
            .try_iter()
            .any(|event| matches!(event, SceneEvent::TransitionFailed { .. })));

        // The caller may retry at its discretion.
        pollster::block_on(manager.load_new_scene_async("Menu")).unwrap();
        assert_eq!(manager.current_scene(), Some("Menu"));
    }

    #[test]
    fn cyclic_interactor_fails_activation() {
        let mut manager = SceneManager::with_settings(16, true);
        manager
            .register_scene(
                SceneConfig::builder("Loop")
                    .interactor(|c| {
                        c.resolve::<Echo>()?;
                        Ok(Echo)
                    })
                    .build()
                    .unwrap(),
            )
            .unwrap();
        manager.init_scenes_map().unwrap();

        manager.load_new_scene("Loop").unwrap();
        assert!(matches!(
            manager.update(),
            Err(SceneError::Resolve(ResolveError::Cycle { .. }))
        ));
        assert_eq!(manager.state(), &SceneState::SceneMapReady);
    }

    #[test]
    fn shared_components_reach_scene_factories() {
        struct Viewport(u32);
        struct Camera {
            width: u32,
        }
        impl Interactor for Camera {}

        let mut manager = SceneManager::with_settings(16, true);
        manager
            .shared_registrations_mut()
            .register_component(Rc::new(Viewport(640)));
        manager
            .register_scene(
                SceneConfig::builder("View")
                    .interactor(|c| {
                        Ok(Camera {
                            width: c.resolve::<Viewport>()?.0,
                        })
                    })
                    .build()
                    .unwrap(),
            )
            .unwrap();
        manager.init_scenes_map().unwrap();

        pollster::block_on(manager.load_new_scene_async("View")).unwrap();
        assert_eq!(manager.get_interactor::<Camera>().unwrap().width, 640);
        assert_eq!(manager.last_traces().len(), 1);
        assert_eq!(manager.last_traces()[0].node_count(), 2);
    }
}
