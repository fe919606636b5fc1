//=========================================================================
// Scene Config
//=========================================================================
//
// Declarative description of one scene: its repositories, interactors
// and load units.
//
// Architecture:
//   SceneConfigBuilder ──build()──> SceneConfig (immutable)
//                                     ├─ registrations()           → Registrations
//                                     ├─ build_pipeline()          → LoadingPipeline
//                                     ├─ create_all_repositories() → ServiceRegistry
//                                     └─ create_all_interactors()  → ServiceRegistry
//
// Services are registered as scene singletons, so each is constructed at
// most once per activation no matter how many dependents ask for it.
//
//=========================================================================

//=== External Dependencies ===============================================

use std::any::Any;
use std::collections::HashSet;
use std::fmt;
use std::rc::Rc;

use log::debug;

//=== Internal Dependencies ===============================================

use super::registry::ServiceEntry;
use super::{Interactor, Repository, Service, ServiceKind, ServiceRegistry};
use crate::core::container::{Container, Registrations, TypeKey};
use crate::core::error::{ConfigError, ResolveError, SceneError};
use crate::core::loading::{LoadUnit, LoadingPipeline};

//=== Declarations ========================================================

/// Builds a fresh load unit for each scene-load request.
pub type UnitFactory = Rc<dyn Fn() -> Box<dyn LoadUnit>>;

struct ServiceDecl {
    key: TypeKey,
    register: Box<dyn Fn(&mut Registrations)>,
    adopt: fn(Rc<dyn Any>) -> Option<Service>,
}

fn adopt_repository<T: Repository>(instance: Rc<dyn Any>) -> Option<Service> {
    instance
        .downcast::<T>()
        .ok()
        .map(|repository| Service::Repository(repository))
}

fn adopt_interactor<T: Interactor>(instance: Rc<dyn Any>) -> Option<Service> {
    instance
        .downcast::<T>()
        .ok()
        .map(|interactor| Service::Interactor(interactor))
}

fn declare<T, F>(factory: F, adopt: fn(Rc<dyn Any>) -> Option<Service>) -> ServiceDecl
where
    T: 'static,
    F: Fn(&mut Container) -> Result<T, ResolveError> + 'static,
{
    let factory = Rc::new(factory);
    ServiceDecl {
        key: TypeKey::of::<T>(),
        register: Box::new(move |table: &mut Registrations| {
            let factory = Rc::clone(&factory);
            table.register_singleton(move |container: &mut Container| factory(container));
        }),
        adopt,
    }
}

//=== SceneConfig =========================================================

/// Immutable description of a scene.
pub struct SceneConfig {
    name: String,
    repositories: Vec<ServiceDecl>,
    interactors: Vec<ServiceDecl>,
    stages: Vec<Vec<UnitFactory>>,
}

impl SceneConfig {
    /// Starts describing the scene called `name`.
    pub fn builder(name: impl Into<String>) -> SceneConfigBuilder {
        SceneConfigBuilder {
            name: name.into(),
            repositories: Vec::new(),
            interactors: Vec::new(),
            stages: Vec::new(),
            seen: HashSet::new(),
            error: None,
        }
    }

    /// A scene with no services and no load units.
    pub fn empty(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            repositories: Vec::new(),
            interactors: Vec::new(),
            stages: Vec::new(),
        }
    }

    //--- Queries ----------------------------------------------------------

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn repository_keys(&self) -> impl Iterator<Item = TypeKey> + '_ {
        self.repositories.iter().map(|decl| decl.key)
    }

    pub fn interactor_keys(&self) -> impl Iterator<Item = TypeKey> + '_ {
        self.interactors.iter().map(|decl| decl.key)
    }

    /// Whether the scene declares `key` as a service of `kind`.
    pub fn declares(&self, kind: ServiceKind, key: TypeKey) -> bool {
        let decls = match kind {
            ServiceKind::Repository => &self.repositories,
            ServiceKind::Interactor => &self.interactors,
        };
        decls.iter().any(|decl| decl.key == key)
    }

    /// Number of load units across all stages.
    pub fn unit_count(&self) -> usize {
        self.stages.iter().map(Vec::len).sum()
    }

    //--- Construction Products --------------------------------------------

    /// Registration table holding every service as a scene singleton.
    pub fn registrations(&self) -> Registrations {
        let mut table = Registrations::new();
        for decl in self.repositories.iter().chain(&self.interactors) {
            (decl.register)(&mut table);
        }
        table
    }

    /// Fresh pipeline with newly built load units.
    pub fn build_pipeline(&self) -> LoadingPipeline {
        self.stages
            .iter()
            .fold(LoadingPipeline::new(self.name.clone()), |pipeline, stage| {
                pipeline.with_stage(stage.iter().map(|factory| factory()).collect())
            })
    }

    /// Resolves every declared repository through `container`.
    pub fn create_all_repositories(
        &self,
        container: &mut Container,
    ) -> Result<ServiceRegistry, SceneError> {
        self.create_all(ServiceKind::Repository, &self.repositories, container)
    }

    /// Resolves every declared interactor through `container`.
    pub fn create_all_interactors(
        &self,
        container: &mut Container,
    ) -> Result<ServiceRegistry, SceneError> {
        self.create_all(ServiceKind::Interactor, &self.interactors, container)
    }

    fn create_all(
        &self,
        kind: ServiceKind,
        decls: &[ServiceDecl],
        container: &mut Container,
    ) -> Result<ServiceRegistry, SceneError> {
        let mut registry = ServiceRegistry::new(self.name.clone(), kind);

        for decl in decls {
            let instance = container.resolve_key(decl.key)?;
            let service = (decl.adopt)(Rc::clone(&instance)).ok_or(ResolveError::TypeMismatch {
                expected: decl.key.name(),
            })?;
            let sequence = container.creation_index(decl.key).unwrap_or(usize::MAX);

            debug!("{}: created {:?} {}", self.name, kind, decl.key);
            registry.insert(ServiceEntry::new(decl.key, instance, service, sequence))?;
        }

        Ok(registry)
    }
}

impl fmt::Debug for SceneConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SceneConfig")
            .field("name", &self.name)
            .field("repositories", &self.repository_keys().map(|k| k.name()).collect::<Vec<_>>())
            .field("interactors", &self.interactor_keys().map(|k| k.name()).collect::<Vec<_>>())
            .field("units", &self.unit_count())
            .finish()
    }
}

//=== SceneConfigBuilder ==================================================

/// Fluent builder for [`SceneConfig`].
///
/// Declaring the same type twice is recorded and reported by
/// [`SceneConfigBuilder::build`]; the first declaration is never silently
/// replaced.
///
/// # Example
///
/// ```rust
/// # use railway_runner::prelude::*;
/// struct Checkpoints;
/// impl Repository for Checkpoints {}
///
/// let config = SceneConfig::builder("Main")
///     .repository(|_| Ok(Checkpoints))
///     .load_unit(|| FrameDelayUnit::new("warmup", 2, true))
///     .build()
///     .unwrap();
///
/// assert_eq!(config.name(), "Main");
/// assert_eq!(config.unit_count(), 1);
/// ```
pub struct SceneConfigBuilder {
    name: String,
    repositories: Vec<ServiceDecl>,
    interactors: Vec<ServiceDecl>,
    stages: Vec<Vec<UnitFactory>>,
    seen: HashSet<TypeKey>,
    error: Option<ConfigError>,
}

impl SceneConfigBuilder {
    /// Declares a repository built by `factory`.
    pub fn repository<T, F>(mut self, factory: F) -> Self
    where
        T: Repository,
        F: Fn(&mut Container) -> Result<T, ResolveError> + 'static,
    {
        if self.claim(TypeKey::of::<T>()) {
            self.repositories.push(declare(factory, adopt_repository::<T>));
        }
        self
    }

    /// Declares an interactor built by `factory`.
    pub fn interactor<T, F>(mut self, factory: F) -> Self
    where
        T: Interactor,
        F: Fn(&mut Container) -> Result<T, ResolveError> + 'static,
    {
        if self.claim(TypeKey::of::<T>()) {
            self.interactors.push(declare(factory, adopt_interactor::<T>));
        }
        self
    }

    /// Appends a load unit as its own stage.
    pub fn load_unit<U, F>(mut self, factory: F) -> Self
    where
        U: LoadUnit + 'static,
        F: Fn() -> U + 'static,
    {
        let factory: UnitFactory = Rc::new(move || Box::new(factory()) as Box<dyn LoadUnit>);
        self.stages.push(vec![factory]);
        self
    }

    /// Appends a group of units that load interleaved with each other.
    pub fn load_stage(mut self, factories: Vec<UnitFactory>) -> Self {
        if !factories.is_empty() {
            self.stages.push(factories);
        }
        self
    }

    /// Finishes the config, failing on the first duplicate declaration.
    pub fn build(self) -> Result<SceneConfig, ConfigError> {
        if let Some(err) = self.error {
            return Err(err);
        }

        Ok(SceneConfig {
            name: self.name,
            repositories: self.repositories,
            interactors: self.interactors,
            stages: self.stages,
        })
    }

    fn claim(&mut self, key: TypeKey) -> bool {
        if self.seen.insert(key) {
            return true;
        }

        if self.error.is_none() {
            self.error = Some(ConfigError::DuplicateService {
                scene: self.name.clone(),
                service: key.name(),
            });
        }
        false
    }
}

//=========================================================================
// Tests
//=========================================================================
