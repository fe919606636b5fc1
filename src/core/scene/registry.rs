//=========================================================================
// Service Registry
//=========================================================================
//
// Type-keyed storage for the repositories and interactors of one scene
// activation.
//
// Architecture:
//   ServiceRegistry
//     ├─ entries: Vec<ServiceEntry>      (insertion order)
//     └─ index:   HashMap<TypeId, usize>
//
//   ServiceEntry = Rc<dyn Any> (typed lookup)
//                + Service    (lifecycle hooks)
//                + sequence   (container creation order)
//
// ActiveScene bundles both registries with the scope container, so a
// whole scene is swapped in or out in one assignment.
//
//=========================================================================

//=== External Dependencies ===============================================

use std::any::{type_name, Any, TypeId};
use std::cell::Cell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use log::debug;

//=== Internal Dependencies ===============================================

use super::{Interactor, Repository};
use crate::core::container::{Container, DiagnosticsInfo, TypeKey};
use crate::core::error::{ConfigError, ResolveError, SceneError};

//=== ServiceKind / Service ===============================================

/// Which registry a service belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ServiceKind {
    Repository,
    Interactor,
}

/// Lifecycle view of a stored service.
#[derive(Clone)]
pub enum Service {
    Repository(Rc<dyn Repository>),
    Interactor(Rc<dyn Interactor>),
}

impl Service {
    pub fn kind(&self) -> ServiceKind {
        match self {
            Service::Repository(_) => ServiceKind::Repository,
            Service::Interactor(_) => ServiceKind::Interactor,
        }
    }

    fn initialize(&self) {
        match self {
            Service::Repository(repository) => repository.initialize(),
            Service::Interactor(interactor) => interactor.initialize(),
        }
    }

    fn dispose(&self) {
        match self {
            Service::Repository(repository) => repository.dispose(),
            Service::Interactor(interactor) => interactor.dispose(),
        }
    }
}

impl fmt::Debug for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Service::{:?}", self.kind())
    }
}

//=== ServiceEntry ========================================================

pub(crate) struct ServiceEntry {
    key: TypeKey,
    instance: Rc<dyn Any>,
    service: Service,
    sequence: usize,
    initialized: Cell<bool>,
}

impl ServiceEntry {
    pub(crate) fn new(key: TypeKey, instance: Rc<dyn Any>, service: Service, sequence: usize) -> Self {
        Self {
            key,
            instance,
            service,
            sequence,
            initialized: Cell::new(false),
        }
    }

    fn initialize(&self) -> Result<(), SceneError> {
        if self.initialized.get() {
            return Err(SceneError::AlreadyInitialized {
                service: self.key.name(),
            });
        }

        self.initialized.set(true);
        self.service.initialize();
        Ok(())
    }
}

//=== ServiceRegistry =====================================================

/// Repositories or interactors of one scene, keyed by type.
pub struct ServiceRegistry {
    scene: String,
    kind: ServiceKind,
    entries: Vec<ServiceEntry>,
    index: HashMap<TypeId, usize>,
}

impl ServiceRegistry {
    pub fn new(scene: impl Into<String>, kind: ServiceKind) -> Self {
        Self {
            scene: scene.into(),
            kind,
            entries: Vec::new(),
            index: HashMap::new(),
        }
    }

    //--- Insertion --------------------------------------------------------

    /// Adds an entry; a second entry for the same type is rejected.
    pub(crate) fn insert(&mut self, entry: ServiceEntry) -> Result<(), ConfigError> {
        if self.index.contains_key(&entry.key.id()) {
            return Err(ConfigError::DuplicateService {
                scene: self.scene.clone(),
                service: entry.key.name(),
            });
        }

        self.index.insert(entry.key.id(), self.entries.len());
        self.entries.push(entry);
        Ok(())
    }

    //--- Typed Lookup -----------------------------------------------------

    /// Returns the instance registered for `T`.
    pub fn get<T: 'static>(&self) -> Result<Rc<T>, SceneError> {
        let entry = self
            .index
            .get(&TypeId::of::<T>())
            .map(|&slot| &self.entries[slot])
            .ok_or(SceneError::NotRegistered {
                service: type_name::<T>(),
            })?;

        Rc::clone(&entry.instance)
            .downcast::<T>()
            .map_err(|_| {
                ResolveError::TypeMismatch {
                    expected: type_name::<T>(),
                }
                .into()
            })
    }

    pub fn contains<T: 'static>(&self) -> bool {
        self.index.contains_key(&TypeId::of::<T>())
    }

    /// `Some(initialized)` when `T` is registered.
    pub fn is_initialized<T: 'static>(&self) -> Option<bool> {
        self.index
            .get(&TypeId::of::<T>())
            .map(|&slot| self.entries[slot].initialized.get())
    }

    //--- Queries ----------------------------------------------------------

    pub fn scene(&self) -> &str {
        &self.scene
    }

    pub fn kind(&self) -> ServiceKind {
        self.kind
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Registered type keys in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = TypeKey> + '_ {
        self.entries.iter().map(|entry| entry.key)
    }
}

impl fmt::Debug for ServiceRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceRegistry")
            .field("scene", &self.scene)
            .field("kind", &self.kind)
            .field("services", &self.keys().map(|key| key.name()).collect::<Vec<_>>())
            .finish()
    }
}

//=== ActiveScene =========================================================

/// Everything owned by the active scene, swapped as one unit.
pub(crate) struct ActiveScene {
    pub(crate) name: String,
    pub(crate) container: Container,
    pub(crate) repositories: ServiceRegistry,
    pub(crate) interactors: ServiceRegistry,
}

impl ActiveScene {
    /// Entries of both registries in container creation order.
    fn in_creation_order(&self) -> Vec<&ServiceEntry> {
        let mut entries: Vec<&ServiceEntry> = self
            .repositories
            .entries
            .iter()
            .chain(self.interactors.entries.iter())
            .collect();
        entries.sort_by_key(|entry| entry.sequence);
        entries
    }

    /// Initializes every service, dependencies first.
    pub(crate) fn initialize_all(&self) -> Result<(), SceneError> {
        for entry in self.in_creation_order() {
            debug!("{}: initializing {}", self.name, entry.key);
            entry.initialize()?;
        }
        Ok(())
    }

    /// Disposes every service in reverse creation order, then drops the
    /// scope.
    pub(crate) fn teardown(self) {
        for entry in self.in_creation_order().into_iter().rev() {
            debug!("{}: disposing {}", self.name, entry.key);
            entry.service.dispose();
        }
    }

    pub(crate) fn traces(&self) -> &[DiagnosticsInfo] {
        self.container.traces()
    }
}

//=========================================================================
// Tests
//=========================================================================
