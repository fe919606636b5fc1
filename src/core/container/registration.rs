//=========================================================================
// Registrations
//=========================================================================
//
// Explicit registration table built before any resolution happens.
//
// Architecture:
//   Registrations
//     ├─ entries: HashMap<TypeId, Registration>
//     └─ order:   Vec<TypeId>          (registration order)
//
//   Registration = RegistrationInfo + Provider
//   Provider     = Component(Rc<dyn Any>) | Factory(Rc<dyn Fn(&mut Container)>)
//
// The table is cheap to clone (providers are reference counted), so a
// game-wide table can be merged into every scene scope.
//
//=========================================================================

//=== External Dependencies ===============================================

use std::any::{type_name, Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use log::warn;

//=== Internal Dependencies ===============================================

use super::Container;
use crate::core::error::ResolveError;

//=== TypeKey =============================================================

/// Stable identifier of a registered type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypeKey {
    id: TypeId,
    name: &'static str,
}

impl TypeKey {
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: type_name::<T>(),
        }
    }

    pub fn id(&self) -> TypeId {
        self.id
    }

    /// Full type name, as reported by `std::any::type_name`.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Type name without its module path.
    pub fn short_name(&self) -> &'static str {
        let base = self.name.split('<').next().unwrap_or(self.name);
        match base.rfind("::") {
            Some(pos) => &self.name[pos + 2..],
            None => self.name,
        }
    }
}

impl fmt::Display for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.short_name())
    }
}

//=== Lifetime ============================================================

/// How instances of a registration are produced and shared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Lifetime {
    /// Built once, shared for the rest of the scope.
    Singleton,

    /// Built anew on every resolve.
    Transient,

    /// Supplied from outside the container, never built.
    Component,
}

//=== RegistrationInfo ====================================================

/// Describes what was registered, independent of how it is provided.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistrationInfo {
    pub key: TypeKey,
    pub lifetime: Lifetime,
}

//=== Provider ============================================================

pub(crate) type Factory = Rc<dyn Fn(&mut Container) -> Result<Rc<dyn Any>, ResolveError>>;

#[derive(Clone)]
pub(crate) enum Provider {
    Component(Rc<dyn Any>),
    Factory(Factory),
}

/// One entry of the registration table.
#[derive(Clone)]
pub struct Registration {
    pub(crate) info: RegistrationInfo,
    pub(crate) provider: Provider,
}

impl Registration {
    pub fn info(&self) -> &RegistrationInfo {
        &self.info
    }
}

impl fmt::Debug for Registration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registration")
            .field("key", &self.info.key.name())
            .field("lifetime", &self.info.lifetime)
            .finish()
    }
}

//=== Registrations =======================================================

/// Table of everything a [`Container`] can resolve.
#[derive(Debug, Clone, Default)]
pub struct Registrations {
    entries: HashMap<TypeId, Registration>,
    order: Vec<TypeId>,
}

impl Registrations {
    pub fn new() -> Self {
        Self::default()
    }

    //--- Registration -----------------------------------------------------

    /// Registers a factory-built type.
    ///
    /// The factory receives the resolving container and pulls its own
    /// dependencies from it.
    ///
    /// # Panics
    ///
    /// Panics if `lifetime` is [`Lifetime::Component`]; components are
    /// registered with [`Registrations::register_component`].
    pub fn register<T, F>(&mut self, lifetime: Lifetime, factory: F)
    where
        T: 'static,
        F: Fn(&mut Container) -> Result<T, ResolveError> + 'static,
    {
        assert!(
            lifetime != Lifetime::Component,
            "Components must be registered with register_component"
        );

        let build: Factory = Rc::new(move |container: &mut Container| {
            factory(container).map(|value| Rc::new(value) as Rc<dyn Any>)
        });

        self.insert(Registration {
            info: RegistrationInfo {
                key: TypeKey::of::<T>(),
                lifetime,
            },
            provider: Provider::Factory(build),
        });
    }

    /// Registers a singleton built on first request.
    pub fn register_singleton<T, F>(&mut self, factory: F)
    where
        T: 'static,
        F: Fn(&mut Container) -> Result<T, ResolveError> + 'static,
    {
        self.register(Lifetime::Singleton, factory);
    }

    /// Registers a type built anew on every request.
    pub fn register_transient<T, F>(&mut self, factory: F)
    where
        T: 'static,
        F: Fn(&mut Container) -> Result<T, ResolveError> + 'static,
    {
        self.register(Lifetime::Transient, factory);
    }

    /// Registers an instance that already exists outside the container.
    pub fn register_component<T: 'static>(&mut self, instance: Rc<T>) {
        self.insert(Registration {
            info: RegistrationInfo {
                key: TypeKey::of::<T>(),
                lifetime: Lifetime::Component,
            },
            provider: Provider::Component(instance),
        });
    }

    /// Copies every registration of `other` into this table.
    ///
    /// Entries of `other` win over existing ones.
    pub fn merge(&mut self, other: &Registrations) {
        for id in &other.order {
            if let Some(registration) = other.entries.get(id) {
                self.insert(registration.clone());
            }
        }
    }

    fn insert(&mut self, registration: Registration) {
        let key = registration.info.key;
        if self.entries.insert(key.id(), registration).is_some() {
            warn!("{} was already registered and has been replaced", key.name());
        } else {
            self.order.push(key.id());
        }
    }

    //--- Queries ----------------------------------------------------------

    pub fn get(&self, key: TypeKey) -> Option<&Registration> {
        self.entries.get(&key.id())
    }

    pub fn contains(&self, key: TypeKey) -> bool {
        self.entries.contains_key(&key.id())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Registration infos in registration order.
    pub fn infos(&self) -> impl Iterator<Item = &RegistrationInfo> {
        self.order
            .iter()
            .filter_map(|id| self.entries.get(id))
            .map(|registration| &registration.info)
    }
}

//=========================================================================
// Tests
//=========================================================================
