//=========================================================================
// Container
//=========================================================================
//
// Scope-bound resolver over a `Registrations` table.
//
// Architecture:
//   resolve::<T>() → resolve_key(key)
//                      ├─ miss           → ResolveError::NotRegistered
//                      ├─ key on stack   → ResolveError::Cycle
//                      ├─ component/hit  → shared instance, ref_count += 1
//                      └─ build          → push frame → factory(self) → pop
//
// Frames on the stack double as the cycle detector and as the partial
// diagnostics tree. Each finished frame folds its depth (and node) into
// its parent.
//
//=========================================================================

//=== External Dependencies ===============================================

use std::any::{type_name, Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;
use std::time::Instant;

use log::{debug, warn};

//=== Internal Dependencies ===============================================

use super::registration::Provider;
use super::{
    DiagnosticsInfo, DiagnosticsSink, Lifetime, RegistrationInfo, Registrations, ResolveInfo,
    TypeKey,
};
use crate::core::error::ResolveError;

//=== BuildFrame ==========================================================

struct BuildFrame {
    key: TypeKey,
    deepest_child: i32,
    node: Option<DiagnosticsInfo>,
}

//=== Container ===========================================================

/// Resolves registered types for one scope (one scene activation).
///
/// Singletons live as long as the container; drop it to end the scope.
///
/// # Example
///
/// ```rust
/// # use railway_runner::core::container::{Container, Registrations};
/// struct Track { length: u32 }
/// struct Train { track_length: u32 }
///
/// let mut table = Registrations::new();
/// table.register_singleton(|_| Ok(Track { length: 12 }));
/// table.register_transient(|c| {
///     let track = c.resolve::<Track>()?;
///     Ok(Train { track_length: track.length })
/// });
///
/// let mut container = Container::new("Main", table);
/// let train = container.resolve::<Train>().unwrap();
/// assert_eq!(train.track_length, 12);
/// ```
pub struct Container {
    scope: String,
    registrations: Registrations,
    singletons: HashMap<TypeId, Rc<dyn Any>>,
    created: Vec<TypeKey>,
    infos: HashMap<TypeId, ResolveInfo>,
    stack: Vec<BuildFrame>,
    sink: Option<Box<dyn DiagnosticsSink>>,
    collect_traces: bool,
    traces: Vec<DiagnosticsInfo>,
}

impl Container {
    //--- Construction -----------------------------------------------------

    /// Creates a container without diagnostics.
    pub fn new(scope: impl Into<String>, registrations: Registrations) -> Self {
        Self {
            scope: scope.into(),
            registrations,
            singletons: HashMap::new(),
            created: Vec::new(),
            infos: HashMap::new(),
            stack: Vec::new(),
            sink: None,
            collect_traces: false,
            traces: Vec::new(),
        }
    }

    /// Enables diagnostics: build trees are kept and `sink` is notified.
    pub fn with_diagnostics(mut self, sink: Box<dyn DiagnosticsSink>) -> Self {
        self.sink = Some(sink);
        self.collect_traces = true;
        self
    }

    //--- Resolution -------------------------------------------------------

    /// Resolves `T`, building it and its dependencies as needed.
    pub fn resolve<T: 'static>(&mut self) -> Result<Rc<T>, ResolveError> {
        self.resolve_key(TypeKey::of::<T>())?
            .downcast::<T>()
            .map_err(|_| ResolveError::TypeMismatch {
                expected: type_name::<T>(),
            })
    }

    /// Resolves by key, returning the type-erased instance.
    pub fn resolve_key(&mut self, key: TypeKey) -> Result<Rc<dyn Any>, ResolveError> {
        let Some(registration) = self.registrations.get(key).cloned() else {
            let err = ResolveError::NotRegistered {
                scope: self.scope.clone(),
                service: key.name(),
                chain: self.chain_to(key),
            };
            warn!("{}", err);
            return Err(err);
        };

        if self.stack.iter().any(|frame| frame.key == key) {
            let err = ResolveError::Cycle {
                scope: self.scope.clone(),
                chain: self.chain_to(key),
            };
            warn!("{}", err);
            return Err(err);
        }

        let info = registration.info;
        match registration.provider {
            Provider::Component(instance) => {
                self.serve_existing(&info, &instance, true);
                Ok(instance)
            }
            Provider::Factory(factory) => {
                if info.lifetime == Lifetime::Singleton {
                    if let Some(instance) = self.singletons.get(&key.id()).cloned() {
                        self.serve_existing(&info, &instance, false);
                        return Ok(instance);
                    }
                }

                self.build(info, |container| factory(container))
            }
        }
    }

    //--- build() ----------------------------------------------------------
    //
    // Runs a factory inside a fresh frame and records the result.
    //
    fn build<F>(&mut self, info: RegistrationInfo, factory: F) -> Result<Rc<dyn Any>, ResolveError>
    where
        F: FnOnce(&mut Container) -> Result<Rc<dyn Any>, ResolveError>,
    {
        let key = info.key;
        let node = self
            .collect_traces
            .then(|| DiagnosticsInfo::new(self.scope.clone(), info.clone()));
        self.stack.push(BuildFrame {
            key,
            deepest_child: -1,
            node,
        });

        debug!("{}: building {}", self.scope, key);
        let started = Instant::now();
        let result = factory(self);
        let elapsed = started.elapsed();

        let Some(frame) = self.stack.pop() else {
            unreachable!("build frame pushed before running the factory");
        };
        let instance = result?;

        let depth = frame.deepest_child + 1;
        let record = self
            .infos
            .entry(key.id())
            .or_insert_with(|| ResolveInfo::new(info.clone()));
        record.instances.push(Rc::downgrade(&instance));
        record.resolve_time = elapsed;
        record.max_depth = record.max_depth.max(depth);
        let snapshot = record.clone();

        if info.lifetime == Lifetime::Singleton {
            self.singletons.insert(key.id(), Rc::clone(&instance));
            self.created.push(key);
        }

        self.finish(&info, snapshot, depth, frame.node);
        Ok(instance)
    }

    //--- serve_existing() -------------------------------------------------
    //
    // Records a resolution that reused a component or cached singleton.
    //
    fn serve_existing(&mut self, info: &RegistrationInfo, instance: &Rc<dyn Any>, component: bool) {
        let record = self
            .infos
            .entry(info.key.id())
            .or_insert_with(|| ResolveInfo::new(info.clone()));

        if component && record.instances.is_empty() {
            record.instances.push(Rc::downgrade(instance));
            record.max_depth = 0;
        }
        record.ref_count += 1;

        let depth = record.max_depth.max(0);
        let snapshot = record.clone();
        let node = self
            .collect_traces
            .then(|| DiagnosticsInfo::new(self.scope.clone(), info.clone()));
        self.finish(info, snapshot, depth, node);
    }

    //--- finish() ---------------------------------------------------------
    //
    // Notifies the sink and folds the finished node into its parent frame,
    // or stores it as a complete trace when it was the root request.
    //
    fn finish(
        &mut self,
        info: &RegistrationInfo,
        snapshot: ResolveInfo,
        depth: i32,
        node: Option<DiagnosticsInfo>,
    ) {
        if let Some(sink) = self.sink.as_mut() {
            sink.on_resolved(&self.scope, info, &snapshot);
        }

        let node = node.map(|mut node| {
            node.resolve = Some(snapshot);
            node
        });

        match self.stack.last_mut() {
            Some(parent) => {
                parent.deepest_child = parent.deepest_child.max(depth);
                if let (Some(parent_node), Some(node)) = (parent.node.as_mut(), node) {
                    parent_node.dependencies.push(node);
                }
            }
            None => {
                if let Some(node) = node {
                    if let Some(sink) = self.sink.as_mut() {
                        sink.on_trace(&node);
                    }
                    self.traces.push(node);
                }
            }
        }
    }

    fn chain_to(&self, key: TypeKey) -> Vec<&'static str> {
        self.stack
            .iter()
            .map(|frame| frame.key.name())
            .chain(std::iter::once(key.name()))
            .collect()
    }

    //--- Queries ----------------------------------------------------------

    pub fn scope_name(&self) -> &str {
        &self.scope
    }

    pub fn registrations(&self) -> &Registrations {
        &self.registrations
    }

    pub fn is_registered<T: 'static>(&self) -> bool {
        self.registrations.contains(TypeKey::of::<T>())
    }

    pub fn diagnostics_enabled(&self) -> bool {
        self.collect_traces
    }

    /// Statistics for `key`, if it has been resolved in this scope.
    pub fn resolve_info(&self, key: TypeKey) -> Option<&ResolveInfo> {
        self.infos.get(&key.id())
    }

    /// Position of `key` in singleton creation order.
    pub fn creation_index(&self, key: TypeKey) -> Option<usize> {
        self.created.iter().position(|created| *created == key)
    }

    /// Singletons in the order they were built.
    pub fn created(&self) -> &[TypeKey] {
        &self.created
    }

    /// Completed build trees, oldest first.
    pub fn traces(&self) -> &[DiagnosticsInfo] {
        &self.traces
    }

    /// Takes the completed build trees, leaving none behind.
    pub fn take_traces(&mut self) -> Vec<DiagnosticsInfo> {
        std::mem::take(&mut self.traces)
    }
}

impl fmt::Debug for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Container")
            .field("scope", &self.scope)
            .field("registrations", &self.registrations.len())
            .field("singletons", &self.singletons.len())
            .field("diagnostics", &self.collect_traces)
            .finish()
    }
}

//=========================================================================
// Tests
//=========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    //--- Fixtures ---------------------------------------------------------

    struct Track;

    struct Signal {
        _track: Rc<Track>,
    }

    struct Dispatcher {
        _signal: Rc<Signal>,
        _track: Rc<Track>,
    }

    struct Ticket(u32);

    struct Ouroboros;

    struct Left;
    struct Right;

    fn rail_table() -> Registrations {
        let mut table = Registrations::new();
        table.register_singleton(|_| Ok(Track));
        table.register_singleton(|c| {
            Ok(Signal {
                _track: c.resolve::<Track>()?,
            })
        });
        table.register_singleton(|c| {
            Ok(Dispatcher {
                _signal: c.resolve::<Signal>()?,
                _track: c.resolve::<Track>()?,
            })
        });
        table
    }

    #[derive(Clone, Default)]
    struct Recorder(Rc<RefCell<Vec<(String, &'static str, u32)>>>);

    impl DiagnosticsSink for Recorder {
        fn on_resolved(&mut self, scope: &str, registration: &RegistrationInfo, resolve: &ResolveInfo) {
            self.0
                .borrow_mut()
                .push((scope.to_string(), registration.key.short_name(), resolve.ref_count));
        }
    }

    //--- Lifetimes --------------------------------------------------------

    #[test]
    fn singleton_is_shared_and_counted() {
        let mut container = Container::new("Main", rail_table());
        let a = container.resolve::<Track>().unwrap();
        let b = container.resolve::<Track>().unwrap();

        assert!(Rc::ptr_eq(&a, &b));
        let info = container.resolve_info(TypeKey::of::<Track>()).unwrap();
        assert_eq!(info.ref_count, 1);
        assert_eq!(info.instances.len(), 1);
        assert_eq!(info.max_depth, 0);
    }

    #[test]
    fn transient_builds_every_time() {
        let mut table = Registrations::new();
        let counter = Rc::new(RefCell::new(0));
        let seen = Rc::clone(&counter);
        table.register_transient(move |_| {
            *seen.borrow_mut() += 1;
            Ok(Ticket(*seen.borrow()))
        });

        let mut container = Container::new("Main", table);
        let first = container.resolve::<Ticket>().unwrap();
        let second = container.resolve::<Ticket>().unwrap();

        assert_eq!((first.0, second.0), (1, 2));
        let info = container.resolve_info(TypeKey::of::<Ticket>()).unwrap();
        assert_eq!(info.instances.len(), 2);
        assert_eq!(info.ref_count, 0);
        assert!(container.created().is_empty());
    }

    #[test]
    fn component_is_returned_as_supplied() {
        let mut table = Registrations::new();
        let track = Rc::new(Track);
        table.register_component(Rc::clone(&track));

        let mut container = Container::new("Main", table);
        let resolved = container.resolve::<Track>().unwrap();

        assert!(Rc::ptr_eq(&track, &resolved));
        let info = container.resolve_info(TypeKey::of::<Track>()).unwrap();
        assert_eq!(info.max_depth, 0);
        assert_eq!(info.ref_count, 1);
    }

    //--- Graph ------------------------------------------------------------

    #[test]
    fn max_depth_is_longest_chain() {
        let mut container = Container::new("Main", rail_table());
        container.resolve::<Dispatcher>().unwrap();

        let depth = |key| container.resolve_info(key).map(|info| info.max_depth);
        assert_eq!(depth(TypeKey::of::<Dispatcher>()), Some(2));
        assert_eq!(depth(TypeKey::of::<Signal>()), Some(1));
        assert_eq!(depth(TypeKey::of::<Track>()), Some(0));
    }

    #[test]
    fn dependencies_are_created_first() {
        let mut container = Container::new("Main", rail_table());
        container.resolve::<Dispatcher>().unwrap();

        assert_eq!(
            container.created(),
            [
                TypeKey::of::<Track>(),
                TypeKey::of::<Signal>(),
                TypeKey::of::<Dispatcher>()
            ]
        );
    }

    #[test]
    fn self_dependency_is_a_cycle() {
        let mut table = Registrations::new();
        table.register_singleton(|c| {
            c.resolve::<Ouroboros>()?;
            Ok(Ouroboros)
        });

        let mut container = Container::new("Loop", table);
        match container.resolve::<Ouroboros>() {
            Err(ResolveError::Cycle { scope, chain }) => {
                assert_eq!(scope, "Loop");
                assert_eq!(chain.len(), 2);
                assert_eq!(chain[0], chain[1]);
            }
            Err(other) => panic!("expected cycle, got {other:?}"),
            Ok(_) => panic!("expected cycle, got an instance"),
        }
    }

    #[test]
    fn transitive_cycle_reports_full_chain() {
        let mut table = Registrations::new();
        table.register_singleton(|c| {
            c.resolve::<Right>()?;
            Ok(Left)
        });
        table.register_singleton(|c| {
            c.resolve::<Left>()?;
            Ok(Right)
        });

        let mut container = Container::new("Loop", table);
        let Err(ResolveError::Cycle { chain, .. }) = container.resolve::<Left>() else {
            panic!("expected cycle");
        };
        assert_eq!(
            chain,
            [type_name::<Left>(), type_name::<Right>(), type_name::<Left>()]
        );

        // The stack unwinds; a later request fails the same way, not worse.
        assert!(matches!(
            container.resolve::<Right>(),
            Err(ResolveError::Cycle { .. })
        ));
    }

    #[test]
    fn missing_dependency_reports_chain() {
        let mut table = Registrations::new();
        table.register_singleton(|c| {
            Ok(Signal {
                _track: c.resolve::<Track>()?,
            })
        });

        let mut container = Container::new("Main", table);
        let Err(ResolveError::NotRegistered { service, chain, .. }) = container.resolve::<Signal>()
        else {
            panic!("expected a miss");
        };
        assert_eq!(service, type_name::<Track>());
        assert_eq!(chain, [type_name::<Signal>(), type_name::<Track>()]);
    }

    //--- Diagnostics ------------------------------------------------------

    #[test]
    fn diagnostics_build_a_tree_per_root_request() {
        let recorder = Recorder::default();
        let mut container =
            Container::new("Main", rail_table()).with_diagnostics(Box::new(recorder.clone()));
        container.resolve::<Dispatcher>().unwrap();

        let traces = container.traces();
        assert_eq!(traces.len(), 1);
        let root = &traces[0];
        assert_eq!(root.registration.key, TypeKey::of::<Dispatcher>());
        assert_eq!(root.dependencies.len(), 2);
        assert_eq!(root.dependencies[0].dependencies.len(), 1);
        assert_eq!(root.node_count(), 4);
        assert_eq!(root.resolve.as_ref().map(|r| r.max_depth), Some(2));

        let calls = recorder.0.borrow();
        let names: Vec<_> = calls.iter().map(|(_, name, _)| *name).collect();
        assert_eq!(names, ["Track", "Signal", "Track", "Dispatcher"]);
        assert_eq!(calls[2].2, 1);
    }

    #[test]
    fn disabling_diagnostics_does_not_change_results() {
        let mut plain = Container::new("Main", rail_table());
        let mut traced =
            Container::new("Main", rail_table()).with_diagnostics(Box::new(Recorder::default()));

        plain.resolve::<Dispatcher>().unwrap();
        traced.resolve::<Dispatcher>().unwrap();

        assert!(plain.traces().is_empty());
        assert_eq!(plain.created(), traced.created());
        for key in plain.created() {
            let (a, b) = (plain.resolve_info(*key).unwrap(), traced.resolve_info(*key).unwrap());
            assert_eq!((a.max_depth, a.ref_count), (b.max_depth, b.ref_count));
        }
    }
}
