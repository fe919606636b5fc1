//=========================================================================
// Resolution Diagnostics
//=========================================================================
//
// Observational records of how the container built things.
//
//   ResolveInfo      - per-registration statistics (kept by the container)
//   DiagnosticsInfo  - one node of a build tree, rooted at a top-level
//                      resolve() call
//   DiagnosticsSink  - callback invoked per resolution and per finished tree
//
// Nothing here feeds back into resolution. Turning diagnostics off only
// drops the trees and callbacks.
//
//=========================================================================

//=== External Dependencies ===============================================

use std::any::Any;
use std::fmt::{self, Write};
use std::rc::Weak;
use std::time::Duration;

use log::debug;

//=== Internal Dependencies ===============================================

use super::RegistrationInfo;

//=== ResolveInfo =========================================================

/// Statistics for one registration within one scope.
#[derive(Clone)]
pub struct ResolveInfo {
    /// Registration that satisfied the requests.
    pub registration: RegistrationInfo,

    /// Objects produced (or handed out, for components). Weak, so the
    /// record never keeps an instance alive.
    pub instances: Vec<Weak<dyn Any>>,

    /// Longest dependency chain beneath this registration, `-1` until a
    /// resolution has completed.
    pub max_depth: i32,

    /// Requests served from an existing instance.
    pub ref_count: u32,

    /// Duration of the last build.
    pub resolve_time: Duration,
}

impl ResolveInfo {
    pub fn new(registration: RegistrationInfo) -> Self {
        Self {
            registration,
            instances: Vec::new(),
            max_depth: -1,
            ref_count: 0,
            resolve_time: Duration::ZERO,
        }
    }

    /// Produced instances that are still alive.
    pub fn live_instances(&self) -> usize {
        self.instances
            .iter()
            .filter(|instance| instance.strong_count() > 0)
            .count()
    }
}

impl fmt::Debug for ResolveInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolveInfo")
            .field("registration", &self.registration)
            .field("instances", &self.instances.len())
            .field("max_depth", &self.max_depth)
            .field("ref_count", &self.ref_count)
            .field("resolve_time", &self.resolve_time)
            .finish()
    }
}

//=== DiagnosticsInfo =====================================================

/// Node of a dependency build tree.
#[derive(Debug, Clone)]
pub struct DiagnosticsInfo {
    pub scope_name: String,
    pub registration: RegistrationInfo,
    pub resolve: Option<ResolveInfo>,
    pub dependencies: Vec<DiagnosticsInfo>,
}

impl DiagnosticsInfo {
    pub fn new(scope_name: impl Into<String>, registration: RegistrationInfo) -> Self {
        Self {
            scope_name: scope_name.into(),
            registration,
            resolve: None,
            dependencies: Vec::new(),
        }
    }

    /// Number of nodes in this tree, including the root.
    pub fn node_count(&self) -> usize {
        1 + self
            .dependencies
            .iter()
            .map(DiagnosticsInfo::node_count)
            .sum::<usize>()
    }

    /// Depth of this tree; a leaf has depth 0.
    pub fn depth(&self) -> usize {
        self.dependencies
            .iter()
            .map(|child| child.depth() + 1)
            .max()
            .unwrap_or(0)
    }

    /// Renders the tree as indented text, one node per line.
    pub fn render(&self) -> String {
        let mut out = String::new();
        self.render_into(&mut out, 0);
        out
    }

    fn render_into(&self, out: &mut String, indent: usize) {
        let key = self.registration.key;
        let _ = write!(
            out,
            "{:indent$}{}: {} [{:?}]",
            "",
            self.scope_name,
            key,
            self.registration.lifetime,
            indent = indent * 2
        );

        if let Some(resolve) = &self.resolve {
            let _ = write!(
                out,
                " built in {:?}, depth {}, reused {}",
                resolve.resolve_time, resolve.max_depth, resolve.ref_count
            );
        }
        out.push('\n');

        for child in &self.dependencies {
            child.render_into(out, indent + 1);
        }
    }
}

//=== DiagnosticsSink =====================================================

/// Receives diagnostics as the container resolves.
pub trait DiagnosticsSink {
    /// Called once per resolution, whether built or served from cache.
    fn on_resolved(&mut self, scope: &str, registration: &RegistrationInfo, resolve: &ResolveInfo);

    /// Called when a top-level resolution has produced a complete tree.
    fn on_trace(&mut self, _root: &DiagnosticsInfo) {}
}

/// Sink writing every resolution to the `log` facade at debug level.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl DiagnosticsSink for LogSink {
    fn on_resolved(&mut self, scope: &str, registration: &RegistrationInfo, resolve: &ResolveInfo) {
        debug!(
            "{}: resolved {} ({:?}, depth {}, reused {}, {:?})",
            scope,
            registration.key,
            registration.lifetime,
            resolve.max_depth,
            resolve.ref_count,
            resolve.resolve_time
        );
    }

    fn on_trace(&mut self, root: &DiagnosticsInfo) {
        debug!("Build graph:\n{}", root.render());
    }
}

//=========================================================================
// Tests
//=========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::container::{Lifetime, TypeKey};
    use std::rc::Rc;

    struct Track;
    struct Station;

    fn info<T: 'static>() -> RegistrationInfo {
        RegistrationInfo {
            key: TypeKey::of::<T>(),
            lifetime: Lifetime::Singleton,
        }
    }

    #[test]
    fn new_resolve_info_has_no_depth() {
        let record = ResolveInfo::new(info::<Track>());
        assert_eq!(record.max_depth, -1);
        assert_eq!(record.ref_count, 0);
        assert!(record.instances.is_empty());
    }

    #[test]
    fn live_instances_ignores_dropped_objects() {
        let mut record = ResolveInfo::new(info::<Track>());
        let kept: Rc<dyn Any> = Rc::new(Track);
        let dropped: Rc<dyn Any> = Rc::new(Track);
        record.instances.push(Rc::downgrade(&kept));
        record.instances.push(Rc::downgrade(&dropped));
        drop(dropped);

        assert_eq!(record.live_instances(), 1);
    }

    #[test]
    fn tree_depth_and_render() {
        let mut root = DiagnosticsInfo::new("Main", info::<Station>());
        root.dependencies.push(DiagnosticsInfo::new("Main", info::<Track>()));

        assert_eq!(root.node_count(), 2);
        assert_eq!(root.depth(), 1);

        let text = root.render();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines, ["Main: Station [Singleton]", "  Main: Track [Singleton]"]);
    }
}
