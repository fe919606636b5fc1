//=========================================================================
// Dependency Container
//=========================================================================
//
// Explicit, cycle-checked dependency resolution with build diagnostics.
//
// Architecture:
//   Registrations (table, cloneable)
//         ↓ Container::new(scope, table)
//   Container
//     ├─ singletons: HashMap<TypeId, Rc<dyn Any>>
//     ├─ infos:      HashMap<TypeId, ResolveInfo>
//     └─ stack:      Vec<BuildFrame>   (cycle check + partial trace)
//
// One container per scope. A scene activation creates a fresh one and
// drops it on teardown.
//
//=========================================================================

//=== Module Declarations =================================================

mod diagnostics;
mod registration;
mod resolver;

//=== Public API ==========================================================

pub use diagnostics::{DiagnosticsInfo, DiagnosticsSink, LogSink, ResolveInfo};
pub use registration::{Lifetime, Registration, RegistrationInfo, Registrations, TypeKey};
pub use resolver::Container;
