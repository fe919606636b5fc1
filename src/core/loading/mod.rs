//=========================================================================
// Loading System
//=========================================================================
//
// Staged asynchronous loading that gates scene readiness.
//
// Architecture:
//   SceneConfig ──unit factories──> LoadingPipeline
//                                      ├─ stage 0: [LoadUnit, ...]
//                                      └─ stage N: [LoadUnit, ...]
//   SceneManager ──update()──> FrameScheduler ──poll──> pipeline future
//
// Stages run in order. Units inside one stage are interleaved on the
// same thread. Suspension happens only inside units (`next_frame`,
// `delay`).
//
//=========================================================================

//=== External Dependencies ===============================================

use std::cell::Cell;
use std::rc::Rc;

use futures::future::LocalBoxFuture;

//=== Internal Dependencies ===============================================

use crate::core::error::LoadError;

//=== Module Declarations =================================================

mod pipeline;
mod scheduler;
mod suspend;
mod units;

//=== Public API ==========================================================

pub use pipeline::{LoadProgress, LoadingPipeline, PipelineReport, UnitTiming};
pub use scheduler::FrameScheduler;
pub use suspend::{delay, next_frame, Delay, NextFrame};
pub use units::{FrameDelayUnit, TimedDelayUnit};

/// Future returned by [`LoadUnit::load`].
pub type LoadFuture<'a> = LocalBoxFuture<'a, Result<(), LoadError>>;

//=== LoadUnit Trait ======================================================

/// A single asynchronous loading task with a completion flag.
///
/// Units are built fresh for every scene-load request and dropped once
/// the pipeline finishes. `is_loaded` must not revert to `false` after it
/// has reported `true`; the pipeline treats that as a failure.
///
/// # Example
///
/// ```rust
/// # use railway_runner::core::loading::{next_frame, LoadFlag, LoadFuture, LoadUnit};
/// # use futures::FutureExt;
/// struct WarmCaches {
///     flag: LoadFlag,
/// }
///
/// impl LoadUnit for WarmCaches {
///     fn name(&self) -> &str {
///         "warm-caches"
///     }
///
///     fn is_loaded(&self) -> bool {
///         self.flag.get()
///     }
///
///     fn load(&mut self) -> LoadFuture<'_> {
///         async move {
///             next_frame().await;
///             self.flag.set_loaded();
///             Ok(())
///         }
///         .boxed_local()
///     }
/// }
/// ```
pub trait LoadUnit {
    /// Name used in logs, progress events and errors.
    fn name(&self) -> &str;

    /// Whether the unit has finished loading.
    fn is_loaded(&self) -> bool;

    /// Runs the unit. May suspend any number of times.
    fn load(&mut self) -> LoadFuture<'_>;
}

//=== LoadFlag ============================================================

/// Shared, set-once completion flag.
///
/// Cloning yields another handle to the same flag, so tests and progress
/// views can observe a unit while its load future holds `&mut` to it.
#[derive(Debug, Clone, Default)]
pub struct LoadFlag(Rc<Cell<bool>>);

impl LoadFlag {
    /// Creates an unset flag.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the current value.
    pub fn get(&self) -> bool {
        self.0.get()
    }

    /// Marks the unit as loaded. There is no way back within one cycle.
    pub fn set_loaded(&self) {
        self.0.set(true);
    }
}
