//=========================================================================
// Loading Pipeline
//=========================================================================
//
// Runs the load units of one scene transition.
//
// Flow:
//   run() → for each stage:
//             try_join_all(drive_unit(u) for u in stage)
//               drive_unit: load().await → wait until is_loaded → progress
//           → verify every flag still set → PipelineReport
//
// The pipeline has no timeout. A unit that never reports loaded keeps the
// transition in `Loading` forever.
//
//=========================================================================

//=== External Dependencies ===============================================

use std::cell::Cell;
use std::rc::Rc;
use std::time::{Duration, Instant};

use futures::future::try_join_all;
use log::{debug, info};

//=== Internal Dependencies ===============================================

use super::{next_frame, LoadUnit};
use crate::core::error::LoadError;
use crate::core::scene::{EventChannel, SceneEvent};

//=== LoadProgress ========================================================

/// Shared view of how far a pipeline has come.
#[derive(Debug, Clone, Default)]
pub struct LoadProgress {
    loaded: Rc<Cell<usize>>,
    total: Rc<Cell<usize>>,
}

impl LoadProgress {
    /// Number of units that have reported loaded.
    pub fn loaded(&self) -> usize {
        self.loaded.get()
    }

    /// Number of units in the pipeline.
    pub fn total(&self) -> usize {
        self.total.get()
    }

    /// True once every unit has loaded. An empty pipeline is complete.
    pub fn is_complete(&self) -> bool {
        self.loaded() >= self.total()
    }

    /// Completion in `0.0..=1.0`.
    pub fn fraction(&self) -> f32 {
        match self.total() {
            0 => 1.0,
            total => self.loaded() as f32 / total as f32,
        }
    }

    fn advance(&self) -> usize {
        let loaded = self.loaded.get() + 1;
        self.loaded.set(loaded);
        loaded
    }
}

//=== PipelineReport ======================================================

/// Time spent in one unit, from first poll until its flag was set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitTiming {
    pub unit: String,
    pub elapsed: Duration,
}

/// Outcome of a completed pipeline run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineReport {
    pub scene: String,
    pub units: Vec<UnitTiming>,
    pub elapsed: Duration,
}

//=== LoadingPipeline =====================================================

/// Ordered stages of load units for one scene transition.
///
/// Built fresh per transition and consumed by [`LoadingPipeline::run`].
pub struct LoadingPipeline {
    scene: String,
    stages: Vec<Vec<Box<dyn LoadUnit>>>,
    progress: LoadProgress,
    events: Option<EventChannel>,
}

impl LoadingPipeline {
    //--- Construction -----------------------------------------------------

    pub fn new(scene: impl Into<String>) -> Self {
        Self {
            scene: scene.into(),
            stages: Vec::new(),
            progress: LoadProgress::default(),
            events: None,
        }
    }

    /// Appends a unit as its own stage.
    pub fn with_unit(self, unit: Box<dyn LoadUnit>) -> Self {
        self.with_stage(vec![unit])
    }

    /// Appends a group of units that load interleaved with each other.
    ///
    /// Empty groups are ignored.
    pub fn with_stage(mut self, units: Vec<Box<dyn LoadUnit>>) -> Self {
        if !units.is_empty() {
            self.progress.total.set(self.progress.total() + units.len());
            self.stages.push(units);
        }
        self
    }

    /// Publishes a `UnitLoaded` event per finished unit.
    pub fn with_events(mut self, events: EventChannel) -> Self {
        self.events = Some(events);
        self
    }

    //--- Queries ----------------------------------------------------------

    /// Total number of units across all stages.
    pub fn len(&self) -> usize {
        self.progress.total()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Handle observing this pipeline's progress while it runs.
    pub fn progress(&self) -> LoadProgress {
        self.progress.clone()
    }

    //--- Execution --------------------------------------------------------

    /// Runs every stage in order.
    ///
    /// Completes once every unit reports `is_loaded`. The first unit error
    /// aborts the run and is returned to the caller.
    pub async fn run(self) -> Result<PipelineReport, LoadError> {
        let LoadingPipeline {
            scene,
            mut stages,
            progress,
            events,
        } = self;

        let started = Instant::now();
        info!("Loading pipeline for {} started ({} units)", scene, progress.total());

        let mut timings = Vec::with_capacity(progress.total());
        for stage in stages.iter_mut() {
            let drives = stage
                .iter_mut()
                .map(|unit| drive_unit(unit.as_mut(), &scene, &progress, events.as_ref()));
            timings.extend(try_join_all(drives).await?);
        }

        // Flags are set-once; anything unset now went backwards.
        if let Some(unit) = stages.iter().flatten().find(|unit| !unit.is_loaded()) {
            return Err(LoadError::UnitReverted {
                unit: unit.name().to_string(),
            });
        }

        let elapsed = started.elapsed();
        info!("Loading pipeline for {} complete in {:?}", scene, elapsed);

        Ok(PipelineReport {
            scene,
            units: timings,
            elapsed,
        })
    }
}

//--- drive_unit() --------------------------------------------------------
//
// Loads one unit, then keeps yielding frames until its flag is set.
//
async fn drive_unit(
    unit: &mut dyn LoadUnit,
    scene: &str,
    progress: &LoadProgress,
    events: Option<&EventChannel>,
) -> Result<UnitTiming, LoadError> {
    let started = Instant::now();

    unit.load().await?;
    while !unit.is_loaded() {
        next_frame().await;
    }

    let loaded = progress.advance();
    debug!(
        "{}: unit {} loaded ({}/{})",
        scene,
        unit.name(),
        loaded,
        progress.total()
    );

    if let Some(events) = events {
        events.publish(SceneEvent::UnitLoaded {
            scene: scene.to_string(),
            unit: unit.name().to_string(),
            loaded,
            total: progress.total(),
        });
    }

    Ok(UnitTiming {
        unit: unit.name().to_string(),
        elapsed: started.elapsed(),
    })
}

//=========================================================================
// Tests
//=========================================================================
