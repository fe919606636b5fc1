//=========================================================================
// Prototype Scenes
//=========================================================================
//
// Scene declarations shipped with the prototype.
//
//   SampleScene  no services, no load units
//   Railway      TrackRepository, ScoreRepository
//                RunInteractor (needs both repositories)
//                terrain (frames) → [audio, timetable] (interleaved)
//
//=========================================================================

//=== External Dependencies ===============================================

use std::cell::Cell;
use std::rc::Rc;
use std::time::Duration;

use log::debug;

//=== Internal Dependencies ===============================================

use crate::core::error::ConfigError;
use crate::core::loading::{FrameDelayUnit, LoadUnit, TimedDelayUnit};
use crate::core::scene::{Interactor, Repository, SceneConfig, UnitFactory};
use crate::game::GameBuilder;

//=== Scene Names =========================================================

pub const SAMPLE_SCENE: &str = "SampleScene";
pub const RAILWAY: &str = "Railway";

//=== Railway Services ====================================================

/// Track layout of the current run.
#[derive(Debug)]
pub struct TrackRepository {
    segments: u32,
}

impl TrackRepository {
    pub fn segments(&self) -> u32 {
        self.segments
    }
}

impl Repository for TrackRepository {
    fn initialize(&self) {
        debug!("Track ready with {} segments", self.segments);
    }
}

/// Score of the current run.
#[derive(Debug, Default)]
pub struct ScoreRepository {
    score: Cell<u32>,
}

impl ScoreRepository {
    pub fn score(&self) -> u32 {
        self.score.get()
    }

    fn add(&self, points: u32) {
        self.score.set(self.score.get().saturating_add(points));
    }
}

impl Repository for ScoreRepository {
    fn dispose(&self) {
        debug!("Run ended with score {}", self.score.get());
    }
}

/// Advances the train along the track and scores finished segments.
pub struct RunInteractor {
    track: Rc<TrackRepository>,
    score: Rc<ScoreRepository>,
    position: Cell<u32>,
}

impl RunInteractor {
    /// Moves one segment forward. Returns `false` once the track ends.
    pub fn advance(&self) -> bool {
        let next = self.position.get() + 1;
        if next > self.track.segments() {
            return false;
        }

        self.position.set(next);
        self.score.add(10);
        true
    }

    pub fn position(&self) -> u32 {
        self.position.get()
    }
}

impl Interactor for RunInteractor {
    fn initialize(&self) {
        self.position.set(0);
    }
}

//=== Scene Declarations ==================================================

/// Scene with no services; exercises the bare lifecycle.
pub fn sample_scene() -> SceneConfig {
    SceneConfig::empty(SAMPLE_SCENE)
}

/// Main gameplay scene.
pub fn railway(segments: u32) -> Result<SceneConfig, ConfigError> {
    let audio: UnitFactory = Rc::new(|| {
        Box::new(TimedDelayUnit::new("audio", Duration::from_millis(20), true)) as Box<dyn LoadUnit>
    });
    let timetable: UnitFactory =
        Rc::new(|| Box::new(FrameDelayUnit::new("timetable", 3, true)) as Box<dyn LoadUnit>);

    SceneConfig::builder(RAILWAY)
        .repository(move |_| Ok(TrackRepository { segments }))
        .repository(|_| Ok(ScoreRepository::default()))
        .interactor(|c| {
            Ok(RunInteractor {
                track: c.resolve::<TrackRepository>()?,
                score: c.resolve::<ScoreRepository>()?,
                position: Cell::new(0),
            })
        })
        .load_unit(|| FrameDelayUnit::new("terrain", 2, true))
        .load_stage(vec![audio, timetable])
        .build()
}

/// Adds the prototype scenes to `builder`, starting in [`RAILWAY`].
pub fn install(builder: GameBuilder) -> Result<GameBuilder, ConfigError> {
    Ok(builder
        .with_scene(sample_scene())
        .with_scene(railway(12)?)
        .with_initial_scene(RAILWAY))
}

//=========================================================================
// Tests
//=========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn railway_declares_all_services() {
        let config = railway(4).unwrap();
        assert_eq!(config.repository_keys().count(), 2);
        assert_eq!(config.interactor_keys().count(), 1);
        assert_eq!(config.unit_count(), 3);
    }

    #[test]
    fn installed_game_reaches_railway() {
        let mut game = install(GameBuilder::new().with_tps(1000.0)).unwrap().build();
        game.run().unwrap();

        let manager = game.scene_manager();
        let run = manager.get_interactor::<RunInteractor>().unwrap();
        assert!(run.advance());
        assert!(run.advance());
        assert_eq!(run.position(), 2);
        assert_eq!(manager.get_repository::<ScoreRepository>().unwrap().score(), 20);
    }

    #[test]
    fn run_stops_at_track_end() {
        let mut game = GameBuilder::new()
            .with_tps(1000.0)
            .with_scene(railway(1).unwrap())
            .with_initial_scene(RAILWAY)
            .build();
        game.run().unwrap();

        let run = game.scene_manager().get_interactor::<RunInteractor>().unwrap();
        assert!(run.advance());
        assert!(!run.advance());
    }
}
