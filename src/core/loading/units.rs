//=========================================================================
// Built-in Load Units
//=========================================================================
//
// FrameDelayUnit  - waits a number of frames
// TimedDelayUnit  - waits a wall-clock duration
//
// Both can be told not to report loaded when they end, which keeps the
// pipeline waiting (used to simulate stalled content in the prototype).
//
//=========================================================================

//=== External Dependencies ===============================================

use std::time::Duration;

use futures::FutureExt;
use log::trace;

//=== Internal Dependencies ===============================================

use super::{delay, next_frame, LoadFlag, LoadFuture, LoadUnit};

//=== FrameDelayUnit ======================================================

/// Waits `frames` suspension/resume cycles, then sets its flag to
/// `loaded_when_end`.
#[derive(Debug, Clone)]
pub struct FrameDelayUnit {
    name: String,
    frames: u32,
    loaded_when_end: bool,
    flag: LoadFlag,
}

impl FrameDelayUnit {
    pub fn new(name: impl Into<String>, frames: u32, loaded_when_end: bool) -> Self {
        Self {
            name: name.into(),
            frames,
            loaded_when_end,
            flag: LoadFlag::new(),
        }
    }

    /// Handle that observes this unit's completion flag.
    pub fn flag(&self) -> LoadFlag {
        self.flag.clone()
    }
}

impl LoadUnit for FrameDelayUnit {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_loaded(&self) -> bool {
        self.flag.get()
    }

    fn load(&mut self) -> LoadFuture<'_> {
        async move {
            for frame in 0..self.frames {
                trace!("{}: frame {}/{}", self.name, frame + 1, self.frames);
                next_frame().await;
            }

            if self.loaded_when_end {
                self.flag.set_loaded();
            }
            Ok(())
        }
        .boxed_local()
    }
}

//=== TimedDelayUnit ======================================================

/// Waits for `duration`, then sets its flag to `loaded_when_end`.
#[derive(Debug, Clone)]
pub struct TimedDelayUnit {
    name: String,
    duration: Duration,
    loaded_when_end: bool,
    flag: LoadFlag,
}

impl TimedDelayUnit {
    pub fn new(name: impl Into<String>, duration: Duration, loaded_when_end: bool) -> Self {
        Self {
            name: name.into(),
            duration,
            loaded_when_end,
            flag: LoadFlag::new(),
        }
    }

    pub fn flag(&self) -> LoadFlag {
        self.flag.clone()
    }
}

impl LoadUnit for TimedDelayUnit {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_loaded(&self) -> bool {
        self.flag.get()
    }

    fn load(&mut self) -> LoadFuture<'_> {
        async move {
            delay(self.duration).await;

            if self.loaded_when_end {
                self.flag.set_loaded();
            }
            Ok(())
        }
        .boxed_local()
    }
}

//=========================================================================
// Tests
//=========================================================================
