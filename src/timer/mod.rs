// Lap timer driven by start/end trigger volumes and simulation ticks

use log::{debug, warn};
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum LapPhase {
    Idle,
    Running,
}

/// Emitted once per finished lap; the caller prompts for a player name
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct LapCompleted {
    pub elapsed_seconds: f64,
}

/// Two-phase lap state machine.
///
/// Triggers that do not match the current phase are ignored, since a player can
/// re-enter the same trigger volume. Time only accrues while a lap is running.
#[derive(Clone, Debug)]
pub struct LapTimer {
    accumulating: bool,
    in_lap: bool,
    elapsed: f64,
    last_completed: Option<LapCompleted>,
}

impl Default for LapTimer {
    fn default() -> Self {
        Self::new()
    }
}

impl LapTimer {
    pub fn new() -> Self {
        Self {
            accumulating: false,
            in_lap: false,
            elapsed: 0.,
            last_completed: None,
        }
    }

    pub fn phase(&self) -> LapPhase {
        if self.in_lap {
            LapPhase::Running
        } else {
            LapPhase::Idle
        }
    }

    /// Start a lap. Returns false when a lap is already running.
    pub fn on_lap_start(&mut self) -> bool {
        if self.in_lap {
            debug!("Lap start trigger ignored, lap already running");
            return false;
        }

        self.elapsed = 0.;
        self.last_completed = None;
        self.in_lap = true;
        self.accumulating = true;
        true
    }

    /// Advance the running lap by `delta_seconds`
    pub fn on_tick(&mut self, delta_seconds: f64) {
        if !delta_seconds.is_finite() || delta_seconds < 0. {
            warn!("Ignoring invalid tick delta {}", delta_seconds);
            return;
        }
        if self.accumulating {
            self.elapsed += delta_seconds;
        }
    }

    /// Finish the running lap. Returns `None` for a stray end trigger.
    pub fn on_lap_end(&mut self) -> Option<LapCompleted> {
        if !self.in_lap {
            debug!("Lap end trigger ignored, no lap running");
            return None;
        }

        self.accumulating = false;
        self.in_lap = false;
        let completed = LapCompleted {
            elapsed_seconds: self.elapsed,
        };
        self.last_completed = Some(completed);
        Some(completed)
    }

    /// Time accumulated by the current or most recent lap
    pub fn elapsed(&self) -> f64 {
        self.elapsed
    }

    /// The last finished lap, cleared when the next lap starts
    pub fn last_completed(&self) -> Option<LapCompleted> {
        self.last_completed
    }

    pub fn is_accumulating(&self) -> bool {
        self.accumulating
    }

    pub fn is_in_lap(&self) -> bool {
        self.in_lap
    }
}
