// Core data structures for the leaderboard record set

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

use crate::errors::TimeTrialError;

/// Current on-disk snapshot format version
pub const SNAPSHOT_VERSION: u32 = 1;

/// Identifier of a configured course
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(transparent)]
pub struct LevelId(pub u32);

impl fmt::Display for LevelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Level {}", self.0)
    }
}

/// Position of a record in insertion order
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RecordId(pub usize);

/// One completed run
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    /// Course the run was made on
    pub level: LevelId,
    /// Lap duration in seconds
    #[serde(alias = "time")]
    pub elapsed_seconds: f64,
    /// Trimmed, non-empty player name
    pub player_name: String,
}

impl Record {
    pub fn new(level: LevelId, elapsed_seconds: f64, player_name: impl Into<String>) -> Self {
        Self {
            level,
            elapsed_seconds,
            player_name: player_name.into(),
        }
    }
}

/// The on-disk form of the record set
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Snapshot {
    /// Format version; files written before versioning existed read as 0
    #[serde(default)]
    pub version: u32,
    #[serde(rename = "savedData", default)]
    pub records: Vec<Record>,
}

impl Snapshot {
    pub fn new(records: Vec<Record>) -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            records,
        }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new())
    }
}

/// Validated set of levels a record may belong to
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LevelRegistry {
    levels: BTreeSet<LevelId>,
}

impl LevelRegistry {
    /// Build a registry; fails on an empty list or a level numbered 0
    pub fn new(levels: impl IntoIterator<Item = u32>) -> Result<Self, TimeTrialError> {
        let mut set = BTreeSet::new();
        for level in levels {
            if level == 0 {
                return Err(TimeTrialError::InvalidConfig {
                    reason: "level identifiers must be positive".to_string(),
                });
            }
            set.insert(LevelId(level));
        }
        if set.is_empty() {
            return Err(TimeTrialError::InvalidConfig {
                reason: "at least one level must be configured".to_string(),
            });
        }
        Ok(Self { levels: set })
    }

    pub fn contains(&self, level: LevelId) -> bool {
        self.levels.contains(&level)
    }

    /// Configured levels in ascending order
    pub fn levels(&self) -> impl Iterator<Item = LevelId> + '_ {
        self.levels.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.levels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    /// Map a 0-based selector position (e.g. a dropdown) to the level shown at that position
    pub fn level_at_index(&self, index: usize) -> Option<LevelId> {
        self.levels.iter().nth(index).copied()
    }

    /// Check that `level` is configured
    pub fn validate(&self, level: LevelId) -> Result<LevelId, TimeTrialError> {
        if self.contains(level) {
            Ok(level)
        } else {
            Err(TimeTrialError::UnknownLevel { level: level.0 })
        }
    }
}

impl Default for LevelRegistry {
    fn default() -> Self {
        Self {
            levels: [1, 2, 3].into_iter().map(LevelId).collect(),
        }
    }
}

/// Trim a submitted name, substituting `default_name` when nothing is left
pub fn normalize_player_name(raw: &str, default_name: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        default_name.to_string()
    } else {
        trimmed.to_string()
    }
}

/// Reject negative and non-finite lap times; `-0.0` comes back as `0.0`
pub fn validate_elapsed(elapsed_seconds: f64) -> Result<f64, TimeTrialError> {
    if elapsed_seconds == 0.0 {
        Ok(0.0)
    } else if elapsed_seconds.is_finite() && elapsed_seconds > 0.0 {
        Ok(elapsed_seconds)
    } else {
        Err(TimeTrialError::InvalidElapsedTime { elapsed_seconds })
    }
}
