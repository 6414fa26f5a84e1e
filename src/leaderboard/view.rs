// Leaderboard display data handed to the renderer

use serde::Serialize;
use std::fmt;

use super::types::{LevelId, Record};

/// A record with its 1-based position on the board
#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct RankedEntry {
    pub rank: usize,
    pub record: Record,
}

/// Ranked top entries plus the most recent run for one level
#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct LeaderboardView {
    pub level: LevelId,
    pub entries: Vec<RankedEntry>,
    /// Most recently inserted record for the level, independent of rank
    pub latest: Option<Record>,
    /// Whether the store held any records at all, on any level
    pub has_save_data: bool,
}

impl LeaderboardView {
    pub fn new(
        level: LevelId,
        ranked: Vec<Record>,
        latest: Option<Record>,
        has_save_data: bool,
    ) -> Self {
        let entries = ranked
            .into_iter()
            .enumerate()
            .map(|(i, record)| RankedEntry {
                rank: i + 1,
                record,
            })
            .collect();
        Self {
            level,
            entries,
            latest,
            has_save_data,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The "last logged time" line
    pub fn latest_summary(&self) -> String {
        match &self.latest {
            Some(record) => format!(
                "Last Logged Time for {}: {:.2}s",
                self.level, record.elapsed_seconds
            ),
            None if self.has_save_data => {
                format!("Last Logged Time for {}: No Entries", self.level)
            }
            None => "No save data found to display last logged time!".to_string(),
        }
    }
}

impl fmt::Display for RankedEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}, Level: {}, Time: {:.2}s",
            self.record.player_name, self.record.level.0, self.record.elapsed_seconds
        )
    }
}

impl fmt::Display for LeaderboardView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.entries.is_empty() {
            writeln!(f, "No entries")?;
        } else {
            for entry in &self.entries {
                writeln!(f, "{}", entry)?;
            }
        }
        write!(f, "{}", self.latest_summary())
    }
}
