// Error types for timetrial

use snafu::Snafu;
use std::{io, path::PathBuf};

#[derive(Debug, Snafu)]
pub enum TimeTrialError {
    // Submission validation errors
    #[snafu(display("Level {level} is not a configured level"))]
    UnknownLevel { level: u32 },
    #[snafu(display("Elapsed time must be finite and non-negative, got {elapsed_seconds}"))]
    InvalidElapsedTime { elapsed_seconds: f64 },
    #[snafu(display("No level at selector position {index}"))]
    UnknownLevelIndex { index: usize },
    #[snafu(display("No completed lap is waiting for a player name"))]
    NoCompletedLap,

    // Snapshot read errors, recovered by the store unless configured otherwise
    #[snafu(display("Unable to read snapshot {}", path.display()))]
    StorageRead { path: PathBuf, source: io::Error },
    #[snafu(display("Snapshot {} is malformed", path.display()))]
    SnapshotDecode {
        path: PathBuf,
        source: serde_json::Error,
    },

    // Snapshot write errors, always surfaced to the caller
    #[snafu(display("Snapshot write failed: {operation} on {}", path.display()))]
    StorageWrite {
        operation: String,
        path: PathBuf,
        source: io::Error,
    },
    #[snafu(display("Error serializing snapshot"))]
    SnapshotEncode { source: serde_json::Error },

    // Config management errors
    #[snafu(display("Could not find application data directory"))]
    NoDataDir,
    #[snafu(display("Error reading or writing config file"))]
    ConfigIO { source: io::Error },
    #[snafu(display("Error (de)serializing config file"))]
    ConfigSerialize { source: serde_json::Error },
    #[snafu(display("Invalid configuration: {reason}"))]
    InvalidConfig { reason: String },

    // Event replay and export errors
    #[snafu(display("Error reading session event log"))]
    EventLog { source: io::Error },
    #[snafu(display("Error exporting records"))]
    Export { source: io::Error },
    #[snafu(display("Error serializing session output"))]
    OutputEncode { source: serde_json::Error },
}

impl TimeTrialError {
    /// True for rejected submissions; nothing was persisted and the player can be re-prompted.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::UnknownLevel { .. }
                | Self::UnknownLevelIndex { .. }
                | Self::InvalidElapsedTime { .. }
                | Self::NoCompletedLap
        )
    }

    /// True when a record may not be durable and the caller should retry or alert the player.
    pub fn is_storage_write(&self) -> bool {
        matches!(self, Self::StorageWrite { .. } | Self::SnapshotEncode { .. })
    }

    /// True for unreadable or malformed snapshots.
    pub fn is_storage_read(&self) -> bool {
        matches!(self, Self::StorageRead { .. } | Self::SnapshotDecode { .. })
    }
}
