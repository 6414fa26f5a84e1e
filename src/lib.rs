// Library interface for timetrial
// The binary and integration tests drive the session through these modules

pub mod config;
pub mod errors;
pub mod leaderboard;
pub mod session;
pub mod timer;
pub mod writer;

// Re-export commonly used types
pub use config::AppConfig;
pub use errors::TimeTrialError;
pub use leaderboard::{
    FileBasedStorage, LeaderboardStore, LeaderboardView, LevelId, LevelRegistry, Record,
    RecordId, SnapshotStorage, StoreOptions,
};
pub use session::{SessionEvent, SessionOutput, TimeTrialSession};
pub use timer::{LapCompleted, LapPhase, LapTimer};
