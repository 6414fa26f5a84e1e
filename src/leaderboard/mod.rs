// Leaderboard module
// Persists completed runs per level and serves ranked views of them

pub mod storage;
pub mod store;
pub mod types;
pub mod view;

// Re-export commonly used types
pub use storage::{FileBasedStorage, MemoryStorage, SnapshotStorage};
pub use store::{CorruptSnapshotPolicy, LeaderboardStore, StoreOptions};
pub use types::{LevelId, LevelRegistry, Record, RecordId, Snapshot};
pub use view::{LeaderboardView, RankedEntry};
