// Ranked, crash-tolerant record store

use itertools::Itertools;
use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

use crate::errors::TimeTrialError;

use super::storage::SnapshotStorage;
use super::types::{
    LevelId, LevelRegistry, Record, RecordId, SNAPSHOT_VERSION, Snapshot, normalize_player_name,
    validate_elapsed,
};
use super::view::LeaderboardView;

pub const DEFAULT_LEADERBOARD_SIZE: usize = 10;
pub const DEFAULT_PLAYER_NAME: &str = "Anonymous";
pub const DEFAULT_SLOW_SAVE_WARNING_MS: u64 = 250;

/// What `load` does with a snapshot it cannot read
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CorruptSnapshotPolicy {
    /// Set the snapshot aside and start from an empty record set
    #[default]
    Reset,
    /// Surface the read error and leave the snapshot untouched
    Fail,
}

/// Tunables for a `LeaderboardStore`
#[derive(Clone, Debug, PartialEq)]
pub struct StoreOptions {
    /// Label stored when a submitted name is blank after trimming
    pub default_player_name: String,
    /// Number of entries in a leaderboard view
    pub leaderboard_size: usize,
    pub on_corrupt_snapshot: CorruptSnapshotPolicy,
    /// Saves slower than this are logged as warnings
    pub slow_save_warning: Duration,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            default_player_name: DEFAULT_PLAYER_NAME.to_string(),
            leaderboard_size: DEFAULT_LEADERBOARD_SIZE,
            on_corrupt_snapshot: CorruptSnapshotPolicy::default(),
            slow_save_warning: Duration::from_millis(DEFAULT_SLOW_SAVE_WARNING_MS),
        }
    }
}

/// Owns the record set, validates submissions and persists every change before returning.
///
/// The store is single-writer: callers sharing it across threads must wrap it in a
/// mutex so that append-then-save sequences never interleave.
pub struct LeaderboardStore<S: SnapshotStorage> {
    storage: S,
    registry: LevelRegistry,
    options: StoreOptions,
    records: Vec<Record>,
}

impl<S: SnapshotStorage> LeaderboardStore<S> {
    /// Create a store with an empty in-memory record set, without touching storage
    pub fn new(storage: S, registry: LevelRegistry, options: StoreOptions) -> Self {
        Self {
            storage,
            registry,
            options,
            records: Vec::new(),
        }
    }

    /// Create a store and load its snapshot
    pub fn open(
        storage: S,
        registry: LevelRegistry,
        options: StoreOptions,
    ) -> Result<Self, TimeTrialError> {
        let mut store = Self::new(storage, registry, options);
        store.load()?;
        Ok(store)
    }

    /// Replace the in-memory record set with the stored snapshot.
    ///
    /// A missing snapshot is bootstrapped by persisting an empty one. An unreadable
    /// snapshot is handled per [`CorruptSnapshotPolicy`]; under `Reset` it is logged,
    /// moved aside and the store continues empty.
    pub fn load(&mut self) -> Result<&[Record], TimeTrialError> {
        match self.storage.load_snapshot() {
            Ok(Some(snapshot)) => {
                if snapshot.version < SNAPSHOT_VERSION {
                    info!(
                        "Snapshot format version {} will be upgraded to {} on next save",
                        snapshot.version, SNAPSHOT_VERSION
                    );
                }
                self.records = Self::retain_valid(snapshot.records);
                info!(
                    "Loaded {} records from {}",
                    self.records.len(),
                    self.storage.describe()
                );
            }
            Ok(None) => {
                info!(
                    "No previous save data found, creating empty snapshot at {}",
                    self.storage.describe()
                );
                self.records.clear();
                self.save()?;
            }
            Err(e) if e.is_storage_read() => match self.options.on_corrupt_snapshot {
                CorruptSnapshotPolicy::Reset => {
                    error!("Error loading save data, starting empty: {}", e);
                    match self.storage.quarantine() {
                        Ok(Some(path)) => warn!("Unreadable snapshot kept at {:?}", path),
                        Ok(None) => {}
                        Err(quarantine_err) => {
                            warn!("Could not set unreadable snapshot aside: {}", quarantine_err)
                        }
                    }
                    self.records.clear();
                }
                CorruptSnapshotPolicy::Fail => {
                    error!("Error loading save data: {}", e);
                    return Err(e);
                }
            },
            Err(e) => return Err(e),
        }

        Ok(&self.records)
    }

    /// Re-read the snapshot, as done before every leaderboard display
    pub fn refresh(&mut self) -> Result<&[Record], TimeTrialError> {
        self.load()
    }

    /// Write the full record set to storage
    pub fn save(&mut self) -> Result<(), TimeTrialError> {
        let snapshot = Snapshot::new(self.records.clone());
        let started = Instant::now();
        let result = self.storage.save_snapshot(&snapshot);
        let took = started.elapsed();

        if took > self.options.slow_save_warning {
            warn!(
                "Saving {} records to {} took {:?}",
                snapshot.records.len(),
                self.storage.describe(),
                took
            );
        }
        result
    }

    /// Validate and append a record, persisting it before returning.
    ///
    /// If persisting fails the record is removed again, so the in-memory set never
    /// holds a record that is not durable.
    pub fn submit(
        &mut self,
        level: LevelId,
        elapsed_seconds: f64,
        player_name: &str,
    ) -> Result<RecordId, TimeTrialError> {
        let level = self.registry.validate(level)?;
        let elapsed_seconds = validate_elapsed(elapsed_seconds)?;
        if player_name.trim().is_empty() {
            debug!(
                "Blank player name stored as {:?}",
                self.options.default_player_name
            );
        }
        let player_name = normalize_player_name(player_name, &self.options.default_player_name);

        self.records
            .push(Record::new(level, elapsed_seconds, player_name));
        let id = RecordId(self.records.len() - 1);

        if let Err(e) = self.save() {
            error!("Could not persist record for {}: {}", level, e);
            self.records.pop();
            return Err(e);
        }

        info!(
            "Recorded {:.2}s on {} as entry {}",
            elapsed_seconds, level, id.0
        );
        Ok(id)
    }

    /// Best `n` records for `level`, fastest first; equal times keep insertion order
    pub fn top_n(&self, level: LevelId, n: usize) -> Vec<Record> {
        self.records
            .iter()
            .filter(|r| r.level == level)
            .sorted_by(|a, b| a.elapsed_seconds.total_cmp(&b.elapsed_seconds))
            .take(n)
            .cloned()
            .collect()
    }

    /// Most recently inserted record for `level`
    pub fn latest(&self, level: LevelId) -> Option<&Record> {
        self.records.iter().rev().find(|r| r.level == level)
    }

    /// Fastest run by `player_name` on `level`, names compared case-insensitively
    pub fn personal_best(&self, level: LevelId, player_name: &str) -> Option<&Record> {
        let wanted = player_name.trim().to_lowercase();
        self.records
            .iter()
            .filter(|r| r.level == level && r.player_name.to_lowercase() == wanted)
            .min_by(|a, b| a.elapsed_seconds.total_cmp(&b.elapsed_seconds))
    }

    /// Ranked view of the configured leaderboard size
    pub fn view(&self, level: LevelId) -> LeaderboardView {
        self.view_top(level, self.options.leaderboard_size)
    }

    pub fn view_top(&self, level: LevelId, n: usize) -> LeaderboardView {
        LeaderboardView::new(
            level,
            self.top_n(level, n),
            self.latest(level).cloned(),
            !self.records.is_empty(),
        )
    }

    /// Every record in insertion order
    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn get(&self, id: RecordId) -> Option<&Record> {
        self.records.get(id.0)
    }

    pub fn registry(&self) -> &LevelRegistry {
        &self.registry
    }

    pub fn options(&self) -> &StoreOptions {
        &self.options
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn storage_mut(&mut self) -> &mut S {
        &mut self.storage
    }

    fn retain_valid(records: Vec<Record>) -> Vec<Record> {
        let before = records.len();
        let kept: Vec<Record> = records
            .into_iter()
            .filter_map(|r| {
                let elapsed_seconds = validate_elapsed(r.elapsed_seconds).ok()?;
                Some(Record { elapsed_seconds, ..r })
            })
            .collect();
        if kept.len() != before {
            warn!(
                "Dropped {} stored records with invalid times",
                before - kept.len()
            );
        }
        kept
    }
}
