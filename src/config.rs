use serde::{Deserialize, Serialize};
use std::{
    collections::HashSet,
    path::{Path, PathBuf},
    time::Duration,
};

use crate::TimeTrialError;
use crate::leaderboard::{
    CorruptSnapshotPolicy, FileBasedStorage, LevelRegistry, StoreOptions,
    store::{DEFAULT_LEADERBOARD_SIZE, DEFAULT_PLAYER_NAME, DEFAULT_SLOW_SAVE_WARNING_MS},
};

const CONFIG_FILE_NAME: &str = "config.json";

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    pub levels: Vec<u32>,
    pub default_player_name: String,
    pub leaderboard_size: usize,
    pub snapshot_path: Option<PathBuf>,
    pub on_corrupt_snapshot: CorruptSnapshotPolicy,
    pub slow_save_warning_ms: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            levels: vec![1, 2, 3],
            default_player_name: DEFAULT_PLAYER_NAME.to_string(),
            leaderboard_size: DEFAULT_LEADERBOARD_SIZE,
            snapshot_path: None,
            on_corrupt_snapshot: CorruptSnapshotPolicy::default(),
            slow_save_warning_ms: DEFAULT_SLOW_SAVE_WARNING_MS,
        }
    }
}

impl AppConfig {
    pub fn default_config_path() -> Result<PathBuf, TimeTrialError> {
        Ok(dirs::config_dir()
            .ok_or(TimeTrialError::NoDataDir)?
            .join("timetrial")
            .join(CONFIG_FILE_NAME))
    }

    /// Read the config from the user's config directory, `None` if it was never written
    pub fn from_local_file() -> Result<Option<Self>, TimeTrialError> {
        Self::from_file(&Self::default_config_path()?)
    }

    pub fn from_file(config_path: &Path) -> Result<Option<Self>, TimeTrialError> {
        if !config_path.exists() {
            return Ok(None);
        }

        let file =
            std::fs::File::open(config_path).map_err(|e| TimeTrialError::ConfigIO { source: e })?;
        let config: Self = serde_json::from_reader(file)
            .map_err(|e| TimeTrialError::ConfigSerialize { source: e })?;
        config.validate()?;
        Ok(Some(config))
    }

    /// Load from `config_path`, or the default location, falling back to defaults
    pub fn load_or_default(config_path: Option<&Path>) -> Result<Self, TimeTrialError> {
        let loaded = match config_path {
            Some(path) => Self::from_file(path)?,
            None => Self::from_local_file()?,
        };
        Ok(loaded.unwrap_or_default())
    }

    pub fn save(&self) -> Result<(), TimeTrialError> {
        self.save_to(&Self::default_config_path()?)
    }

    pub fn save_to(&self, config_path: &Path) -> Result<(), TimeTrialError> {
        if let Some(parent) = config_path.parent() {
            if !parent.exists() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| TimeTrialError::ConfigIO { source: e })?;
            }
        }

        let file = std::fs::File::create(config_path)
            .map_err(|e| TimeTrialError::ConfigIO { source: e })?;
        serde_json::to_writer_pretty(file, self)
            .map_err(|e| TimeTrialError::ConfigSerialize { source: e })
    }

    pub fn validate(&self) -> Result<(), TimeTrialError> {
        let invalid = |reason: &str| -> Result<(), TimeTrialError> {
            Err(TimeTrialError::InvalidConfig {
                reason: reason.to_string(),
            })
        };

        if self.levels.is_empty() {
            return invalid("at least one level must be configured");
        }
        if self.levels.contains(&0) {
            return invalid("level identifiers must be positive");
        }
        let unique: HashSet<u32> = self.levels.iter().copied().collect();
        if unique.len() != self.levels.len() {
            return invalid("levels must not repeat");
        }
        if self.default_player_name.trim().is_empty() {
            return invalid("default player name cannot be blank");
        }
        if self.leaderboard_size == 0 {
            return invalid("leaderboard size must be at least 1");
        }
        Ok(())
    }

    pub fn level_registry(&self) -> Result<LevelRegistry, TimeTrialError> {
        self.validate()?;
        LevelRegistry::new(self.levels.iter().copied())
    }

    pub fn store_options(&self) -> StoreOptions {
        StoreOptions {
            default_player_name: self.default_player_name.trim().to_string(),
            leaderboard_size: self.leaderboard_size,
            on_corrupt_snapshot: self.on_corrupt_snapshot,
            slow_save_warning: Duration::from_millis(self.slow_save_warning_ms),
        }
    }

    /// The configured snapshot location, or the default data directory
    pub fn snapshot_path(&self) -> Result<PathBuf, TimeTrialError> {
        match &self.snapshot_path {
            Some(path) => Ok(path.clone()),
            None => FileBasedStorage::default_snapshot_path(),
        }
    }
}
