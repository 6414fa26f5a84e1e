// Control loop composition: one lap timer feeding one leaderboard store

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::errors::TimeTrialError;
use crate::leaderboard::{
    LeaderboardStore, LeaderboardView, LevelId, Record, RecordId, SnapshotStorage,
};
use crate::timer::{LapCompleted, LapPhase, LapTimer};

/// Inbound events from the game loop
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SessionEvent {
    LapStart,
    LapEnd,
    Tick { delta_seconds: f64 },
    NameSubmitted { name: String },
    SelectLevel { level: u32 },
    /// Level picked by position in a selector widget, 0-based
    SelectLevelIndex { index: usize },
    RequestView { level: u32 },
}

/// What the game loop should react to
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "output", rename_all = "snake_case")]
pub enum SessionOutput {
    LapStarted,
    /// Prompt the player for a name
    LapCompleted(LapCompleted),
    Submitted { id: usize, record: Record },
    LevelSelected { level: LevelId },
    View(LeaderboardView),
}

pub struct TimeTrialSession<S: SnapshotStorage> {
    timer: LapTimer,
    store: LeaderboardStore<S>,
    selected_level: LevelId,
    pending: Option<LapCompleted>,
}

impl<S: SnapshotStorage> TimeTrialSession<S> {
    /// Start a session on the lowest configured level
    pub fn new(store: LeaderboardStore<S>) -> Self {
        let selected_level = store
            .registry()
            .levels()
            .next()
            .unwrap_or(LevelId(1));
        Self {
            timer: LapTimer::new(),
            store,
            selected_level,
            pending: None,
        }
    }

    pub fn on_lap_start_trigger(&mut self) -> bool {
        let started = self.timer.on_lap_start();
        if started && self.pending.take().is_some() {
            // a new lap supersedes a finished one nobody named
            warn!("Unnamed completed lap discarded by new lap start");
        }
        started
    }

    pub fn on_tick(&mut self, delta_seconds: f64) {
        self.timer.on_tick(delta_seconds);
    }

    pub fn on_lap_end_trigger(&mut self) -> Option<LapCompleted> {
        let completed = self.timer.on_lap_end()?;
        info!(
            "Lap completed in {:.2}s on {}",
            completed.elapsed_seconds, self.selected_level
        );
        self.pending = Some(completed);
        Some(completed)
    }

    /// Record the waiting lap under `name` on the selected level.
    ///
    /// On a storage failure the lap stays pending so the submission can be retried.
    pub fn on_name_submitted(&mut self, name: &str) -> Result<RecordId, TimeTrialError> {
        let completed = self.pending.take().ok_or(TimeTrialError::NoCompletedLap)?;

        match self
            .store
            .submit(self.selected_level, completed.elapsed_seconds, name)
        {
            Ok(id) => Ok(id),
            Err(e) => {
                if e.is_storage_write() {
                    self.pending = Some(completed);
                }
                Err(e)
            }
        }
    }

    pub fn select_level(&mut self, level: LevelId) -> Result<(), TimeTrialError> {
        self.selected_level = self.store.registry().validate(level)?;
        debug!("Selected {}", self.selected_level);
        Ok(())
    }

    pub fn select_level_index(&mut self, index: usize) -> Result<LevelId, TimeTrialError> {
        let level = self
            .store
            .registry()
            .level_at_index(index)
            .ok_or(TimeTrialError::UnknownLevelIndex { index })?;
        self.select_level(level)?;
        Ok(level)
    }

    /// Re-read storage and build the ranked view for `level`
    pub fn request_view(&mut self, level: LevelId) -> Result<LeaderboardView, TimeTrialError> {
        let level = self.store.registry().validate(level)?;
        self.store.refresh()?;
        Ok(self.store.view(level))
    }

    /// Dispatch one event
    pub fn handle(&mut self, event: SessionEvent) -> Result<Option<SessionOutput>, TimeTrialError> {
        let output = match event {
            SessionEvent::LapStart => self
                .on_lap_start_trigger()
                .then_some(SessionOutput::LapStarted),
            SessionEvent::LapEnd => self.on_lap_end_trigger().map(SessionOutput::LapCompleted),
            SessionEvent::Tick { delta_seconds } => {
                self.on_tick(delta_seconds);
                None
            }
            SessionEvent::NameSubmitted { name } => {
                let id = self.on_name_submitted(&name)?;
                self.store.get(id).cloned().map(|record| SessionOutput::Submitted {
                    id: id.0,
                    record,
                })
            }
            SessionEvent::SelectLevel { level } => {
                self.select_level(LevelId(level))?;
                Some(SessionOutput::LevelSelected {
                    level: self.selected_level,
                })
            }
            SessionEvent::SelectLevelIndex { index } => {
                let level = self.select_level_index(index)?;
                Some(SessionOutput::LevelSelected { level })
            }
            SessionEvent::RequestView { level } => {
                Some(SessionOutput::View(self.request_view(LevelId(level))?))
            }
        };
        Ok(output)
    }

    pub fn phase(&self) -> LapPhase {
        self.timer.phase()
    }

    pub fn timer(&self) -> &LapTimer {
        &self.timer
    }

    pub fn store(&self) -> &LeaderboardStore<S> {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut LeaderboardStore<S> {
        &mut self.store
    }

    pub fn selected_level(&self) -> LevelId {
        self.selected_level
    }

    /// Finished lap waiting for a name
    pub fn pending_lap(&self) -> Option<LapCompleted> {
        self.pending
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::leaderboard::{LevelRegistry, MemoryStorage, StoreOptions};

    fn session() -> TimeTrialSession<MemoryStorage> {
        let store = LeaderboardStore::open(
            MemoryStorage::new(),
            LevelRegistry::default(),
            StoreOptions::default(),
        )
        .unwrap();
        TimeTrialSession::new(store)
    }

    fn run_lap(session: &mut TimeTrialSession<MemoryStorage>, ticks: &[f64]) -> LapCompleted {
        assert!(session.on_lap_start_trigger());
        for dt in ticks {
            session.on_tick(*dt);
        }
        session.on_lap_end_trigger().unwrap()
    }

    #[test]
    fn test_defaults_to_lowest_level() {
        assert_eq!(session().selected_level(), LevelId(1));
    }

    #[test]
    fn test_lap_then_name_records_run() {
        let mut session = session();
        session.select_level(LevelId(2)).unwrap();
        run_lap(&mut session, &[1.0, 2.5]);

        let id = session.on_name_submitted("  Ann ").unwrap();

        let record = session.store().get(id).unwrap();
        assert_eq!(record.level, LevelId(2));
        assert_eq!(record.elapsed_seconds, 3.5);
        assert_eq!(record.player_name, "Ann");
        assert!(session.pending_lap().is_none());
    }

    #[test]
    fn test_name_without_lap_is_rejected() {
        let mut session = session();

        let err = session.on_name_submitted("Ann").unwrap_err();
        assert!(matches!(err, TimeTrialError::NoCompletedLap));
    }

    #[test]
    fn test_lap_is_only_submitted_once() {
        let mut session = session();
        run_lap(&mut session, &[1.0]);

        session.on_name_submitted("Ann").unwrap();
        assert!(session.on_name_submitted("Ann").is_err());
        assert_eq!(session.store().records().len(), 1);
    }

    #[test]
    fn test_failed_write_keeps_lap_pending() {
        let mut session = session();
        run_lap(&mut session, &[2.0]);
        session.store_mut().storage_mut().set_fail_writes(true);

        assert!(session.on_name_submitted("Ann").unwrap_err().is_storage_write());
        assert!(session.pending_lap().is_some());

        session.store_mut().storage_mut().set_fail_writes(false);
        session.on_name_submitted("Ann").unwrap();
        assert_eq!(session.store().records().len(), 1);
    }

    #[test]
    fn test_select_unknown_level() {
        let mut session = session();

        assert!(session.select_level(LevelId(99)).is_err());
        assert_eq!(session.selected_level(), LevelId(1));
    }

    #[test]
    fn test_select_level_by_index() {
        let mut session = session();

        assert_eq!(session.select_level_index(2).unwrap(), LevelId(3));
        assert_eq!(session.selected_level(), LevelId(3));
        assert!(matches!(
            session.select_level_index(3),
            Err(TimeTrialError::UnknownLevelIndex { index: 3 })
        ));
    }

    #[test]
    fn test_view_does_not_change_selection() {
        let mut session = session();
        run_lap(&mut session, &[4.0]);
        session.on_name_submitted("Ann").unwrap();

        let view = session.request_view(LevelId(2)).unwrap();
        assert!(view.is_empty());
        assert_eq!(session.selected_level(), LevelId(1));

        let view = session.request_view(LevelId(1)).unwrap();
        assert_eq!(view.entries.len(), 1);
        assert_eq!(view.latest.unwrap().player_name, "Ann");
    }

    #[test]
    fn test_handle_event_stream() {
        let mut session = session();
        let events = vec![
            SessionEvent::SelectLevel { level: 3 },
            SessionEvent::LapStart,
            SessionEvent::Tick { delta_seconds: 1.5 },
            SessionEvent::LapStart,
            SessionEvent::Tick { delta_seconds: 1.5 },
            SessionEvent::LapEnd,
            SessionEvent::LapEnd,
            SessionEvent::NameSubmitted {
                name: "Cy".to_string(),
            },
        ];

        let outputs: Vec<SessionOutput> = events
            .into_iter()
            .filter_map(|e| session.handle(e).unwrap())
            .collect();

        assert_eq!(
            outputs,
            vec![
                SessionOutput::LevelSelected { level: LevelId(3) },
                SessionOutput::LapStarted,
                SessionOutput::LapCompleted(LapCompleted {
                    elapsed_seconds: 3.0
                }),
                SessionOutput::Submitted {
                    id: 0,
                    record: Record::new(LevelId(3), 3.0, "Cy"),
                },
            ]
        );
    }

    #[test]
    fn test_event_json_format() {
        let event: SessionEvent =
            serde_json::from_str(r#"{"event":"tick","delta_seconds":0.016}"#).unwrap();
        assert_eq!(
            event,
            SessionEvent::Tick {
                delta_seconds: 0.016
            }
        );

        let event: SessionEvent =
            serde_json::from_str(r#"{"event":"name_submitted","name":"Bo"}"#).unwrap();
        assert_eq!(
            event,
            SessionEvent::NameSubmitted {
                name: "Bo".to_string()
            }
        );
    }
}
