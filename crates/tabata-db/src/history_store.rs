use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use tabata_common::{Result, SessionRecord};
use tracing::{debug, info};

/// Completed workouts kept as a JSON array on disk, sorted by completion time.
pub struct HistoryStore {
    path: PathBuf,
}

impl HistoryStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn add_session(&self, record: SessionRecord) -> Result<()> {
        let mut sessions = self.load()?;
        sessions.push(record);
        sessions.sort_by_key(|r| r.completed_at);
        self.save(&sessions)?;
        info!("recorded session in {} ({} total)", self.path.display(), sessions.len());
        Ok(())
    }

    /// Sessions completed within the inclusive bounds, newest first.
    pub fn list_sessions(
        &self,
        start: Option<NaiveDateTime>,
        end: Option<NaiveDateTime>,
    ) -> Result<Vec<SessionRecord>> {
        let mut sessions: Vec<SessionRecord> = self
            .load()?
            .into_iter()
            .filter(|r| start.is_none_or(|s| r.completed_at >= s))
            .filter(|r| end.is_none_or(|e| r.completed_at <= e))
            .collect();
        sessions.sort_by(|a, b| b.completed_at.cmp(&a.completed_at));
        Ok(sessions)
    }

    fn load(&self) -> Result<Vec<SessionRecord>> {
        if !self.path.exists() {
            debug!("no history file at {}", self.path.display());
            return Ok(Vec::new());
        }
        let contents = std::fs::read_to_string(&self.path)?;
        Ok(serde_json::from_str(&contents)?)
    }

    fn save(&self, sessions: &[SessionRecord]) -> Result<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        let payload = serde_json::to_string_pretty(sessions)?;
        std::fs::write(&self.path, payload)?;
        Ok(())
    }
}
