//! Storage-agnostic access to workout definitions.
//!
//! Each trait has a SQLite implementation (`sqlite_store`) and an in-memory
//! one (`memory_store`) for tests and ephemeral use.

use tabata_common::{Block, Exercise, Result, Session};

pub trait ExerciseRepository {
    fn create(&self, exercise: &Exercise) -> Result<Exercise>;
    fn get(&self, exercise_id: i64) -> Result<Option<Exercise>>;
    /// All exercises ordered by name.
    fn list(&self) -> Result<Vec<Exercise>>;
    fn list_by_category(&self, category: &str) -> Result<Vec<Exercise>>;
    fn update(&self, exercise: &Exercise) -> Result<Exercise>;
    fn delete(&self, exercise_id: i64) -> Result<()>;
}

pub trait BlockRepository {
    /// Insert the block and its intervals, in position order.
    fn create(&self, block: &Block, session_id: i64) -> Result<Block>;
    /// The block without its intervals.
    fn get(&self, block_id: i64) -> Result<Option<Block>>;
    fn list_by_session(&self, session_id: i64) -> Result<Vec<Block>>;
    fn get_with_intervals(&self, block_id: i64) -> Result<Option<Block>>;
    fn list_with_intervals(&self, session_id: i64) -> Result<Vec<Block>>;
    fn update(&self, block: &Block) -> Result<Block>;
    fn delete(&self, block_id: i64) -> Result<()>;
}

pub trait SessionRepository {
    /// Insert the session row only; `session.blocks` is ignored.
    fn create(&self, session: &Session) -> Result<Session>;
    /// Insert the session with all of its blocks and intervals atomically.
    fn create_with_blocks(&self, session: &Session) -> Result<Session>;
    fn get(&self, session_id: i64) -> Result<Option<Session>>;
    fn get_with_details(&self, session_id: i64) -> Result<Option<Session>>;
    fn list(&self) -> Result<Vec<Session>>;
    fn update(&self, session: &Session) -> Result<Session>;
    /// Update the session row and replace all of its blocks atomically.
    fn update_with_blocks(&self, session: &Session) -> Result<Session>;
    fn delete(&self, session_id: i64) -> Result<()>;
    /// Warmup + recovery + every interval. Zero for an unknown session.
    fn total_duration_seconds(&self, session_id: i64) -> Result<i64>;
    fn estimate_calories(&self, session_id: i64) -> Result<f64>;
    /// Calories across several sessions; each distinct id counts once.
    fn estimate_calories_for_history(&self, session_ids: &[i64]) -> Result<f64>;
}
