use rusqlite::{Connection, OptionalExtension, Row, params, params_from_iter};
use tabata_common::{Block, Error, Exercise, Interval, Result, Session};

use crate::repository::{BlockRepository, ExerciseRepository, SessionRepository};

/// Exercises stored in the `exercises` table.
pub struct SqliteExerciseRepository<'c> {
    conn: &'c Connection,
}

/// Blocks and their intervals, stored in `blocks` and `intervals`.
pub struct SqliteBlockRepository<'c> {
    conn: &'c Connection,
}

/// Sessions with nested blocks. Multi-row writes run in a transaction.
pub struct SqliteSessionRepository<'c> {
    conn: &'c Connection,
    blocks: SqliteBlockRepository<'c>,
}

impl<'c> SqliteExerciseRepository<'c> {
    pub fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }
}

impl<'c> SqliteBlockRepository<'c> {
    pub fn new(conn: &'c Connection) -> Self {
        Self { conn }
    }

    fn list_intervals(&self, block_id: i64) -> Result<Vec<Interval>> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT intervals.id, intervals.position, intervals.duration_seconds,
                        exercises.id, exercises.name, exercises.category, exercises.calories_per_minute
                 FROM intervals
                 LEFT JOIN exercises ON intervals.exercise_id = exercises.id
                 WHERE intervals.block_id = ?1
                 ORDER BY intervals.position",
            )
            .map_err(|e| Error::Database(format!("failed to prepare query: {e}")))?;

        let rows = stmt
            .query_map(params![block_id], |row| {
                let exercise = match row.get::<_, Option<i64>>(3)? {
                    Some(id) => Some(Exercise {
                        id: Some(id),
                        name: row.get(4)?,
                        category: row.get(5)?,
                        calories_per_minute: row.get(6)?,
                    }),
                    None => None,
                };
                Ok(Interval {
                    id: row.get(0)?,
                    position: row.get(1)?,
                    duration_seconds: row.get(2)?,
                    exercise,
                })
            })
            .map_err(|e| Error::Database(format!("failed to query intervals: {e}")))?;

        collect_rows(rows, "interval")
    }

    fn create_interval(&self, block_id: i64, interval: &Interval) -> Result<Interval> {
        let exercise_id = interval.exercise.as_ref().and_then(|e| e.id);
        self.conn
            .execute(
                "INSERT INTO intervals (block_id, position, duration_seconds, exercise_id)
                 VALUES (?1, ?2, ?3, ?4)",
                params![block_id, interval.position, interval.duration_seconds, exercise_id],
            )
            .map_err(|e| Error::Database(format!("failed to create interval: {e}")))?;

        Ok(Interval {
            id: Some(self.conn.last_insert_rowid()),
            ..interval.clone()
        })
    }
}

impl<'c> SqliteSessionRepository<'c> {
    pub fn new(conn: &'c Connection) -> Self {
        Self {
            conn,
            blocks: SqliteBlockRepository::new(conn),
        }
    }

    fn sum_calories(&self, session_ids: &[i64]) -> Result<f64> {
        let placeholders = vec!["?"; session_ids.len()].join(", ");
        let sql = format!(
            "SELECT COALESCE(SUM(intervals.duration_seconds * exercises.calories_per_minute / 60.0), 0)
             FROM sessions
             LEFT JOIN blocks ON blocks.session_id = sessions.id
             LEFT JOIN intervals ON intervals.block_id = blocks.id
             LEFT JOIN exercises ON intervals.exercise_id = exercises.id
             WHERE sessions.id IN ({placeholders})"
        );
        self.conn
            .query_row(&sql, params_from_iter(session_ids), |row| row.get(0))
            .map_err(|e| Error::Database(format!("failed to estimate calories: {e}")))
    }
}

impl ExerciseRepository for SqliteExerciseRepository<'_> {
    fn create(&self, exercise: &Exercise) -> Result<Exercise> {
        self.conn
            .execute(
                "INSERT INTO exercises (name, category, calories_per_minute) VALUES (?1, ?2, ?3)",
                params![exercise.name, exercise.category, exercise.calories_per_minute],
            )
            .map_err(|e| Error::Database(format!("failed to create exercise: {e}")))?;

        Ok(Exercise {
            id: Some(self.conn.last_insert_rowid()),
            ..exercise.clone()
        })
    }

    fn get(&self, exercise_id: i64) -> Result<Option<Exercise>> {
        self.conn
            .query_row(
                "SELECT id, name, category, calories_per_minute FROM exercises WHERE id = ?1",
                params![exercise_id],
                exercise_from_row,
            )
            .optional()
            .map_err(|e| Error::Database(format!("failed to get exercise: {e}")))
    }

    fn list(&self) -> Result<Vec<Exercise>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name, category, calories_per_minute FROM exercises ORDER BY name")
            .map_err(|e| Error::Database(format!("failed to prepare query: {e}")))?;
        let rows = stmt
            .query_map([], exercise_from_row)
            .map_err(|e| Error::Database(format!("failed to query exercises: {e}")))?;
        collect_rows(rows, "exercise")
    }

    fn list_by_category(&self, category: &str) -> Result<Vec<Exercise>> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT id, name, category, calories_per_minute
                 FROM exercises
                 WHERE category = ?1
                 ORDER BY name",
            )
            .map_err(|e| Error::Database(format!("failed to prepare query: {e}")))?;
        let rows = stmt
            .query_map(params![category], exercise_from_row)
            .map_err(|e| Error::Database(format!("failed to query exercises: {e}")))?;
        collect_rows(rows, "exercise")
    }

    fn update(&self, exercise: &Exercise) -> Result<Exercise> {
        let id = exercise
            .id
            .ok_or_else(|| Error::InvalidInput("exercise id is required for update".into()))?;
        self.conn
            .execute(
                "UPDATE exercises SET name = ?1, category = ?2, calories_per_minute = ?3 WHERE id = ?4",
                params![exercise.name, exercise.category, exercise.calories_per_minute, id],
            )
            .map_err(|e| Error::Database(format!("failed to update exercise: {e}")))?;
        Ok(exercise.clone())
    }

    fn delete(&self, exercise_id: i64) -> Result<()> {
        self.conn
            .execute("DELETE FROM exercises WHERE id = ?1", params![exercise_id])
            .map_err(|e| Error::Database(format!("failed to delete exercise: {e}")))?;
        Ok(())
    }
}

impl BlockRepository for SqliteBlockRepository<'_> {
    fn create(&self, block: &Block, session_id: i64) -> Result<Block> {
        self.conn
            .execute(
                "INSERT INTO blocks (session_id, name, position) VALUES (?1, ?2, ?3)",
                params![session_id, block.name, block.position],
            )
            .map_err(|e| Error::Database(format!("failed to create block: {e}")))?;
        let block_id = self.conn.last_insert_rowid();

        let mut intervals = Vec::with_capacity(block.intervals.len());
        for interval in block.ordered_intervals() {
            intervals.push(self.create_interval(block_id, interval)?);
        }

        Ok(Block {
            id: Some(block_id),
            name: block.name.clone(),
            position: block.position,
            intervals,
        })
    }

    fn get(&self, block_id: i64) -> Result<Option<Block>> {
        self.conn
            .query_row(
                "SELECT id, name, position FROM blocks WHERE id = ?1",
                params![block_id],
                block_from_row,
            )
            .optional()
            .map_err(|e| Error::Database(format!("failed to get block: {e}")))
    }

    fn list_by_session(&self, session_id: i64) -> Result<Vec<Block>> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT id, name, position
                 FROM blocks
                 WHERE session_id = ?1
                 ORDER BY position",
            )
            .map_err(|e| Error::Database(format!("failed to prepare query: {e}")))?;
        let rows = stmt
            .query_map(params![session_id], block_from_row)
            .map_err(|e| Error::Database(format!("failed to query blocks: {e}")))?;
        collect_rows(rows, "block")
    }

    fn get_with_intervals(&self, block_id: i64) -> Result<Option<Block>> {
        let Some(mut block) = self.get(block_id)? else {
            return Ok(None);
        };
        block.intervals = self.list_intervals(block_id)?;
        Ok(Some(block))
    }

    fn list_with_intervals(&self, session_id: i64) -> Result<Vec<Block>> {
        let mut blocks = self.list_by_session(session_id)?;
        for block in &mut blocks {
            if let Some(id) = block.id {
                block.intervals = self.list_intervals(id)?;
            }
        }
        Ok(blocks)
    }

    fn update(&self, block: &Block) -> Result<Block> {
        let id = block
            .id
            .ok_or_else(|| Error::InvalidInput("block id is required for update".into()))?;
        self.conn
            .execute(
                "UPDATE blocks SET name = ?1, position = ?2 WHERE id = ?3",
                params![block.name, block.position, id],
            )
            .map_err(|e| Error::Database(format!("failed to update block: {e}")))?;
        Ok(block.clone())
    }

    fn delete(&self, block_id: i64) -> Result<()> {
        self.conn
            .execute("DELETE FROM blocks WHERE id = ?1", params![block_id])
            .map_err(|e| Error::Database(format!("failed to delete block: {e}")))?;
        Ok(())
    }
}

impl SessionRepository for SqliteSessionRepository<'_> {
    fn create(&self, session: &Session) -> Result<Session> {
        self.conn
            .execute(
                "INSERT INTO sessions (name, warmup_seconds, recovery_seconds) VALUES (?1, ?2, ?3)",
                params![session.name, session.warmup_seconds, session.recovery_seconds],
            )
            .map_err(|e| Error::Database(format!("failed to create session: {e}")))?;

        Ok(Session {
            id: Some(self.conn.last_insert_rowid()),
            name: session.name.clone(),
            warmup_seconds: session.warmup_seconds,
            recovery_seconds: session.recovery_seconds,
            blocks: Vec::new(),
        })
    }

    fn create_with_blocks(&self, session: &Session) -> Result<Session> {
        let tx = self
            .conn
            .unchecked_transaction()
            .map_err(|e| Error::Database(format!("failed to begin transaction: {e}")))?;

        let mut created = self.create(session)?;
        let session_id = created.id.unwrap_or_default();
        for block in session.ordered_blocks() {
            created.blocks.push(self.blocks.create(block, session_id)?);
        }

        tx.commit()
            .map_err(|e| Error::Database(format!("failed to commit session: {e}")))?;
        Ok(created)
    }

    fn get(&self, session_id: i64) -> Result<Option<Session>> {
        self.conn
            .query_row(
                "SELECT id, name, warmup_seconds, recovery_seconds FROM sessions WHERE id = ?1",
                params![session_id],
                session_from_row,
            )
            .optional()
            .map_err(|e| Error::Database(format!("failed to get session: {e}")))
    }

    fn get_with_details(&self, session_id: i64) -> Result<Option<Session>> {
        let Some(mut session) = self.get(session_id)? else {
            return Ok(None);
        };
        session.blocks = self.blocks.list_with_intervals(session_id)?;
        Ok(Some(session))
    }

    fn list(&self) -> Result<Vec<Session>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name, warmup_seconds, recovery_seconds FROM sessions ORDER BY id")
            .map_err(|e| Error::Database(format!("failed to prepare query: {e}")))?;
        let rows = stmt
            .query_map([], session_from_row)
            .map_err(|e| Error::Database(format!("failed to query sessions: {e}")))?;
        collect_rows(rows, "session")
    }

    fn update(&self, session: &Session) -> Result<Session> {
        let id = session
            .id
            .ok_or_else(|| Error::InvalidInput("session id is required for update".into()))?;
        self.conn
            .execute(
                "UPDATE sessions SET name = ?1, warmup_seconds = ?2, recovery_seconds = ?3 WHERE id = ?4",
                params![session.name, session.warmup_seconds, session.recovery_seconds, id],
            )
            .map_err(|e| Error::Database(format!("failed to update session: {e}")))?;
        Ok(session.clone())
    }

    fn update_with_blocks(&self, session: &Session) -> Result<Session> {
        let id = session
            .id
            .ok_or_else(|| Error::InvalidInput("session id is required for update".into()))?;

        let tx = self
            .conn
            .unchecked_transaction()
            .map_err(|e| Error::Database(format!("failed to begin transaction: {e}")))?;

        let mut updated = self.update(session)?;
        self.conn
            .execute("DELETE FROM blocks WHERE session_id = ?1", params![id])
            .map_err(|e| Error::Database(format!("failed to clear session blocks: {e}")))?;
        updated.blocks = Vec::with_capacity(session.blocks.len());
        for block in session.ordered_blocks() {
            updated.blocks.push(self.blocks.create(block, id)?);
        }

        tx.commit()
            .map_err(|e| Error::Database(format!("failed to commit session: {e}")))?;
        Ok(updated)
    }

    fn delete(&self, session_id: i64) -> Result<()> {
        self.conn
            .execute("DELETE FROM sessions WHERE id = ?1", params![session_id])
            .map_err(|e| Error::Database(format!("failed to delete session: {e}")))?;
        Ok(())
    }

    fn total_duration_seconds(&self, session_id: i64) -> Result<i64> {
        let totals: Option<(i64, i64, i64)> = self
            .conn
            .query_row(
                "SELECT sessions.warmup_seconds,
                        sessions.recovery_seconds,
                        COALESCE(SUM(intervals.duration_seconds), 0)
                 FROM sessions
                 LEFT JOIN blocks ON blocks.session_id = sessions.id
                 LEFT JOIN intervals ON intervals.block_id = blocks.id
                 WHERE sessions.id = ?1
                 GROUP BY sessions.id",
                params![session_id],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .optional()
            .map_err(|e| Error::Database(format!("failed to total session duration: {e}")))?;

        Ok(totals.map(|(warmup, recovery, work)| warmup + recovery + work).unwrap_or(0))
    }

    fn estimate_calories(&self, session_id: i64) -> Result<f64> {
        self.sum_calories(&[session_id])
    }

    fn estimate_calories_for_history(&self, session_ids: &[i64]) -> Result<f64> {
        if session_ids.is_empty() {
            return Ok(0.0);
        }
        self.sum_calories(session_ids)
    }
}

fn exercise_from_row(row: &Row<'_>) -> rusqlite::Result<Exercise> {
    Ok(Exercise {
        id: row.get(0)?,
        name: row.get(1)?,
        category: row.get(2)?,
        calories_per_minute: row.get(3)?,
    })
}

fn block_from_row(row: &Row<'_>) -> rusqlite::Result<Block> {
    Ok(Block {
        id: row.get(0)?,
        name: row.get(1)?,
        position: row.get(2)?,
        intervals: Vec::new(),
    })
}

fn session_from_row(row: &Row<'_>) -> rusqlite::Result<Session> {
    Ok(Session {
        id: row.get(0)?,
        name: row.get(1)?,
        warmup_seconds: row.get(2)?,
        recovery_seconds: row.get(3)?,
        blocks: Vec::new(),
    })
}

fn collect_rows<T>(
    rows: impl Iterator<Item = rusqlite::Result<T>>,
    what: &str,
) -> Result<Vec<T>> {
    rows.map(|row| row.map_err(|e| Error::Database(format!("failed to read {what} row: {e}"))))
        .collect()
}
