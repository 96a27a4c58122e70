use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Mutex, MutexGuard};

use tabata_common::{Block, Error, Exercise, Interval, Result, Session};

use crate::repository::{BlockRepository, ExerciseRepository, SessionRepository};

/// Process-local workout storage with the same semantics as the SQLite
/// repositories: ids are assigned on create, deleting a session removes its
/// blocks, and interval exercises are resolved by id at read time.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

pub struct MemoryExerciseRepository<'s> {
    store: &'s MemoryStore,
}

pub struct MemoryBlockRepository<'s> {
    store: &'s MemoryStore,
}

pub struct MemorySessionRepository<'s> {
    store: &'s MemoryStore,
}

#[derive(Default)]
struct MemoryState {
    last_id: i64,
    exercises: BTreeMap<i64, Exercise>,
    sessions: BTreeMap<i64, Session>,
    blocks: BTreeMap<i64, StoredBlock>,
}

struct StoredBlock {
    session_id: i64,
    block: Block,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn exercises(&self) -> MemoryExerciseRepository<'_> {
        MemoryExerciseRepository { store: self }
    }

    pub fn blocks(&self) -> MemoryBlockRepository<'_> {
        MemoryBlockRepository { store: self }
    }

    pub fn sessions(&self) -> MemorySessionRepository<'_> {
        MemorySessionRepository { store: self }
    }

    fn state(&self) -> Result<MutexGuard<'_, MemoryState>> {
        self.state
            .lock()
            .map_err(|_| Error::Database("memory store lock poisoned".into()))
    }
}

impl MemoryState {
    fn next_id(&mut self) -> i64 {
        self.last_id += 1;
        self.last_id
    }

    fn resolve(&self, interval: &Interval) -> Interval {
        let exercise = interval
            .exercise
            .as_ref()
            .and_then(|e| e.id)
            .and_then(|id| self.exercises.get(&id).cloned());
        Interval {
            exercise,
            ..interval.clone()
        }
    }

    fn insert_block(&mut self, block: &Block, session_id: i64) -> Block {
        let block_id = self.next_id();
        let intervals = block
            .ordered_intervals()
            .into_iter()
            .map(|interval| Interval {
                id: Some(self.next_id()),
                // Unsaved exercises cannot be referenced, same as a NULL exercise_id.
                exercise: interval.exercise.clone().filter(|e| e.id.is_some()),
                ..interval.clone()
            })
            .collect();
        let created = Block {
            id: Some(block_id),
            name: block.name.clone(),
            position: block.position,
            intervals,
        };
        self.blocks.insert(
            block_id,
            StoredBlock {
                session_id,
                block: created.clone(),
            },
        );
        created
    }

    fn insert_session(&mut self, session: &Session) -> Session {
        let id = self.next_id();
        let created = Session {
            id: Some(id),
            blocks: Vec::new(),
            ..session.clone()
        };
        self.sessions.insert(id, created.clone());
        created
    }

    fn session_blocks(&self, session_id: i64, with_intervals: bool) -> Vec<Block> {
        let mut blocks: Vec<Block> = self
            .blocks
            .values()
            .filter(|stored| stored.session_id == session_id)
            .map(|stored| {
                let mut block = stored.block.clone();
                block.intervals = if with_intervals {
                    let mut intervals: Vec<Interval> =
                        block.intervals.iter().map(|i| self.resolve(i)).collect();
                    intervals.sort_by_key(|i| i.position);
                    intervals
                } else {
                    Vec::new()
                };
                block
            })
            .collect();
        blocks.sort_by_key(|b| b.position);
        blocks
    }

    fn session_with_details(&self, session_id: i64) -> Option<Session> {
        let mut session = self.sessions.get(&session_id)?.clone();
        session.blocks = self.session_blocks(session_id, true);
        Some(session)
    }
}

impl ExerciseRepository for MemoryExerciseRepository<'_> {
    fn create(&self, exercise: &Exercise) -> Result<Exercise> {
        let mut state = self.store.state()?;
        let id = state.next_id();
        let created = Exercise {
            id: Some(id),
            ..exercise.clone()
        };
        state.exercises.insert(id, created.clone());
        Ok(created)
    }

    fn get(&self, exercise_id: i64) -> Result<Option<Exercise>> {
        Ok(self.store.state()?.exercises.get(&exercise_id).cloned())
    }

    fn list(&self) -> Result<Vec<Exercise>> {
        let mut exercises: Vec<Exercise> = self.store.state()?.exercises.values().cloned().collect();
        exercises.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(exercises)
    }

    fn list_by_category(&self, category: &str) -> Result<Vec<Exercise>> {
        Ok(self
            .list()?
            .into_iter()
            .filter(|e| e.category == category)
            .collect())
    }

    fn update(&self, exercise: &Exercise) -> Result<Exercise> {
        let id = exercise
            .id
            .ok_or_else(|| Error::InvalidInput("exercise id is required for update".into()))?;
        let mut state = self.store.state()?;
        if let Some(existing) = state.exercises.get_mut(&id) {
            *existing = exercise.clone();
        }
        Ok(exercise.clone())
    }

    fn delete(&self, exercise_id: i64) -> Result<()> {
        let mut state = self.store.state()?;
        let referenced = state.blocks.values().any(|stored| {
            stored
                .block
                .intervals
                .iter()
                .any(|i| i.exercise.as_ref().and_then(|e| e.id) == Some(exercise_id))
        });
        if referenced {
            return Err(Error::Database(format!(
                "exercise {exercise_id} is still referenced by an interval"
            )));
        }
        state.exercises.remove(&exercise_id);
        Ok(())
    }
}

impl BlockRepository for MemoryBlockRepository<'_> {
    fn create(&self, block: &Block, session_id: i64) -> Result<Block> {
        let mut state = self.store.state()?;
        if !state.sessions.contains_key(&session_id) {
            return Err(Error::NotFound(format!("session {session_id}")));
        }
        Ok(state.insert_block(block, session_id))
    }

    fn get(&self, block_id: i64) -> Result<Option<Block>> {
        Ok(self.store.state()?.blocks.get(&block_id).map(|stored| Block {
            intervals: Vec::new(),
            ..stored.block.clone()
        }))
    }

    fn list_by_session(&self, session_id: i64) -> Result<Vec<Block>> {
        Ok(self.store.state()?.session_blocks(session_id, false))
    }

    fn get_with_intervals(&self, block_id: i64) -> Result<Option<Block>> {
        let state = self.store.state()?;
        Ok(state.blocks.get(&block_id).map(|stored| {
            let mut block = stored.block.clone();
            block.intervals = block.intervals.iter().map(|i| state.resolve(i)).collect();
            block
        }))
    }

    fn list_with_intervals(&self, session_id: i64) -> Result<Vec<Block>> {
        Ok(self.store.state()?.session_blocks(session_id, true))
    }

    fn update(&self, block: &Block) -> Result<Block> {
        let id = block
            .id
            .ok_or_else(|| Error::InvalidInput("block id is required for update".into()))?;
        let mut state = self.store.state()?;
        if let Some(stored) = state.blocks.get_mut(&id) {
            stored.block.name = block.name.clone();
            stored.block.position = block.position;
        }
        Ok(block.clone())
    }

    fn delete(&self, block_id: i64) -> Result<()> {
        self.store.state()?.blocks.remove(&block_id);
        Ok(())
    }
}

impl SessionRepository for MemorySessionRepository<'_> {
    fn create(&self, session: &Session) -> Result<Session> {
        Ok(self.store.state()?.insert_session(session))
    }

    fn create_with_blocks(&self, session: &Session) -> Result<Session> {
        let mut state = self.store.state()?;
        let mut created = state.insert_session(session);
        let session_id = created.id.unwrap_or_default();
        for block in session.ordered_blocks() {
            created.blocks.push(state.insert_block(block, session_id));
        }
        Ok(created)
    }

    fn get(&self, session_id: i64) -> Result<Option<Session>> {
        Ok(self.store.state()?.sessions.get(&session_id).cloned())
    }

    fn get_with_details(&self, session_id: i64) -> Result<Option<Session>> {
        Ok(self.store.state()?.session_with_details(session_id))
    }

    fn list(&self) -> Result<Vec<Session>> {
        Ok(self.store.state()?.sessions.values().cloned().collect())
    }

    fn update(&self, session: &Session) -> Result<Session> {
        let id = session
            .id
            .ok_or_else(|| Error::InvalidInput("session id is required for update".into()))?;
        let mut state = self.store.state()?;
        if let Some(existing) = state.sessions.get_mut(&id) {
            existing.name = session.name.clone();
            existing.warmup_seconds = session.warmup_seconds;
            existing.recovery_seconds = session.recovery_seconds;
        }
        Ok(session.clone())
    }

    fn update_with_blocks(&self, session: &Session) -> Result<Session> {
        let id = session
            .id
            .ok_or_else(|| Error::InvalidInput("session id is required for update".into()))?;
        let mut state = self.store.state()?;
        if let Some(existing) = state.sessions.get_mut(&id) {
            existing.name = session.name.clone();
            existing.warmup_seconds = session.warmup_seconds;
            existing.recovery_seconds = session.recovery_seconds;
        }
        state.blocks.retain(|_, stored| stored.session_id != id);

        let mut updated = session.clone();
        updated.blocks = session
            .ordered_blocks()
            .into_iter()
            .map(|block| state.insert_block(block, id))
            .collect();
        Ok(updated)
    }

    fn delete(&self, session_id: i64) -> Result<()> {
        let mut state = self.store.state()?;
        state.sessions.remove(&session_id);
        state.blocks.retain(|_, stored| stored.session_id != session_id);
        Ok(())
    }

    fn total_duration_seconds(&self, session_id: i64) -> Result<i64> {
        Ok(self
            .store
            .state()?
            .session_with_details(session_id)
            .map(|s| s.total_duration_seconds())
            .unwrap_or(0))
    }

    fn estimate_calories(&self, session_id: i64) -> Result<f64> {
        self.estimate_calories_for_history(&[session_id])
    }

    fn estimate_calories_for_history(&self, session_ids: &[i64]) -> Result<f64> {
        let state = self.store.state()?;
        let distinct: BTreeSet<i64> = session_ids.iter().copied().collect();
        Ok(distinct
            .into_iter()
            .filter_map(|id| state.session_with_details(id))
            .map(|s| s.estimated_calories())
            .sum())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded(store: &MemoryStore) -> Session {
        let burpees = store
            .exercises()
            .create(&Exercise::new("Burpees", "full-body", 12.0))
            .unwrap();
        let session = Session::new("Morning", 60, 30).with_blocks(vec![
            Block::new("second", 2, vec![Interval::new(1, 20, None)]),
            Block::new(
                "first",
                1,
                vec![
                    Interval::new(2, 10, None),
                    Interval::new(1, 30, Some(burpees)),
                ],
            ),
        ]);
        store.sessions().create_with_blocks(&session).unwrap()
    }

    #[test]
    fn create_with_blocks_assigns_ids_in_order() {
        let store = MemoryStore::new();
        let session = seeded(&store);

        assert!(session.id.is_some());
        let names: Vec<_> = session.blocks.iter().map(|b| b.name.as_str()).collect();
        assert_eq!(names, ["first", "second"]);
        let positions: Vec<_> = session.blocks[0].intervals.iter().map(|i| i.position).collect();
        assert_eq!(positions, [1, 2]);
    }

    #[test]
    fn matches_sqlite_arithmetic() {
        let store = MemoryStore::new();
        let session = seeded(&store);
        let id = session.id.unwrap();
        let sessions = store.sessions();

        assert_eq!(sessions.total_duration_seconds(id).unwrap(), 60 + 30 + 30 + 10 + 20);
        assert!((sessions.estimate_calories(id).unwrap() - 6.0).abs() < 1e-9);
        assert!((sessions.estimate_calories_for_history(&[id, id]).unwrap() - 6.0).abs() < 1e-9);
        assert_eq!(sessions.total_duration_seconds(42).unwrap(), 0);
        assert_eq!(sessions.estimate_calories_for_history(&[]).unwrap(), 0.0);
    }

    #[test]
    fn referenced_exercise_cannot_be_deleted() {
        let store = MemoryStore::new();
        let session = seeded(&store);
        let burpees = session.blocks[0].intervals[0].exercise.clone().unwrap();
        let id = burpees.id.unwrap();

        let err = store.exercises().delete(id).unwrap_err();
        assert!(matches!(err, Error::Database(_)));
        assert!(store.exercises().get(id).unwrap().is_some());

        store.sessions().delete(session.id.unwrap()).unwrap();
        store.exercises().delete(id).unwrap();
        assert!(store.exercises().get(id).unwrap().is_none());
    }

    #[test]
    fn interval_exercises_reflect_updates() {
        let store = MemoryStore::new();
        let session = seeded(&store);

        let mut burpees = store.exercises().list().unwrap().remove(0);
        burpees.calories_per_minute = 6.0;
        store.exercises().update(&burpees).unwrap();

        let calories = store.sessions().estimate_calories(session.id.unwrap()).unwrap();
        assert!((calories - 3.0).abs() < 1e-9);
    }

    #[test]
    fn delete_session_removes_blocks() {
        let store = MemoryStore::new();
        let session = seeded(&store);
        let id = session.id.unwrap();

        store.sessions().delete(id).unwrap();
        assert!(store.sessions().get(id).unwrap().is_none());
        assert!(store.blocks().list_by_session(id).unwrap().is_empty());
    }

    #[test]
    fn list_by_session_omits_intervals() {
        let store = MemoryStore::new();
        let session = seeded(&store);
        let blocks = store.blocks().list_by_session(session.id.unwrap()).unwrap();
        assert_eq!(blocks.len(), 2);
        assert!(blocks.iter().all(|b| b.intervals.is_empty()));
    }

    #[test]
    fn creating_block_for_unknown_session_fails() {
        let store = MemoryStore::new();
        let err = store
            .blocks()
            .create(&Block::new("orphan", 1, vec![]), 7)
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[test]
    fn update_with_blocks_replaces_previous_blocks() {
        let store = MemoryStore::new();
        let session = seeded(&store);
        let id = session.id.unwrap();

        let mut edited = session.clone();
        edited.blocks = vec![Block::new("only", 1, vec![])];
        store.sessions().update_with_blocks(&edited).unwrap();

        let loaded = store.sessions().get_with_details(id).unwrap().unwrap();
        assert_eq!(loaded.blocks.len(), 1);
        assert_eq!(loaded.blocks[0].name, "only");
    }
}
