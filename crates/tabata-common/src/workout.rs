use serde::{Deserialize, Serialize};

/// A movement with an approximate burn rate. Intervals may reference one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Exercise {
    pub id: Option<i64>,
    pub name: String,
    pub category: String,
    pub calories_per_minute: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Interval {
    pub id: Option<i64>,
    pub position: i64,
    pub duration_seconds: i64,
    #[serde(default)]
    pub exercise: Option<Exercise>,
}

/// An ordered group of intervals inside a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub id: Option<i64>,
    pub name: String,
    pub position: i64,
    #[serde(default)]
    pub intervals: Vec<Interval>,
}

/// A complete workout definition: warmup, blocks of intervals, recovery.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub id: Option<i64>,
    pub name: String,
    pub warmup_seconds: i64,
    pub recovery_seconds: i64,
    #[serde(default)]
    pub blocks: Vec<Block>,
}

impl Exercise {
    pub fn new(name: impl Into<String>, category: impl Into<String>, calories_per_minute: f64) -> Self {
        Self {
            id: None,
            name: name.into(),
            category: category.into(),
            calories_per_minute,
        }
    }
}

impl Interval {
    pub fn new(position: i64, duration_seconds: i64, exercise: Option<Exercise>) -> Self {
        Self {
            id: None,
            position,
            duration_seconds,
            exercise,
        }
    }

    /// Calories for this interval, zero when no exercise is attached.
    pub fn estimated_calories(&self) -> f64 {
        self.exercise
            .as_ref()
            .map(|e| self.duration_seconds as f64 * e.calories_per_minute / 60.0)
            .unwrap_or(0.0)
    }
}

impl Block {
    pub fn new(name: impl Into<String>, position: i64, intervals: Vec<Interval>) -> Self {
        Self {
            id: None,
            name: name.into(),
            position,
            intervals,
        }
    }

    pub fn ordered_intervals(&self) -> Vec<&Interval> {
        let mut intervals: Vec<&Interval> = self.intervals.iter().collect();
        intervals.sort_by_key(|i| i.position);
        intervals
    }
}

impl Session {
    pub fn new(name: impl Into<String>, warmup_seconds: i64, recovery_seconds: i64) -> Self {
        Self {
            id: None,
            name: name.into(),
            warmup_seconds,
            recovery_seconds,
            blocks: Vec::new(),
        }
    }

    pub fn with_blocks(mut self, blocks: Vec<Block>) -> Self {
        self.blocks = blocks;
        self
    }

    pub fn ordered_blocks(&self) -> Vec<&Block> {
        let mut blocks: Vec<&Block> = self.blocks.iter().collect();
        blocks.sort_by_key(|b| b.position);
        blocks
    }

    /// Warmup and recovery are each counted once, regardless of block count.
    pub fn total_duration_seconds(&self) -> i64 {
        let work: i64 = self
            .blocks
            .iter()
            .flat_map(|b| b.intervals.iter())
            .map(|i| i.duration_seconds)
            .sum();
        self.warmup_seconds + self.recovery_seconds + work
    }

    pub fn estimated_calories(&self) -> f64 {
        self.blocks
            .iter()
            .flat_map(|b| b.intervals.iter())
            .map(Interval::estimated_calories)
            .sum()
    }
}
