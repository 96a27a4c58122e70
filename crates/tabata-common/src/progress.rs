//! Aggregate statistics over completed workouts.

use std::collections::BTreeMap;

use chrono::{Datelike, Duration, NaiveDateTime};
use serde::Serialize;

use crate::history::SessionRecord;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WeeklyProgress {
    pub week_start: NaiveDateTime,
    pub total_minutes: u64,
    pub total_calories: u64,
    pub sessions_completed: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct YearlyProgress {
    pub year: i32,
    pub total_minutes: u64,
    pub total_calories: u64,
    pub sessions_completed: usize,
}

#[derive(Default)]
struct Bucket {
    minutes: u64,
    calories: u64,
    count: usize,
}

impl Bucket {
    fn add(&mut self, record: &SessionRecord) {
        self.minutes += u64::from(record.duration_minutes);
        self.calories += u64::from(record.calories);
        self.count += 1;
    }
}

/// Totals per week, ordered by week start (Monday 00:00).
pub fn weekly_progress<'a, I>(records: I) -> Vec<WeeklyProgress>
where
    I: IntoIterator<Item = &'a SessionRecord>,
{
    let mut buckets: BTreeMap<NaiveDateTime, Bucket> = BTreeMap::new();
    for record in records {
        buckets.entry(week_start(record.completed_at)).or_default().add(record);
    }
    buckets
        .into_iter()
        .map(|(week_start, b)| WeeklyProgress {
            week_start,
            total_minutes: b.minutes,
            total_calories: b.calories,
            sessions_completed: b.count,
        })
        .collect()
}

/// Totals per calendar year, ascending.
pub fn yearly_progress<'a, I>(records: I) -> Vec<YearlyProgress>
where
    I: IntoIterator<Item = &'a SessionRecord>,
{
    let mut buckets: BTreeMap<i32, Bucket> = BTreeMap::new();
    for record in records {
        buckets.entry(record.completed_at.year()).or_default().add(record);
    }
    buckets
        .into_iter()
        .map(|(year, b)| YearlyProgress {
            year,
            total_minutes: b.minutes,
            total_calories: b.calories,
            sessions_completed: b.count,
        })
        .collect()
}

pub fn total_minutes<'a, I>(records: I) -> u64
where
    I: IntoIterator<Item = &'a SessionRecord>,
{
    records.into_iter().map(|r| u64::from(r.duration_minutes)).sum()
}

pub fn total_calories<'a, I>(records: I) -> u64
where
    I: IntoIterator<Item = &'a SessionRecord>,
{
    records.into_iter().map(|r| u64::from(r.calories)).sum()
}

/// Number of sessions completed per week, keyed by week start.
pub fn weekly_frequency<'a, I>(records: I) -> BTreeMap<NaiveDateTime, usize>
where
    I: IntoIterator<Item = &'a SessionRecord>,
{
    let mut frequency = BTreeMap::new();
    for record in records {
        *frequency.entry(week_start(record.completed_at)).or_insert(0) += 1;
    }
    frequency
}

/// Midnight on the Monday of the week containing `timestamp`.
pub fn week_start(timestamp: NaiveDateTime) -> NaiveDateTime {
    let days_since_monday = i64::from(timestamp.weekday().num_days_from_monday());
    (timestamp.date() - Duration::days(days_since_monday))
        .and_hms_opt(0, 0, 0)
        .unwrap_or(timestamp)
}
