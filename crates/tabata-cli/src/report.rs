use std::path::Path;

use tabata_common::history::HISTORY_TIME_FORMAT;
use tabata_common::{Session, SessionRecord, WeeklyProgress, YearlyProgress};
use tabata_db::{MigrationReport, MigrationStatus};

/// `90` -> `1m 30s`, `45` -> `45s`.
pub fn format_duration(seconds: i64) -> String {
    let (minutes, seconds) = (seconds / 60, seconds % 60);
    match (minutes, seconds) {
        (0, s) => format!("{s}s"),
        (m, 0) => format!("{m}m"),
        (m, s) => format!("{m}m {s}s"),
    }
}

fn versions(list: &[u32]) -> String {
    list.iter()
        .map(u32::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

pub fn print_migration_report(db_path: &Path, report: &MigrationReport) {
    if report.is_up_to_date() {
        println!("{} is up to date", db_path.display());
    } else {
        println!("Applied to {}: {}", db_path.display(), versions(&report.applied));
    }
    if !report.skipped.is_empty() {
        println!("Already applied: {}", versions(&report.skipped));
    }
}

pub fn print_status(statuses: &[MigrationStatus]) {
    let width = statuses
        .iter()
        .map(|s| s.migration.label().len())
        .max()
        .unwrap_or(0);
    for status in statuses {
        let state = status.applied_at.as_deref().unwrap_or("pending");
        println!("  {:<width$}  {state}", status.migration.label());
    }
}

pub fn print_session_row(session: &Session, duration_seconds: i64) {
    println!(
        "  {:>4}  {:<24}  {}",
        session.id.unwrap_or_default(),
        session.name,
        format_duration(duration_seconds)
    );
}

pub fn print_session_details(session: &Session) {
    println!("{} (#{})", session.name, session.id.unwrap_or_default());
    println!("  Warmup      {}", format_duration(session.warmup_seconds));
    println!("  Recovery    {}", format_duration(session.recovery_seconds));
    for block in session.ordered_blocks() {
        println!("  Block {}: {}", block.position, block.name);
        for interval in block.ordered_intervals() {
            let exercise = interval
                .exercise
                .as_ref()
                .map(|e| e.name.as_str())
                .unwrap_or("rest");
            println!(
                "    {:>2}. {:<8} {exercise}",
                interval.position,
                format_duration(interval.duration_seconds)
            );
        }
    }
    println!(
        "  Total       {}",
        format_duration(session.total_duration_seconds())
    );
    println!("  Calories    ~{:.0}", session.estimated_calories());
}

pub fn print_history(records: &[SessionRecord]) {
    if records.is_empty() {
        println!("No workouts recorded.");
        return;
    }
    for record in records {
        println!(
            "  {}  {:>3} min  {:>4} kcal  {}",
            record.completed_at.format(HISTORY_TIME_FORMAT),
            record.duration_minutes,
            record.calories,
            record.source_session
        );
    }
}

pub fn print_weekly(weeks: &[WeeklyProgress]) {
    for week in weeks {
        println!(
            "  week of {}  {:>3} sessions  {:>5} min  {:>6} kcal",
            week.week_start.date(),
            week.sessions_completed,
            week.total_minutes,
            week.total_calories
        );
    }
}

pub fn print_yearly(years: &[YearlyProgress]) {
    for year in years {
        println!(
            "  {}  {:>4} sessions  {:>6} min  {:>7} kcal",
            year.year, year.sessions_completed, year.total_minutes, year.total_calories
        );
    }
}

pub fn print_totals(sessions: usize, minutes: u64, calories: u64) {
    println!("  Sessions    {sessions}");
    println!("  Minutes     {minutes}");
    println!("  Calories    {calories}");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn durations_drop_zero_parts() {
        assert_eq!(format_duration(0), "0s");
        assert_eq!(format_duration(45), "45s");
        assert_eq!(format_duration(120), "2m");
        assert_eq!(format_duration(270), "4m 30s");
    }

    #[test]
    fn versions_are_comma_separated() {
        assert_eq!(versions(&[1, 2, 10]), "1, 2, 10");
        assert_eq!(versions(&[]), "");
    }
}
