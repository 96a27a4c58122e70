use std::path::PathBuf;

use anyhow::{Context as _, Result, bail};
use chrono::{Local, NaiveDateTime};
use tabata_common::history::{HISTORY_TIME_FORMAT, parse_history_time};
use tabata_common::{SessionRecord, progress};
use tabata_config::AppConfig;
use tabata_db::{DEFAULT_MIGRATIONS_DIR, Database, HistoryStore, SessionRepository};
use tracing::info;

use crate::cli::{DatabaseArgs, HistoryCommand, ProgressCommand, SessionsCommand};
use crate::report;

/// Resolved configuration shared by every command.
pub struct Context {
    pub config_dir: PathBuf,
    pub config: AppConfig,
}

impl Context {
    /// `--db`, then `database.path`, then `<data_dir>/tabata.db`.
    fn database_path(&self, args: &DatabaseArgs) -> PathBuf {
        args.db
            .clone()
            .unwrap_or_else(|| self.config.database_path(&self.config_dir))
    }

    /// `--migrations`, then `database.migrations_dir`, then `<config dir>/migrations`
    /// when present, then the catalog bundled at build time.
    fn migrations_dir(&self, args: &DatabaseArgs) -> PathBuf {
        args.migrations
            .clone()
            .or_else(|| self.config.database.migrations_dir.clone())
            .unwrap_or_else(|| {
                let local = self.config_dir.join("migrations");
                if local.is_dir() {
                    local
                } else {
                    PathBuf::from(DEFAULT_MIGRATIONS_DIR)
                }
            })
    }

    fn open_database(&self, args: &DatabaseArgs) -> Result<Database> {
        let db_path = self.database_path(args);
        Database::open(&db_path, &self.migrations_dir(args))
            .with_context(|| format!("failed to open database at {}", db_path.display()))
    }

    fn history(&self) -> HistoryStore {
        HistoryStore::new(self.config.history_path(&self.config_dir))
    }
}

pub fn migrate(ctx: &Context, args: &DatabaseArgs) -> Result<()> {
    let db_path = ctx.database_path(args);
    let migrations_dir = ctx.migrations_dir(args);
    let report = tabata_db::migrate(&db_path, &migrations_dir)
        .with_context(|| format!("failed to migrate {}", db_path.display()))?;
    report::print_migration_report(&db_path, &report);
    Ok(())
}

pub fn status(ctx: &Context, args: &DatabaseArgs) -> Result<()> {
    let db_path = ctx.database_path(args);
    let statuses = tabata_db::migration_status(&db_path, &ctx.migrations_dir(args))
        .with_context(|| format!("failed to read schema status of {}", db_path.display()))?;
    report::print_status(&statuses);
    Ok(())
}

pub fn sessions(ctx: &Context, command: &SessionsCommand) -> Result<()> {
    match command {
        SessionsCommand::List(args) => {
            let db = ctx.open_database(args)?;
            let repo = db.sessions();
            let sessions = repo.list()?;
            if sessions.is_empty() {
                println!("No sessions defined.");
            }
            for session in &sessions {
                let duration = match session.id {
                    Some(id) => repo.total_duration_seconds(id)?,
                    None => session.total_duration_seconds(),
                };
                report::print_session_row(session, duration);
            }
        }
        SessionsCommand::Show { id, database } => {
            let db = ctx.open_database(database)?;
            let Some(session) = db.sessions().get_with_details(*id)? else {
                bail!("session {id} not found");
            };
            report::print_session_details(&session);
        }
    }
    Ok(())
}

fn parse_timestamp(value: &str) -> Result<NaiveDateTime> {
    parse_history_time(value)
        .with_context(|| format!("invalid timestamp {value:?}, expected {HISTORY_TIME_FORMAT}"))
}

fn parse_optional(value: Option<&str>) -> Result<Option<NaiveDateTime>> {
    value.map(parse_timestamp).transpose()
}

pub fn history(ctx: &Context, command: &HistoryCommand) -> Result<()> {
    let store = ctx.history();
    match command {
        HistoryCommand::Add {
            minutes,
            calories,
            session,
            at,
        } => {
            let completed_at = match at {
                Some(at) => parse_timestamp(at)?,
                None => Local::now().naive_local(),
            };
            store.add_session(SessionRecord::new(*minutes, *calories, completed_at, session))?;
            info!("history saved to {}", store.path().display());
            println!(
                "Recorded {session}: {minutes} min, {calories} kcal at {}",
                completed_at.format(HISTORY_TIME_FORMAT)
            );
        }
        HistoryCommand::List { since, until, json } => {
            let records = store.list_sessions(
                parse_optional(since.as_deref())?,
                parse_optional(until.as_deref())?,
            )?;
            if *json {
                println!("{}", serde_json::to_string_pretty(&records)?);
            } else {
                report::print_history(&records);
            }
        }
    }
    Ok(())
}

pub fn progress(ctx: &Context, command: ProgressCommand) -> Result<()> {
    let records = ctx.history().list_sessions(None, None)?;
    match command {
        ProgressCommand::Weekly => report::print_weekly(&progress::weekly_progress(&records)),
        ProgressCommand::Yearly => report::print_yearly(&progress::yearly_progress(&records)),
        ProgressCommand::Totals => report::print_totals(
            records.len(),
            progress::total_minutes(&records),
            progress::total_calories(&records),
        ),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context(dir: &std::path::Path) -> Context {
        Context {
            config_dir: dir.to_path_buf(),
            config: AppConfig::default(),
        }
    }

    #[test]
    fn database_path_prefers_flag_then_config() {
        let dir = tempfile::tempdir().unwrap();
        let mut ctx = context(dir.path());

        let args = DatabaseArgs::default();
        assert_eq!(
            ctx.database_path(&args),
            dir.path().join("data").join("tabata.db")
        );

        ctx.config.database.path = Some(PathBuf::from("/srv/tabata.db"));
        assert_eq!(ctx.database_path(&args), PathBuf::from("/srv/tabata.db"));

        let args = DatabaseArgs {
            db: Some(PathBuf::from("/tmp/override.db")),
            migrations: None,
        };
        assert_eq!(ctx.database_path(&args), PathBuf::from("/tmp/override.db"));
    }

    #[test]
    fn migrations_default_to_bundled_catalog() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(dir.path());
        assert_eq!(
            ctx.migrations_dir(&DatabaseArgs::default()),
            PathBuf::from(DEFAULT_MIGRATIONS_DIR)
        );
    }

    #[test]
    fn migrations_in_config_dir_take_precedence_over_bundled() {
        let dir = tempfile::tempdir().unwrap();
        let local = dir.path().join("migrations");
        std::fs::create_dir(&local).unwrap();

        let ctx = context(dir.path());
        assert_eq!(ctx.migrations_dir(&DatabaseArgs::default()), local);

        let args = DatabaseArgs {
            db: None,
            migrations: Some(PathBuf::from("/opt/migrations")),
        };
        assert_eq!(ctx.migrations_dir(&args), PathBuf::from("/opt/migrations"));
    }

    #[test]
    fn migrate_then_add_and_list_history() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(dir.path());

        migrate(&ctx, &DatabaseArgs::default()).unwrap();
        assert!(dir.path().join("data").join("tabata.db").exists());

        history(
            &ctx,
            &HistoryCommand::Add {
                minutes: 20,
                calories: 180,
                session: "legs".to_string(),
                at: Some("2024-03-01T07:30:00".to_string()),
            },
        )
        .unwrap();

        let records = ctx.history().list_sessions(None, None).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].source_session, "legs");
    }

    #[test]
    fn bad_timestamp_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(dir.path());
        let err = history(
            &ctx,
            &HistoryCommand::Add {
                minutes: 20,
                calories: 180,
                session: "legs".to_string(),
                at: Some("yesterday".to_string()),
            },
        )
        .unwrap_err();
        assert!(err.to_string().contains("invalid timestamp"));
    }

    #[test]
    fn showing_a_missing_session_fails() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(dir.path());
        let err = sessions(
            &ctx,
            &SessionsCommand::Show {
                id: 42,
                database: DatabaseArgs::default(),
            },
        )
        .unwrap_err();
        assert!(err.to_string().contains("session 42 not found"));
    }
}
