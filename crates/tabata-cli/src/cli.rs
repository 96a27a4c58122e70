use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Tabata - interval workouts, history, and progress tracking
#[derive(Parser, Debug)]
#[command(name = "tabata")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Directory holding config.yml and the default data directory
    #[arg(long, global = true, env = "TABATA_CONFIG_DIR")]
    pub config_dir: Option<PathBuf>,

    /// Log level filter (overrides config; RUST_LOG overrides both)
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Apply pending schema migrations
    Migrate(DatabaseArgs),

    /// Show which migrations have been applied
    Status(DatabaseArgs),

    /// Inspect stored workout sessions
    #[command(subcommand)]
    Sessions(SessionsCommand),

    /// Record and list completed workouts
    #[command(subcommand)]
    History(HistoryCommand),

    /// Aggregate the workout history
    #[command(subcommand)]
    Progress(ProgressCommand),
}

/// Database location overrides
#[derive(Args, Debug, Clone, Default)]
pub struct DatabaseArgs {
    /// SQLite database file
    #[arg(long, env = "TABATA_DB")]
    pub db: Option<PathBuf>,

    /// Directory of `<version>_<name>.sql` migration files. Defaults to
    /// `database.migrations_dir`, then `<config dir>/migrations`, then the
    /// catalog path recorded when the binary was built
    #[arg(long)]
    pub migrations: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum SessionsCommand {
    /// List every session
    List(DatabaseArgs),

    /// Show one session with its blocks
    Show {
        id: i64,

        #[command(flatten)]
        database: DatabaseArgs,
    },
}

#[derive(Subcommand, Debug)]
pub enum HistoryCommand {
    /// Record a completed workout
    Add {
        #[arg(long)]
        minutes: u32,

        #[arg(long)]
        calories: u32,

        /// Name of the session that was performed
        #[arg(long)]
        session: String,

        /// Completion time as YYYY-MM-DDTHH:MM:SS (default: now)
        #[arg(long)]
        at: Option<String>,
    },

    /// List recorded workouts, newest first
    List {
        /// Earliest completion time, inclusive
        #[arg(long)]
        since: Option<String>,

        /// Latest completion time, inclusive
        #[arg(long)]
        until: Option<String>,

        /// Print the records as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressCommand {
    /// Minutes, calories, and sessions per ISO week
    Weekly,
    /// Minutes, calories, and sessions per calendar year
    Yearly,
    /// Totals across the whole history
    Totals,
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn verify_cli_args() {
        Cli::command().debug_assert();
    }

    #[test]
    fn migrate_accepts_overrides() {
        let cli = Cli::try_parse_from([
            "tabata",
            "migrate",
            "--db",
            "/tmp/t.db",
            "--migrations",
            "/tmp/migrations",
        ])
        .unwrap();

        let Commands::Migrate(args) = cli.command else {
            panic!("expected migrate");
        };
        assert_eq!(args.db, Some(PathBuf::from("/tmp/t.db")));
        assert_eq!(args.migrations, Some(PathBuf::from("/tmp/migrations")));
    }

    #[test]
    fn global_flags_follow_the_subcommand() {
        let cli = Cli::try_parse_from([
            "tabata",
            "progress",
            "weekly",
            "--config-dir",
            "/tmp/cfg",
            "--log-level",
            "debug",
        ])
        .unwrap();

        assert_eq!(cli.config_dir, Some(PathBuf::from("/tmp/cfg")));
        assert_eq!(cli.log_level.as_deref(), Some("debug"));
        assert!(matches!(cli.command, Commands::Progress(ProgressCommand::Weekly)));
    }

    #[test]
    fn history_add_requires_minutes_and_calories() {
        assert!(Cli::try_parse_from(["tabata", "history", "add", "--session", "legs"]).is_err());

        let cli = Cli::try_parse_from([
            "tabata",
            "history",
            "add",
            "--minutes",
            "20",
            "--calories",
            "180",
            "--session",
            "legs",
            "--at",
            "2024-03-01T07:30:00",
        ])
        .unwrap();
        let Commands::History(HistoryCommand::Add { minutes, at, .. }) = cli.command else {
            panic!("expected history add");
        };
        assert_eq!(minutes, 20);
        assert_eq!(at.as_deref(), Some("2024-03-01T07:30:00"));
    }

    #[test]
    fn sessions_show_takes_an_id() {
        let cli = Cli::try_parse_from(["tabata", "sessions", "show", "7"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Sessions(SessionsCommand::Show { id: 7, .. })
        ));
        assert!(Cli::try_parse_from(["tabata", "sessions", "show", "seven"]).is_err());
    }
}
