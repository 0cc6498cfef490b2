//! Command-line interface definition.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use schoolfeed_core::{DateRange, DateRangeError};
use schoolfeed_server::PersonQuery;

/// schoolfeed - School events from WebUntis, day by day
#[derive(Debug, Parser)]
#[command(name = "schoolfeed")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(long, short, env = "SCHOOLFEED_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Enable debug output
    #[arg(long, short = 'v', global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Print the events of a date range
    Events(EventsArgs),

    /// Configuration commands
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Arguments of `schoolfeed events`.
#[derive(Debug, Clone, Default, Args)]
pub struct EventsArgs {
    /// First day (YYYY-MM-DD), defaults to today
    #[arg(long)]
    pub start: Option<String>,

    /// Last day (YYYY-MM-DD); cannot be combined with --days
    #[arg(long)]
    pub end: Option<String>,

    /// Number of days including the first, defaults to 7
    #[arg(long)]
    pub days: Option<String>,

    /// Only show the timetable of this teacher (display name)
    #[arg(long)]
    pub teacher: Option<String>,

    /// Only show the timetable of this student (display name); ignored
    /// when --teacher is given
    #[arg(long)]
    pub student: Option<String>,

    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}

impl EventsArgs {
    /// Parses the requested date range relative to `today`.
    pub fn range(&self, today: NaiveDate) -> Result<DateRange, DateRangeError> {
        DateRange::parse(
            self.start.as_deref(),
            self.end.as_deref(),
            self.days.as_deref(),
            today,
        )
    }

    /// Returns the person filter, if any.
    pub fn person(&self) -> Option<PersonQuery> {
        PersonQuery::from_params(self.teacher.as_deref(), self.student.as_deref())
    }
}

/// Configuration actions.
#[derive(Debug, Subcommand)]
pub enum ConfigAction {
    /// Dump current configuration, secrets redacted
    Dump,

    /// Show configuration file path
    Path,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, d).unwrap()
    }

    fn events(args: &[&str]) -> EventsArgs {
        let cli = Cli::try_parse_from(std::iter::once("schoolfeed").chain(args.iter().copied()))
            .unwrap();
        match cli.command {
            Command::Events(args) => args,
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn default_range_is_one_week_from_today() {
        let range = events(&["events"]).range(day(3)).unwrap();
        assert_eq!(range, DateRange::new(day(3), day(9)).unwrap());
    }

    #[test]
    fn explicit_range() {
        let args = events(&["events", "--start", "2025-03-04", "--end", "2025-03-06"]);
        assert_eq!(args.range(day(1)).unwrap(), DateRange::new(day(4), day(6)).unwrap());

        let args = events(&["events", "--start", "2025-03-04", "--days", "2"]);
        assert_eq!(args.range(day(1)).unwrap(), DateRange::new(day(4), day(5)).unwrap());
    }

    #[test]
    fn end_and_days_conflict() {
        let args = events(&["events", "--end", "2025-03-06", "--days", "2"]);
        assert_eq!(args.range(day(1)), Err(DateRangeError::Conflicting));
    }

    #[test]
    fn person_filter() {
        assert_eq!(events(&["events"]).person(), None);
        assert_eq!(
            events(&["events", "--student", "Anna", "--teacher", "Müller"]).person(),
            Some(PersonQuery::teacher("Müller"))
        );
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["schoolfeed", "events", "--json", "-v", "-c", "x.toml"])
            .unwrap();
        assert!(cli.debug);
        assert_eq!(cli.config, Some(PathBuf::from("x.toml")));
        assert!(matches!(cli.command, Command::Events(EventsArgs { json: true, .. })));
    }

    #[test]
    fn config_subcommand() {
        let cli = Cli::try_parse_from(["schoolfeed", "config", "path"]).unwrap();
        assert!(matches!(cli.command, Command::Config { action: ConfigAction::Path }));
    }
}
