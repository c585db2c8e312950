use chrono::{NaiveDate, NaiveTime};
use clap::builder::BoolishValueParser;
use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

const MAX_LEAD_HOURS: i64 = 366 * 24;

#[derive(Parser)]
#[command(name = "visitbot")]
#[command(version, about = "visitbot - books clinic appointments on a patient portal")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Settings file (defaults to ~/.config/visitbot/config.toml when present)
    #[arg(long, global = true, env = "VISITBOT_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Search for a free slot and book it
    Book(BookArgs),

    /// Show whether a booking has been recorded
    Status(StatusArgs),

    /// Generate shell completions
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Args, Debug)]
pub struct BookArgs {
    /// Portal login
    #[arg(long, env = "LOGIN")]
    pub login: String,

    /// Portal password
    #[arg(long, env = "PASSWORD", hide_env_values = true)]
    pub password: String,

    /// City to search in, e.g. "Kraków"
    #[arg(long, env = "CITY")]
    pub city: String,

    /// Service category, e.g. "USG"
    #[arg(long, env = "SERVICE_TYPE")]
    pub service_type: String,

    /// Service name, e.g. "USG 2 stawów kolanowych"
    #[arg(long, env = "SERVICE")]
    pub service: String,

    /// Sender address for notifications
    #[arg(long, env = "EMAIL_FROM", default_value = "visitbot@localhost")]
    pub email_from: String,

    /// Notification recipients (comma separated)
    #[arg(long, env = "EMAIL_TO", value_delimiter = ',', required = true)]
    pub email_to: Vec<String>,

    /// Lock file marking a completed booking
    #[arg(long, env = "VISIT_LOCK", default_value = visitbot_core::DEFAULT_LOCK_FILE)]
    pub lock_file: PathBuf,

    /// Do everything except the final confirmation click
    #[arg(long, env = "DRY_RUN", value_parser = BoolishValueParser::new())]
    pub dry_run: bool,

    /// Test mode: dry run with a visible browser window
    #[arg(long, env = "TEST", value_parser = BoolishValueParser::new())]
    pub test: bool,

    /// Show the browser window
    #[arg(long)]
    pub headed: bool,

    /// Minimum hours between now and an acceptable slot (at most a year)
    #[arg(
        long,
        default_value_t = 3,
        value_parser = clap::value_parser!(u32).range(..=MAX_LEAD_HOURS)
    )]
    pub min_lead_hours: u32,

    /// Last acceptable day (YYYY-MM-DD)
    #[arg(long)]
    pub not_after: Option<NaiveDate>,

    /// Earliest acceptable time of day (HH:MM)
    #[arg(long, value_parser = parse_time_of_day)]
    pub earliest_time: Option<NaiveTime>,

    /// Latest acceptable time of day (HH:MM)
    #[arg(long, value_parser = parse_time_of_day)]
    pub latest_time: Option<NaiveTime>,

    /// WebDriver endpoint (overrides settings)
    #[arg(long, env = "WEBDRIVER_URL")]
    pub webdriver_url: Option<String>,

    /// Portal root URL (overrides settings)
    #[arg(long)]
    pub base_url: Option<String>,

    /// SMTP relay host (overrides settings)
    #[arg(long, env = "SMTP_HOST")]
    pub smtp_host: Option<String>,

    /// SMTP relay port (overrides settings)
    #[arg(long, env = "SMTP_PORT")]
    pub smtp_port: Option<u16>,
}

impl BookArgs {
    pub fn is_dry_run(&self) -> bool {
        self.dry_run || self.test
    }

    pub fn is_headless(&self) -> bool {
        !(self.headed || self.test)
    }
}

#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Lock file marking a completed booking
    #[arg(long, env = "VISIT_LOCK", default_value = visitbot_core::DEFAULT_LOCK_FILE)]
    pub lock_file: PathBuf,
}

fn parse_time_of_day(value: &str) -> Result<NaiveTime, String> {
    NaiveTime::parse_from_str(value, "%H:%M").map_err(|err| format!("expected HH:MM: {}", err))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    const REQUIRED: [&str; 13] = [
        "visitbot",
        "book",
        "--login",
        "alice",
        "--password",
        "s3cret",
        "--city",
        "Kraków",
        "--service-type",
        "USG",
        "--service",
        "USG 2 stawów kolanowych",
        "--email-to=a@example.com,b@example.com",
    ];

    fn parse_book(extra: &[&str]) -> BookArgs {
        let args = REQUIRED.iter().chain(extra.iter()).copied();
        match Cli::try_parse_from(args).unwrap().command {
            Commands::Book(args) => args,
            _ => panic!("expected book command"),
        }
    }

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn book_defaults() {
        let args = parse_book(&[]);
        assert_eq!(args.email_to, vec!["a@example.com", "b@example.com"]);
        assert_eq!(args.lock_file, PathBuf::from("visit.txt"));
        assert_eq!(args.min_lead_hours, 3);
        assert!(!args.is_dry_run());
        assert!(args.is_headless());
    }

    #[test]
    fn test_mode_implies_dry_run_and_headed() {
        let args = parse_book(&["--test"]);
        assert!(args.is_dry_run());
        assert!(!args.is_headless());
    }

    #[test]
    fn time_window_flags_parse() {
        let args = parse_book(&[
            "--earliest-time",
            "08:00",
            "--latest-time",
            "15:30",
            "--not-after",
            "2024-12-31",
        ]);
        assert_eq!(args.earliest_time, NaiveTime::from_hms_opt(8, 0, 0));
        assert_eq!(args.latest_time, NaiveTime::from_hms_opt(15, 30, 0));
        assert_eq!(args.not_after, NaiveDate::from_ymd_opt(2024, 12, 31));

        let bad_time = REQUIRED.iter().copied().chain(["--earliest-time", "8am"]);
        assert!(Cli::try_parse_from(bad_time).is_err());
    }

    #[test]
    fn lead_time_is_bounded() {
        assert_eq!(parse_book(&["--min-lead-hours", "8784"]).min_lead_hours, 8784);
        for value in ["8785", "9000000000000", "-1"] {
            let args = REQUIRED
                .iter()
                .copied()
                .chain(["--min-lead-hours", value]);
            assert!(Cli::try_parse_from(args).is_err(), "{} must be rejected", value);
        }
    }
}
