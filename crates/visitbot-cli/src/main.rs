mod cli;
mod completions;
mod config;
mod error;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{BookArgs, Cli, Commands, StatusArgs};
use colored::Colorize;
use config::Settings;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use visitbot_browser::{BrowserSession, WebDriverSession};
use visitbot_core::{
    Clock, Credentials, EnelPortal, LockState, Orchestrator, ReservationRequest, RunOutcome,
    RunReport, SearchCriteria, SlotWindow, SmtpNotifier, SystemClock, TokioSleeper, check_lock,
};

const RULER_WIDTH: usize = 40;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Logs go to stderr so stdout stays clean for completions and status.
    let default_filter = if cli.verbose {
        "info,visitbot=debug,visitbot_core=debug,visitbot_browser=debug"
    } else {
        "info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into()),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_level(true)
        .init();

    match run(cli).await {
        Ok(code) => code,
        Err(err) => error::handle_error(err),
    }
}

async fn run(cli: Cli) -> Result<ExitCode> {
    match cli.command {
        Commands::Completions { shell } => {
            completions::generate_completions(shell);
            Ok(ExitCode::SUCCESS)
        }
        Commands::Status(args) => status(&args),
        Commands::Book(args) => {
            let settings = Settings::load(cli.config.as_deref())?;
            book(args, settings).await
        }
    }
}

fn status(args: &StatusArgs) -> Result<ExitCode> {
    let state = check_lock(&args.lock_file)
        .with_context(|| format!("Failed to read lock file {}", args.lock_file.display()))?;
    match state {
        LockState::Free => println!("No booking recorded ({})", args.lock_file.display()),
        LockState::Held { contents } => {
            println!("{} {}", "Booking recorded in".green().bold(), args.lock_file.display());
            println!("{}", "-".repeat(RULER_WIDTH));
            println!("{}", contents);
            println!("{}", "-".repeat(RULER_WIDTH));
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn apply_overrides(settings: &mut Settings, args: &BookArgs) {
    if let Some(url) = &args.webdriver_url {
        settings.webdriver.url = url.clone();
    }
    if let Some(url) = &args.base_url {
        settings.portal.base_url = url.clone();
    }
    if let Some(host) = &args.smtp_host {
        settings.smtp.host = host.clone();
    }
    if let Some(port) = args.smtp_port {
        settings.smtp.port = port;
    }
}

fn build_request(args: BookArgs, settings: &Settings) -> ReservationRequest {
    let window = SlotWindow {
        min_lead: chrono::Duration::hours(i64::from(args.min_lead_hours)),
        not_after: args.not_after,
        earliest_time: args.earliest_time,
        latest_time: args.latest_time,
    };

    let mut request = ReservationRequest::new(
        Credentials::new(args.login.clone(), args.password.clone()),
        SearchCriteria {
            city: args.city.clone(),
            service_type: args.service_type.clone(),
            service: args.service.clone(),
        },
        args.email_to.clone(),
    );
    request.predicate = Arc::new(window);
    request.email_from = args.email_from.clone();
    request.dry_run = args.is_dry_run();
    request.headless = args.is_headless();
    request.portal_name = settings.portal.name.clone();
    request.lock_path = args.lock_file;
    request
}

async fn book(args: BookArgs, mut settings: Settings) -> Result<ExitCode> {
    apply_overrides(&mut settings, &args);
    let request = build_request(args, &settings);
    info!(
        city = %request.search.city,
        service = %request.search.service,
        dry_run = request.dry_run,
        headless = request.headless,
        "Starting reservation run"
    );

    let session = Arc::new(
        WebDriverSession::new(settings.webdriver_config(request.headless))
            .context("Invalid WebDriver or portal URL")?,
    );
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let portal = EnelPortal::new(session.clone(), clock.clone()).with_settle(settings.settle());
    let notifier = SmtpNotifier::new(&settings.smtp.host, settings.smtp.port);

    let orchestrator = Orchestrator::new(request, portal, notifier, TokioSleeper, clock)
        .with_retry_delay(settings.retry_delay());
    let result = orchestrator.run().await;

    if let Err(err) = session.close().await {
        warn!(error = %err, "Failed to close browser session");
    }

    let report = result.context("Reservation run failed")?;
    Ok(report_outcome(report))
}

fn report_outcome(report: RunReport) -> ExitCode {
    match report.outcome {
        RunOutcome::Booked { slot, dry_run } => {
            let label = if dry_run { "Dry run booked" } else { "Booked" };
            println!("{} {} (attempt {})", label.green().bold(), slot.at, report.attempts);
            println!("{}", slot.summary);
            ExitCode::SUCCESS
        }
        RunOutcome::NoSlot => {
            eprintln!("No visit found, sorry");
            ExitCode::from(1)
        }
        RunOutcome::Locked { path, contents } => {
            eprintln!("Visit lock file {:?} already exists!", path.display().to_string());
            eprintln!("{}", "-".repeat(RULER_WIDTH));
            eprintln!("{}", contents);
            eprintln!("{}", "-".repeat(RULER_WIDTH));
            ExitCode::from(1)
        }
    }
}
