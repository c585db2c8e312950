//! Reservation orchestrator.
//!
//! One run walks `LoggingIn → SubmittingSearch → Searching → Confirming →
//! Recording → Done`. A missing element at any stage restarts the run from
//! `LoggingIn` after a fixed pause, with no attempt ceiling. An exhausted
//! search or an existing lock file ends the run without retrying.

use async_trait::async_trait;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

use crate::error::{ReservationError, Result};
use crate::finder::AppointmentFinder;
use crate::lock::{self, LockState};
use crate::notifier::{Notification, Notifier};
use crate::portal::Portal;
use crate::request::ReservationRequest;
use crate::slot::{CandidateSlot, Clock};

pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(60);

#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Step an attempt is in. Only the in-flight steps are listed; the
/// terminal states are reported elsewhere:
/// - found: the finder returned a slot, after which the attempt moves to
///   `Confirming`
/// - not found: `RunOutcome::NoSlot`
/// - faulted: a transient `ReservationError`, logged with the stage it hit
///   before the run restarts at `LoggingIn`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    LoggingIn,
    SubmittingSearch,
    Searching,
    Confirming,
    Recording,
    Done,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::LoggingIn => "logging_in",
            Stage::SubmittingSearch => "submitting_search",
            Stage::Searching => "searching",
            Stage::Confirming => "confirming",
            Stage::Recording => "recording",
            Stage::Done => "done",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    Booked { slot: CandidateSlot, dry_run: bool },
    /// Every results page was inspected without an acceptable slot.
    NoSlot,
    /// A lock file from an earlier booking exists; nothing was attempted.
    Locked { path: PathBuf, contents: String },
}

impl RunOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, RunOutcome::Booked { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    /// Attempts started, including the one that finished. Zero when locked.
    pub attempts: u32,
    pub outcome: RunOutcome,
}

pub struct Orchestrator<P, N, S = TokioSleeper> {
    portal: P,
    notifier: N,
    sleeper: S,
    request: ReservationRequest,
    finder: AppointmentFinder,
    retry_delay: Duration,
}

impl<P, N, S> Orchestrator<P, N, S>
where
    P: Portal,
    N: Notifier,
    S: Sleeper,
{
    pub fn new(
        request: ReservationRequest,
        portal: P,
        notifier: N,
        sleeper: S,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let finder = AppointmentFinder::new(request.predicate.clone(), clock);
        Self {
            portal,
            notifier,
            sleeper,
            request,
            finder,
            retry_delay: DEFAULT_RETRY_DELAY,
        }
    }

    pub fn with_retry_delay(mut self, retry_delay: Duration) -> Self {
        self.retry_delay = retry_delay;
        self
    }

    pub fn portal(&self) -> &P {
        &self.portal
    }

    pub fn notifier(&self) -> &N {
        &self.notifier
    }

    pub fn sleeper(&self) -> &S {
        &self.sleeper
    }

    pub async fn run(&self) -> Result<RunReport> {
        if let LockState::Held { contents } = lock::check_lock(&self.request.lock_path)? {
            error!(path = %self.request.lock_path.display(), "Visit lock file already exists");
            return Ok(RunReport {
                attempts: 0,
                outcome: RunOutcome::Locked {
                    path: self.request.lock_path.clone(),
                    contents,
                },
            });
        }

        let mut attempts = 0u32;
        loop {
            attempts += 1;
            let mut stage = Stage::LoggingIn;
            match self.attempt(&mut stage).await {
                Ok(outcome) => return Ok(RunReport { attempts, outcome }),
                Err(err) if err.is_transient() => {
                    warn!(
                        attempt = attempts,
                        stage = %stage,
                        error = %err,
                        delay_secs = self.retry_delay.as_secs(),
                        "Page element missing, restarting from login"
                    );
                    self.sleeper.sleep(self.retry_delay).await;
                }
                Err(err) => {
                    error!(attempt = attempts, stage = %stage, error = %err, "Run failed");
                    return Err(err);
                }
            }
        }
    }

    async fn attempt(&self, stage: &mut Stage) -> Result<RunOutcome> {
        *stage = Stage::LoggingIn;
        self.portal.log_in(&self.request.credentials).await?;

        *stage = Stage::SubmittingSearch;
        self.portal.submit_search(&self.request.search).await?;

        *stage = Stage::Searching;
        let Some(found) = self.finder.find(&self.portal).await? else {
            return Ok(RunOutcome::NoSlot);
        };
        let slot = found.slot;

        *stage = Stage::Confirming;
        self.notify(self.request.found_subject(), &slot).await?;
        self.portal.reserve(&found.row).await?;
        self.portal.accept_terms().await?;
        if self.request.dry_run {
            info!("Dry run, skipping final confirmation");
        } else {
            self.portal.confirm().await?;
        }
        info!(at = %slot.at, "Reservation complete");

        *stage = Stage::Recording;
        lock::write_lock(
            &self.request.lock_path,
            &self.request.lock_header(),
            &slot.summary,
        )
        .map_err(ReservationError::Lock)?;

        self.notify(self.request.booked_subject(), &slot).await?;
        *stage = Stage::Done;

        Ok(RunOutcome::Booked {
            slot,
            dry_run: self.request.dry_run,
        })
    }

    async fn notify(&self, subject: String, slot: &CandidateSlot) -> Result<()> {
        let notification = Notification {
            from: self.request.email_from.clone(),
            to: self.request.email_to.clone(),
            subject,
            body: slot.summary.clone(),
        };
        self.notifier.send(&notification).await?;
        info!(subject = %notification.subject, "Email sent");
        Ok(())
    }
}
