//! Appointment booking core for visitbot.
//!
//! The [`Orchestrator`] drives a [`Portal`] through login, search, slot
//! selection and confirmation. It reports milestones through a [`Notifier`]
//! and guards against double booking with a lock file.

pub mod error;
pub mod finder;
pub mod lock;
pub mod notifier;
pub mod orchestrator;
pub mod portal;
pub mod request;
pub mod slot;

pub use error::{ReservationError, Result};
pub use finder::{AppointmentFinder, FoundSlot};
pub use lock::{DEFAULT_LOCK_FILE, LockState, check_lock, write_lock};
pub use notifier::{Notification, Notifier, NotifyError, SmtpNotifier};
pub use orchestrator::{
    DEFAULT_RETRY_DELAY, Orchestrator, RunOutcome, RunReport, Sleeper, Stage, TokioSleeper,
};
pub use portal::{EnelPortal, Portal, RawRow, RowReading};
pub use request::{Credentials, ReservationRequest, SearchCriteria};
pub use slot::{CandidateSlot, Clock, FixedClock, SlotPredicate, SlotWindow, SystemClock};
