//! Candidate slots, date composition and acceptance predicates.

use chrono::{Datelike, Duration, Local, NaiveDate, NaiveDateTime, NaiveTime};
use regex::Regex;
use std::sync::LazyLock;

static DAY_MONTH_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\d.]+").expect("valid day/month regex"));
static TIME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\d:]+").expect("valid time regex"));

/// One appointment read off the results listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateSlot {
    pub at: NaiveDateTime,
    /// Whether the listing shows the visit as free of charge.
    pub free: bool,
    /// Rendered text of the result row.
    pub summary: String,
}

impl CandidateSlot {
    pub fn is_bookable(&self, predicate: &dyn SlotPredicate, now: NaiveDateTime) -> bool {
        self.free && predicate.accepts(self.at, now)
    }
}

/// Source of the current local time.
pub trait Clock: Send + Sync {
    fn now(&self) -> NaiveDateTime;

    fn today(&self) -> NaiveDate {
        self.now().date()
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDateTime);

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        self.0
    }
}

/// Decides whether a slot starting at `at` is acceptable when evaluated at `now`.
pub trait SlotPredicate: Send + Sync {
    fn accepts(&self, at: NaiveDateTime, now: NaiveDateTime) -> bool;
}

impl<F> SlotPredicate for F
where
    F: Fn(NaiveDateTime, NaiveDateTime) -> bool + Send + Sync,
{
    fn accepts(&self, at: NaiveDateTime, now: NaiveDateTime) -> bool {
        self(at, now)
    }
}

/// Built-in predicate: a minimum lead time plus optional date and
/// time-of-day bounds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotWindow {
    /// Slots must start strictly later than `now + min_lead`.
    pub min_lead: Duration,
    /// Last acceptable calendar day, inclusive.
    pub not_after: Option<NaiveDate>,
    pub earliest_time: Option<NaiveTime>,
    pub latest_time: Option<NaiveTime>,
}

impl Default for SlotWindow {
    fn default() -> Self {
        Self {
            min_lead: Duration::hours(3),
            not_after: None,
            earliest_time: None,
            latest_time: None,
        }
    }
}

impl SlotPredicate for SlotWindow {
    fn accepts(&self, at: NaiveDateTime, now: NaiveDateTime) -> bool {
        // A lead time past the calendar's range accepts nothing.
        match now.checked_add_signed(self.min_lead) {
            Some(earliest) if at > earliest => {}
            _ => return false,
        }
        if self.not_after.is_some_and(|last| at.date() > last) {
            return false;
        }
        if self.earliest_time.is_some_and(|earliest| at.time() < earliest) {
            return false;
        }
        if self.latest_time.is_some_and(|latest| at.time() > latest) {
            return false;
        }
        true
    }
}

/// Compose the listing's day/month and time-of-day strings into a full
/// timestamp.
///
/// The listing carries no year. The current year is assumed, and a date that
/// would fall before `today` is moved to the following year. Returns `None`
/// when either string has no parsable date or time.
pub fn compose_slot_time(day_month: &str, time: &str, today: NaiveDate) -> Option<NaiveDateTime> {
    let day_month = DAY_MONTH_RE.find(day_month)?.as_str().trim_matches('.');
    let time = TIME_RE.find(time)?.as_str().trim_matches(':');
    let time = NaiveTime::parse_from_str(time, "%H:%M").ok()?;

    let (day, month) = day_month.split_once('.')?;
    let day: u32 = day.parse().ok()?;
    let month: u32 = month.parse().ok()?;

    let year = today.year();
    match NaiveDate::from_ymd_opt(year, month, day) {
        Some(date) if date >= today => Some(date.and_time(time)),
        // 29.02 outside a leap year can only mean a later year
        _ => NaiveDate::from_ymd_opt(year + 1, month, day).map(|date| date.and_time(time)),
    }
}
