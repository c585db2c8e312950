//! Clinic portal page flows.
//!
//! [`Portal`] is the vocabulary the finder and orchestrator speak: log in,
//! submit the search, walk result rows, reserve. [`EnelPortal`] implements it
//! on top of a [`BrowserSession`] for the enel-med patient portal.

use async_trait::async_trait;
use chrono::{Datelike, Months};
use regex::Regex;
use std::sync::{Arc, LazyLock};
use std::time::Duration;
use tracing::{debug, info};
use visitbot_browser::{BrowserError, BrowserResult, BrowserSession, ElementHandle, Locator, Wait};

use crate::request::{Credentials, SearchCriteria};
use crate::slot::Clock;

pub const DEFAULT_BASE_URL: &str = "https://online.enel.pl";
pub const DEFAULT_PORTAL_NAME: &str = "enel-med";

const LOGIN_PATH: &str = "/Account/Login";
const NEW_VISIT_PATH: &str = "/Visit/New";
const SEARCH_HEADING: &str = "Umów teleporadę, wizytę lub badanie";
const RESULTS_HEADING: &str = "Znalezione wizyty";
const DATE_RANGE_MONTHS: u32 = 9;

/// A zero price as a whole amount, not the tail of `120,00 zł`.
static FREE_OF_CHARGE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:^|[^\d,.])0,00\s*zł").expect("valid price regex"));

/// Raw text read from one result row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRow {
    pub summary: String,
    pub free: bool,
    pub day_month: String,
    pub time: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowReading {
    Listed(RawRow),
    /// The row vanished or lacks its date/time lines.
    Unparsable,
}

#[async_trait]
pub trait Portal: Send + Sync {
    type Row: Send + Sync;

    async fn log_in(&self, credentials: &Credentials) -> BrowserResult<()>;

    async fn submit_search(&self, criteria: &SearchCriteria) -> BrowserResult<()>;

    /// Block until the current results page is rendered.
    async fn await_results(&self) -> BrowserResult<()>;

    async fn result_rows(&self) -> BrowserResult<Vec<Self::Row>>;

    async fn read_row(&self, row: &Self::Row) -> BrowserResult<RowReading>;

    /// Advance to the next results page. Returns `false` on the last page.
    async fn next_page(&self) -> BrowserResult<bool>;

    async fn reserve(&self, row: &Self::Row) -> BrowserResult<()>;

    async fn accept_terms(&self) -> BrowserResult<()>;

    async fn confirm(&self) -> BrowserResult<()>;
}

pub struct EnelPortal<B> {
    session: Arc<B>,
    clock: Arc<dyn Clock>,
    settle: Duration,
}

impl<B: BrowserSession> EnelPortal<B> {
    pub fn new(session: Arc<B>, clock: Arc<dyn Clock>) -> Self {
        Self {
            session,
            clock,
            settle: Duration::from_secs(1),
        }
    }

    /// Pause inserted before dropdown interactions while the page scripts catch up.
    pub fn with_settle(mut self, settle: Duration) -> Self {
        self.settle = settle;
        self
    }

    pub fn session(&self) -> &Arc<B> {
        &self.session
    }

    async fn settle(&self) {
        if !self.settle.is_zero() {
            tokio::time::sleep(self.settle).await;
        }
    }

    async fn open_dropdown(&self, label_id: &str) -> BrowserResult<()> {
        self.settle().await;
        self.session.click_on(None, &dropdown_toggle(label_id)).await
    }

    async fn check_all_boxes(&self, label_id: &str) -> BrowserResult<()> {
        self.settle().await;
        let dropdown = self
            .session
            .find(
                None,
                &Locator::css(format!("label[for=\"{}\"]+.dropdown", label_id)),
                Wait::Default,
            )
            .await?;
        self.session
            .has_text(Some(&dropdown), "Zatwierdź", Wait::Default)
            .await?;

        let boxes = self
            .session
            .find_all(Some(&dropdown), &Locator::css("input[type=\"checkbox\"]"))
            .await?;
        for checkbox in &boxes {
            if !self.session.is_selected(checkbox).await? {
                self.session.click(checkbox).await?;
            }
        }
        debug!(label = label_id, count = boxes.len(), "Ticked all options");

        self.session
            .click_on(Some(&dropdown), &Locator::link_or_button("Zatwierdź"))
            .await
    }

    /// Visit date range: from today until the same day nine months ahead.
    async fn pick_date_range(&self) -> BrowserResult<()> {
        let range = self
            .session
            .find(
                None,
                &Locator::css("label[for=\"VisitDateFrom\"]+.date-range"),
                Wait::Default,
            )
            .await?;

        let from = self
            .session
            .find(Some(&range), &Locator::css(".dtp_input1"), Wait::Default)
            .await?;
        self.session
            .click_on(Some(&from), &Locator::css("th.today"))
            .await?;
        self.settle().await;

        let to = self
            .session
            .find(Some(&range), &Locator::css(".dtp_input2"), Wait::Default)
            .await?;
        self.session
            .click_on(Some(&to), &Locator::css("th.today"))
            .await?;
        self.settle().await;
        for _ in 0..DATE_RANGE_MONTHS {
            self.session
                .click_on(Some(&to), &Locator::css("th.next"))
                .await?;
        }

        let days = self
            .session
            .find_all(
                Some(&to),
                &Locator::css("td.day:not(.old):not(.new):not(.disabled)"),
            )
            .await?;
        let target = range_end_day(self.clock.today());
        let day = days
            .get(target as usize - 1)
            .or(days.last())
            .ok_or_else(|| BrowserError::ElementNotFound("selectable end day".to_string()))?;
        self.session.click(day).await?;
        self.settle().await;

        self.session
            .click_on(Some(&range), &Locator::link_or_button("Zapisz"))
            .await
    }

    async fn line_with_icon(
        &self,
        lines: &[ElementHandle],
        icon: &str,
    ) -> BrowserResult<Option<String>> {
        for line in lines {
            if self
                .session
                .has(Some(line), &Locator::css(icon), Wait::Immediate)
                .await?
            {
                return Ok(Some(self.session.text(line).await?));
            }
        }
        Ok(None)
    }

    async fn read_row_lines(&self, row: &ElementHandle) -> BrowserResult<RowReading> {
        let summary = self.session.text(row).await?;
        let free = is_free_of_charge(&summary);

        let lines = self
            .session
            .find_all(Some(row), &Locator::css("p.text-lead"))
            .await?;
        let day_month = self.line_with_icon(&lines, ".ti-calendar").await?;
        let time = self.line_with_icon(&lines, ".ti-alarm-clock").await?;

        match (day_month, time) {
            (Some(day_month), Some(time)) => Ok(RowReading::Listed(RawRow {
                summary,
                free,
                day_month,
                time,
            })),
            _ => Ok(RowReading::Unparsable),
        }
    }
}

/// Control that opens the widget labelled `label_id`, whichever kind the
/// form renders next to the label.
fn dropdown_toggle(label_id: &str) -> Locator {
    let selector = ["select", "dropdown", "date-range"]
        .iter()
        .map(|class| format!("label[for=\"{}\"]+.{}", label_id, class))
        .collect::<Vec<_>>()
        .join(", ");
    Locator::css(selector)
}

fn is_free_of_charge(summary: &str) -> bool {
    FREE_OF_CHARGE_RE.is_match(summary)
}

/// Day of month to pick in the end-date calendar, clamped to the length of
/// the month nine months ahead.
fn range_end_day(today: chrono::NaiveDate) -> u32 {
    today
        .checked_add_months(Months::new(DATE_RANGE_MONTHS))
        .map(|date| date.day())
        .unwrap_or(today.day())
}

#[async_trait]
impl<B: BrowserSession> Portal for EnelPortal<B> {
    type Row = ElementHandle;

    async fn log_in(&self, credentials: &Credentials) -> BrowserResult<()> {
        self.session.visit(LOGIN_PATH).await?;
        self.session.fill_in(None, "Login", &credentials.login).await?;
        self.session
            .fill_in(None, "Hasło", &credentials.password)
            .await?;
        self.session.check(None, "Akceptuję regulamin").await?;
        self.session
            .click_on(None, &Locator::link_or_button("Zaloguj się"))
            .await
    }

    async fn submit_search(&self, criteria: &SearchCriteria) -> BrowserResult<()> {
        self.session.visit(NEW_VISIT_PATH).await?;
        self.session
            .has_text(None, SEARCH_HEADING, Wait::Default)
            .await?;
        info!("Logged in");

        let popover = Locator::css(".js-close-popover");
        if self.session.has(None, &popover, Wait::Default).await? {
            self.session.click_on(None, &popover).await?;
        }

        self.open_dropdown("City").await?;
        self.session.select(None, &criteria.city).await?;

        self.open_dropdown("Department").await?;
        self.check_all_boxes("Department").await?;

        self.open_dropdown("ServiceType").await?;
        self.session.select(None, &criteria.service_type).await?;

        self.open_dropdown("Service").await?;
        self.session.select(None, &criteria.service).await?;

        self.session.uncheck(None, "ForeignLanguageDoctor").await?;

        self.open_dropdown("Doctor").await?;
        self.check_all_boxes("Doctor").await?;

        self.open_dropdown("VisitDateFrom").await?;
        self.pick_date_range().await?;

        self.session
            .click_on(None, &Locator::link_or_button("Szukaj"))
            .await?;
        info!("Query sent");
        Ok(())
    }

    async fn await_results(&self) -> BrowserResult<()> {
        self.session
            .has_text(None, RESULTS_HEADING, Wait::Default)
            .await?;
        self.session
            .find(None, &Locator::css("#Results"), Wait::Default)
            .await?;
        Ok(())
    }

    async fn result_rows(&self) -> BrowserResult<Vec<ElementHandle>> {
        let results = self
            .session
            .find(None, &Locator::css("#Results"), Wait::Default)
            .await?;
        self.session
            .find_all(Some(&results), &Locator::css(".box-visit"))
            .await
    }

    async fn read_row(&self, row: &ElementHandle) -> BrowserResult<RowReading> {
        match self.read_row_lines(row).await {
            Err(err) if err.is_stale() => {
                debug!(row = %row, error = %err, "Row went stale while reading");
                Ok(RowReading::Unparsable)
            }
            other => other,
        }
    }

    async fn next_page(&self) -> BrowserResult<bool> {
        let next = Locator::css(".pagination .active ~ .print-hide a");
        match self.session.find(None, &next, Wait::Default).await {
            Ok(link) => {
                self.session.click(&link).await?;
                debug!("Waiting for next results page");
                Ok(true)
            }
            Err(err) if err.is_element_not_found() => Ok(false),
            Err(err) => Err(err),
        }
    }

    async fn reserve(&self, row: &ElementHandle) -> BrowserResult<()> {
        self.session
            .click_on(Some(row), &Locator::link_or_button("Rezerwuj"))
            .await
    }

    async fn accept_terms(&self) -> BrowserResult<()> {
        self.session
            .check(None, "Akceptuję Regulamin wizyt w Oddziałach")
            .await
    }

    async fn confirm(&self) -> BrowserResult<()> {
        self.session
            .click_on(None, &Locator::link_or_button("Potwierdzam"))
            .await
    }
}
