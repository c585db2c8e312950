//! Appointment finder: walks the paginated results listing.

use std::sync::Arc;
use tracing::{debug, info};
use visitbot_browser::BrowserResult;

use crate::portal::{Portal, RowReading};
use crate::slot::{CandidateSlot, Clock, SlotPredicate, compose_slot_time};

/// A bookable slot together with the listing row it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FoundSlot<R> {
    pub slot: CandidateSlot,
    pub row: R,
}

pub struct AppointmentFinder {
    predicate: Arc<dyn SlotPredicate>,
    clock: Arc<dyn Clock>,
}

impl AppointmentFinder {
    pub fn new(predicate: Arc<dyn SlotPredicate>, clock: Arc<dyn Clock>) -> Self {
        Self { predicate, clock }
    }

    /// Return the first free slot the predicate accepts, paging forward only.
    /// `Ok(None)` means every page was inspected without a match.
    pub async fn find<P: Portal>(&self, portal: &P) -> BrowserResult<Option<FoundSlot<P::Row>>> {
        let mut page = 1usize;
        loop {
            portal.await_results().await?;
            let rows = portal.result_rows().await?;
            debug!(page, rows = rows.len(), "Results page loaded");

            for row in rows {
                let RowReading::Listed(raw) = portal.read_row(&row).await? else {
                    debug!(page, "Skipping unparsable row");
                    continue;
                };
                if !raw.free {
                    continue;
                }

                let now = self.clock.now();
                let Some(at) = compose_slot_time(&raw.day_month, &raw.time, now.date()) else {
                    debug!(
                        page,
                        day_month = %raw.day_month,
                        time = %raw.time,
                        "Unrecognised slot time"
                    );
                    continue;
                };

                let slot = CandidateSlot {
                    at,
                    free: raw.free,
                    summary: raw.summary,
                };
                if slot.is_bookable(self.predicate.as_ref(), now) {
                    info!(page, at = %slot.at, "Got a visit");
                    return Ok(Some(FoundSlot { slot, row }));
                }
                debug!(page, at = %slot.at, "Slot rejected by predicate");
            }

            if !portal.next_page().await? {
                info!(pages = page, "No visit found");
                return Ok(None);
            }
            page += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::portal::RawRow;
    use crate::request::{Credentials, SearchCriteria};
    use crate::slot::{FixedClock, SlotWindow};
    use async_trait::async_trait;
    use chrono::{NaiveDate, NaiveDateTime};
    use std::sync::Mutex;
    use visitbot_browser::BrowserError;

    /// Listing made of pages of rows; a row is `None` when it goes stale.
    struct Listing {
        pages: Vec<Vec<Option<RawRow>>>,
        current: Mutex<usize>,
        missing_results_on: Option<usize>,
    }

    impl Listing {
        fn new(pages: Vec<Vec<Option<RawRow>>>) -> Self {
            Self {
                pages,
                current: Mutex::new(0),
                missing_results_on: None,
            }
        }

        fn page(&self) -> usize {
            *self.current.lock().unwrap()
        }
    }

    #[async_trait]
    impl Portal for Listing {
        type Row = (usize, usize);

        async fn log_in(&self, _credentials: &Credentials) -> BrowserResult<()> {
            Ok(())
        }

        async fn submit_search(&self, _criteria: &SearchCriteria) -> BrowserResult<()> {
            Ok(())
        }

        async fn await_results(&self) -> BrowserResult<()> {
            if self.missing_results_on == Some(self.page()) {
                return Err(BrowserError::ElementNotFound("#Results".to_string()));
            }
            Ok(())
        }

        async fn result_rows(&self) -> BrowserResult<Vec<(usize, usize)>> {
            let page = self.page();
            Ok((0..self.pages[page].len()).map(|idx| (page, idx)).collect())
        }

        async fn read_row(&self, row: &(usize, usize)) -> BrowserResult<RowReading> {
            Ok(match &self.pages[row.0][row.1] {
                Some(raw) => RowReading::Listed(raw.clone()),
                None => RowReading::Unparsable,
            })
        }

        async fn next_page(&self) -> BrowserResult<bool> {
            let mut current = self.current.lock().unwrap();
            if *current + 1 < self.pages.len() {
                *current += 1;
                Ok(true)
            } else {
                Ok(false)
            }
        }

        async fn reserve(&self, _row: &(usize, usize)) -> BrowserResult<()> {
            Ok(())
        }

        async fn accept_terms(&self) -> BrowserResult<()> {
            Ok(())
        }

        async fn confirm(&self) -> BrowserResult<()> {
            Ok(())
        }
    }

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 10)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap()
    }

    fn row(day_month: &str, time: &str, free: bool) -> Option<RawRow> {
        Some(RawRow {
            summary: format!("{} {}", day_month, time),
            free,
            day_month: day_month.to_string(),
            time: time.to_string(),
        })
    }

    fn finder() -> AppointmentFinder {
        AppointmentFinder::new(Arc::new(SlotWindow::default()), Arc::new(FixedClock(now())))
    }

    #[tokio::test]
    async fn returns_first_free_accepted_slot_in_listing_order() {
        let listing = Listing::new(vec![vec![
            row("10.01", "11:00", true),  // too soon
            row("11.01", "09:00", false), // charged
            row("12.01", "08:00", true),
            row("13.01", "08:00", true),
        ]]);

        let found = finder().find(&listing).await.unwrap().unwrap();
        assert_eq!(found.row, (0, 2));
        assert_eq!(found.slot.summary, "12.01 08:00");
        assert!(found.slot.free);
    }

    #[tokio::test]
    async fn pages_forward_until_a_match() {
        let listing = Listing::new(vec![
            vec![row("10.01", "10:30", true), row("15.01", "10:00", false)],
            vec![None, row("20.01", "12:00", true)],
            vec![row("21.01", "12:00", true)],
        ]);

        let found = finder().find(&listing).await.unwrap().unwrap();
        assert_eq!(found.row, (1, 1));
        assert_eq!(
            found.slot.at,
            NaiveDate::from_ymd_opt(2024, 1, 20)
                .unwrap()
                .and_hms_opt(12, 0, 0)
                .unwrap()
        );
        assert_eq!(listing.page(), 1);
    }

    #[tokio::test]
    async fn exhausted_listing_yields_none() {
        let listing = Listing::new(vec![
            vec![row("15.01", "10:00", false)],
            vec![None, row("10.01", "09:00", true)],
        ]);

        assert!(finder().find(&listing).await.unwrap().is_none());
        assert_eq!(listing.page(), 1);
    }

    #[tokio::test]
    async fn empty_listing_yields_none() {
        let listing = Listing::new(vec![vec![]]);
        assert!(finder().find(&listing).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn custom_predicate_is_honoured() {
        let listing = Listing::new(vec![vec![
            row("12.01", "08:00", true),
            row("05.01", "08:00", true), // next year
        ]]);
        let new_year = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
        let next_year_only = move |at: NaiveDateTime, _now: NaiveDateTime| at.date() >= new_year;
        let finder =
            AppointmentFinder::new(Arc::new(next_year_only), Arc::new(FixedClock(now())));

        let found = finder.find(&listing).await.unwrap().unwrap();
        assert_eq!(found.row, (0, 1));
    }

    #[tokio::test]
    async fn missing_results_container_propagates_fault() {
        let mut listing = Listing::new(vec![vec![row("15.01", "10:00", false)], vec![]]);
        listing.missing_results_on = Some(1);

        let err = finder().find(&listing).await.unwrap_err();
        assert!(err.is_element_not_found());
    }
}
