//! Error types for a reservation run

use thiserror::Error;
use visitbot_browser::BrowserError;

use crate::notifier::NotifyError;

#[derive(Error, Debug)]
pub enum ReservationError {
    #[error("browser error: {0}")]
    Browser(#[from] BrowserError),

    #[error("notification error: {0}")]
    Notify(#[from] NotifyError),

    #[error("lock file error: {0}")]
    Lock(#[from] std::io::Error),
}

impl ReservationError {
    /// Only a missing element is worth restarting the run for; the page was
    /// probably slow or the session expired.
    pub fn is_transient(&self) -> bool {
        matches!(self, ReservationError::Browser(err) if err.is_element_not_found())
    }
}

/// Result type alias for reservation operations
pub type Result<T> = std::result::Result<T, ReservationError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_missing_elements_are_transient() {
        let missing: ReservationError = BrowserError::ElementNotFound("#Results".into()).into();
        let stale: ReservationError = BrowserError::StaleElement("row".into()).into();
        let crashed: ReservationError = BrowserError::Driver {
            code: "unknown error".into(),
            message: "chrome not reachable".into(),
        }
        .into();
        let io: ReservationError = std::io::Error::other("disk full").into();

        assert!(missing.is_transient());
        assert!(!stale.is_transient());
        assert!(!crashed.is_transient());
        assert!(!io.is_transient());
    }
}
