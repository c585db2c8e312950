//! Browser error types.

use thiserror::Error;

/// Failures raised by a browser session.
#[derive(Error, Debug)]
pub enum BrowserError {
    /// The expected element did not appear within the wait window.
    #[error("element not found: {0}")]
    ElementNotFound(String),

    /// The element was removed from the page after it was located.
    #[error("stale element reference: {0}")]
    StaleElement(String),

    #[error("webdriver error ({code}): {message}")]
    Driver { code: String, message: String },

    #[error("unexpected webdriver response: {0}")]
    Protocol(String),

    #[error("invalid url: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl BrowserError {
    pub fn is_element_not_found(&self) -> bool {
        matches!(self, BrowserError::ElementNotFound(_))
    }

    pub fn is_stale(&self) -> bool {
        matches!(self, BrowserError::StaleElement(_))
    }

    /// Map a W3C WebDriver error code onto the error taxonomy.
    pub fn from_driver(code: &str, message: &str) -> Self {
        match code {
            "no such element" => BrowserError::ElementNotFound(message.to_string()),
            "stale element reference" => BrowserError::StaleElement(message.to_string()),
            _ => BrowserError::Driver {
                code: code.to_string(),
                message: message.to_string(),
            },
        }
    }
}

/// Result type alias for browser operations
pub type BrowserResult<T> = std::result::Result<T, BrowserError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn driver_codes_map_to_variants() {
        assert!(BrowserError::from_driver("no such element", "gone").is_element_not_found());
        assert!(BrowserError::from_driver("stale element reference", "detached").is_stale());

        let other = BrowserError::from_driver("session not created", "no chrome");
        assert!(!other.is_element_not_found());
        assert_eq!(
            other.to_string(),
            "webdriver error (session not created): no chrome"
        );
    }
}
