//! Browser session capability for visitbot.
//!
//! This crate provides the small browser surface the booking flow needs:
//! - A [`BrowserSession`] trait (navigate, scoped lookups, clicks, form input)
//!   that callers mock in tests
//! - [`Locator`] builders for CSS/XPath element lookups
//! - [`WebDriverSession`], a W3C WebDriver client that polls lookups until a
//!   bounded wait expires

mod error;
mod locator;
mod webdriver;

pub use error::{BrowserError, BrowserResult};
pub use locator::{Locator, xpath_literal};
pub use webdriver::{BrowserKind, WebDriverConfig, WebDriverSession};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque reference to an element on the current page.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ElementHandle(String);

impl ElementHandle {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn id(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ElementHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// How long a lookup may block waiting for its target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Wait {
    /// The session's configured wait window.
    #[default]
    Default,
    /// A single attempt.
    Immediate,
}

#[async_trait]
pub trait BrowserSession: Send + Sync {
    /// Navigate to `path`, resolved against the session's base URL.
    async fn visit(&self, path: &str) -> BrowserResult<()>;

    /// Locate one element inside `scope` (or the document), waiting per `wait`.
    async fn find(
        &self,
        scope: Option<&ElementHandle>,
        locator: &Locator,
        wait: Wait,
    ) -> BrowserResult<ElementHandle>;

    /// Locate every matching element currently on the page. Never waits.
    async fn find_all(
        &self,
        scope: Option<&ElementHandle>,
        locator: &Locator,
    ) -> BrowserResult<Vec<ElementHandle>>;

    async fn click(&self, element: &ElementHandle) -> BrowserResult<()>;

    /// Replace the value of an input element.
    async fn fill(&self, element: &ElementHandle, text: &str) -> BrowserResult<()>;

    async fn text(&self, element: &ElementHandle) -> BrowserResult<String>;

    async fn is_selected(&self, element: &ElementHandle) -> BrowserResult<bool>;

    /// Whether the rendered text of `scope` contains `needle`, waiting per `wait`.
    async fn has_text(
        &self,
        scope: Option<&ElementHandle>,
        needle: &str,
        wait: Wait,
    ) -> BrowserResult<bool>;

    async fn close(&self) -> BrowserResult<()>;

    async fn has(
        &self,
        scope: Option<&ElementHandle>,
        locator: &Locator,
        wait: Wait,
    ) -> BrowserResult<bool> {
        match self.find(scope, locator, wait).await {
            Ok(_) => Ok(true),
            Err(err) if err.is_element_not_found() => Ok(false),
            Err(err) => Err(err),
        }
    }

    async fn click_on(
        &self,
        scope: Option<&ElementHandle>,
        locator: &Locator,
    ) -> BrowserResult<()> {
        let element = self.find(scope, locator, Wait::Default).await?;
        self.click(&element).await
    }

    async fn fill_in(
        &self,
        scope: Option<&ElementHandle>,
        label: &str,
        text: &str,
    ) -> BrowserResult<()> {
        let element = self
            .find(scope, &Locator::field(label), Wait::Default)
            .await?;
        self.fill(&element, text).await
    }

    /// Pick the option whose visible text is `option`.
    async fn select(&self, scope: Option<&ElementHandle>, option: &str) -> BrowserResult<()> {
        self.click_on(scope, &Locator::option(option)).await
    }

    async fn check(&self, scope: Option<&ElementHandle>, label: &str) -> BrowserResult<()> {
        self.set_checkbox(scope, label, true).await
    }

    async fn uncheck(&self, scope: Option<&ElementHandle>, label: &str) -> BrowserResult<()> {
        self.set_checkbox(scope, label, false).await
    }

    async fn set_checkbox(
        &self,
        scope: Option<&ElementHandle>,
        label: &str,
        checked: bool,
    ) -> BrowserResult<()> {
        let element = self
            .find(scope, &Locator::checkbox(label), Wait::Default)
            .await?;
        if self.is_selected(&element).await? != checked {
            self.click(&element).await?;
        }
        Ok(())
    }
}
