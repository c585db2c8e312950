//! Settings file support
//!
//! Loads deployment settings from ~/.config/visitbot/config.toml, or from the
//! file named with `--config`. Every key is optional.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use visitbot_browser::{BrowserKind, WebDriverConfig};
use visitbot_core::portal::{DEFAULT_BASE_URL, DEFAULT_PORTAL_NAME};
use visitbot_core::notifier::{DEFAULT_SMTP_HOST, DEFAULT_SMTP_PORT};

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Settings {
    #[serde(default)]
    pub portal: PortalSettings,
    #[serde(default)]
    pub webdriver: WebDriverSettings,
    #[serde(default)]
    pub smtp: SmtpSettings,
    #[serde(default)]
    pub retry: RetrySettings,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PortalSettings {
    /// Portal root URL
    pub base_url: String,
    /// Name used in email subjects and the lock file
    pub name: String,
}

impl Default for PortalSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            name: DEFAULT_PORTAL_NAME.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct WebDriverSettings {
    /// Running chromedriver/geckodriver endpoint
    pub url: String,
    pub browser: BrowserKind,
    /// Seconds to wait for an element before giving up
    pub wait_secs: u64,
    pub poll_millis: u64,
    /// Pause before dropdown interactions on the search form
    pub settle_millis: u64,
}

impl Default for WebDriverSettings {
    fn default() -> Self {
        Self {
            url: "http://localhost:9515".to_string(),
            browser: BrowserKind::Chrome,
            wait_secs: 5,
            poll_millis: 200,
            settle_millis: 1000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SmtpSettings {
    pub host: String,
    pub port: u16,
}

impl Default for SmtpSettings {
    fn default() -> Self {
        Self {
            host: DEFAULT_SMTP_HOST.to_string(),
            port: DEFAULT_SMTP_PORT,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RetrySettings {
    /// Pause before restarting after a missing page element
    pub delay_secs: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self { delay_secs: 60 }
    }
}

impl Settings {
    /// Load settings. An explicitly named file must exist and parse; the
    /// default location is optional.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load_from_path(path),
            None => match Self::default_path() {
                Some(path) if path.exists() => Self::load_from_path(&path),
                _ => Ok(Self::default()),
            },
        }
    }

    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings file {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("Invalid settings file {}", path.display()))
    }

    /// Get the default settings file path
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("visitbot").join("config.toml"))
    }

    pub fn webdriver_config(&self, headless: bool) -> WebDriverConfig {
        WebDriverConfig {
            endpoint: self.webdriver.url.clone(),
            base_url: self.portal.base_url.clone(),
            browser: self.webdriver.browser,
            headless,
            wait: Duration::from_secs(self.webdriver.wait_secs),
            poll_interval: Duration::from_millis(self.webdriver.poll_millis),
        }
    }

    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.webdriver.settle_millis)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_secs(self.retry.delay_secs)
    }
}
