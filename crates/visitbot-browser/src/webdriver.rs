//! W3C WebDriver client.
//!
//! Talks to an already running driver (chromedriver, geckodriver, a Selenium
//! grid) over its HTTP/JSON protocol. The remote browser session is created
//! lazily on the first command, so constructing a [`WebDriverSession`] never
//! touches the network.

use async_trait::async_trait;
use reqwest::{Client, Method};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::time::{Duration, Instant};
use tokio::sync::OnceCell;
use tracing::debug;
use url::Url;

use crate::{BrowserError, BrowserResult, BrowserSession, ElementHandle, Locator, Wait};

/// Key under which W3C drivers return element references.
const ELEMENT_KEY: &str = "element-6066-11e4-a52e-4f735466cecf";
const DEFAULT_WAIT_SECS: u64 = 5;
const DEFAULT_POLL_MILLIS: u64 = 200;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum BrowserKind {
    #[default]
    Chrome,
    Firefox,
}

#[derive(Debug, Clone)]
pub struct WebDriverConfig {
    /// Driver endpoint, e.g. `http://localhost:9515`.
    pub endpoint: String,
    /// Site root that relative paths passed to `visit` resolve against.
    pub base_url: String,
    pub browser: BrowserKind,
    pub headless: bool,
    pub wait: Duration,
    pub poll_interval: Duration,
}

impl Default for WebDriverConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:9515".to_string(),
            base_url: "https://online.enel.pl".to_string(),
            browser: BrowserKind::Chrome,
            headless: true,
            wait: Duration::from_secs(DEFAULT_WAIT_SECS),
            poll_interval: Duration::from_millis(DEFAULT_POLL_MILLIS),
        }
    }
}

pub struct WebDriverSession {
    client: Client,
    config: WebDriverConfig,
    endpoint: Url,
    base_url: Url,
    session_id: OnceCell<String>,
}

impl WebDriverSession {
    pub fn new(config: WebDriverConfig) -> BrowserResult<Self> {
        let endpoint = Url::parse(config.endpoint.trim_end_matches('/'))?;
        let base_url = Url::parse(&config.base_url)?;
        Ok(Self {
            client: Client::new(),
            config,
            endpoint,
            base_url,
            session_id: OnceCell::new(),
        })
    }

    pub fn config(&self) -> &WebDriverConfig {
        &self.config
    }

    /// Whether a remote session has been opened.
    pub fn is_started(&self) -> bool {
        self.session_id.initialized()
    }

    async fn session_id(&self) -> BrowserResult<&str> {
        self.session_id
            .get_or_try_init(|| self.start())
            .await
            .map(String::as_str)
    }

    async fn start(&self) -> BrowserResult<String> {
        let capabilities = capabilities_for(self.config.browser, self.config.headless);
        let url = self.endpoint_url("session")?;
        let value = self
            .send(Method::POST, url, Some(json!({ "capabilities": capabilities })))
            .await?;

        let id = value
            .get("sessionId")
            .and_then(Value::as_str)
            .ok_or_else(|| BrowserError::Protocol("missing sessionId".to_string()))?
            .to_string();
        debug!(session_id = %id, browser = ?self.config.browser, "WebDriver session started");
        Ok(id)
    }

    fn endpoint_url(&self, path: &str) -> BrowserResult<Url> {
        Ok(Url::parse(&format!("{}/{}", self.endpoint.as_str().trim_end_matches('/'), path))?)
    }

    async fn command(&self, method: Method, path: &str, body: Option<Value>) -> BrowserResult<Value> {
        let session_id = self.session_id().await?;
        let url = self.endpoint_url(&format!("session/{}/{}", session_id, path))?;
        self.send(method, url, body).await
    }

    async fn send(&self, method: Method, url: Url, body: Option<Value>) -> BrowserResult<Value> {
        let mut request = self.client.request(method, url);
        if let Some(body) = body {
            request = request.json(&body);
        }
        let response = request.send().await?;
        let payload: Value = response.json().await?;
        unwrap_value(payload)
    }

    async fn locate(
        &self,
        scope: Option<&ElementHandle>,
        locator: &Locator,
        many: bool,
    ) -> BrowserResult<Value> {
        let suffix = if many { "elements" } else { "element" };
        let path = match scope {
            Some(parent) => format!("element/{}/{}", parent.id(), suffix),
            None => suffix.to_string(),
        };
        let body = json!({ "using": locator.strategy(), "value": locator.value() });
        self.command(Method::POST, &path, Some(body)).await
    }

    fn deadline(&self, wait: Wait) -> Option<Instant> {
        match wait {
            Wait::Default => Some(Instant::now() + self.config.wait),
            Wait::Immediate => None,
        }
    }
}

#[async_trait]
impl BrowserSession for WebDriverSession {
    async fn visit(&self, path: &str) -> BrowserResult<()> {
        let target = self.base_url.join(path)?;
        debug!(url = %target, "Navigating");
        self.command(Method::POST, "url", Some(json!({ "url": target.as_str() })))
            .await?;
        Ok(())
    }

    async fn find(
        &self,
        scope: Option<&ElementHandle>,
        locator: &Locator,
        wait: Wait,
    ) -> BrowserResult<ElementHandle> {
        let deadline = self.deadline(wait);
        loop {
            match self.locate(scope, locator, false).await {
                Ok(value) => return element_from_value(&value),
                Err(err) if err.is_element_not_found() => {
                    if deadline.is_none_or(|deadline| Instant::now() >= deadline) {
                        return Err(BrowserError::ElementNotFound(locator.to_string()));
                    }
                }
                Err(err) => return Err(err),
            }
            tokio::time::sleep(self.config.poll_interval).await;
        }
    }

    async fn find_all(
        &self,
        scope: Option<&ElementHandle>,
        locator: &Locator,
    ) -> BrowserResult<Vec<ElementHandle>> {
        let value = self.locate(scope, locator, true).await?;
        let items = value
            .as_array()
            .ok_or_else(|| BrowserError::Protocol("expected element list".to_string()))?;
        items.iter().map(element_from_value).collect()
    }

    async fn click(&self, element: &ElementHandle) -> BrowserResult<()> {
        self.command(
            Method::POST,
            &format!("element/{}/click", element.id()),
            Some(json!({})),
        )
        .await?;
        Ok(())
    }

    async fn fill(&self, element: &ElementHandle, text: &str) -> BrowserResult<()> {
        self.command(
            Method::POST,
            &format!("element/{}/clear", element.id()),
            Some(json!({})),
        )
        .await?;
        self.command(
            Method::POST,
            &format!("element/{}/value", element.id()),
            Some(json!({ "text": text })),
        )
        .await?;
        Ok(())
    }

    async fn text(&self, element: &ElementHandle) -> BrowserResult<String> {
        let value = self
            .command(Method::GET, &format!("element/{}/text", element.id()), None)
            .await?;
        value
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| BrowserError::Protocol("element text is not a string".to_string()))
    }

    async fn is_selected(&self, element: &ElementHandle) -> BrowserResult<bool> {
        let value = self
            .command(
                Method::GET,
                &format!("element/{}/selected", element.id()),
                None,
            )
            .await?;
        value
            .as_bool()
            .ok_or_else(|| BrowserError::Protocol("selected state is not a bool".to_string()))
    }

    async fn has_text(
        &self,
        scope: Option<&ElementHandle>,
        needle: &str,
        wait: Wait,
    ) -> BrowserResult<bool> {
        let deadline = self.deadline(wait);
        loop {
            let root = match scope {
                Some(element) => element.clone(),
                None => self.find(None, &Locator::css("body"), Wait::Immediate).await?,
            };
            match self.text(&root).await {
                Ok(text) if text.contains(needle) => return Ok(true),
                Ok(_) => {}
                Err(err) if err.is_stale() && scope.is_none() => {}
                Err(err) => return Err(err),
            }
            if deadline.is_none_or(|deadline| Instant::now() >= deadline) {
                return Ok(false);
            }
            tokio::time::sleep(self.config.poll_interval).await;
        }
    }

    async fn close(&self) -> BrowserResult<()> {
        let Some(session_id) = self.session_id.get() else {
            return Ok(());
        };
        let url = self.endpoint_url(&format!("session/{}", session_id))?;
        self.send(Method::DELETE, url, None).await?;
        debug!(session_id = %session_id, "WebDriver session closed");
        Ok(())
    }
}

fn capabilities_for(browser: BrowserKind, headless: bool) -> Value {
    match browser {
        BrowserKind::Chrome => {
            let mut args = vec!["--window-size=1400,1000"];
            if headless {
                args.push("--headless=new");
            }
            json!({
                "alwaysMatch": {
                    "browserName": "chrome",
                    "goog:chromeOptions": { "args": args }
                }
            })
        }
        BrowserKind::Firefox => {
            let args: Vec<&str> = if headless { vec!["-headless"] } else { Vec::new() };
            json!({
                "alwaysMatch": {
                    "browserName": "firefox",
                    "moz:firefoxOptions": { "args": args }
                }
            })
        }
    }
}

/// Strip the `{"value": ...}` envelope, turning error payloads into errors.
fn unwrap_value(payload: Value) -> BrowserResult<Value> {
    let Some(value) = payload.get("value") else {
        return Err(BrowserError::Protocol(format!(
            "response without value: {}",
            payload
        )));
    };

    if let Some(code) = value.get("error").and_then(Value::as_str) {
        let message = value
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or_default();
        return Err(BrowserError::from_driver(code, message));
    }

    Ok(value.clone())
}

fn element_from_value(value: &Value) -> BrowserResult<ElementHandle> {
    value
        .get(ELEMENT_KEY)
        .and_then(Value::as_str)
        .map(ElementHandle::new)
        .ok_or_else(|| BrowserError::Protocol(format!("not an element reference: {}", value)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unwrap_value_extracts_payload() {
        let value = unwrap_value(json!({ "value": { "sessionId": "abc" } })).unwrap();
        assert_eq!(value["sessionId"], "abc");

        let null = unwrap_value(json!({ "value": null })).unwrap();
        assert!(null.is_null());
    }

    #[test]
    fn unwrap_value_maps_driver_errors() {
        let err = unwrap_value(json!({
            "value": {
                "error": "no such element",
                "message": "Unable to locate element",
                "stacktrace": ""
            }
        }))
        .unwrap_err();
        assert!(err.is_element_not_found());

        let err = unwrap_value(json!({
            "value": { "error": "stale element reference", "message": "detached" }
        }))
        .unwrap_err();
        assert!(err.is_stale());

        assert!(matches!(
            unwrap_value(json!({ "status": 0 })),
            Err(BrowserError::Protocol(_))
        ));
    }

    #[test]
    fn element_reference_parsing() {
        let handle = element_from_value(&json!({ ELEMENT_KEY: "e-42" })).unwrap();
        assert_eq!(handle.id(), "e-42");
        assert!(element_from_value(&json!({ "ELEMENT": "legacy" })).is_err());
    }

    #[test]
    fn headless_flag_reaches_capabilities() {
        let chrome = capabilities_for(BrowserKind::Chrome, true);
        let args = chrome["alwaysMatch"]["goog:chromeOptions"]["args"]
            .as_array()
            .unwrap();
        assert!(args.iter().any(|arg| arg == "--headless=new"));

        let firefox = capabilities_for(BrowserKind::Firefox, false);
        assert_eq!(firefox["alwaysMatch"]["browserName"], "firefox");
        assert!(
            firefox["alwaysMatch"]["moz:firefoxOptions"]["args"]
                .as_array()
                .unwrap()
                .is_empty()
        );
    }

    #[test]
    fn new_session_is_lazy() {
        let session = WebDriverSession::new(WebDriverConfig {
            endpoint: "http://127.0.0.1:9/".to_string(),
            ..WebDriverConfig::default()
        })
        .unwrap();
        assert!(!session.is_started());
        assert_eq!(
            session.endpoint_url("session").unwrap().as_str(),
            "http://127.0.0.1:9/session"
        );
    }

    #[tokio::test]
    async fn close_without_session_is_noop() {
        let session = WebDriverSession::new(WebDriverConfig::default()).unwrap();
        session.close().await.unwrap();
    }
}
