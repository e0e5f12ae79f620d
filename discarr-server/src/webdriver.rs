//! Discord web-client automation over the W3C WebDriver protocol.
//!
//! Talks JSON to a WebDriver endpoint (geckodriver) with `reqwest`.
//! Firefox runs with a persistent profile so the Discord login
//! survives restarts.
//!
//! Discord's DOM changes without notice; the selectors below are the
//! only place that needs updating when automation breaks.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method};
use serde_json::{Value, json};
use thiserror::Error;
use tokio::time::Instant;
use tracing::{debug, info};

use discarr_core::{DiscarrError, SessionDriver};

/// Any channel-list entry; present once the client has loaded.
const CHANNEL_LIST_SELECTOR: &str = "[data-list-item-id]";
const SHARE_SELECTOR: &str = r#"button[aria-label="Share Your Screen"], button[aria-label="Screen Share"], [class*="shareScreen"]"#;
const SOURCE_SELECTOR: &str = r#"[class*="sourceRow"], button[class*="source"]"#;
const STOP_SELECTOR: &str = r#"button[aria-label="Stop Sharing"], button[aria-label="Stop Screen Share"], [class*="stopShare"]"#;
const DISCONNECT_SELECTOR: &str = r#"button[aria-label="Disconnect"], [class*="disconnect"]"#;

/// W3C element reference key.
const ELEMENT_KEY: &str = "element-6066-11e4-a52e-4f735466cecf";

/// Errors from the WebDriver endpoint.
#[derive(Debug, Error)]
pub enum WebDriverError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("webdriver {error} (status {status}): {message}")]
    Command {
        status: u16,
        error: String,
        message: String,
    },

    #[error("malformed webdriver response: {0}")]
    Malformed(String),

    #[error("no element matched '{selector}' within {after:?}")]
    ElementTimeout { selector: String, after: Duration },

    #[error("no browser session")]
    NoSession,
}

impl WebDriverError {
    fn is_no_such_element(&self) -> bool {
        matches!(self, Self::Command { error, .. } if error == "no such element")
    }
}

impl From<WebDriverError> for DiscarrError {
    fn from(e: WebDriverError) -> Self {
        DiscarrError::SessionError(e.to_string())
    }
}

/// Connection and pacing for [`WebDriverSession`].
#[derive(Debug, Clone)]
pub struct WebDriverSettings {
    /// Endpoint without trailing slash, e.g. `http://localhost:4444`.
    pub endpoint: String,
    pub profile_path: PathBuf,
    pub server_id: String,
    pub channel_id: String,
    /// Upper bound on waiting for one element.
    pub element_wait: Duration,
    pub poll_interval: Duration,
    /// Pause after joining the voice channel.
    pub join_settle: Duration,
    /// Pause for the share-source picker to appear.
    pub picker_settle: Duration,
}

impl Default for WebDriverSettings {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:4444".into(),
            profile_path: PathBuf::from("./discord-profile"),
            server_id: String::new(),
            channel_id: String::new(),
            element_wait: Duration::from_secs(10),
            poll_interval: Duration::from_millis(250),
            join_settle: Duration::from_secs(2),
            picker_settle: Duration::from_millis(1500),
        }
    }
}

impl WebDriverSettings {
    pub fn channel_url(&self) -> String {
        format!(
            "https://discord.com/channels/{}/{}",
            self.server_id, self.channel_id
        )
    }

    fn voice_channel_selector(&self) -> String {
        format!(
            r#"a[data-list-item-id="channels___{}"]"#,
            self.channel_id
        )
    }

    /// New-session request body: Firefox, persistent profile, media
    /// permission prompts disabled.
    pub fn capabilities(&self) -> Value {
        let profile = std::path::absolute(&self.profile_path)
            .unwrap_or_else(|_| self.profile_path.clone());
        json!({
            "capabilities": {
                "alwaysMatch": {
                    "browserName": "firefox",
                    "moz:firefoxOptions": {
                        "args": ["-profile", profile.to_string_lossy()],
                        "prefs": {
                            "media.navigator.permission.disabled": true,
                            "media.navigator.streams.fake": false,
                            "dom.webdriver.enabled": false
                        }
                    }
                }
            }
        })
    }
}

// ── WebDriverSession ─────────────────────────────────────────────

/// [`SessionDriver`] backed by a WebDriver browser session.
pub struct WebDriverSession {
    http: Client,
    settings: WebDriverSettings,
    session_id: Option<String>,
}

impl WebDriverSession {
    pub fn new(settings: WebDriverSettings) -> Self {
        Self {
            http: Client::new(),
            settings,
            session_id: None,
        }
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    /// Send one command and unwrap the `value` envelope.
    async fn command(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> Result<Value, WebDriverError> {
        let url = format!("{}{path}", self.settings.endpoint);
        let mut request = self.http.request(method, &url);
        if let Some(body) = body {
            request = request.json(&body);
        }
        let resp = request.send().await?;
        let status = resp.status();
        let mut envelope: Value = resp.json().await?;
        let value = envelope
            .get_mut("value")
            .map(Value::take)
            .unwrap_or(Value::Null);

        if status.is_success() {
            Ok(value)
        } else {
            Err(WebDriverError::Command {
                status: status.as_u16(),
                error: value["error"].as_str().unwrap_or("unknown error").to_string(),
                message: value["message"].as_str().unwrap_or_default().to_string(),
            })
        }
    }

    fn session_path(&self, suffix: &str) -> Result<String, WebDriverError> {
        let id = self.session_id.as_deref().ok_or(WebDriverError::NoSession)?;
        Ok(format!("/session/{id}{suffix}"))
    }

    async fn open_channel(&self) -> Result<(), WebDriverError> {
        let url = self.settings.channel_url();
        debug!(%url, "navigating");
        self.command(
            Method::POST,
            &self.session_path("/url")?,
            Some(json!({ "url": url })),
        )
        .await?;
        self.wait_for(CHANNEL_LIST_SELECTOR).await?;
        Ok(())
    }

    /// First element matching `selector`, if any.
    async fn find(&self, selector: &str) -> Result<Option<String>, WebDriverError> {
        let found = self
            .command(
                Method::POST,
                &self.session_path("/element")?,
                Some(json!({ "using": "css selector", "value": selector })),
            )
            .await;
        match found {
            Ok(value) => element_id(&value).map(Some),
            Err(e) if e.is_no_such_element() => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn find_all(&self, selector: &str) -> Result<Vec<String>, WebDriverError> {
        let value = self
            .command(
                Method::POST,
                &self.session_path("/elements")?,
                Some(json!({ "using": "css selector", "value": selector })),
            )
            .await?;
        value
            .as_array()
            .ok_or_else(|| WebDriverError::Malformed("expected element array".into()))?
            .iter()
            .map(element_id)
            .collect()
    }

    /// Poll for `selector` until the element wait expires.
    async fn wait_for(&self, selector: &str) -> Result<String, WebDriverError> {
        let after = self.settings.element_wait;
        let deadline = Instant::now() + after;
        loop {
            if let Some(id) = self.find(selector).await? {
                return Ok(id);
            }
            if Instant::now() >= deadline {
                return Err(WebDriverError::ElementTimeout {
                    selector: selector.to_string(),
                    after,
                });
            }
            tokio::time::sleep(self.settings.poll_interval).await;
        }
    }

    async fn click(&self, element: &str) -> Result<(), WebDriverError> {
        self.command(
            Method::POST,
            &self.session_path(&format!("/element/{element}/click"))?,
            Some(json!({})),
        )
        .await?;
        Ok(())
    }

    /// Click `selector` if it is on the page right now.
    async fn click_if_present(&self, selector: &str) -> Result<bool, WebDriverError> {
        match self.find(selector).await? {
            Some(element) => {
                self.click(&element).await?;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

fn element_id(value: &Value) -> Result<String, WebDriverError> {
    value[ELEMENT_KEY]
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| WebDriverError::Malformed(format!("not an element reference: {value}")))
}

#[async_trait]
impl SessionDriver for WebDriverSession {
    async fn prepare(&mut self) -> discarr_core::Result<()> {
        if self.session_id.is_none() {
            let created = self
                .command(Method::POST, "/session", Some(self.settings.capabilities()))
                .await?;
            let id = created["sessionId"]
                .as_str()
                .ok_or_else(|| WebDriverError::Malformed("missing sessionId".into()))?;
            info!(session = id, "browser session created");
            self.session_id = Some(id.to_string());
        }
        self.open_channel().await?;
        Ok(())
    }

    async fn navigate_back(&mut self) -> discarr_core::Result<()> {
        if self.session_id.is_none() {
            return self.prepare().await;
        }
        self.open_channel().await?;
        Ok(())
    }

    async fn join_presentation_context(&mut self) -> discarr_core::Result<()> {
        let channel = self.wait_for(&self.settings.voice_channel_selector()).await?;
        self.click(&channel).await?;
        tokio::time::sleep(self.settings.join_settle).await;
        info!(channel = %self.settings.channel_id, "joined voice channel");
        Ok(())
    }

    async fn start_presenting(&mut self) -> discarr_core::Result<()> {
        let share = self.wait_for(SHARE_SELECTOR).await?;
        self.click(&share).await?;

        // Some setups pick the source automatically.
        tokio::time::sleep(self.settings.picker_settle).await;
        if let Some(source) = self.find_all(SOURCE_SELECTOR).await?.first() {
            self.click(source).await?;
        }
        Ok(())
    }

    async fn stop_presenting(&mut self) -> discarr_core::Result<()> {
        if !self.click_if_present(STOP_SELECTOR).await? {
            debug!("no stop-sharing control; already stopped");
        }
        Ok(())
    }

    async fn leave_context(&mut self) -> discarr_core::Result<()> {
        if self.session_id.is_none() {
            return Ok(());
        }
        self.stop_presenting().await?;
        self.click_if_present(DISCONNECT_SELECTOR).await?;
        Ok(())
    }

    async fn shutdown(&mut self) -> discarr_core::Result<()> {
        if self.session_id.is_none() {
            return Ok(());
        }
        let path = self.session_path("")?;
        self.session_id = None;
        self.command(Method::DELETE, &path, None).await?;
        info!("browser session closed");
        Ok(())
    }
}

// ── Tests ────────────────────────────────────────────────────────
