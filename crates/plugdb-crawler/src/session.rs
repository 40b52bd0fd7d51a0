//! Browser session lifecycle: one browser, one isolated context, pages on
//! demand, torn down in reverse order.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::cdp::browser_protocol::browser::BrowserContextId;
use chromiumoxide::cdp::browser_protocol::network::SetUserAgentOverrideParams;
use chromiumoxide::cdp::browser_protocol::target::{
    CreateBrowserContextParams, CreateTargetParams,
};
use chromiumoxide::handler::HandlerConfig;
use chromiumoxide::{Browser, BrowserConfig};
use futures::StreamExt;
use plugdb_core::CrawlerSettings;
use tokio::task::JoinHandle;

use crate::error::CrawlerError;
use crate::pacing::random_user_agent;
use crate::page::{ChromePage, PageDriver};

/// Install locations searched when no executable is configured.
const CHROME_PATHS: &[&str] = &[
    "/usr/bin/chromium",
    "/usr/bin/chromium-browser",
    "/usr/bin/google-chrome",
    "/usr/bin/google-chrome-stable",
    "/snap/bin/chromium",
    "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
    "/Applications/Chromium.app/Contents/MacOS/Chromium",
];

const CHROME_COMMANDS: &[&str] = &[
    "chromium",
    "chromium-browser",
    "google-chrome",
    "google-chrome-stable",
];

/// Something that hands out pages and can be shut down.
///
/// The orchestrator is written against this trait so session teardown can be
/// verified without a real browser.
#[async_trait]
pub trait PageSource: Send + Sync {
    type Page: PageDriver;

    async fn new_page(&self) -> Result<Self::Page, CrawlerError>;

    /// Releases every resource. Must be safe to call more than once.
    async fn close(&mut self);
}

/// A headless browser with a single isolated context.
///
/// The identity (user agent) is chosen once at launch and applied to every
/// page opened from the session.
pub struct BrowserSession {
    browser: Option<Browser>,
    context_id: Option<BrowserContextId>,
    handler: Option<JoinHandle<()>>,
    user_agent: &'static str,
    remote: bool,
}

impl BrowserSession {
    /// Launches a local Chromium, or connects to `settings.browser_ws_url`
    /// when set, then opens an isolated browser context.
    ///
    /// # Errors
    ///
    /// Returns [`CrawlerError::BrowserLaunch`] or [`CrawlerError::RemoteBrowser`]
    /// when no browser can be obtained. A crawl cannot proceed past this.
    pub async fn launch(settings: &CrawlerSettings) -> Result<Self, CrawlerError> {
        let (mut browser, handler, remote) = match settings.browser_ws_url.as_deref() {
            Some(url) => {
                let (browser, handler) = connect_remote(url, settings).await?;
                (browser, handler, true)
            }
            None => {
                let (browser, handler) = launch_local(settings).await?;
                (browser, handler, false)
            }
        };

        let context_id = match browser
            .create_browser_context(CreateBrowserContextParams::default())
            .await
        {
            Ok(id) => id,
            Err(e) => {
                if !remote {
                    let _ = browser.close().await;
                }
                handler.abort();
                return Err(CrawlerError::BrowserLaunch(format!(
                    "could not create browser context: {e}"
                )));
            }
        };

        let user_agent = random_user_agent();
        tracing::info!(remote, user_agent, "browser session ready");

        Ok(Self {
            browser: Some(browser),
            context_id: Some(context_id),
            handler: Some(handler),
            user_agent,
            remote,
        })
    }

    #[must_use]
    pub fn is_open(&self) -> bool {
        self.browser.is_some() && self.context_id.is_some()
    }
}

#[async_trait]
impl PageSource for BrowserSession {
    type Page = ChromePage;

    async fn new_page(&self) -> Result<ChromePage, CrawlerError> {
        let (Some(browser), Some(context_id)) = (self.browser.as_ref(), self.context_id.as_ref())
        else {
            return Err(CrawlerError::SessionNotInitialized);
        };

        let params = CreateTargetParams::builder()
            .url("about:blank")
            .browser_context_id(context_id.clone())
            .build()
            .map_err(CrawlerError::Script)?;
        let page = browser.new_page(params).await?;
        page.execute(SetUserAgentOverrideParams::new(self.user_agent.to_string()))
            .await?;

        Ok(ChromePage::new(page))
    }

    async fn close(&mut self) {
        if let Some(context_id) = self.context_id.take() {
            if let Some(browser) = self.browser.as_mut() {
                if let Err(e) = browser.dispose_browser_context(context_id).await {
                    tracing::warn!(error = %e, "failed to dispose browser context");
                }
            }
        }

        if let Some(mut browser) = self.browser.take() {
            // a remote browser belongs to someone else; only our context goes away
            if !self.remote {
                if let Err(e) = browser.close().await {
                    tracing::warn!(error = %e, "failed to close browser");
                }
                if let Err(e) = browser.wait().await {
                    tracing::debug!(error = %e, "browser process did not exit cleanly");
                }
            }
        }

        if let Some(handler) = self.handler.take() {
            handler.abort();
        }

        tracing::debug!("browser session closed");
    }
}

async fn launch_local(
    settings: &CrawlerSettings,
) -> Result<(Browser, JoinHandle<()>), CrawlerError> {
    let chrome_path = find_chrome_executable(settings.chrome_path.as_ref())?;
    tracing::info!(
        path = %chrome_path.display(),
        headless = settings.headless,
        "launching browser"
    );

    let mut builder = BrowserConfig::builder()
        .chrome_executable(chrome_path)
        .request_timeout(Duration::from_secs(settings.navigation_timeout_secs));
    if !settings.headless {
        builder = builder.with_head();
    }
    builder = builder
        .arg("--disable-blink-features=AutomationControlled")
        .arg("--disable-infobars")
        .arg("--disable-dev-shm-usage")
        .arg("--no-first-run")
        .arg("--no-default-browser-check")
        .arg("--no-sandbox")
        .arg("--disable-gpu");

    let config = builder.build().map_err(CrawlerError::BrowserLaunch)?;
    let (browser, mut handler) = Browser::launch(config)
        .await
        .map_err(|e| CrawlerError::BrowserLaunch(e.to_string()))?;

    let task = tokio::spawn(async move {
        while let Some(event) = handler.next().await {
            if event.is_err() {
                break;
            }
        }
    });

    Ok((browser, task))
}

async fn connect_remote(
    url: &str,
    settings: &CrawlerSettings,
) -> Result<(Browser, JoinHandle<()>), CrawlerError> {
    let ws_url = resolve_ws_url(url).await?;
    tracing::info!(ws_url = %ws_url, "connecting to remote browser");

    let handler_config = HandlerConfig {
        request_timeout: Duration::from_secs(settings.navigation_timeout_secs),
        ..Default::default()
    };
    let (browser, mut handler) = Browser::connect_with_config(ws_url.as_str(), handler_config)
        .await
        .map_err(|e| CrawlerError::RemoteBrowser {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    let task = tokio::spawn(async move {
        while let Some(event) = handler.next().await {
            if event.is_err() {
                break;
            }
        }
    });

    Ok((browser, task))
}

/// Resolves the DevTools websocket for a remote browser.
///
/// A `ws://…/devtools/browser/…` URL is used as-is; anything else is treated
/// as the HTTP debugging endpoint and asked for `webSocketDebuggerUrl` via
/// `/json/version`.
///
/// # Errors
///
/// Returns [`CrawlerError::RemoteBrowser`] if the endpoint is unreachable or
/// does not advertise a websocket URL.
pub async fn resolve_ws_url(url: &str) -> Result<String, CrawlerError> {
    if (url.starts_with("ws://") || url.starts_with("wss://")) && url.contains("/devtools/") {
        return Ok(url.to_string());
    }

    let remote_err = |reason: String| CrawlerError::RemoteBrowser {
        url: url.to_string(),
        reason,
    };

    let http_url = url
        .replacen("ws://", "http://", 1)
        .replacen("wss://", "https://", 1);
    let version_url = format!("{}/json/version", http_url.trim_end_matches('/'));

    let response = reqwest::Client::new()
        .get(&version_url)
        .send()
        .await
        .map_err(|e| remote_err(e.to_string()))?;
    if !response.status().is_success() {
        return Err(remote_err(format!(
            "{version_url} returned {}",
            response.status()
        )));
    }

    let body: serde_json::Value = response
        .json()
        .await
        .map_err(|e| remote_err(format!("invalid version payload: {e}")))?;

    body.get("webSocketDebuggerUrl")
        .and_then(serde_json::Value::as_str)
        .map(str::to_owned)
        .ok_or_else(|| remote_err("no webSocketDebuggerUrl in /json/version".to_string()))
}

/// Finds a Chrome/Chromium binary: the configured path first, then common
/// install locations, then `PATH`.
///
/// # Errors
///
/// Returns [`CrawlerError::BrowserLaunch`] if nothing usable is found.
pub fn find_chrome_executable(configured: Option<&PathBuf>) -> Result<PathBuf, CrawlerError> {
    if let Some(path) = configured {
        if path.exists() {
            return Ok(path.clone());
        }
        return Err(CrawlerError::BrowserLaunch(format!(
            "configured browser executable {} does not exist",
            path.display()
        )));
    }

    if let Some(found) = CHROME_PATHS
        .iter()
        .map(PathBuf::from)
        .find(|p| p.exists())
    {
        return Ok(found);
    }

    for cmd in CHROME_COMMANDS {
        if let Ok(output) = std::process::Command::new("which").arg(cmd).output() {
            if output.status.success() {
                let path = String::from_utf8_lossy(&output.stdout).trim().to_string();
                if !path.is_empty() {
                    return Ok(PathBuf::from(path));
                }
            }
        }
    }

    Err(CrawlerError::BrowserLaunch(
        "Chrome/Chromium not found; install it or set PLUGDB_CHROME_PATH".to_string(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn closed_session() -> BrowserSession {
        BrowserSession {
            browser: None,
            context_id: None,
            handler: None,
            user_agent: random_user_agent(),
            remote: false,
        }
    }

    #[tokio::test]
    async fn new_page_without_context_is_rejected() {
        let session = closed_session();
        assert!(!session.is_open());
        let result = session.new_page().await;
        assert!(matches!(result, Err(CrawlerError::SessionNotInitialized)));
    }

    #[tokio::test]
    async fn close_is_idempotent_on_empty_session() {
        let mut session = closed_session();
        session.close().await;
        session.close().await;
        assert!(!session.is_open());
    }

    #[tokio::test]
    async fn resolve_ws_url_reads_version_endpoint() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/json/version"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "Browser": "HeadlessChrome/120.0.6099.109",
                "webSocketDebuggerUrl": "ws://127.0.0.1:9222/devtools/browser/5f3a"
            })))
            .mount(&server)
            .await;

        let ws = resolve_ws_url(&server.uri()).await.unwrap();
        assert_eq!(ws, "ws://127.0.0.1:9222/devtools/browser/5f3a");
    }

    #[tokio::test]
    async fn resolve_ws_url_without_debugger_field_fails() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/json/version"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "Browser": "HeadlessChrome/120.0.6099.109"
            })))
            .mount(&server)
            .await;

        let err = resolve_ws_url(&server.uri()).await.unwrap_err();
        assert!(matches!(err, CrawlerError::RemoteBrowser { .. }));
    }

    #[tokio::test]
    async fn resolve_ws_url_non_success_status_fails() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/json/version"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let err = resolve_ws_url(&server.uri()).await.unwrap_err();
        assert!(
            matches!(err, CrawlerError::RemoteBrowser { ref reason, .. } if reason.contains("503")),
            "unexpected error: {err}"
        );
    }

    #[tokio::test]
    async fn resolve_ws_url_passes_devtools_socket_through() {
        let ws = resolve_ws_url("ws://10.0.0.5:9222/devtools/browser/abc")
            .await
            .unwrap();
        assert_eq!(ws, "ws://10.0.0.5:9222/devtools/browser/abc");
    }

    #[test]
    fn find_chrome_rejects_missing_configured_path() {
        let missing = PathBuf::from("/nonexistent/plugdb/chrome");
        let err = find_chrome_executable(Some(&missing)).unwrap_err();
        assert!(matches!(err, CrawlerError::BrowserLaunch(ref m) if m.contains("does not exist")));
    }
}
