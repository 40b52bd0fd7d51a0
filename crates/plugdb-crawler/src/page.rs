//! The narrow slice of browser-page behaviour the crawler relies on.
//!
//! [`PageDriver`] is implemented by [`ChromePage`] for real crawls and by
//! scripted fakes in tests, so traversal and extraction logic never touch
//! `chromiumoxide` directly.

use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::cdp::js_protocol::runtime::EvaluateParams;
use chromiumoxide::Page;
use serde_json::Value;

use crate::error::CrawlerError;

const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Network activity is considered idle once the resource count holds still
/// for this long.
const NETWORK_QUIET_WINDOW: Duration = Duration::from_millis(500);

#[async_trait]
pub trait PageDriver: Send + Sync {
    /// Navigates to `url`, failing if the load does not finish within `timeout`.
    async fn goto(&self, url: &str, timeout: Duration) -> Result<(), CrawlerError>;

    /// Number of elements currently matching `selector`.
    async fn count(&self, selector: &str) -> Result<usize, CrawlerError>;

    /// Waits until at least one element matches `selector`.
    ///
    /// Returns [`CrawlerError::WaitTimeout`] when `timeout` elapses first.
    async fn wait_for_selector(&self, selector: &str, timeout: Duration)
        -> Result<(), CrawlerError>;

    /// Waits until no element matching `selector` is visible.
    async fn wait_for_hidden(&self, selector: &str, timeout: Duration) -> Result<(), CrawlerError>;

    /// Waits until the page stops requesting new resources.
    async fn wait_for_network_idle(&self, timeout: Duration) -> Result<(), CrawlerError>;

    /// Scrolls down by `fraction` of the viewport height, never past the end
    /// of the document.
    async fn scroll_by_viewport(&self, fraction: f64) -> Result<(), CrawlerError>;

    /// Evaluates a JavaScript expression and returns its JSON value.
    async fn evaluate(&self, script: &str) -> Result<Value, CrawlerError>;

    async fn close(&self) -> Result<(), CrawlerError>;
}

/// JSON-encodes a selector so it can be embedded in a script verbatim.
pub(crate) fn js_string(s: &str) -> String {
    serde_json::to_string(s).unwrap_or_else(|_| "\"\"".to_string())
}

/// A [`PageDriver`] backed by a Chromium tab.
pub struct ChromePage {
    page: Page,
}

impl ChromePage {
    #[must_use]
    pub fn new(page: Page) -> Self {
        Self { page }
    }

    async fn eval_bool(&self, script: &str) -> Result<bool, CrawlerError> {
        let value = self.evaluate(script).await?;
        Ok(value.as_bool().unwrap_or(false))
    }

    async fn resource_count(&self) -> Result<u64, CrawlerError> {
        let value = self
            .evaluate("performance.getEntriesByType('resource').length")
            .await?;
        Ok(value.as_u64().unwrap_or(0))
    }
}

#[async_trait]
impl PageDriver for ChromePage {
    async fn goto(&self, url: &str, timeout: Duration) -> Result<(), CrawlerError> {
        tracing::debug!(url, "navigating");
        match tokio::time::timeout(timeout, self.page.goto(url)).await {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(e)) => Err(CrawlerError::Navigation {
                url: url.to_string(),
                reason: e.to_string(),
            }),
            Err(_) => Err(CrawlerError::NavigationTimeout {
                url: url.to_string(),
                timeout_secs: timeout.as_secs(),
            }),
        }
    }

    async fn count(&self, selector: &str) -> Result<usize, CrawlerError> {
        let script = format!(
            "document.querySelectorAll({}).length",
            js_string(selector)
        );
        let value = self.evaluate(&script).await?;
        Ok(value
            .as_u64()
            .and_then(|n| usize::try_from(n).ok())
            .unwrap_or(0))
    }

    async fn wait_for_selector(
        &self,
        selector: &str,
        timeout: Duration,
    ) -> Result<(), CrawlerError> {
        let poll = async {
            loop {
                if self.count(selector).await? > 0 {
                    return Ok::<(), CrawlerError>(());
                }
                tokio::time::sleep(POLL_INTERVAL).await;
            }
        };
        tokio::time::timeout(timeout, poll)
            .await
            .map_err(|_| wait_timeout(format!("selector {selector}"), timeout))?
    }

    async fn wait_for_hidden(&self, selector: &str, timeout: Duration) -> Result<(), CrawlerError> {
        let script = format!(
            "Array.from(document.querySelectorAll({})).every((el) => {{ \
                const style = window.getComputedStyle(el); \
                return style.display === 'none' || style.visibility === 'hidden' \
                    || el.offsetParent === null; \
            }})",
            js_string(selector)
        );
        let poll = async {
            loop {
                if self.eval_bool(&script).await? {
                    return Ok::<(), CrawlerError>(());
                }
                tokio::time::sleep(POLL_INTERVAL).await;
            }
        };
        tokio::time::timeout(timeout, poll)
            .await
            .map_err(|_| wait_timeout(format!("{selector} to hide"), timeout))?
    }

    async fn wait_for_network_idle(&self, timeout: Duration) -> Result<(), CrawlerError> {
        let poll = async {
            let mut last = self.resource_count().await?;
            let mut quiet_for = Duration::ZERO;
            while quiet_for < NETWORK_QUIET_WINDOW {
                tokio::time::sleep(POLL_INTERVAL).await;
                let current = self.resource_count().await?;
                if current == last {
                    quiet_for += POLL_INTERVAL;
                } else {
                    quiet_for = Duration::ZERO;
                    last = current;
                }
            }
            Ok::<(), CrawlerError>(())
        };
        tokio::time::timeout(timeout, poll)
            .await
            .map_err(|_| wait_timeout("network idle".to_string(), timeout))?
    }

    async fn scroll_by_viewport(&self, fraction: f64) -> Result<(), CrawlerError> {
        let script = format!(
            "(() => {{ \
                const root = document.scrollingElement || document.documentElement; \
                const remaining = root.scrollHeight - root.clientHeight - root.scrollTop; \
                const step = Math.max(0, Math.min(root.clientHeight * {fraction}, remaining)); \
                window.scrollBy({{ top: step, behavior: 'smooth' }}); \
                return step; \
            }})()"
        );
        self.evaluate(&script).await.map(|_| ())
    }

    async fn evaluate(&self, script: &str) -> Result<Value, CrawlerError> {
        let params = EvaluateParams::builder()
            .expression(script)
            .await_promise(true)
            .return_by_value(true)
            .build()
            .map_err(CrawlerError::Script)?;
        let result = self.page.evaluate_expression(params).await?;
        if result.value().is_none() {
            return Ok(Value::Null);
        }
        result
            .into_value::<Value>()
            .map_err(|source| CrawlerError::ScriptResult {
                context: "evaluate".to_string(),
                source,
            })
    }

    async fn close(&self) -> Result<(), CrawlerError> {
        self.page.clone().close().await?;
        Ok(())
    }
}

fn wait_timeout(what: String, timeout: Duration) -> CrawlerError {
    CrawlerError::WaitTimeout {
        what,
        timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
    }
}
