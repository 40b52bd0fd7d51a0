use thiserror::Error;

#[derive(Debug, Error)]
pub enum CrawlerError {
    #[error("failed to launch browser: {0}")]
    BrowserLaunch(String),

    #[error("failed to reach remote browser at {url}: {reason}")]
    RemoteBrowser { url: String, reason: String },

    #[error("browser context not initialized; launch the session first")]
    SessionNotInitialized,

    #[error("navigation to {url} failed: {reason}")]
    Navigation { url: String, reason: String },

    #[error("navigation to {url} timed out after {timeout_secs}s")]
    NavigationTimeout { url: String, timeout_secs: u64 },

    #[error("timed out after {timeout_ms}ms waiting for {what}")]
    WaitTimeout { what: String, timeout_ms: u64 },

    #[error("in-page script failed: {0}")]
    Script(String),

    #[error("unexpected script result for {context}: {source}")]
    ScriptResult {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("browser protocol error: {0}")]
    Cdp(#[from] chromiumoxide::error::CdpError),

    #[error("unknown site \"{0}\"")]
    UnknownSite(String),
}

impl CrawlerError {
    /// `true` for bounded waits that callers may treat as "proceed anyway".
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            CrawlerError::WaitTimeout { .. } | CrawlerError::NavigationTimeout { .. }
        )
    }
}
