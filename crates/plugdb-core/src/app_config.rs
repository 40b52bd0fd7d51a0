use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

/// A database role and its secret, parsed from a `role:secret` value.
///
/// The restricted (anonymous) credential is used for catalog reads; the
/// elevated (service) credential bypasses row-level security and is used only
/// for crawler writes.
#[derive(Clone, PartialEq, Eq)]
pub struct StoreCredential {
    pub role: String,
    pub secret: String,
}

impl std::fmt::Debug for StoreCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreCredential")
            .field("role", &self.role)
            .field("secret", &"[redacted]")
            .finish()
    }
}

/// Browser and pacing settings shared by every crawl.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlerSettings {
    pub headless: bool,
    /// Explicit Chrome/Chromium executable; discovered when `None`.
    pub chrome_path: Option<PathBuf>,
    /// DevTools endpoint of an already-running browser. When set the crawler
    /// connects instead of launching.
    pub browser_ws_url: Option<String>,
    pub navigation_timeout_secs: u64,
    pub selector_timeout_secs: u64,
    pub max_page_errors: usize,
    pub max_scrolls: usize,
    pub min_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for CrawlerSettings {
    fn default() -> Self {
        Self {
            headless: true,
            chrome_path: None,
            browser_ws_url: None,
            navigation_timeout_secs: 30,
            selector_timeout_secs: 10,
            max_page_errors: 3,
            max_scrolls: 50,
            min_delay_ms: 1500,
            max_delay_ms: 3000,
        }
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub env: Environment,
    pub log_level: String,
    pub anon_credential: Option<StoreCredential>,
    pub service_credential: Option<StoreCredential>,
    pub db_max_connections: u32,
    pub db_min_connections: u32,
    pub db_acquire_timeout_secs: u64,
    pub crawler: CrawlerSettings,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("log_level", &self.log_level)
            .field("database_url", &"[redacted]")
            .field("anon_credential", &self.anon_credential)
            .field("service_credential", &self.service_credential)
            .field("db_max_connections", &self.db_max_connections)
            .field("db_min_connections", &self.db_min_connections)
            .field("db_acquire_timeout_secs", &self.db_acquire_timeout_secs)
            .field("crawler", &self.crawler)
            .finish()
    }
}
