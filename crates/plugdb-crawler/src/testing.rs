//! Scripted stand-ins for a browser, shared by the crate's unit tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::error::CrawlerError;
use crate::page::PageDriver;
use crate::session::PageSource;

/// A page whose answers are queued up front.
///
/// `count` pops the next queued count and repeats the last one once the queue
/// runs dry. `evaluate` pops the next queued extraction result and returns an
/// empty card list once the queue runs dry.
#[derive(Default)]
pub(crate) struct ScriptedPage {
    counts: Mutex<VecDeque<usize>>,
    last_count: Mutex<usize>,
    extractions: Mutex<VecDeque<Result<Value, String>>>,
    cards_missing: bool,
    pub visited: Mutex<Vec<String>>,
    pub visited_at: Mutex<Vec<tokio::time::Instant>>,
    pub scrolls: AtomicUsize,
    pub evaluations: AtomicUsize,
    pub closed: AtomicBool,
}

impl ScriptedPage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_counts(self, counts: &[usize]) -> Self {
        if let Ok(mut q) = self.counts.lock() {
            q.extend(counts.iter().copied());
        }
        self
    }

    pub fn with_extraction(self, cards: Value) -> Self {
        if let Ok(mut q) = self.extractions.lock() {
            q.push_back(Ok(cards));
        }
        self
    }

    pub fn with_failed_extraction(self, message: &str) -> Self {
        if let Ok(mut q) = self.extractions.lock() {
            q.push_back(Err(message.to_string()));
        }
        self
    }

    /// Every selector wait times out.
    pub fn without_cards(mut self) -> Self {
        self.cards_missing = true;
        self
    }

    pub fn visited(&self) -> Vec<String> {
        self.visited.lock().map(|v| v.clone()).unwrap_or_default()
    }

    pub fn visited_at(&self) -> Vec<tokio::time::Instant> {
        self.visited_at.lock().map(|v| v.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl PageDriver for ScriptedPage {
    async fn goto(&self, url: &str, _timeout: Duration) -> Result<(), CrawlerError> {
        self.visited.lock().unwrap().push(url.to_string());
        self.visited_at.lock().unwrap().push(tokio::time::Instant::now());
        Ok(())
    }

    async fn count(&self, _selector: &str) -> Result<usize, CrawlerError> {
        let mut last = self.last_count.lock().unwrap();
        if let Some(next) = self.counts.lock().unwrap().pop_front() {
            *last = next;
        }
        Ok(*last)
    }

    async fn wait_for_selector(
        &self,
        selector: &str,
        timeout: Duration,
    ) -> Result<(), CrawlerError> {
        if self.cards_missing {
            return Err(CrawlerError::WaitTimeout {
                what: selector.to_string(),
                timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
            });
        }
        Ok(())
    }

    async fn wait_for_hidden(
        &self,
        _selector: &str,
        _timeout: Duration,
    ) -> Result<(), CrawlerError> {
        Ok(())
    }

    async fn wait_for_network_idle(&self, timeout: Duration) -> Result<(), CrawlerError> {
        // pretend the page never fully quiets down
        Err(CrawlerError::WaitTimeout {
            what: "network idle".to_string(),
            timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
        })
    }

    async fn scroll_by_viewport(&self, _fraction: f64) -> Result<(), CrawlerError> {
        self.scrolls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn evaluate(&self, _script: &str) -> Result<Value, CrawlerError> {
        self.evaluations.fetch_add(1, Ordering::SeqCst);
        match self.extractions.lock().unwrap().pop_front() {
            Some(Ok(value)) => Ok(value),
            Some(Err(message)) => Err(CrawlerError::Script(message)),
            None => Ok(json!([])),
        }
    }

    async fn close(&self) -> Result<(), CrawlerError> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

/// Hands out queued pages and records whether it was shut down.
#[derive(Default)]
pub(crate) struct ScriptedSource {
    pages: Mutex<VecDeque<Arc<ScriptedPage>>>,
    pub closes: Arc<AtomicUsize>,
}

impl ScriptedSource {
    pub fn with_pages(pages: Vec<Arc<ScriptedPage>>) -> Self {
        Self {
            pages: Mutex::new(pages.into()),
            closes: Arc::new(AtomicUsize::new(0)),
        }
    }
}

#[async_trait]
impl PageDriver for Arc<ScriptedPage> {
    async fn goto(&self, url: &str, timeout: Duration) -> Result<(), CrawlerError> {
        self.as_ref().goto(url, timeout).await
    }

    async fn count(&self, selector: &str) -> Result<usize, CrawlerError> {
        self.as_ref().count(selector).await
    }

    async fn wait_for_selector(
        &self,
        selector: &str,
        timeout: Duration,
    ) -> Result<(), CrawlerError> {
        self.as_ref().wait_for_selector(selector, timeout).await
    }

    async fn wait_for_hidden(&self, selector: &str, timeout: Duration) -> Result<(), CrawlerError> {
        self.as_ref().wait_for_hidden(selector, timeout).await
    }

    async fn wait_for_network_idle(&self, timeout: Duration) -> Result<(), CrawlerError> {
        self.as_ref().wait_for_network_idle(timeout).await
    }

    async fn scroll_by_viewport(&self, fraction: f64) -> Result<(), CrawlerError> {
        self.as_ref().scroll_by_viewport(fraction).await
    }

    async fn evaluate(&self, script: &str) -> Result<Value, CrawlerError> {
        self.as_ref().evaluate(script).await
    }

    async fn close(&self) -> Result<(), CrawlerError> {
        self.as_ref().close().await
    }
}

#[async_trait]
impl PageSource for ScriptedSource {
    type Page = Arc<ScriptedPage>;

    async fn new_page(&self) -> Result<Self::Page, CrawlerError> {
        self.pages
            .lock()
            .unwrap()
            .pop_front()
            .ok_or(CrawlerError::SessionNotInitialized)
    }

    async fn close(&mut self) {
        self.closes.fetch_add(1, Ordering::SeqCst);
    }
}
