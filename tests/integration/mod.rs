// Shared fixtures for the integration tests.
//
// `FixtureDriver` stands in for headless Chrome: every context it opens
// serves a canned response for the requested URL, so scrapes and check
// cycles run end to end without a browser or network.

pub mod extraction_tests;
pub mod monitor_tests;
pub mod scraper_tests;

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use pricedrop_watcher::page::{ElementSnapshot, PageHandle, PageQuery, StaticDocument};
use pricedrop_watcher::plugins::{NotificationResult, NotifierPlugin, PriceDropEvent};
use pricedrop_watcher::{AppConfig, BrowserDriver, BrowsingContext, PageError};

/// What the fixture browser does when asked to load a URL.
#[derive(Debug, Clone)]
pub enum FixtureResponse {
    Page(String),
    NavigationFailure(String),
    /// Navigation succeeds but the document root never appears.
    Stalled,
}

pub fn page(html: &str) -> FixtureResponse {
    FixtureResponse::Page(html.to_string())
}

/// Per-URL response queues. The last response for a URL repeats once the
/// queue is exhausted.
#[derive(Clone, Default)]
pub struct FixtureDriver {
    responses: Arc<Mutex<HashMap<String, Vec<FixtureResponse>>>>,
    navigations: Arc<Mutex<HashMap<String, usize>>>,
    pub opened: Arc<AtomicUsize>,
    pub closed: Arc<AtomicUsize>,
}

impl FixtureDriver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn serve(self, url: &str, responses: Vec<FixtureResponse>) -> Self {
        self.responses
            .lock()
            .unwrap()
            .insert(url.to_string(), responses);
        self
    }

    pub fn navigations(&self, url: &str) -> usize {
        self.navigations.lock().unwrap().get(url).copied().unwrap_or(0)
    }

    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    pub fn closed(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }

    fn respond(&self, url: &str) -> FixtureResponse {
        let mut navigations = self.navigations.lock().unwrap();
        let count = navigations.entry(url.to_string()).or_insert(0);
        let index = *count;
        *count += 1;

        let responses = self.responses.lock().unwrap();
        match responses.get(url) {
            Some(queue) if !queue.is_empty() => queue[index.min(queue.len() - 1)].clone(),
            _ => FixtureResponse::NavigationFailure(format!("net::ERR_NAME_NOT_RESOLVED at {}", url)),
        }
    }
}

#[async_trait]
impl BrowserDriver for FixtureDriver {
    async fn open_context(&self) -> Result<Box<dyn BrowsingContext>, PageError> {
        self.opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FixtureContext {
            driver: self.clone(),
            state: Mutex::new(None),
        }))
    }
}

pub struct FixtureContext {
    driver: FixtureDriver,
    state: Mutex<Option<(String, FixtureResponse)>>,
}

impl FixtureContext {
    fn document(&self) -> Result<(StaticDocument, bool), PageError> {
        let state = self.state.lock().unwrap();
        match state.as_ref() {
            Some((url, FixtureResponse::Page(html))) => Ok((StaticDocument::new(url.clone(), html.clone()), false)),
            Some((url, FixtureResponse::Stalled)) => Ok((StaticDocument::new(url.clone(), ""), true)),
            _ => Err(PageError::Browser("No document loaded".to_string())),
        }
    }
}

#[async_trait]
impl PageHandle for FixtureContext {
    async fn query_selector(&self, selector: &str) -> Result<Option<ElementSnapshot>, PageError> {
        let (document, _) = self.document()?;
        document.query_selector(selector).await
    }

    async fn query_selector_all(&self, selector: &str) -> Result<Vec<ElementSnapshot>, PageError> {
        let (document, _) = self.document()?;
        document.query_selector_all(selector).await
    }

    async fn wait_for_selector(&self, selector: &str, timeout: Duration) -> Result<(), PageError> {
        let (document, stalled) = self.document()?;
        if stalled {
            return Err(PageError::Timeout {
                selector: selector.to_string(),
                timeout,
            });
        }
        document.wait_for_selector(selector, timeout).await
    }

    async fn evaluate(&self, query: &PageQuery) -> Result<serde_json::Value, PageError> {
        let (document, _) = self.document()?;
        document.evaluate(query).await
    }
}

#[async_trait]
impl BrowsingContext for FixtureContext {
    async fn set_user_agent(&self, _user_agent: &str) -> Result<(), PageError> {
        Ok(())
    }

    async fn navigate(&self, url: &str, _timeout: Duration) -> Result<(), PageError> {
        match self.driver.respond(url) {
            FixtureResponse::NavigationFailure(message) => Err(PageError::Navigation(message)),
            response => {
                *self.state.lock().unwrap() = Some((url.to_string(), response));
                Ok(())
            }
        }
    }

    async fn close(self: Box<Self>) -> Result<(), PageError> {
        self.driver.closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Collects every event it is asked to deliver.
#[derive(Clone, Default)]
pub struct RecordingNotifier {
    pub events: Arc<Mutex<Vec<PriceDropEvent>>>,
    pub fail: bool,
}

impl RecordingNotifier {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn events(&self) -> Vec<PriceDropEvent> {
        self.events.lock().unwrap().clone()
    }
}

#[async_trait]
impl NotifierPlugin for RecordingNotifier {
    fn name(&self) -> &str {
        "Recording Notifier"
    }

    fn plugin_type(&self) -> &str {
        "recording"
    }

    async fn notify(&self, event: &PriceDropEvent) -> Result<NotificationResult, Box<dyn std::error::Error + Send + Sync>> {
        self.events.lock().unwrap().push(event.clone());
        if self.fail {
            return Err("mail server unavailable".into());
        }
        Ok(NotificationResult {
            success: true,
            message_id: Some(format!("recorded-{}", self.events.lock().unwrap().len())),
            error: None,
        })
    }
}

/// Defaults with every delay removed so tests run instantly.
pub fn test_config() -> AppConfig {
    let mut config = AppConfig::default();
    config.scraper.settle_delay_ms = 0;
    config.monitor.retry_delay_ms = 0;
    config.monitor.inter_product_delay_ms = 0;
    config
}
