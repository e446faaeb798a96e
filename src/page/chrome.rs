use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use headless_chrome::protocol::cdp::Target;
use headless_chrome::util::Timeout as WaitTimeout;
use headless_chrome::{Browser, LaunchOptions, Tab};
use serde::Deserialize;
use serde_json::Value;
use tokio::time::Instant;
use tracing::debug;

use super::{ElementSnapshot, PageHandle, PageQuery};
use crate::config::ScraperConfig;
use crate::scraper::{BrowserDriver, BrowsingContext};
use crate::utils::error::PageError;

const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Launches one headless Chrome and hands out a fresh incognito context per product.
pub struct ChromeDriver {
    browser: Browser,
}

impl ChromeDriver {
    pub fn launch(config: &ScraperConfig) -> Result<Self, PageError> {
        let mut launch_options = LaunchOptions::default_builder()
            .headless(config.headless)
            .sandbox(false) // Often needed in containerized environments
            .idle_browser_timeout(Duration::from_secs(600))
            .args(vec![
                std::ffi::OsStr::new("--no-sandbox"),
                std::ffi::OsStr::new("--disable-setuid-sandbox"),
                std::ffi::OsStr::new("--disable-dev-shm-usage"),
                std::ffi::OsStr::new("--disable-gpu"),
                std::ffi::OsStr::new("--disable-extensions"),
            ])
            .build()
            .map_err(|e| PageError::Browser(format!("Failed to create launch options: {}", e)))?;

        if let Some(chrome_path) = &config.chrome_path {
            launch_options.path = Some(std::path::PathBuf::from(chrome_path));
        }

        let browser = Browser::new(launch_options)
            .map_err(|e| PageError::Browser(format!("Failed to launch browser: {}", e)))?;

        Ok(Self { browser })
    }
}

#[async_trait]
impl BrowserDriver for ChromeDriver {
    async fn open_context(&self) -> Result<Box<dyn BrowsingContext>, PageError> {
        let context = self
            .browser
            .new_context()
            .map_err(|e| PageError::Browser(format!("Failed to create browser context: {}", e)))?;
        let tab = context
            .new_tab()
            .map_err(|e| PageError::Browser(format!("Failed to create tab: {}", e)))?;

        Ok(Box::new(ChromeContext {
            browser: self.browser.clone(),
            context_id: context.get_id().to_string(),
            tab,
        }))
    }
}

/// One tab inside its own browser context. Closing disposes of both.
pub struct ChromeContext {
    browser: Browser,
    context_id: String,
    tab: Arc<Tab>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum QueryResponse {
    Elements(Vec<ElementSnapshot>),
    Failed { error: String },
}

impl ChromeContext {
    /// Runs `script`, which must evaluate to a string, and returns that string.
    fn evaluate_string(&self, script: &str) -> Result<Option<String>, PageError> {
        let result = self
            .tab
            .evaluate(script, false)
            .map_err(|e| PageError::Evaluation(e.to_string()))?;

        Ok(result.value.and_then(|v| v.as_str().map(str::to_string)))
    }

    fn select_all(&self, selector: &str) -> Result<Vec<ElementSnapshot>, PageError> {
        let literal = serde_json::to_string(selector)
            .map_err(|e| PageError::Evaluation(e.to_string()))?;

        // Results come back through JSON.stringify so they arrive by value.
        let script = format!(
            r#"
            (function() {{
                try {{
                    const order = new Map();
                    Array.from(document.getElementsByTagName('*')).forEach((el, i) => order.set(el, i));
                    const matches = Array.from(document.querySelectorAll({literal}));
                    return JSON.stringify(matches.map(el => ({{
                        node: order.get(el),
                        tag: el.tagName.toLowerCase(),
                        text: el.textContent || '',
                        attributes: Object.fromEntries(Array.from(el.attributes).map(a => [a.name, a.value]))
                    }})));
                }} catch (e) {{
                    return JSON.stringify({{ error: e.message }});
                }}
            }})()
            "#
        );

        let raw = self.evaluate_string(&script)?.unwrap_or_else(|| "[]".to_string());
        let response: QueryResponse = serde_json::from_str(&raw)
            .map_err(|e| PageError::Evaluation(format!("Failed to parse query result: {}", e)))?;

        match response {
            QueryResponse::Elements(elements) => Ok(elements),
            QueryResponse::Failed { error } => Err(PageError::InvalidSelector {
                selector: selector.to_string(),
                message: error,
            }),
        }
    }

    fn query_script(query: &PageQuery) -> String {
        match query {
            PageQuery::DocumentTitle => "document.title || null".to_string(),
            PageQuery::LocationHref => "window.location.href".to_string(),
            PageQuery::LargestImage {
                min_width,
                min_height,
            } => format!(
                r#"
                (function() {{
                    const images = Array.from(document.querySelectorAll('img'))
                        .filter(img => img.src && img.width > {min_width} && img.height > {min_height})
                        .sort((a, b) => (b.width * b.height) - (a.width * a.height));
                    return images.length > 0 ? images[0].src : null;
                }})()
                "#
            ),
        }
    }
}

#[async_trait]
impl PageHandle for ChromeContext {
    async fn query_selector(&self, selector: &str) -> Result<Option<ElementSnapshot>, PageError> {
        Ok(self.select_all(selector)?.into_iter().next())
    }

    async fn query_selector_all(&self, selector: &str) -> Result<Vec<ElementSnapshot>, PageError> {
        self.select_all(selector)
    }

    async fn wait_for_selector(&self, selector: &str, timeout: Duration) -> Result<(), PageError> {
        self.tab
            .wait_for_element_with_custom_timeout(selector, timeout)
            .map(|_| ())
            .map_err(|e| wait_error(&e, selector, timeout))
    }

    async fn evaluate(&self, query: &PageQuery) -> Result<Value, PageError> {
        let result = self
            .tab
            .evaluate(&Self::query_script(query), false)
            .map_err(|e| PageError::Evaluation(e.to_string()))?;
        Ok(result.value.unwrap_or(Value::Null))
    }
}

#[async_trait]
impl BrowsingContext for ChromeContext {
    async fn set_user_agent(&self, user_agent: &str) -> Result<(), PageError> {
        self.tab
            .set_user_agent(user_agent, None, None)
            .map_err(|e| PageError::Browser(format!("Failed to set user agent: {}", e)))
    }

    async fn navigate(&self, url: &str, timeout: Duration) -> Result<(), PageError> {
        self.tab
            .navigate_to(url)
            .map_err(|e| PageError::Navigation(e.to_string()))?;

        // DOMContentLoaded is enough; waiting for network idle stalls on ad and analytics beacons.
        // The execution context is replaced while the new document commits, so
        // evaluation errors only count once the deadline has passed.
        let deadline = Instant::now() + timeout;
        let mut last_error = None;
        loop {
            match self.evaluate_string(READY_STATE_SCRIPT) {
                Ok(state) if is_ready(state.as_deref()) => return Ok(()),
                Ok(_) => last_error = None,
                Err(e) => {
                    debug!("Ready state not readable yet for {}: {}", url, e);
                    last_error = Some(e);
                }
            }
            if Instant::now() >= deadline {
                return Err(navigation_deadline_error(last_error, timeout));
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    async fn close(self: Box<Self>) -> Result<(), PageError> {
        let tab_result = self
            .tab
            .close(true)
            .map(|_| ())
            .map_err(|e| PageError::Browser(format!("Failed to close tab: {}", e)));

        let dispose_result = self
            .browser
            .call_method(Target::DisposeBrowserContext {
                browser_context_id: self.context_id.clone(),
            })
            .map(|_| ())
            .map_err(|e| PageError::Browser(format!("Failed to dispose browser context {}: {}", self.context_id, e)));

        tab_result.and(dispose_result)
    }
}

const READY_STATE_SCRIPT: &str = "window.location.href !== 'about:blank' ? document.readyState : 'loading'";

fn is_ready(state: Option<&str>) -> bool {
    matches!(state, Some("interactive") | Some("complete"))
}

/// Only an expired wait is a timeout. A crashed tab or a dropped connection
/// is a browser failure.
fn wait_error(error: &anyhow::Error, selector: &str, timeout: Duration) -> PageError {
    if error.downcast_ref::<WaitTimeout>().is_some() {
        PageError::Timeout {
            selector: selector.to_string(),
            timeout,
        }
    } else {
        PageError::Browser(format!("Failed waiting for {}: {}", selector, error))
    }
}

/// Error for a navigation that never became ready: the last evaluation
/// failure if the page stayed unreadable, otherwise a timeout.
fn navigation_deadline_error(last_error: Option<PageError>, timeout: Duration) -> PageError {
    match last_error {
        Some(e) => PageError::Navigation(format!("Page never became readable: {}", e)),
        None => PageError::Timeout {
            selector: "document.readyState".to_string(),
            timeout,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_response_parses_elements() {
        let raw = r#"[{"node":4,"tag":"span","text":"$19.99","attributes":{"class":"price"}}]"#;
        let response: QueryResponse = serde_json::from_str(raw).unwrap();
        match response {
            QueryResponse::Elements(elements) => {
                assert_eq!(elements.len(), 1);
                assert_eq!(elements[0].class_name(), "price");
            }
            QueryResponse::Failed { .. } => panic!("expected elements"),
        }
    }

    #[test]
    fn test_query_response_parses_selector_error() {
        let raw = r#"{"error":"'div >' is not a valid selector"}"#;
        let response: QueryResponse = serde_json::from_str(raw).unwrap();
        assert!(matches!(response, QueryResponse::Failed { .. }));
    }

    #[test]
    fn test_wait_error_separates_timeouts_from_browser_failures() {
        let timeout = Duration::from_secs(10);

        let expired = wait_error(&anyhow::Error::new(WaitTimeout), "body", timeout);
        assert!(matches!(expired, PageError::Timeout { ref selector, .. } if selector == "body"));

        let closed = anyhow::anyhow!("Unable to make method calls because underlying connection is closed");
        let crashed = wait_error(&closed, "body", timeout);
        assert!(matches!(crashed, PageError::Browser(ref m) if m.contains("connection is closed")));
    }

    #[test]
    fn test_ready_states() {
        assert!(is_ready(Some("interactive")));
        assert!(is_ready(Some("complete")));
        assert!(!is_ready(Some("loading")));
        assert!(!is_ready(None));
    }

    #[test]
    fn test_navigation_deadline_error_prefers_last_failure() {
        let timeout = Duration::from_secs(15);

        let unreadable = navigation_deadline_error(
            Some(PageError::Evaluation("Cannot find default execution context".to_string())),
            timeout,
        );
        assert!(matches!(unreadable, PageError::Navigation(ref m) if m.contains("execution context")));

        let loading = navigation_deadline_error(None, timeout);
        assert!(matches!(loading, PageError::Timeout { .. }));
    }

    #[test]
    fn test_largest_image_script_embeds_bounds() {
        let script = ChromeContext::query_script(&PageQuery::LargestImage {
            min_width: 200,
            min_height: 150,
        });
        assert!(script.contains("img.width > 200"));
        assert!(script.contains("img.height > 150"));
    }
}
