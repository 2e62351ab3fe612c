//! `PageDriver` - Abstract Browser Automation Trait
//!
//! Every stage of a scenario talks to the browser through [`PageDriver`]
//! (one page context) and [`BrowserSession`] (the browser process that hands
//! out contexts). The CDP implementation lives in [`crate::browser`];
//! [`MockDriver`] and [`MockBrowser`] script page behaviour for unit tests.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │  BrowserSession (one per harness run)                        │
//! │    new_page() ──► PageDriver (one per scenario)              │
//! │                     set_viewport / emulate_device            │
//! │                     throttle_network / navigate              │
//! │                     evaluate / screenshot / close            │
//! └──────────────────────────────────────────────────────────────┘
//! ```

use crate::emulation::{DeviceDescriptor, NetworkProfile, Viewport};
use crate::result::{HarnessError, HarnessResult};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// Emulation features a driver can honour
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriverCapabilities {
    /// Bandwidth/latency throttling
    pub network_throttling: bool,
    /// User agent, pixel ratio and touch emulation
    pub device_emulation: bool,
}

impl DriverCapabilities {
    /// Everything supported
    #[must_use]
    pub const fn full() -> Self {
        Self {
            network_throttling: true,
            device_emulation: true,
        }
    }

    /// Viewport only
    #[must_use]
    pub const fn minimal() -> Self {
        Self {
            network_throttling: false,
            device_emulation: false,
        }
    }
}

impl Default for DriverCapabilities {
    fn default() -> Self {
        Self::full()
    }
}

/// One isolated page context
#[async_trait]
pub trait PageDriver: Send + Sync {
    /// Features this context supports
    fn capabilities(&self) -> DriverCapabilities;

    /// Resize the layout viewport
    async fn set_viewport(&mut self, viewport: Viewport) -> HarnessResult<()>;

    /// Apply user agent, viewport, pixel ratio and touch from a device profile
    async fn emulate_device(&mut self, device: &DeviceDescriptor) -> HarnessResult<()>;

    /// Throttle this context's network
    async fn throttle_network(&mut self, profile: &NetworkProfile) -> HarnessResult<()>;

    /// Start loading a URL; readiness is awaited separately
    async fn navigate(&mut self, url: &str) -> HarnessResult<()>;

    /// Evaluate a script in page context and return its JSON value
    async fn evaluate(&self, script: &str) -> HarnessResult<serde_json::Value>;

    /// Capture a PNG of the viewport
    async fn screenshot(&self) -> HarnessResult<Vec<u8>>;

    /// Release the context
    async fn close(&mut self) -> HarnessResult<()>;
}

/// A launched browser that hands out fresh page contexts
#[async_trait]
pub trait BrowserSession: Send {
    /// Page type produced by this browser
    type Page: PageDriver;

    /// Open a new isolated context with one page
    async fn new_page(&mut self) -> HarnessResult<Self::Page>;

    /// Shut the browser down
    async fn close(&mut self) -> HarnessResult<()>;
}

// ============================================================================
// Mock implementation
// ============================================================================

#[derive(Debug)]
struct ScriptRule {
    needle: String,
    responses: VecDeque<Result<serde_json::Value, String>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Scripted page for unit tests
///
/// Scripts are answered by the first rule whose needle occurs in the script
/// text. A rule with several responses hands them out in order and keeps
/// repeating the last one. Clones share rules and call history.
#[derive(Debug, Clone)]
pub struct MockDriver {
    capabilities: DriverCapabilities,
    rules: Arc<Mutex<Vec<ScriptRule>>>,
    history: Arc<Mutex<Vec<String>>>,
    screenshot: Option<Vec<u8>>,
    navigate_delay: Option<Duration>,
    fail_throttling: bool,
}

impl Default for MockDriver {
    fn default() -> Self {
        Self {
            capabilities: DriverCapabilities::full(),
            rules: Arc::new(Mutex::new(Vec::new())),
            history: Arc::new(Mutex::new(Vec::new())),
            screenshot: Some(b"\x89PNG\r\n\x1a\nmock".to_vec()),
            navigate_delay: None,
            fail_throttling: false,
        }
    }
}

impl MockDriver {
    /// Create new mock driver
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Page that reports `complete` with a stable resource count
    #[must_use]
    pub fn loaded() -> Self {
        let driver = Self::new();
        driver.on_script(
            "readyState",
            serde_json::json!({"readyState": "complete", "resources": 1}),
        );
        driver
    }

    /// Override capabilities
    #[must_use]
    pub const fn with_capabilities(mut self, capabilities: DriverCapabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    /// Make `navigate` itself take this long
    #[must_use]
    pub const fn with_navigate_delay(mut self, delay: Duration) -> Self {
        self.navigate_delay = Some(delay);
        self
    }

    /// Screenshot bytes, `None` makes `screenshot` fail
    #[must_use]
    pub fn with_screenshot(mut self, data: Option<Vec<u8>>) -> Self {
        self.screenshot = data;
        self
    }

    /// Make the engine reject throttling even though it is advertised
    #[must_use]
    pub const fn with_failing_throttling(mut self) -> Self {
        self.fail_throttling = true;
        self
    }

    /// Answer scripts containing `needle` with `value`
    pub fn on_script(&self, needle: &str, value: serde_json::Value) {
        self.on_script_sequence(needle, vec![Ok(value)]);
    }

    /// Answer scripts containing `needle` with an evaluation error
    pub fn on_script_error(&self, needle: &str, message: &str) {
        self.on_script_sequence(needle, vec![Err(message.to_string())]);
    }

    /// Answer scripts containing `needle` with successive responses
    pub fn on_script_sequence(
        &self,
        needle: &str,
        responses: Vec<Result<serde_json::Value, String>>,
    ) {
        lock(&self.rules).push(ScriptRule {
            needle: needle.to_string(),
            responses: responses.into(),
        });
    }

    /// Get call history
    #[must_use]
    pub fn history(&self) -> Vec<String> {
        lock(&self.history).clone()
    }

    /// Check if method was called
    #[must_use]
    pub fn was_called(&self, method: &str) -> bool {
        lock(&self.history).iter().any(|c| c.starts_with(method))
    }

    /// Number of calls starting with `method`
    #[must_use]
    pub fn call_count(&self, method: &str) -> usize {
        lock(&self.history)
            .iter()
            .filter(|c| c.starts_with(method))
            .count()
    }

    fn record(&self, call: impl Into<String>) {
        lock(&self.history).push(call.into());
    }
}

#[async_trait]
impl PageDriver for MockDriver {
    fn capabilities(&self) -> DriverCapabilities {
        self.capabilities
    }

    async fn set_viewport(&mut self, viewport: Viewport) -> HarnessResult<()> {
        self.record(format!("set_viewport:{}", viewport.label()));
        Ok(())
    }

    async fn emulate_device(&mut self, device: &DeviceDescriptor) -> HarnessResult<()> {
        self.record(format!("emulate_device:{}", device.name));
        Ok(())
    }

    async fn throttle_network(&mut self, profile: &NetworkProfile) -> HarnessResult<()> {
        if self.fail_throttling {
            return Err(HarnessError::page("Network.emulateNetworkConditions rejected"));
        }
        self.record(format!("throttle_network:{}", profile.name));
        Ok(())
    }

    async fn navigate(&mut self, url: &str) -> HarnessResult<()> {
        self.record(format!("navigate:{url}"));
        if let Some(delay) = self.navigate_delay {
            tokio::time::sleep(delay).await;
        }
        Ok(())
    }

    async fn evaluate(&self, script: &str) -> HarnessResult<serde_json::Value> {
        let response = {
            let mut rules = lock(&self.rules);
            let rule = rules
                .iter_mut()
                .find(|r| script.contains(&r.needle))
                .ok_or_else(|| HarnessError::page("No mock result for script"))?;
            if rule.responses.len() > 1 {
                rule.responses.pop_front()
            } else {
                rule.responses.front().cloned()
            }
        };
        self.record("evaluate");
        match response {
            Some(Ok(value)) => Ok(value),
            Some(Err(message)) => Err(HarnessError::page(message)),
            None => Err(HarnessError::page("Mock rule has no responses")),
        }
    }

    async fn screenshot(&self) -> HarnessResult<Vec<u8>> {
        self.record("screenshot");
        self.screenshot
            .clone()
            .ok_or_else(|| HarnessError::page("No mock screenshot set"))
    }

    async fn close(&mut self) -> HarnessResult<()> {
        self.record("close_page");
        Ok(())
    }
}

/// Browser handing out clones of a template [`MockDriver`]
#[derive(Debug, Clone, Default)]
pub struct MockBrowser {
    template: MockDriver,
}

impl MockBrowser {
    /// Every page opened shares the template's rules and history
    #[must_use]
    pub const fn new(template: MockDriver) -> Self {
        Self { template }
    }

    /// The shared page template
    #[must_use]
    pub const fn template(&self) -> &MockDriver {
        &self.template
    }
}

#[async_trait]
impl BrowserSession for MockBrowser {
    type Page = MockDriver;

    async fn new_page(&mut self) -> HarnessResult<MockDriver> {
        self.template.record("new_page");
        Ok(self.template.clone())
    }

    async fn close(&mut self) -> HarnessResult<()> {
        self.template.record("close_browser");
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use serde_json::json;

    mod capabilities_tests {
        use super::*;

        #[test]
        fn test_default_is_full() {
            let caps = DriverCapabilities::default();
            assert!(caps.network_throttling);
            assert!(caps.device_emulation);
        }

        #[test]
        fn test_minimal() {
            let caps = DriverCapabilities::minimal();
            assert!(!caps.network_throttling);
        }
    }

    mod mock_driver_tests {
        use super::*;

        #[tokio::test]
        async fn test_navigate_is_recorded() {
            let mut driver = MockDriver::new();
            driver.navigate("https://example.com").await.unwrap();
            assert!(driver.was_called("navigate:https://example.com"));
        }

        #[tokio::test]
        async fn test_script_rules_match_by_needle() {
            let driver = MockDriver::new();
            driver.on_script("#cart", json!({"found": true}));
            let value = driver.evaluate("probe('#cart')").await.unwrap();
            assert_eq!(value["found"], true);
            assert!(driver.evaluate("probe('#other')").await.is_err());
        }

        #[tokio::test]
        async fn test_sequence_repeats_last() {
            let driver = MockDriver::new();
            driver.on_script_sequence("x", vec![Ok(json!(1)), Ok(json!(2))]);
            assert_eq!(driver.evaluate("x").await.unwrap(), json!(1));
            assert_eq!(driver.evaluate("x").await.unwrap(), json!(2));
            assert_eq!(driver.evaluate("x").await.unwrap(), json!(2));
        }

        #[tokio::test]
        async fn test_script_error() {
            let driver = MockDriver::new();
            driver.on_script_error("boom", "ReferenceError: boom is not defined");
            let err = driver.evaluate("boom()").await.unwrap_err();
            assert!(err.to_string().contains("ReferenceError"));
        }

        #[tokio::test]
        async fn test_missing_screenshot_fails() {
            let driver = MockDriver::new().with_screenshot(None);
            assert!(driver.screenshot().await.is_err());
        }

        #[tokio::test]
        async fn test_clones_share_history() {
            let driver = MockDriver::new();
            let mut clone = driver.clone();
            clone.close().await.unwrap();
            assert!(driver.was_called("close_page"));
        }
    }

    mod mock_browser_tests {
        use super::*;

        #[tokio::test]
        async fn test_pages_share_template_history() {
            let mut browser = MockBrowser::new(MockDriver::loaded());
            let mut page = browser.new_page().await.unwrap();
            page.close().await.unwrap();
            browser.close().await.unwrap();

            let history = browser.template().history();
            assert_eq!(history, vec!["new_page", "close_page", "close_browser"]);
        }
    }
}
