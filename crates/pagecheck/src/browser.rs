//! Browser control for headless page verification.
//!
//! Chrome `DevTools` Protocol implementation of [`BrowserSession`] and
//! [`PageDriver`] on top of chromiumoxide, compiled with the `browser`
//! feature. Each page lives in its own browser context so cookies, storage,
//! emulation and throttling never leak between scenarios.

#[cfg(feature = "browser")]
use crate::driver::{BrowserSession, DriverCapabilities, PageDriver};
#[cfg(feature = "browser")]
use crate::emulation::{DeviceDescriptor, NetworkProfile};
use crate::emulation::Viewport;
#[cfg(feature = "browser")]
use crate::result::{HarnessError, HarnessResult};

/// Browser launch configuration
#[derive(Debug, Clone)]
pub struct BrowserConfig {
    /// Run without a visible window
    pub headless: bool,
    /// Window size at launch; scenarios override per context
    pub window: Viewport,
    /// Path to chromium binary (None = auto-detect)
    pub chromium_path: Option<String>,
    /// Sandbox mode (disable for containers)
    pub sandbox: bool,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: true,
            window: Viewport::default(),
            chromium_path: None,
            sandbox: true,
        }
    }
}

impl BrowserConfig {
    /// Set headless mode
    #[must_use]
    pub const fn with_headless(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }

    /// Set chromium path
    #[must_use]
    pub fn with_chromium_path(mut self, path: impl Into<String>) -> Self {
        self.chromium_path = Some(path.into());
        self
    }

    /// Disable sandbox (for containers/CI)
    #[must_use]
    pub const fn with_no_sandbox(mut self) -> Self {
        self.sandbox = false;
        self
    }

    /// Set launch window size
    #[must_use]
    pub const fn with_window(mut self, window: Viewport) -> Self {
        self.window = window;
        self
    }
}

// ============================================================================
// Real CDP Implementation (when `browser` feature is enabled)
// ============================================================================

#[cfg(feature = "browser")]
#[allow(
    clippy::significant_drop_tightening,
    clippy::missing_errors_doc,
    clippy::cast_precision_loss
)]
mod cdp {
    use super::*;
    use async_trait::async_trait;
    use base64::Engine;
    use chromiumoxide::browser::{Browser as CdpBrowser, BrowserConfig as CdpConfig};
    use chromiumoxide::cdp::browser_protocol::browser::BrowserContextId;
    use chromiumoxide::cdp::browser_protocol::emulation::{
        SetDeviceMetricsOverrideParams, SetTouchEmulationEnabledParams,
        SetUserAgentOverrideParams,
    };
    use chromiumoxide::cdp::browser_protocol::network::{
        EmulateNetworkConditionsParams, EnableParams,
    };
    use chromiumoxide::cdp::browser_protocol::page::{
        CaptureScreenshotFormat, CaptureScreenshotParams, NavigateParams,
    };
    use chromiumoxide::cdp::browser_protocol::target::{
        CreateBrowserContextParams, CreateTargetParams,
    };
    use chromiumoxide::page::Page as CdpPage;
    use futures::StreamExt;
    use std::sync::Arc;
    use tokio::sync::Mutex;
    use tracing::{debug, warn};

    fn page_error(e: impl std::fmt::Display) -> HarnessError {
        HarnessError::page(e.to_string())
    }

    /// Chromium process driven over CDP
    #[derive(Debug)]
    pub struct ChromiumBrowser {
        inner: Arc<Mutex<CdpBrowser>>,
        handle: tokio::task::JoinHandle<()>,
    }

    impl ChromiumBrowser {
        /// Launch a new browser instance
        ///
        /// # Errors
        ///
        /// Returns `BrowserLaunch` if chromium cannot be found or started
        pub async fn launch(config: BrowserConfig) -> HarnessResult<Self> {
            let mut builder = CdpConfig::builder()
                .window_size(config.window.width, config.window.height);

            if !config.headless {
                builder = builder.with_head();
            }

            if !config.sandbox {
                builder = builder.no_sandbox();
            }

            if let Some(ref path) = config.chromium_path {
                builder = builder.chrome_executable(path);
            }

            let cdp_config = builder
                .build()
                .map_err(|message| HarnessError::BrowserLaunch { message })?;

            let (browser, mut handler) =
                CdpBrowser::launch(cdp_config)
                    .await
                    .map_err(|e| HarnessError::BrowserLaunch {
                        message: e.to_string(),
                    })?;

            let handle = tokio::spawn(async move {
                while let Some(event) = handler.next().await {
                    if event.is_err() {
                        break;
                    }
                }
            });

            debug!(headless = config.headless, "chromium launched");
            Ok(Self {
                inner: Arc::new(Mutex::new(browser)),
                handle,
            })
        }
    }

    #[async_trait]
    impl BrowserSession for ChromiumBrowser {
        type Page = ChromiumPage;

        async fn new_page(&mut self) -> HarnessResult<ChromiumPage> {
            let mut browser = self.inner.lock().await;
            let context = browser
                .create_browser_context(CreateBrowserContextParams::default())
                .await
                .map_err(page_error)?;
            let params = CreateTargetParams::builder()
                .url("about:blank")
                .browser_context_id(context.clone())
                .build()
                .map_err(HarnessError::page)?;
            let page = browser.new_page(params).await.map_err(page_error)?;

            Ok(ChromiumPage {
                browser: Arc::clone(&self.inner),
                context: Some(context),
                inner: Arc::new(Mutex::new(page)),
            })
        }

        async fn close(&mut self) -> HarnessResult<()> {
            let mut browser = self.inner.lock().await;
            browser
                .close()
                .await
                .map_err(|e| HarnessError::page(format!("closing browser: {e}")))?;
            if let Err(e) = browser.wait().await {
                warn!(error = %e, "chromium did not exit cleanly");
            }
            self.handle.abort();
            Ok(())
        }
    }

    /// A page in its own browser context
    #[derive(Debug)]
    pub struct ChromiumPage {
        browser: Arc<Mutex<CdpBrowser>>,
        context: Option<BrowserContextId>,
        inner: Arc<Mutex<CdpPage>>,
    }

    #[async_trait]
    impl PageDriver for ChromiumPage {
        fn capabilities(&self) -> DriverCapabilities {
            DriverCapabilities::full()
        }

        async fn set_viewport(&mut self, viewport: Viewport) -> HarnessResult<()> {
            let page = self.inner.lock().await;
            page.execute(SetDeviceMetricsOverrideParams::new(
                i64::from(viewport.width),
                i64::from(viewport.height),
                1.0,
                false,
            ))
            .await
            .map_err(page_error)?;
            Ok(())
        }

        async fn emulate_device(&mut self, device: &DeviceDescriptor) -> HarnessResult<()> {
            let page = self.inner.lock().await;
            let unsupported = |e: chromiumoxide::error::CdpError| {
                HarnessError::unsupported("device emulation", e.to_string())
            };
            page.execute(SetDeviceMetricsOverrideParams::new(
                i64::from(device.viewport.width),
                i64::from(device.viewport.height),
                device.device_scale_factor,
                device.is_mobile,
            ))
            .await
            .map_err(unsupported)?;
            if !device.user_agent.is_empty() {
                page.execute(SetUserAgentOverrideParams::new(device.user_agent.clone()))
                    .await
                    .map_err(unsupported)?;
            }
            page.execute(SetTouchEmulationEnabledParams::new(device.has_touch))
                .await
                .map_err(unsupported)?;
            Ok(())
        }

        async fn throttle_network(&mut self, profile: &NetworkProfile) -> HarnessResult<()> {
            let page = self.inner.lock().await;
            let unsupported = |e: chromiumoxide::error::CdpError| {
                HarnessError::unsupported("network throttling", e.to_string())
            };
            page.execute(EnableParams::default())
                .await
                .map_err(unsupported)?;
            page.execute(EmulateNetworkConditionsParams::new(
                false,
                profile.latency_ms as f64,
                profile.download_bps as f64,
                profile.upload_bps as f64,
            ))
            .await
            .map_err(unsupported)?;
            Ok(())
        }

        async fn navigate(&mut self, url: &str) -> HarnessResult<()> {
            let page = self.inner.lock().await;
            let response = page
                .execute(NavigateParams::new(url))
                .await
                .map_err(page_error)?;
            if let Some(ref error_text) = response.error_text {
                return Err(HarnessError::page(format!("navigation to {url} failed: {error_text}")));
            }
            Ok(())
        }

        async fn evaluate(&self, script: &str) -> HarnessResult<serde_json::Value> {
            let page = self.inner.lock().await;
            let result = page.evaluate(script).await.map_err(page_error)?;
            Ok(result
                .into_value::<serde_json::Value>()
                .unwrap_or(serde_json::Value::Null))
        }

        async fn screenshot(&self) -> HarnessResult<Vec<u8>> {
            let page = self.inner.lock().await;
            let params = CaptureScreenshotParams::builder()
                .format(CaptureScreenshotFormat::Png)
                .build();
            let screenshot = page.execute(params).await.map_err(page_error)?;
            base64::engine::general_purpose::STANDARD
                .decode(&screenshot.data)
                .map_err(page_error)
        }

        async fn close(&mut self) -> HarnessResult<()> {
            let page = self.inner.lock().await.clone();
            let closed = page.close().await.map_err(page_error);
            if let Some(context) = self.context.take() {
                let browser = self.browser.lock().await;
                browser
                    .dispose_browser_context(context)
                    .await
                    .map_err(page_error)?;
            }
            closed
        }
    }
}

#[cfg(feature = "browser")]
pub use cdp::{ChromiumBrowser, ChromiumPage};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_headless_and_sandboxed() {
        let config = BrowserConfig::default();
        assert!(config.headless);
        assert!(config.sandbox);
        assert!(config.chromium_path.is_none());
    }

    #[test]
    fn test_builder() {
        let config = BrowserConfig::default()
            .with_headless(false)
            .with_no_sandbox()
            .with_chromium_path("/usr/bin/chromium")
            .with_window(Viewport::new(375, 667));
        assert!(!config.headless);
        assert!(!config.sandbox);
        assert_eq!(config.chromium_path.as_deref(), Some("/usr/bin/chromium"));
        assert_eq!(config.window.label(), "375x667");
    }
}
