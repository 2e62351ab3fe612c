//! Assertion evaluation against a live page.
//!
//! Each check runs a probe script in page context that returns a plain
//! observation object; the predicate itself is decided in Rust from that
//! observation. Anything that goes wrong while probing turns into a failed
//! result for that check only.

use crate::driver::PageDriver;
use crate::report::PageTimings;
use crate::result::{HarnessError, HarnessResult};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt;
use tracing::{debug, warn};

// =============================================================================
// CHECK DEFINITIONS
// =============================================================================

/// Performance metric a timing check reads
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimingMetric {
    /// `DOMContentLoaded` end, relative to navigation start
    DomContentLoaded,
    /// `load` event end, relative to navigation start
    Load,
    /// First contentful paint
    FirstContentfulPaint,
}

impl TimingMetric {
    /// Read this metric from captured timings
    #[must_use]
    pub const fn read(self, timings: &PageTimings) -> Option<f64> {
        match self {
            Self::DomContentLoaded => timings.dom_content_loaded_ms,
            Self::Load => timings.load_ms,
            Self::FirstContentfulPaint => timings.first_contentful_paint_ms,
        }
    }
}

impl fmt::Display for TimingMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::DomContentLoaded => "DOMContentLoaded",
            Self::Load => "load",
            Self::FirstContentfulPaint => "first-contentful-paint",
        })
    }
}

/// Condition checked against an element or the page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Predicate {
    /// At least one element matches
    Exists,
    /// First match is visible
    Visible,
    /// No match, or first match is not visible
    Hidden,
    /// First match is a fully decoded image
    Loaded,
    /// Every matched image is decoded (selector defaults to `img`)
    AllImagesLoaded,
    /// First match has a non-empty bounding box
    NonZeroSize,
    /// First match's bounding box is at least `width`×`height` CSS pixels
    MinSize {
        /// Minimum width
        width: f64,
        /// Minimum height
        height: f64,
    },
    /// At least `min` elements match
    CountAtLeast {
        /// Minimum number of matches
        min: usize,
    },
    /// First match's text contains `text`
    TextContains {
        /// Expected substring
        text: String,
    },
    /// Computed style `property` equals `value`
    StyleEquals {
        /// CSS property name
        property: String,
        /// Expected computed value
        value: String,
    },
    /// Body is no wider than the viewport
    NoHorizontalScroll,
    /// A performance metric stays under `max_ms`
    TimingBelow {
        /// Metric to read
        metric: TimingMetric,
        /// Exclusive ceiling in milliseconds
        max_ms: f64,
    },
    /// Bytes transferred by the page stay under `max_bytes`
    TransferBelow {
        /// Exclusive ceiling in bytes
        max_bytes: u64,
    },
}

impl Predicate {
    /// Page-level predicates ignore the selector
    #[must_use]
    pub const fn is_page_level(&self) -> bool {
        matches!(
            self,
            Self::NoHorizontalScroll | Self::TimingBelow { .. } | Self::TransferBelow { .. }
        )
    }
}

/// One named check
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssertionSpec {
    /// Check name shown in the summary
    pub name: String,
    /// CSS selector for element-level predicates
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selector: Option<String>,
    /// Condition to check
    pub predicate: Predicate,
}

impl AssertionSpec {
    /// Element-level check
    #[must_use]
    pub fn element(name: impl Into<String>, selector: impl Into<String>, predicate: Predicate) -> Self {
        Self {
            name: name.into(),
            selector: Some(selector.into()),
            predicate,
        }
    }

    /// Page-level check
    #[must_use]
    pub fn page(name: impl Into<String>, predicate: Predicate) -> Self {
        Self {
            name: name.into(),
            selector: None,
            predicate,
        }
    }
}

/// Outcome of one check in one scenario
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssertionResult {
    /// Check name
    pub name: String,
    /// Whether the predicate held
    pub passed: bool,
    /// What the probe saw
    pub observed: Value,
    /// Human-readable explanation
    pub message: String,
}

impl AssertionResult {
    fn pass(name: &str, observed: Value, message: impl Into<String>) -> Self {
        Self {
            name: name.to_string(),
            passed: true,
            observed,
            message: message.into(),
        }
    }

    fn fail(name: &str, observed: Value, message: impl Into<String>) -> Self {
        Self {
            name: name.to_string(),
            passed: false,
            observed,
            message: message.into(),
        }
    }

    fn decide(name: &str, passed: bool, observed: Value, message: String) -> Self {
        Self {
            name: name.to_string(),
            passed,
            observed,
            message,
        }
    }

    /// Failed result carrying an execution error
    #[must_use]
    pub fn errored(name: &str, error: &HarnessError) -> Self {
        Self::fail(name, json!({ "error": error.to_string() }), error.to_string())
    }
}

// =============================================================================
// OBSERVATIONS
// =============================================================================

/// Element bounding box in CSS pixels
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    /// Left edge
    #[serde(default)]
    pub x: f64,
    /// Top edge
    #[serde(default)]
    pub y: f64,
    /// Width
    #[serde(default)]
    pub width: f64,
    /// Height
    #[serde(default)]
    pub height: f64,
}

/// Load state of one `<img>`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageObservation {
    /// Resolved source URL
    #[serde(default)]
    pub src: String,
    /// `img.complete`
    #[serde(default)]
    pub complete: bool,
    /// `img.naturalHeight`
    #[serde(default)]
    pub natural_height: u32,
}

impl ImageObservation {
    /// Fully decoded with real pixels
    #[must_use]
    pub const fn is_loaded(&self) -> bool {
        self.complete && self.natural_height > 0
    }
}

/// What the element probe reports about the first match
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementObservation {
    /// At least one element matched
    pub found: bool,
    /// Number of matches
    #[serde(default)]
    pub count: usize,
    /// Bounding box
    #[serde(default)]
    pub rect: Rect,
    /// Computed `display`
    #[serde(default)]
    pub display: String,
    /// Computed `visibility`
    #[serde(default)]
    pub visibility: String,
    /// Computed `opacity` (`None` when not parseable)
    #[serde(default)]
    pub opacity: Option<f64>,
    /// Lowercase tag name
    #[serde(default)]
    pub tag_name: String,
    /// `complete` for images
    #[serde(default)]
    pub complete: Option<bool>,
    /// `naturalWidth` for images
    #[serde(default)]
    pub natural_width: Option<u32>,
    /// `naturalHeight` for images
    #[serde(default)]
    pub natural_height: Option<u32>,
    /// `textContent`
    #[serde(default)]
    pub text: Option<String>,
    /// Requested computed style value
    #[serde(default)]
    pub style_value: Option<String>,
    /// Every matched `<img>`
    #[serde(default)]
    pub images: Vec<ImageObservation>,
}

/// What the page probe reports
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageObservation {
    /// `document.body.scrollWidth`
    #[serde(default)]
    pub scroll_width: f64,
    /// `window.innerWidth`
    #[serde(default)]
    pub inner_width: f64,
    /// Performance API timings
    #[serde(default)]
    pub timings: PageTimings,
}

/// Rendered and not hidden by CSS
///
/// width > 0, height > 0, `display` not `none`, `visibility` not `hidden`
/// and opacity not 0.
#[must_use]
pub fn is_visible(obs: &ElementObservation) -> bool {
    obs.found
        && obs.rect.width > 0.0
        && obs.rect.height > 0.0
        && obs.display != "none"
        && obs.visibility != "hidden"
        && obs.opacity.map_or(true, |o| o != 0.0)
}

/// Image finished loading with non-zero natural height, regardless of visibility
#[must_use]
pub fn is_loaded(obs: &ElementObservation) -> bool {
    obs.found && obs.complete.unwrap_or(false) && obs.natural_height.unwrap_or(0) > 0
}

fn visibility_reason(obs: &ElementObservation) -> String {
    if obs.rect.width <= 0.0 || obs.rect.height <= 0.0 {
        format!("zero size ({}×{})", obs.rect.width, obs.rect.height)
    } else if obs.display == "none" {
        "display: none".to_string()
    } else if obs.visibility == "hidden" {
        "visibility: hidden".to_string()
    } else {
        "opacity: 0".to_string()
    }
}

// =============================================================================
// PROBE SCRIPTS
// =============================================================================

fn js_string(value: &str) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| "\"\"".to_string())
}

/// Probe reporting on every match of `selector`
#[must_use]
pub fn element_probe(selector: &str, style_property: Option<&str>) -> String {
    let property = style_property.map_or_else(|| "null".to_string(), js_string);
    format!(
        r"(() => {{
  try {{
    const nodes = Array.from(document.querySelectorAll({selector}));
    const el = nodes[0];
    if (!el) return {{ found: false, count: 0 }};
    const rect = el.getBoundingClientRect();
    const style = window.getComputedStyle(el);
    const prop = {property};
    const opacity = Number(style.opacity);
    return {{
      found: true,
      count: nodes.length,
      rect: {{ x: rect.x, y: rect.y, width: rect.width, height: rect.height }},
      display: style.display,
      visibility: style.visibility,
      opacity: Number.isFinite(opacity) ? opacity : null,
      tagName: el.tagName.toLowerCase(),
      complete: 'complete' in el ? el.complete : null,
      naturalWidth: 'naturalWidth' in el ? el.naturalWidth : null,
      naturalHeight: 'naturalHeight' in el ? el.naturalHeight : null,
      text: el.textContent,
      styleValue: prop ? style.getPropertyValue(prop) : null,
      images: nodes.filter(n => n.tagName === 'IMG').map(n => ({{
        src: n.currentSrc || n.src,
        complete: n.complete,
        naturalHeight: n.naturalHeight
      }}))
    }};
  }} catch (e) {{
    return {{ error: String((e && e.message) || e) }};
  }}
}})()",
        selector = js_string(selector),
    )
}

/// Probe for page layout and Performance API timings
pub const PAGE_PROBE: &str = r"(() => {
  try {
    const nav = performance.getEntriesByType('navigation')[0];
    const paint = performance.getEntriesByName('first-contentful-paint')[0];
    const resources = performance.getEntriesByType('resource');
    const transfer = resources.reduce((sum, r) => sum + (r.transferSize || 0), 0);
    return {
      scrollWidth: document.body ? document.body.scrollWidth : 0,
      innerWidth: window.innerWidth,
      timings: {
        domContentLoadedMs: nav && nav.domContentLoadedEventEnd > 0
          ? nav.domContentLoadedEventEnd - nav.startTime : null,
        loadMs: nav && nav.loadEventEnd > 0 ? nav.loadEventEnd - nav.startTime : null,
        firstContentfulPaintMs: paint ? paint.startTime : null,
        resourceCount: resources.length,
        transferBytes: transfer + (nav ? (nav.transferSize || 0) : 0)
      }
    };
  } catch (e) {
    return { error: String((e && e.message) || e) };
  }
})()";

fn probe_error(check: &str, value: &Value) -> Option<HarnessError> {
    value
        .get("error")
        .and_then(Value::as_str)
        .map(|message| HarnessError::AssertionExecution {
            check: check.to_string(),
            message: message.to_string(),
        })
}

async fn run_probe<D, T>(driver: &D, check: &str, script: &str) -> HarnessResult<T>
where
    D: PageDriver + ?Sized,
    T: serde::de::DeserializeOwned,
{
    let value = driver
        .evaluate(script)
        .await
        .map_err(|e| HarnessError::AssertionExecution {
            check: check.to_string(),
            message: e.to_string(),
        })?;
    if let Some(err) = probe_error(check, &value) {
        return Err(err);
    }
    serde_json::from_value(value).map_err(|e| HarnessError::AssertionExecution {
        check: check.to_string(),
        message: format!("malformed observation: {e}"),
    })
}

// =============================================================================
// PREDICATE DECISIONS
// =============================================================================

/// Decide an element-level predicate from an observation
#[must_use]
pub fn decide_element(spec: &AssertionSpec, selector: &str, obs: &ElementObservation) -> AssertionResult {
    let name = spec.name.as_str();
    let missing = || format!("no element matches '{selector}'");

    match &spec.predicate {
        Predicate::Exists => AssertionResult::decide(
            name,
            obs.found,
            json!({ "count": obs.count }),
            if obs.found {
                format!("{} element(s) match '{selector}'", obs.count)
            } else {
                missing()
            },
        ),
        Predicate::Visible | Predicate::Hidden => {
            let visible = is_visible(obs);
            let observed = json!({
                "found": obs.found,
                "width": obs.rect.width,
                "height": obs.rect.height,
                "display": obs.display,
                "visibility": obs.visibility,
                "opacity": obs.opacity,
            });
            let state = if !obs.found {
                missing()
            } else if visible {
                format!("'{selector}' is visible")
            } else {
                format!("'{selector}' is not visible ({})", visibility_reason(obs))
            };
            let want_visible = matches!(spec.predicate, Predicate::Visible);
            AssertionResult::decide(name, visible == want_visible, observed, state)
        }
        Predicate::Loaded => {
            let observed = json!({
                "found": obs.found,
                "tag": obs.tag_name,
                "complete": obs.complete,
                "naturalWidth": obs.natural_width,
                "naturalHeight": obs.natural_height,
            });
            if !obs.found {
                AssertionResult::fail(name, observed, missing())
            } else if is_loaded(obs) {
                AssertionResult::pass(name, observed, format!("'{selector}' is loaded"))
            } else {
                AssertionResult::fail(name, observed, format!("'{selector}' has not loaded"))
            }
        }
        Predicate::AllImagesLoaded => {
            let failing: Vec<&str> = obs
                .images
                .iter()
                .filter(|img| !img.is_loaded())
                .map(|img| img.src.as_str())
                .collect();
            let observed = json!({ "total": obs.images.len(), "failing": failing });
            if failing.is_empty() {
                AssertionResult::pass(
                    name,
                    observed,
                    format!("{} image(s) loaded", obs.images.len()),
                )
            } else {
                AssertionResult::fail(
                    name,
                    observed,
                    format!("{} of {} image(s) not loaded", failing.len(), obs.images.len()),
                )
            }
        }
        Predicate::NonZeroSize => {
            let passed = obs.found && obs.rect.width > 0.0 && obs.rect.height > 0.0;
            AssertionResult::decide(
                name,
                passed,
                json!({ "width": obs.rect.width, "height": obs.rect.height }),
                if obs.found {
                    format!("'{selector}' is {}×{}", obs.rect.width, obs.rect.height)
                } else {
                    missing()
                },
            )
        }
        Predicate::MinSize { width, height } => {
            let passed = obs.found && obs.rect.width >= *width && obs.rect.height >= *height;
            AssertionResult::decide(
                name,
                passed,
                json!({
                    "width": obs.rect.width,
                    "height": obs.rect.height,
                    "minWidth": width,
                    "minHeight": height,
                }),
                if obs.found {
                    format!(
                        "'{selector}' is {}×{}, expected at least {width}×{height}",
                        obs.rect.width, obs.rect.height
                    )
                } else {
                    missing()
                },
            )
        }
        Predicate::CountAtLeast { min } => AssertionResult::decide(
            name,
            obs.count >= *min,
            json!({ "count": obs.count, "min": min }),
            format!("{} element(s) match '{selector}', expected at least {min}", obs.count),
        ),
        Predicate::TextContains { text } => {
            let actual = obs.text.as_deref().unwrap_or_default();
            let passed = obs.found && actual.contains(text.as_str());
            AssertionResult::decide(
                name,
                passed,
                json!({ "text": actual.trim() }),
                if passed {
                    format!("'{selector}' contains \"{text}\"")
                } else if obs.found {
                    format!("'{selector}' does not contain \"{text}\"")
                } else {
                    missing()
                },
            )
        }
        Predicate::StyleEquals { property, value } => {
            let actual = obs.style_value.as_deref().unwrap_or_default().trim();
            let passed = obs.found && actual == value.trim();
            let mut observed = serde_json::Map::new();
            observed.insert(property.clone(), Value::from(actual));
            AssertionResult::decide(
                name,
                passed,
                Value::Object(observed),
                if obs.found {
                    format!("{property} is '{actual}', expected '{value}'")
                } else {
                    missing()
                },
            )
        }
        Predicate::NoHorizontalScroll
        | Predicate::TimingBelow { .. }
        | Predicate::TransferBelow { .. } => AssertionResult::fail(
            name,
            Value::Null,
            "page-level predicate evaluated against an element",
        ),
    }
}

/// Decide a page-level predicate from an observation
#[must_use]
pub fn decide_page(spec: &AssertionSpec, obs: &PageObservation) -> AssertionResult {
    let name = spec.name.as_str();
    match &spec.predicate {
        Predicate::NoHorizontalScroll => AssertionResult::decide(
            name,
            obs.scroll_width <= obs.inner_width,
            json!({ "scrollWidth": obs.scroll_width, "innerWidth": obs.inner_width }),
            format!(
                "body scrollWidth {} vs viewport {}",
                obs.scroll_width, obs.inner_width
            ),
        ),
        Predicate::TimingBelow { metric, max_ms } => match metric.read(&obs.timings) {
            Some(actual) => AssertionResult::decide(
                name,
                actual < *max_ms,
                json!({ "metric": metric, "ms": actual, "max_ms": max_ms }),
                format!("{metric} at {actual:.0}ms (limit {max_ms:.0}ms)"),
            ),
            None => AssertionResult::fail(
                name,
                json!({ "metric": metric, "ms": null, "max_ms": max_ms }),
                format!("{metric} was not recorded by the browser"),
            ),
        },
        Predicate::TransferBelow { max_bytes } => {
            let actual = obs.timings.transfer_bytes;
            AssertionResult::decide(
                name,
                actual < *max_bytes,
                json!({ "transferBytes": actual, "maxBytes": max_bytes }),
                format!("{actual} bytes transferred (limit {max_bytes})"),
            )
        }
        _ => AssertionResult::fail(
            name,
            Value::Null,
            "element predicate evaluated against the page",
        ),
    }
}

// =============================================================================
// EVALUATOR
// =============================================================================

/// Runs check suites against a page
#[derive(Debug, Clone, Copy, Default)]
pub struct AssertionEvaluator;

impl AssertionEvaluator {
    /// One result per check, in order; a failing check never stops the rest
    pub async fn evaluate<D: PageDriver + ?Sized>(
        driver: &D,
        checks: &[AssertionSpec],
    ) -> Vec<AssertionResult> {
        let mut results = Vec::with_capacity(checks.len());
        for spec in checks {
            results.push(Self::evaluate_one(driver, spec).await);
        }
        results
    }

    /// Evaluate a single check
    pub async fn evaluate_one<D: PageDriver + ?Sized>(
        driver: &D,
        spec: &AssertionSpec,
    ) -> AssertionResult {
        let result = match Self::try_evaluate(driver, spec).await {
            Ok(result) => result,
            Err(e) => {
                warn!(check = %spec.name, error = %e, "check could not be evaluated");
                AssertionResult::errored(&spec.name, &e)
            }
        };
        if !result.passed {
            debug!(check = %result.name, message = %result.message, "check failed");
        }
        result
    }

    async fn try_evaluate<D: PageDriver + ?Sized>(
        driver: &D,
        spec: &AssertionSpec,
    ) -> HarnessResult<AssertionResult> {
        if spec.predicate.is_page_level() {
            let obs: PageObservation = run_probe(driver, &spec.name, PAGE_PROBE).await?;
            return Ok(decide_page(spec, &obs));
        }

        let selector = match (&spec.selector, &spec.predicate) {
            (Some(selector), _) => selector.as_str(),
            (None, Predicate::AllImagesLoaded) => "img",
            (None, _) => {
                return Err(HarnessError::AssertionExecution {
                    check: spec.name.clone(),
                    message: "element predicate requires a selector".to_string(),
                })
            }
        };
        let style_property = match spec.predicate {
            Predicate::StyleEquals { ref property, .. } => Some(property.as_str()),
            _ => None,
        };
        let script = element_probe(selector, style_property);
        let obs: ElementObservation = run_probe(driver, &spec.name, &script).await?;
        Ok(decide_element(spec, selector, &obs))
    }

    /// Performance API timings for the current document
    ///
    /// # Errors
    ///
    /// Returns an error if the probe fails or returns an unexpected shape.
    pub async fn collect_timings<D: PageDriver + ?Sized>(driver: &D) -> HarnessResult<PageTimings> {
        let obs: PageObservation = run_probe(driver, "timings", PAGE_PROBE).await?;
        Ok(obs.timings)
    }
}

/// All-failed results for a scenario that never reached evaluation
#[must_use]
pub fn failed_for_scenario(checks: &[AssertionSpec], message: &str) -> Vec<AssertionResult> {
    checks
        .iter()
        .map(|spec| AssertionResult::fail(&spec.name, json!({ "error": message }), message))
        .collect()
}
