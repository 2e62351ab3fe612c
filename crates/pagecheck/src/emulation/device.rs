//! Device Emulation
//!
//! Viewport sizes and device descriptors (user agent + viewport + pixel ratio).

use crate::result::{HarnessError, HarnessResult};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

/// Viewport dimensions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Viewport {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
}

impl Viewport {
    /// Create a new viewport
    #[must_use]
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Mobile portrait (375×667)
    pub const MOBILE_PORTRAIT: Self = Self::new(375, 667);
    /// Mobile landscape (667×375)
    pub const MOBILE_LANDSCAPE: Self = Self::new(667, 375);
    /// Tablet portrait (768×1024)
    pub const TABLET_PORTRAIT: Self = Self::new(768, 1024);
    /// Tablet landscape (1024×768)
    pub const TABLET_LANDSCAPE: Self = Self::new(1024, 768);

    /// The four layout audit viewports, in sweep order
    #[must_use]
    pub const fn audit_set() -> [Self; 4] {
        [
            Self::MOBILE_PORTRAIT,
            Self::MOBILE_LANDSCAPE,
            Self::TABLET_PORTRAIT,
            Self::TABLET_LANDSCAPE,
        ]
    }

    /// Label used in file names and summaries (`375x667`)
    #[must_use]
    pub fn label(&self) -> String {
        format!("{}x{}", self.width, self.height)
    }

    /// Check if viewport is in landscape orientation
    #[must_use]
    pub const fn is_landscape(&self) -> bool {
        self.width > self.height
    }

    /// Check if viewport is in portrait orientation
    #[must_use]
    pub const fn is_portrait(&self) -> bool {
        self.height > self.width
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 800,
        }
    }
}

impl fmt::Display for Viewport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}×{}", self.width, self.height)
    }
}

fn viewport_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"^\s*(\d{1,5})\s*[xX×]\s*(\d{1,5})\s*$").ok())
        .as_ref()
}

impl FromStr for Viewport {
    type Err = HarnessError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let caps = viewport_pattern()
            .and_then(|re| re.captures(s))
            .ok_or_else(|| HarnessError::config(format!("viewport '{s}' is not WIDTHxHEIGHT")))?;
        let width: u32 = caps[1]
            .parse()
            .map_err(|_| HarnessError::config(format!("bad viewport width in '{s}'")))?;
        let height: u32 = caps[2]
            .parse()
            .map_err(|_| HarnessError::config(format!("bad viewport height in '{s}'")))?;
        if width == 0 || height == 0 {
            return Err(HarnessError::config(format!(
                "viewport '{s}' must have non-zero dimensions"
            )));
        }
        Ok(Self::new(width, height))
    }
}

/// Device descriptor with all emulation parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceDescriptor {
    /// Device name (e.g., "iPhone 13")
    pub name: String,
    /// Viewport dimensions
    pub viewport: Viewport,
    /// User agent string
    pub user_agent: String,
    /// Device pixel ratio (e.g., 2.0 for Retina, 3.0 for iPhone)
    pub device_scale_factor: f64,
    /// Whether the device is mobile
    pub is_mobile: bool,
    /// Touch support
    pub has_touch: bool,
}

impl DeviceDescriptor {
    /// Create a new device descriptor
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            viewport: Viewport::default(),
            user_agent: String::new(),
            device_scale_factor: 1.0,
            is_mobile: false,
            has_touch: false,
        }
    }

    /// Set viewport dimensions
    #[must_use]
    pub const fn with_viewport_size(mut self, width: u32, height: u32) -> Self {
        self.viewport = Viewport::new(width, height);
        self
    }

    /// Set user agent
    #[must_use]
    pub fn with_user_agent(mut self, ua: impl Into<String>) -> Self {
        self.user_agent = ua.into();
        self
    }

    /// Set device scale factor
    #[must_use]
    pub const fn with_device_scale_factor(mut self, factor: f64) -> Self {
        self.device_scale_factor = factor;
        self
    }

    /// Set mobile mode (mobile devices also get touch)
    #[must_use]
    pub const fn with_mobile(mut self, is_mobile: bool) -> Self {
        self.is_mobile = is_mobile;
        self.has_touch = is_mobile;
        self
    }
}

const IOS_UA: &str = "Mozilla/5.0 (iPhone; CPU iPhone OS 15_0 like Mac OS X) \
    AppleWebKit/605.1.15 (KHTML, like Gecko) Version/15.0 Mobile/15E148 Safari/604.1";
const IPAD_UA: &str = "Mozilla/5.0 (iPad; CPU OS 16_0 like Mac OS X) \
    AppleWebKit/605.1.15 (KHTML, like Gecko) Version/16.0 Mobile/15E148 Safari/604.1";
const ANDROID_UA: &str = "Mozilla/5.0 (Linux; Android 13; Pixel 7) AppleWebKit/537.36 \
    (KHTML, like Gecko) Chrome/116.0.0.0 Mobile Safari/537.36";

/// Built-in device profiles
#[derive(Debug, Clone, Copy)]
pub struct DeviceEmulator;

impl DeviceEmulator {
    /// All built-in presets
    #[must_use]
    pub fn presets() -> Vec<DeviceDescriptor> {
        vec![
            Self::iphone_13(),
            Self::iphone_14_pro(),
            Self::iphone_x(),
            Self::ipad_mini(),
            Self::ipad_pro(),
            Self::pixel_7(),
            Self::samsung_galaxy_s23(),
            Self::desktop_1080p(),
        ]
    }

    /// Look up a preset by name, ignoring case and `-`/`_`/space differences
    #[must_use]
    pub fn find(name: &str) -> Option<DeviceDescriptor> {
        let wanted = normalize(name);
        Self::presets()
            .into_iter()
            .find(|d| normalize(&d.name) == wanted)
    }

    /// Look up a preset by name
    ///
    /// # Errors
    ///
    /// Returns a configuration error listing the known presets.
    pub fn require(name: &str) -> HarnessResult<DeviceDescriptor> {
        Self::find(name).ok_or_else(|| {
            let known: Vec<String> = Self::presets().into_iter().map(|d| d.name).collect();
            HarnessError::config(format!(
                "unknown device '{name}' (known: {})",
                known.join(", ")
            ))
        })
    }

    /// iPhone 13 device preset
    #[must_use]
    pub fn iphone_13() -> DeviceDescriptor {
        DeviceDescriptor::new("iPhone 13")
            .with_viewport_size(390, 844)
            .with_user_agent(IOS_UA)
            .with_device_scale_factor(3.0)
            .with_mobile(true)
    }

    /// iPhone 14 Pro device preset
    #[must_use]
    pub fn iphone_14_pro() -> DeviceDescriptor {
        DeviceDescriptor::new("iPhone 14 Pro")
            .with_viewport_size(393, 852)
            .with_user_agent(IOS_UA)
            .with_device_scale_factor(3.0)
            .with_mobile(true)
    }

    /// iPhone X device preset
    #[must_use]
    pub fn iphone_x() -> DeviceDescriptor {
        DeviceDescriptor::new("iPhone X")
            .with_viewport_size(375, 812)
            .with_user_agent(IOS_UA)
            .with_device_scale_factor(3.0)
            .with_mobile(true)
    }

    /// iPad Mini device preset
    #[must_use]
    pub fn ipad_mini() -> DeviceDescriptor {
        DeviceDescriptor::new("iPad Mini")
            .with_viewport_size(768, 1024)
            .with_user_agent(IPAD_UA)
            .with_device_scale_factor(2.0)
            .with_mobile(true)
    }

    /// iPad Pro 12.9" device preset
    #[must_use]
    pub fn ipad_pro() -> DeviceDescriptor {
        DeviceDescriptor::new("iPad Pro")
            .with_viewport_size(1024, 1366)
            .with_user_agent(IPAD_UA)
            .with_device_scale_factor(2.0)
            .with_mobile(true)
    }

    /// Google Pixel 7 device preset
    #[must_use]
    pub fn pixel_7() -> DeviceDescriptor {
        DeviceDescriptor::new("Pixel 7")
            .with_viewport_size(412, 915)
            .with_user_agent(ANDROID_UA)
            .with_device_scale_factor(2.625)
            .with_mobile(true)
    }

    /// Samsung Galaxy S23 device preset
    #[must_use]
    pub fn samsung_galaxy_s23() -> DeviceDescriptor {
        DeviceDescriptor::new("Samsung Galaxy S23")
            .with_viewport_size(360, 780)
            .with_user_agent(
                "Mozilla/5.0 (Linux; Android 13; SM-S911B) AppleWebKit/537.36 \
                (KHTML, like Gecko) Chrome/116.0.0.0 Mobile Safari/537.36",
            )
            .with_device_scale_factor(3.0)
            .with_mobile(true)
    }

    /// 1080p Desktop preset
    #[must_use]
    pub fn desktop_1080p() -> DeviceDescriptor {
        DeviceDescriptor::new("Desktop 1080p")
            .with_viewport_size(1920, 1080)
            .with_user_agent(
                "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                (KHTML, like Gecko) Chrome/116.0.0.0 Safari/537.36",
            )
            .with_device_scale_factor(1.0)
            .with_mobile(false)
    }
}

fn normalize(name: &str) -> String {
    name.chars()
        .filter(|c| !matches!(c, ' ' | '-' | '_'))
        .flat_map(char::to_lowercase)
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    mod viewport_tests {
        use super::*;

        #[test]
        fn test_parse() {
            assert_eq!("375x667".parse::<Viewport>().unwrap(), Viewport::new(375, 667));
            assert_eq!("1024×768".parse::<Viewport>().unwrap(), Viewport::new(1024, 768));
            assert_eq!(" 800 X 600 ".parse::<Viewport>().unwrap(), Viewport::new(800, 600));
        }

        #[test]
        fn test_parse_rejects_garbage() {
            assert!("375".parse::<Viewport>().is_err());
            assert!("wide x tall".parse::<Viewport>().is_err());
            assert!("0x600".parse::<Viewport>().is_err());
        }

        #[test]
        fn test_label() {
            assert_eq!(Viewport::new(375, 667).label(), "375x667");
        }

        #[test]
        fn test_orientation() {
            assert!(Viewport::MOBILE_LANDSCAPE.is_landscape());
            assert!(Viewport::MOBILE_PORTRAIT.is_portrait());
        }

        #[test]
        fn test_audit_set() {
            let set = Viewport::audit_set();
            assert_eq!(set.len(), 4);
            assert_eq!(set[0], Viewport::new(375, 667));
            assert_eq!(set[3], Viewport::new(1024, 768));
        }
    }

    mod preset_tests {
        use super::*;

        #[test]
        fn test_find_is_case_insensitive() {
            let device = DeviceEmulator::find("iphone-13").unwrap();
            assert_eq!(device.name, "iPhone 13");
            assert_eq!(device.viewport, Viewport::new(390, 844));
            assert!(device.is_mobile);
            assert!(device.has_touch);
        }

        #[test]
        fn test_unknown_device_lists_known() {
            let err = DeviceEmulator::require("Nokia 3310").unwrap_err();
            assert!(err.to_string().contains("iPhone 13"));
        }

        #[test]
        fn test_desktop_has_no_touch() {
            let device = DeviceEmulator::desktop_1080p();
            assert!(!device.is_mobile);
            assert!(!device.has_touch);
        }

        #[test]
        fn test_all_presets_have_user_agents() {
            for device in DeviceEmulator::presets() {
                assert!(!device.user_agent.is_empty(), "{}", device.name);
                assert!(device.device_scale_factor >= 1.0);
            }
        }
    }
}
