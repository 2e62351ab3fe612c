//! Network throttling profiles.
//!
//! Named bandwidth/latency presets. Values are bytes per second and
//! round-trip latency in milliseconds, matching what CDP
//! `Network.emulateNetworkConditions` expects.

use crate::result::{HarnessError, HarnessResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Bytes per second in one megabit per second (binary)
const MBPS: u64 = 1024 * 1024 / 8;

/// A bandwidth/latency throttling configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkProfile {
    /// Preset name (`4g-lte`, `3g`, ...)
    pub name: String,
    /// Download throughput in bytes per second
    pub download_bps: u64,
    /// Upload throughput in bytes per second
    pub upload_bps: u64,
    /// Round-trip latency in milliseconds
    pub latency_ms: u64,
}

impl NetworkProfile {
    /// Create a custom profile
    #[must_use]
    pub fn new(name: impl Into<String>, download_bps: u64, upload_bps: u64, latency_ms: u64) -> Self {
        Self {
            name: name.into(),
            download_bps,
            upload_bps,
            latency_ms,
        }
    }

    /// 4G LTE: 1 MB/s down, 250 kB/s up, 40ms
    #[must_use]
    pub fn lte_4g() -> Self {
        Self::new("4g-lte", 1_000_000, 250_000, 40)
    }

    /// Regular 3G: 400 kB/s down, 100 kB/s up, 150ms
    #[must_use]
    pub fn regular_3g() -> Self {
        Self::new("3g", 400_000, 100_000, 150)
    }

    /// Typical US 4G: 8 Mbps down, 2 Mbps up, 40ms
    #[must_use]
    pub fn typical_4g() -> Self {
        Self::new("4g", 8 * MBPS, 2 * MBPS, 40)
    }

    /// Fast 4G: 12 Mbps down, 3 Mbps up, 20ms
    #[must_use]
    pub fn fast_4g() -> Self {
        Self::new("4g-fast", 12 * MBPS, 3 * MBPS, 20)
    }

    /// All throttling presets (`none` is represented by the absence of a profile)
    #[must_use]
    pub fn presets() -> Vec<Self> {
        vec![
            Self::lte_4g(),
            Self::regular_3g(),
            Self::typical_4g(),
            Self::fast_4g(),
        ]
    }

    /// Resolve a preset name; `none` yields `Ok(None)`
    ///
    /// # Errors
    ///
    /// Returns a configuration error for unknown names.
    pub fn from_name(name: &str) -> HarnessResult<Option<Self>> {
        let wanted = name.trim().to_ascii_lowercase();
        if wanted == "none" || wanted.is_empty() {
            return Ok(None);
        }
        Self::presets()
            .into_iter()
            .find(|p| p.name == wanted)
            .map(Some)
            .ok_or_else(|| {
                let known: Vec<String> = Self::presets().into_iter().map(|p| p.name).collect();
                HarnessError::config(format!(
                    "unknown network profile '{name}' (known: none, {})",
                    known.join(", ")
                ))
            })
    }

    /// Expected wall time to transfer `bytes` under this profile
    ///
    /// `bytes * 8 / (download_bps * 8) * 1000 + latency_ms`
    #[must_use]
    pub fn expected_transfer_ms(&self, bytes: u64) -> f64 {
        if self.download_bps == 0 {
            return f64::INFINITY;
        }
        let bits = bytes as f64 * 8.0;
        let bits_per_second = self.download_bps as f64 * 8.0;
        bits / bits_per_second * 1000.0 + self.latency_ms as f64
    }
}

impl fmt::Display for NetworkProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({:.2} Mbps down, {:.2} Mbps up, {}ms)",
            self.name,
            self.download_bps as f64 / MBPS as f64,
            self.upload_bps as f64 / MBPS as f64,
            self.latency_ms
        )
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_lte_preset_values() {
        let lte = NetworkProfile::from_name("4g-lte").unwrap().unwrap();
        assert_eq!(lte.download_bps, 1_000_000);
        assert_eq!(lte.upload_bps, 250_000);
        assert_eq!(lte.latency_ms, 40);
    }

    #[test]
    fn test_3g_preset_values() {
        let slow = NetworkProfile::from_name("3G").unwrap().unwrap();
        assert_eq!(slow.download_bps, 400_000);
        assert_eq!(slow.latency_ms, 150);
    }

    #[test]
    fn test_none_is_no_throttling() {
        assert!(NetworkProfile::from_name("none").unwrap().is_none());
    }

    #[test]
    fn test_unknown_profile() {
        let err = NetworkProfile::from_name("5g-ultra").unwrap_err();
        assert!(err.to_string().contains("4g-lte"));
    }

    #[test]
    fn test_expected_transfer_for_5mb_on_3g() {
        let slow = NetworkProfile::regular_3g();
        let ms = slow.expected_transfer_ms(5_000_000);
        // 5 MB at 400 kB/s = 12.5 s, plus latency
        assert!((ms - 12_650.0).abs() < 1e-6);
    }

    #[test]
    fn test_zero_bandwidth_never_completes() {
        let stalled = NetworkProfile::new("stalled", 0, 0, 10);
        assert!(stalled.expected_transfer_ms(1).is_infinite());
    }

    #[test]
    fn test_typical_4g_is_8_mbps() {
        let profile = NetworkProfile::typical_4g();
        assert_eq!(profile.download_bps, 1_048_576);
        assert_eq!(profile.to_string(), "4g (8.00 Mbps down, 2.00 Mbps up, 40ms)");
    }

    #[test]
    fn test_display_matches_preset_docs() {
        let fast = NetworkProfile::fast_4g();
        assert!(fast.to_string().contains("12.00 Mbps down, 3.00 Mbps up"));
    }
}
