//! Environment configuration applied to a fresh page context.

use crate::driver::PageDriver;
use crate::result::{HarnessError, HarnessResult};
use crate::scenario::Scenario;
use tracing::debug;

/// Applies viewport, device emulation and network throttling before navigation
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvironmentConfigurator;

impl EnvironmentConfigurator {
    /// Configure `driver` for `scenario`
    ///
    /// Capabilities are checked before anything is touched, so an
    /// unsupported request leaves the context unmodified.
    ///
    /// # Errors
    ///
    /// `UnsupportedFeature` if the driver lacks a requested capability or the
    /// engine rejects throttling; driver errors otherwise.
    pub async fn apply<D: PageDriver + ?Sized>(
        driver: &mut D,
        scenario: &Scenario,
    ) -> HarnessResult<()> {
        let caps = driver.capabilities();
        if scenario.network.is_some() && !caps.network_throttling {
            return Err(HarnessError::unsupported(
                "network throttling",
                "the browser engine cannot emulate network conditions",
            ));
        }
        if scenario.device.is_some() && !caps.device_emulation {
            return Err(HarnessError::unsupported(
                "device emulation",
                "the browser engine cannot emulate devices",
            ));
        }

        match scenario.device {
            Some(ref device) => {
                debug!(scenario = %scenario.name, device = %device.name, "emulating device");
                driver.emulate_device(device).await?;
            }
            None => {
                debug!(scenario = %scenario.name, viewport = %scenario.viewport, "setting viewport");
                driver.set_viewport(scenario.viewport).await?;
            }
        }

        if let Some(ref profile) = scenario.network {
            debug!(scenario = %scenario.name, profile = %profile, "throttling network");
            driver.throttle_network(profile).await.map_err(|e| match e {
                HarnessError::UnsupportedFeature { .. } => e,
                other => HarnessError::unsupported("network throttling", other.to_string()),
            })?;
        }
        Ok(())
    }
}
