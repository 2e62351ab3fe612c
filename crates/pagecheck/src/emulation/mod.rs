//! Device Emulation and Network Throttling
//!
//! Viewports, device profiles and bandwidth/latency presets applied to a
//! browser context before navigation.

mod device;
mod network;

pub use device::{DeviceDescriptor, DeviceEmulator, Viewport};
pub use network::NetworkProfile;
