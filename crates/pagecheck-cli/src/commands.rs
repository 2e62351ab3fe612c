//! CLI argument definitions using clap

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// pagecheck: verify a page renders and behaves under emulated devices and networks
#[derive(Parser, Debug)]
#[command(name = "pagecheck")]
#[command(author, version, about, long_about = None)]
#[allow(clippy::struct_excessive_bools)]
pub struct Cli {
    /// Page to check: file path, `host:port[/path]` or URL
    #[arg(short, long)]
    pub target: Option<String>,

    /// Viewport as WxH; repeat for a sweep, `all` for the four audit viewports
    #[arg(long = "viewport", value_name = "WxH")]
    pub viewports: Vec<String>,

    /// Device preset (e.g. "iPhone 13", "Pixel 7")
    #[arg(long)]
    pub device: Option<String>,

    /// Network profile (4g-lte, 3g, 4g, 4g-fast, none)
    #[arg(long)]
    pub network: Option<String>,

    /// Check suite: built-in name or .yaml/.yml/.json suite file
    #[arg(long)]
    pub checks: Option<String>,

    /// Report directory
    #[arg(short, long)]
    pub out: Option<PathBuf>,

    /// Readiness condition before checks run
    #[arg(long, value_enum)]
    pub wait_until: Option<WaitArg>,

    /// Navigation timeout in milliseconds
    #[arg(long, value_name = "MS")]
    pub timeout: Option<u64>,

    /// Pause after readiness before evaluating, in milliseconds
    #[arg(long, value_name = "MS")]
    pub settle: Option<u64>,

    /// Skip screenshots
    #[arg(long)]
    pub no_screenshots: bool,

    /// Run settings file (.yaml/.yml/.json)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Serve a directory over HTTP for the duration of the run
    #[arg(long, value_name = "DIR")]
    pub serve: Option<PathBuf>,

    /// Port for --serve
    #[arg(long, default_value = "7777")]
    pub port: u16,

    /// Chromium executable
    #[arg(long, env = "CHROMIUM_PATH")]
    pub chromium: Option<String>,

    /// Show the browser window
    #[arg(long)]
    pub headed: bool,

    /// Disable the Chromium sandbox (containers, CI)
    #[arg(long)]
    pub no_sandbox: bool,

    /// List device and network presets, then exit
    #[arg(long)]
    pub list_presets: bool,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (suppress non-error output)
    #[arg(short, long)]
    pub quiet: bool,

    /// Color output (auto, always, never)
    #[arg(long, default_value = "auto")]
    pub color: ColorArg,
}

/// `--wait-until` values
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum WaitArg {
    /// DOMContentLoaded
    Dom,
    /// Window load event
    Load,
    /// Load plus a quiet network window
    Idle,
    /// Wait up to --timeout, checking whatever has rendered
    Timeout,
}

impl WaitArg {
    /// Spelling accepted by `Readiness::from_cli`
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Dom => "dom",
            Self::Load => "load",
            Self::Idle => "idle",
            Self::Timeout => "timeout",
        }
    }
}

/// Color argument for CLI
#[derive(ValueEnum, Clone, Debug, Default)]
pub enum ColorArg {
    /// Automatic color detection
    #[default]
    Auto,
    /// Always use colors
    Always,
    /// Never use colors
    Never,
}

impl From<ColorArg> for crate::config::ColorChoice {
    fn from(arg: ColorArg) -> Self {
        match arg {
            ColorArg::Auto => Self::Auto,
            ColorArg::Always => Self::Always,
            ColorArg::Never => Self::Never,
        }
    }
}
