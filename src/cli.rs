use clap::Parser;
use std::path::PathBuf;

// Build version with target info
const VERSION_INFO: &str = const_format::concatcp!(
    env!("CARGO_PKG_VERSION"), "\n",
    "Backends: html5_video, flash, no_op\n",
    "Target:   ", std::env::consts::ARCH, "-", std::env::consts::OS
);

/// Media playback core: selects a backend for a resource and runs a simulated session
#[derive(Parser, Debug)]
#[command(author, version = VERSION_INFO, about, long_about = None)]
pub struct Args {
    /// Media resource URL (e.g. http://cdn.tv/clip.mp4)
    #[arg(value_name = "RESOURCE")]
    pub resource: String,

    /// Start playing as soon as the backend is ready
    #[arg(short = 'a', long = "autoplay")]
    pub autoplay: bool,

    /// Simulate a browser without the plugin installed
    #[arg(long = "no-flash")]
    pub no_flash: bool,

    /// Simulate a mobile browser (no plugin)
    #[arg(long = "mobile")]
    pub mobile: bool,

    /// Page location, read for a `?t=1m30s` start offset
    #[arg(long = "page-url", value_name = "URL")]
    pub page_url: Option<String>,

    /// Simulated backend becomes ready on this readiness check
    #[arg(long = "ready-after", value_name = "N", default_value = "1")]
    pub ready_after: u32,

    /// Simulated plugin never becomes interactive (bootstrap runs out of attempts)
    #[arg(long = "never-ready")]
    pub never_ready: bool,

    /// Media duration reported by the simulated backend, in seconds
    #[arg(short = 'd', long = "duration", value_name = "SECONDS", default_value = "30")]
    pub duration: f64,

    /// Enable debug logging to file (default: clapboard.log)
    #[arg(short = 'l', long = "log", value_name = "LOG_FILE")]
    pub log_file: Option<Option<PathBuf>>,

    /// Increase logging verbosity (default: warn, -v: info, -vv: debug, -vvv+: trace)
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count)]
    pub verbosity: u8,

    /// Custom configuration directory (overrides default platform paths)
    #[arg(short = 'c', long = "config-dir", value_name = "DIR")]
    pub config_dir: Option<PathBuf>,
}
