//! Runtime configuration
//!
//! Mirrors the environment surface of the reconciler: diagnostic mode,
//! owner-reference injection, the managed-by identifier, the optional
//! controller file, and the tick interval.

use std::path::PathBuf;
use std::time::Duration;

/// Reconciler configuration, built from the CLI in `main`
#[derive(Clone, Debug)]
pub struct Config {
    /// Print rendered documents instead of applying them; also disables the
    /// inter-tick wait
    pub debug: bool,

    /// Whether templates should emit owner references
    pub owner_references: bool,

    /// Manager identifier exposed to templates; empty when unset
    pub managed_by: Option<String>,

    /// Controller file path; absent means API mode
    pub controllers: Option<PathBuf>,

    /// Seconds between ticks; zero or negative means run exactly once
    pub interval: f64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            debug: false,
            owner_references: true,
            managed_by: None,
            controllers: None,
            interval: 15.0,
        }
    }
}

impl Config {
    /// True if the reconciler should run a single tick and exit
    pub fn run_once(&self) -> bool {
        self.debug || self.interval <= 0.0
    }

    /// Delay between ticks
    pub fn tick_delay(&self) -> Duration {
        Duration::from_secs_f64(self.interval.max(0.0))
    }
}
