use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::monitor::MonitorConfig;

/// Root configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub monitor: MonitorConfig,
    #[serde(default)]
    pub prober: ProberConfig,
}

/// Media prober configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProberConfig {
    #[serde(default = "default_ffprobe_path")]
    pub ffprobe_path: PathBuf,
}

impl Default for ProberConfig {
    fn default() -> Self {
        Self {
            ffprobe_path: default_ffprobe_path(),
        }
    }
}

fn default_ffprobe_path() -> PathBuf {
    PathBuf::from("ffprobe")
}
