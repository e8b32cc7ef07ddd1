//! Configuration for the monitor module.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use super::ratio::RatioStrategy;
use super::throttle::ThrottlePolicy;

/// Configuration for monitoring an encoder run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Path to the encoder binary.
    #[serde(default = "default_executable")]
    pub executable: PathBuf,

    /// Input duration (`H:MM:SS`) assumed when probing the input fails.
    #[serde(default = "default_input_duration")]
    pub default_input_duration: String,

    /// Minimum completion ratio advance between two progress events.
    #[serde(default = "default_ratio_delta")]
    pub ratio_delta: f64,

    /// Minimum seconds between two progress events.
    #[serde(default = "default_time_delta")]
    pub time_delta_secs: f64,

    /// Seconds after which a progress event is sent regardless of progress.
    #[serde(default = "default_max_time_delta")]
    pub max_time_delta_secs: f64,

    /// Lowest accepted output/input duration ratio.
    #[serde(default = "default_sanity_min_ratio")]
    pub sanity_min_ratio: f64,

    /// Highest accepted output/input duration ratio.
    #[serde(default = "default_sanity_max_ratio")]
    pub sanity_max_ratio: f64,

    /// How the completion ratio is measured.
    #[serde(default)]
    pub ratio_strategy: RatioStrategy,
}

fn default_executable() -> PathBuf {
    PathBuf::from("x264")
}

fn default_input_duration() -> String {
    "00:00:00".to_string()
}

fn default_ratio_delta() -> f64 {
    0.01
}

fn default_time_delta() -> f64 {
    1.0
}

fn default_max_time_delta() -> f64 {
    5.0
}

fn default_sanity_min_ratio() -> f64 {
    0.95
}

fn default_sanity_max_ratio() -> f64 {
    1.05
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            executable: default_executable(),
            default_input_duration: default_input_duration(),
            ratio_delta: default_ratio_delta(),
            time_delta_secs: default_time_delta(),
            max_time_delta_secs: default_max_time_delta(),
            sanity_min_ratio: default_sanity_min_ratio(),
            sanity_max_ratio: default_sanity_max_ratio(),
            ratio_strategy: RatioStrategy::default(),
        }
    }
}

impl MonitorConfig {
    /// Creates a config for a custom encoder binary.
    pub fn with_executable(executable: impl Into<PathBuf>) -> Self {
        Self {
            executable: executable.into(),
            ..Default::default()
        }
    }

    /// Sets the throttle thresholds.
    pub fn with_deltas(mut self, ratio_delta: f64, time_delta_secs: f64, max_time_delta_secs: f64) -> Self {
        self.ratio_delta = ratio_delta;
        self.time_delta_secs = time_delta_secs;
        self.max_time_delta_secs = max_time_delta_secs;
        self
    }

    /// Sets the accepted output/input duration band.
    pub fn with_sanity_band(mut self, min_ratio: f64, max_ratio: f64) -> Self {
        self.sanity_min_ratio = min_ratio;
        self.sanity_max_ratio = max_ratio;
        self
    }

    /// Sets the fallback input duration.
    pub fn with_default_input_duration(mut self, duration: impl Into<String>) -> Self {
        self.default_input_duration = duration.into();
        self
    }

    /// Sets the completion ratio strategy.
    pub fn with_ratio_strategy(mut self, strategy: RatioStrategy) -> Self {
        self.ratio_strategy = strategy;
        self
    }

    pub fn time_delta(&self) -> Duration {
        Duration::try_from_secs_f64(self.time_delta_secs).unwrap_or_default()
    }

    pub fn max_time_delta(&self) -> Duration {
        Duration::try_from_secs_f64(self.max_time_delta_secs).unwrap_or_default()
    }

    pub fn throttle_policy(&self) -> ThrottlePolicy {
        ThrottlePolicy {
            ratio_delta: self.ratio_delta,
            time_delta: self.time_delta(),
            max_time_delta: self.max_time_delta(),
        }
    }

    /// Whether an output/input duration ratio falls inside the sanity band.
    pub fn is_sane_ratio(&self, ratio: f64) -> bool {
        self.sanity_min_ratio <= ratio && ratio <= self.sanity_max_ratio
    }
}
