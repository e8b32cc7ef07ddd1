//! Completion ratio strategies.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Computes a completion ratio in `[0, 1]` from the encoder's frame counters
/// and the media position reached so far.
pub type RatioFn = fn(frame: u64, frame_total: u64, position: Duration, total: Duration) -> f64;

/// Built-in ways of measuring completion.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RatioStrategy {
    /// Encoded frames over total frames.
    #[default]
    FrameBased,
    /// Estimated output duration over input duration.
    TimeBased,
}

impl RatioStrategy {
    pub fn as_fn(&self) -> RatioFn {
        match self {
            Self::FrameBased => frame_ratio,
            Self::TimeBased => time_ratio,
        }
    }
}

/// `frame / frame_total`, zero when the total is unknown.
pub fn frame_ratio(frame: u64, frame_total: u64, _position: Duration, _total: Duration) -> f64 {
    if frame_total == 0 {
        0.0
    } else {
        frame as f64 / frame_total as f64
    }
}

/// `position / total`, zero when the total duration is unknown.
pub fn time_ratio(_frame: u64, _frame_total: u64, position: Duration, total: Duration) -> f64 {
    if total.is_zero() {
        0.0
    } else {
        position.as_secs_f64() / total.as_secs_f64()
    }
}
