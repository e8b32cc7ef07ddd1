//! Rate limiting of progress events.

use std::time::Duration;

/// Ratio and elapsed time of the last emitted event.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ThrottleState {
    pub previous_ratio: f64,
    pub previous_elapsed: Duration,
}

impl ThrottleState {
    /// Records an emission. Call only after [`ThrottlePolicy::should_emit`] returned true.
    pub fn record(&mut self, ratio: f64, elapsed: Duration) {
        self.previous_ratio = ratio;
        self.previous_elapsed = elapsed;
    }
}

/// Bounds how often progress is reported.
///
/// An event goes out once both the completion ratio advanced by more than
/// `ratio_delta` and more than `time_delta` passed, or unconditionally once
/// more than `max_time_delta` passed since the last one.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThrottlePolicy {
    pub ratio_delta: f64,
    pub time_delta: Duration,
    pub max_time_delta: Duration,
}

impl Default for ThrottlePolicy {
    fn default() -> Self {
        Self {
            ratio_delta: 0.01,
            time_delta: Duration::from_secs(1),
            max_time_delta: Duration::from_secs(5),
        }
    }
}

impl ThrottlePolicy {
    pub fn should_emit(
        &self,
        state: &ThrottleState,
        current_ratio: f64,
        current_elapsed: Duration,
    ) -> bool {
        let since_last = current_elapsed.saturating_sub(state.previous_elapsed);
        let progressed = current_ratio - state.previous_ratio > self.ratio_delta;
        (progressed && since_last > self.time_delta) || since_last > self.max_time_delta
    }
}
