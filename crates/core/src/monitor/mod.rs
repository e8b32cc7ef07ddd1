//! Monitor module for external encoder processes.
//!
//! This module launches an encoder (x264 by default), reads its stderr as it
//! arrives and turns the progress lines it prints into a throttled sequence of
//! [`ProgressEvent`]s, ending with a single terminal event that carries the
//! exit code and a duration sanity check of the produced file.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use encwatch_core::monitor::{EncodeJob, EncodeMonitor, FfprobeProber, MonitorConfig};
//!
//! let monitor = EncodeMonitor::new(MonitorConfig::default(), Arc::new(FfprobeProber::default()))?;
//!
//! let job = EncodeJob::new("/path/to/input.y4m")
//!     .with_output("/path/to/output.264")
//!     .with_args(["--crf", "23"]);
//!
//! let mut run = monitor.start(job).await?;
//! while let Some(event) = run.next_event().await {
//!     println!("{:?} {:.1}%", event.status, event.percent_complete);
//! }
//! ```

mod config;
mod error;
mod matcher;
mod process;
mod prober;
mod ratio;
mod reader;
mod throttle;
mod types;

pub use config::MonitorConfig;
pub use error::{MonitorError, ProbeError};
pub use matcher::match_progress;
pub use process::{EncodeMonitor, EncodeRun};
pub use prober::{FfprobeProber, MediaProber};
pub use ratio::{frame_ratio, time_ratio, RatioFn, RatioStrategy};
pub use reader::{Readiness, StreamReader};
pub use throttle::{ThrottlePolicy, ThrottleState};
pub use types::{EncodeJob, EventStatus, MatchResult, ProgressEvent, RunState, NULL_OUTPUT};
