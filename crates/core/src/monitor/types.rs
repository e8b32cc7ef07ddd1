//! Types for the monitor module.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Output path used when a job does not name one.
pub const NULL_OUTPUT: &str = "/dev/null";

/// Status carried by a progress event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventStatus {
    /// The encoder is still running.
    Progress,
    /// The encoder exited normally.
    Success,
    /// The encoder exited with a non-zero code or was killed.
    Error,
}

impl EventStatus {
    /// Whether this status ends a run.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Progress)
    }
}

/// Lifecycle state of a monitored run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    Running,
    Succeeded,
    Failed,
}

/// Snapshot of an encoding run.
///
/// A run yields any number of `Progress` events followed by exactly one
/// `Success` or `Error` event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressEvent {
    pub status: EventStatus,
    /// Everything the encoder wrote to stderr up to this event.
    pub raw_output_so_far: String,
    /// Exit code, negative signal number when killed. Absent while running.
    pub exit_code: Option<i32>,
    pub start_timestamp: DateTime<Utc>,
    #[serde(with = "secs")]
    pub elapsed_time: Duration,
    /// Remaining time as reported by the encoder. Absent on terminal events.
    #[serde(with = "opt_secs")]
    pub eta: Option<Duration>,
    pub input_size: u64,
    #[serde(with = "secs")]
    pub input_duration: Duration,
    /// Size of the output file, measured when the event was built.
    pub output_size: u64,
    /// Estimated while running, probed from the finished file at the end.
    #[serde(with = "opt_secs")]
    pub output_duration: Option<Duration>,
    pub percent_complete: f64,
    pub frames_encoded: u64,
    pub frames_per_second: f64,
    /// Bit rate token exactly as printed by the encoder.
    pub bitrate: Option<String>,
    /// Never reported by the encoder.
    pub quality: Option<f64>,
    /// Duration sanity verdict. Only set on terminal events.
    pub sanity_ok: Option<bool>,
}

impl ProgressEvent {
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Whether the run succeeded and produced an output of plausible duration.
    pub fn is_healthy(&self) -> bool {
        self.status == EventStatus::Success && self.sanity_ok == Some(true)
    }
}

/// Fields extracted from one encoder progress line.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchResult {
    pub percent: f64,
    pub frame: u64,
    pub frame_total: u64,
    pub fps: f64,
    pub bitrate: String,
    pub eta: Duration,
}

/// An encode to launch and monitor.
#[derive(Debug, Clone)]
pub struct EncodeJob {
    pub input_path: PathBuf,
    /// Destination file. `None` encodes to `/dev/null`.
    pub output_path: Option<PathBuf>,
    /// Encoder arguments placed before `-o <output> <input>`.
    pub encoder_args: Vec<String>,
}

impl EncodeJob {
    pub fn new(input_path: impl Into<PathBuf>) -> Self {
        Self {
            input_path: input_path.into(),
            output_path: None,
            encoder_args: Vec::new(),
        }
    }

    pub fn with_output(mut self, output_path: impl Into<PathBuf>) -> Self {
        self.output_path = Some(output_path.into());
        self
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.encoder_args = args.into_iter().map(Into::into).collect();
        self
    }

    /// The destination the encoder writes to.
    pub fn resolved_output(&self) -> PathBuf {
        self.output_path
            .clone()
            .unwrap_or_else(|| PathBuf::from(NULL_OUTPUT))
    }

    /// Builds the argument vector passed after the executable.
    pub fn build_args(&self) -> Vec<String> {
        let mut args = self.encoder_args.clone();
        args.extend([
            "-o".to_string(),
            self.resolved_output().to_string_lossy().to_string(),
            self.input_path.to_string_lossy().to_string(),
        ]);
        args
    }
}

mod secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(value.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(serde::de::Error::custom)
    }
}

mod opt_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(
        value: &Option<Duration>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(d) => serializer.serialize_some(&d.as_secs_f64()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Duration>, D::Error> {
        Option::<f64>::deserialize(deserializer)?
            .map(Duration::try_from_secs_f64)
            .transpose()
            .map_err(serde::de::Error::custom)
    }
}
