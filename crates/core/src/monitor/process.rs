//! Encoder process monitor.

use chrono::{DateTime, Utc};
use futures::Stream;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::process::{Child, ChildStderr, Command};
use tracing::{debug, info, warn};

use super::config::MonitorConfig;
use super::error::MonitorError;
use super::matcher::match_progress;
use super::prober::MediaProber;
use super::ratio::RatioFn;
use super::reader::{Readiness, StreamReader};
use super::throttle::{ThrottlePolicy, ThrottleState};
use super::types::{EncodeJob, EventStatus, MatchResult, ProgressEvent, RunState};
use crate::config::{validate_monitor_config, ConfigError};
use crate::metrics;
use crate::units::{format_duration, is_pipe_path, parse_duration};

/// Launches encoder runs and monitors them.
pub struct EncodeMonitor {
    config: MonitorConfig,
    prober: Arc<dyn MediaProber>,
    ratio_fn: RatioFn,
    default_input_duration: Duration,
}

impl EncodeMonitor {
    /// Creates a monitor, rejecting unusable configurations up front.
    pub fn new(config: MonitorConfig, prober: Arc<dyn MediaProber>) -> Result<Self, MonitorError> {
        validate_monitor_config(&config)?;
        let default_input_duration = parse_duration(&config.default_input_duration)
            .map_err(|e| ConfigError::ValidationError(e.to_string()))?;

        Ok(Self {
            ratio_fn: config.ratio_strategy.as_fn(),
            config,
            prober,
            default_input_duration,
        })
    }

    /// Replaces the completion ratio computation.
    pub fn with_ratio_fn(mut self, ratio_fn: RatioFn) -> Self {
        self.ratio_fn = ratio_fn;
        self
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    /// Probes the input, launches the encoder and returns the live run.
    ///
    /// Fails only when the encoder cannot be started. The child is not killed
    /// when the returned run is dropped; see [`EncodeRun::kill`].
    pub async fn start(&self, job: EncodeJob) -> Result<EncodeRun, MonitorError> {
        let input_duration = match probe_duration(self.prober.as_ref(), &job.input_path).await {
            Some(duration) => duration,
            None => {
                warn!(
                    "Could not determine duration of {}, assuming {}",
                    job.input_path.display(),
                    format_duration(self.default_input_duration)
                );
                self.default_input_duration
            }
        };
        let input_size = probe_size(self.prober.as_ref(), &job.input_path).await;

        let args = job.build_args();
        info!(
            "Launching {} {}",
            self.config.executable.display(),
            args.join(" ")
        );

        let start_timestamp = Utc::now();
        let started = Instant::now();
        let mut child = Command::new(&self.config.executable)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                metrics::LAUNCH_FAILURES.inc();
                if e.kind() == std::io::ErrorKind::NotFound {
                    MonitorError::ExecutableNotFound {
                        path: self.config.executable.clone(),
                    }
                } else {
                    MonitorError::LaunchFailed {
                        path: self.config.executable.clone(),
                        source: e,
                    }
                }
            })?;

        let stderr = match child.stderr.take() {
            Some(stderr) => stderr,
            None => {
                let _ = child.kill().await;
                return Err(MonitorError::Io(std::io::Error::other(
                    "encoder stderr was not captured",
                )));
            }
        };

        debug!("Encoder started with pid {:?}", child.id());

        Ok(EncodeRun {
            child,
            reader: StreamReader::new(stderr),
            prober: Arc::clone(&self.prober),
            config: self.config.clone(),
            policy: self.config.throttle_policy(),
            ratio_fn: self.ratio_fn,
            output_path: job.resolved_output(),
            input_duration,
            input_size,
            start_timestamp,
            started,
            output: String::new(),
            last_match: None,
            throttle: ThrottleState::default(),
            exit: None,
            state: RunState::Running,
        })
    }
}

#[derive(Debug, Clone, Copy)]
struct ExitOutcome {
    success: bool,
    code: Option<i32>,
}

impl ExitOutcome {
    fn from_status(status: ExitStatus) -> Self {
        Self {
            success: status.success(),
            code: exit_code(status),
        }
    }

    fn unknown() -> Self {
        Self {
            success: false,
            code: None,
        }
    }
}

/// Exit code, or the negated signal number for a killed process.
fn exit_code(status: ExitStatus) -> Option<i32> {
    if let Some(code) = status.code() {
        return Some(code);
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        status.signal().map(|signal| -signal)
    }
    #[cfg(not(unix))]
    {
        None
    }
}

async fn probe_duration(prober: &dyn MediaProber, path: &Path) -> Option<Duration> {
    if is_pipe_path(&path.to_string_lossy()) {
        return None;
    }
    prober.probe_duration(path).await
}

async fn probe_size(prober: &dyn MediaProber, path: &Path) -> u64 {
    if is_pipe_path(&path.to_string_lossy()) {
        return 0;
    }
    prober.probe_size(path).await
}

/// A running encode, consumed as a sequence of [`ProgressEvent`]s.
///
/// The sequence is finite and ends with exactly one `Success` or `Error` event.
pub struct EncodeRun {
    child: Child,
    reader: StreamReader<ChildStderr>,
    prober: Arc<dyn MediaProber>,
    config: MonitorConfig,
    policy: ThrottlePolicy,
    ratio_fn: RatioFn,
    output_path: PathBuf,
    input_duration: Duration,
    input_size: u64,
    start_timestamp: DateTime<Utc>,
    started: Instant,
    output: String,
    last_match: Option<MatchResult>,
    throttle: ThrottleState,
    exit: Option<ExitOutcome>,
    state: RunState,
}

impl EncodeRun {
    /// Waits for the next event. Returns `None` once the terminal event was yielded.
    ///
    /// Dropping the future before it resolves (e.g. in `tokio::select!`) loses
    /// no event: throttle state only advances when a progress event is returned.
    pub async fn next_event(&mut self) -> Option<ProgressEvent> {
        while self.state == RunState::Running {
            if let Some(exit) = self.exit {
                return Some(self.finish(exit).await);
            }
            if let Some(event) = self.read_cycle().await {
                return Some(event);
            }
        }
        None
    }

    /// Turns the run into a stream of events.
    pub fn into_stream(self) -> impl Stream<Item = ProgressEvent> {
        futures::stream::unfold(self, |mut run| async move {
            let event = run.next_event().await?;
            Some((event, run))
        })
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    /// OS process id of the encoder, `None` once it has been reaped.
    pub fn pid(&self) -> Option<u32> {
        self.child.id()
    }

    /// Kills the encoder. The run then ends with an `Error` event.
    pub async fn kill(&mut self) -> Result<(), MonitorError> {
        self.child.kill().await?;
        Ok(())
    }

    pub fn input_duration(&self) -> Duration {
        self.input_duration
    }

    pub fn input_size(&self) -> u64 {
        self.input_size
    }

    pub fn raw_output(&self) -> &str {
        &self.output
    }

    async fn read_cycle(&mut self) -> Option<ProgressEvent> {
        let readiness = match self.reader.poll_readable().await {
            Ok(readiness) => readiness,
            Err(e) => {
                warn!("Failed reading encoder output: {}", e);
                Readiness::Closed
            }
        };

        let chunk = self.reader.read_available();
        let event = if chunk.is_empty() {
            None
        } else {
            self.output.push_str(&chunk);
            self.handle_chunk(&chunk).await
        };

        self.check_exit(readiness == Readiness::Closed).await;
        event
    }

    async fn handle_chunk(&mut self, chunk: &str) -> Option<ProgressEvent> {
        let Some(stats) = match_progress(chunk) else {
            debug!("Encoder: {}", chunk.trim_end());
            return None;
        };

        let elapsed = self.started.elapsed();
        let estimated_output = Duration::try_from_secs_f64(
            self.input_duration.as_secs_f64() * stats.percent / 100.0,
        )
        .ok();
        let ratio = (self.ratio_fn)(
            stats.frame,
            stats.frame_total,
            estimated_output.unwrap_or_default(),
            self.input_duration,
        );

        let mut event = None;
        if self.policy.should_emit(&self.throttle, ratio, elapsed) {
            let output_size = probe_size(self.prober.as_ref(), &self.output_path).await;
            // No await past this point: the emission is recorded only once it is returned.
            self.throttle.record(ratio, elapsed);
            metrics::PROGRESS_EVENTS.inc();

            event = Some(ProgressEvent {
                status: EventStatus::Progress,
                raw_output_so_far: self.output.clone(),
                exit_code: None,
                start_timestamp: self.start_timestamp,
                elapsed_time: elapsed,
                eta: Some(stats.eta),
                input_size: self.input_size,
                input_duration: self.input_duration,
                output_size,
                output_duration: estimated_output,
                percent_complete: stats.percent,
                frames_encoded: stats.frame,
                frames_per_second: stats.fps,
                bitrate: Some(stats.bitrate.clone()),
                quality: None,
                sanity_ok: None,
            });
        }

        self.last_match = Some(stats);
        event
    }

    async fn check_exit(&mut self, stream_closed: bool) {
        let status = match self.child.try_wait() {
            Ok(Some(status)) => Ok(status),
            // Nothing more can be read, so blocking on exit is the only way forward.
            Ok(None) if stream_closed => self.child.wait().await,
            Ok(None) => return,
            Err(e) => Err(e),
        };

        self.exit = Some(match status {
            Ok(status) => ExitOutcome::from_status(status),
            Err(e) => {
                warn!("Failed to collect encoder exit status: {}", e);
                ExitOutcome::unknown()
            }
        });
    }

    async fn finish(&mut self, exit: ExitOutcome) -> ProgressEvent {
        let tail = self.reader.drain_ready();
        self.output.push_str(&tail);

        let elapsed = self.started.elapsed();
        let output_duration = probe_duration(self.prober.as_ref(), &self.output_path).await;
        let output_size = probe_size(self.prober.as_ref(), &self.output_path).await;

        let sanity_ratio = match output_duration {
            Some(duration) if !self.input_duration.is_zero() => {
                duration.as_secs_f64() / self.input_duration.as_secs_f64()
            }
            _ => 0.0,
        };
        let sanity_ok = self.config.is_sane_ratio(sanity_ratio);

        let (status, percent) = if exit.success {
            self.state = RunState::Succeeded;
            (EventStatus::Success, 100.0)
        } else {
            self.state = RunState::Failed;
            let percent = self.last_match.as_ref().map_or(0.0, |m| m.percent);
            (EventStatus::Error, percent)
        };

        metrics::RUNS_TOTAL
            .with_label_values(&[if exit.success { "success" } else { "error" }])
            .inc();
        metrics::RUN_DURATION.observe(elapsed.as_secs_f64());

        if !sanity_ok {
            metrics::SANITY_FAILURES.inc();
            warn!(
                "Output duration ratio {:.3} of {} is outside [{}, {}]",
                sanity_ratio,
                self.output_path.display(),
                self.config.sanity_min_ratio,
                self.config.sanity_max_ratio
            );
        }
        if exit.success {
            info!(
                "Encoder finished in {} ({} bytes written)",
                format_duration(elapsed),
                output_size
            );
        } else {
            warn!(
                "Encoder failed with exit code {:?} after {}",
                exit.code,
                format_duration(elapsed)
            );
        }

        let last = self.last_match.as_ref();
        ProgressEvent {
            status,
            raw_output_so_far: self.output.clone(),
            exit_code: exit.code,
            start_timestamp: self.start_timestamp,
            elapsed_time: elapsed,
            eta: None,
            input_size: self.input_size,
            input_duration: self.input_duration,
            output_size,
            output_duration,
            percent_complete: percent,
            frames_encoded: last.map_or(0, |m| m.frame),
            frames_per_second: last.map_or(0.0, |m| m.fps),
            bitrate: last.map(|m| m.bitrate.clone()),
            quality: None,
            sanity_ok: Some(sanity_ok),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockProber;

    #[test]
    fn test_rejects_invalid_config() {
        let config = MonitorConfig::default().with_default_input_duration("soon");
        let result = EncodeMonitor::new(config, Arc::new(MockProber::new()));
        assert!(matches!(result, Err(MonitorError::InvalidConfig(_))));

        let config = MonitorConfig::default().with_sanity_band(1.1, 0.9);
        assert!(EncodeMonitor::new(config, Arc::new(MockProber::new())).is_err());
    }

    #[tokio::test]
    async fn test_missing_executable() {
        let monitor = EncodeMonitor::new(
            MonitorConfig::with_executable("/nonexistent/x264"),
            Arc::new(MockProber::new()),
        )
        .unwrap();

        let result = monitor.start(EncodeJob::new("/in.y4m")).await;
        assert!(matches!(
            result,
            Err(MonitorError::ExecutableNotFound { .. })
        ));
    }

    #[cfg(unix)]
    #[test]
    fn test_exit_code_of_signal() {
        use std::os::unix::process::ExitStatusExt;
        assert_eq!(exit_code(ExitStatus::from_raw(0)), Some(0));
        assert_eq!(exit_code(ExitStatus::from_raw(1 << 8)), Some(1));
        assert_eq!(exit_code(ExitStatus::from_raw(9)), Some(-9));
    }

    #[tokio::test]
    async fn test_pipe_paths_are_not_probed() {
        let prober = MockProber::new();
        prober.set_duration("-", Duration::from_secs(10)).await;

        assert_eq!(probe_duration(&prober, Path::new("-")).await, None);
        assert_eq!(probe_size(&prober, Path::new("pipe:1")).await, 0);
        assert!(prober.probed_paths().await.is_empty());
    }

    /// Never answers size probes for `output`.
    struct StallingProber {
        output: PathBuf,
    }

    #[async_trait::async_trait]
    impl MediaProber for StallingProber {
        async fn probe_duration(&self, _path: &Path) -> Option<Duration> {
            Some(Duration::from_secs(10))
        }

        async fn probe_size(&self, path: &Path) -> u64 {
            if path == self.output {
                std::future::pending::<()>().await;
            }
            0
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_interrupted_emission_keeps_throttle_state() {
        let output = PathBuf::from("/nonexistent/stalled.264");
        let monitor = EncodeMonitor::new(
            MonitorConfig::with_executable("sh").with_deltas(0.0, 0.0, 5.0),
            Arc::new(StallingProber {
                output: output.clone(),
            }),
        )
        .unwrap();
        let job = EncodeJob::new("/in.y4m")
            .with_output(&output)
            .with_args(["-c", "exit 0"]);
        let mut run = monitor.start(job).await.unwrap();

        let line = "[50.0%] 100/200 frames, 24.00 fps, 1500.00 kb/s, eta 0:00:05";
        let result =
            tokio::time::timeout(Duration::from_millis(50), run.handle_chunk(line)).await;

        assert!(result.is_err());
        assert_eq!(run.throttle, ThrottleState::default());
    }
}
