//! Media duration and size discovery.

use async_trait::async_trait;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::debug;

use super::error::ProbeError;

/// Measures media files for the monitor.
///
/// Both probes are infallible from the monitor's point of view: an unknown
/// duration is `None` and a missing file has size 0.
#[async_trait]
pub trait MediaProber: Send + Sync {
    /// Returns the media duration of `path`, if it can be determined.
    async fn probe_duration(&self, path: &Path) -> Option<Duration>;

    /// Returns the size of `path` in bytes, 0 if it does not exist yet.
    async fn probe_size(&self, path: &Path) -> u64;
}

/// Prober backed by `ffprobe` for durations and filesystem metadata for sizes.
#[derive(Debug, Clone)]
pub struct FfprobeProber {
    ffprobe_path: PathBuf,
}

impl Default for FfprobeProber {
    fn default() -> Self {
        Self::new(PathBuf::from("ffprobe"))
    }
}

impl FfprobeProber {
    pub fn new(ffprobe_path: PathBuf) -> Self {
        Self { ffprobe_path }
    }

    /// Runs ffprobe against `path` and reads the container duration.
    pub async fn duration(&self, path: &Path) -> Result<Duration, ProbeError> {
        let output = Command::new(&self.ffprobe_path)
            .args(["-v", "quiet", "-print_format", "json", "-show_format"])
            .arg(path)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    ProbeError::FfprobeNotFound {
                        path: self.ffprobe_path.clone(),
                    }
                } else {
                    ProbeError::Io(e)
                }
            })?;

        if !output.status.success() {
            return Err(ProbeError::probe_failed(format!(
                "ffprobe exited with {:?} for {}",
                output.status.code(),
                path.display()
            )));
        }

        Self::parse_format_duration(&String::from_utf8_lossy(&output.stdout))
    }

    /// Extracts `format.duration` from ffprobe JSON output.
    fn parse_format_duration(output: &str) -> Result<Duration, ProbeError> {
        #[derive(Deserialize)]
        struct ProbeOutput {
            format: ProbeFormat,
        }

        #[derive(Deserialize)]
        struct ProbeFormat {
            duration: Option<String>,
        }

        let probe: ProbeOutput = serde_json::from_str(output)
            .map_err(|e| ProbeError::parse_error(format!("Failed to parse ffprobe output: {}", e)))?;

        let raw = probe
            .format
            .duration
            .ok_or_else(|| ProbeError::parse_error("ffprobe reported no duration"))?;

        raw.parse::<f64>()
            .ok()
            .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
            .ok_or_else(|| ProbeError::parse_error(format!("Invalid duration: {}", raw)))
    }
}

#[async_trait]
impl MediaProber for FfprobeProber {
    async fn probe_duration(&self, path: &Path) -> Option<Duration> {
        match self.duration(path).await {
            Ok(duration) => Some(duration),
            Err(e) => {
                debug!("Duration probe failed for {}: {}", path.display(), e);
                None
            }
        }
    }

    async fn probe_size(&self, path: &Path) -> u64 {
        tokio::fs::metadata(path)
            .await
            .map(|meta| meta.len())
            .unwrap_or(0)
    }
}
