//! Mock media prober for testing.

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use crate::monitor::MediaProber;

/// Mock implementation of the MediaProber trait.
///
/// Durations are served from a table; unknown paths report the default
/// duration (none unless configured). Sizes come from the table too, and
/// otherwise from the real file on disk so a scripted encoder that writes
/// its output is measured as it grows.
///
/// # Example
///
/// ```rust,ignore
/// use encwatch_core::testing::MockProber;
///
/// let prober = MockProber::new();
/// prober.set_duration("/in.y4m", Duration::from_secs(60)).await;
/// prober.set_duration("/out.264", Duration::from_secs(60)).await;
///
/// let monitor = EncodeMonitor::new(config, Arc::new(prober.clone()))?;
/// // ...
/// assert_eq!(prober.probed_paths().await.len(), 2);
/// ```
#[derive(Debug, Clone, Default)]
pub struct MockProber {
    durations: Arc<RwLock<HashMap<PathBuf, Duration>>>,
    sizes: Arc<RwLock<HashMap<PathBuf, u64>>>,
    /// Duration reported for paths missing from the table.
    default_duration: Arc<RwLock<Option<Duration>>>,
    /// Every path passed to `probe_duration`, in call order.
    probed: Arc<RwLock<Vec<PathBuf>>>,
}

impl MockProber {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the duration reported for `path`.
    pub async fn set_duration(&self, path: impl AsRef<Path>, duration: Duration) {
        self.durations
            .write()
            .await
            .insert(path.as_ref().to_path_buf(), duration);
    }

    /// Set the size reported for `path`, overriding the file on disk.
    pub async fn set_size(&self, path: impl AsRef<Path>, size: u64) {
        self.sizes
            .write()
            .await
            .insert(path.as_ref().to_path_buf(), size);
    }

    /// Set the duration reported for unknown paths.
    pub async fn set_default_duration(&self, duration: Option<Duration>) {
        *self.default_duration.write().await = duration;
    }

    /// Paths whose duration was probed.
    pub async fn probed_paths(&self) -> Vec<PathBuf> {
        self.probed.read().await.clone()
    }
}

#[async_trait]
impl MediaProber for MockProber {
    async fn probe_duration(&self, path: &Path) -> Option<Duration> {
        self.probed.write().await.push(path.to_path_buf());

        if let Some(duration) = self.durations.read().await.get(path) {
            return Some(*duration);
        }
        *self.default_duration.read().await
    }

    async fn probe_size(&self, path: &Path) -> u64 {
        if let Some(size) = self.sizes.read().await.get(path) {
            return *size;
        }
        tokio::fs::metadata(path)
            .await
            .map(|meta| meta.len())
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[tokio::test]
    async fn test_configured_duration() {
        let prober = MockProber::new();
        prober
            .set_duration("/in.y4m", Duration::from_secs(42))
            .await;

        assert_eq!(
            prober.probe_duration(Path::new("/in.y4m")).await,
            Some(Duration::from_secs(42))
        );
        assert_eq!(prober.probe_duration(Path::new("/other.y4m")).await, None);
        assert_eq!(prober.probed_paths().await.len(), 2);
    }

    #[tokio::test]
    async fn test_default_duration() {
        let prober = MockProber::new();
        prober.set_default_duration(Some(Duration::from_secs(7))).await;
        assert_eq!(
            prober.probe_duration(Path::new("/any")).await,
            Some(Duration::from_secs(7))
        );
    }

    #[tokio::test]
    async fn test_size_falls_back_to_disk() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"0123456789").unwrap();
        file.flush().unwrap();

        let prober = MockProber::new();
        assert_eq!(prober.probe_size(file.path()).await, 10);
        assert_eq!(prober.probe_size(Path::new("/nonexistent/out.264")).await, 0);

        prober.set_size(file.path(), 4096).await;
        assert_eq!(prober.probe_size(file.path()).await, 4096);
    }
}
