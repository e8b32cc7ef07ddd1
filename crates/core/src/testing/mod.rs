//! Testing utilities and mock implementations.
//!
//! Lets monitor runs be exercised without ffprobe installed.
//!
//! # Example
//!
//! ```rust,ignore
//! use encwatch_core::testing::MockProber;
//!
//! let prober = MockProber::new();
//! prober.set_duration("/in.y4m", Duration::from_secs(60)).await;
//! let monitor = EncodeMonitor::new(config, Arc::new(prober))?;
//! ```

mod mock_prober;

pub use mock_prober::MockProber;

/// Test fixtures and helper functions.
pub mod fixtures {
    /// Build an x264-style progress line.
    pub fn progress_line(percent: f64, frame: u64, frame_total: u64, eta: &str) -> String {
        format!(
            "[{:.1}%] {}/{} frames, 24.00 fps, 1500.00 kb/s, eta {}",
            percent, frame, frame_total, eta
        )
    }

    /// Shell script that prints progress lines to stderr, writes the output
    /// file named by `$1` and exits with `code`.
    ///
    /// Intended for `MonitorConfig::with_executable("sh")` with the script
    /// passed as `-c <script>`; the monitor then appends `-o <output> <input>`
    /// which the shell exposes as `$0`, `$1` and `$2`.
    pub fn encoder_script(lines: &[String], delay_secs: f64, code: i32) -> String {
        let mut script = String::new();
        for line in lines {
            script.push_str(&format!("printf '%s\\n' '{}' >&2\n", line));
            if delay_secs > 0.0 {
                script.push_str(&format!("sleep {}\n", delay_secs));
            }
        }
        script.push_str("printf 'encoded' > \"$1\"\n");
        script.push_str(&format!("exit {}\n", code));
        script
    }

}
