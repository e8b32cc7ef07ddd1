use super::{types::Config, ConfigError};
use crate::monitor::MonitorConfig;
use crate::units::parse_duration;

/// Validate configuration
/// Currently validates:
/// - Monitor section (see `validate_monitor_config`)
/// - ffprobe path is not empty
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    validate_monitor_config(&config.monitor)?;

    if config.prober.ffprobe_path.as_os_str().is_empty() {
        return Err(ConfigError::ValidationError(
            "prober.ffprobe_path cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validate monitor configuration
/// - executable is not empty
/// - default_input_duration parses as `H:MM:SS`
/// - deltas are finite and non-negative, time_delta <= max_time_delta
/// - sanity_min_ratio <= sanity_max_ratio
pub fn validate_monitor_config(config: &MonitorConfig) -> Result<(), ConfigError> {
    if config.executable.as_os_str().is_empty() {
        return Err(ConfigError::ValidationError(
            "monitor.executable cannot be empty".to_string(),
        ));
    }

    parse_duration(&config.default_input_duration).map_err(|e| {
        ConfigError::ValidationError(format!("monitor.default_input_duration: {}", e))
    })?;

    for (name, value) in [
        ("ratio_delta", config.ratio_delta),
        ("time_delta_secs", config.time_delta_secs),
        ("max_time_delta_secs", config.max_time_delta_secs),
    ] {
        if !value.is_finite() || value < 0.0 {
            return Err(ConfigError::ValidationError(format!(
                "monitor.{} must be a non-negative number, got {}",
                name, value
            )));
        }
    }

    if config.time_delta_secs > config.max_time_delta_secs {
        return Err(ConfigError::ValidationError(
            "monitor.time_delta_secs cannot exceed monitor.max_time_delta_secs".to_string(),
        ));
    }

    if config.sanity_min_ratio.is_nan()
        || config.sanity_max_ratio.is_nan()
        || config.sanity_min_ratio > config.sanity_max_ratio
    {
        return Err(ConfigError::ValidationError(
            "monitor.sanity_min_ratio cannot exceed monitor.sanity_max_ratio".to_string(),
        ));
    }

    Ok(())
}
