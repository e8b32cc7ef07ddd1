pub mod config;
pub mod metrics;
pub mod monitor;
pub mod testing;
pub mod units;

pub use config::{
    load_config, load_config_from_env, load_config_from_str, validate_config, Config,
    ConfigError, ProberConfig,
};
pub use monitor::{
    EncodeJob, EncodeMonitor, EncodeRun, EventStatus, FfprobeProber, MediaProber, MonitorConfig,
    MonitorError, ProgressEvent, RunState,
};
pub use units::{format_duration, parse_duration, ParseError};
