//! encwatch - runs an encoder and reports its progress as JSON lines.

mod output;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use encwatch_core::{
    load_config, load_config_from_env, validate_config, Config, EncodeJob, EncodeMonitor,
    FfprobeProber, ProgressEvent,
};

#[derive(Parser, Debug)]
#[command(name = "encwatch")]
#[command(version, about = "Run an encoder and report its progress as JSON lines")]
struct Cli {
    /// Media file to encode
    input: PathBuf,

    /// Encoded output file, /dev/null when omitted
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// TOML configuration file; ENCWATCH_* variables override it
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Encoder binary, overriding the configuration
    #[arg(long)]
    executable: Option<PathBuf>,

    /// ffprobe binary, overriding the configuration
    #[arg(long)]
    ffprobe: Option<PathBuf>,

    /// Include the accumulated encoder output in every event
    #[arg(long)]
    raw: bool,

    /// Print Prometheus metrics after the run
    #[arg(long)]
    metrics: bool,

    /// Log as JSON
    #[arg(long)]
    log_json: bool,

    /// Arguments passed to the encoder before `-o <output> <input>`
    #[arg(last = true)]
    encoder_args: Vec<String>,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_json);

    match run(cli).await {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            error!("Fatal error: {:#}", e);
            std::process::exit(2);
        }
    }
}

fn init_logging(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info".into());

    // stdout carries the events, logs go to stderr.
    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

/// Runs the encode. Returns whether it ended healthy.
async fn run(cli: Cli) -> Result<bool> {
    let mut config = match &cli.config {
        Some(path) => {
            info!("Loading configuration from {:?}", path);
            load_config(path).with_context(|| format!("Failed to load config from {:?}", path))?
        }
        None => load_config_from_env().context("Failed to load config from environment")?,
    };
    apply_overrides(&mut config, &cli);
    validate_config(&config).context("Configuration validation failed")?;

    let prober = Arc::new(FfprobeProber::new(config.prober.ffprobe_path.clone()));
    let monitor = EncodeMonitor::new(config.monitor, prober).context("Failed to create monitor")?;
    info!(
        "Using encoder {} ({:?} ratio)",
        monitor.config().executable.display(),
        monitor.config().ratio_strategy
    );

    let mut job = EncodeJob::new(&cli.input).with_args(cli.encoder_args.iter().cloned());
    if let Some(output) = &cli.output {
        job = job.with_output(output);
    }

    let mut run = monitor
        .start(job)
        .await
        .context("Failed to start encoder")?;

    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);
    let mut interrupted = false;
    let mut last: Option<ProgressEvent> = None;

    loop {
        tokio::select! {
            event = run.next_event() => {
                let Some(event) = event else { break };
                println!("{}", output::event_line(&event, cli.raw)?);
                last = Some(event);
            }
            _ = &mut shutdown, if !interrupted => {
                warn!("Interrupted, stopping encoder");
                interrupted = true;
                run.kill().await.context("Failed to stop encoder")?;
            }
        }
    }

    if cli.metrics {
        print!("{}", output::encode_metrics()?);
    }

    Ok(last.is_some_and(|event| event.is_healthy()))
}

fn apply_overrides(config: &mut Config, cli: &Cli) {
    if let Some(executable) = &cli.executable {
        config.monitor.executable = executable.clone();
    }
    if let Some(ffprobe) = &cli.ffprobe {
        config.prober.ffprobe_path = ffprobe.clone();
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_arguments() {
        let cli = Cli::try_parse_from([
            "encwatch",
            "in.y4m",
            "-o",
            "out.264",
            "--executable",
            "/opt/x264",
            "--",
            "--crf",
            "23",
        ])
        .unwrap();

        assert_eq!(cli.input, PathBuf::from("in.y4m"));
        assert_eq!(cli.output, Some(PathBuf::from("out.264")));
        assert_eq!(cli.encoder_args, vec!["--crf", "23"]);
        assert!(!cli.raw);
    }

    #[test]
    fn test_overrides() {
        let cli = Cli::try_parse_from([
            "encwatch",
            "in.y4m",
            "--executable",
            "x265",
            "--ffprobe",
            "/usr/bin/ffprobe",
        ])
        .unwrap();
        let mut config = Config::default();
        apply_overrides(&mut config, &cli);

        assert_eq!(config.monitor.executable, PathBuf::from("x265"));
        assert_eq!(config.prober.ffprobe_path, PathBuf::from("/usr/bin/ffprobe"));
        assert!(validate_config(&config).is_ok());
    }
}
