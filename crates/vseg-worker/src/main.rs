//! Speech segmentation worker binary.

use anyhow::Context;
use clap::Parser;
use metrics_exporter_prometheus::PrometheusBuilder;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use vseg_media::{check_ffmpeg, check_ffprobe};
use vseg_models::{SegmentationResult, SegmentationStatus};
use vseg_worker::{Cli, JobExecutor, WorkerConfig};

#[tokio::main]
async fn main() {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Colored output for dev, JSON for production; stdout carries the result
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("vseg=info,ort=warn"));

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_ansi(true)
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false),
            )
            .with(env_filter)
            .init();
    }

    let cli = Cli::parse();

    match run(cli).await {
        Ok(status) if !status.is_error() => {}
        Ok(_) => std::process::exit(1),
        Err(e) => {
            error!("{:#}", e);
            std::process::exit(1);
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<SegmentationStatus> {
    info!("Starting vseg-worker");

    let config = WorkerConfig::from_env();
    info!("Worker config: {:?}", config);

    if let Some(addr) = config.metrics_addr {
        PrometheusBuilder::new()
            .with_http_listener(addr)
            .install()
            .context("Failed to install Prometheus exporter")?;
        info!(%addr, "Prometheus exporter listening");
    }

    // WAV input works without FFmpeg; everything else needs it
    if check_ffmpeg().is_err() || check_ffprobe().is_err() {
        warn!("ffmpeg/ffprobe not found in PATH, only WAV input is supported");
    }

    let job = cli.to_job().context("Invalid job arguments")?;
    let executor = JobExecutor::new(config);

    let result = match executor.execute(&job).await {
        Ok(result) => result,
        Err(e) => SegmentationResult::error(e.error_kind(), e.to_string()),
    };

    let json = serde_json::to_string_pretty(&result).context("Failed to serialize result")?;
    println!("{}", json);

    info!(status = %result.status, "Worker finished");
    Ok(result.status)
}
