//! Command line interface for one-shot segmentation jobs.

use std::path::{Path, PathBuf};

use clap::{Parser, ValueEnum};
use vseg_models::{
    DetectorConfig, EnergyDetectorConfig, JobId, NeuralDetectorConfig, SegmentAudioJob,
    SegmentationConfig,
};

use crate::error::{WorkerError, WorkerResult};

/// Split a speech recording into pause-aligned segments.
#[derive(Debug, Parser)]
#[command(name = "vseg-worker", version, about)]
pub struct Cli {
    /// Audio file to segment
    #[arg(env = "VSEG_INPUT")]
    pub input: PathBuf,

    /// Directory receiving the numbered segment files
    #[arg(env = "VSEG_OUTPUT_DIR")]
    pub output: PathBuf,

    /// JSON file holding a segmentation configuration
    #[arg(long, env = "VSEG_CONFIG")]
    pub config: Option<PathBuf>,

    /// Minimum segment length in seconds
    #[arg(long)]
    pub min_length: Option<f64>,

    /// Maximum segment length in seconds
    #[arg(long)]
    pub max_length: Option<f64>,

    /// Activity detection strategy
    #[arg(long, value_enum)]
    pub strategy: Option<Strategy>,

    /// Keep a final segment shorter than the minimum
    #[arg(long)]
    pub allow_short_final: bool,

    /// Job identifier used in logs and progress events
    #[arg(long, env = "VSEG_JOB_ID")]
    pub job_id: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Strategy {
    Energy,
    Neural,
}

impl Strategy {
    fn as_str(&self) -> &'static str {
        match self {
            Strategy::Energy => "energy",
            Strategy::Neural => "neural",
        }
    }

    fn default_detector(&self) -> DetectorConfig {
        match self {
            Strategy::Energy => DetectorConfig::Energy(EnergyDetectorConfig::default()),
            Strategy::Neural => DetectorConfig::Neural(NeuralDetectorConfig::default()),
        }
    }
}

impl Cli {
    /// Configuration file (or defaults) with command line overrides applied.
    pub fn segmentation_config(&self) -> WorkerResult<SegmentationConfig> {
        let mut config = match &self.config {
            Some(path) => load_config_file(path)?,
            None => SegmentationConfig::default(),
        };

        if let Some(min_length) = self.min_length {
            config.min_length = min_length;
        }
        if let Some(max_length) = self.max_length {
            config.max_length = max_length;
        }
        // Thresholds from the file survive unless the strategy changes
        if let Some(strategy) = self.strategy {
            if config.detector.strategy_name() != strategy.as_str() {
                config.detector = strategy.default_detector();
            }
        }
        if self.allow_short_final {
            config.allow_short_final = true;
        }

        config.validate().map_err(WorkerError::config_error)?;
        Ok(config)
    }

    /// Build the job described by the arguments.
    pub fn to_job(&self) -> WorkerResult<SegmentAudioJob> {
        let job = SegmentAudioJob::new(&self.input, &self.output)
            .with_config(self.segmentation_config()?);
        Ok(match &self.job_id {
            Some(id) => job.with_job_id(JobId::from_string(id.clone())),
            None => job,
        })
    }
}

/// Read a `SegmentationConfig` from JSON; missing fields take their defaults.
pub fn load_config_file(path: &Path) -> WorkerResult<SegmentationConfig> {
    let text = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&text)?)
}
