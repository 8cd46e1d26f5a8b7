//! Speech segmentation worker.
//!
//! This crate provides:
//! - Command line parsing for one-shot jobs
//! - Environment-driven worker configuration
//! - Job executor with timeout, retry and progress logging

pub mod cli;
pub mod config;
pub mod error;
pub mod executor;
pub mod logging;
pub mod retry;

pub use cli::Cli;
pub use config::WorkerConfig;
pub use error::{WorkerError, WorkerResult};
pub use executor::JobExecutor;
pub use logging::JobLogger;
