pub mod config;
pub mod engine;
pub mod error;
pub mod hasher;
pub mod listing;
pub mod model;
pub mod progress;
pub mod scanner;
pub mod storage;

pub use crate::config::AppConfig;
pub use engine::{CatalogBuilder, ScanSummary};
pub use error::Error;
pub use progress::{ProgressReporter, SilentReporter};
