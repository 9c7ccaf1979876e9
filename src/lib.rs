pub mod adapters;
pub mod app;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::cli::CliConfig;

pub use adapters::storage::LocalStorage;
pub use config::HarvestConfig;
pub use core::{
    etl::EtlEngine,
    harvest::{HarvestContext, Harvester},
    pipeline::{HarvestJob, HarvestPipeline},
};
pub use utils::error::{HarvestError, Result};
