pub mod aggregator;
pub mod etl;
pub mod extract;
pub mod fetcher;
pub mod grid;
pub mod harvest;
pub mod pipeline;
pub mod prober;
pub mod retry;

pub use crate::domain::model::{ListingRecord, RegionHarvest, TransformResult};
pub use crate::domain::ports::{Geocoder, Pipeline, Sleeper, Storage};
pub use crate::utils::error::Result;
