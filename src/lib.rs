//! Review harvesting engine.
//!
//! Pulls user reviews for one product from several review sites, turns
//! their free-text dates into calendar dates, and merges everything into a
//! single date-filtered, de-duplicated list.

pub mod config;
pub mod dates;
pub mod driver;
pub mod engine;
pub mod error;
pub mod extract;
pub mod harvest;
pub mod merge;
pub mod model;
pub mod output;
pub mod paginate;
pub mod server;
pub mod sources;

pub use config::Settings;
pub use engine::{HarvestReport, HarvestRequest, ReviewHarvester, SourceSelection, SourceTally};
pub use model::{DateWindow, FinalReview, HarvestResult, RawReview, SourceId};
