//! Geobench: build and k-nearest-neighbor query benchmark for geographic
//! spatial indexes.
//!
//! A bucket index and a vantage-point tree are driven through the same
//! protocol behind the [`SpatialIndex`] trait: a timed build over the whole
//! dataset, then a timed phase of `lookups` queries for the `nearest`
//! neighbors of randomly chosen dataset points.

pub mod bucket;
pub mod cli;
pub mod config;
pub mod dataset;
pub mod dispatch;
mod distance;
pub mod error;
pub mod harness;
mod index;
pub mod linear;
pub mod logging;
mod neighbors;
pub mod report;
pub mod vptree;

pub use bucket::BucketIndex;
pub use config::{AnchorPolicy, Config};
pub use dataset::{CityRecord, Dataset};
pub use distance::euclidean;
pub use error::{BenchError, DatasetError, IndexError};
pub use harness::{run, Phase, QueryWorkload, RunParams, RunReport, TimingSample};
pub use index::{Point, SpatialIndex};
pub use linear::LinearIndex;
pub use vptree::VpTree;
