//! Visibility graph analysis for the Sala engine.
//!
//! A [`PointMap`] lays a regular grid over a line drawing. Cells are
//! filled by flood fill from a seed, then [`PointMap::spark_graph`] links
//! every filled cell to every other cell it can see, storing the links
//! compactly in a [`Node`] of 32 angular [`Bin`]s. The analyses walk that
//! graph:
//!
//! - visual: step depth, integration, entropy, clustering and control;
//! - metric: shortest walked distance and the turn along it;
//! - angular: least accumulated turn;
//! - isovist: visible-area measures and occluding edges per cell.
//!
//! Each analysis writes named columns into the map's
//! [`AttributeTable`](sala_core::AttributeTable), one row per filled cell.
//! Long operations take an optional [`Communicator`](sala_core::Communicator)
//! for progress and cancellation.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod angular;
pub mod codec;
pub mod config;
pub mod error;
pub mod export;
pub mod isovist;
pub mod metric;
pub mod node;
pub mod point;
pub mod pointmap;
pub mod search;
pub mod sieve;
pub mod spark;
pub mod visual;

pub use angular::ANGULAR_STEP_DEPTH_COL;
pub use codec::{GRID_MAGIC, GRID_VERSION};
pub use config::{AngularOptions, FillType, GridConfig, MetricOptions, SparkConfig, VisualOptions};
pub use error::PointMapError;
pub use metric::{METRIC_STEP_ANGLE_COL, METRIC_STEP_LENGTH_COL, METRIC_STRAIGHT_LINE_COL};
pub use node::{which_bin, Bin, Node, PixelVec, BIN_COUNT};
pub use point::Point;
pub use pointmap::PointMap;
pub use search::{AngularTriple, MetricTriple};
pub use sieve::{SparkSieve, Zone};
pub use spark::{CONNECTIVITY_COL, FIRST_MOMENT_COL, SECOND_MOMENT_COL};
pub use visual::VISUAL_STEP_DEPTH_COL;
