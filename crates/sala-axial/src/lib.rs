//! Axial, segment and fewest-line maps for the Sala engine.
//!
//! A [`ShapeGraph`] is a shape map of straight lines together with a
//! connection graph. Three kinds are built here:
//!
//! - axial graphs, where lines that cross are linked;
//! - segment graphs, where axial lines are cut at every crossing and
//!   pieces are linked end to end with a turn weight;
//! - all-line graphs, every longest line of sight between drawing corners
//!   seen from a seed, which [`AllLineMap`] reduces to fewest-line maps.
//!
//! The [`convert`] functions build axial and segment graphs from drawings
//! and data maps, and [`ShapeGraph`] writes its connections as CSV or
//! Graphviz text.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod alllines;
pub mod config;
pub mod convert;
pub mod error;
pub mod export;
pub mod graph;
pub mod minimiser;
pub mod polygons;
pub mod segment;

pub use alllines::{AllLineMap, ALL_LINE_MAP_NAME, FEWEST_MINIMAL_NAME, FEWEST_SUBSETS_NAME};
pub use config::{AllLineConfig, MinimiserConfig, SegmentOptions};
pub use convert::{
    convert_axial_to_segment, convert_data_to_axial, convert_data_to_segment, convert_drawing_to_axial,
    convert_drawing_to_segment, DATA_MAP_REF_COL, DRAWING_LAYER_COL,
};
pub use error::AxialError;
pub use graph::{GraphKind, ShapeGraph};
pub use minimiser::{AxialMinimiser, Divisions, RadialSegment};
pub use polygons::{AxialPolygons, AxialVertex, AxialVertexKey, PolyConnector, RadialKey, RadialLine};
pub use segment::{ANGULAR_CONNECTIVITY_COL, AXIAL_LINE_REF_COL, SEGMENT_LENGTH_COL};
