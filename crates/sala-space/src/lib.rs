//! Spatial indexes and shape containers for the Sala engine.
//!
//! Everything here sits between the raw geometry of [`sala_core`] and the
//! graph builders above it:
//!
//! - [`BspTree`]: an immutable binary space partition over tagged lines,
//!   built iteratively with an explicit seeded generator.
//! - [`PixelBase`] and [`SpacePixel`]: regular grids over a region, with
//!   line rasterisation and line-in-grid intersection queries.
//! - [`tidy_lines`] and [`quick_tidy`]: drawing clean-up before analysis.
//! - [`ShapeMap`], [`SalaShape`] and [`Connector`]: keyed shapes with an
//!   aligned attribute table and adjacency records.
//! - [`Isovist`]: the visible polygon from a point, swept through a BSP tree.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod bsp;
pub mod connector;
pub mod isovist;
pub mod pixelbase;
pub mod shape;
pub mod shapemap;
pub mod spacepix;
pub mod tidy;

pub use bsp::{BspConfig, BspNode, BspTree, Side};
pub use connector::{ConnMode, Connector, SegDir, SegmentRef};
pub use isovist::{Isovist, IsovistMeasures, OcclusionPoint, ISOVIST_COLUMNS};
pub use pixelbase::{quick_pixelate_line, PixelBase};
pub use shape::{SalaShape, ShapeKind};
pub use shapemap::{CellShape, CellTag, ShapeMap, CONNECTIVITY_COL, LINE_LENGTH_COL};
pub use spacepix::SpacePixel;
pub use tidy::{quick_tidy, tidy_lines};
