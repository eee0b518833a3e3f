//! Sala: spatial network analysis of architectural and urban plans.
//!
//! This is the facade crate that re-exports the public API of every Sala
//! sub-crate. For most users, adding `sala` as a single dependency is
//! sufficient.
//!
//! # Quick start
//!
//! ```rust
//! use sala::prelude::*;
//!
//! // A spine crossed by two teeth.
//! let drawing = vec![
//!     Line::new(Point2f::new(0.0, 0.0), Point2f::new(3.0, 0.0)),
//!     Line::new(Point2f::new(1.0, 1.0), Point2f::new(1.0, -1.0)),
//!     Line::new(Point2f::new(2.0, 1.0), Point2f::new(2.0, -2.0)),
//! ];
//! let axial = convert_drawing_to_axial("comb", &[drawing], None).unwrap();
//! assert_eq!(axial.line_count(), 3);
//! assert_eq!(axial.connectors()[0].connections, vec![1, 2]);
//! ```
//!
//! # Modules
//!
//! Each module corresponds to a sub-crate. Use them for types not in the prelude:
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`core`] | `sala-core` | Geometry, pixel references, attribute tables, progress reporting |
//! | [`space`] | `sala-space` | BSP trees, line grids, shape maps, isovists |
//! | [`vga`] | `sala-vga` | Point maps and visibility graph analysis |
//! | [`axial`] | `sala-axial` | Axial, segment, all-line and fewest-line maps |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// Geometry kernel and shared plumbing (`sala-core`).
///
/// Points, lines and regions, [`core::AttributeTable`], and the
/// [`core::Communicator`] trait used for progress and cancellation.
pub use sala_core as core;

/// Spatial indexes and shapes (`sala-space`).
///
/// [`space::BspTree`], the [`space::SpacePixel`] line grid,
/// [`space::ShapeMap`] and isovist construction.
pub use sala_space as space;

/// Visibility graph analysis (`sala-vga`).
///
/// Build a [`vga::PointMap`], fill it, link it with
/// [`vga::PointMap::spark_graph`], then run the visual, metric, angular
/// and isovist analyses.
pub use sala_vga as vga;

/// Line-graph maps (`sala-axial`).
///
/// [`axial::ShapeGraph`] for axial and segment maps, the drawing and data
/// map converters, and [`axial::AllLineMap`] for all-line and fewest-line
/// maps.
pub use sala_axial as axial;

/// Common imports for typical Sala usage.
///
/// ```rust
/// use sala::prelude::*;
/// ```
pub mod prelude {
    // Geometry and plumbing
    pub use sala_core::{AttributeTable, Communicator, Line, Point2f, ProgressKind, QtRegion, TaggedLine};

    // Errors
    pub use sala_axial::AxialError;
    pub use sala_core::{ConfigError, CoreError};
    pub use sala_vga::PointMapError;

    // Space
    pub use sala_space::{BspConfig, BspTree, PixelBase, ShapeMap};

    // Visibility graphs
    pub use sala_vga::{AngularOptions, FillType, GridConfig, MetricOptions, PointMap, SparkConfig, VisualOptions};

    // Line graphs
    pub use sala_axial::{
        convert_axial_to_segment, convert_data_to_axial, convert_data_to_segment, convert_drawing_to_axial,
        convert_drawing_to_segment, AllLineConfig, AllLineMap, GraphKind, MinimiserConfig, SegmentOptions,
        ShapeGraph,
    };
}
