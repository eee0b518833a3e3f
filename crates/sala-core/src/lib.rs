//! Core types for the Sala spatial analysis engine.
//!
//! This is the leaf crate with no internal dependencies. It holds the
//! planar geometry kernel, integer grid references, the progress and
//! cancellation protocol, the keyed attribute table, the shared error
//! types and the fixed-size binary layouts of the geometry records.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod attributes;
pub mod codec;
pub mod comm;
pub mod error;
pub mod geometry;
pub mod measures;
pub mod pixel;

pub use attributes::{AttributeTable, ColumnStats, NO_VALUE};
pub use comm::{Cancelled, Communicator, Progress, ProgressKind, ProgressTimer};
pub use error::{CodecError, ConfigError, CoreError};
pub use geometry::{Axis, Line, LineContact, Point2f, QtRegion, TaggedLine};
pub use pixel::{PixelRef, PixelRefPair};
