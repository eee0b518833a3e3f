//! Error types for point map construction and analysis.

use std::error::Error;
use std::fmt;

use sala_core::{Cancelled, ConfigError, CoreError, PixelRef};

/// Errors from [`PointMap`](crate::PointMap) operations.
#[derive(Debug, Clone, PartialEq)]
pub enum PointMapError {
    /// A communicator cancelled the operation. Partial results were discarded.
    Cancelled,
    /// Occlusion data was requested before an isovist analysis ran.
    NoIsovistAnalysis,
    /// The grid has not been laid out with `set_grid`.
    GridNotSet,
    /// The fill seed is off the grid or already filled.
    SeedNotFillable {
        /// Cell under the seed point (may lie outside the grid).
        pixel: PixelRef,
    },
    /// A merge named a cell that is off the grid or not filled.
    CellNotFilled {
        /// The offending cell.
        pixel: PixelRef,
    },
    /// The operation needs a selection and none is active.
    NoSelection,
    /// The operation needs a visibility graph; run `spark_graph` first.
    NotProcessed,
    /// An option struct failed validation.
    Config(ConfigError),
    /// A lower-level grid or geometry error.
    Core(CoreError),
}

impl fmt::Display for PointMapError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cancelled => write!(f, "operation cancelled"),
            Self::NoIsovistAnalysis => write!(f, "no isovist analysis has been run on this map"),
            Self::GridNotSet => write!(f, "grid has not been set"),
            Self::SeedNotFillable { pixel } => {
                write!(f, "seed cell {pixel} is outside the grid or already filled")
            }
            Self::CellNotFilled { pixel } => write!(f, "cell {pixel} is outside the grid or not filled"),
            Self::NoSelection => write!(f, "no points are selected"),
            Self::NotProcessed => write!(f, "visibility graph has not been built"),
            Self::Config(e) => write!(f, "invalid options: {e}"),
            Self::Core(e) => write!(f, "{e}"),
        }
    }
}

impl Error for PointMapError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Config(e) => Some(e),
            Self::Core(e) => Some(e),
            _ => None,
        }
    }
}

impl From<Cancelled> for PointMapError {
    fn from(_: Cancelled) -> Self {
        Self::Cancelled
    }
}

impl From<ConfigError> for PointMapError {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

impl From<CoreError> for PointMapError {
    fn from(e: CoreError) -> Self {
        match e {
            CoreError::Cancelled => Self::Cancelled,
            other => Self::Core(other),
        }
    }
}
