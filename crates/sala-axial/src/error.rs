//! Error types for line-graph construction.

use std::error::Error;
use std::fmt;

use sala_core::{Cancelled, ConfigError, CoreError};

/// Errors from building axial, segment and all-line maps.
#[derive(Debug, Clone, PartialEq)]
pub enum AxialError {
    /// A communicator cancelled the operation. Partial results were discarded.
    Cancelled,
    /// Too few lines survived clean-up to build the requested map.
    InsufficientGeometry {
        /// Lines available.
        lines: usize,
        /// Lines needed.
        required: usize,
    },
    /// No drawing vertex is visible from the all-line seed point.
    NoVisibleVertices,
    /// The vertex nearest the seed could not be classified.
    VertexInitFailed,
    /// A conversion found nothing to work with.
    NoLines {
        /// Where the lines ran out.
        stage: &'static str,
    },
    /// A segment map needs an "Axial Line Ref" column to pull axial values.
    MissingAxialRef,
    /// The drawing edges do not join up into polygon outlines.
    BrokenOutline {
        /// Segment whose endpoint could not be matched.
        segment: usize,
    },
    /// An option struct failed validation.
    Config(ConfigError),
    /// A lower-level geometry error.
    Core(CoreError),
}

impl fmt::Display for AxialError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cancelled => write!(f, "operation cancelled"),
            Self::InsufficientGeometry { lines, required } => {
                write!(f, "{lines} lines found, at least {required} needed")
            }
            Self::NoVisibleVertices => write!(f, "no visible vertices found"),
            Self::VertexInitFailed => write!(f, "failed to initialise axial vertices"),
            Self::NoLines { stage } => write!(f, "no lines found {stage}"),
            Self::MissingAxialRef => write!(f, "segment map has no axial line reference column"),
            Self::BrokenOutline { segment } => {
                write!(f, "segment {segment} has an endpoint on no outline")
            }
            Self::Config(e) => write!(f, "invalid options: {e}"),
            Self::Core(e) => write!(f, "{e}"),
        }
    }
}

impl Error for AxialError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Config(e) => Some(e),
            Self::Core(e) => Some(e),
            _ => None,
        }
    }
}

impl From<Cancelled> for AxialError {
    fn from(_: Cancelled) -> Self {
        Self::Cancelled
    }
}

impl From<ConfigError> for AxialError {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

impl From<CoreError> for AxialError {
    fn from(e: CoreError) -> Self {
        match e {
            CoreError::Cancelled => Self::Cancelled,
            other => Self::Core(other),
        }
    }
}
