//! Error types shared across the workspace.

use std::fmt;
use std::io;

use crate::comm::Cancelled;
use crate::pixel::PixelRef;

/// Errors from the geometry and grid primitives.
#[derive(Debug, Clone, PartialEq)]
pub enum CoreError {
    /// A communicator cancelled the operation.
    Cancelled,
    /// Grid spacing must be finite and positive.
    InvalidSpacing {
        /// The rejected spacing.
        spacing: f64,
    },
    /// The region has no area (or was never set).
    EmptyRegion,
    /// A pixel lies outside the grid.
    PixelOutOfRange {
        /// The offending pixel.
        pixel: PixelRef,
        /// Grid column count.
        cols: i16,
        /// Grid row count.
        rows: i16,
    },
}

impl fmt::Display for CoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cancelled => write!(f, "operation cancelled"),
            Self::InvalidSpacing { spacing } => {
                write!(f, "grid spacing must be finite and positive, got {spacing}")
            }
            Self::EmptyRegion => write!(f, "region has no area"),
            Self::PixelOutOfRange { pixel, cols, rows } => {
                write!(f, "pixel {pixel} outside {cols}x{rows} grid")
            }
        }
    }
}

impl std::error::Error for CoreError {}

impl From<Cancelled> for CoreError {
    fn from(_: Cancelled) -> Self {
        Self::Cancelled
    }
}

/// Errors from an option struct's `validate()`.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// A numeric option is outside its accepted range.
    OutOfRange {
        /// Option name.
        field: &'static str,
        /// Rejected value.
        value: f64,
        /// Human-readable accepted range.
        expected: &'static str,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OutOfRange {
                field,
                value,
                expected,
            } => write!(f, "{field} = {value} is out of range (expected {expected})"),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Check that a search radius is either `-1` ("n") or strictly positive.
pub fn validate_radius(field: &'static str, radius: f64) -> Result<(), ConfigError> {
    if radius == -1.0 || (radius.is_finite() && radius > 0.0) {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange {
            field,
            value: radius,
            expected: "-1 or > 0",
        })
    }
}

/// Errors from the fixed-size binary layout codec.
#[derive(Debug)]
pub enum CodecError {
    /// An I/O error occurred during read or write.
    Io(io::Error),
    /// The block does not start with the expected magic bytes.
    InvalidMagic,
    /// The block version is not supported by this build.
    UnsupportedVersion {
        /// The version found in the block.
        found: u8,
    },
    /// A record could not be decoded.
    Malformed {
        /// Human-readable description of what went wrong.
        detail: String,
    },
}

impl fmt::Display for CodecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "I/O error: {e}"),
            Self::InvalidMagic => write!(f, "invalid magic bytes"),
            Self::UnsupportedVersion { found } => {
                write!(f, "unsupported layout version {found}")
            }
            Self::Malformed { detail } => write!(f, "malformed record: {detail}"),
        }
    }
}

impl std::error::Error for CodecError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for CodecError {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}
