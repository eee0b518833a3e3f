//! Option structs for grid layout, graph construction and analysis.
//!
//! Every struct has a `Default` matching the usual interactive settings
//! and a `validate()` that rejects values the builders cannot use.

use sala_core::error::validate_radius;
use sala_core::{ConfigError, Point2f};

use crate::point::state;

// ── GridConfig ─────────────────────────────────────────────────────

/// Grid layout for [`PointMap::set_grid`](crate::PointMap::set_grid).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GridConfig {
    /// Distance between neighbouring cell centres. Default: 1.0.
    pub spacing: f64,
    /// Shift applied to the grid origin before alignment. Default: (0, 0).
    pub offset: Point2f,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            spacing: 1.0,
            offset: Point2f::default(),
        }
    }
}

impl GridConfig {
    /// A grid with the given spacing and no offset.
    pub fn with_spacing(spacing: f64) -> Self {
        Self {
            spacing,
            ..Self::default()
        }
    }

    /// Check that the spacing is finite and positive and the offset finite.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.spacing.is_finite() || self.spacing <= 0.0 {
            return Err(ConfigError::OutOfRange {
                field: "spacing",
                value: self.spacing,
                expected: "finite and > 0",
            });
        }
        for (field, value) in [("offset.x", self.offset.x), ("offset.y", self.offset.y)] {
            if !value.is_finite() {
                return Err(ConfigError::OutOfRange {
                    field,
                    value,
                    expected: "finite",
                });
            }
        }
        Ok(())
    }
}

// ── FillType ───────────────────────────────────────────────────────

/// How [`PointMap::make_points`](crate::PointMap::make_points) marks the cells it reaches.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum FillType {
    /// Plain filled cells.
    #[default]
    Full,
    /// Filled cells flagged as context: only even cells seed searches.
    Semi,
    /// Augmented cells, kept out of the visibility graph.
    Augment,
}

impl FillType {
    /// The state bits given to a freshly filled cell.
    pub fn state(self) -> u16 {
        match self {
            Self::Full => state::FILLED,
            Self::Semi => state::FILLED | state::CONTEXT_FILLED,
            Self::Augment => state::AUGMENTED,
        }
    }
}

// ── SparkConfig ────────────────────────────────────────────────────

/// Options for [`PointMap::spark_graph`](crate::PointMap::spark_graph).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SparkConfig {
    /// Keep only edge cells before building. Default: false.
    pub boundary_graph: bool,
    /// Longest sight line in drawing units, or -1 for unlimited. Default: -1.
    pub max_dist: f64,
}

impl Default for SparkConfig {
    fn default() -> Self {
        Self {
            boundary_graph: false,
            max_dist: -1.0,
        }
    }
}

impl SparkConfig {
    /// Check that `max_dist` is -1 or positive.
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_radius("max_dist", self.max_dist)
    }
}

// ── Analysis options ───────────────────────────────────────────────

/// Options for [`PointMap::analyse_visual`](crate::PointMap::analyse_visual).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct VisualOptions {
    /// Compute the depth-based measures. Default: true.
    pub global: bool,
    /// Compute clustering, control and controllability. Default: false.
    pub local: bool,
    /// Depth limit in visual steps, or -1 for "n". Default: -1.
    pub radius: f64,
    /// Skip every origin (used when only gate values are wanted). Default: false.
    pub gates_only: bool,
}

impl Default for VisualOptions {
    fn default() -> Self {
        Self {
            global: true,
            local: false,
            radius: -1.0,
            gates_only: false,
        }
    }
}

impl VisualOptions {
    /// Check that the radius is -1 or positive.
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_radius("radius", self.radius)
    }
}

/// Options for [`PointMap::analyse_metric`](crate::PointMap::analyse_metric).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MetricOptions {
    /// Path-length limit in drawing units, or -1 for "n". Default: -1.
    pub radius: f64,
    /// Skip every origin. Default: false.
    pub gates_only: bool,
}

impl Default for MetricOptions {
    fn default() -> Self {
        Self {
            radius: -1.0,
            gates_only: false,
        }
    }
}

impl MetricOptions {
    /// Check that the radius is -1 or positive.
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_radius("radius", self.radius)
    }
}

/// Options for [`PointMap::analyse_angular`](crate::PointMap::analyse_angular).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AngularOptions {
    /// Accumulated-turn limit (1.0 = a right angle), or -1 for "n". Default: -1.
    pub radius: f64,
    /// Skip every origin. Default: false.
    pub gates_only: bool,
}

impl Default for AngularOptions {
    fn default() -> Self {
        Self {
            radius: -1.0,
            gates_only: false,
        }
    }
}

impl AngularOptions {
    /// Check that the radius is -1 or positive.
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_radius("radius", self.radius)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        assert!(GridConfig::default().validate().is_ok());
        assert!(SparkConfig::default().validate().is_ok());
        assert!(VisualOptions::default().validate().is_ok());
        assert!(MetricOptions::default().validate().is_ok());
        assert!(AngularOptions::default().validate().is_ok());
    }

    #[test]
    fn zero_spacing_rejected() {
        let err = GridConfig::with_spacing(0.0).validate().unwrap_err();
        assert!(matches!(err, ConfigError::OutOfRange { field: "spacing", .. }));
        assert!(GridConfig::with_spacing(f64::NAN).validate().is_err());
    }

    #[test]
    fn non_finite_offset_rejected() {
        let cfg = GridConfig {
            spacing: 1.0,
            offset: Point2f::new(f64::INFINITY, 0.0),
        };
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::OutOfRange { field: "offset.x", .. })
        ));
    }

    #[test]
    fn radius_must_be_minus_one_or_positive() {
        let opts = MetricOptions {
            radius: 0.0,
            ..MetricOptions::default()
        };
        assert!(opts.validate().is_err());
        let spark = SparkConfig {
            max_dist: -3.0,
            ..SparkConfig::default()
        };
        assert!(spark.validate().is_err());
    }

    #[test]
    fn fill_types_map_to_state_bits() {
        assert_eq!(FillType::Full.state(), state::FILLED);
        assert_eq!(FillType::Semi.state() & state::CONTEXT_FILLED, state::CONTEXT_FILLED);
        assert_eq!(FillType::Augment.state() & state::FILLED, 0);
    }
}
