//! Option structs for segment splitting, all-line generation and line
//! minimisation.

use sala_core::{ConfigError, Point2f};

// ── SegmentOptions ─────────────────────────────────────────────────

/// How axial lines are split into segments.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct SegmentOptions {
    /// Stubs shorter than this fraction of their parent line are dropped.
    /// Zero keeps everything above a tiny numerical tolerance. Default: 0.
    pub stub_removal: f64,
}

impl SegmentOptions {
    /// Options dropping stubs shorter than `fraction` of their line.
    pub fn with_stub_removal(fraction: f64) -> Self {
        Self { stub_removal: fraction }
    }

    /// Check that the stub fraction lies in `[0, 1)`.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..1.0).contains(&self.stub_removal) {
            return Err(ConfigError::OutOfRange {
                field: "stub_removal",
                value: self.stub_removal,
                expected: "[0, 1)",
            });
        }
        Ok(())
    }
}

// ── AllLineConfig ──────────────────────────────────────────────────

/// Where the all-line map starts looking for open space.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct AllLineConfig {
    /// A point in the open space to be mapped.
    pub seed: Point2f,
}

impl AllLineConfig {
    /// Configuration seeded at `seed`.
    pub fn at(seed: Point2f) -> Self {
        Self { seed }
    }

    /// Check that the seed is finite.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [("seed.x", self.seed.x), ("seed.y", self.seed.y)] {
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

// ── MinimiserConfig ────────────────────────────────────────────────

/// Tie-breaking for the fewest-line reduction.
///
/// Lines are visited least-connected and shortest first. Lines equal on
/// both counts are put in an order drawn from a ChaCha8 generator seeded
/// here, so a given seed always yields the same maps.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MinimiserConfig {
    /// Generator seed. Default: 0.
    pub seed: u64,
}

impl MinimiserConfig {
    /// Configuration with the given seed.
    pub fn with_seed(seed: u64) -> Self {
        Self { seed }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stub_removal_range() {
        assert!(SegmentOptions::default().validate().is_ok());
        assert!(SegmentOptions::with_stub_removal(0.4).validate().is_ok());
        assert!(SegmentOptions::with_stub_removal(1.0).validate().is_err());
        assert!(SegmentOptions::with_stub_removal(-0.1).validate().is_err());
        assert!(SegmentOptions::with_stub_removal(f64::NAN).validate().is_err());
    }

    #[test]
    fn seed_point_must_be_finite() {
        assert!(AllLineConfig::at(Point2f::new(1.0, 2.0)).validate().is_ok());
        let bad = AllLineConfig::at(Point2f::new(f64::INFINITY, 0.0));
        assert!(matches!(
            bad.validate(),
            Err(ConfigError::OutOfRange { field: "seed.x", .. })
        ));
    }
}
