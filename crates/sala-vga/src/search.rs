//! Per-search scratch state and the priority entries of the weighted searches.

use std::cmp::Ordering;

use sala_core::PixelRef;

/// `misc` value of a cell whose neighbours have already been extracted.
pub(crate) const VISITED: u32 = u32::MAX;

/// Column-name suffix for a distance or angle radius; empty for "n".
///
/// Large radii are printed whole; on grids narrower than one unit the
/// radius keeps four decimals, otherwise two.
pub(crate) fn radius_suffix(radius: f64, region_width: f64) -> String {
    if radius == -1.0 {
        String::new()
    } else if radius > 100.0 {
        format!(" R{radius:.0}")
    } else if region_width < 1.0 {
        format!(" R{radius:.4}")
    } else {
        format!(" R{radius:.2}")
    }
}

/// Entry of the metric (shortest walked distance) search.
///
/// Ordered by distance, then by pixel. `last` is the cell the walk came
/// from and takes no part in the ordering.
#[derive(Clone, Copy, Debug)]
pub struct MetricTriple {
    /// Walked distance from the origin, in cell units.
    pub dist: f32,
    /// Cell reached.
    pub pixel: PixelRef,
    /// Previous cell on the walk, or [`PixelRef::NONE`] at the origin.
    pub last: PixelRef,
}

impl MetricTriple {
    /// An entry with no predecessor.
    pub fn origin(dist: f32, pixel: PixelRef) -> Self {
        Self {
            dist,
            pixel,
            last: PixelRef::NONE,
        }
    }
}

impl PartialEq for MetricTriple {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for MetricTriple {}

impl PartialOrd for MetricTriple {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for MetricTriple {
    fn cmp(&self, other: &Self) -> Ordering {
        self.dist
            .total_cmp(&other.dist)
            .then_with(|| self.pixel.cmp(&other.pixel))
    }
}

/// Entry of the angular (least accumulated turn) search.
///
/// Ordered by accumulated angle, then by pixel.
#[derive(Clone, Copy, Debug)]
pub struct AngularTriple {
    /// Accumulated turn from the origin; 1.0 is a right angle.
    pub angle: f32,
    /// Cell reached.
    pub pixel: PixelRef,
    /// Previous cell on the walk, or [`PixelRef::NONE`] at the origin.
    pub last: PixelRef,
}

impl AngularTriple {
    /// An entry with no predecessor.
    pub fn origin(angle: f32, pixel: PixelRef) -> Self {
        Self {
            angle,
            pixel,
            last: PixelRef::NONE,
        }
    }
}

impl PartialEq for AngularTriple {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for AngularTriple {}

impl PartialOrd for AngularTriple {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for AngularTriple {
    fn cmp(&self, other: &Self) -> Ordering {
        self.angle
            .total_cmp(&other.angle)
            .then_with(|| self.pixel.cmp(&other.pixel))
    }
}

/// Grid-shaped working state of one search, kept apart from the cells
/// so nodes can be read while it is updated.
#[derive(Clone, Debug)]
pub(crate) struct Scratch {
    rows: usize,
    /// 0 = unseen, a bin mark = queued, [`VISITED`] = expanded.
    pub misc: Vec<u32>,
    /// Furthest cell already walked from here, per walk direction.
    pub extent: Vec<PixelRef>,
    pub dist: Vec<f32>,
    pub cumangle: Vec<f32>,
}

impl Scratch {
    pub fn new(cols: usize, rows: usize) -> Self {
        let n = cols * rows;
        Self {
            rows,
            misc: vec![0; n],
            extent: vec![PixelRef::NONE; n],
            dist: vec![-1.0; n],
            cumangle: vec![0.0; n],
        }
    }

    #[inline]
    pub fn index(&self, p: PixelRef) -> usize {
        p.x as usize * self.rows + p.y as usize
    }

    fn pixel_at(&self, i: usize) -> PixelRef {
        PixelRef::new((i / self.rows) as i16, (i % self.rows) as i16)
    }

    /// Reset for a breadth-first visual search.
    pub fn reset_visual(&mut self) {
        self.misc.fill(0);
        for i in 0..self.extent.len() {
            self.extent[i] = self.pixel_at(i);
        }
    }

    /// Reset for a metric search: distances unknown, no turns.
    pub fn reset_metric(&mut self) {
        self.misc.fill(0);
        self.dist.fill(-1.0);
        self.cumangle.fill(0.0);
    }

    /// Reset for an angular search: turns unknown.
    pub fn reset_angular(&mut self) {
        self.misc.fill(0);
        self.dist.fill(0.0);
        self.cumangle.fill(-1.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    #[test]
    fn metric_entries_order_by_distance_then_pixel() {
        let mut set = BTreeSet::new();
        set.insert(MetricTriple::origin(2.0, PixelRef::new(0, 0)));
        set.insert(MetricTriple::origin(1.0, PixelRef::new(5, 5)));
        set.insert(MetricTriple::origin(1.0, PixelRef::new(1, 9)));
        let order: Vec<PixelRef> = set.iter().map(|t| t.pixel).collect();
        assert_eq!(
            order,
            vec![PixelRef::new(1, 9), PixelRef::new(5, 5), PixelRef::new(0, 0)]
        );
    }

    #[test]
    fn predecessor_does_not_split_entries() {
        let mut set = BTreeSet::new();
        set.insert(AngularTriple::origin(0.5, PixelRef::new(2, 2)));
        set.insert(AngularTriple {
            angle: 0.5,
            pixel: PixelRef::new(2, 2),
            last: PixelRef::new(1, 1),
        });
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn radius_suffix_precision() {
        assert_eq!(radius_suffix(-1.0, 10.0), "");
        assert_eq!(radius_suffix(250.0, 10.0), " R250");
        assert_eq!(radius_suffix(2.5, 10.0), " R2.50");
        assert_eq!(radius_suffix(0.25, 0.5), " R0.2500");
    }

    #[test]
    fn scratch_indexes_column_major() {
        let mut s = Scratch::new(3, 4);
        assert_eq!(s.index(PixelRef::new(0, 3)), 3);
        assert_eq!(s.index(PixelRef::new(2, 1)), 9);
        s.reset_visual();
        assert_eq!(s.extent[9], PixelRef::new(2, 1));
        s.reset_angular();
        assert_eq!(s.cumangle[0], -1.0);
    }
}
