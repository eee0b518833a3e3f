//! Angular sieve for sweeping one octant of a cell's view.
//!
//! The sieve holds the still-open range of tangents, 0 to 1 across the
//! octant, as a sorted list of gaps. Each row of cells walked outwards
//! contributes the lines it contains as blocks; [`SparkSieve::collect_garbage`]
//! then cuts the blocks out of the gaps. The sweep ends when no gaps remain.

use std::cmp::Ordering;

use sala_core::geometry::{intersect_line, intersect_region, Line, Point2f};

const SIEVE_TOL: f64 = 1e-10;

/// An open or blocked span of tangents.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Zone {
    /// Lower tangent.
    pub start: f64,
    /// Upper tangent.
    pub end: f64,
}

impl Zone {
    /// A span between two tangents.
    pub fn new(start: f64, end: f64) -> Self {
        Self { start, end }
    }

    // Sorted by start; on equal starts the wider block comes first.
    fn order(&self, other: &Self) -> Ordering {
        self.start
            .total_cmp(&other.start)
            .then_with(|| other.end.total_cmp(&self.end))
    }
}

/// The open tangents of one octant around a centre point.
#[derive(Clone, Debug)]
pub struct SparkSieve {
    centre: Point2f,
    max_dist: f64,
    gaps: Vec<Zone>,
    blocks: Vec<Zone>,
}

impl SparkSieve {
    /// A fully open sieve. `max_dist` of -1 means unlimited.
    pub fn new(centre: Point2f, max_dist: f64) -> Self {
        Self {
            centre,
            max_dist,
            gaps: vec![Zone::new(0.0, 1.0)],
            blocks: Vec::new(),
        }
    }

    /// The remaining open spans, in tangent order.
    pub fn gaps(&self) -> &[Zone] {
        &self.gaps
    }

    /// True while part of the octant is still open.
    pub fn has_gaps(&self) -> bool {
        !self.gaps.is_empty()
    }

    /// True if the sight line from the centre to `point` is too long or
    /// crosses one of `lines`.
    pub fn test_block<'a>(&self, point: Point2f, lines: impl IntoIterator<Item = &'a Line>, tolerance: f64) -> bool {
        let sight = Line::new(self.centre, point);
        if self.max_dist != -1.0 && sight.length() > self.max_dist {
            return true;
        }
        lines.into_iter().any(|l| {
            intersect_region(&sight.region(), &l.region(), tolerance) && intersect_line(&sight, l, tolerance)
        })
    }

    /// Queue the tangent span of each line in octant `q` as a block.
    pub fn block<'a>(&mut self, lines: impl IntoIterator<Item = &'a Line>, q: usize) {
        for l in lines {
            let a = self.tanify(l.start(), q);
            let b = self.tanify(l.end(), q);
            let zone = Zone::new(a.min(b) - SIEVE_TOL, a.max(b) + SIEVE_TOL);
            let at = self
                .blocks
                .partition_point(|z| z.order(&zone) != Ordering::Greater);
            self.blocks.insert(at, zone);
        }
    }

    /// Cut the queued blocks out of the gaps and clear the queue.
    pub fn collect_garbage(&mut self) {
        let mut i = 0;
        let mut g = 0;
        while i < self.blocks.len() && g < self.gaps.len() {
            let block = self.blocks[i];
            let gap = &mut self.gaps[g];
            if block.end < gap.start {
                i += 1;
                continue;
            }
            let mut create = true;
            if block.start <= gap.start {
                create = false;
                if block.end > gap.start {
                    gap.start = block.end;
                }
            }
            if block.end >= gap.end {
                create = false;
                if block.start < gap.end {
                    gap.end = block.start;
                }
            }
            if gap.end <= gap.start + SIEVE_TOL {
                // gap closed; try the same block on the next gap
                self.gaps.remove(g);
            } else if block.end > gap.end {
                g += 1;
            } else {
                if create {
                    let before = Zone::new(gap.start, block.start);
                    gap.start = block.end;
                    self.gaps.insert(g, before);
                    g += 1;
                }
                i += 1;
            }
        }
        self.blocks.clear();
    }

    /// Tangent of `point` as seen from the centre, measured within octant `q`.
    ///
    /// ```text
    ///  \ 6 | 7 /
    ///  0 \ | / 1
    ///  - -   - -
    ///  2 / | \ 3
    ///  / 4 | 5 \
    /// ```
    pub fn tanify(&self, point: Point2f, q: usize) -> f64 {
        let c = self.centre;
        match q {
            0 => (point.y - c.y) / (c.x - point.x),
            1 => (point.y - c.y) / (point.x - c.x),
            2 => (c.y - point.y) / (c.x - point.x),
            3 => (c.y - point.y) / (point.x - c.x),
            4 => (c.x - point.x) / (c.y - point.y),
            5 => (point.x - c.x) / (c.y - point.y),
            6 => (c.x - point.x) / (point.y - c.y),
            7 => (point.x - c.x) / (point.y - c.y),
            _ => -1.0,
        }
    }
}
