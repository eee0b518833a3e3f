//! Directional visibility bins.
//!
//! Every filled cell of a processed point map owns a [`Node`]: 32 [`Bin`]s,
//! one per 11.25 degree sector, each holding the visible cells of its
//! sector as runs ([`PixelVec`]) along the bin's walk direction. Runs make
//! neighbourhood walks cheap: a search can skip the rest of a run it has
//! already walked from another cell.
//!
//! Sector numbering starts at east and runs anticlockwise, so bins `i` and
//! `(i + 16) % 32` face opposite ways.

use std::collections::{BTreeSet, HashSet};
use std::f64::consts::FRAC_PI_2;

use sala_core::pixel::{dir, pixel_angle, pixel_dist};
use sala_core::{PixelRef, Point2f};

use crate::search::{AngularTriple, MetricTriple, Scratch};

/// Number of sectors per node.
pub const BIN_COUNT: usize = 32;

// ── Sector helpers ─────────────────────────────────────────────────

/// Sector of a direction vector.
///
/// Sector boundaries sit at tan 15, tan 30 and tan 45 degrees within each
/// octant. A zero vector has no direction and falls in sector 0.
pub fn which_bin(grad: Point2f) -> usize {
    if grad.x == 0.0 && grad.y == 0.0 {
        return 0;
    }
    let (mut bin, ratio): (i32, f64) = if grad.y.abs() > grad.x.abs() {
        let b = match (grad.y > 0.0, grad.x >= 0.0) {
            (true, true) => -8,
            (true, false) => 8,
            (false, true) => 24,
            (false, false) => -24,
        };
        (b, grad.x.abs() / grad.y.abs())
    } else {
        let b = match (grad.x > 0.0, grad.y >= 0.0) {
            (true, true) => 0,
            (true, false) => -32,
            (false, true) => -16,
            (false, false) => 16,
        };
        (b, grad.y.abs() / grad.x.abs())
    };

    if ratio < 1e-12 {
        // on the axis
    } else if ratio < 0.267_949_192_431_122_7 {
        bin += 1;
    } else if ratio < 0.577_350_269_189_625_7 {
        bin += 2;
    } else if ratio < 1.0 - 1e-12 {
        bin += 3;
    } else {
        bin += 4;
    }
    (bin.unsigned_abs() % 32) as usize
}

/// The sieve quadrant (as a single bit) that produces cells of `bin`.
///
/// ```text
///  \ 6 | 7 /
///  0 \ | / 1
///  - -   - -
///  2 / | \ 3
///  / 4 | 5 \
/// ```
pub fn process_octant(bin: usize) -> u8 {
    let q = match bin {
        0..=4 => 1,
        5..=7 => 7,
        8..=11 => 6,
        12..=16 => 0,
        17..=20 => 2,
        21..=23 => 4,
        24..=27 => 5,
        _ => 3,
    };
    1 << q
}

/// Every sieve quadrant that can see cells of `bin`. Axis and diagonal
/// sectors straddle two quadrants.
pub fn flag_octant(bin: usize) -> u8 {
    let q: &[u8] = match bin {
        0 => &[1, 3],
        1..=3 => &[1],
        4 => &[1, 7],
        5..=7 => &[7],
        8 => &[7, 6],
        9..=11 => &[6],
        12 => &[6, 0],
        13..=15 => &[0],
        16 => &[0, 2],
        17..=19 => &[2],
        20 => &[2, 4],
        21..=23 => &[4],
        24 => &[4, 5],
        25..=27 => &[5],
        28 => &[5, 3],
        _ => &[3],
    };
    q.iter().fold(0, |acc, &b| acc | (1 << b))
}

/// Quadrants facing back along `bin`.
pub fn q_opposite(bin: usize) -> u8 {
    flag_octant((bin + 16) % BIN_COUNT)
}

// ── PixelVec ───────────────────────────────────────────────────────

/// A straight run of cells from `start` to `end` inclusive.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PixelVec {
    /// First cell.
    pub start: PixelRef,
    /// Last cell.
    pub end: PixelRef,
}

impl PixelVec {
    /// A run between two cells.
    pub fn new(start: PixelRef, end: PixelRef) -> Self {
        Self { start, end }
    }
}

// ── Bin ────────────────────────────────────────────────────────────

/// The visible cells of one sector.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Bin {
    dir: u8,
    node_count: usize,
    distance: f32,
    occ_distance: f32,
    pixel_vecs: Vec<PixelVec>,
}

impl Bin {
    /// Store `pixels` as runs walking in direction `d`.
    ///
    /// Diagonal sectors hold a single run between the first and last
    /// pixel. Horizontal sectors are split into runs of consecutive
    /// columns within a row, vertical sectors into runs of consecutive
    /// rows within a column.
    pub fn make(&mut self, pixels: &[PixelRef], d: u8) {
        self.pixel_vecs.clear();
        self.node_count = 0;
        self.dir = d;
        let (Some(&first), Some(&last)) = (pixels.first(), pixels.last()) else {
            return;
        };

        if d & dir::DIAGONAL != 0 {
            let mut run = PixelVec::new(first, first);
            if last.x < run.start.x {
                run.start = last;
            }
            if last.x > run.end.x {
                run.end = last;
            }
            self.pixel_vecs.push(run);
        } else {
            let mut sorted: Vec<PixelRef> = pixels.to_vec();
            if d == dir::HORIZONTAL {
                sorted.sort_by_key(|p| (p.y, p.x));
            } else {
                sorted.sort_by_key(|p| (p.x, p.y));
            }
            sorted.dedup();
            let mut run = PixelVec::new(sorted[0], sorted[0]);
            for pair in sorted.windows(2) {
                let (prev, cur) = (pair[0], pair[1]);
                if prev.row(d) != cur.row(d) || prev.col(d) + 1 != cur.col(d) {
                    run.end = prev;
                    self.pixel_vecs.push(run);
                    run = PixelVec::new(cur, cur);
                }
            }
            run.end = sorted[sorted.len() - 1];
            self.pixel_vecs.push(run);
        }
        self.node_count = pixels.len();
    }

    /// Walk direction of the runs.
    pub fn dir(&self) -> u8 {
        self.dir
    }

    /// Number of cells the bin was made from.
    pub fn count(&self) -> usize {
        self.node_count
    }

    /// Distance to the furthest visible cell, in drawing units.
    pub fn distance(&self) -> f32 {
        self.distance
    }

    /// Distance to the furthest occluding edge found by the isovist analysis.
    pub fn occ_distance(&self) -> f32 {
        self.occ_distance
    }

    pub(crate) fn set_distance(&mut self, d: f32) {
        self.distance = d;
    }

    pub(crate) fn set_occ_distance(&mut self, d: f32) {
        self.occ_distance = d;
    }

    /// The stored runs.
    pub fn pixel_vecs(&self) -> &[PixelVec] {
        &self.pixel_vecs
    }

    /// Every cell of every run, in run order.
    pub fn iter(&self) -> impl Iterator<Item = PixelRef> + '_ {
        let d = self.dir;
        self.pixel_vecs.iter().flat_map(move |run| {
            let end = run.end.col(d);
            std::iter::successors(Some(run.start), move |p| Some(p.moved(d)))
                .take_while(move |p| p.col(d) <= end)
        })
    }

    /// True if `p` lies on one of the runs.
    ///
    /// The diagonal test only holds for cells already known to be in the
    /// bin's quadrant.
    pub fn contains_point(&self, p: PixelRef) -> bool {
        self.pixel_vecs.iter().any(|run| {
            if self.dir & dir::DIAGONAL != 0 {
                p.x >= run.start.x
                    && p.x <= run.end.x
                    && (p.y - run.start.y).abs() == p.x - run.start.x
            } else {
                p.row(self.dir) == run.start.row(self.dir)
                    && p.col(self.dir) >= run.start.col(self.dir)
                    && p.col(self.dir) <= run.end.col(self.dir)
            }
        })
    }

    /// Append the cells not yet in `hood`.
    pub fn contents(&self, hood: &mut Vec<PixelRef>) {
        let mut seen: HashSet<PixelRef> = hood.iter().copied().collect();
        for p in self.iter() {
            if seen.insert(p) {
                hood.push(p);
            }
        }
    }

    /// Queue every unseen cell, marking it with `binmark`.
    ///
    /// A straight run stops early once it reaches a cell whose recorded
    /// extent already covers the rest of the run.
    pub(crate) fn extract_unseen(&self, out: &mut Vec<PixelRef>, scratch: &mut Scratch, binmark: u32) {
        let d = self.dir;
        for run in &self.pixel_vecs {
            let end = run.end.col(d);
            let mut pix = run.start;
            while pix.col(d) <= end {
                let i = scratch.index(pix);
                if scratch.misc[i] == 0 {
                    out.push(pix);
                    scratch.misc[i] |= binmark;
                }
                if d & dir::DIAGONAL == 0 {
                    if scratch.extent[i].col(d) >= end {
                        break;
                    }
                    scratch.extent[i].set_col(d, end);
                }
                pix = pix.moved(d);
            }
        }
    }

    /// Relax the walked distance of every unexpanded cell through `curs`.
    pub(crate) fn extract_metric(
        &self,
        out: &mut BTreeSet<MetricTriple>,
        scratch: &mut Scratch,
        curs: &MetricTriple,
    ) {
        let base_angle = scratch.cumangle[scratch.index(curs.pixel)];
        for pix in self.iter() {
            let i = scratch.index(pix);
            let step = pixel_dist(pix, curs.pixel) as f32;
            if scratch.misc[i] == 0 && (scratch.dist[i] == -1.0 || curs.dist + step < scratch.dist[i]) {
                scratch.dist[i] = curs.dist + step;
                scratch.cumangle[i] = base_angle + turn(pix, curs);
                out.insert(MetricTriple {
                    dist: scratch.dist[i],
                    pixel: pix,
                    last: curs.pixel,
                });
            }
        }
    }

    /// Relax the accumulated turn of every unexpanded cell through `curs`.
    pub(crate) fn extract_angular(
        &self,
        out: &mut BTreeSet<AngularTriple>,
        scratch: &mut Scratch,
        curs: &AngularTriple,
    ) {
        let base_angle = scratch.cumangle[scratch.index(curs.pixel)];
        for pix in self.iter() {
            let i = scratch.index(pix);
            if scratch.misc[i] != 0 {
                continue;
            }
            let ang = if curs.last.is_some() {
                (pixel_angle(pix, curs.pixel, curs.last) / FRAC_PI_2) as f32
            } else {
                0.0
            };
            if scratch.cumangle[i] == -1.0 || curs.angle + ang < scratch.cumangle[i] {
                scratch.cumangle[i] = base_angle + ang;
                out.insert(AngularTriple {
                    angle: scratch.cumangle[i],
                    pixel: pix,
                    last: curs.pixel,
                });
            }
        }
    }
}

/// Turn at `curs` on the way to `pix`, in right angles.
fn turn(pix: PixelRef, curs: &MetricTriple) -> f32 {
    if curs.last.is_some() {
        (pixel_angle(pix, curs.pixel, curs.last) / FRAC_PI_2) as f32
    } else {
        0.0
    }
}

// ── Node ───────────────────────────────────────────────────────────

/// The visibility neighbourhood of one cell.
#[derive(Clone, Debug, PartialEq)]
pub struct Node {
    pixel: PixelRef,
    bins: [Bin; BIN_COUNT],
    occlusion_bins: [Vec<PixelRef>; BIN_COUNT],
}

impl Default for Node {
    fn default() -> Self {
        Self {
            pixel: PixelRef::NONE,
            bins: std::array::from_fn(|_| Bin::default()),
            occlusion_bins: std::array::from_fn(|_| Vec::new()),
        }
    }
}

impl Node {
    /// Build the bins of `pix` from per-sector cell lists, draining them.
    ///
    /// `q_octants` restricts the rebuild to sectors produced by those sieve
    /// quadrants; `0xff` rebuilds everything.
    pub fn make(
        &mut self,
        pix: PixelRef,
        bins: &mut [Vec<PixelRef>; BIN_COUNT],
        far_dists: &[f32; BIN_COUNT],
        q_octants: u8,
    ) {
        self.pixel = pix;
        for i in 0..BIN_COUNT {
            if q_octants != 0xff && q_octants & process_octant(i) == 0 {
                continue;
            }
            self.bins[i].set_distance(far_dists[i]);
            let d = match i {
                4 | 20 => dir::POS_DIAGONAL,
                12 | 28 => dir::NEG_DIAGONAL,
                5..=11 | 21..=27 => dir::VERTICAL,
                _ => dir::HORIZONTAL,
            };
            self.bins[i].make(&bins[i], d);
            bins[i].clear();
        }
    }

    /// The cell this node belongs to.
    pub fn pixel(&self) -> PixelRef {
        self.pixel
    }

    /// Sector `i`.
    pub fn bin(&self, i: usize) -> &Bin {
        &self.bins[i]
    }

    pub(crate) fn bin_mut(&mut self, i: usize) -> &mut Bin {
        &mut self.bins[i]
    }

    /// All sectors.
    pub fn bins(&self) -> &[Bin; BIN_COUNT] {
        &self.bins
    }

    /// Distance to the furthest visible cell of sector `i`.
    pub fn bin_distance(&self, i: usize) -> f32 {
        self.bins[i].distance()
    }

    /// Cells just beyond the occluding edges of sector `i`, filled by the
    /// isovist analysis.
    pub fn occlusion_bin(&self, i: usize) -> &[PixelRef] {
        &self.occlusion_bins[i]
    }

    pub(crate) fn occlusion_bin_mut(&mut self, i: usize) -> &mut Vec<PixelRef> {
        &mut self.occlusion_bins[i]
    }

    /// Total number of visible cells over all sectors.
    pub fn count(&self) -> usize {
        self.bins.iter().map(Bin::count).sum()
    }

    /// Every visible cell, sector by sector. Axis cells may repeat.
    pub fn iter(&self) -> impl Iterator<Item = PixelRef> + '_ {
        self.bins.iter().flat_map(Bin::iter)
    }

    /// The visible cells without repeats, in sector order.
    pub fn contents(&self) -> Vec<PixelRef> {
        let mut hood = Vec::new();
        let mut seen = HashSet::new();
        for p in self.iter() {
            if seen.insert(p) {
                hood.push(p);
            }
        }
        hood
    }

    /// True if `p` is visible from this node.
    pub fn contains_point(&self, p: PixelRef) -> bool {
        let (start, end) = if p.x > self.pixel.x {
            if p.y >= self.pixel.y {
                (0, 7)
            } else {
                (25, 31)
            }
        } else if p.y > self.pixel.y {
            (8, 15)
        } else {
            (16, 24)
        };
        (start..=end).any(|i| self.bins[i].contains_point(p))
    }

    /// Rough concavity test: fewer than three consecutive empty axis or
    /// diagonal sectors somewhere around the node.
    pub fn concave_connected(&self) -> bool {
        let empty = |i: usize, mask: u32| if self.bins[i].count() == 0 { mask } else { 0 };
        let mut test = empty(0, 0x101)
            | empty(4, 0x202)
            | empty(8, 0x404)
            | empty(12, 0x808)
            | empty(16, 0x010)
            | empty(20, 0x020)
            | empty(24, 0x040)
            | empty(28, 0x080);
        if test != 0 {
            for _ in 0..8 {
                if (!test & 1) != 0 && (test & 4) != 0 && (!test & 12) != 0 {
                    return true;
                }
                test >>= 1;
            }
        }
        false
    }

    /// True if every axis and diagonal sector sees something.
    pub fn fully_connected(&self) -> bool {
        (0..BIN_COUNT).step_by(4).all(|i| self.bins[i].count() > 0)
    }

    pub(crate) fn extract_unseen(&self, out: &mut Vec<PixelRef>, scratch: &mut Scratch) {
        for (i, bin) in self.bins.iter().enumerate() {
            bin.extract_unseen(out, scratch, 1 << i);
        }
    }

    pub(crate) fn extract_metric(
        &self,
        out: &mut BTreeSet<MetricTriple>,
        scratch: &mut Scratch,
        curs: &MetricTriple,
    ) {
        for bin in &self.bins {
            bin.extract_metric(out, scratch, curs);
        }
    }

    pub(crate) fn extract_angular(
        &self,
        out: &mut BTreeSet<AngularTriple>,
        scratch: &mut Scratch,
        curs: &AngularTriple,
    ) {
        for bin in &self.bins {
            bin.extract_angular(out, scratch, curs);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn px(x: i16, y: i16) -> PixelRef {
        PixelRef::new(x, y)
    }

    // ── Sector tests ───────────────────────────────────────────────

    #[test]
    fn axis_and_diagonal_sectors() {
        assert_eq!(which_bin(Point2f::new(1.0, 0.0)), 0);
        assert_eq!(which_bin(Point2f::new(1.0, 1.0)), 4);
        assert_eq!(which_bin(Point2f::new(0.0, 1.0)), 8);
        assert_eq!(which_bin(Point2f::new(-1.0, 1.0)), 12);
        assert_eq!(which_bin(Point2f::new(-1.0, 0.0)), 16);
        assert_eq!(which_bin(Point2f::new(-1.0, -1.0)), 20);
        assert_eq!(which_bin(Point2f::new(0.0, -1.0)), 24);
        assert_eq!(which_bin(Point2f::new(1.0, -1.0)), 28);
    }

    #[test]
    fn intermediate_sectors_follow_tangent_bands() {
        // 10 degrees above east
        assert_eq!(which_bin(Point2f::new(1.0, 0.176)), 1);
        // 20 degrees
        assert_eq!(which_bin(Point2f::new(1.0, 0.364)), 2);
        // 40 degrees
        assert_eq!(which_bin(Point2f::new(1.0, 0.839)), 3);
        // 10 degrees below east
        assert_eq!(which_bin(Point2f::new(1.0, -0.176)), 31);
    }

    #[test]
    fn zero_vector_is_sector_zero() {
        assert_eq!(which_bin(Point2f::default()), 0);
    }

    #[test]
    fn opposite_quadrants() {
        // facing east, looking back west through quadrants 0 and 2
        assert_eq!(q_opposite(0), (1 << 0) | (1 << 2));
        assert_eq!(flag_octant(2), 1 << 1);
        assert_eq!(process_octant(31), 1 << 3);
        for bin in 0..BIN_COUNT {
            assert_ne!(flag_octant(bin) & process_octant(bin), 0, "bin {bin}");
        }
    }

    // ── Bin tests ──────────────────────────────────────────────────

    #[test]
    fn horizontal_bin_splits_runs() {
        let mut bin = Bin::default();
        bin.make(&[px(3, 1), px(1, 1), px(2, 1), px(5, 1), px(2, 2)], dir::HORIZONTAL);
        assert_eq!(
            bin.pixel_vecs(),
            &[
                PixelVec::new(px(1, 1), px(3, 1)),
                PixelVec::new(px(5, 1), px(5, 1)),
                PixelVec::new(px(2, 2), px(2, 2)),
            ]
        );
        assert_eq!(bin.count(), 5);
        assert_eq!(bin.iter().count(), 5);
    }

    #[test]
    fn vertical_bin_walks_rows() {
        let mut bin = Bin::default();
        bin.make(&[px(4, 2), px(4, 3), px(4, 4)], dir::VERTICAL);
        assert_eq!(bin.pixel_vecs().len(), 1);
        let cells: Vec<PixelRef> = bin.iter().collect();
        assert_eq!(cells, vec![px(4, 2), px(4, 3), px(4, 4)]);
        assert!(bin.contains_point(px(4, 3)));
        assert!(!bin.contains_point(px(3, 3)));
    }

    #[test]
    fn diagonal_bin_spans_first_to_last() {
        let mut bin = Bin::default();
        bin.make(&[px(1, 3), px(2, 2), px(3, 1)], dir::NEG_DIAGONAL);
        let cells: Vec<PixelRef> = bin.iter().collect();
        assert_eq!(cells, vec![px(1, 3), px(2, 2), px(3, 1)]);
        assert!(bin.contains_point(px(2, 2)));
    }

    #[test]
    fn empty_bin_has_no_cells() {
        let mut bin = Bin::default();
        bin.make(&[], dir::HORIZONTAL);
        assert_eq!(bin.count(), 0);
        assert_eq!(bin.iter().count(), 0);
    }

    #[test]
    fn extract_unseen_marks_once() {
        let mut bin = Bin::default();
        bin.make(&[px(1, 0), px(2, 0), px(3, 0)], dir::HORIZONTAL);
        let mut scratch = Scratch::new(4, 1);
        scratch.reset_visual();
        let mut out = Vec::new();
        bin.extract_unseen(&mut out, &mut scratch, 1);
        assert_eq!(out, vec![px(1, 0), px(2, 0), px(3, 0)]);
        out.clear();
        bin.extract_unseen(&mut out, &mut scratch, 1);
        assert!(out.is_empty());
    }

    // ── Node tests ─────────────────────────────────────────────────

    fn plus_node() -> Node {
        let mut bins: [Vec<PixelRef>; BIN_COUNT] = std::array::from_fn(|_| Vec::new());
        bins[0] = vec![px(3, 2), px(4, 2)];
        bins[8] = vec![px(2, 3)];
        bins[16] = vec![px(1, 2)];
        bins[24] = vec![px(2, 1)];
        let mut far = [0.0f32; BIN_COUNT];
        far[0] = 2.0;
        let mut node = Node::default();
        node.make(px(2, 2), &mut bins, &far, 0xff);
        assert!(bins.iter().all(Vec::is_empty));
        node
    }

    #[test]
    fn node_contents_and_queries() {
        let node = plus_node();
        assert_eq!(node.count(), 5);
        assert_eq!(node.contents().len(), 5);
        assert!(node.contains_point(px(4, 2)));
        assert!(node.contains_point(px(2, 1)));
        assert!(!node.contains_point(px(3, 3)));
        assert_eq!(node.bin_distance(0), 2.0);
        assert!(!node.fully_connected());
    }

    #[test]
    fn octant_filter_skips_sectors() {
        let mut bins: [Vec<PixelRef>; BIN_COUNT] = std::array::from_fn(|_| Vec::new());
        bins[0] = vec![px(3, 2)];
        bins[16] = vec![px(1, 2)];
        let mut node = Node::default();
        node.make(px(2, 2), &mut bins, &[0.0; BIN_COUNT], process_octant(0));
        assert_eq!(node.bin(0).count(), 1);
        assert_eq!(node.bin(16).count(), 0);
        assert_eq!(bins[16], vec![px(1, 2)]);
    }
}
