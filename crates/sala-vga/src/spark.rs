//! Visibility graph construction.
//!
//! Each filled cell sweeps its eight octants outwards one ring at a time.
//! A [`SparkSieve`] tracks which tangents of the octant are still open;
//! cells at open tangents whose sight line clears the walls are visible,
//! and the walls found in every ring visited close the sieve further. The
//! sweep stops when the octant is closed or the grid edge is reached.

use sala_core::geometry::Line;
use sala_core::pixel::{dir, pixel_dist};
use sala_core::{Communicator, PixelRef, Progress};
use sala_space::PixelBase;

use crate::config::SparkConfig;
use crate::error::PointMapError;
use crate::node::{which_bin, Node, BIN_COUNT};
use crate::point::state;
use crate::pointmap::{PointMap, LINE_TOUCH_TOL};
use crate::sieve::SparkSieve;

/// Column written by [`PointMap::spark_graph`]: number of visible cells.
pub const CONNECTIVITY_COL: &str = "Connectivity";
/// Column written by [`PointMap::spark_graph`]: sum of sight distances.
pub const FIRST_MOMENT_COL: &str = "Point First Moment";
/// Column written by [`PointMap::spark_graph`]: sum of squared sight distances.
pub const SECOND_MOMENT_COL: &str = "Point Second Moment";

/// Per-cell sweep accumulators, reused across cells.
struct SparkBins {
    bins: [Vec<PixelRef>; BIN_COUNT],
    far: [f32; BIN_COUNT],
}

impl SparkBins {
    fn new() -> Self {
        Self {
            bins: std::array::from_fn(|_| Vec::new()),
            far: [0.0; BIN_COUNT],
        }
    }
}

impl PointMap {
    /// Build the visibility graph over every filled cell.
    ///
    /// Any previous graph and analysis results are discarded. With
    /// `boundary_graph` set, filled cells that are not edges are dropped
    /// first. On cancellation every node and attribute row built so far
    /// is removed and any dropped cells are filled again.
    pub fn spark_graph(
        &mut self,
        config: &SparkConfig,
        comm: Option<&mut dyn Communicator>,
    ) -> Result<(), PointMapError> {
        config.validate()?;
        if !self.is_initialised() {
            return Err(PointMapError::GridNotSet);
        }
        self.block_lines()?;

        let mut dropped = Vec::new();
        if config.boundary_graph {
            for (i, pt) in self.points.iter_mut().enumerate() {
                if pt.is_filled() && !pt.is_edge() {
                    pt.state &= !state::FILLED;
                    dropped.push(i);
                }
            }
            self.filled_count -= dropped.len();
        }

        for pt in &mut self.points {
            pt.node = None;
        }
        self.attributes = Default::default();
        self.has_isovist_analysis = false;
        let connectivity = self.attributes.get_or_insert_column(CONNECTIVITY_COL);
        let first_moment = self.attributes.get_or_insert_column(FIRST_MOMENT_COL);
        let second_moment = self.attributes.get_or_insert_column(SECOND_MOMENT_COL);

        let total = self.tag_state(true);
        let mut progress = Progress::new(comm);
        progress.start(total);

        let mut scratch = SparkBins::new();
        let mut count = 0;
        for curs in self.each_pixel() {
            if !self.pt(curs).is_filled() {
                continue;
            }
            self.attributes.add_row(curs.packed());
            let stats = self.spark_pixel(curs, config.max_dist, &mut scratch);
            let key = curs.packed();
            self.attributes.set_value(key, connectivity, stats.neighbourhood as f32);
            self.attributes.set_value(key, first_moment, stats.total_dist as f32);
            self.attributes.set_value(key, second_moment, stats.total_dist_sqr as f32);

            count += 1;
            if let Err(e) = progress.tick(count) {
                self.tag_state(false);
                for pt in &mut self.points {
                    pt.node = None;
                }
                self.attributes = Default::default();
                for &i in &dropped {
                    self.points[i].state |= state::FILLED;
                }
                self.filled_count += dropped.len();
                log::warn!("point map '{}': graph build cancelled after {} cells", self.name(), count);
                return Err(e.into());
            }
        }

        self.tag_state(false);
        self.unblock_lines(false);
        self.add_grid_connections();
        self.processed = true;
        self.boundary_graph = config.boundary_graph;

        log::info!(
            "point map '{}': visibility graph over {} cells ({} grid)",
            self.name(),
            count,
            if config.boundary_graph { "boundary" } else { "full" }
        );
        Ok(())
    }

    fn spark_pixel(&mut self, curs: PixelRef, max_dist: f64, acc: &mut SparkBins) -> SparkStats {
        acc.far = [0.0; BIN_COUNT];
        let mut stats = SparkStats::default();
        let centre = self.depixelate(curs, 1.0);
        let process_flag = self.pt(curs).process_flag;
        let border = self.spacing * 1e-10;

        for q in 0..8 {
            if process_flag & (1 << q) == 0 {
                continue;
            }
            let mut sieve = SparkSieve::new(centre, max_dist);

            // walls within the cell itself, on this octant's side
            let mut viewport = self.regionate(curs, LINE_TOUCH_TOL);
            match q {
                0 => {
                    viewport.top_right.x = centre.x;
                    viewport.bottom_left.y = centre.y - border;
                }
                6 => {
                    viewport.top_right.x = centre.x + border;
                    viewport.bottom_left.y = centre.y;
                }
                1 => {
                    viewport.bottom_left.x = centre.x;
                    viewport.bottom_left.y = centre.y - border;
                }
                7 => {
                    viewport.bottom_left.x = centre.x - border;
                    viewport.bottom_left.y = centre.y;
                }
                2 => {
                    viewport.top_right.x = centre.x;
                    viewport.top_right.y = centre.y + border;
                }
                4 => {
                    viewport.top_right.x = centre.x + border;
                    viewport.top_right.y = centre.y;
                }
                3 => {
                    viewport.bottom_left.x = centre.x;
                    viewport.top_right.y = centre.y + border;
                }
                _ => {
                    viewport.bottom_left.x = centre.x - border;
                    viewport.top_right.y = centre.y;
                }
            }
            let own: Vec<Line> = self
                .pt(curs)
                .lines()
                .filter_map(|l| {
                    let mut l = *l;
                    l.crop(&viewport).then_some(l)
                })
                .collect();
            sieve.block(&own, q);
            sieve.collect_garbage();

            let mut added = Vec::new();
            let mut depth = 1;
            while sieve.has_gaps() {
                added.clear();
                if !self.sieve_ring(&mut sieve, &mut added, q, depth, curs) {
                    break;
                }
                for &pix in &added {
                    if !self.pt(pix).is_filled() {
                        continue;
                    }
                    let bin = which_bin(self.depixelate(pix, 1.0) - centre);
                    let d = pixel_dist(pix, curs) * self.spacing;
                    if d > f64::from(acc.far[bin]) {
                        acc.far[bin] = d as f32;
                    }
                    stats.total_dist += d;
                    stats.total_dist_sqr += d * d;
                    stats.neighbourhood += 1;
                    acc.bins[bin].push(pix);
                }
                depth += 1;
            }
        }

        let mut node = Box::new(Node::default());
        node.make(curs, &mut acc.bins, &acc.far, process_flag);
        let pt = self.pt_mut(curs);
        pt.node = Some(node);
        pt.process_flag = 0;
        stats
    }

    /// Walk ring `depth` of octant `q` through the open gaps, collecting
    /// visible filled cells and blocking the walls found. Returns false once
    /// the ring lies wholly off the grid.
    fn sieve_ring(
        &self,
        sieve: &mut SparkSieve,
        added: &mut Vec<PixelRef>,
        q: usize,
        depth: i32,
        curs: PixelRef,
    ) -> bool {
        let mut has_gaps = false;
        let mut first_ind = 0;
        let tol = self.spacing * 1e-10;
        let d = f64::from(depth);

        for g in 0..sieve.gaps().len() {
            let gap = sieve.gaps()[g];
            let lo = (gap.start * (d - 0.5) - 0.5).ceil() as i32;
            let hi = (gap.end * (d + 0.5) + 0.5).floor() as i32;
            for ind in lo..=hi {
                if ind < first_ind {
                    continue;
                }
                if ind > depth {
                    break;
                }
                first_ind = ind;

                let (x, y) = if q >= 4 { (ind, depth) } else { (depth, ind) };
                let dx = if q % 2 == 1 { x } else { -x };
                let dy = if q <= 1 || q >= 6 { y } else { -y };
                let here = PixelRef::new(
                    (i32::from(curs.x) + dx) as i16,
                    (i32::from(curs.y) + dy) as i16,
                );
                if !self.includes(here) {
                    continue;
                }
                has_gaps = true;

                let pt = self.pt(here);
                let centre_gap = f64::from(ind) >= gap.start * d && f64::from(ind) <= gap.end * d;
                // axes and diagonals belong to one octant only
                let owns_cell = (ind != 0 || matches!(q, 0 | 1 | 5 | 6)) && (ind != depth || q < 4);
                if centre_gap
                    && pt.is_filled()
                    && owns_cell
                    && !sieve.test_block(self.depixelate(here, 1.0), pt.lines(), tol)
                {
                    added.push(here);
                }
                sieve.block(pt.lines(), q);
            }
        }
        sieve.collect_garbage();
        has_gaps
    }

    /// Record, for every node, which of its eight immediate neighbours it
    /// can see (see [`grid`](crate::point::grid)).
    pub fn add_grid_connections(&mut self) {
        let keys: Vec<i32> = self.attributes.keys().collect();
        for key in keys {
            let curs = PixelRef::from_packed(key);
            if !self.includes(curs) {
                continue;
            }
            let mut conns = 0u8;
            if let Some(node) = self.pt(curs).node() {
                let mut target = curs.right();
                for i in (0..BIN_COUNT).step_by(4) {
                    if node.bin(i).iter().any(|p| p == target) {
                        conns |= 1 << (i / 4);
                    }
                    let step = match i {
                        0 => dir::VERTICAL,
                        4 | 8 => dir::NEG_HORIZONTAL,
                        12 | 16 => dir::NEG_VERTICAL,
                        _ => dir::HORIZONTAL,
                    };
                    target = target.moved(step);
                }
            }
            self.pt_mut(curs).grid_connections = conns;
        }
    }
}

#[derive(Clone, Copy, Debug, Default)]
struct SparkStats {
    neighbourhood: usize,
    total_dist: f64,
    total_dist_sqr: f64,
}
