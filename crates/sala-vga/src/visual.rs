//! Step-depth analyses over the visibility graph.
//!
//! A visual step is one hop between mutually visible cells. The global
//! measures run a breadth-first search from every origin cell; the local
//! measures look only at the origin's neighbourhood and the neighbourhoods
//! of its neighbours. Merged cells share depth: reaching one end of a merge
//! link expands the other end at the same level.

use std::collections::HashSet;

use sala_core::measures::{depth_entropy, DepthSummary};
use sala_core::{Communicator, PixelRef, Progress, NO_VALUE};

use crate::config::VisualOptions;
use crate::error::PointMapError;
use crate::pointmap::PointMap;
use crate::search::{Scratch, VISITED};

/// Column written by [`PointMap::analyse_visual_point_depth`].
pub const VISUAL_STEP_DEPTH_COL: &str = "Visual Step Depth";

struct GlobalCols {
    entropy: usize,
    integ_hh: usize,
    integ_pv: usize,
    integ_tk: usize,
    mean_depth: usize,
    node_count: usize,
    rel_entropy: usize,
}

impl GlobalCols {
    fn insert(map: &mut PointMap, radius: f64) -> Self {
        let suffix = if radius == -1.0 {
            String::new()
        } else {
            format!(" R{}", radius as i32)
        };
        let mut col = |name: &str| map.attributes.insert_or_reset_column(&format!("{name}{suffix}"));
        Self {
            entropy: col("Visual Entropy"),
            integ_hh: col("Visual Integration [HH]"),
            integ_pv: col("Visual Integration [P-value]"),
            integ_tk: col("Visual Integration [Tekl]"),
            mean_depth: col("Visual Mean Depth"),
            node_count: col("Visual Node Count"),
            rel_entropy: col("Visual Relativised Entropy"),
        }
    }

    fn all(&self) -> Vec<usize> {
        vec![
            self.entropy,
            self.integ_hh,
            self.integ_pv,
            self.integ_tk,
            self.mean_depth,
            self.node_count,
            self.rel_entropy,
        ]
    }
}

struct LocalCols {
    cluster: usize,
    control: usize,
    controllability: usize,
}

impl LocalCols {
    fn insert(map: &mut PointMap) -> Self {
        Self {
            cluster: map.attributes.insert_or_reset_column("Visual Clustering Coefficient"),
            control: map.attributes.insert_or_reset_column("Visual Control"),
            controllability: map.attributes.insert_or_reset_column("Visual Controllability"),
        }
    }
}

/// Result of one breadth-first search.
struct DepthSearch {
    total_depth: usize,
    node_count: usize,
    /// Cells reached at each level; level 0 is the origin.
    distribution: Vec<usize>,
}

impl PointMap {
    /// Visual step-depth measures for every filled cell.
    ///
    /// Global measures write mean depth, node count, the three integration
    /// normalisations and the two depth entropies; undefined values are -1.
    /// Local measures write clustering coefficient, control and
    /// controllability. Context cells at odd positions are not used as
    /// origins. On cancellation the columns of this run are removed.
    pub fn analyse_visual(
        &mut self,
        options: &VisualOptions,
        comm: Option<&mut dyn Communicator>,
    ) -> Result<(), PointMapError> {
        options.validate()?;
        self.require_graph()?;

        let global = options.global.then(|| GlobalCols::insert(self, options.radius));
        let local = options.local.then(|| LocalCols::insert(self));
        let mut added = Vec::new();
        if let Some(g) = &global {
            added.extend(g.all());
        }
        if let Some(l) = &local {
            added.extend([l.cluster, l.control, l.controllability]);
        }

        let mut progress = Progress::new(comm);
        progress.start(self.filled_count);
        let radius = options.radius as i32;
        let mut scratch = Scratch::new(self.cols as usize, self.rows as usize);
        let mut count = 0;

        for curs in self.each_pixel() {
            let pt = self.pt(curs);
            if !pt.is_filled() {
                continue;
            }
            count += 1;
            if (pt.is_context_filled() && !curs.is_even()) || options.gates_only {
                continue;
            }
            let key = curs.packed();

            if let Some(cols) = &global {
                let search = self.visual_depths(curs, radius, &mut scratch);
                self.write_global(key, cols, &search);
            }
            if let Some(cols) = &local {
                let (cluster, control, controllability) = self.visual_local(curs);
                self.attributes.set_value(key, cols.cluster, cluster);
                self.attributes.set_value(key, cols.control, control);
                self.attributes.set_value(key, cols.controllability, controllability);
            }

            if let Err(e) = progress.tick(count) {
                self.drop_columns(added);
                log::warn!("point map '{}': visual analysis cancelled after {} cells", self.name(), count);
                return Err(e.into());
            }
        }

        log::info!(
            "point map '{}': visual analysis over {} cells (radius {})",
            self.name(),
            count,
            options.radius
        );
        Ok(())
    }

    /// Visual step depth from the selected cells, written to
    /// [`VISUAL_STEP_DEPTH_COL`]. Unreached cells keep -1.
    pub fn analyse_visual_point_depth(&mut self) -> Result<(), PointMapError> {
        self.require_selection()?;
        let col = self.attributes.insert_or_reset_column(VISUAL_STEP_DEPTH_COL);
        let mut scratch = Scratch::new(self.cols as usize, self.rows as usize);
        scratch.reset_visual();

        let mut current: Vec<PixelRef> = self.selection.iter().copied().collect();
        let mut level = 0usize;
        let mut depths = Vec::new();
        while !current.is_empty() {
            let mut next = Vec::new();
            for &pix in current.iter().rev() {
                let pt = self.pt(pix);
                let i = scratch.index(pix);
                if !pt.is_filled() || scratch.misc[i] == VISITED {
                    continue;
                }
                depths.push((pix, level));
                if !pt.is_context_filled() || pix.is_even() || level == 0 {
                    if let Some(partner) = self.expand_visual(pix, &mut next, &mut scratch) {
                        depths.push((partner, level));
                    }
                } else {
                    scratch.misc[i] = VISITED;
                }
            }
            current = next;
            level += 1;
        }

        let reached = depths.len();
        for (pix, level) in depths {
            self.attributes.set_value(pix.packed(), col, level as f32);
        }
        log::debug!(
            "point map '{}': visual step depth from {} cells reached {}",
            self.name(),
            self.selection.len(),
            reached
        );
        Ok(())
    }

    /// Breadth-first search from `origin`, stopping expansion at `radius`
    /// levels (-1 for no limit).
    fn visual_depths(&self, origin: PixelRef, radius: i32, scratch: &mut Scratch) -> DepthSearch {
        scratch.reset_visual();
        let mut search = DepthSearch {
            total_depth: 0,
            node_count: 0,
            distribution: Vec::new(),
        };
        let mut current = vec![origin];
        let mut level = 0i32;
        while !current.is_empty() {
            let mut next = Vec::new();
            let mut at_level = 0;
            for &pix in current.iter().rev() {
                let pt = self.pt(pix);
                let i = scratch.index(pix);
                if !pt.is_filled() || scratch.misc[i] == VISITED {
                    continue;
                }
                search.total_depth += level as usize;
                search.node_count += 1;
                at_level += 1;
                if radius == -1 || (level < radius && (!pt.is_context_filled() || pix.is_even())) {
                    self.expand_visual(pix, &mut next, scratch);
                } else {
                    scratch.misc[i] = VISITED;
                }
            }
            search.distribution.push(at_level);
            current = next;
            level += 1;
        }
        search
    }

    /// Queue the unseen neighbours of `pix`, and of its merge partner if
    /// that has not been expanded yet. Returns the partner when it was.
    fn expand_visual(&self, pix: PixelRef, next: &mut Vec<PixelRef>, scratch: &mut Scratch) -> Option<PixelRef> {
        let pt = self.pt(pix);
        if let Some(node) = pt.node() {
            node.extract_unseen(next, scratch);
        }
        let i = scratch.index(pix);
        scratch.misc[i] = VISITED;

        let partner = pt.merge_pixel()?;
        let j = scratch.index(partner);
        if scratch.misc[j] == VISITED {
            return None;
        }
        if let Some(node) = self.pt(partner).node() {
            node.extract_unseen(next, scratch);
        }
        scratch.misc[j] = VISITED;
        Some(partner)
    }

    fn write_global(&mut self, key: i32, cols: &GlobalCols, search: &DepthSearch) {
        let table = &mut self.attributes;
        table.set_value(key, cols.node_count, search.node_count as f32);
        match DepthSummary::new(search.total_depth as f64, search.node_count as f64) {
            Some(summary) => {
                table.set_value(key, cols.mean_depth, summary.mean_depth as f32);
                let or_none = |v: Option<f64>| v.map_or(NO_VALUE, |v| v as f32);
                table.set_value(key, cols.integ_hh, or_none(summary.integration_hh));
                table.set_value(key, cols.integ_pv, or_none(summary.integration_pv));
                table.set_value(key, cols.integ_tk, or_none(summary.integration_tk));
                let (entropy, rel_entropy) =
                    depth_entropy(&search.distribution, search.node_count, summary.mean_depth);
                table.set_value(key, cols.entropy, entropy as f32);
                table.set_value(key, cols.rel_entropy, rel_entropy as f32);
            }
            None => {
                table.set_value(key, cols.mean_depth, NO_VALUE);
                table.set_value(key, cols.entropy, NO_VALUE);
                table.set_value(key, cols.rel_entropy, NO_VALUE);
            }
        }
    }

    /// Clustering coefficient, control and controllability of `curs`, or
    /// -1 for all three when it sees fewer than two cells.
    fn visual_local(&self, curs: PixelRef) -> (f32, f32, f32) {
        let Some(node) = self.pt(curs).node() else {
            return (NO_VALUE, NO_VALUE, NO_VALUE);
        };
        let mut hood = node.contents();
        hood.sort_unstable();
        if hood.len() <= 1 {
            return (NO_VALUE, NO_VALUE, NO_VALUE);
        }

        let mut total: HashSet<PixelRef> = HashSet::new();
        let mut cluster = 0usize;
        let mut control = 0.0f32;
        for &pix in &hood {
            let pt = self.pt(pix);
            let Some(retro) = pt.node().filter(|_| pt.is_filled()) else {
                continue;
            };
            let mut retro_size = 0;
            for p in retro.iter() {
                retro_size += 1;
                if hood.binary_search(&p).is_ok() {
                    cluster += 1;
                }
                total.insert(p);
            }
            if retro_size > 0 {
                control += 1.0 / retro_size as f32;
            }
        }

        let n = hood.len() as f64;
        (
            (cluster as f64 / (n * (n - 1.0))) as f32,
            control,
            (n / total.len().max(1) as f64) as f32,
        )
    }
}
