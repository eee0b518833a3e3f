//! Shortest walked-distance analyses over the visibility graph.
//!
//! A walk moves in straight lines between visible cells, turning only at
//! cells next to a wall (and at the origin). Distances are accumulated in
//! cell units and scaled by the grid spacing when written. The turn taken
//! along the shortest walk is tracked too, in right angles.

use std::collections::BTreeSet;

use sala_core::pixel::pixel_dist;
use sala_core::{Communicator, PixelRef, Progress};
use sala_space::PixelBase;

use crate::config::MetricOptions;
use crate::error::PointMapError;
use crate::pointmap::PointMap;
use crate::search::{radius_suffix, MetricTriple, Scratch, VISITED};

/// Column written by [`PointMap::analyse_metric_point_depth`]: turn along the shortest walk.
pub const METRIC_STEP_ANGLE_COL: &str = "Metric Step Shortest-Path Angle";
/// Column written by [`PointMap::analyse_metric_point_depth`]: shortest walk length.
pub const METRIC_STEP_LENGTH_COL: &str = "Metric Step Shortest-Path Length";
/// Column written by [`PointMap::analyse_metric_point_depth`] when exactly
/// one cell is selected.
pub const METRIC_STRAIGHT_LINE_COL: &str = "Metric Straight-Line Distance";

struct MetricTotals {
    path_angle: f64,
    path_length: f64,
    euclid: f64,
    nodes: usize,
}

impl PointMap {
    /// Mean shortest-walk angle, mean shortest-walk distance, mean
    /// straight-line distance and node count from every filled cell, over
    /// the cells within `radius` walked distance.
    pub fn analyse_metric(
        &mut self,
        options: &MetricOptions,
        comm: Option<&mut dyn Communicator>,
    ) -> Result<(), PointMapError> {
        options.validate()?;
        self.require_graph()?;

        let suffix = radius_suffix(options.radius, self.region().width());
        let angle_col = self
            .attributes
            .insert_or_reset_column(&format!("Metric Mean Shortest-Path Angle{suffix}"));
        let length_col = self
            .attributes
            .insert_or_reset_column(&format!("Metric Mean Shortest-Path Distance{suffix}"));
        let euclid_col = self
            .attributes
            .insert_or_reset_column(&format!("Metric Mean Straight-Line Distance{suffix}"));
        let count_col = self
            .attributes
            .insert_or_reset_column(&format!("Metric Node Count{suffix}"));

        let mut progress = Progress::new(comm);
        progress.start(self.filled_count);
        let mut scratch = Scratch::new(self.cols as usize, self.rows as usize);
        let mut count = 0;

        for curs in self.each_pixel() {
            if !self.pt(curs).is_filled() {
                continue;
            }
            count += 1;
            if options.gates_only {
                continue;
            }
            let totals = self.metric_totals(curs, options.radius, &mut scratch);
            let n = totals.nodes as f64;
            let key = curs.packed();
            self.attributes.set_value(key, angle_col, (totals.path_angle / n) as f32);
            self.attributes.set_value(key, length_col, (totals.path_length / n) as f32);
            self.attributes.set_value(key, euclid_col, (totals.euclid / n) as f32);
            self.attributes.set_value(key, count_col, n as f32);

            if let Err(e) = progress.tick(count) {
                self.drop_columns(vec![angle_col, length_col, euclid_col, count_col]);
                log::warn!("point map '{}': metric analysis cancelled after {} cells", self.name(), count);
                return Err(e.into());
            }
        }

        log::info!(
            "point map '{}': metric analysis over {} cells (radius {})",
            self.name(),
            count,
            options.radius
        );
        Ok(())
    }

    /// Shortest walk length and turn from the selected cells. With exactly
    /// one cell selected the straight-line distance is written as well.
    pub fn analyse_metric_point_depth(&mut self) -> Result<(), PointMapError> {
        self.require_selection()?;
        let angle_col = self.attributes.insert_or_reset_column(METRIC_STEP_ANGLE_COL);
        let length_col = self.attributes.insert_or_reset_column(METRIC_STEP_LENGTH_COL);
        let single = match self.selection.len() {
            1 => self.selection.first().copied(),
            _ => None,
        };
        let euclid_col = single.map(|_| self.attributes.insert_or_reset_column(METRIC_STRAIGHT_LINE_COL));

        let mut scratch = Scratch::new(self.cols as usize, self.rows as usize);
        scratch.reset_metric();
        let mut search: BTreeSet<MetricTriple> = self
            .selection
            .iter()
            .map(|&sel| MetricTriple::origin(0.0, sel))
            .collect();

        // (cell, walked distance, accumulated turn)
        let mut reached = Vec::new();
        while let Some(here) = search.pop_first() {
            if let Some(partner) = self.expand_metric(&here, &mut search, &mut scratch) {
                reached.push((here.pixel, here.dist, scratch.cumangle[scratch.index(here.pixel)]));
                if let Some(p) = partner {
                    reached.push((p, here.dist, scratch.cumangle[scratch.index(p)]));
                }
            }
        }

        let s = self.spacing;
        for (pix, dist, angle) in reached {
            let key = pix.packed();
            self.attributes.set_value(key, length_col, (s * f64::from(dist)) as f32);
            self.attributes.set_value(key, angle_col, angle);
            if let (Some(col), Some(origin)) = (euclid_col, single) {
                self.attributes.set_value(key, col, (s * pixel_dist(pix, origin)) as f32);
            }
        }
        log::debug!("point map '{}': metric step depth written", self.name());
        Ok(())
    }

    fn metric_totals(&self, curs: PixelRef, radius: f64, scratch: &mut Scratch) -> MetricTotals {
        scratch.reset_metric();
        let mut totals = MetricTotals {
            path_angle: 0.0,
            path_length: 0.0,
            euclid: 0.0,
            nodes: 0,
        };
        let s = self.spacing;
        let mut search = BTreeSet::from([MetricTriple::origin(0.0, curs)]);
        while let Some(here) = search.pop_first() {
            if radius != -1.0 && f64::from(here.dist) * s > radius {
                break;
            }
            if self.expand_metric(&here, &mut search, scratch).is_some() {
                totals.path_length += f64::from(here.dist) * s;
                totals.path_angle += f64::from(scratch.cumangle[scratch.index(here.pixel)]);
                totals.euclid += s * pixel_dist(here.pixel, curs);
                totals.nodes += 1;
            }
        }
        totals
    }

    /// Expand `here` if it is filled and not yet expanded, then its merge
    /// partner at the same distance and turn.
    ///
    /// Returns `None` if `here` was skipped, otherwise whether the partner
    /// was expanded too.
    fn expand_metric(
        &self,
        here: &MetricTriple,
        search: &mut BTreeSet<MetricTriple>,
        scratch: &mut Scratch,
    ) -> Option<Option<PixelRef>> {
        let pt = self.pt(here.pixel);
        let i = scratch.index(here.pixel);
        if !pt.is_filled() || scratch.misc[i] == VISITED {
            return None;
        }
        if let Some(node) = pt.node() {
            if self.is_turning_cell(here.pixel, here.dist) {
                node.extract_metric(search, scratch, here);
            }
        }
        scratch.misc[i] = VISITED;

        let Some(partner) = pt.merge_pixel() else {
            return Some(None);
        };
        let j = scratch.index(partner);
        if scratch.misc[j] == VISITED {
            return Some(None);
        }
        scratch.cumangle[j] = scratch.cumangle[i];
        let jump = MetricTriple::origin(here.dist, partner);
        if let Some(node) = self.pt(partner).node() {
            if self.is_turning_cell(partner, here.dist) {
                node.extract_metric(search, scratch, &jump);
            }
        }
        scratch.misc[j] = VISITED;
        Some(Some(partner))
    }

    /// Walks only change direction at their start or beside a wall.
    pub(crate) fn is_turning_cell(&self, pix: PixelRef, so_far: f32) -> bool {
        so_far == 0.0 || self.pt(pix).is_blocked() || self.blocked_adjacent(pix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{FillType, GridConfig, SparkConfig};
    use sala_core::{Line, Point2f, QtRegion};

    fn graph(w: f64, h: f64, extra: &[Line], seed: Point2f) -> PointMap {
        let r = QtRegion::new(Point2f::new(0.0, 0.0), Point2f::new(w, h));
        let c = [
            Point2f::new(0.0, 0.0),
            Point2f::new(w, 0.0),
            Point2f::new(w, h),
            Point2f::new(0.0, h),
        ];
        let mut lines: Vec<Line> = (0..4).map(|i| Line::new(c[i], c[(i + 1) % 4])).collect();
        lines.extend_from_slice(extra);
        let mut map = PointMap::new("metric", r, lines);
        map.set_grid(&GridConfig::with_spacing(1.0)).unwrap();
        map.make_points(seed, FillType::Full, None).unwrap();
        map.spark_graph(&SparkConfig::default(), None).unwrap();
        map
    }

    fn partitioned() -> PointMap {
        let wall = Line::new(Point2f::new(3.0, 0.0), Point2f::new(3.0, 2.5));
        graph(6.0, 4.0, &[wall], Point2f::new(1.0, 1.0))
    }

    fn value(map: &PointMap, pix: PixelRef, col: &str) -> f32 {
        let c = map.attributes().column_index(col).unwrap();
        map.attributes().value(pix.packed(), c).unwrap()
    }

    // ── metric tests ──

    #[test]
    fn open_room_walks_are_straight() {
        let mut map = graph(4.0, 4.0, &[], Point2f::new(2.0, 2.0));
        map.analyse_metric(&MetricOptions::default(), None).unwrap();
        let pix = PixelRef::new(2, 2);
        let expected = (4.0 + 4.0 * 2f64.sqrt()) / 9.0;
        assert_eq!(value(&map, pix, "Metric Node Count"), 9.0);
        assert!((f64::from(value(&map, pix, "Metric Mean Shortest-Path Distance")) - expected).abs() < 1e-5);
        assert!((f64::from(value(&map, pix, "Metric Mean Straight-Line Distance")) - expected).abs() < 1e-5);
        assert_eq!(value(&map, pix, "Metric Mean Shortest-Path Angle"), 0.0);
    }

    #[test]
    fn radius_limits_reach() {
        let mut map = graph(6.0, 6.0, &[], Point2f::new(3.0, 3.0));
        let options = MetricOptions {
            radius: 1.2,
            ..MetricOptions::default()
        };
        map.analyse_metric(&options, None).unwrap();
        // origin plus its four axis neighbours
        assert_eq!(value(&map, PixelRef::new(3, 3), "Metric Node Count R1.20"), 5.0);
    }

    #[test]
    fn needs_a_graph() {
        let mut map = PointMap::new("bare", QtRegion::default(), Vec::new());
        assert_eq!(
            map.analyse_metric(&MetricOptions::default(), None),
            Err(PointMapError::NotProcessed)
        );
    }

    // ── step depth tests ──

    #[test]
    fn walk_round_partition_is_longer_than_straight_line() {
        let mut map = partitioned();
        let far = PixelRef::new(5, 1);
        assert!(map.point(far).unwrap().is_filled());
        map.set_cur_sel_pixels(&[PixelRef::new(1, 1)], false);
        map.analyse_metric_point_depth().unwrap();
        let walked = value(&map, far, METRIC_STEP_LENGTH_COL);
        let straight = value(&map, far, METRIC_STRAIGHT_LINE_COL);
        assert!((straight - 4.0).abs() < 1e-6);
        assert!(walked > straight);
        assert!(value(&map, far, METRIC_STEP_ANGLE_COL) > 0.0);
        assert_eq!(value(&map, PixelRef::new(1, 1), METRIC_STEP_LENGTH_COL), 0.0);
    }

    #[test]
    fn several_seeds_skip_straight_line_column() {
        let mut map = partitioned();
        map.set_cur_sel_pixels(&[PixelRef::new(1, 1), PixelRef::new(1, 2)], false);
        map.analyse_metric_point_depth().unwrap();
        assert!(map.attributes().column_index(METRIC_STRAIGHT_LINE_COL).is_none());
        assert_eq!(value(&map, PixelRef::new(1, 2), METRIC_STEP_LENGTH_COL), 0.0);
    }
}
