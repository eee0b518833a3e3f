//! Least-turn analyses over the visibility graph.
//!
//! Like the metric walk, but the search orders cells by the total turn
//! taken to reach them (1.0 per right angle) instead of by distance.

use std::collections::BTreeSet;

use sala_core::{Communicator, PixelRef, Progress};
use sala_space::PixelBase;

use crate::config::AngularOptions;
use crate::error::PointMapError;
use crate::pointmap::PointMap;
use crate::search::{radius_suffix, AngularTriple, Scratch, VISITED};

/// Column written by [`PointMap::analyse_angular_point_depth`].
pub const ANGULAR_STEP_DEPTH_COL: &str = "Angular Step Depth";

impl PointMap {
    /// Mean and total least-turn depth and node count from every filled
    /// cell, over the cells reached within `radius` accumulated turn.
    pub fn analyse_angular(
        &mut self,
        options: &AngularOptions,
        comm: Option<&mut dyn Communicator>,
    ) -> Result<(), PointMapError> {
        options.validate()?;
        self.require_graph()?;

        let suffix = radius_suffix(options.radius, self.region().width());
        let mean_col = self
            .attributes
            .insert_or_reset_column(&format!("Angular Mean Depth{suffix}"));
        let total_col = self
            .attributes
            .insert_or_reset_column(&format!("Angular Total Depth{suffix}"));
        let count_col = self
            .attributes
            .insert_or_reset_column(&format!("Angular Node Count{suffix}"));

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

            scratch.reset_angular();
            let i = scratch.index(curs);
            scratch.cumangle[i] = 0.0;
            let mut total_angle = 0.0f32;
            let mut nodes = 0usize;
            let mut search = BTreeSet::from([AngularTriple::origin(0.0, curs)]);
            while let Some(here) = search.pop_first() {
                if options.radius != -1.0 && f64::from(here.angle) > options.radius {
                    break;
                }
                if self.expand_angular(&here, &mut search, &mut scratch).is_some() {
                    total_angle += scratch.cumangle[scratch.index(here.pixel)];
                    nodes += 1;
                }
            }

            let key = curs.packed();
            if nodes > 0 {
                self.attributes.set_value(key, mean_col, total_angle / nodes as f32);
            }
            self.attributes.set_value(key, total_col, total_angle);
            self.attributes.set_value(key, count_col, nodes as f32);

            if let Err(e) = progress.tick(count) {
                self.drop_columns(vec![mean_col, total_col, count_col]);
                log::warn!("point map '{}': angular analysis cancelled after {} cells", self.name(), count);
                return Err(e.into());
            }
        }

        log::info!(
            "point map '{}': angular analysis over {} cells (radius {})",
            self.name(),
            count,
            options.radius
        );
        Ok(())
    }

    /// Least accumulated turn from the selected cells, written to
    /// [`ANGULAR_STEP_DEPTH_COL`].
    pub fn analyse_angular_point_depth(&mut self) -> Result<(), PointMapError> {
        self.require_selection()?;
        let col = self.attributes.insert_or_reset_column(ANGULAR_STEP_DEPTH_COL);

        let mut scratch = Scratch::new(self.cols as usize, self.rows as usize);
        scratch.reset_angular();
        let mut search = BTreeSet::new();
        for &sel in &self.selection {
            search.insert(AngularTriple::origin(0.0, sel));
            let i = scratch.index(sel);
            scratch.cumangle[i] = 0.0;
        }

        let mut reached = Vec::new();
        while let Some(here) = search.pop_first() {
            if let Some(partner) = self.expand_angular(&here, &mut search, &mut scratch) {
                reached.push(here.pixel);
                reached.extend(partner);
            }
        }

        for pix in reached {
            let angle = scratch.cumangle[scratch.index(pix)];
            self.attributes.set_value(pix.packed(), col, angle);
        }
        log::debug!("point map '{}': angular step depth written", self.name());
        Ok(())
    }

    /// Expand `here` and its merge partner; see the metric equivalent.
    fn expand_angular(
        &self,
        here: &AngularTriple,
        search: &mut BTreeSet<AngularTriple>,
        scratch: &mut Scratch,
    ) -> Option<Option<PixelRef>> {
        let pt = self.pt(here.pixel);
        let i = scratch.index(here.pixel);
        if !pt.is_filled() || scratch.misc[i] == VISITED {
            return None;
        }
        if let Some(node) = pt.node() {
            if self.is_turning_cell(here.pixel, here.angle) {
                node.extract_angular(search, scratch, here);
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
        let jump = AngularTriple::origin(here.angle, partner);
        if let Some(node) = self.pt(partner).node() {
            if self.is_turning_cell(partner, here.angle) {
                node.extract_angular(search, scratch, &jump);
            }
        }
        scratch.misc[j] = VISITED;
        Some(Some(partner))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{FillType, GridConfig, SparkConfig};
    use sala_core::{Line, Point2f, QtRegion};

    fn partitioned() -> PointMap {
        let r = QtRegion::new(Point2f::new(0.0, 0.0), Point2f::new(6.0, 4.0));
        let c = [
            Point2f::new(0.0, 0.0),
            Point2f::new(6.0, 0.0),
            Point2f::new(6.0, 4.0),
            Point2f::new(0.0, 4.0),
        ];
        let mut lines: Vec<Line> = (0..4).map(|i| Line::new(c[i], c[(i + 1) % 4])).collect();
        lines.push(Line::new(Point2f::new(3.0, 0.0), Point2f::new(3.0, 2.5)));
        let mut map = PointMap::new("angular", r, lines);
        map.set_grid(&GridConfig::with_spacing(1.0)).unwrap();
        map.make_points(Point2f::new(1.0, 1.0), FillType::Full, None).unwrap();
        map.spark_graph(&SparkConfig::default(), None).unwrap();
        map
    }

    fn value(map: &PointMap, pix: PixelRef, col: &str) -> f32 {
        let c = map.attributes().column_index(col).unwrap();
        map.attributes().value(pix.packed(), c).unwrap()
    }

    #[test]
    fn visible_cells_need_no_turn() {
        let mut map = partitioned();
        map.set_cur_sel_pixels(&[PixelRef::new(1, 1)], false);
        map.analyse_angular_point_depth().unwrap();
        assert_eq!(value(&map, PixelRef::new(1, 1), ANGULAR_STEP_DEPTH_COL), 0.0);
        assert_eq!(value(&map, PixelRef::new(2, 1), ANGULAR_STEP_DEPTH_COL), 0.0);
        assert!(value(&map, PixelRef::new(5, 1), ANGULAR_STEP_DEPTH_COL) > 0.0);
    }

    #[test]
    fn every_filled_cell_is_counted() {
        let mut map = partitioned();
        map.analyse_angular(&AngularOptions::default(), None).unwrap();
        let pix = PixelRef::new(1, 1);
        assert_eq!(value(&map, pix, "Angular Node Count") as usize, map.filled_count());
        let total = value(&map, pix, "Angular Total Depth");
        let mean = value(&map, pix, "Angular Mean Depth");
        assert!(total > 0.0);
        assert!((mean * map.filled_count() as f32 - total).abs() < 1e-3);
    }

    #[test]
    fn radius_suffix_uses_two_decimals() {
        let mut map = partitioned();
        let options = AngularOptions {
            radius: 0.5,
            ..AngularOptions::default()
        };
        map.analyse_angular(&options, None).unwrap();
        assert!(map.attributes().column_index("Angular Mean Depth R0.50").is_some());
    }

    #[test]
    fn point_depth_needs_a_selection() {
        let mut map = partitioned();
        assert_eq!(map.analyse_angular_point_depth(), Err(PointMapError::NoSelection));
    }
}
