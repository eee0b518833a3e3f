//! Isovist measures for every cell, and the occluding edges seen from it.

use sala_core::{Communicator, PixelRef, Progress, ProgressKind, TaggedLine};
use sala_space::{BspConfig, BspTree, Isovist, PixelBase};

use crate::error::PointMapError;
use crate::node::{which_bin, BIN_COUNT};
use crate::pointmap::PointMap;

/// Occluding jumps shorter than this (in drawing units) are not recorded
/// as occlusion cells.
const MIN_OCCLUSION: f64 = 1.5;

impl PointMap {
    /// Compute the isovist from the centre of every filled cell and write
    /// its measures (only the area when `simple`).
    ///
    /// Each node also records, per sector, the cells just beyond the
    /// occluding edges and the length of the last jump found there. The
    /// BSP tree over the drawing lines is built first as step 1 of 2.
    pub fn analyse_isovist(&mut self, simple: bool, comm: Option<&mut dyn Communicator>) -> Result<(), PointMapError> {
        self.require_graph()?;
        self.has_isovist_analysis = false;

        let mut progress = Progress::new(comm);
        progress.post(ProgressKind::NumSteps, 2);
        progress.post(ProgressKind::CurrentStep, 1);
        let tagged: Vec<TaggedLine> = self
            .drawing_lines()
            .iter()
            .enumerate()
            .map(|(i, l)| TaggedLine::new(*l, i as i32))
            .collect();
        let tree = BspTree::build(&tagged, &BspConfig::default(), progress.communicator())?;

        progress.post(ProgressKind::CurrentStep, 2);
        progress.start(self.filled_count);
        let region = *self.drawing_region();
        let mut count = 0;
        for curs in self.each_pixel() {
            let pt = self.pt(curs);
            if !pt.is_filled() {
                continue;
            }
            count += 1;
            if pt.is_context_filled() && !curs.is_even() {
                continue;
            }

            let centre = self.depixelate(curs, 1.0);
            let isovist = Isovist::make(&tree, centre, &region, 0.0, 0.0);
            if let Some(measures) = isovist.measures() {
                measures.write(&mut self.attributes, curs.packed(), simple);
            }

            let mut occ: [Vec<PixelRef>; BIN_COUNT] = std::array::from_fn(|_| Vec::new());
            let mut occ_dist = [0.0f32; BIN_COUNT];
            for op in isovist.occlusion_points() {
                let bin = which_bin(op.point - centre);
                if op.length > MIN_OCCLUSION {
                    let pix = self.pixelate(op.point, true, 1);
                    if pix != curs {
                        occ[bin].push(pix);
                    }
                }
                occ_dist[bin] = op.length as f32;
            }
            if let Some(node) = self.pt_mut(curs).node.as_deref_mut() {
                for (i, (cells, d)) in occ.into_iter().zip(occ_dist).enumerate() {
                    *node.occlusion_bin_mut(i) = cells;
                    node.bin_mut(i).set_occ_distance(d);
                }
            }

            progress.tick(count)?;
        }

        self.has_isovist_analysis = true;
        log::info!("point map '{}': isovists for {} cells", self.name(), count);
        Ok(())
    }

    /// Cells just beyond the occluding edges seen from `pix` in sector `bin`.
    pub fn occlusion_bin(&self, pix: PixelRef, bin: usize) -> Result<&[PixelRef], PointMapError> {
        if !self.has_isovist_analysis {
            return Err(PointMapError::NoIsovistAnalysis);
        }
        Ok(self
            .point(pix)
            .and_then(|pt| pt.node())
            .filter(|_| bin < BIN_COUNT)
            .map_or(&[][..], |node| node.occlusion_bin(bin)))
    }
}
