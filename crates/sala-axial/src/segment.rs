//! Segment maps: axial lines cut at their crossings, or drawn lines
//! joined at shared endpoints.
//!
//! Each segment keeps two directed neighbour maps, one per end. An entry
//! names the neighbour, the end of it that is entered, and the turn
//! needed to get there, scaled so that a right angle costs 1 and a full
//! reversal costs 2.

use std::collections::{BTreeMap, HashMap};
use std::f64::consts::PI;

use sala_core::geometry::{approx_eq, dot, Axis, TOLERANCE_A, TOLERANCE_B, TOLERANCE_C};
use sala_core::{Line, Point2f};
use sala_space::{ConnMode, Connector, PixelBase, SegDir, SegmentRef, CONNECTIVITY_COL};

use crate::config::SegmentOptions;
use crate::error::AxialError;
use crate::graph::ShapeGraph;

/// Segment column holding the row of the parent axial line (-1 if none).
pub const AXIAL_LINE_REF_COL: &str = "Axial Line Ref";
/// Segment column holding segment length.
pub const SEGMENT_LENGTH_COL: &str = "Segment Length";
/// Segment column holding the summed turn weights of all connections.
pub const ANGULAR_CONNECTIVITY_COL: &str = "Angular Connectivity";

/// Turn from travelling along `arrive` to travelling along `leave`, both
/// unit vectors: 0 straight on, 1 at a right angle, 2 turning back.
fn turn(arrive: Point2f, leave: Point2f) -> f32 {
    (2.0 * dot(arrive, leave).clamp(-1.0, 1.0).acos() / PI) as f32
}

/// Lines too short to have a direction along either axis.
fn is_degenerate(line: &Line) -> bool {
    line.width().max(line.height()) <= TOLERANCE_A
}

fn link(conns: &mut [Connector], from: usize, exit: SegDir, to: usize, enter: SegDir, weight: f32) {
    conns[from]
        .segconns_mut(exit)
        .entry(SegmentRef::new(enter, to))
        .or_insert(weight);
}

impl ShapeGraph {
    /// Cut every axial line at the lines it crosses.
    ///
    /// Returns the segments with a connector each, in order along each
    /// parent line and parent lines in row order. A line that crosses
    /// nothing yields no segments. Pieces at either end shorter than
    /// `stub_removal` of the parent's extent along its major axis are
    /// dropped.
    pub fn segment_lines(&self, opts: &SegmentOptions) -> (Vec<Line>, Vec<Connector>) {
        let mut lines: Vec<Line> = Vec::new();
        let mut conns: Vec<Connector> = Vec::new();
        // (lower row, higher row) -> segments of the lower row either side of the crossing
        let mut pending: BTreeMap<(usize, usize), (Option<usize>, Option<usize>)> = BTreeMap::new();
        let stub = if opts.stub_removal == 0.0 { TOLERANCE_C } else { opts.stub_removal };

        for (i, connector) in self.connectors().iter().enumerate() {
            let Some(line) = self.line_at(i) else {
                continue;
            };
            if is_degenerate(&line) {
                log::debug!("segment map: skipping zero-length line {i}");
                continue;
            }
            let axis = line.major_axis();
            // breaks must run from start to end, which on the y axis
            // depends on whether the line rises or falls
            let parity = if axis == Axis::X { 1.0 } else { line.sign() };
            let mut breaks: Vec<(f64, usize)> = connector
                .connections
                .iter()
                .filter(|&&j| j != i)
                .filter_map(|&j| {
                    let other = self.line_at(j).filter(|o| !is_degenerate(o))?;
                    let loc = line.intersection_point(&other, axis, TOLERANCE_A);
                    loc.is_finite().then_some((parity * loc, j))
                })
                .collect();
            breaks.sort_by(|a, b| a.0.total_cmp(&b.0));

            let extent = match axis {
                Axis::X => line.width(),
                Axis::Y => line.height(),
            };
            let near = extent * stub;
            let overlap = extent * TOLERANCE_C;
            let at = |k: usize| parity * breaks[k].0;

            let mut last = line.start();
            let mut seg_a: Option<usize> = None;
            let mut k = 0;
            while k < breaks.len() {
                if seg_a.is_none() {
                    let here = line.point_on_line(at(k), axis);
                    if (at(k) - line.start().along(axis)).abs() >= near {
                        lines.push(Line::new(line.start(), here));
                        conns.push(Connector::for_segment(i));
                        seg_a = Some(lines.len() - 1);
                    }
                    last = here;
                }

                let here = at(k);
                let mut crossing = vec![breaks[k].1];
                k += 1;
                while k < breaks.len() && (at(k) - here).abs() < overlap {
                    crossing.push(breaks[k].1);
                    k += 1;
                }

                let seg_b = if k == breaks.len() && (line.end().along(axis) - at(k - 1)).abs() < near {
                    None
                } else {
                    let next = if k < breaks.len() {
                        line.point_on_line(at(k), axis)
                    } else {
                        line.end()
                    };
                    lines.push(Line::new(last, next));
                    conns.push(Connector::for_segment(i));
                    last = next;
                    Some(lines.len() - 1)
                };

                for &j in &crossing {
                    if j > i {
                        pending.entry((i, j)).or_insert((seg_a, seg_b));
                        continue;
                    }
                    let Some(&(seg_1, seg_2)) = pending.get(&(j, i)) else {
                        log::warn!("segment map: crossing of lines {j} and {i} seen from one side only");
                        continue;
                    };
                    // seg_a and seg_1 end at the crossing; seg_b and seg_2 start there
                    let into_a = seg_a.map(|a| (lines[a].start() - lines[a].end()).normalised());
                    let out_b = seg_b.map(|b| (lines[b].end() - lines[b].start()).normalised());
                    if let Some(s1) = seg_1 {
                        let beta = (lines[s1].start() - lines[s1].end()).normalised();
                        if let (Some(a), Some(alpha)) = (seg_a, into_a) {
                            let w = turn(-alpha, beta);
                            link(&mut conns, a, SegDir::Forward, s1, SegDir::Back, w);
                            link(&mut conns, s1, SegDir::Forward, a, SegDir::Back, w);
                        }
                        if let (Some(b), Some(alpha)) = (seg_b, out_b) {
                            let w = turn(-alpha, beta);
                            link(&mut conns, b, SegDir::Back, s1, SegDir::Back, w);
                            link(&mut conns, s1, SegDir::Forward, b, SegDir::Forward, w);
                        }
                    }
                    if let Some(s2) = seg_2 {
                        let beta = (lines[s2].end() - lines[s2].start()).normalised();
                        if let (Some(a), Some(alpha)) = (seg_a, into_a) {
                            let w = turn(-alpha, beta);
                            link(&mut conns, a, SegDir::Forward, s2, SegDir::Forward, w);
                            link(&mut conns, s2, SegDir::Back, a, SegDir::Back, w);
                        }
                        if let (Some(b), Some(alpha)) = (seg_b, out_b) {
                            let w = turn(-alpha, beta);
                            link(&mut conns, b, SegDir::Back, s2, SegDir::Forward, w);
                            link(&mut conns, s2, SegDir::Back, b, SegDir::Forward, w);
                        }
                    }
                }

                if let (Some(a), Some(b)) = (seg_a, seg_b) {
                    link(&mut conns, a, SegDir::Forward, b, SegDir::Forward, 0.0);
                    link(&mut conns, b, SegDir::Back, a, SegDir::Back, 0.0);
                }
                seg_a = seg_b;
            }
        }
        log::debug!(
            "shape graph '{}': {} lines cut into {} segments",
            self.name(),
            self.line_count(),
            lines.len()
        );
        (lines, conns)
    }

    /// Add the parent reference and length columns used by segment graphs.
    pub fn init_segment_attributes(&mut self) {
        let table = self.map_mut().attributes_mut();
        table.get_or_insert_column(AXIAL_LINE_REF_COL);
        table.get_or_insert_column(SEGMENT_LENGTH_COL);
    }

    /// Install segment connectors, one per line in row order, and write
    /// each segment's parent, length, total turn weight and connectivity.
    pub fn make_segment_connections(&mut self, connectors: Vec<Connector>) {
        let lengths: Vec<f32> = (0..self.line_count())
            .map(|i| self.map().shape_at(i).map_or(0.0, |s| s.length() as f32))
            .collect();
        let table = self.map_mut().attributes_mut();
        let ref_col = table.get_or_insert_column(AXIAL_LINE_REF_COL);
        let len_col = table.get_or_insert_column(SEGMENT_LENGTH_COL);
        let ang_col = table.get_or_insert_column(ANGULAR_CONNECTIVITY_COL);
        let conn_col = table.get_or_insert_column(CONNECTIVITY_COL);
        for (row, (c, length)) in connectors.iter().zip(lengths).enumerate() {
            let axial = c.segment_axialref.map_or(-1.0, |r| r as f32);
            let weight: f32 = c.all_segconns().map(|(_, _, w)| w).sum();
            table.set_value_at(row, ref_col, axial);
            table.set_value_at(row, len_col, length);
            table.set_value_at(row, ang_col, weight);
            table.set_value_at(row, conn_col, c.count(ConnMode::SegAll) as f32);
        }
        if connectors.len() != self.line_count() {
            log::warn!(
                "shape graph '{}': {} connectors for {} segments",
                self.name(),
                connectors.len(),
                self.line_count()
            );
        }
        self.map_mut().set_connectors(connectors);
    }

    /// Build segment connections by joining lines whose endpoints meet.
    ///
    /// Only ends that coincide (within a tolerance scaled by the region)
    /// are joined; lines crossing mid-way are not.
    pub fn make_new_seg_map(&mut self) {
        let lines: Vec<(i32, Line)> = self
            .map()
            .shapes()
            .filter(|(_, s)| s.is_line())
            .map(|(k, s)| (k, *s.get_line()))
            .collect();
        let position: HashMap<i32, usize> = lines.iter().enumerate().map(|(i, (k, _))| (*k, i)).collect();
        let region = self.map().region();
        let tol = region.width().max(region.height()) * TOLERANCE_B;
        let mut conns = vec![Connector::default(); lines.len()];

        for (a, (_, la)) in lines.iter().enumerate() {
            let alpha = la.vector().normalised();
            for (a_end, a_pt) in [(SegDir::Back, la.t_start()), (SegDir::Forward, la.t_end())] {
                let leave_a = if a_end == SegDir::Back { alpha } else { -alpha };
                let pix = self.map().pixelate(a_pt, true, 1);
                for cell in self.map().cell(pix) {
                    let Some(&b) = position.get(&cell.key) else {
                        continue;
                    };
                    if a >= b {
                        continue;
                    }
                    let lb = lines[b].1;
                    let beta = lb.vector().normalised();
                    for (b_end, b_pt) in [(SegDir::Back, lb.t_start()), (SegDir::Forward, lb.t_end())] {
                        if !approx_eq(a_pt, b_pt, tol) {
                            continue;
                        }
                        let leave_b = if b_end == SegDir::Back { beta } else { -beta };
                        let w = turn(-leave_a, leave_b);
                        // entering through the start means travelling forward
                        link(&mut conns, a, a_end, b, b_end.reversed(), w);
                        link(&mut conns, b, b_end, a, a_end.reversed(), w);
                    }
                }
            }
        }
        self.make_segment_connections(conns);
    }

    /// Copy every attribute of the parent axial lines onto their segments
    /// as "Axial {name}" columns.
    pub fn push_axial_values(&mut self, axial: &ShapeGraph) -> Result<(), AxialError> {
        let ref_col = self
            .map()
            .attributes()
            .column_index(AXIAL_LINE_REF_COL)
            .ok_or(AxialError::MissingAxialRef)?;
        let source = axial.map().attributes();
        let table = self.map_mut().attributes_mut();
        let targets: Vec<usize> = source
            .column_names()
            .map(|name| table.get_or_insert_column(&format!("Axial {name}")))
            .collect();
        for row in 0..table.row_count() {
            let Some(parent) = table.value_at(row, ref_col).filter(|r| *r >= 0.0) else {
                continue;
            };
            for (k, &col) in targets.iter().enumerate() {
                if let Some(v) = source.value_at(parent as usize, k) {
                    table.set_value_at(row, col, v);
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::GraphKind;
    use sala_test_utils::fixtures::{hash, p, region, u_path};

    fn segment_graph(axial: &ShapeGraph, opts: &SegmentOptions) -> ShapeGraph {
        let (lines, conns) = axial.segment_lines(opts);
        let mut seg = ShapeGraph::with_region("seg", GraphKind::Segment, lines.len(), &axial.map().region());
        seg.init_segment_attributes();
        for l in lines {
            seg.map_mut().make_line_shape(l);
        }
        seg.make_segment_connections(conns);
        seg
    }

    fn refs(c: &Connector, dir: SegDir) -> Vec<usize> {
        c.segconns(dir).keys().map(|r| r.index).collect()
    }

    // ── Axial cut tests ─────────────────────────────────────────

    #[test]
    fn hash_cuts_into_twelve_segments() {
        let axial = ShapeGraph::axial_from_lines("hash", &hash(), &region(1.5, 1.5));
        let seg = segment_graph(&axial, &SegmentOptions::default());
        assert_eq!(seg.line_count(), 12);

        let forward: [&[usize]; 12] = [
            &[1, 3, 4],
            &[2, 9, 10],
            &[],
            &[0, 1, 4],
            &[5, 6, 7],
            &[],
            &[4, 5, 7],
            &[8, 10, 11],
            &[],
            &[1, 2, 10],
            &[7, 8, 11],
            &[],
        ];
        let back: [&[usize]; 12] = [
            &[],
            &[0, 3, 4],
            &[1, 9, 10],
            &[],
            &[0, 1, 3],
            &[4, 6, 7],
            &[],
            &[4, 5, 6],
            &[7, 10, 11],
            &[],
            &[1, 2, 9],
            &[7, 8, 10],
        ];
        let conn_col = seg.map().attributes().column_index(CONNECTIVITY_COL).unwrap();
        for (i, c) in seg.connectors().iter().enumerate() {
            assert_eq!(refs(c, SegDir::Forward), forward[i], "forward of {i}");
            assert_eq!(refs(c, SegDir::Back), back[i], "back of {i}");
            let n = (forward[i].len() + back[i].len()) as f32;
            assert_eq!(seg.map().attributes().value_at(i, conn_col), Some(n));
        }
    }

    #[test]
    fn straight_on_costs_nothing_and_corners_cost_one() {
        let axial = ShapeGraph::axial_from_lines("hash", &hash(), &region(1.5, 1.5));
        let seg = segment_graph(&axial, &SegmentOptions::default());
        let fwd = seg.connectors()[0].segconns(SegDir::Forward);
        assert_eq!(fwd.get(&SegmentRef::new(SegDir::Forward, 1)), Some(&0.0));
        let corner = *fwd.get(&SegmentRef::new(SegDir::Forward, 4)).unwrap();
        assert!((corner - 1.0).abs() < 1e-6);
    }

    #[test]
    fn stub_removal_drops_short_ends() {
        // the teeth overhang the spine by a tenth of their height
        let lines = vec![
            Line::new(p(0.0, 0.0), p(4.0, 0.0)),
            Line::new(p(1.0, -0.1), p(1.0, 1.0)),
            Line::new(p(3.0, -0.1), p(3.0, 1.0)),
        ];
        let r = sala_core::QtRegion::new(p(0.0, -0.1), p(4.0, 1.0));
        let axial = ShapeGraph::axial_from_lines("comb", &lines, &r);
        let kept = segment_graph(&axial, &SegmentOptions::default());
        let trimmed = segment_graph(&axial, &SegmentOptions::with_stub_removal(0.2));
        assert_eq!(kept.line_count(), 3 + 2 + 2);
        assert_eq!(trimmed.line_count(), 3 + 1 + 1);
    }

    #[test]
    fn zero_length_line_is_left_out_of_the_cut() {
        let mut lines = hash();
        lines.push(Line::new(p(0.5, 0.5), p(0.5, 0.5)));
        let axial = ShapeGraph::axial_from_lines("dotted", &lines, &region(1.5, 1.5));
        assert!(!axial.connectors()[4].connections.is_empty());
        let seg = segment_graph(&axial, &SegmentOptions::default());
        assert_eq!(seg.line_count(), 12);
        assert_eq!(refs(&seg.connectors()[0], SegDir::Forward), vec![1, 3, 4]);
    }

    #[test]
    fn axial_values_are_pushed_to_segments() {
        let axial = ShapeGraph::axial_from_lines("hash", &hash(), &region(1.5, 1.5));
        let mut seg = segment_graph(&axial, &SegmentOptions::default());
        seg.push_axial_values(&axial).unwrap();
        let table = seg.map().attributes();
        let col = table.column_index("Axial Line Length").unwrap();
        assert_eq!(table.value_at(11, col), Some(1.5));
        assert!(table.column_index("Axial Connectivity").is_some());
    }

    #[test]
    fn pushing_needs_the_parent_column() {
        let axial = ShapeGraph::axial_from_lines("hash", &hash(), &region(1.5, 1.5));
        let mut other = ShapeGraph::axial_from_lines("again", &hash(), &region(1.5, 1.5));
        assert_eq!(other.push_axial_values(&axial), Err(AxialError::MissingAxialRef));
    }

    // ── Endpoint join tests ─────────────────────────────────────

    #[test]
    fn u_path_joins_at_corners() {
        let r = region(2.0, 2.0);
        let mut seg = ShapeGraph::with_region("u", GraphKind::Segment, 3, &r);
        seg.init_segment_attributes();
        for l in u_path() {
            seg.map_mut().make_line_shape(l);
        }
        seg.make_new_seg_map();
        let c = seg.connectors();
        assert_eq!(refs(&c[0], SegDir::Forward), vec![1]);
        assert_eq!(refs(&c[1], SegDir::Back), vec![0]);
        assert_eq!(refs(&c[1], SegDir::Forward), vec![2]);
        assert_eq!(refs(&c[2], SegDir::Back), vec![1]);
        assert_eq!(c[0].count(ConnMode::SegBack), 0);
        let entry = c[0].segconns(SegDir::Forward).iter().next().unwrap();
        assert_eq!(entry.0.dir, SegDir::Forward);
        assert_eq!(*entry.1, 1.0);
        let table = seg.map().attributes();
        let ang = table.column_index(ANGULAR_CONNECTIVITY_COL).unwrap();
        assert_eq!(table.value_at(1, ang), Some(2.0));
        let parent = table.column_index(AXIAL_LINE_REF_COL).unwrap();
        assert_eq!(table.value_at(1, parent), Some(-1.0));
    }

    #[test]
    fn ends_meeting_head_on_join_both_forward() {
        let lines = [Line::new(p(0.0, 0.0), p(1.0, 0.0)), Line::new(p(2.0, 1.0), p(1.0, 0.0))];
        let mut seg = ShapeGraph::with_region("v", GraphKind::Segment, 2, &region(2.0, 1.0));
        for l in lines {
            seg.map_mut().make_line_shape(l);
        }
        seg.make_new_seg_map();
        let c = seg.connectors();
        let (r, w) = c[0].segconns(SegDir::Forward).iter().next().unwrap();
        assert_eq!((r.index, r.dir), (1, SegDir::Back));
        assert!((*w - 0.5).abs() < 1e-6);
        let (r, _) = c[1].segconns(SegDir::Forward).iter().next().unwrap();
        assert_eq!((r.index, r.dir), (0, SegDir::Back));
    }
}
