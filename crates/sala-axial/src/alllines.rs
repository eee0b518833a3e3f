//! All-line maps and their reduction to fewest-line maps.

use std::collections::{BTreeMap, BTreeSet};

use sala_core::geometry::{approx_eq, intersect_line_distinguish, intersect_region, runion, TOLERANCE_A, TOLERANCE_B};
use sala_core::{Communicator, Line, LineContact, Progress, ProgressKind, QtRegion};
use sala_space::PixelBase;

use crate::config::{AllLineConfig, MinimiserConfig};
use crate::error::AxialError;
use crate::graph::{GraphKind, ShapeGraph};
use crate::minimiser::{AxialMinimiser, Divisions, RadialSegment};
use crate::polygons::{AxialCandidates, AxialPolygons, PolyConnector, RadialLine};

/// Name given to generated all-line maps.
pub const ALL_LINE_MAP_NAME: &str = "All-Line Map";
/// Name of the fewest-line map after subset removal.
pub const FEWEST_SUBSETS_NAME: &str = "Fewest-Line Map (Subsets)";
/// Name of the fully reduced fewest-line map.
pub const FEWEST_MINIMAL_NAME: &str = "Fewest-Line Map (Minimal)";

/// Every longest line of sight between drawing corners visible from a
/// seed, with the gap records needed to reduce it.
#[derive(Clone, Debug)]
pub struct AllLineMap {
    graph: ShapeGraph,
    polygons: AxialPolygons,
    poly_connections: Vec<PolyConnector>,
    radial_lines: Vec<RadialLine>,
}

impl AllLineMap {
    /// Cast lines between all corners reachable from `config.seed`.
    ///
    /// Lines from every layer are pooled. Fails when no corner is visible
    /// from the seed or the first corner cannot be classified.
    pub fn generate(
        layers: &[Vec<Line>],
        config: &AllLineConfig,
        comm: Option<&mut dyn Communicator>,
    ) -> Result<Self, AxialError> {
        config.validate()?;
        let mut progress = Progress::new(comm);
        progress.post(ProgressKind::NumSteps, 3);
        progress.post(ProgressKind::CurrentStep, 1);

        let mut region: Option<QtRegion> = None;
        let mut lines = Vec::new();
        for l in layers.iter().flatten() {
            region = Some(match region {
                Some(r) => runion(&r, &l.region()),
                None => l.region(),
            });
            lines.push(*l);
        }
        let mut region = region.ok_or(AxialError::NoLines { stage: "in drawing" })?;
        region.grow(1.30);

        let mut polygons = AxialPolygons::init(lines, &region)?;
        polygons.clear_handled();
        let seed = polygons.seed_vertex(config.seed).ok_or(AxialError::NoVisibleVertices)?;
        let vertex = polygons.make_vertex(seed, config.seed);
        if !vertex.initialised {
            return Err(AxialError::VertexInitFailed);
        }

        progress.post(ProgressKind::CurrentStep, 2);
        progress.start(polygons.vertex_count());
        let mut open = BTreeSet::from([vertex]);
        let mut found = AxialCandidates::default();
        let mut count = 0;
        while !open.is_empty() {
            polygons.make_axial_lines(&mut open, &mut found);
            count += 1;
            progress.tick(count)?;
        }

        progress.post(ProgressKind::CurrentStep, 3);
        progress.post(ProgressKind::CurrentRecord, 0);

        let AxialCandidates {
            mut lines,
            mut key_vertices,
            poly_connections,
            radial_lines,
        } = found;
        let tolerance = region.width().max(region.height()) * TOLERANCE_B;
        let mut duplicates = 0;
        let mut j = 0;
        while j < lines.len() {
            for k in (j + 1..lines.len()).rev() {
                if approx_eq(lines[j].start(), lines[k].start(), tolerance)
                    && approx_eq(lines[j].end(), lines[k].end(), tolerance)
                {
                    let merged = key_vertices.remove(k);
                    key_vertices[j].extend(merged);
                    lines.remove(k);
                    duplicates += 1;
                }
            }
            j += 1;
        }

        let mut crop = region;
        crop.grow(0.99);
        let mut graph = ShapeGraph::with_region(ALL_LINE_MAP_NAME, GraphKind::AllLine, lines.len(), &polygons.region());
        graph.init_axial_attributes();
        for mut l in lines {
            l.crop(&crop);
            graph.map_mut().make_line_shape(l);
        }
        graph.make_connections(key_vertices);
        graph.set_key_vertex_count(polygons.vertex_count());

        let radial_lines: Vec<RadialLine> = radial_lines.into_values().collect();
        log::info!(
            "all-line map: {} lines over {} corners ({} duplicates dropped), {} radial lines",
            graph.line_count(),
            polygons.vertex_count(),
            duplicates,
            radial_lines.len()
        );
        Ok(Self {
            graph,
            polygons,
            poly_connections,
            radial_lines,
        })
    }

    /// The all-line graph.
    pub fn graph(&self) -> &ShapeGraph {
        &self.graph
    }

    /// Give up the gap records, keeping the graph.
    pub fn into_graph(self) -> ShapeGraph {
        self.graph
    }

    /// The outline decomposition the lines were cast over.
    pub fn polygons(&self) -> &AxialPolygons {
        &self.polygons
    }

    /// Radial lines in key order.
    pub fn radial_lines(&self) -> &[RadialLine] {
        &self.radial_lines
    }

    /// Lines joining different outlines.
    pub fn poly_connections(&self) -> &[PolyConnector] {
        &self.poly_connections
    }

    /// Reduce to the subset-free map and the minimal map, in that order.
    pub fn extract_fewest_line_maps(
        &self,
        config: &MinimiserConfig,
        comm: Option<&mut dyn Communicator>,
    ) -> Result<(ShapeGraph, ShapeGraph), AxialError> {
        let mut progress = Progress::new(comm);
        progress.post(ProgressKind::NumSteps, 2);
        progress.post(ProgressKind::CurrentStep, 1);

        let (radial_divisions, ax_radial_cuts) = self.make_divisions(&mut progress)?;

        progress.post(ProgressKind::CurrentStep, 2);
        progress.post(ProgressKind::CurrentRecord, 0);

        let (radial_segs, ax_seg_cuts) = self.radial_segments(&ax_radial_cuts);
        let (key_vertex_conns, key_vertex_counts) = self.key_vertex_relations();
        let divisions = Divisions {
            radial_lines: self.radial_lines.clone(),
            radial_divisions,
            radial_segs,
            ax_seg_cuts,
            key_vertex_conns,
            key_vertex_counts,
        };

        let lines: Vec<Line> = (0..self.graph.line_count()).filter_map(|i| self.graph.line_at(i)).collect();
        let connections = self.graph.connectors().iter().map(|c| c.connections.clone()).collect();
        let mut minimiser = AxialMinimiser::new(&lines, connections, &divisions, config);

        minimiser.remove_subsets();
        let subsets: Vec<Line> = kept(&lines, &minimiser);
        progress.check()?;
        minimiser.fewest_longest();
        let minimal: Vec<Line> = kept(&lines, &minimiser);

        let region = self.polygons.region();
        log::info!(
            "fewest-line maps: {} lines reduced to {} (subsets) and {} (minimal)",
            lines.len(),
            subsets.len(),
            minimal.len()
        );
        Ok((
            ShapeGraph::axial_from_lines(FEWEST_SUBSETS_NAME, &subsets, &region),
            ShapeGraph::axial_from_lines(FEWEST_MINIMAL_NAME, &minimal, &region),
        ))
    }

    /// Which all-lines cross which radial lines, both ways round.
    fn make_divisions(&self, progress: &mut Progress<'_>) -> Result<(Vec<BTreeSet<usize>>, Vec<BTreeSet<usize>>), AxialError> {
        let map = self.graph.map();
        let mut radial_divisions = vec![BTreeSet::new(); self.radial_lines.len()];
        let mut ax_radial_cuts = vec![BTreeSet::new(); self.graph.line_count()];
        let tolerance = TOLERANCE_A.sqrt();
        progress.start(self.poly_connections.len());

        for (i, pc) in self.poly_connections.iter().enumerate() {
            let Ok(conn) = self.radial_lines.binary_search_by(|r| r.key.cmp(&pc.key)) else {
                continue;
            };
            let mut tested = BTreeSet::new();
            for pix in map.pixelate_line(&pc.line, 1) {
                for cs in map.cell(pix) {
                    if !tested.insert(cs.key) {
                        continue;
                    }
                    let Some(index) = map.index_of(cs.key) else {
                        continue;
                    };
                    let Some(line) = self.graph.line_at(index) else {
                        continue;
                    };
                    let tol = tolerance * line.length();
                    if !intersect_region(&line.region(), &pc.line.region(), tol) {
                        continue;
                    }
                    let divides = match intersect_line_distinguish(&line, &pc.line, tol) {
                        LineContact::Crossing => true,
                        LineContact::Touching => self.radial_lines[conn].cuts(&line),
                        LineContact::None => false,
                    };
                    if divides {
                        ax_radial_cuts[index].insert(conn);
                        radial_divisions[conn].insert(index);
                    }
                }
            }
            progress.tick(i)?;
        }
        Ok((radial_divisions, ax_radial_cuts))
    }

    /// Gaps between consecutive radial lines at a corner, and per all-line
    /// the gaps it passes fully through.
    fn radial_segments(&self, ax_radial_cuts: &[BTreeSet<usize>]) -> (Vec<RadialSegment>, Vec<BTreeSet<usize>>) {
        let mut radial_segs = Vec::new();
        let mut seg_ending_at = BTreeMap::new();
        for a in 1..self.radial_lines.len() {
            let (prev, cur) = (&self.radial_lines[a - 1].key, &self.radial_lines[a].key);
            if cur.vertex == prev.vertex && cur.ang != prev.ang {
                seg_ending_at.insert(a, radial_segs.len());
                radial_segs.push(RadialSegment { a, b: a - 1 });
            }
        }

        let ax_seg_cuts = ax_radial_cuts
            .iter()
            .map(|cuts| {
                let cuts: Vec<usize> = cuts.iter().copied().collect();
                cuts.windows(2)
                    .filter(|w| self.radial_lines[w[0]].key.vertex == self.radial_lines[w[1]].key.vertex)
                    .filter_map(|w| seg_ending_at.get(&w[1]).copied().filter(|&s| radial_segs[s].b == w[0]))
                    .collect()
            })
            .collect();
        (radial_segs, ax_seg_cuts)
    }

    /// Per all-line, the key vertices of its neighbours; per key vertex,
    /// how many lines reach it that way.
    fn key_vertex_relations(&self) -> (Vec<Vec<usize>>, Vec<usize>) {
        let key_vertices = self.graph.key_vertices();
        let mut counts = vec![0; self.graph.key_vertex_count()];
        let conns = self
            .graph
            .connectors()
            .iter()
            .map(|c| {
                let mut conn: Vec<usize> = Vec::new();
                for &z in &c.connections {
                    for &k in key_vertices.get(z).into_iter().flatten() {
                        if let Err(pos) = conn.binary_search(&k) {
                            conn.insert(pos, k);
                            if k >= counts.len() {
                                counts.resize(k + 1, 0);
                            }
                            counts[k] += 1;
                        }
                    }
                }
                conn
            })
            .collect();
        (conns, counts)
    }
}

fn kept(lines: &[Line], minimiser: &AxialMinimiser<'_>) -> Vec<Line> {
    lines
        .iter()
        .enumerate()
        .filter(|(i, _)| !minimiser.removed(*i))
        .map(|(_, l)| *l)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use sala_core::Point2f;
    use sala_test_utils::{CancellingComm, RecordingComm};
    use sala_test_utils::fixtures::{notched_room, outline, p, room};

    fn pillar_room() -> Vec<Line> {
        let mut lines = room(10.0, 6.0);
        lines.extend(outline(&[p(4.0, 2.0), p(6.0, 2.0), p(6.0, 4.0), p(4.0, 4.0)]));
        lines
    }

    fn seeded(at: Point2f) -> AllLineConfig {
        AllLineConfig::at(at)
    }

    // ── Generation tests ────────────────────────────────────────

    #[test]
    fn rectangle_gives_one_diagonal() {
        let map = AllLineMap::generate(&[room(10.0, 6.0)], &seeded(p(5.0, 3.0)), None).unwrap();
        let g = map.graph();
        assert_eq!(g.kind(), GraphKind::AllLine);
        assert_eq!(g.name(), ALL_LINE_MAP_NAME);
        assert_eq!(g.line_count(), 1);
        assert_eq!(g.key_vertex_count(), 4);
        assert_eq!(g.key_vertices()[0].len(), 2);
    }

    #[test]
    fn alcove_is_reached() {
        let map = AllLineMap::generate(&[notched_room()], &seeded(p(5.0, 3.0)), None).unwrap();
        let g = map.graph();
        assert!(g.line_count() > 1);
        assert_eq!(g.key_vertex_count(), 8);
        let into_alcove = (0..g.line_count())
            .filter_map(|i| g.line_at(i))
            .any(|l| l.top_right().y > 6.5);
        assert!(into_alcove);
        assert!(map.radial_lines().is_empty());
    }

    #[test]
    fn pillar_records_radial_lines() {
        let map = AllLineMap::generate(&[pillar_room()], &seeded(p(1.0, 1.0)), None).unwrap();
        assert!(map.graph().line_count() > 1);
        assert!(!map.radial_lines().is_empty());
        assert!(!map.poly_connections().is_empty());
        assert!(map.radial_lines().windows(2).all(|w| w[0].key < w[1].key));
    }

    #[test]
    fn empty_drawing_has_no_lines() {
        let err = AllLineMap::generate(&[], &seeded(p(0.0, 0.0)), None).unwrap_err();
        assert_eq!(err, AxialError::NoLines { stage: "in drawing" });
    }

    #[test]
    fn bad_seed_is_rejected() {
        let err = AllLineMap::generate(&[room(4.0, 4.0)], &seeded(p(f64::NAN, 0.0)), None).unwrap_err();
        assert!(matches!(err, AxialError::Config(_)));
    }

    #[test]
    fn generation_reports_three_steps() {
        let mut comm = RecordingComm::new();
        AllLineMap::generate(&[notched_room()], &seeded(p(5.0, 3.0)), Some(&mut comm)).unwrap();
        assert_eq!(comm.values(ProgressKind::NumSteps), vec![3]);
        assert_eq!(comm.values(ProgressKind::CurrentStep), vec![1, 2, 3]);
        assert_eq!(comm.values(ProgressKind::NumRecords), vec![8]);
    }

    #[test]
    fn generation_can_be_cancelled() {
        let mut comm = CancellingComm::new(0);
        let err = AllLineMap::generate(&[notched_room()], &seeded(p(5.0, 3.0)), Some(&mut comm)).unwrap_err();
        assert_eq!(err, AxialError::Cancelled);
    }

    // ── Reduction tests ─────────────────────────────────────────

    #[test]
    fn fewest_maps_shrink_monotonically() {
        let map = AllLineMap::generate(&[pillar_room()], &seeded(p(1.0, 1.0)), None).unwrap();
        let (subsets, minimal) = map.extract_fewest_line_maps(&MinimiserConfig::default(), None).unwrap();
        assert_eq!(subsets.name(), FEWEST_SUBSETS_NAME);
        assert_eq!(minimal.name(), FEWEST_MINIMAL_NAME);
        assert_eq!(minimal.kind(), GraphKind::Axial);
        assert!(subsets.line_count() <= map.graph().line_count());
        assert!(minimal.line_count() <= subsets.line_count());
        assert!(minimal.line_count() > 0);
    }

    #[test]
    fn reduction_is_repeatable_for_a_seed() {
        let map = AllLineMap::generate(&[notched_room()], &seeded(p(5.0, 3.0)), None).unwrap();
        let config = MinimiserConfig::with_seed(42);
        let lines = |g: &ShapeGraph| (0..g.line_count()).filter_map(|i| g.line_at(i)).collect::<Vec<_>>();
        let (_, first) = map.extract_fewest_line_maps(&config, None).unwrap();
        let (_, second) = map.extract_fewest_line_maps(&config, None).unwrap();
        assert_eq!(lines(&first), lines(&second));
    }

    #[test]
    fn reduction_reports_two_steps() {
        let map = AllLineMap::generate(&[pillar_room()], &seeded(p(1.0, 1.0)), None).unwrap();
        let mut comm = RecordingComm::new();
        map.extract_fewest_line_maps(&MinimiserConfig::default(), Some(&mut comm)).unwrap();
        assert_eq!(comm.values(ProgressKind::NumSteps), vec![2]);
        assert_eq!(comm.values(ProgressKind::CurrentStep), vec![1, 2]);
        assert_eq!(comm.values(ProgressKind::NumRecords), vec![map.poly_connections().len()]);
    }
}
