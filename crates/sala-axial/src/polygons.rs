//! Corner-to-corner visibility over the outlines of a drawing.
//!
//! The drawing is cut into closed outlines (segments between junctions)
//! whose corners are the candidate ends of axial lines. From each corner
//! reached so far, every other corner in view spawns a line, which is
//! extended through concave corners until it hits a wall. Where a line
//! joins two different outlines, radial lines fanning from the corners are
//! recorded; the fewest-line reduction uses them to tell which gaps a line
//! passes through.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

use sala_core::geometry::{angle, det, dot, sgn, TOLERANCE_A};
use sala_core::pixel::dir;
use sala_core::{Line, Point2f, QtRegion};
use sala_space::{tidy_lines, Connector, PixelBase, SegDir, SpacePixel};

use crate::config::SegmentOptions;
use crate::error::AxialError;
use crate::graph::ShapeGraph;

fn cmp_points(a: &Point2f, b: &Point2f) -> Ordering {
    a.partial_cmp(b).unwrap_or(Ordering::Equal)
}

// ── Keys ───────────────────────────────────────────────────────────

/// A corner, and the two outline neighbours that bound the open space it
/// was seen from (first and last in anticlockwise order from the viewer).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AxialVertexKey {
    /// Index of the corner.
    pub ref_key: usize,
    /// Neighbour index on one side of the viewed wedge.
    pub ref_a: Option<usize>,
    /// Neighbour index on the other side.
    pub ref_b: Option<usize>,
}

impl AxialVertexKey {
    /// A corner with its wedge not yet fixed.
    pub fn new(ref_key: usize) -> Self {
        Self {
            ref_key,
            ref_a: None,
            ref_b: None,
        }
    }
}

/// A corner classified against the open space it is seen from.
#[derive(Clone, Copy, Debug)]
pub struct AxialVertex {
    /// Identity; ordering and equality use this alone.
    pub key: AxialVertexKey,
    /// Corner position.
    pub point: Point2f,
    /// Where the corner was seen from.
    pub openspace: Point2f,
    /// Incoming wall direction (unnormalised).
    pub a: Point2f,
    /// Outgoing wall direction (unnormalised).
    pub b: Point2f,
    /// Walls turn clockwise as seen from the open space.
    pub clockwise: bool,
    /// The corner juts into the open space.
    pub convex: bool,
    /// Classification succeeded.
    pub initialised: bool,
    /// Axial lines may start here.
    pub axial: bool,
}

impl AxialVertex {
    fn unclassified(key: AxialVertexKey, point: Point2f, openspace: Point2f) -> Self {
        Self {
            key,
            point,
            openspace,
            a: Point2f::default(),
            b: Point2f::default(),
            clockwise: false,
            convex: false,
            initialised: false,
            axial: false,
        }
    }
}

impl PartialEq for AxialVertex {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl Eq for AxialVertex {}

impl PartialOrd for AxialVertex {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for AxialVertex {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key.cmp(&other.key)
    }
}

/// One side of a gap between outlines, as seen from a corner.
#[derive(Clone, Copy, Debug)]
pub struct RadialKey {
    /// Corner the radial line leaves from.
    pub vertex: AxialVertexKey,
    /// Angle at the corner from the viewer round to the outgoing wall.
    pub ang: f32,
    /// Which end of the gap the line bounds.
    pub segend: bool,
}

impl PartialEq for RadialKey {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for RadialKey {}

impl PartialOrd for RadialKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for RadialKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.vertex
            .cmp(&other.vertex)
            .then_with(|| self.ang.total_cmp(&other.ang))
            .then_with(|| self.segend.cmp(&other.segend))
    }
}

/// A radial line with the points that define it.
#[derive(Clone, Copy, Debug)]
pub struct RadialLine {
    /// Identity.
    pub key: RadialKey,
    /// Viewer position.
    pub openspace: Point2f,
    /// Corner position.
    pub keyvertex: Point2f,
    /// A point along the outgoing wall.
    pub nextvertex: Point2f,
}

impl RadialLine {
    /// Radial line at `keyvertex`, seen from `openspace`.
    pub fn new(vertex: AxialVertexKey, segend: bool, openspace: Point2f, keyvertex: Point2f, nextvertex: Point2f) -> Self {
        Self {
            key: RadialKey {
                vertex,
                ang: angle(openspace, keyvertex, nextvertex) as f32,
                segend,
            },
            openspace,
            keyvertex,
            nextvertex,
        }
    }

    /// True if `l` separates the viewer from the wall.
    ///
    /// A line ending on the extension through the corner only cuts when the
    /// viewer and the wall lie on opposite sides of it.
    pub fn cuts(&self, l: &Line) -> bool {
        if det(l.end() - self.keyvertex, l.end() - l.start()).abs() < TOLERANCE_A {
            let x = (l.end() - self.keyvertex).normalised();
            let y = (self.nextvertex - self.keyvertex).normalised();
            let z = (self.openspace - self.keyvertex).normalised();
            if sgn(det(x, y)) == sgn(det(x, z)) && det(x, z).abs() > TOLERANCE_A {
                return false;
            }
        }
        true
    }
}

/// A line that joins two outlines, tagged with the radial line it spans.
#[derive(Clone, Copy, Debug)]
pub struct PolyConnector {
    /// The joining line.
    pub line: Line,
    /// Radial line at one of its ends.
    pub key: RadialKey,
}

/// What a visibility sweep produces.
#[derive(Clone, Debug, Default)]
pub struct AxialCandidates {
    /// Candidate axial lines, in discovery order.
    pub lines: Vec<Line>,
    /// Convex corners each candidate passes through.
    pub key_vertices: Vec<BTreeSet<usize>>,
    /// Lines joining different outlines.
    pub poly_connections: Vec<PolyConnector>,
    /// Radial lines, unique by key.
    pub radial_lines: BTreeMap<RadialKey, RadialLine>,
}

impl AxialCandidates {
    fn add_radial(&mut self, radial: RadialLine) {
        self.radial_lines.entry(radial.key).or_insert(radial);
    }
}

// ── AxialPolygons ──────────────────────────────────────────────────

/// Drawing outlines indexed for corner visibility queries.
#[derive(Clone, Debug)]
pub struct AxialPolygons {
    grid: SpacePixel,
    region: QtRegion,
    /// Corners in point order, each with its outline neighbours in point order.
    vertices: Vec<(Point2f, Vec<Point2f>)>,
    /// Outline id per corner.
    vertex_polys: Vec<usize>,
    /// Corners per grid cell.
    pixel_polys: Vec<Vec<usize>>,
    handled: BTreeSet<AxialVertexKey>,
}

impl AxialPolygons {
    /// Tidy `lines`, cut them into outline segments and index the corners.
    pub fn init(mut lines: Vec<Line>, region: &QtRegion) -> Result<Self, AxialError> {
        tidy_lines(&mut lines, region);
        let firstpass = ShapeGraph::axial_from_lines("outlines", &lines, region);
        // dropping every stub keeps only the pieces between junctions
        let (segments, connectors) = firstpass.segment_lines(&SegmentOptions::with_stub_removal(1.0));
        let (vertices, vertex_polys) = vertex_possibles(&segments, &connectors)?;

        let mut grid = SpacePixel::default();
        grid.init_lines(segments.len(), region.bottom_left, region.top_right, 2.0);
        let rows = grid.rows() as usize;
        let mut pixel_polys = vec![Vec::new(); (grid.cols() * grid.rows()) as usize];
        for (j, (point, _)) in vertices.iter().enumerate() {
            let pix = grid.pixelate(*point, true, 1);
            pixel_polys[pix.x as usize * rows + pix.y as usize].push(j);
        }
        for (point, neighbours) in &vertices {
            for n in neighbours {
                grid.add_line(Line::new(*point, *n));
            }
        }
        grid.sort_pixel_lines();
        log::debug!(
            "axial polygons: {} corners on {} outlines from {} segments",
            vertices.len(),
            vertex_polys.iter().max().map_or(0, |m| m + 1),
            segments.len()
        );

        Ok(Self {
            grid,
            region: *region,
            vertices,
            vertex_polys,
            pixel_polys,
            handled: BTreeSet::new(),
        })
    }

    /// Region the grid covers.
    pub fn region(&self) -> QtRegion {
        self.region
    }

    /// Number of corners.
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Corner `index` with its outline neighbours.
    pub fn vertex(&self, index: usize) -> Option<(Point2f, &[Point2f])> {
        self.vertices.get(index).map(|(p, n)| (*p, n.as_slice()))
    }

    /// Outline id of corner `index`.
    pub fn outline_of(&self, index: usize) -> Option<usize> {
        self.vertex_polys.get(index).copied()
    }

    /// Forget which corners have been swept.
    pub fn clear_handled(&mut self) {
        self.handled.clear();
    }

    /// Classify corner `key.ref_key` as seen from `openspace`.
    ///
    /// Corners with fewer than two neighbours, degenerate views and nearly
    /// straight walls come back uninitialised.
    pub fn make_vertex(&self, key: AxialVertexKey, openspace: Point2f) -> AxialVertex {
        let Some((point, neighbours)) = self.vertices.get(key.ref_key) else {
            return AxialVertex::unclassified(key, openspace, openspace);
        };
        let point = *point;
        let mut av = AxialVertex::unclassified(key, point, openspace);
        if neighbours.len() < 2 {
            return av;
        }
        let o = point - openspace;

        let angles: Vec<f64> = neighbours.iter().map(|n| angle(openspace, point, *n)).collect();
        let (mut lo, mut hi) = (0, 0);
        for (i, &ang) in angles.iter().enumerate() {
            if ang < angles[lo] {
                lo = i;
            }
            if ang > angles[hi] {
                hi = i;
            }
        }
        av.key.ref_a = Some(lo);
        av.key.ref_b = Some(hi);
        av.a = point - neighbours[lo];
        av.b = neighbours[hi] - point;
        let a = av.a.normalised();
        let b = av.b.normalised();

        let oa = det(o, a);
        let ob = det(o, b);
        let ab = det(a, b);
        if oa.abs() < TOLERANCE_A || ob.abs() < TOLERANCE_A || ab.abs() < TOLERANCE_A {
            return av;
        }
        if dot(a, b).abs() > 0.999 {
            return av;
        }

        if sgn(oa) == sgn(ob) {
            // head on
            if sgn(oa) == 1.0 {
                av.clockwise = true;
                av.convex = sgn(ab) == 1.0;
                av.axial = av.convex;
            }
        } else {
            // glancing
            av.clockwise = true;
            av.convex = false;
            av.axial = true;
        }
        av.initialised = true;
        av
    }

    /// A corner visible from `seed`, searching cells in a spiral outwards.
    pub fn seed_vertex(&mut self, seed: Point2f) -> Option<AxialVertexKey> {
        let cols = self.grid.cols();
        let rows = self.grid.rows();
        let mut pix = self.grid.pixelate(seed, true, 1);
        let mut direction = dir::HORIZONTAL;
        let mut side = 1;
        let mut run = 0;
        let mut bounds = 0u8;

        loop {
            let slot = pix.x as usize * rows as usize + pix.y as usize;
            let mut found = None;
            for &v in &self.pixel_polys[slot] {
                if !self.grid.intersect_exclude(&Line::new(seed, self.vertices[v].0), 0.0) {
                    found = Some(v);
                }
            }
            if let Some(v) = found {
                return Some(AxialVertexKey::new(v));
            }

            pix = pix.moved(direction);
            run += 1;
            if run == side {
                run = 0;
                direction = match direction {
                    dir::HORIZONTAL => dir::VERTICAL,
                    dir::VERTICAL => {
                        side += 1;
                        dir::NEG_HORIZONTAL
                    }
                    dir::NEG_HORIZONTAL => dir::NEG_VERTICAL,
                    _ => {
                        side += 1;
                        dir::HORIZONTAL
                    }
                };
            }
            if pix.x < 0 {
                bounds |= 0x01;
                pix.x = 0;
            }
            if pix.y < 0 {
                bounds |= 0x02;
                pix.y = 0;
            }
            if i32::from(pix.x) >= cols {
                bounds |= 0x04;
                pix.x = (cols - 1) as i16;
            }
            if i32::from(pix.y) >= rows {
                bounds |= 0x08;
                pix.y = (rows - 1) as i16;
            }
            if bounds == 0x0f {
                return None;
            }
        }
    }

    /// Sweep the last open corner: record lines to every corner it sees and
    /// queue those corners.
    pub fn make_axial_lines(&mut self, open: &mut BTreeSet<AxialVertex>, out: &mut AxialCandidates) {
        let Some(vertex) = open.pop_last() else {
            return;
        };
        self.handled.insert(vertex.key);

        for i in 0..self.vertices.len() {
            if i == vertex.key.ref_key {
                continue;
            }
            let target = self.vertices[i].0;
            let p = target - vertex.point;
            let mut possible = false;
            let mut stubpossible = false;
            if vertex.convex {
                possible = det(vertex.a, p) > 0.0 && det(vertex.b, p) > 0.0;
            } else if det(p, vertex.a) * det(p, vertex.b) < 0.0 {
                possible = true;
            } else if det(p, vertex.a) < TOLERANCE_A && det(p, vertex.b) < TOLERANCE_A {
                stubpossible = true;
            }
            if !possible && !stubpossible {
                continue;
            }

            let mut line = Line::new(target, vertex.point);
            if self.grid.intersect_exclude(&line, 0.0) {
                continue;
            }
            let next = self.make_vertex(AxialVertexKey::new(i), vertex.point);
            if !next.initialised || self.handled.contains(&next.key) {
                continue;
            }
            open.insert(next);

            let separate = self.vertex_polys[vertex.key.ref_key] != self.vertex_polys[next.key.ref_key];
            let shortline = line;
            let extend_here = !vertex.convex && possible;
            let extend_there = !next.convex && next.axial;

            let mut segend = false;
            if extend_here {
                let mut ext = Line::new(line.t_end(), line.t_end() + (line.t_end() - line.t_start()));
                ext.ray(true, &self.region);
                self.grid.cut_line(&mut ext, true);
                line = Line::new(line.t_start(), ext.t_end());
                segend = det(-p, vertex.b) < 0.0;
            }
            if separate {
                let short = RadialLine::new(next.key, segend, vertex.point, next.point, next.point + next.b);
                out.poly_connections.push(PolyConnector { line: shortline, key: short.key });
                out.add_radial(short);
                if extend_here {
                    let mut long = short;
                    long.key.segend = !segend;
                    out.poly_connections.push(PolyConnector {
                        line: Line::new(target, line.t_end()),
                        key: long.key,
                    });
                    out.add_radial(long);
                }
            }

            segend = false;
            if extend_there {
                let mut ext = Line::new(line.t_start() - (line.t_end() - line.t_start()), line.t_start());
                ext.ray(false, &self.region);
                self.grid.cut_line(&mut ext, false);
                line = Line::new(ext.t_start(), line.t_end());
                segend = det(p, next.b) < 0.0;
            }
            if separate {
                let short = RadialLine::new(vertex.key, segend, next.point, vertex.point, vertex.point + vertex.b);
                out.poly_connections.push(PolyConnector { line: shortline, key: short.key });
                out.add_radial(short);
                if extend_there {
                    let mut long = short;
                    long.key.segend = !segend;
                    out.poly_connections.push(PolyConnector {
                        line: Line::new(line.t_start(), vertex.point),
                        key: long.key,
                    });
                    out.add_radial(long);
                }
            }

            if possible && next.axial {
                out.lines.push(line);
                let mut keys = BTreeSet::new();
                if vertex.convex {
                    keys.insert(vertex.key.ref_key);
                }
                if next.convex {
                    keys.insert(next.key.ref_key);
                }
                out.key_vertices.push(keys);
            }
        }
    }
}

/// Join segment ends into corners. Returns corners in point order with
/// their neighbours, and an outline id per corner.
fn vertex_possibles(
    lines: &[Line],
    connectors: &[Connector],
) -> Result<(Vec<(Point2f, Vec<Point2f>)>, Vec<usize>), AxialError> {
    let n = lines.len();
    // corner id per segment end: [start, end]
    let mut found: [Vec<Option<usize>>; 2] = [vec![None; n], vec![None; n]];
    let mut lookup: Vec<Point2f> = Vec::new();
    for (i, line) in lines.iter().enumerate() {
        for (end, point, side) in [(0, line.start(), SegDir::Back), (1, line.end(), SegDir::Forward)] {
            if found[end][i].is_some() {
                continue;
            }
            lookup.push(point);
            let id = lookup.len() - 1;
            found[end][i] = Some(id);
            let Some(c) = connectors.get(i) else {
                continue;
            };
            for r in c.segconns(side).keys() {
                // entering forward means arriving at the neighbour's start
                let other = if r.dir == SegDir::Forward { 0 } else { 1 };
                if let Some(slot) = found[other].get_mut(r.index) {
                    *slot = Some(id);
                }
            }
        }
    }

    let mut points = lookup.clone();
    points.sort_by(cmp_points);
    points.dedup();
    let index_of = |p: &Point2f| points.binary_search_by(|q| cmp_points(q, p)).ok();

    let mut neighbours: Vec<Vec<Point2f>> = vec![Vec::new(); points.len()];
    let mut add = |at: usize, p: Point2f| {
        if let Err(pos) = neighbours[at].binary_search_by(|q| cmp_points(q, &p)) {
            neighbours[at].insert(pos, p);
        }
    };
    for i in 0..n {
        let (Some(a), Some(b)) = (found[0][i], found[1][i]) else {
            return Err(AxialError::BrokenOutline { segment: i });
        };
        let (pa, pb) = (lookup[a], lookup[b]);
        let (Some(ia), Some(ib)) = (index_of(&pa), index_of(&pb)) else {
            return Err(AxialError::BrokenOutline { segment: i });
        };
        add(ia, pb);
        add(ib, pa);
    }

    let mut polys: Vec<Option<usize>> = vec![None; points.len()];
    let mut current = 0;
    for start in 0..points.len() {
        if polys[start].is_some() {
            continue;
        }
        let mut stack = vec![start];
        while let Some(v) = stack.pop() {
            polys[v] = Some(current);
            for nb in &neighbours[v] {
                if let Some(j) = index_of(nb).filter(|&j| polys[j].is_none()) {
                    stack.push(j);
                }
            }
        }
        current += 1;
    }

    let vertices = points.into_iter().zip(neighbours).collect();
    Ok((vertices, polys.into_iter().map(|p| p.unwrap_or(0)).collect()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use sala_test_utils::fixtures::{notched_room, p, partitioned_room, region, room};

    fn grown(w: f64, h: f64) -> QtRegion {
        let mut r = region(w, h);
        r.grow(1.3);
        r
    }

    fn corner(polys: &AxialPolygons, at: Point2f) -> usize {
        (0..polys.vertex_count())
            .find(|&i| polys.vertex(i).unwrap().0 == at)
            .unwrap()
    }

    // ── Outline tests ───────────────────────────────────────────

    #[test]
    fn room_has_four_corners_on_one_outline() {
        let polys = AxialPolygons::init(room(10.0, 6.0), &grown(10.0, 6.0)).unwrap();
        assert_eq!(polys.vertex_count(), 4);
        for i in 0..4 {
            assert_eq!(polys.vertex(i).unwrap().1.len(), 2);
            assert_eq!(polys.outline_of(i), Some(0));
        }
    }

    #[test]
    fn partition_adds_a_junction_and_a_dead_end() {
        let polys = AxialPolygons::init(partitioned_room(), &grown(6.0, 4.0)).unwrap();
        assert_eq!(polys.vertex_count(), 6);
        let junction = corner(&polys, p(3.0, 0.0));
        assert_eq!(polys.vertex(junction).unwrap().1.len(), 3);
        let tip = corner(&polys, p(3.0, 2.5));
        assert_eq!(polys.vertex(tip).unwrap().1, &[p(3.0, 0.0)]);
    }

    // ── Vertex tests ────────────────────────────────────────────

    #[test]
    fn room_corner_is_convex_from_inside() {
        let polys = AxialPolygons::init(room(10.0, 6.0), &grown(10.0, 6.0)).unwrap();
        let v = polys.make_vertex(AxialVertexKey::new(corner(&polys, p(0.0, 0.0))), p(5.0, 3.0));
        assert!(v.initialised);
        assert!(v.convex);
        assert!(v.axial);
        assert!(v.key.ref_a.is_some() && v.key.ref_a != v.key.ref_b);
    }

    #[test]
    fn alcove_corner_depends_on_the_view() {
        let polys = AxialPolygons::init(notched_room(), &grown(10.0, 8.0)).unwrap();
        let key = AxialVertexKey::new(corner(&polys, p(4.0, 6.0)));
        let head_on = polys.make_vertex(key, p(5.0, 3.0));
        assert!(head_on.initialised);
        assert!(!head_on.convex);
        assert!(!head_on.axial);
        let glancing = polys.make_vertex(key, p(1.0, 1.0));
        assert!(glancing.initialised);
        assert!(!glancing.convex);
        assert!(glancing.axial);
    }

    #[test]
    fn dead_end_is_not_classified() {
        let polys = AxialPolygons::init(partitioned_room(), &grown(6.0, 4.0)).unwrap();
        let tip = polys.make_vertex(AxialVertexKey::new(corner(&polys, p(3.0, 2.5))), p(1.0, 3.0));
        assert!(!tip.initialised);
    }

    #[test]
    fn seed_finds_a_visible_corner() {
        let mut polys = AxialPolygons::init(room(10.0, 6.0), &grown(10.0, 6.0)).unwrap();
        let key = polys.seed_vertex(p(5.0, 3.0)).unwrap();
        assert!(key.ref_key < 4);
    }

    #[test]
    fn sweep_from_a_room_corner_sees_the_opposite_corner() {
        let mut polys = AxialPolygons::init(room(10.0, 6.0), &grown(10.0, 6.0)).unwrap();
        let start = polys.make_vertex(AxialVertexKey::new(corner(&polys, p(0.0, 0.0))), p(5.0, 3.0));
        let mut open = BTreeSet::from([start]);
        let mut out = AxialCandidates::default();
        polys.make_axial_lines(&mut open, &mut out);
        assert_eq!(out.lines.len(), 1);
        assert_eq!(out.lines[0], Line::new(p(10.0, 6.0), p(0.0, 0.0)));
        assert_eq!(out.key_vertices[0].len(), 2);
        assert_eq!(open.len(), 1);
        // a single outline has no gaps to record
        assert!(out.radial_lines.is_empty());
    }

    // ── Radial tests ────────────────────────────────────────────

    #[test]
    fn radial_keys_order_by_vertex_then_angle() {
        let v0 = AxialVertexKey::new(0);
        let v1 = AxialVertexKey::new(1);
        let k = |vertex, ang, segend| RadialKey { vertex, ang, segend };
        let mut keys = vec![k(v1, 0.5, false), k(v0, 2.0, true), k(v0, 2.0, false), k(v0, 1.0, true)];
        keys.sort();
        assert_eq!(keys[0], k(v0, 1.0, true));
        assert_eq!(keys[1], k(v0, 2.0, false));
        assert_eq!(keys[3], k(v1, 0.5, false));
    }

    #[test]
    fn radial_cut_needs_the_wall_across() {
        let v = AxialVertexKey::new(0);
        let through = Line::new(p(-1.0, 0.0), p(2.0, 0.0));
        let same_side = RadialLine::new(v, false, p(1.0, 1.0), p(0.0, 0.0), p(-1.0, 1.0));
        assert!(!same_side.cuts(&through));
        let across = RadialLine::new(v, false, p(1.0, 1.0), p(0.0, 0.0), p(1.0, -1.0));
        assert!(across.cuts(&through));
        let elsewhere = Line::new(p(-1.0, 3.0), p(2.0, 3.0));
        assert!(same_side.cuts(&elsewhere));
    }
}
