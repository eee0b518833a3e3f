//! Isovists: the polygon visible from a point, swept through a BSP tree.
//!
//! The sweep keeps a sorted list of angular gaps that are still open.
//! Walking the tree front to back from the viewpoint, each wall closes
//! whatever part of the open gaps it subtends, leaving a block. Once no
//! gaps remain the rest of the tree is skipped. The blocks, in angle
//! order, trace the visible boundary.

use std::f64::consts::PI;

use sala_core::attributes::AttributeTable;
use sala_core::geometry::{approx_eq, dist, dist_to_line, intersection_point, Line, Point2f, QtRegion};

use crate::bsp::{BspTree, Side};
use crate::shape::SalaShape;

const ANGLE_TOL: f64 = 1e-9;

#[derive(Clone, Copy, Debug)]
struct Gap {
    start: f64,
    end: f64,
    tagdelete: bool,
}

impl Gap {
    fn new(start: f64, end: f64) -> Self {
        Self {
            start,
            end,
            tagdelete: false,
        }
    }
}

#[derive(Clone, Copy, Debug)]
struct Block {
    start: f64,
    end: f64,
    start_point: Point2f,
    end_point: Point2f,
    tag: i32,
}

/// A boundary jump where a nearer wall hides a farther one.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct OcclusionPoint {
    /// The nearer end of the jump.
    pub point: Point2f,
    /// Length of the jump.
    pub length: f64,
}

/// Summary measures of an isovist polygon.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct IsovistMeasures {
    /// Enclosed area.
    pub area: f64,
    /// `4πA / P²`: 1 for a circle.
    pub compactness: f64,
    /// Direction from the viewpoint to the centroid, in degrees.
    pub drift_angle: f64,
    /// Distance from the viewpoint to the centroid.
    pub drift_magnitude: f64,
    /// Distance to the nearest polygon side.
    pub min_radial: f64,
    /// Distance to the farthest polygon vertex.
    pub max_radial: f64,
    /// Total length of occluding jumps.
    pub occlusivity: f64,
    /// Polygon perimeter.
    pub perimeter: f64,
}

/// Attribute column names, in the order they are written.
pub const ISOVIST_COLUMNS: [&str; 8] = [
    "Isovist Area",
    "Isovist Compactness",
    "Isovist Drift Angle",
    "Isovist Drift Magnitude",
    "Isovist Min Radial",
    "Isovist Max Radial",
    "Isovist Occlusivity",
    "Isovist Perimeter",
];

impl IsovistMeasures {
    /// Write into row `key`. The simple form writes only the area.
    pub fn write(&self, table: &mut AttributeTable, key: i32, simple: bool) {
        let values = [
            self.area,
            self.compactness,
            self.drift_angle,
            self.drift_magnitude,
            self.min_radial,
            self.max_radial,
            self.occlusivity,
            self.perimeter,
        ];
        let count = if simple { 1 } else { values.len() };
        for (name, value) in ISOVIST_COLUMNS.iter().zip(values).take(count) {
            let col = table.get_or_insert_column(name);
            table.set_value(key, col, value as f32);
        }
    }
}

/// The visible polygon from one viewpoint.
#[derive(Clone, Debug, Default)]
pub struct Isovist {
    centre: Point2f,
    gaps: Vec<Gap>,
    blocks: Vec<Block>,
    poly: Vec<Point2f>,
    occlusion_points: Vec<OcclusionPoint>,
    perimeter: f64,
    occluded_perimeter: f64,
}

impl Isovist {
    /// Sweep from `p` between `start_angle` and `end_angle` (radians,
    /// anticlockwise from the x axis). Equal angles, or `0..2π`, give a
    /// full sweep. `region` sets the scale for matching block ends.
    pub fn make(tree: &BspTree, p: Point2f, region: &QtRegion, start_angle: f64, end_angle: f64) -> Self {
        let tolerance = region.width().max(region.height()) * 1e-9;
        let mut iso = Self {
            centre: p,
            ..Self::default()
        };

        let (mut start_angle, mut end_angle) = (start_angle, end_angle);
        let complete = start_angle == end_angle || (start_angle == 0.0 && end_angle == 2.0 * PI);
        if complete {
            start_angle = 0.0;
            end_angle = 2.0 * PI;
        }
        let parity = start_angle <= end_angle;
        if parity {
            iso.gaps.push(Gap::new(start_angle, end_angle));
        } else {
            iso.gaps.push(Gap::new(0.0, end_angle));
            iso.gaps.push(Gap::new(start_angle, 2.0 * PI));
        }

        iso.sweep(tree);
        iso.trace(complete, parity, start_angle, tolerance);
        iso
    }

    fn trace(&mut self, complete: bool, parity: bool, start_angle: f64, tolerance: f64) {
        let p = self.centre;
        let mut marked_centre = false;
        for i in 0..self.blocks.len() {
            let curr = self.blocks[i];
            if !complete && !marked_centre && !parity && curr.start == start_angle {
                self.poly.push(p);
                marked_centre = true;
            }
            if i > 0 {
                let prev = self.blocks[i - 1];
                if !approx_eq(prev.end_point, curr.start_point, tolerance) {
                    self.poly.push(curr.start_point);
                    let occluded = dist(prev.end_point, curr.start_point);
                    self.perimeter += occluded;
                    self.occluded_perimeter += occluded;
                    let near = if dist(prev.end_point, p) < dist(curr.start_point, p) {
                        prev.end_point
                    } else {
                        curr.start_point
                    };
                    self.occlusion_points.push(OcclusionPoint {
                        point: near,
                        length: occluded,
                    });
                }
            }
            self.poly.push(curr.end_point);
            self.perimeter += dist(curr.start_point, curr.end_point);
        }
        // a partial sweep that does not wrap closes through the viewpoint last
        if !complete && parity {
            self.poly.push(p);
        }
        if let (Some(first), Some(last)) = (self.blocks.first().copied(), self.blocks.last().copied()) {
            if !approx_eq(last.end_point, first.start_point, tolerance) {
                self.poly.push(first.start_point);
                let occluded = dist(last.end_point, first.start_point);
                self.perimeter += occluded;
                self.occluded_perimeter += occluded;
                if occluded > 1.5 {
                    let near = if dist(last.end_point, p) < dist(first.start_point, p) {
                        last.end_point
                    } else {
                        first.start_point
                    };
                    self.occlusion_points.push(OcclusionPoint {
                        point: near,
                        length: occluded,
                    });
                }
            }
        }
    }

    /// Tag of the wall nearest to `p`, found with a full sweep.
    pub fn closest_line(tree: &BspTree, p: Point2f) -> Option<i32> {
        let mut iso = Self {
            centre: p,
            ..Self::default()
        };
        iso.gaps.push(Gap::new(0.0, 2.0 * PI));
        iso.sweep(tree);
        iso.blocks
            .iter()
            .map(|b| (b.tag, dist_to_line(p, &Line::new(b.start_point, b.end_point))))
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(tag, _)| tag)
    }

    fn sweep(&mut self, tree: &BspTree) {
        enum Frame {
            Visit(usize),
            Draw(usize),
        }
        let Some(root) = tree.root() else {
            return;
        };
        let mut stack = vec![Frame::Visit(root)];
        while let Some(frame) = stack.pop() {
            match frame {
                Frame::Visit(i) => {
                    if self.gaps.is_empty() {
                        continue;
                    }
                    let node = tree.node(i);
                    let (near, far) = match node.classify(self.centre) {
                        Side::Left => (node.left(), node.right()),
                        Side::Right => (node.right(), node.left()),
                    };
                    if let Some(far) = far {
                        stack.push(Frame::Visit(far));
                    }
                    stack.push(Frame::Draw(i));
                    if let Some(near) = near {
                        stack.push(Frame::Visit(near));
                    }
                }
                Frame::Draw(i) => {
                    let node = tree.node(i);
                    self.draw_node(node.line(), node.tag());
                }
            }
        }
    }

    fn draw_node(&mut self, li: &Line, tag: i32) {
        let angle1 = (li.start() - self.centre).normalised().angle();
        let angle2 = (li.end() - self.centre).normalised().angle();
        let (lo, hi) = if angle2 > angle1 { (angle1, angle2) } else { (angle2, angle1) };
        if hi - lo >= PI {
            self.add_block(li, tag, 0.0, lo);
            self.add_block(li, tag, hi, 2.0 * PI);
        } else {
            self.add_block(li, tag, lo, hi);
        }
        self.gaps.retain(|g| !g.tagdelete);
    }

    fn add_block(&mut self, li: &Line, tag: i32, start: f64, end: f64) {
        let mut gi = 0;
        loop {
            while gi < self.gaps.len() && self.gaps[gi].end < start {
                gi += 1;
            }
            if gi >= self.gaps.len() || self.gaps[gi].start >= end + ANGLE_TOL {
                break;
            }
            let gap = self.gaps[gi];
            let (a, b);
            if gap.start > start - ANGLE_TOL {
                a = gap.start;
                if gap.end < end + ANGLE_TOL {
                    b = gap.end;
                    self.gaps[gi].tagdelete = true;
                } else {
                    b = end;
                    self.gaps[gi].start = end;
                }
            } else {
                a = start;
                if gap.end < end + ANGLE_TOL {
                    b = gap.end;
                    self.gaps[gi].end = start;
                } else {
                    // the block splits the gap in two
                    b = end;
                    self.gaps[gi].end = start;
                    self.gaps.insert(gi + 1, Gap::new(end, gap.end));
                    gi += 1;
                }
            }
            let ray = |angle: f64| Line::new(self.centre, self.centre + Point2f::from_angle(angle));
            let block = Block {
                start: a,
                end: b,
                start_point: intersection_point(li, &ray(a), 0.0),
                end_point: intersection_point(li, &ray(b), 0.0),
                tag,
            };
            self.insert_block(block);
            gi += 1;
        }
    }

    fn insert_block(&mut self, block: Block) {
        let key = |b: &Block| (b.start, b.end);
        let pos = self.blocks.binary_search_by(|b| {
            let (s, e) = key(b);
            s.total_cmp(&block.start).then(e.total_cmp(&block.end))
        });
        if let Err(pos) = pos {
            self.blocks.insert(pos, block);
        }
    }

    /// Viewpoint.
    pub fn centre(&self) -> Point2f {
        self.centre
    }

    /// Boundary polygon in sweep order. Collinear vertices are kept.
    pub fn polygon(&self) -> &[Point2f] {
        &self.poly
    }

    /// The polygon as a closed shape whose centroid is the viewpoint.
    pub fn to_shape(&self) -> Option<SalaShape> {
        if self.poly.len() < 3 {
            return None;
        }
        let mut shape = SalaShape::poly(self.poly.clone(), true);
        shape.set_centroid(self.centre);
        Some(shape)
    }

    /// Occluding jumps along the boundary.
    pub fn occlusion_points(&self) -> &[OcclusionPoint] {
        &self.occlusion_points
    }

    /// Boundary length including occluding jumps.
    pub fn perimeter(&self) -> f64 {
        self.perimeter
    }

    /// Length of the occluding jumps.
    pub fn occluded_perimeter(&self) -> f64 {
        self.occluded_perimeter
    }

    /// Area, drift, radials and perimeter measures. `None` for an empty polygon.
    pub fn measures(&self) -> Option<IsovistMeasures> {
        let n = self.poly.len();
        if n == 0 {
            return None;
        }
        let mut area = 0.0;
        let mut centroid = Point2f::default();
        let mut min_radial = f64::INFINITY;
        let mut max_radial = 0.0f64;
        for i in 0..n {
            let p1 = self.poly[i];
            let p2 = self.poly[(i + 1) % n];
            let a_i = (p1.x * p2.y - p2.x * p1.y) / 2.0;
            area += a_i;
            centroid.x += (p1.x + p2.x) * a_i / 6.0;
            centroid.y += (p1.y + p2.y) * a_i / 6.0;
            min_radial = min_radial.min(dist_to_line(self.centre, &Line::new(p1, p2)));
            max_radial = max_radial.max(dist(self.centre, p1));
        }
        if area != 0.0 {
            centroid = centroid * (2.0 / area.abs());
        }
        let drift = centroid - self.centre;
        let drift_magnitude = drift.length();
        let drift_angle = if drift_magnitude > 0.0 { drift.normalised().angle() } else { 0.0 };
        let compactness = if self.perimeter > 0.0 {
            4.0 * PI * area / (self.perimeter * self.perimeter)
        } else {
            0.0
        };
        Some(IsovistMeasures {
            area,
            compactness,
            drift_angle: drift_angle.to_degrees(),
            drift_magnitude,
            min_radial,
            max_radial,
            occlusivity: self.occluded_perimeter,
            perimeter: self.perimeter,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bsp::BspConfig;
    use sala_core::geometry::TaggedLine;

    fn p(x: f64, y: f64) -> Point2f {
        Point2f::new(x, y)
    }

    fn room_tree(extra: &[Line]) -> BspTree {
        let mut lines = vec![
            Line::new(p(0.0, 0.0), p(10.0, 0.0)),
            Line::new(p(10.0, 0.0), p(10.0, 10.0)),
            Line::new(p(10.0, 10.0), p(0.0, 10.0)),
            Line::new(p(0.0, 10.0), p(0.0, 0.0)),
        ];
        lines.extend_from_slice(extra);
        let tagged: Vec<TaggedLine> = lines.into_iter().enumerate().map(|(i, l)| TaggedLine::new(l, i as i32)).collect();
        BspTree::build(&tagged, &BspConfig::default(), None).unwrap()
    }

    fn region() -> QtRegion {
        QtRegion::new(p(0.0, 0.0), p(10.0, 10.0))
    }

    // ── Full sweep tests ────────────────────────────────────────

    #[test]
    fn empty_room_sees_its_whole_floor() {
        let tree = room_tree(&[]);
        let iso = Isovist::make(&tree, p(5.0, 5.0), &region(), 0.0, 0.0);
        let m = iso.measures().unwrap();
        assert!((m.area - 100.0).abs() < 1e-6);
        assert!((m.perimeter - 40.0).abs() < 1e-6);
        assert!(m.occlusivity.abs() < 1e-9);
        assert!((m.min_radial - 5.0).abs() < 1e-6);
        assert!((m.max_radial - 50f64.sqrt()).abs() < 1e-6);
        assert!(m.drift_magnitude < 1e-6);
        assert!(iso.occlusion_points().is_empty());
    }

    #[test]
    fn screen_casts_an_occlusion() {
        // a free-standing screen to the right of the viewpoint
        let tree = room_tree(&[Line::new(p(7.0, 4.0), p(7.0, 6.0))]);
        let iso = Isovist::make(&tree, p(5.0, 5.0), &region(), 0.0, 0.0);
        let m = iso.measures().unwrap();
        assert!(m.area < 100.0 - 1.0);
        assert!(m.occlusivity > 0.0);
        assert_eq!(iso.occlusion_points().len(), 2);
        // drift points away from the screen
        assert!((m.drift_angle - 180.0).abs() < 1e-6);
    }

    // ── Partial sweep tests ─────────────────────────────────────

    #[test]
    fn quarter_sweep_includes_viewpoint() {
        let tree = room_tree(&[]);
        let iso = Isovist::make(&tree, p(5.0, 5.0), &region(), 0.0, PI / 2.0);
        assert!(iso.polygon().contains(&p(5.0, 5.0)));
        let m = iso.measures().unwrap();
        assert!((m.area - 25.0).abs() < 1e-6);
    }

    #[test]
    fn closest_line_finds_nearest_wall() {
        let tree = room_tree(&[]);
        assert_eq!(Isovist::closest_line(&tree, p(1.0, 5.0)), Some(3));
        assert_eq!(Isovist::closest_line(&tree, p(5.0, 9.5)), Some(2));
    }

    #[test]
    fn measures_write_columns() {
        let tree = room_tree(&[]);
        let iso = Isovist::make(&tree, p(5.0, 5.0), &region(), 0.0, 0.0);
        let mut table = AttributeTable::new();
        table.add_row(0);
        iso.measures().unwrap().write(&mut table, 0, false);
        assert_eq!(table.column_count(), ISOVIST_COLUMNS.len());
        let col = table.column_index("Isovist Perimeter").unwrap();
        assert!((table.value(0, col).unwrap() - 40.0).abs() < 1e-3);
    }
}
