//! Geometric shapes held by a shape map.

use std::f64::consts::PI;

use sala_core::geometry::{angle, runion, Line, Point2f, QtRegion};

/// The kind of a [`SalaShape`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ShapeKind {
    /// A single point.
    Point,
    /// A straight line.
    Line,
    /// An open polyline.
    Polyline,
    /// A closed polygon.
    Polygon,
}

/// A point, line, polyline or polygon with cached centroid, area and perimeter.
#[derive(Clone, Debug, PartialEq)]
pub struct SalaShape {
    kind: ShapeKind,
    ccw: bool,
    points: Vec<Point2f>,
    centroid: Point2f,
    line: Line,
    area: f64,
    perimeter: f64,
}

impl SalaShape {
    /// A point shape.
    pub fn point(p: Point2f) -> Self {
        Self {
            kind: ShapeKind::Point,
            ccw: false,
            points: Vec::new(),
            centroid: p,
            line: Line::new(p, p),
            area: 0.0,
            perimeter: 0.0,
        }
    }

    /// A line shape.
    pub fn line(l: Line) -> Self {
        Self {
            kind: ShapeKind::Line,
            ccw: false,
            points: Vec::new(),
            centroid: l.midpoint(),
            line: l,
            area: 0.0,
            perimeter: l.length(),
        }
    }

    /// A polyline or polygon through `points` (at least two).
    pub fn poly(points: Vec<Point2f>, closed: bool) -> Self {
        let kind = if closed { ShapeKind::Polygon } else { ShapeKind::Polyline };
        let mut shape = Self {
            kind,
            ccw: false,
            points,
            centroid: Point2f::default(),
            line: Line::default(),
            area: 0.0,
            perimeter: 0.0,
        };
        shape.set_region();
        shape.set_centroid_area_perim();
        shape
    }

    fn set_region(&mut self) {
        let mut region: Option<QtRegion> = None;
        for w in self.points.windows(2) {
            let r = Line::new(w[0], w[1]).region();
            region = Some(match region {
                Some(acc) => runion(&acc, &r),
                None => r,
            });
        }
        if let Some(r) = region {
            self.line = Line::from_region(&r);
        }
    }

    /// Recompute centroid, area, perimeter and winding from the vertices.
    pub fn set_centroid_area_perim(&mut self) {
        if self.points.is_empty() {
            return;
        }
        let n = self.points.len();
        let mut area = 0.0;
        let mut perimeter = 0.0;
        let mut centroid = Point2f::default();
        for i in 0..n {
            let p1 = self.points[i];
            let p2 = self.points[(i + 1) % n];
            let a_i = (p1.x * p2.y - p2.x * p1.y) / 2.0;
            area += a_i;
            centroid.x += (p1.x + p2.x) * a_i / 6.0;
            centroid.y += (p1.y + p2.y) * a_i / 6.0;
            perimeter += (p2 - p1).length();
        }
        self.ccw = area > 0.0;
        // signed area, so clockwise shapes keep a correct centroid
        if area != 0.0 {
            self.centroid = centroid * (2.0 / area);
        } else if let (Some(first), Some(last)) = (self.points.first(), self.points.last()) {
            self.centroid = (*first + *last) / 2.0;
        }
        self.area = area.abs();
        if self.is_open() {
            if let (Some(first), Some(last)) = (self.points.first(), self.points.last()) {
                perimeter -= (*last - *first).length();
            }
        }
        self.perimeter = perimeter;
    }

    /// Override the centroid (isovists use their viewpoint).
    pub fn set_centroid(&mut self, p: Point2f) {
        self.centroid = p;
    }

    /// Shape kind.
    pub fn kind(&self) -> ShapeKind {
        self.kind
    }

    /// True for points, lines and polylines.
    pub fn is_open(&self) -> bool {
        self.kind != ShapeKind::Polygon
    }

    /// True for polygons.
    pub fn is_closed(&self) -> bool {
        self.kind == ShapeKind::Polygon
    }

    /// True for points.
    pub fn is_point(&self) -> bool {
        self.kind == ShapeKind::Point
    }

    /// True for straight lines.
    pub fn is_line(&self) -> bool {
        self.kind == ShapeKind::Line
    }

    /// True for open polylines.
    pub fn is_polyline(&self) -> bool {
        self.kind == ShapeKind::Polyline
    }

    /// True for closed polygons.
    pub fn is_polygon(&self) -> bool {
        self.kind == ShapeKind::Polygon
    }

    /// True if the vertices wind anticlockwise.
    pub fn is_ccw(&self) -> bool {
        self.ccw
    }

    /// Vertices of a polyline or polygon (empty for points and lines).
    pub fn points(&self) -> &[Point2f] {
        &self.points
    }

    /// Location of a point shape (the centroid otherwise).
    pub fn get_point(&self) -> Point2f {
        self.centroid
    }

    /// The line of a line shape (the bounding diagonal otherwise).
    pub fn get_line(&self) -> &Line {
        &self.line
    }

    /// Bounding box.
    pub fn bounding_box(&self) -> QtRegion {
        self.line.region()
    }

    /// Centroid.
    pub fn centroid(&self) -> Point2f {
        self.centroid
    }

    /// Enclosed area (zero for open shapes other than accidental loops).
    pub fn area(&self) -> f64 {
        self.area
    }

    /// Perimeter, or length for open shapes.
    pub fn perimeter(&self) -> f64 {
        self.perimeter
    }

    /// Same as [`perimeter`](Self::perimeter).
    pub fn length(&self) -> f64 {
        self.perimeter
    }

    /// Sides of the shape as lines: one for a line shape, consecutive
    /// vertex pairs for polylines, and a closing side for polygons.
    pub fn edges(&self) -> Vec<Line> {
        match self.kind {
            ShapeKind::Point => Vec::new(),
            ShapeKind::Line => vec![self.line],
            ShapeKind::Polyline => self.points.windows(2).map(|w| Line::new(w[0], w[1])).collect(),
            ShapeKind::Polygon => {
                let n = self.points.len();
                (0..n).map(|i| Line::new(self.points[i], self.points[(i + 1) % n])).collect()
            }
        }
    }

    /// Total turning along a polyline in Iida-Hillier units (0 to 2 per right angle pair).
    pub fn ang_dev(&self) -> f64 {
        let mut dev = 0.0;
        for w in self.points.windows(3) {
            dev += (PI - angle(w[0], w[1], w[2])).abs();
        }
        dev / (PI * 0.5)
    }

    /// Crossing-number point-in-polygon test. Open shapes contain nothing.
    pub fn contains(&self, p: Point2f) -> bool {
        if !self.is_closed() || !self.bounding_box().contains_touch(p) {
            return false;
        }
        let n = self.points.len();
        let mut inside = false;
        let mut j = n - 1;
        for i in 0..n {
            let (a, b) = (self.points[i], self.points[j]);
            if (a.y > p.y) != (b.y > p.y) && p.x < (b.x - a.x) * (p.y - a.y) / (b.y - a.y) + a.x {
                inside = !inside;
            }
            j = i;
        }
        inside
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(x: f64, y: f64) -> Point2f {
        Point2f::new(x, y)
    }

    fn square(ccw: bool) -> SalaShape {
        let mut pts = vec![p(0.0, 0.0), p(2.0, 0.0), p(2.0, 2.0), p(0.0, 2.0)];
        if !ccw {
            pts.reverse();
        }
        SalaShape::poly(pts, true)
    }

    #[test]
    fn polygon_measures() {
        let s = square(true);
        assert!(s.is_polygon() && s.is_closed() && s.is_ccw());
        assert!((s.area() - 4.0).abs() < 1e-12);
        assert!((s.perimeter() - 8.0).abs() < 1e-12);
        assert!((s.centroid().x - 1.0).abs() < 1e-12);
        assert!((s.centroid().y - 1.0).abs() < 1e-12);
    }

    #[test]
    fn clockwise_polygon_keeps_centroid() {
        let s = square(false);
        assert!(!s.is_ccw());
        assert!((s.area() - 4.0).abs() < 1e-12);
        assert!((s.centroid().x - 1.0).abs() < 1e-12);
    }

    #[test]
    fn polyline_drops_closing_side() {
        let s = SalaShape::poly(vec![p(0.0, 0.0), p(3.0, 0.0), p(3.0, 4.0)], false);
        assert!(s.is_polyline() && s.is_open());
        assert!((s.length() - 7.0).abs() < 1e-12);
        assert_eq!(s.edges().len(), 2);
    }

    #[test]
    fn right_angle_turn_is_one_unit() {
        let s = SalaShape::poly(vec![p(0.0, 0.0), p(1.0, 0.0), p(1.0, 1.0)], false);
        assert!((s.ang_dev() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn contains_interior_points_only() {
        let s = square(true);
        assert!(s.contains(p(1.0, 1.0)));
        assert!(!s.contains(p(3.0, 1.0)));
        assert!(!SalaShape::line(Line::new(p(0.0, 0.0), p(1.0, 1.0))).contains(p(0.5, 0.5)));
    }
}
