//! Planar geometry kernel: points, axis-aligned regions and line segments.
//!
//! A [`Line`] is stored as its bounding [`QtRegion`] plus two flags that
//! say which diagonal corners are the true endpoints. `parity` is true
//! when the line rises from left to right; `rightward` is true when the
//! line was given start-to-end from left to right. All intersection
//! predicates take an explicit tolerance so callers can trade robustness
//! against strictness.

use std::cmp::Ordering;
use std::f64::consts::PI;
use std::ops::{Add, AddAssign, Div, Mul, Neg, Sub, SubAssign};

/// Absolute tolerance for gradient and angle comparisons.
pub const TOLERANCE_A: f64 = 1e-9;
/// Relative tolerance, scaled by the largest region dimension.
pub const TOLERANCE_B: f64 = 1e-12;
/// Loose tolerance for vertex matching.
pub const TOLERANCE_C: f64 = 1e-6;

/// Returns `-1.0` for negative values and `1.0` otherwise (zero counts as positive).
#[inline]
pub fn sgn(a: f64) -> f64 {
    if a < 0.0 {
        -1.0
    } else {
        1.0
    }
}

/// Principal axis used to parametrise a line.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Axis {
    /// Parametrise by x (for lines at least as wide as they are tall).
    X,
    /// Parametrise by y.
    Y,
}

// ── Point2f ─────────────────────────────────────────────────────

/// A point (or vector) in the plane.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Point2f {
    /// Horizontal coordinate.
    pub x: f64,
    /// Vertical coordinate.
    pub y: f64,
}

impl Point2f {
    /// Create a point from its coordinates.
    #[inline]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Unit vector at `angle` radians anticlockwise from the x axis.
    #[inline]
    pub fn from_angle(angle: f64) -> Self {
        Self::new(angle.cos(), angle.sin())
    }

    /// True if both coordinates are exactly zero.
    pub fn at_zero(&self) -> bool {
        self.x == 0.0 && self.y == 0.0
    }

    /// Euclidean length of the vector.
    #[inline]
    pub fn length(&self) -> f64 {
        (self.x * self.x + self.y * self.y).sqrt()
    }

    /// Coordinate along `axis`.
    #[inline]
    pub fn along(&self, axis: Axis) -> f64 {
        match axis {
            Axis::X => self.x,
            Axis::Y => self.y,
        }
    }

    /// This vector scaled to unit length.
    ///
    /// A zero vector yields NaN components, as division by zero would.
    #[inline]
    pub fn normalised(self) -> Self {
        self / self.length()
    }

    /// Component-wise scale.
    pub fn scaled(self, by: Point2f) -> Self {
        Self::new(self.x * by.x, self.y * by.y)
    }

    /// Rotate anticlockwise by `angle` radians.
    pub fn rotated(self, angle: f64) -> Self {
        let (s, c) = angle.sin_cos();
        Self::new(self.x * c - self.y * s, self.y * c + self.x * s)
    }

    /// Angle of a unit vector in `[0, 2π)`.
    pub fn angle(&self) -> f64 {
        let a = self.x.clamp(-1.0, 1.0).acos();
        if self.y < 0.0 {
            2.0 * PI - a
        } else {
            a
        }
    }

    /// Map into the unit square spanned by `r`. Degenerate extents map to zero.
    pub fn normal_scaled(self, r: &QtRegion) -> Self {
        let w = r.width();
        let h = r.height();
        Self::new(
            if w != 0.0 { (self.x - r.bottom_left.x) / w } else { 0.0 },
            if h != 0.0 { (self.y - r.bottom_left.y) / h } else { 0.0 },
        )
    }

    /// Inverse of [`normal_scaled`](Self::normal_scaled).
    pub fn denormal_scaled(self, r: &QtRegion) -> Self {
        Self::new(
            self.x * r.width() + r.bottom_left.x,
            self.y * r.height() + r.bottom_left.y,
        )
    }

    /// True if this point lies strictly inside the wedge at `key` spanned
    /// by the directions to `p2` and `p3`.
    pub fn in_segment(&self, key: Point2f, p2: Point2f, p3: Point2f, tolerance: f64) -> bool {
        let va = p2 - key;
        let vb = p3 - key;
        let vp = *self - key;
        let ap = det(va, vp);
        let bp = det(vb, vp);
        dot(va, vp) > 0.0
            && dot(vb, vp) > 0.0
            && (sgn(ap) != sgn(bp) || ap.abs() < tolerance || bp.abs() < tolerance)
    }

    /// True if this point is inside the triangle `p1 p2 p3` (either winding).
    pub fn in_triangle(&self, p1: Point2f, p2: Point2f, p3: Point2f) -> bool {
        let test = sgn(det(p2 - p1, *self - p1));
        test == sgn(det(p3 - p2, *self - p2)) && test == sgn(det(p1 - p3, *self - p3))
    }
}

impl Add for Point2f {
    type Output = Point2f;
    #[inline]
    fn add(self, o: Point2f) -> Point2f {
        Point2f::new(self.x + o.x, self.y + o.y)
    }
}

impl AddAssign for Point2f {
    #[inline]
    fn add_assign(&mut self, o: Point2f) {
        self.x += o.x;
        self.y += o.y;
    }
}

impl Sub for Point2f {
    type Output = Point2f;
    #[inline]
    fn sub(self, o: Point2f) -> Point2f {
        Point2f::new(self.x - o.x, self.y - o.y)
    }
}

impl SubAssign for Point2f {
    #[inline]
    fn sub_assign(&mut self, o: Point2f) {
        self.x -= o.x;
        self.y -= o.y;
    }
}

impl Neg for Point2f {
    type Output = Point2f;
    #[inline]
    fn neg(self) -> Point2f {
        Point2f::new(-self.x, -self.y)
    }
}

impl Mul<f64> for Point2f {
    type Output = Point2f;
    #[inline]
    fn mul(self, s: f64) -> Point2f {
        Point2f::new(self.x * s, self.y * s)
    }
}

impl Mul<Point2f> for f64 {
    type Output = Point2f;
    #[inline]
    fn mul(self, p: Point2f) -> Point2f {
        Point2f::new(self * p.x, self * p.y)
    }
}

impl Div<f64> for Point2f {
    type Output = Point2f;
    #[inline]
    fn div(self, s: f64) -> Point2f {
        Point2f::new(self.x / s, self.y / s)
    }
}

impl PartialOrd for Point2f {
    /// Lexicographic: x first, then y.
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match self.x.partial_cmp(&other.x)? {
            Ordering::Equal => self.y.partial_cmp(&other.y),
            ord => Some(ord),
        }
    }
}

/// Dot product.
#[inline]
pub fn dot(a: Point2f, b: Point2f) -> f64 {
    a.x * b.x + a.y * b.y
}

/// 2D cross product (determinant of the 2x2 matrix `[a b]`).
#[inline]
pub fn det(a: Point2f, b: Point2f) -> f64 {
    a.x * b.y - a.y * b.x
}

/// Euclidean distance between two points.
#[inline]
pub fn dist(a: Point2f, b: Point2f) -> f64 {
    (a - b).length()
}

/// Component-wise closeness within `tolerance`.
#[inline]
pub fn approx_eq(a: Point2f, b: Point2f, tolerance: f64) -> bool {
    (a.x - b.x).abs() <= tolerance && (a.y - b.y).abs() <= tolerance
}

/// Anticlockwise angle at `p2` from `p1` round to `p3`, in `[0, 2π)`.
pub fn angle(p1: Point2f, p2: Point2f, p3: Point2f) -> f64 {
    let a = (p1 - p2).normalised();
    let b = (p3 - p2).normalised();
    let d = dot(a, b).clamp(-1.0, 1.0);
    if sgn(det(a, b)) == 1.0 {
        d.acos()
    } else {
        2.0 * PI - d.acos()
    }
}

/// Shortest distance from `point` to the segment `line`.
pub fn dist_to_line(point: Point2f, line: &Line) -> f64 {
    let alpha = line.end() - line.start();
    let beta = point - line.end();
    let gamma = line.start() - line.end();
    let delta = point - line.start();
    if dot(alpha, beta) > 0.0 {
        beta.length()
    } else if dot(gamma, delta) > 0.0 {
        delta.length()
    } else if alpha.length() < 1e-9 * beta.length() {
        beta.length()
    } else {
        det(alpha, beta).abs() / alpha.length()
    }
}

// ── QtRegion ────────────────────────────────────────────────────

/// An axis-aligned rectangle given by its bottom-left and top-right corners.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct QtRegion {
    /// Minimum corner.
    pub bottom_left: Point2f,
    /// Maximum corner.
    pub top_right: Point2f,
}

impl QtRegion {
    /// Create a region from its corners.
    #[inline]
    pub const fn new(bottom_left: Point2f, top_right: Point2f) -> Self {
        Self {
            bottom_left,
            top_right,
        }
    }

    /// Vertical extent.
    #[inline]
    pub fn height(&self) -> f64 {
        self.top_right.y - self.bottom_left.y
    }

    /// Horizontal extent.
    #[inline]
    pub fn width(&self) -> f64 {
        (self.top_right.x - self.bottom_left.x).abs()
    }

    /// Width times height.
    pub fn area(&self) -> f64 {
        self.height() * self.width()
    }

    /// Centre point.
    pub fn centre(&self) -> Point2f {
        (self.bottom_left + self.top_right) / 2.0
    }

    /// Strict containment.
    pub fn contains(&self, p: Point2f) -> bool {
        p.x > self.bottom_left.x
            && p.x < self.top_right.x
            && p.y > self.bottom_left.y
            && p.y < self.top_right.y
    }

    /// Containment where touching the boundary counts.
    pub fn contains_touch(&self, p: Point2f) -> bool {
        p.x >= self.bottom_left.x
            && p.x <= self.top_right.x
            && p.y >= self.bottom_left.y
            && p.y <= self.top_right.y
    }

    /// Grow to include `p`.
    pub fn encompass(&mut self, p: Point2f) {
        self.bottom_left.x = self.bottom_left.x.min(p.x);
        self.top_right.x = self.top_right.x.max(p.x);
        self.bottom_left.y = self.bottom_left.y.min(p.y);
        self.top_right.y = self.top_right.y.max(p.y);
    }

    /// True if either corner sits at the origin (the "unset" marker).
    pub fn at_zero(&self) -> bool {
        self.bottom_left.at_zero() || self.top_right.at_zero()
    }

    /// Scale about the centre: each side moves out by `(scalar - 1)` of the extent.
    pub fn grow(&mut self, scalar: f64) {
        let dim = (self.top_right - self.bottom_left) * (scalar - 1.0);
        self.top_right += dim;
        self.bottom_left -= dim;
    }

    /// Translate both corners.
    pub fn offset(&mut self, by: Point2f) {
        self.bottom_left += by;
        self.top_right += by;
    }
}

/// Smallest region covering both `a` and `b`.
pub fn runion(a: &QtRegion, b: &QtRegion) -> QtRegion {
    QtRegion::new(
        Point2f::new(
            a.bottom_left.x.min(b.bottom_left.x),
            a.bottom_left.y.min(b.bottom_left.y),
        ),
        Point2f::new(
            a.top_right.x.max(b.top_right.x),
            a.top_right.y.max(b.top_right.y),
        ),
    )
}

/// Horizontal overlap test; touching counts.
pub fn overlap_x(a: &QtRegion, b: &QtRegion, tolerance: f64) -> bool {
    if a.bottom_left.x > b.bottom_left.x {
        b.top_right.x >= a.bottom_left.x - tolerance
    } else {
        a.top_right.x >= b.bottom_left.x - tolerance
    }
}

/// Vertical overlap test; touching counts.
pub fn overlap_y(a: &QtRegion, b: &QtRegion, tolerance: f64) -> bool {
    if a.bottom_left.y > b.bottom_left.y {
        b.top_right.y >= a.bottom_left.y - tolerance
    } else {
        a.top_right.y >= b.bottom_left.y - tolerance
    }
}

/// Region overlap test; touching counts.
pub fn intersect_region(a: &QtRegion, b: &QtRegion, tolerance: f64) -> bool {
    overlap_x(a, b, tolerance) && overlap_y(a, b, tolerance)
}

// ── Line ────────────────────────────────────────────────────────

/// How two segments meet, from [`intersect_line_distinguish`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LineContact {
    /// The segments do not meet.
    None,
    /// The segments touch (an endpoint lies on the other segment, within tolerance).
    Touching,
    /// The segments properly cross.
    Crossing,
}

/// A line segment stored as its bounding box plus endpoint orientation.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Line {
    bl: Point2f,
    tr: Point2f,
    parity: bool,
    rightward: bool,
}

impl Line {
    /// Build a line running from `a` to `b`.
    ///
    /// Vertical lines are always stored with positive parity.
    pub fn new(a: Point2f, b: Point2f) -> Self {
        if a.x == b.x {
            if a.y <= b.y {
                Self::from_parts(a, b, true, true)
            } else {
                Self::from_parts(Point2f::new(a.x, b.y), Point2f::new(b.x, a.y), true, false)
            }
        } else if a.x < b.x {
            if a.y <= b.y {
                Self::from_parts(a, b, true, true)
            } else {
                Self::from_parts(Point2f::new(a.x, b.y), Point2f::new(b.x, a.y), false, true)
            }
        } else if b.y <= a.y {
            Self::from_parts(b, a, true, false)
        } else {
            Self::from_parts(Point2f::new(b.x, a.y), Point2f::new(a.x, b.y), false, false)
        }
    }

    /// A line along the rising diagonal of `r`.
    pub fn from_region(r: &QtRegion) -> Self {
        Self::from_parts(r.bottom_left, r.top_right, true, true)
    }

    /// Rebuild a line from its stored representation (used by the codec).
    pub fn from_parts(bottom_left: Point2f, top_right: Point2f, parity: bool, rightward: bool) -> Self {
        Self {
            bl: bottom_left,
            tr: top_right,
            parity,
            rightward,
        }
    }

    /// Bounding-box minimum corner.
    #[inline]
    pub fn bottom_left(&self) -> Point2f {
        self.bl
    }

    /// Bounding-box maximum corner.
    #[inline]
    pub fn top_right(&self) -> Point2f {
        self.tr
    }

    /// Bounding box.
    #[inline]
    pub fn region(&self) -> QtRegion {
        QtRegion::new(self.bl, self.tr)
    }

    /// True if the line rises from left to right.
    #[inline]
    pub fn parity(&self) -> bool {
        self.parity
    }

    /// True if the line was given left-to-right.
    #[inline]
    pub fn rightward(&self) -> bool {
        self.rightward
    }

    /// True if the line was given bottom-to-top.
    #[inline]
    pub fn upward(&self) -> bool {
        self.rightward == self.parity
    }

    /// `1.0` for rising lines, `-1.0` for falling ones.
    #[inline]
    pub fn sign(&self) -> f64 {
        if self.parity {
            1.0
        } else {
            -1.0
        }
    }

    /// Left x.
    #[inline]
    pub fn ax(&self) -> f64 {
        self.bl.x
    }

    /// Right x.
    #[inline]
    pub fn bx(&self) -> f64 {
        self.tr.x
    }

    /// y at the left end.
    #[inline]
    pub fn ay(&self) -> f64 {
        if self.parity {
            self.bl.y
        } else {
            self.tr.y
        }
    }

    /// y at the right end.
    #[inline]
    pub fn by(&self) -> f64 {
        if self.parity {
            self.tr.y
        } else {
            self.bl.y
        }
    }

    fn set_ax(&mut self, v: f64) {
        self.bl.x = v;
    }

    fn set_bx(&mut self, v: f64) {
        self.tr.x = v;
    }

    fn set_ay(&mut self, v: f64) {
        if self.parity {
            self.bl.y = v;
        } else {
            self.tr.y = v;
        }
    }

    fn set_by(&mut self, v: f64) {
        if self.parity {
            self.tr.y = v;
        } else {
            self.bl.y = v;
        }
    }

    /// Left endpoint.
    #[inline]
    pub fn start(&self) -> Point2f {
        Point2f::new(self.ax(), self.ay())
    }

    /// Right endpoint.
    #[inline]
    pub fn end(&self) -> Point2f {
        Point2f::new(self.bx(), self.by())
    }

    /// The endpoint the line was given as its start.
    pub fn t_start(&self) -> Point2f {
        Point2f::new(
            if self.rightward { self.bl.x } else { self.tr.x },
            if self.upward() { self.bl.y } else { self.tr.y },
        )
    }

    /// The endpoint the line was given as its end.
    pub fn t_end(&self) -> Point2f {
        Point2f::new(
            if self.rightward { self.tr.x } else { self.bl.x },
            if self.upward() { self.tr.y } else { self.bl.y },
        )
    }

    /// Direction vector in given orientation.
    pub fn vector(&self) -> Point2f {
        self.t_end() - self.t_start()
    }

    /// Midpoint.
    pub fn midpoint(&self) -> Point2f {
        (self.start() + self.end()) / 2.0
    }

    /// Horizontal extent.
    #[inline]
    pub fn width(&self) -> f64 {
        (self.tr.x - self.bl.x).abs()
    }

    /// Vertical extent.
    #[inline]
    pub fn height(&self) -> f64 {
        self.tr.y - self.bl.y
    }

    /// Segment length.
    #[inline]
    pub fn length(&self) -> f64 {
        (self.tr - self.bl).length()
    }

    /// The axis with the greater extent (x on ties).
    #[inline]
    pub fn major_axis(&self) -> Axis {
        if self.width() >= self.height() {
            Axis::X
        } else {
            Axis::Y
        }
    }

    /// Gradient dy/dx for [`Axis::Y`], dx/dy for [`Axis::X`].
    pub fn grad(&self, axis: Axis) -> f64 {
        match axis {
            Axis::Y => self.sign() * self.height() / self.width(),
            Axis::X => self.sign() * self.width() / self.height(),
        }
    }

    /// Intercept matching [`grad`](Self::grad).
    pub fn constant(&self, axis: Axis) -> f64 {
        match axis {
            Axis::Y => self.ay() - self.grad(axis) * self.ax(),
            Axis::X => self.ax() - self.grad(axis) * self.ay(),
        }
    }

    /// Map both corners into the unit square spanned by `r`.
    pub fn normal_scale(&mut self, r: &QtRegion) {
        self.bl = self.bl.normal_scaled(r);
        self.tr = self.tr.normal_scaled(r);
    }

    /// Scale both corners component-wise.
    pub fn scale(&mut self, by: Point2f) {
        self.bl = self.bl.scaled(by);
        self.tr = self.tr.scaled(by);
    }

    /// Coordinate along `axis` where this line meets the infinite extension of `l`.
    ///
    /// Nearly parallel lines (gradients within `tolerance`) report the
    /// midpoint of `l`, clamped to this line's extent.
    pub fn intersection_point(&self, l: &Line, axis: Axis, tolerance: f64) -> f64 {
        match axis {
            Axis::X => {
                if l.width() == 0.0 {
                    l.bl.x
                } else {
                    let lg = l.grad(Axis::Y);
                    let g = self.grad(Axis::Y);
                    if (lg - g).abs() <= tolerance {
                        l.midpoint().x.clamp(self.bl.x.min(self.tr.x), self.tr.x.max(self.bl.x))
                    } else {
                        ((self.ay() - g * self.ax()) - (l.ay() - lg * l.ax())) / (lg - g)
                    }
                }
            }
            Axis::Y => {
                if l.height() == 0.0 {
                    l.bl.y
                } else {
                    let lg = l.grad(Axis::X);
                    let g = self.grad(Axis::X);
                    if (lg - g).abs() <= tolerance {
                        l.midpoint().y.clamp(self.bl.y.min(self.tr.y), self.tr.y.max(self.bl.y))
                    } else {
                        ((self.ax() - g * self.ay()) - (l.ax() - lg * l.ay())) / (lg - g)
                    }
                }
            }
        }
    }

    /// Convert a coordinate along `axis` back to a point on this line.
    pub fn point_on_line(&self, loc: f64, axis: Axis) -> Point2f {
        match axis {
            Axis::X => Point2f::new(loc, self.grad(Axis::Y) * loc + self.constant(Axis::Y)),
            Axis::Y => Point2f::new(self.grad(Axis::X) * loc + self.constant(Axis::X), loc),
        }
    }

    /// Clip to `r`. Returns false (leaving the line partly modified) if
    /// no part of the line lies in the region.
    pub fn crop(&mut self, r: &QtRegion) -> bool {
        if self.bx() < r.bottom_left.x {
            return false;
        }
        if self.ax() < r.bottom_left.x {
            let ay = self.ay() + self.sign() * (self.height() * (r.bottom_left.x - self.ax()) / self.width());
            self.set_ay(ay);
            self.set_ax(r.bottom_left.x);
        }
        if self.ax() > r.top_right.x {
            return false;
        }
        if self.bx() > r.top_right.x {
            let by = self.by() - self.sign() * self.height() * (self.bx() - r.top_right.x) / self.width();
            self.set_by(by);
            self.set_bx(r.top_right.x);
        }
        if self.tr.y < r.bottom_left.y {
            return false;
        }
        if self.bl.y < r.bottom_left.y {
            let shift = self.width() * (r.bottom_left.y - self.bl.y) / self.height();
            if self.parity {
                self.bl.x += shift;
            } else {
                self.tr.x -= shift;
            }
            self.bl.y = r.bottom_left.y;
        }
        if self.bl.y > r.top_right.y {
            return false;
        }
        if self.tr.y > r.top_right.y {
            let shift = self.width() * (self.tr.y - r.top_right.y) / self.height();
            if self.parity {
                self.tr.x -= shift;
            } else {
                self.bl.x += shift;
            }
            self.tr.y = r.top_right.y;
        }
        true
    }

    /// Extend the line to the edge of `r` in direction `rightward`
    /// (true extends the end the line points towards), then crop.
    pub fn ray(&mut self, rightward: bool, r: &QtRegion) {
        if rightward == self.rightward {
            if self.width() >= self.height() {
                let by = self.ay() + self.sign() * self.height() * (r.top_right.x - self.ax()) / self.width();
                self.set_by(by);
                self.set_bx(r.top_right.x);
            } else if self.parity {
                let bx = self.ax() + self.width() * (r.top_right.y - self.ay()) / self.height();
                self.set_bx(bx);
                self.set_by(r.top_right.y);
            } else {
                let bx = self.ax() + self.width() * (self.ay() - r.bottom_left.y) / self.height();
                self.set_bx(bx);
                self.set_by(r.bottom_left.y);
            }
        } else if self.width() >= self.height() {
            let ay = self.by() - self.sign() * self.height() * (self.bx() - r.bottom_left.x) / self.width();
            self.set_ay(ay);
            self.set_ax(r.bottom_left.x);
        } else if self.parity {
            let ax = self.bx() - self.width() * (self.by() - r.bottom_left.y) / self.height();
            self.set_ax(ax);
            self.set_ay(r.bottom_left.y);
        } else {
            let ax = self.bx() - self.width() * (r.top_right.y - self.by()) / self.height();
            self.set_ax(ax);
            self.set_ay(r.top_right.y);
        }
        self.crop(r);
    }
}

/// A line with an integer identity, used as BSP input.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct TaggedLine {
    /// The geometry.
    pub line: Line,
    /// Identity of the source line; fragments of a split line keep it.
    pub tag: i32,
}

impl TaggedLine {
    /// Pair a line with its tag.
    pub fn new(line: Line, tag: i32) -> Self {
        Self { line, tag }
    }
}

/// Dot product of the two lines' left-to-right vectors.
pub fn line_dot(a: &Line, b: &Line) -> f64 {
    (a.bx() - a.ax()) * (b.bx() - b.ax()) + (a.by() - a.ay()) * (b.by() - b.ay())
}

#[inline]
fn side_products(a: &Line, b: &Line) -> (f64, f64) {
    let alpha = ((a.ay() - a.by()) * (b.ax() - a.ax()) + (a.bx() - a.ax()) * (b.ay() - a.ay()))
        * ((a.ay() - a.by()) * (b.bx() - a.ax()) + (a.bx() - a.ax()) * (b.by() - a.ay()));
    let beta = ((b.ay() - b.by()) * (a.ax() - b.ax()) + (b.bx() - b.ax()) * (a.ay() - b.ay()))
        * ((b.ay() - b.by()) * (a.bx() - b.ax()) + (b.bx() - b.ax()) * (a.by() - b.ay()));
    (alpha, beta)
}

/// Segment intersection where touching counts.
///
/// Only meaningful once the bounding regions are known to overlap: all
/// collinear lines pass this test.
pub fn intersect_line(a: &Line, b: &Line, tolerance: f64) -> bool {
    let (alpha, beta) = side_products(a, b);
    alpha <= tolerance && beta <= tolerance
}

/// Segment intersection where touching does not count.
pub fn intersect_line_no_touch(a: &Line, b: &Line, tolerance: f64) -> bool {
    let (alpha, beta) = side_products(a, b);
    alpha < -tolerance && beta < -tolerance
}

/// Classify how two segments meet.
pub fn intersect_line_distinguish(a: &Line, b: &Line, tolerance: f64) -> LineContact {
    let (alpha, beta) = side_products(a, b);
    if alpha <= tolerance && beta <= tolerance {
        if alpha < -tolerance && beta < -tolerance {
            LineContact::Crossing
        } else {
            LineContact::Touching
        }
    } else {
        LineContact::None
    }
}

/// Bounding boxes overlap and the segments meet (touching counts).
#[inline]
pub fn lines_meet(a: &Line, b: &Line, tolerance: f64) -> bool {
    intersect_region(&a.region(), &b.region(), tolerance) && intersect_line(a, b, tolerance)
}

/// Point where `a` meets `b`, solved along `a`'s major axis.
pub fn intersection_point(a: &Line, b: &Line, tolerance: f64) -> Point2f {
    let axis = a.major_axis();
    a.point_on_line(a.intersection_point(b, axis, tolerance), axis)
}
