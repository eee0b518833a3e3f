//! A coarse grid of line references for fast segment queries.

use indexmap::IndexMap;

use sala_core::geometry::{
    det, intersect_line, intersect_line_distinguish, intersect_region, sgn, Axis, Line, LineContact,
    Point2f, QtRegion,
};
use sala_core::pixel::PixelRef;

use crate::pixelbase::PixelBase;

#[derive(Clone, Copy, Debug)]
struct LineTest {
    line: Line,
    test: u32,
}

/// Lines bucketed by the grid cells they cross.
///
/// Each line gets a fresh integer key. Queries stamp lines with a test
/// counter so each line is examined at most once per query.
#[derive(Clone, Debug, Default)]
pub struct SpacePixel {
    region: QtRegion,
    cols: i32,
    rows: i32,
    pixel_lines: Vec<Vec<i32>>,
    lines: IndexMap<i32, LineTest>,
    next_ref: i32,
    test: u32,
}

impl PixelBase for SpacePixel {
    fn pixelate(&self, p: Point2f, constrain: bool, _scale: i32) -> PixelRef {
        let n = p.normal_scaled(&self.region);
        let mut x = (n.x * (f64::from(self.cols) - 1e-9)) as i32;
        let mut y = (n.y * (f64::from(self.rows) - 1e-9)) as i32;
        if constrain {
            x = x.clamp(0, self.cols - 1);
            y = y.clamp(0, self.rows - 1);
        }
        match (i16::try_from(x), i16::try_from(y)) {
            (Ok(x), Ok(y)) => PixelRef::new(x, y),
            _ => PixelRef::NONE,
        }
    }

    fn cols(&self) -> i32 {
        self.cols
    }

    fn rows(&self) -> i32 {
        self.rows
    }

    fn region(&self) -> QtRegion {
        self.region
    }
}

impl SpacePixel {
    /// Reset to an empty grid over `min`..`max`, sized for about `size`
    /// lines at `density` lines per cell.
    pub fn init_lines(&mut self, size: usize, min: Point2f, max: Point2f, density: f64) {
        self.lines.clear();
        self.next_ref = 0;
        self.test = 0;
        self.region = QtRegion::new(min, max);

        let wh_ratio = self.region.width() / self.region.height();
        let hw_ratio = self.region.height() / self.region.width();
        let rows = (size as f64 * wh_ratio * density).sqrt();
        let cols = (size as f64 * hw_ratio * density).sqrt();
        self.rows = if rows.is_finite() { (rows as i32).max(1) } else { 1 };
        self.cols = if cols.is_finite() { (cols as i32).max(1) } else { 1 };
        self.pixel_lines = vec![Vec::new(); (self.rows * self.cols) as usize];
    }

    /// A grid sized for `lines`, with every line added and buckets sorted.
    pub fn from_lines(lines: &[Line], region: &QtRegion, density: f64) -> Self {
        let mut sp = Self::default();
        sp.init_lines(lines.len(), region.bottom_left, region.top_right, density);
        for l in lines {
            sp.add_line(*l);
        }
        sp.sort_pixel_lines();
        sp
    }

    #[inline]
    fn slot(&self, pix: PixelRef) -> usize {
        i32::from(pix.x) as usize * self.rows as usize + i32::from(pix.y) as usize
    }

    /// Add a line, returning its key.
    pub fn add_line(&mut self, line: Line) -> i32 {
        let key = self.next_ref;
        self.next_ref += 1;
        self.lines.insert(key, LineTest { line, test: 0 });
        for pix in self.pixelate_line(&line, 1) {
            let slot = self.slot(pix);
            self.pixel_lines[slot].push(key);
        }
        key
    }

    /// Remove a line by key, returning it if present.
    pub fn remove_line(&mut self, key: i32) -> Option<Line> {
        let lt = self.lines.shift_remove(&key)?;
        for pix in self.pixelate_line(&lt.line, 1) {
            let slot = self.slot(pix);
            self.pixel_lines[slot].retain(|&k| k != key);
        }
        Some(lt.line)
    }

    /// Drop stale keys from every bucket and sort them.
    pub fn sort_pixel_lines(&mut self) {
        let lines = &self.lines;
        for bucket in &mut self.pixel_lines {
            bucket.retain(|k| lines.contains_key(k));
            bucket.sort_unstable();
        }
    }

    /// Keys of the lines stored in one cell.
    pub(crate) fn bucket(&self, pix: PixelRef) -> &[i32] {
        &self.pixel_lines[self.slot(pix)]
    }

    /// Number of lines held.
    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    /// All lines with their keys, in insertion order.
    pub fn lines(&self) -> impl Iterator<Item = (i32, &Line)> {
        self.lines.iter().map(|(k, lt)| (*k, &lt.line))
    }

    fn next_test(&mut self) -> u32 {
        self.test = self.test.wrapping_add(1);
        self.test
    }

    fn scan(&mut self, l: &Line, tolerance: f64, exclude_shared_ends: bool) -> bool {
        let test = self.next_test();
        for pix in self.pixelate_line(l, 1) {
            let slot = self.slot(pix);
            for &key in &self.pixel_lines[slot] {
                let Some(lt) = self.lines.get_mut(&key) else {
                    continue;
                };
                if lt.test == test {
                    continue;
                }
                let other = lt.line;
                if intersect_region(&other.region(), &l.region(), 0.0) && intersect_line(&other, l, tolerance) {
                    let shares_end = other.start() == l.start()
                        || other.start() == l.end()
                        || other.end() == l.start()
                        || other.end() == l.end();
                    if !exclude_shared_ends || !shares_end {
                        return true;
                    }
                }
                lt.test = test;
            }
        }
        false
    }

    /// True if any stored line meets `l` (touching counts).
    pub fn intersect(&mut self, l: &Line, tolerance: f64) -> bool {
        self.scan(l, tolerance, false)
    }

    /// Like [`intersect`](Self::intersect) but lines sharing an endpoint with `l` are ignored.
    pub fn intersect_exclude(&mut self, l: &Line, tolerance: f64) -> bool {
        self.scan(l, tolerance, true)
    }

    /// Shorten `l` at the first stored line it crosses, walking in
    /// direction `rightward` (true walks from the given start).
    ///
    /// Lines that merely touch `l` only cut it when two touching lines
    /// meet at a shared endpoint on opposite sides of `l`, so a ray
    /// through a corner is stopped but a ray grazing a wall is not.
    pub fn cut_line(&mut self, l: &mut Line, rightward: bool) {
        let test = self.next_test();
        let tolerance = l.length() * 1e-9;
        let mut loc: Vec<f64> = Vec::new();
        let pixels = self.pixelate_line(l, 1);
        let axis = l.major_axis();
        let forward = rightward == l.rightward();
        let (truestart, trueend) = if forward { (l.start(), l.end()) } else { (l.end(), l.start()) };
        let first_loc_wins =
            (forward && (axis == Axis::X || l.sign() == 1.0)) || (!forward && axis == Axis::Y && l.sign() == -1.0);

        let mut touching: Vec<Line> = Vec::new();
        let count = pixels.len();
        for i in 0..count {
            let pix = if forward { pixels[i] } else { pixels[count - 1 - i] };
            let slot = self.slot(pix);
            for &key in &self.pixel_lines[slot] {
                let Some(lt) = self.lines.get_mut(&key) else {
                    continue;
                };
                if lt.test == test {
                    continue;
                }
                lt.test = test;
                let other = lt.line;
                let tol = tolerance * other.length();
                if !intersect_region(&other.region(), &l.region(), tol) {
                    continue;
                }
                match intersect_line_distinguish(&other, l, tol) {
                    LineContact::None => {}
                    LineContact::Crossing => insert_sorted(&mut loc, l.intersection_point(&other, axis, 0.0)),
                    LineContact::Touching => {
                        if truestart == other.start() || truestart == other.end() {
                            continue;
                        }
                        for t in &touching {
                            let a = if other.start() == t.start() || other.end() == t.end() {
                                other.end() - other.start()
                            } else if other.start() == t.end() || other.end() == t.start() {
                                other.start() - other.end()
                            } else {
                                continue;
                            };
                            let b = t.end() - t.start();
                            let p = trueend - truestart;
                            let oa = det(p, a);
                            let ob = det(p, b);
                            if sgn(oa) != sgn(ob) || oa.abs() < tol || ob.abs() < tol {
                                if oa.abs() > tol {
                                    insert_sorted(&mut loc, l.intersection_point(&other, axis, 0.0));
                                } else if ob.abs() > tol {
                                    insert_sorted(&mut loc, l.intersection_point(t, axis, 0.0));
                                } else {
                                    log::warn!("cut_line: both touching lines parallel to the cut line");
                                }
                            }
                        }
                        touching.push(other);
                    }
                }
            }
            let candidate = if first_loc_wins { loc.first() } else { loc.last() };
            if let Some(&pos) = candidate {
                if pix == self.pixelate(l.point_on_line(pos, axis), true, 1) {
                    break;
                }
            }
        }

        let (Some(&first), Some(&last)) = (loc.first(), loc.last()) else {
            return;
        };
        *l = trimmed(l, forward, axis, first, last);
    }
}

/// Move the far end of `l` (relative to the walk direction) to the cut location.
fn trimmed(l: &Line, forward: bool, axis: Axis, first: f64, last: f64) -> Line {
    let (w, h, sign) = (l.width(), l.height(), l.sign());
    let (mut a, mut b) = (l.start(), l.end());
    match (forward, axis, sign > 0.0) {
        (true, Axis::X, _) => {
            b = Point2f::new(first, a.y + sign * h * (first - a.x) / w);
        }
        (true, Axis::Y, true) => {
            b = Point2f::new(a.x + w * (first - a.y) / h, first);
        }
        (true, Axis::Y, false) => {
            b = Point2f::new(a.x + w * (a.y - last) / h, last);
        }
        (false, Axis::X, _) => {
            a = Point2f::new(last, b.y - sign * h * (b.x - last) / w);
        }
        (false, Axis::Y, true) => {
            a = Point2f::new(b.x - w * (b.y - last) / h, last);
        }
        (false, Axis::Y, false) => {
            a = Point2f::new(b.x - w * (first - b.y) / h, first);
        }
    }
    // keep the original orientation
    if l.rightward() {
        Line::new(a, b)
    } else {
        Line::new(b, a)
    }
}

fn insert_sorted(v: &mut Vec<f64>, x: f64) {
    match v.binary_search_by(|p| p.total_cmp(&x)) {
        Ok(_) => {}
        Err(i) => v.insert(i, x),
    }
}
