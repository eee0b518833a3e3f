//! Mapping continuous coordinates onto a regular grid of cells.

use sala_core::geometry::{Axis, Line, Point2f, QtRegion};
use sala_core::pixel::PixelRef;

/// A grid laid over a region.
///
/// Implementors supply the point-to-cell mapping and the grid shape; the
/// line rasterisers are shared.
pub trait PixelBase {
    /// Map a point to its cell.
    ///
    /// With `constrain` set the result is clamped into the grid; without it
    /// the raw cell is returned and must be checked with [`includes`](Self::includes).
    /// `scale` subdivides every cell (used by the point map's sub-grid walks).
    fn pixelate(&self, p: Point2f, constrain: bool, scale: i32) -> PixelRef;

    /// Number of columns.
    fn cols(&self) -> i32;

    /// Number of rows.
    fn rows(&self) -> i32;

    /// Region the grid covers.
    fn region(&self) -> QtRegion;

    /// True if `pix` is inside the grid.
    fn includes(&self, pix: PixelRef) -> bool {
        pix.x >= 0 && i32::from(pix.x) < self.cols() && pix.y >= 0 && i32::from(pix.y) < self.rows()
    }

    /// Every cell the line passes through, walking from its left end.
    ///
    /// Endpoints are clamped into the grid first, so the walk is only
    /// exact for lines that lie inside the region.
    fn pixelate_line(&self, l: &Line, scale: i32) -> Vec<PixelRef> {
        let mut pixels = Vec::new();
        let pa = self.pixelate(l.start(), true, scale);
        let pb = self.pixelate(l.end(), true, scale);
        let (mut ax, mut ay) = (i32::from(pa.x), i32::from(pa.y));
        let (bx, mut by) = (i32::from(pb.x), i32::from(pb.y));

        let mut l = *l;
        l.normal_scale(&self.region());

        pixels.push(pa);

        let scaled_cols = f64::from(self.cols() * scale);
        let scaled_rows = f64::from(self.rows() * scale);

        let mut parity = 1;
        if ay > by {
            parity = -1;
            ay = -ay;
            by = -by;
        }
        let cell = |x: i32, y: i32| PixelRef::new(x as i16, (parity * y) as i16);

        if ax == bx {
            while ay < by {
                ay += 1;
                pixels.push(cell(ax, ay));
            }
        } else if ay == by {
            while ax < bx {
                ax += 1;
                pixels.push(cell(ax, ay));
            }
        } else {
            let p = f64::from(parity);
            let hw_ratio = l.height() / l.width();
            let wh_ratio = l.width() / l.height();
            let x0_const = l.ay() - p * hw_ratio * l.ax();
            let y0_const = l.ax() - p * wh_ratio * l.ay();

            while ax < bx || ay < by {
                let ey = parity
                    * (scaled_rows * (x0_const + p * hw_ratio * (f64::from(ax + 1) / scaled_cols))) as i32;
                // descending 1.5 -> 1, ascending 1.5 -> 2
                let row_edge = if parity < 0 { ay } else { ay + 1 };
                let ex = (scaled_cols * (y0_const + wh_ratio * (f64::from(row_edge) / scaled_rows))) as i32;

                if ay < ey {
                    while ay < ey && ay < by {
                        ay += 1;
                        pixels.push(cell(ax, ay));
                    }
                    if ax < bx {
                        ax += 1;
                        pixels.push(cell(ax, ay));
                    }
                } else if ax < ex {
                    while ax < ex && ax < bx {
                        ax += 1;
                        pixels.push(cell(ax, ay));
                    }
                    if ay < by {
                        ay += 1;
                        pixels.push(cell(ax, ay));
                    }
                } else {
                    ax += 1;
                    pixels.push(cell(ax, ay));
                    ay += 1;
                    pixels.push(cell(ax, ay));
                }
            }
        }
        pixels
    }

    /// Every cell the line passes through or touches within `tolerance`
    /// (in cell units). Cells outside the grid are skipped.
    fn pixelate_line_touching(&self, l: &Line, tolerance: f64) -> Vec<PixelRef> {
        let mut pixels = Vec::new();
        let mut l = *l;
        l.normal_scale(&self.region());
        l.scale(Point2f::new(f64::from(self.cols()), f64::from(self.rows())));

        let encloses = |x: i32, y: i32| x >= 0 && x < self.cols() && y >= 0 && y < self.rows();
        let sign = l.sign();

        if l.width() > l.height() {
            let grad = l.grad(Axis::Y);
            let constant = l.constant(Axis::Y);
            let first = (l.ax() - tolerance).floor() as i32;
            let last = (l.bx() + tolerance).floor() as i32;
            for i in first..=last {
                let from = if i == first { l.ax() } else { f64::from(i) };
                let to = if i == last { l.bx() } else { f64::from(i + 1) };
                let j1 = (from * grad + constant - sign * tolerance).floor() as i32;
                let j2 = (to * grad + constant + sign * tolerance).floor() as i32;
                if encloses(i, j1) {
                    pixels.push(PixelRef::new(i as i16, j1 as i16));
                }
                if j1 != j2 && encloses(i, j2) {
                    pixels.push(PixelRef::new(i as i16, j2 as i16));
                }
            }
        } else {
            let grad = l.grad(Axis::X);
            let constant = l.constant(Axis::X);
            let first = (l.bottom_left().y - tolerance).floor() as i32;
            let last = (l.top_right().y + tolerance).floor() as i32;
            for i in first..=last {
                let from = if i == first { l.bottom_left().y } else { f64::from(i) };
                let to = if i == last { l.top_right().y } else { f64::from(i + 1) };
                let j1 = (from * grad + constant - sign * tolerance).floor() as i32;
                let j2 = (to * grad + constant + sign * tolerance).floor() as i32;
                if encloses(j1, i) {
                    pixels.push(PixelRef::new(j1 as i16, i as i16));
                }
                if j1 != j2 {
                    if encloses(j2, i) {
                        pixels.push(PixelRef::new(j2 as i16, i as i16));
                    }
                    // exactly diagonal lines skip a column
                    if (j2 - j1).abs() == 2 {
                        let j3 = (j1 + j2) / 2;
                        if encloses(j3, i) {
                            pixels.push(PixelRef::new(j3 as i16, i as i16));
                        }
                    }
                }
            }
        }
        pixels
    }
}

/// Cells visited by a straight walk between two cell centres.
///
/// When the walk runs exactly along a cell boundary both neighbouring
/// cells are reported.
pub fn quick_pixelate_line(p: PixelRef, q: PixelRef) -> Vec<PixelRef> {
    let mut list = Vec::new();
    let mut dx = f64::from(q.x - p.x);
    let mut dy = f64::from(q.y - p.y);
    if dx == 0.0 && dy == 0.0 {
        list.push(p);
        return list;
    }
    // 0: diagonal, 1: x-major, 2: y-major
    let (polarity, t) = if dx.abs() == dy.abs() {
        (0, dx.abs())
    } else if dx.abs() > dy.abs() {
        (1, dx.abs())
    } else {
        (2, dy.abs())
    };
    dx /= t;
    dy /= t;
    let mut ppx = f64::from(p.x) + 0.5;
    let mut ppy = f64::from(p.y) + 0.5;
    let cell = |x: f64, y: f64| PixelRef::new(x.floor() as i16, y.floor() as i16);

    let steps = t as i32;
    for _ in 0..=steps {
        if polarity == 1 && (ppy.floor() - ppy).abs() < 1e-9 {
            list.push(cell(ppx, ppy + 0.5));
            list.push(cell(ppx, ppy - 0.5));
        } else if polarity == 2 && (ppx.floor() - ppx).abs() < 1e-9 {
            list.push(cell(ppx + 0.5, ppy));
            list.push(cell(ppx - 0.5, ppy));
        } else {
            list.push(cell(ppx, ppy));
        }
        ppx += dx;
        ppy += dy;
    }
    list
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A bare 10x10 unit grid over (0,0)-(10,10).
    struct UnitGrid;

    impl PixelBase for UnitGrid {
        fn pixelate(&self, p: Point2f, constrain: bool, scale: i32) -> PixelRef {
            let s = f64::from(scale);
            let mut x = (p.x * s).floor() as i32;
            let mut y = (p.y * s).floor() as i32;
            if constrain {
                x = x.clamp(0, 10 * scale - 1);
                y = y.clamp(0, 10 * scale - 1);
            }
            PixelRef::new(x as i16, y as i16)
        }
        fn cols(&self) -> i32 {
            10
        }
        fn rows(&self) -> i32 {
            10
        }
        fn region(&self) -> QtRegion {
            QtRegion::new(Point2f::new(0.0, 0.0), Point2f::new(10.0, 10.0))
        }
    }

    fn line(ax: f64, ay: f64, bx: f64, by: f64) -> Line {
        Line::new(Point2f::new(ax, ay), Point2f::new(bx, by))
    }

    fn is_connected(cells: &[PixelRef]) -> bool {
        cells.windows(2).all(|w| {
            let dx = (w[1].x - w[0].x).abs();
            let dy = (w[1].y - w[0].y).abs();
            dx + dy == 1
        })
    }

    #[test]
    fn horizontal_line_walks_columns() {
        let cells = UnitGrid.pixelate_line(&line(0.5, 3.5, 4.5, 3.5), 1);
        let xs: Vec<i16> = cells.iter().map(|c| c.x).collect();
        assert_eq!(xs, vec![0, 1, 2, 3, 4]);
        assert!(cells.iter().all(|c| c.y == 3));
    }

    #[test]
    fn rising_line_is_four_connected() {
        let cells = UnitGrid.pixelate_line(&line(0.5, 0.5, 7.2, 3.9), 1);
        assert_eq!(cells.first(), Some(&PixelRef::new(0, 0)));
        assert_eq!(cells.last(), Some(&PixelRef::new(7, 3)));
        assert!(is_connected(&cells));
    }

    #[test]
    fn falling_line_is_four_connected() {
        let cells = UnitGrid.pixelate_line(&line(1.2, 8.7, 6.6, 2.3), 1);
        assert_eq!(cells.first(), Some(&PixelRef::new(1, 8)));
        assert_eq!(cells.last(), Some(&PixelRef::new(6, 2)));
        assert!(is_connected(&cells));
    }

    #[test]
    fn touching_walk_includes_boundary_cells() {
        // runs along the boundary between rows 1 and 2
        let cells = UnitGrid.pixelate_line_touching(&line(0.5, 2.0, 3.5, 2.0), 1e-9);
        assert!(cells.contains(&PixelRef::new(0, 1)));
        assert!(cells.contains(&PixelRef::new(0, 2)));
        assert!(cells.contains(&PixelRef::new(3, 2)));
    }

    #[test]
    fn quick_walk_covers_both_sides_of_a_boundary() {
        let cells = quick_pixelate_line(PixelRef::new(0, 0), PixelRef::new(4, 1));
        assert_eq!(cells.first(), Some(&PixelRef::new(0, 0)));
        assert_eq!(cells.last(), Some(&PixelRef::new(4, 1)));
        // the walk crosses y = 1.0 exactly at x = 2.5
        assert!(cells.contains(&PixelRef::new(2, 0)));
        assert!(cells.contains(&PixelRef::new(2, 1)));
    }
}
