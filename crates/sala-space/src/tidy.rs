//! Clean-up of imported line drawings before graph construction.

use indexmap::IndexMap;

use sala_core::geometry::{approx_eq, intersect_region, Axis, Line, QtRegion, TOLERANCE_A, TOLERANCE_B};

use crate::pixelbase::PixelBase;
use crate::spacepix::SpacePixel;

/// Remove near-zero lines and merge overlapping collinear lines.
///
/// Where two lines lie on the same infinite line and overlap, the earlier
/// one is absorbed into the later one, which is stretched to cover both.
pub fn tidy_lines(lines: &mut Vec<Line>, region: &QtRegion) {
    let maxdim = region.width().max(region.height());
    let tol = maxdim * TOLERANCE_B;

    lines.retain(|l| l.length() >= tol);

    let sp = SpacePixel::from_lines(lines, region, 1.0);
    let mut tested = vec![0usize; lines.len()];
    let mut remove: Vec<usize> = Vec::new();

    for i in 0..lines.len() {
        let stamp = i + 1;
        tested[i] = stamp;
        'cells: for pix in sp.pixelate_line(&lines[i], 1) {
            for &key in sp.bucket(pix) {
                let j = key as usize;
                if tested[j] == stamp || j <= i || !intersect_region(&lines[i].region(), &lines[j].region(), tol) {
                    continue;
                }
                tested[j] = stamp;
                let li = lines[i];
                let lj = lines[j];
                let axis_i = li.major_axis();
                let axis_j = lj.major_axis();
                let reverse = match axis_i {
                    Axis::X => Axis::Y,
                    Axis::Y => Axis::X,
                };
                if axis_i != axis_j
                    || (li.grad(reverse) - lj.grad(reverse)).abs() >= TOLERANCE_A
                    || (li.constant(reverse) - lj.constant(reverse)).abs() >= tol
                {
                    continue;
                }
                let parity = if axis_i == Axis::X { 1.0 } else { li.sign() };
                let at = |p: sala_core::Point2f| p.along(axis_i) * parity;
                let furthest = if at(li.end()) > at(lj.end()) { li } else { lj };
                if at(li.start()) + tol > at(lj.start()) && at(li.start()) < at(lj.end()) + tol {
                    lines[j] = Line::new(lj.start(), furthest.end());
                    remove.push(i);
                    break 'cells;
                }
                if at(lj.start()) + tol > at(li.start()) && at(lj.start()) < at(li.end()) + tol {
                    lines[j] = Line::new(li.start(), furthest.end());
                    remove.push(i);
                    break 'cells;
                }
            }
        }
    }

    remove.dedup();
    for i in remove.into_iter().rev() {
        lines.remove(i);
    }
}

/// Remove near-zero lines and exact duplicates from a keyed line set.
///
/// Lines shorter than `1e-5` of the mean length count as zero length;
/// duplicates must match at both ends within the same tolerance.
pub fn quick_tidy(lines: &mut IndexMap<i32, Line>, region: &QtRegion) {
    if lines.is_empty() {
        return;
    }
    let avglen = lines.values().map(Line::length).sum::<f64>() / lines.len() as f64;
    let tol = avglen * 10e-6;
    lines.retain(|_, l| l.length() >= tol);

    let ordered: Vec<(i32, Line)> = lines.iter().map(|(k, l)| (*k, *l)).collect();
    let plain: Vec<Line> = ordered.iter().map(|(_, l)| *l).collect();
    let sp = SpacePixel::from_lines(&plain, region, 1.0);

    let mut remove = Vec::new();
    for (i, (key, l)) in ordered.iter().enumerate() {
        let start = sp.pixelate(l.start(), true, 1);
        let duplicate = sp.bucket(start).iter().any(|&k| {
            let k = k as usize;
            k > i && approx_eq(l.start(), plain[k].start(), tol) && approx_eq(l.end(), plain[k].end(), tol)
        });
        if duplicate {
            remove.push(*key);
        }
    }
    for key in remove {
        lines.shift_remove(&key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sala_core::Point2f;

    fn p(x: f64, y: f64) -> Point2f {
        Point2f::new(x, y)
    }

    fn region() -> QtRegion {
        QtRegion::new(p(0.0, 0.0), p(10.0, 10.0))
    }

    // ── tidy_lines tests ────────────────────────────────────────

    #[test]
    fn overlapping_collinear_lines_merge() {
        let mut lines = vec![
            Line::new(p(0.0, 5.0), p(4.0, 5.0)),
            Line::new(p(3.0, 5.0), p(8.0, 5.0)),
            Line::new(p(1.0, 1.0), p(1.0, 9.0)),
        ];
        tidy_lines(&mut lines, &region());
        assert_eq!(lines.len(), 2);
        assert!(lines.contains(&Line::new(p(0.0, 5.0), p(8.0, 5.0))));
    }

    #[test]
    fn zero_length_lines_are_dropped() {
        let mut lines = vec![Line::new(p(2.0, 2.0), p(2.0, 2.0)), Line::new(p(0.0, 0.0), p(5.0, 5.0))];
        tidy_lines(&mut lines, &region());
        assert_eq!(lines.len(), 1);
    }

    #[test]
    fn parallel_offset_lines_are_kept() {
        let mut lines = vec![Line::new(p(0.0, 5.0), p(4.0, 5.0)), Line::new(p(0.0, 6.0), p(4.0, 6.0))];
        tidy_lines(&mut lines, &region());
        assert_eq!(lines.len(), 2);
    }

    // ── quick_tidy tests ────────────────────────────────────────

    #[test]
    fn duplicate_keyed_lines_collapse() {
        let mut lines = IndexMap::new();
        lines.insert(3, Line::new(p(0.0, 0.0), p(5.0, 5.0)));
        lines.insert(7, Line::new(p(0.0, 0.0), p(5.0, 5.0)));
        lines.insert(9, Line::new(p(1.0, 0.0), p(1.0, 5.0)));
        quick_tidy(&mut lines, &region());
        assert_eq!(lines.keys().copied().collect::<Vec<_>>(), vec![7, 9]);
    }
}
