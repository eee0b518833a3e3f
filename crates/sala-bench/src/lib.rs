//! Benchmark drawings for the Sala crates.
//!
//! - [`street_grid`]: an `n` by `n` lattice of crossing streets
//! - [`room_row`]: `n` rooms side by side, joined by doorways
//! - [`filled_room_row`]: [`room_row`] as a filled point map

#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use sala_core::{Line, Point2f, QtRegion, TaggedLine};
use sala_vga::{FillType, GridConfig, PointMap, PointMapError};

fn p(x: f64, y: f64) -> Point2f {
    Point2f::new(x, y)
}

/// `n` horizontal and `n` vertical streets, `spacing` apart, each
/// overhanging the outermost cross streets by half a spacing.
pub fn street_grid(n: usize, spacing: f64) -> Vec<Line> {
    let far = spacing * n as f64;
    let mut lines = Vec::with_capacity(2 * n);
    for k in 0..n {
        let at = spacing * (k as f64 + 0.5);
        lines.push(Line::new(p(0.0, at), p(far, at)));
        lines.push(Line::new(p(at, 0.0), p(at, far)));
    }
    lines
}

/// Region covering [`street_grid`]`(n, spacing)`.
pub fn street_grid_region(n: usize, spacing: f64) -> QtRegion {
    let far = spacing * n as f64;
    QtRegion::new(p(0.0, 0.0), p(far, far))
}

/// `n` rooms of 4 x 4 in a row, each wall between them broken by a
/// one-unit doorway at mid height.
pub fn room_row(n: usize) -> Vec<Line> {
    let w = 4.0 * n as f64;
    let mut lines = vec![
        Line::new(p(0.0, 0.0), p(w, 0.0)),
        Line::new(p(w, 0.0), p(w, 4.0)),
        Line::new(p(w, 4.0), p(0.0, 4.0)),
        Line::new(p(0.0, 4.0), p(0.0, 0.0)),
    ];
    for k in 1..n {
        let x = 4.0 * k as f64;
        lines.push(Line::new(p(x, 0.0), p(x, 1.5)));
        lines.push(Line::new(p(x, 2.5), p(x, 4.0)));
    }
    lines
}

/// [`room_row`] lines tagged by index, as the BSP builder takes them.
pub fn tagged_room_row(n: usize) -> Vec<TaggedLine> {
    room_row(n)
        .into_iter()
        .enumerate()
        .map(|(i, l)| TaggedLine::new(l, i as i32))
        .collect()
}

/// [`room_row`]`(n)` on a grid of `spacing`, filled from the first room.
pub fn filled_room_row(n: usize, spacing: f64) -> Result<PointMap, PointMapError> {
    let region = QtRegion::new(p(0.0, 0.0), p(4.0 * n as f64, 4.0));
    let mut map = PointMap::new("room row", region, room_row(n));
    map.set_grid(&GridConfig::with_spacing(spacing))?;
    map.make_points(p(2.0, 2.0), FillType::Full, None)?;
    Ok(map)
}
