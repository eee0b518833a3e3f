//! Small drawings shared by the crate tests.

use sala_core::{Line, Point2f, QtRegion, TaggedLine};

pub fn p(x: f64, y: f64) -> Point2f {
    Point2f::new(x, y)
}

/// Closed outline through `corners`, one line per edge.
pub fn outline(corners: &[Point2f]) -> Vec<Line> {
    (0..corners.len())
        .map(|i| Line::new(corners[i], corners[(i + 1) % corners.len()]))
        .collect()
}

/// Lines tagged by their index.
pub fn tagged(lines: &[Line]) -> Vec<TaggedLine> {
    lines
        .iter()
        .enumerate()
        .map(|(i, l)| TaggedLine::new(*l, i as i32))
        .collect()
}

/// Region from the origin to `(w, h)`.
pub fn region(w: f64, h: f64) -> QtRegion {
    QtRegion::new(p(0.0, 0.0), p(w, h))
}

/// Four walls of a `w` by `h` room with a corner at the origin.
pub fn room(w: f64, h: f64) -> Vec<Line> {
    outline(&[p(0.0, 0.0), p(w, 0.0), p(w, h), p(0.0, h)])
}

/// A 10 x 6 room with a 2 x 2 alcove in the middle of its top wall.
/// Bounded by `region(10.0, 8.0)`.
pub fn notched_room() -> Vec<Line> {
    outline(&[
        p(0.0, 0.0),
        p(10.0, 0.0),
        p(10.0, 6.0),
        p(6.0, 6.0),
        p(6.0, 8.0),
        p(4.0, 8.0),
        p(4.0, 6.0),
        p(0.0, 6.0),
    ])
}

/// A 6 x 4 room split by a wall from the floor at x = 3 up to y = 2.5,
/// leaving a gap along the top.
pub fn partitioned_room() -> Vec<Line> {
    let mut lines = room(6.0, 4.0);
    lines.push(Line::new(p(3.0, 0.0), p(3.0, 2.5)));
    lines
}

/// Two rooms joined by a one-unit doorway: 4 x 4 each, side by side.
/// Bounded by `region(8.0, 4.0)`.
pub fn two_rooms() -> Vec<Line> {
    let mut lines = room(8.0, 4.0);
    lines.push(Line::new(p(4.0, 0.0), p(4.0, 1.5)));
    lines.push(Line::new(p(4.0, 2.5), p(4.0, 4.0)));
    lines
}

/// Three lines meeting like a comb: a spine with two crossing teeth.
pub fn comb() -> Vec<Line> {
    vec![
        Line::new(p(0.0, 0.0), p(3.0, 0.0)),
        Line::new(p(1.0, 1.0), p(1.0, -1.0)),
        Line::new(p(2.0, 1.0), p(2.0, -2.0)),
    ]
}

/// A small hash sign: two horizontals crossed by two verticals, all of
/// them 1.5 long. The second line is drawn top to bottom.
pub fn hash() -> Vec<Line> {
    vec![
        Line::new(p(0.0, 0.5), p(1.5, 0.5)),
        Line::new(p(0.5, 1.5), p(0.5, 0.0)),
        Line::new(p(0.0, 1.0), p(1.5, 1.0)),
        Line::new(p(1.0, 0.0), p(1.0, 1.5)),
    ]
}

/// Three lines joined end to end in an open U.
pub fn u_path() -> Vec<Line> {
    vec![
        Line::new(p(1.0, 1.0), p(1.0, 0.0)),
        Line::new(p(1.0, 0.0), p(2.0, 0.0)),
        Line::new(p(2.0, 0.0), p(2.0, 2.0)),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outline_is_closed() {
        let lines = room(4.0, 3.0);
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[3].t_end(), lines[0].t_start());
    }

    #[test]
    fn tags_follow_order() {
        let t = tagged(&hash());
        assert_eq!(t.iter().map(|l| l.tag).collect::<Vec<_>>(), vec![0, 1, 2, 3]);
    }
}
