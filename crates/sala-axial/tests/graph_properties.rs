use proptest::prelude::*;
use sala_axial::{convert_axial_to_segment, SegmentOptions, ShapeGraph};
use sala_core::Line;
use sala_test_utils::fixtures::{p, region};

/// Horizontals at y = 1, 2, .. and verticals at x = 1.5, 2.5, ..
fn grid_lines(horizontal: &[(u8, u8)], vertical: &[(u8, u8)]) -> Vec<Line> {
    let mut lines = Vec::new();
    for (k, &(a, b)) in horizontal.iter().enumerate() {
        let y = k as f64 + 1.0;
        lines.push(Line::new(p(f64::from(a), y), p(f64::from(b), y)));
    }
    for (k, &(c, d)) in vertical.iter().enumerate() {
        let x = k as f64 + 1.5;
        lines.push(Line::new(p(x, f64::from(c)), p(x, f64::from(d))));
    }
    lines
}

fn spans(lo: std::ops::Range<u8>, hi: std::ops::Range<u8>) -> impl Strategy<Value = Vec<(u8, u8)>> {
    proptest::collection::vec((lo, hi), 2..5)
}

proptest! {
    #[test]
    fn axial_connections_are_symmetric(h in spans(0..3, 5..9), v in spans(0..2, 3..7)) {
        let g = ShapeGraph::axial_from_lines("grid", &grid_lines(&h, &v), &region(10.0, 8.0));
        for (a, c) in g.connectors().iter().enumerate() {
            prop_assert!(!c.connections.contains(&a));
            for &b in &c.connections {
                prop_assert!(g.connectors()[b].connections.contains(&a), "{} -> {} has no return", a, b);
            }
        }
    }

    #[test]
    fn segment_links_come_in_pairs(h in spans(0..3, 5..9), v in spans(0..2, 3..7)) {
        let axial = ShapeGraph::axial_from_lines("grid", &grid_lines(&h, &v), &region(10.0, 8.0));
        let seg = convert_axial_to_segment(&axial, "segments", false, &SegmentOptions::default()).unwrap();
        let conns = seg.connectors();
        for (a, c) in conns.iter().enumerate() {
            for (exit, r, w) in c.all_segconns() {
                let back = conns[r.index].segconns(r.dir.reversed());
                let found = back
                    .iter()
                    .find(|(rr, _)| rr.index == a && rr.dir == exit.reversed())
                    .map(|(_, ww)| *ww);
                prop_assert_eq!(found, Some(w));
            }
        }
    }

    #[test]
    fn turn_weights_stay_in_range(h in spans(0..3, 5..9), v in spans(0..2, 3..7)) {
        let axial = ShapeGraph::axial_from_lines("grid", &grid_lines(&h, &v), &region(10.0, 8.0));
        let seg = convert_axial_to_segment(&axial, "segments", false, &SegmentOptions::default()).unwrap();
        for c in seg.connectors() {
            for (_, _, w) in c.all_segconns() {
                prop_assert!((0.0..=2.0).contains(&w));
            }
        }
    }
}
