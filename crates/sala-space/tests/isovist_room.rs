use sala_core::geometry::{Line, Point2f, QtRegion, TaggedLine};
use sala_space::{BspConfig, BspTree, Isovist, ShapeMap};

fn p(x: f64, y: f64) -> Point2f {
    Point2f::new(x, y)
}

/// A 10 x 6 room with a 2 x 2 alcove in the middle of its top wall.
fn notched_room() -> Vec<TaggedLine> {
    let outline = [
        p(0.0, 0.0),
        p(10.0, 0.0),
        p(10.0, 6.0),
        p(6.0, 6.0),
        p(6.0, 8.0),
        p(4.0, 8.0),
        p(4.0, 6.0),
        p(0.0, 6.0),
    ];
    (0..outline.len())
        .map(|i| TaggedLine::new(Line::new(outline[i], outline[(i + 1) % outline.len()]), i as i32))
        .collect()
}

#[test]
fn isovist_from_room_centre_is_closed_polygon() {
    let lines = notched_room();
    let tree = BspTree::build(&lines, &BspConfig::default(), None).unwrap();
    let region = QtRegion::new(p(0.0, 0.0), p(10.0, 8.0));
    let iso = Isovist::make(&tree, p(5.0, 3.0), &region, 0.0, 0.0);

    let shape = iso.to_shape().unwrap();
    assert!(shape.is_closed());
    assert!(shape.is_polygon());
    assert_eq!(shape.centroid(), p(5.0, 3.0));

    // the whole alcove is in view
    let m = iso.measures().unwrap();
    assert!((m.area - 64.0).abs() < 1e-6);
    assert!(m.occlusivity.abs() < 1e-9);
}

#[test]
fn isovist_from_alcove_is_occluded() {
    let lines = notched_room();
    let tree = BspTree::build(&lines, &BspConfig::default(), None).unwrap();
    let region = QtRegion::new(p(0.0, 0.0), p(10.0, 8.0));
    let iso = Isovist::make(&tree, p(5.0, 7.5), &region, 0.0, 0.0);
    let m = iso.measures().unwrap();
    assert!(m.area < 64.0);
    assert!(m.occlusivity > 0.0);
    assert!(!iso.occlusion_points().is_empty());
}

#[test]
fn isovist_shapes_collect_in_a_shape_map() {
    let lines = notched_room();
    let tree = BspTree::build(&lines, &BspConfig::default(), None).unwrap();
    let region = QtRegion::new(p(0.0, 0.0), p(10.0, 8.0));
    let mut map = ShapeMap::with_region("Isovists", 100, &region);
    for viewpoint in [p(2.0, 2.0), p(8.0, 2.0)] {
        let iso = Isovist::make(&tree, viewpoint, &region, 0.0, 0.0);
        let key = map.make_shape(iso.to_shape().unwrap(), None).unwrap();
        let row = map.index_of(key).unwrap();
        iso.measures().unwrap().write(map.attributes_mut(), key, false);
        assert_eq!(map.key_at(row), Some(key));
    }
    assert_eq!(map.shape_count(), 2);
    assert_eq!(map.attributes().row_count(), 2);
    assert!(map.point_in_poly(p(5.0, 3.0)).is_some());
}
