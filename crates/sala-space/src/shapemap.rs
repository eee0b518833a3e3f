//! Keyed collections of shapes with a spatial index, attributes and graph.
//!
//! A [`ShapeMap`] holds three arrays that are kept in lockstep: the shapes
//! (ordered by key), the attribute rows and, once the map has a graph, the
//! connectors. Connectors refer to neighbours by row index, so every
//! insertion or removal renumbers them.

use std::collections::BTreeSet;

use indexmap::IndexMap;
use smallvec::SmallVec;

use sala_core::geometry::{
    dist_to_line, intersect_line, intersect_region, runion, Line, Point2f, QtRegion, TaggedLine, TOLERANCE_A,
    TOLERANCE_B,
};
use sala_core::{AttributeTable, PixelRef};

use crate::connector::Connector;
use crate::pixelbase::PixelBase;
use crate::shape::SalaShape;

/// Attribute column holding the number of graph neighbours.
pub const CONNECTIVITY_COL: &str = "Connectivity";
/// Attribute column holding line length.
pub const LINE_LENGTH_COL: &str = "Line Length";

const MIN_GRID: i32 = 20;
const MAX_GRID: i32 = 32768;

/// How a shape touches one cell of the spatial index.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CellTag {
    /// An open shape passes through the cell.
    Open,
    /// A polygon side passes through the cell.
    Edge,
    /// The cell lies inside a polygon with no side passing through it.
    Centre,
}

/// One shape's entry in a cell of the spatial index.
#[derive(Clone, Debug, PartialEq)]
pub struct CellShape {
    /// Shape key.
    pub key: i32,
    /// How the shape touches the cell.
    pub tag: CellTag,
    /// Indices of the sides passing through the cell.
    pub sides: SmallVec<[usize; 4]>,
}

/// A named, keyed set of shapes.
#[derive(Clone, Debug, Default)]
pub struct ShapeMap {
    name: String,
    region: QtRegion,
    cols: i32,
    rows: i32,
    tolerance: f64,
    shapes: IndexMap<i32, SalaShape>,
    pixel_shapes: Vec<Vec<CellShape>>,
    attributes: AttributeTable,
    connectors: Vec<Connector>,
    has_graph: bool,
    selection: BTreeSet<i32>,
}

impl PixelBase for ShapeMap {
    fn pixelate(&self, p: Point2f, constrain: bool, _scale: i32) -> PixelRef {
        let n = p.normal_scaled(&self.region);
        let axis = |v: f64, cells: i32| -> i16 {
            if constrain && v <= 0.0 {
                0
            } else if constrain && v >= 1.0 {
                (cells - 1) as i16
            } else {
                (v * f64::from(cells)).floor() as i16
            }
        };
        PixelRef::new(axis(n.x, self.cols), axis(n.y, self.rows))
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

impl ShapeMap {
    /// An empty map.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// An empty map over `region`, with its index sized for `size` shapes.
    pub fn with_region(name: impl Into<String>, size: usize, region: &QtRegion) -> Self {
        let mut map = Self::new(name);
        map.init(size, region);
        map
    }

    /// Resize the spatial index for `size` shapes and grow the region to
    /// cover `r`. Existing shapes must be re-indexed by the caller.
    pub fn init(&mut self, size: usize, r: &QtRegion) {
        let side = ((size as f64).sqrt() as i32).clamp(MIN_GRID, MAX_GRID);
        self.rows = side;
        self.cols = side;
        self.region = if self.pixel_shapes.is_empty() { *r } else { runion(&self.region, r) };
        self.tolerance = self.region.width().max(self.region.height()) * TOLERANCE_A;
        self.pixel_shapes = vec![Vec::new(); (self.cols * self.rows) as usize];
        log::debug!(
            "shape map '{}': index {}x{} over {:?}",
            self.name,
            self.cols,
            self.rows,
            self.region
        );
    }

    /// Map name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Rename the map.
    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    /// Geometric tolerance derived from the region size.
    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    /// Number of shapes.
    pub fn shape_count(&self) -> usize {
        self.shapes.len()
    }

    /// Shapes in key order.
    pub fn shapes(&self) -> impl Iterator<Item = (i32, &SalaShape)> {
        self.shapes.iter().map(|(k, s)| (*k, s))
    }

    /// Shape by key.
    pub fn shape(&self, key: i32) -> Option<&SalaShape> {
        self.shapes.get(&key)
    }

    /// Shape by row index.
    pub fn shape_at(&self, index: usize) -> Option<&SalaShape> {
        self.shapes.get_index(index).map(|(_, s)| s)
    }

    /// Key at row index.
    pub fn key_at(&self, index: usize) -> Option<i32> {
        self.shapes.get_index(index).map(|(k, _)| *k)
    }

    /// Row index of a key.
    pub fn index_of(&self, key: i32) -> Option<usize> {
        self.shapes.get_index_of(&key)
    }

    /// Attribute table, one row per shape in the same order.
    pub fn attributes(&self) -> &AttributeTable {
        &self.attributes
    }

    /// Mutable attribute table.
    pub fn attributes_mut(&mut self) -> &mut AttributeTable {
        &mut self.attributes
    }

    /// Connectors, aligned with the shapes.
    pub fn connectors(&self) -> &[Connector] {
        &self.connectors
    }

    /// Mutable connectors.
    pub fn connectors_mut(&mut self) -> &mut Vec<Connector> {
        &mut self.connectors
    }

    /// Replace all connectors at once. The map then has a graph.
    pub fn set_connectors(&mut self, connectors: Vec<Connector>) {
        self.connectors = connectors;
        self.has_graph = true;
    }

    /// True once connections have been built.
    pub fn has_graph(&self) -> bool {
        self.has_graph
    }

    /// Mark the map as carrying a graph (connectors are padded to match).
    pub fn set_has_graph(&mut self, has_graph: bool) {
        self.has_graph = has_graph;
        if has_graph {
            self.connectors.resize_with(self.shapes.len(), Connector::default);
        }
    }

    /// The key one past the highest in use.
    pub fn next_key(&self) -> i32 {
        self.shapes.last().map_or(0, |(k, _)| k + 1)
    }

    /// Every line shape, tagged with its row index.
    pub fn tagged_lines(&self) -> Vec<TaggedLine> {
        self.shapes
            .values()
            .enumerate()
            .filter(|(_, s)| s.is_line())
            .map(|(i, s)| TaggedLine::new(*s.get_line(), i as i32))
            .collect()
    }

    // ── Shape creation ──────────────────────────────────────────

    /// Add a point. Returns its key.
    pub fn make_point_shape(&mut self, p: Point2f) -> i32 {
        let key = self.next_key();
        self.insert_shape(key, SalaShape::point(p));
        key
    }

    /// Add a line. Returns its key.
    pub fn make_line_shape(&mut self, l: Line) -> i32 {
        let key = self.next_key();
        self.insert_shape(key, SalaShape::line(l));
        key
    }

    /// Add a line under a given key. Fails if the key is taken.
    pub fn make_line_shape_with_ref(&mut self, l: Line, key: i32) -> Option<i32> {
        self.make_shape(SalaShape::line(l), Some(key))
    }

    /// Add a shape from a vertex list: none for no vertices, a point for
    /// one, a line for two, otherwise a polyline (`open`) or polygon.
    pub fn make_poly_shape(&mut self, points: &[Point2f], open: bool) -> Option<i32> {
        let shape = match points {
            [] => return None,
            [p] => SalaShape::point(*p),
            [a, b] => SalaShape::line(Line::new(*a, *b)),
            _ => SalaShape::poly(points.to_vec(), !open),
        };
        self.make_shape(shape, None)
    }

    /// Add a prepared shape, under `key` if given. Fails if the key is taken.
    pub fn make_shape(&mut self, shape: SalaShape, key: Option<i32>) -> Option<i32> {
        let key = match key {
            Some(k) if self.shapes.contains_key(&k) => return None,
            Some(k) => k,
            None => self.next_key(),
        };
        self.insert_shape(key, shape);
        Some(key)
    }

    fn insert_shape(&mut self, key: i32, shape: SalaShape) {
        let bounds = shape.bounding_box();
        let in_bounds = !self.pixel_shapes.is_empty()
            && self.region.contains_touch(bounds.bottom_left)
            && self.region.contains_touch(bounds.top_right);
        if !in_bounds {
            self.init(self.shapes.len() + 1, &bounds);
        }

        let index = match self.shapes.last() {
            Some((last, _)) if *last > key => self.shapes.keys().position(|k| *k > key).unwrap_or(self.shapes.len()),
            _ => self.shapes.len(),
        };
        self.shapes.shift_insert(index, key, shape);
        self.attributes.insert_row(index, key);
        if self.has_graph {
            for c in &mut self.connectors {
                for conn in &mut c.connections {
                    if *conn >= index {
                        *conn += 1;
                    }
                }
            }
            self.connectors.insert(index, Connector::default());
        }

        if in_bounds {
            self.make_poly_pixels(key);
        } else {
            let keys: Vec<i32> = self.shapes.keys().copied().collect();
            for k in keys {
                self.make_poly_pixels(k);
            }
        }
    }

    /// Remove a shape with its attribute row and connector, renumbering
    /// the remaining connections.
    pub fn remove_shape(&mut self, key: i32) -> Option<SalaShape> {
        self.remove_poly_pixels(key);
        let (index, _, shape) = self.shapes.shift_remove_full(&key)?;
        self.attributes.remove_row(key);
        self.selection.remove(&key);

        if self.has_graph && index < self.connectors.len() {
            self.connectors.remove(index);
            let conn_col = self.attributes.column_index(CONNECTIVITY_COL);
            for row in 0..self.connectors.len() {
                let dropped = self.connectors[row].remove_index(index);
                if let (Some(col), true) = (conn_col, dropped > 0) {
                    let connectivity = self.connectors[row].connectivity() as f32;
                    self.attributes.set_value_at(row, col, connectivity);
                }
            }
        }
        Some(shape)
    }

    // ── Spatial index ───────────────────────────────────────────

    #[inline]
    fn cell_index(&self, pix: PixelRef) -> usize {
        (i32::from(pix.x) + i32::from(pix.y) * self.cols) as usize
    }

    fn add_to_cell(&mut self, pix: PixelRef, key: i32, tag: CellTag, side: Option<usize>) {
        let idx = self.cell_index(pix);
        let cell = &mut self.pixel_shapes[idx];
        let pos = match cell.binary_search_by_key(&key, |c| c.key) {
            Ok(pos) => pos,
            Err(pos) => {
                cell.insert(
                    pos,
                    CellShape {
                        key,
                        tag,
                        sides: SmallVec::new(),
                    },
                );
                pos
            }
        };
        if let Some(side) = side {
            cell[pos].sides.push(side);
        }
    }

    fn make_poly_pixels(&mut self, key: i32) {
        let Some(shape) = self.shapes.get(&key) else {
            return;
        };
        if shape.is_point() {
            let pix = self.pixelate(shape.get_point(), true, 1);
            self.add_to_cell(pix, key, CellTag::Open, None);
            return;
        }
        let closed = shape.is_closed();
        let tag = if closed { CellTag::Edge } else { CellTag::Open };
        let edges = shape.edges();
        let polygon = closed.then(|| shape.clone());
        for (side, edge) in edges.iter().enumerate() {
            for pix in self.pixelate_line(edge, 1) {
                self.add_to_cell(pix, key, tag, Some(side));
            }
        }
        // fill cells wholly inside the polygon
        if let Some(poly) = polygon {
            let bounds = poly.bounding_box();
            let lo = self.pixelate(bounds.bottom_left, true, 1);
            let hi = self.pixelate(bounds.top_right, true, 1);
            let cell_w = self.region.width() / f64::from(self.cols);
            let cell_h = self.region.height() / f64::from(self.rows);
            for x in lo.x..=hi.x {
                for y in lo.y..=hi.y {
                    let pix = PixelRef::new(x, y);
                    let idx = self.cell_index(pix);
                    if self.pixel_shapes[idx].iter().any(|c| c.key == key) {
                        continue;
                    }
                    let centre = Point2f::new(
                        self.region.bottom_left.x + (f64::from(x) + 0.5) * cell_w,
                        self.region.bottom_left.y + (f64::from(y) + 0.5) * cell_h,
                    );
                    if poly.contains(centre) {
                        self.add_to_cell(pix, key, CellTag::Centre, None);
                    }
                }
            }
        }
    }

    fn remove_poly_pixels(&mut self, key: i32) {
        let Some(shape) = self.shapes.get(&key) else {
            return;
        };
        let bounds = shape.bounding_box();
        let lo = self.pixelate(bounds.bottom_left, true, 1);
        let hi = self.pixelate(bounds.top_right, true, 1);
        for x in lo.x..=hi.x {
            for y in lo.y..=hi.y {
                let idx = self.cell_index(PixelRef::new(x, y));
                if let Some(cell) = self.pixel_shapes.get_mut(idx) {
                    cell.retain(|c| c.key != key);
                }
            }
        }
    }

    /// Shapes registered in a cell of the spatial index.
    pub fn cell(&self, pix: PixelRef) -> &[CellShape] {
        self.pixel_shapes.get(self.cell_index(pix)).map_or(&[], Vec::as_slice)
    }

    fn keys_near(&self, bounds: &QtRegion) -> BTreeSet<i32> {
        let mut keys = BTreeSet::new();
        if self.pixel_shapes.is_empty() {
            return keys;
        }
        let lo = self.pixelate(bounds.bottom_left, true, 1);
        let hi = self.pixelate(bounds.top_right, true, 1);
        for x in lo.x..=hi.x {
            for y in lo.y..=hi.y {
                keys.extend(self.cell(PixelRef::new(x, y)).iter().map(|c| c.key));
            }
        }
        keys
    }

    // ── Queries ─────────────────────────────────────────────────

    /// Row index of the last polygon containing `p`.
    pub fn point_in_poly(&self, p: Point2f) -> Option<usize> {
        self.point_in_poly_list(p).last().copied()
    }

    /// Row indices of every polygon containing `p`, sorted.
    pub fn point_in_poly_list(&self, p: Point2f) -> Vec<usize> {
        if self.pixel_shapes.is_empty() || !self.region.contains(p) {
            return Vec::new();
        }
        let pix = self.pixelate(p, true, 1);
        let mut found: Vec<usize> = self
            .cell(pix)
            .iter()
            .filter(|c| match c.tag {
                CellTag::Centre => true,
                CellTag::Edge => self.shapes.get(&c.key).is_some_and(|s| s.contains(p)),
                CellTag::Open => false,
            })
            .filter_map(|c| self.index_of(c.key))
            .collect();
        found.sort_unstable();
        found
    }

    /// Row index of the open shape closest to `p`.
    pub fn closest_open_geom(&self, p: Point2f) -> Option<usize> {
        let mut best: Option<(usize, f64)> = None;
        for (i, shape) in self.shapes.values().enumerate() {
            let d = match shape.kind() {
                crate::shape::ShapeKind::Polygon => continue,
                crate::shape::ShapeKind::Point => (shape.get_point() - p).length(),
                _ => shape
                    .edges()
                    .iter()
                    .map(|e| dist_to_line(p, e))
                    .fold(f64::INFINITY, f64::min),
            };
            if best.is_none_or(|(_, bd)| d < bd) {
                best = Some((i, d));
            }
        }
        best.map(|(i, _)| i)
    }

    /// Row index of the line shape closest to `p`.
    pub fn closest_line(&self, p: Point2f) -> Option<usize> {
        self.shapes
            .values()
            .enumerate()
            .filter(|(_, s)| s.is_line())
            .map(|(i, s)| (i, dist_to_line(p, s.get_line())))
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(i, _)| i)
    }

    /// Value of `column` for the shape at `p`: the containing polygon, or
    /// the nearest open shape. `-2.0` if no shape is associated.
    pub fn location_value(&self, p: Point2f, column: usize) -> f64 {
        let index = self.point_in_poly(p).or_else(|| self.closest_open_geom(p));
        match index {
            Some(i) => self.attributes.value_at(i, column).map_or(-1.0, f64::from),
            None => -2.0,
        }
    }

    // ── Connections ─────────────────────────────────────────────

    fn relative_tolerance(&self) -> f64 {
        TOLERANCE_B * self.region.height().max(self.region.width())
    }

    /// Row indices of the line shapes that meet line `key` (self excluded).
    ///
    /// The tolerance is scaled by each candidate's length.
    pub fn get_line_connections(&self, key: i32, tolerance: f64) -> Vec<usize> {
        let Some(shape) = self.shapes.get(&key).filter(|s| s.is_line()) else {
            return Vec::new();
        };
        let l = *shape.get_line();
        let mut candidates = BTreeSet::new();
        for pix in self.pixelate_line(&l, 1) {
            for c in self.cell(pix) {
                if c.tag == CellTag::Open && c.key != key {
                    candidates.insert(c.key);
                }
            }
        }
        let mut connections: Vec<usize> = candidates
            .into_iter()
            .filter_map(|k| {
                let other = self.shapes.get(&k)?;
                if !other.is_line() {
                    return None;
                }
                let line = other.get_line();
                let tol = line.length() * tolerance;
                (intersect_region(&line.region(), &l.region(), tol) && intersect_line(line, &l, tol))
                    .then(|| self.index_of(k))
                    .flatten()
            })
            .collect();
        connections.sort_unstable();
        connections
    }

    /// Row indices of every shape touching shape `key` (self excluded):
    /// crossing sides, or one shape lying inside a polygon.
    pub fn get_shape_connections(&self, key: i32, tolerance: f64) -> Vec<usize> {
        let Some(shape) = self.shapes.get(&key) else {
            return Vec::new();
        };
        let b = shape.bounding_box();
        let pad = Point2f::new(tolerance, tolerance);
        let bounds = QtRegion::new(b.bottom_left - pad, b.top_right + pad);
        let edges = shape.edges();
        let anchor = match shape.kind() {
            crate::shape::ShapeKind::Point => shape.get_point(),
            crate::shape::ShapeKind::Line => shape.get_line().start(),
            _ => shape.points()[0],
        };
        let mut out = Vec::new();
        for k in self.keys_near(&bounds) {
            if k == key {
                continue;
            }
            let Some(other) = self.shapes.get(&k) else {
                continue;
            };
            let other_edges = other.edges();
            let other_anchor = match other.kind() {
                crate::shape::ShapeKind::Point => other.get_point(),
                crate::shape::ShapeKind::Line => other.get_line().start(),
                _ => other.points()[0],
            };
            let crosses = edges.iter().any(|a| {
                other_edges.iter().any(|b| {
                    intersect_region(&a.region(), &b.region(), tolerance) && intersect_line(a, b, tolerance)
                })
            });
            if crosses || other.contains(anchor) || shape.contains(other_anchor) {
                if let Some(i) = self.index_of(k) {
                    out.push(i);
                }
            }
        }
        out.sort_unstable();
        out
    }

    /// Connect row `index` to everything it meets, updating both sides and
    /// the connectivity column. Line graphs also record line length.
    pub fn connect_intersected(&mut self, index: usize, line_graph: bool) -> usize {
        let Some(key) = self.key_at(index) else {
            return 0;
        };
        let conn_col = self.attributes.get_or_insert_column(CONNECTIVITY_COL);
        let len_col = line_graph.then(|| self.attributes.get_or_insert_column(LINE_LENGTH_COL));
        self.set_has_graph(true);
        let tol = self.relative_tolerance();
        let connections = if line_graph {
            self.get_line_connections(key, tol)
        } else {
            self.get_shape_connections(key, tol)
        };
        self.attributes.set_value_at(index, conn_col, connections.len() as f32);
        if let (Some(col), Some(shape)) = (len_col, self.shapes.get(&key)) {
            let length = shape.length() as f32;
            self.attributes.set_value_at(index, col, length);
        }
        for &c in &connections {
            if self.connectors[c].connect(index) {
                let n = self.connectors[c].connections.len() as f32;
                self.attributes.set_value_at(c, conn_col, n);
            }
        }
        let count = connections.len();
        self.connectors[index].connections = connections;
        count
    }

    /// Rebuild the graph from shape-to-shape contact.
    pub fn make_shape_connections(&mut self) {
        let tol = self.relative_tolerance();
        let conn_col = self.attributes.insert_or_reset_column(CONNECTIVITY_COL);
        let keys: Vec<i32> = self.shapes.keys().copied().collect();
        let connectors: Vec<Connector> = keys
            .iter()
            .map(|k| Connector {
                connections: self.get_shape_connections(*k, tol),
                ..Connector::default()
            })
            .collect();
        for (i, c) in connectors.iter().enumerate() {
            self.attributes.set_value_at(i, conn_col, c.connections.len() as f32);
        }
        self.set_connectors(connectors);
        log::debug!("shape map '{}': {} shapes connected", self.name, keys.len());
    }

    // ── Selection ───────────────────────────────────────────────

    /// Select shapes whose bounding box overlaps `r`. Returns true if anything is selected.
    pub fn set_cur_sel(&mut self, r: &QtRegion, add: bool) -> bool {
        if !add {
            self.selection.clear();
        }
        let hits: Vec<i32> = self
            .shapes
            .iter()
            .filter(|(_, s)| {
                let b = s.bounding_box();
                intersect_region(&b, r, 0.0)
                    && (s.is_point() || s.edges().iter().any(|e| {
                        let mut e = *e;
                        e.crop(r)
                    }) || s.contains(r.centre()))
            })
            .map(|(k, _)| *k)
            .collect();
        self.selection.extend(hits);
        !self.selection.is_empty()
    }

    /// Select shapes by key.
    pub fn set_cur_sel_keys(&mut self, keys: &[i32], add: bool) -> bool {
        if !add {
            self.selection.clear();
        }
        self.selection
            .extend(keys.iter().copied().filter(|k| self.shapes.contains_key(k)));
        !self.selection.is_empty()
    }

    /// Clear the selection. Returns true if anything was selected.
    pub fn clear_sel(&mut self) -> bool {
        let had = !self.selection.is_empty();
        self.selection.clear();
        had
    }

    /// Selected keys.
    pub fn selection(&self) -> &BTreeSet<i32> {
        &self.selection
    }

    /// Bounding box of the selection.
    pub fn sel_bounds(&self) -> Option<QtRegion> {
        self.selection
            .iter()
            .filter_map(|k| self.shapes.get(k))
            .map(SalaShape::bounding_box)
            .reduce(|a, b| runion(&a, &b))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(x: f64, y: f64) -> Point2f {
        Point2f::new(x, y)
    }

    fn hash_map() -> ShapeMap {
        let region = QtRegion::new(p(0.0, 0.0), p(3.0, 3.0));
        let mut map = ShapeMap::with_region("lines", 4, &region);
        map.make_line_shape(Line::new(p(1.0, 0.0), p(1.0, 3.0)));
        map.make_line_shape(Line::new(p(2.0, 0.0), p(2.0, 3.0)));
        map.make_line_shape(Line::new(p(0.0, 1.0), p(3.0, 1.0)));
        map.make_line_shape(Line::new(p(0.0, 2.0), p(3.0, 2.0)));
        map
    }

    fn connect_all(map: &mut ShapeMap) {
        for i in 0..map.shape_count() {
            map.connect_intersected(i, true);
        }
    }

    // ── Creation tests ──────────────────────────────────────────

    #[test]
    fn poly_shape_dispatches_on_vertex_count() {
        let mut map = ShapeMap::with_region("m", 0, &QtRegion::new(p(0.0, 0.0), p(10.0, 10.0)));
        assert_eq!(map.make_poly_shape(&[], true), None);
        let a = map.make_poly_shape(&[p(1.0, 1.0)], true).unwrap();
        let b = map.make_poly_shape(&[p(1.0, 1.0), p(2.0, 2.0)], true).unwrap();
        let c = map.make_poly_shape(&[p(1.0, 1.0), p(2.0, 2.0), p(1.0, 3.0)], true).unwrap();
        let d = map.make_poly_shape(&[p(1.0, 1.0), p(2.0, 2.0), p(1.0, 3.0)], false).unwrap();
        assert!(map.shape(a).unwrap().is_point());
        assert!(map.shape(b).unwrap().is_line());
        assert!(map.shape(c).unwrap().is_polyline());
        assert!(map.shape(d).unwrap().is_polygon());
        assert_eq!((a, b, c, d), (0, 1, 2, 3));
    }

    #[test]
    fn shape_outside_region_grows_it() {
        let mut map = ShapeMap::with_region("m", 0, &QtRegion::new(p(0.0, 0.0), p(1.0, 1.0)));
        map.make_line_shape(Line::new(p(0.0, 0.0), p(5.0, 5.0)));
        assert_eq!(map.region().top_right, p(5.0, 5.0));
    }

    #[test]
    fn duplicate_key_is_rejected() {
        let mut map = hash_map();
        assert!(map.make_line_shape_with_ref(Line::new(p(0.0, 0.0), p(1.0, 1.0)), 2).is_none());
        assert_eq!(map.make_line_shape_with_ref(Line::new(p(0.0, 0.0), p(1.0, 1.0)), 10), Some(10));
    }

    // ── Connection tests ────────────────────────────────────────

    #[test]
    fn hash_lines_each_meet_two() {
        let mut map = hash_map();
        connect_all(&mut map);
        for c in map.connectors() {
            assert_eq!(c.connections.len(), 2);
        }
        assert_eq!(map.connectors()[0].connections, vec![2, 3]);
        let col = map.attributes().column_index(CONNECTIVITY_COL).unwrap();
        assert_eq!(map.attributes().value_at(0, col), Some(2.0));
    }

    #[test]
    fn removal_keeps_arrays_aligned() {
        let mut map = hash_map();
        connect_all(&mut map);
        assert!(map.remove_shape(2).is_some());
        assert_eq!(map.shape_count(), 3);
        assert_eq!(map.connectors().len(), 3);
        assert_eq!(map.attributes().row_count(), 3);
        // line 0 now meets only the remaining horizontal line, at index 2
        assert_eq!(map.connectors()[0].connections, vec![2]);
        let col = map.attributes().column_index(CONNECTIVITY_COL).unwrap();
        assert_eq!(map.attributes().value_at(0, col), Some(1.0));
    }

    #[test]
    fn insertion_in_the_middle_renumbers_connections() {
        let mut map = ShapeMap::with_region("m", 0, &QtRegion::new(p(0.0, 0.0), p(3.0, 3.0)));
        map.make_line_shape_with_ref(Line::new(p(1.0, 0.0), p(1.0, 3.0)), 0);
        map.make_line_shape_with_ref(Line::new(p(0.0, 1.0), p(3.0, 1.0)), 5);
        connect_all(&mut map);
        map.make_line_shape_with_ref(Line::new(p(2.0, 0.0), p(2.0, 3.0)), 3);
        assert_eq!(map.index_of(3), Some(1));
        assert_eq!(map.connectors()[0].connections, vec![2]);
        assert_eq!(map.connectors().len(), 3);
        assert_eq!(map.attributes().key_at(1), Some(3));
    }

    #[test]
    fn point_in_polygon_via_index() {
        let mut map = ShapeMap::with_region("m", 0, &QtRegion::new(p(0.0, 0.0), p(10.0, 10.0)));
        let sq = map
            .make_poly_shape(&[p(2.0, 2.0), p(8.0, 2.0), p(8.0, 8.0), p(2.0, 8.0)], false)
            .unwrap();
        let idx = map.index_of(sq);
        assert_eq!(map.point_in_poly(p(5.0, 5.0)), idx);
        assert_eq!(map.point_in_poly(p(2.1, 7.9)), idx);
        assert_eq!(map.point_in_poly(p(9.0, 9.0)), None);
    }

    #[test]
    fn shape_connections_find_contained_point() {
        let mut map = ShapeMap::with_region("m", 0, &QtRegion::new(p(0.0, 0.0), p(10.0, 10.0)));
        map.make_poly_shape(&[p(2.0, 2.0), p(8.0, 2.0), p(8.0, 8.0), p(2.0, 8.0)], false);
        map.make_point_shape(p(5.0, 5.0));
        map.make_point_shape(p(9.0, 9.0));
        map.make_shape_connections();
        assert_eq!(map.connectors()[0].connections, vec![1]);
        assert_eq!(map.connectors()[1].connections, vec![0]);
        assert!(map.connectors()[2].connections.is_empty());
    }

    // ── Selection tests ─────────────────────────────────────────

    #[test]
    fn region_selection() {
        let mut map = hash_map();
        assert!(map.set_cur_sel(&QtRegion::new(p(0.9, 2.5), p(1.1, 2.9)), false));
        assert_eq!(map.selection().iter().copied().collect::<Vec<_>>(), vec![0]);
        assert!(map.clear_sel());
        assert!(!map.clear_sel());
    }
}
