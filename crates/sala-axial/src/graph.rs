//! Line graphs: shape maps whose shapes are lines and whose connectors
//! record which lines meet.

use std::collections::BTreeSet;

use sala_core::geometry::TOLERANCE_B;
use sala_core::{Line, QtRegion};
use sala_space::{Connector, PixelBase, ShapeMap, CONNECTIVITY_COL, LINE_LENGTH_COL};

/// What the lines of a [`ShapeGraph`] stand for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum GraphKind {
    /// Lines of sight; connections are undirected crossings.
    Axial,
    /// Pieces of axial lines between crossings; connections are directed
    /// and weighted by the turn between pieces.
    Segment,
    /// Every line joining mutually visible drawing vertices.
    AllLine,
}

/// A [`ShapeMap`] of lines with a connection graph.
///
/// Axial and all-line graphs may also remember, per line, the drawing
/// vertices the line was cast through ("key vertices"); the fewest-line
/// reduction uses them to keep every vertex covered.
#[derive(Clone, Debug)]
pub struct ShapeGraph {
    map: ShapeMap,
    kind: GraphKind,
    key_vertices: Vec<BTreeSet<usize>>,
    key_vertex_count: usize,
}

impl ShapeGraph {
    /// An empty graph.
    pub fn new(name: impl Into<String>, kind: GraphKind) -> Self {
        Self {
            map: ShapeMap::new(name),
            kind,
            key_vertices: Vec::new(),
            key_vertex_count: 0,
        }
    }

    /// An empty graph over `region`, indexed for about `size` lines.
    pub fn with_region(name: impl Into<String>, kind: GraphKind, size: usize, region: &QtRegion) -> Self {
        Self {
            map: ShapeMap::with_region(name, size, region),
            ..Self::new("", kind)
        }
    }

    /// An axial graph over `lines`, connected.
    pub fn axial_from_lines(name: impl Into<String>, lines: &[Line], region: &QtRegion) -> Self {
        let mut graph = Self::with_region(name, GraphKind::Axial, lines.len(), region);
        graph.init_axial_attributes();
        for l in lines {
            graph.map.make_line_shape(*l);
        }
        graph.make_connections(Vec::new());
        graph
    }

    /// Map name.
    pub fn name(&self) -> &str {
        self.map.name()
    }

    /// What the lines stand for.
    pub fn kind(&self) -> GraphKind {
        self.kind
    }

    /// The underlying shape map.
    pub fn map(&self) -> &ShapeMap {
        &self.map
    }

    /// Mutable access to the underlying shape map.
    pub fn map_mut(&mut self) -> &mut ShapeMap {
        &mut self.map
    }

    /// Give up the graph, keeping the shape map.
    pub fn into_map(self) -> ShapeMap {
        self.map
    }

    /// Number of lines.
    pub fn line_count(&self) -> usize {
        self.map.shape_count()
    }

    /// Connectors, one per line in row order.
    pub fn connectors(&self) -> &[Connector] {
        self.map.connectors()
    }

    /// Line at row `index`, if that shape is a line.
    pub fn line_at(&self, index: usize) -> Option<Line> {
        self.map.shape_at(index).filter(|s| s.is_line()).map(|s| *s.get_line())
    }

    /// Key vertices per line, when the graph was built with them.
    pub fn key_vertices(&self) -> &[BTreeSet<usize>] {
        &self.key_vertices
    }

    /// Number of drawing vertices the key vertex ids range over.
    pub fn key_vertex_count(&self) -> usize {
        self.key_vertex_count
    }

    pub(crate) fn set_key_vertex_count(&mut self, count: usize) {
        self.key_vertex_count = count;
    }

    /// Add the connectivity and length columns used by axial graphs.
    pub fn init_axial_attributes(&mut self) {
        let table = self.map.attributes_mut();
        table.get_or_insert_column(CONNECTIVITY_COL);
        table.get_or_insert_column(LINE_LENGTH_COL);
    }

    /// Rebuild the undirected graph from line crossings and write each
    /// line's connectivity and length.
    ///
    /// `key_vertices` is either empty or holds one set per line in row order.
    pub fn make_connections(&mut self, key_vertices: Vec<BTreeSet<usize>>) {
        let region = self.map.region();
        let tolerance = TOLERANCE_B * region.width().max(region.height());
        let conn_col = self.map.attributes_mut().get_or_insert_column(CONNECTIVITY_COL);
        let len_col = self.map.attributes_mut().get_or_insert_column(LINE_LENGTH_COL);

        let mut connectors = Vec::with_capacity(self.map.shape_count());
        let mut rows = Vec::with_capacity(self.map.shape_count());
        for (key, shape) in self.map.shapes() {
            let connections = self.map.get_line_connections(key, tolerance);
            rows.push((connections.len() as f32, shape.length() as f32));
            connectors.push(Connector {
                connections,
                ..Connector::default()
            });
        }
        let table = self.map.attributes_mut();
        for (row, (connectivity, length)) in rows.into_iter().enumerate() {
            table.set_value_at(row, conn_col, connectivity);
            table.set_value_at(row, len_col, length);
        }
        let links: usize = connectors.iter().map(|c| c.connections.len()).sum();
        self.map.set_connectors(connectors);

        if key_vertices.len() == self.map.shape_count() {
            self.key_vertices = key_vertices;
        } else {
            if !key_vertices.is_empty() {
                log::warn!(
                    "shape graph '{}': {} key vertex sets for {} lines, ignored",
                    self.name(),
                    key_vertices.len(),
                    self.map.shape_count()
                );
            }
            self.key_vertices.clear();
        }
        log::debug!(
            "shape graph '{}': {} lines, {} connections",
            self.name(),
            self.map.shape_count(),
            links / 2
        );
    }
}
