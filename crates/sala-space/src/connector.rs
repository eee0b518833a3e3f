//! Adjacency records for shape graphs.

use std::cmp::Ordering;
use std::collections::BTreeMap;

/// Direction of travel along a segment.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SegDir {
    /// Leaving through the segment's end.
    Forward,
    /// Leaving through the segment's start.
    Back,
}

impl SegDir {
    /// The opposite direction.
    pub fn reversed(self) -> Self {
        match self {
            Self::Forward => Self::Back,
            Self::Back => Self::Forward,
        }
    }

    /// `1` for forward, `-1` for back.
    pub fn signum(self) -> i8 {
        match self {
            Self::Forward => 1,
            Self::Back => -1,
        }
    }
}

/// A neighbouring segment and the end of it that is entered.
///
/// Ordering and equality use the index only: each neighbour appears at
/// most once in a connector.
#[derive(Clone, Copy, Debug)]
pub struct SegmentRef {
    /// End of the neighbour reached.
    pub dir: SegDir,
    /// Row index of the neighbour.
    pub index: usize,
}

impl SegmentRef {
    /// Create a reference.
    pub fn new(dir: SegDir, index: usize) -> Self {
        Self { dir, index }
    }
}

impl PartialEq for SegmentRef {
    fn eq(&self, other: &Self) -> bool {
        self.index == other.index
    }
}

impl Eq for SegmentRef {}

impl PartialOrd for SegmentRef {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for SegmentRef {
    fn cmp(&self, other: &Self) -> Ordering {
        self.index.cmp(&other.index)
    }
}

/// Which connections to count.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConnMode {
    /// Undirected connections (axial and convex graphs).
    All,
    /// Forward and back segment connections.
    SegAll,
    /// Forward segment connections.
    SegForward,
    /// Back segment connections.
    SegBack,
}

/// Connections of one shape-graph node.
///
/// Axial and convex graphs use the undirected `connections` list, sorted
/// by row index. Segment graphs use the directed maps, each weighted by
/// the angular turn needed to enter the neighbour.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Connector {
    /// For segments: row index of the parent axial line.
    pub segment_axialref: Option<usize>,
    /// Undirected neighbours by row index.
    pub connections: Vec<usize>,
    /// Neighbours reached through the segment's start.
    pub back_segconns: BTreeMap<SegmentRef, f32>,
    /// Neighbours reached through the segment's end.
    pub forward_segconns: BTreeMap<SegmentRef, f32>,
}

impl Connector {
    /// An empty connector for a segment of axial line `axialref`.
    pub fn for_segment(axialref: usize) -> Self {
        Self {
            segment_axialref: Some(axialref),
            ..Self::default()
        }
    }

    /// Drop every connection.
    pub fn clear(&mut self) {
        self.connections.clear();
        self.back_segconns.clear();
        self.forward_segconns.clear();
    }

    /// Number of connections of the given kind.
    pub fn count(&self, mode: ConnMode) -> usize {
        match mode {
            ConnMode::All => self.connections.len(),
            ConnMode::SegAll => self.back_segconns.len() + self.forward_segconns.len(),
            ConnMode::SegForward => self.forward_segconns.len(),
            ConnMode::SegBack => self.back_segconns.len(),
        }
    }

    /// Segment connections leaving through `dir`.
    pub fn segconns(&self, dir: SegDir) -> &BTreeMap<SegmentRef, f32> {
        match dir {
            SegDir::Forward => &self.forward_segconns,
            SegDir::Back => &self.back_segconns,
        }
    }

    /// Mutable segment connections leaving through `dir`.
    pub fn segconns_mut(&mut self, dir: SegDir) -> &mut BTreeMap<SegmentRef, f32> {
        match dir {
            SegDir::Forward => &mut self.forward_segconns,
            SegDir::Back => &mut self.back_segconns,
        }
    }

    /// Every segment connection with its exit direction, back first.
    pub fn all_segconns(&self) -> impl Iterator<Item = (SegDir, SegmentRef, f32)> + '_ {
        self.back_segconns
            .iter()
            .map(|(r, w)| (SegDir::Back, *r, *w))
            .chain(self.forward_segconns.iter().map(|(r, w)| (SegDir::Forward, *r, *w)))
    }

    /// Insert into the undirected list, keeping it sorted. Returns false if present.
    pub fn connect(&mut self, index: usize) -> bool {
        match self.connections.binary_search(&index) {
            Ok(_) => false,
            Err(pos) => {
                self.connections.insert(pos, index);
                true
            }
        }
    }

    /// Fix up indices after row `removed` is deleted. Returns how many
    /// connections pointed at the removed row.
    ///
    /// Segment connections are renumbered the same way.
    pub fn remove_index(&mut self, removed: usize) -> usize {
        let before = self.connections.len() + self.count(ConnMode::SegAll);
        self.connections.retain(|&c| c != removed);
        for c in &mut self.connections {
            if *c > removed {
                *c -= 1;
            }
        }
        for map in [&mut self.back_segconns, &mut self.forward_segconns] {
            *map = std::mem::take(map)
                .into_iter()
                .filter(|(r, _)| r.index != removed)
                .map(|(r, w)| {
                    let index = if r.index > removed { r.index - 1 } else { r.index };
                    (SegmentRef::new(r.dir, index), w)
                })
                .collect();
        }
        before - self.connections.len() - self.count(ConnMode::SegAll)
    }

    /// Connectivity as reported in attribute tables. A connector holds
    /// either undirected or segment connections, never both.
    pub fn connectivity(&self) -> usize {
        self.count(ConnMode::All) + self.count(ConnMode::SegAll)
    }
}
