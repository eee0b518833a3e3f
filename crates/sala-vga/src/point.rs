//! A single cell of a point map.

use smallvec::SmallVec;

use sala_core::{Line, PixelRef, Point2f};

use crate::node::Node;

/// Cell state bits.
pub mod state {
    /// Open, not part of the graph.
    pub const EMPTY: u16 = 0x0001;
    /// Part of the graph.
    pub const FILLED: u16 = 0x0002;
    /// A drawing line passes through the cell.
    pub const BLOCKED: u16 = 0x0004;
    /// Filled by a semi fill; only even cells seed searches.
    pub const CONTEXT_FILLED: u16 = 0x0008;
    /// Currently selected.
    pub const SELECTED: u16 = 0x0010;
    /// Borders a drawing line.
    pub const EDGE: u16 = 0x0020;
    /// Linked to another cell by a merge.
    pub const MERGED: u16 = 0x0040;
    /// Filled by an augment fill.
    pub const AUGMENTED: u16 = 0x8000;
}

/// Bits of [`Point::grid_connections`]: which of the eight neighbours are visible.
pub mod grid {
    /// East.
    pub const E: u8 = 0x01;
    /// North-east.
    pub const NE: u8 = 0x02;
    /// North.
    pub const N: u8 = 0x04;
    /// North-west.
    pub const NW: u8 = 0x08;
    /// West.
    pub const W: u8 = 0x10;
    /// South-west.
    pub const SW: u8 = 0x20;
    /// South.
    pub const S: u8 = 0x40;
    /// South-east.
    pub const SE: u8 = 0x80;
}

/// A grid cell: state flags, optional visibility node and the drawing
/// lines clipped to it while lines are blocked.
#[derive(Clone, Debug)]
pub struct Point {
    pub(crate) state: u16,
    pub(crate) undo_tag: u32,
    pub(crate) grid_connections: u8,
    pub(crate) process_flag: u8,
    pub(crate) node: Option<Box<Node>>,
    pub(crate) location: Point2f,
    pub(crate) merge: PixelRef,
    pub(crate) lines: SmallVec<[(i32, Line); 2]>,
}

impl Default for Point {
    fn default() -> Self {
        Self {
            state: state::EMPTY,
            undo_tag: 0,
            grid_connections: 0,
            process_flag: 0,
            node: None,
            location: Point2f::default(),
            merge: PixelRef::NONE,
            lines: SmallVec::new(),
        }
    }
}

impl Point {
    pub(crate) fn at(location: Point2f) -> Self {
        Self {
            location,
            ..Self::default()
        }
    }

    /// Raw state bits (see [`state`]).
    pub fn state(&self) -> u16 {
        self.state
    }

    /// True if the cell is open and unfilled.
    pub fn is_empty(&self) -> bool {
        self.state & state::EMPTY != 0
    }

    /// True if the cell is part of the graph.
    pub fn is_filled(&self) -> bool {
        self.state & state::FILLED != 0
    }

    /// True if a drawing line crosses the cell.
    pub fn is_blocked(&self) -> bool {
        self.state & state::BLOCKED != 0
    }

    /// True for cells made by a semi fill.
    pub fn is_context_filled(&self) -> bool {
        self.state & state::CONTEXT_FILLED != 0
    }

    /// True for cells bordering a drawing line.
    pub fn is_edge(&self) -> bool {
        self.state & state::EDGE != 0
    }

    /// True while selected.
    pub fn is_selected(&self) -> bool {
        self.state & state::SELECTED != 0
    }

    /// True for cells made by an augment fill.
    pub fn is_augmented(&self) -> bool {
        self.state & state::AUGMENTED != 0
    }

    /// The merge partner, if any.
    pub fn merge_pixel(&self) -> Option<PixelRef> {
        self.merge.is_some().then_some(self.merge)
    }

    /// The visibility node, present once the graph has been built.
    pub fn node(&self) -> Option<&Node> {
        self.node.as_deref()
    }

    /// Centre of the cell in drawing coordinates.
    pub fn location(&self) -> Point2f {
        self.location
    }

    /// Visible immediate neighbours (see [`grid`]).
    pub fn grid_connections(&self) -> u8 {
        self.grid_connections
    }

    /// Drawing lines clipped to this cell (only while lines are blocked).
    pub fn lines(&self) -> impl Iterator<Item = &Line> {
        self.lines.iter().map(|(_, l)| l)
    }

    /// Replace the state, keeping the blocked bit, and stamp the undo tag.
    pub(crate) fn set(&mut self, new_state: u16, undo_tag: u32) {
        self.state = new_state | (self.state & state::BLOCKED);
        self.undo_tag = undo_tag;
    }

    pub(crate) fn set_blocked(&mut self, blocked: bool) {
        if blocked {
            self.state |= state::BLOCKED;
        } else {
            self.state &= !state::BLOCKED;
        }
    }

    pub(crate) fn set_edge(&mut self) {
        self.state |= state::EDGE;
    }

    /// Add a keyed line, replacing any line already stored under `key`.
    pub(crate) fn insert_line(&mut self, key: i32, line: Line) {
        match self.lines.binary_search_by_key(&key, |(k, _)| *k) {
            Ok(i) => self.lines[i].1 = line,
            Err(i) => self.lines.insert(i, (key, line)),
        }
    }

    pub(crate) fn detach_merge(&mut self) {
        self.merge = PixelRef::NONE;
        self.state &= !state::MERGED;
    }
}
