//! The point map: a regular grid of cells laid over a line drawing.
//!
//! Cell `(0, 0)` is centred on the grid's bottom-left point, so cell
//! boundaries (not centres) sit half a spacing either side of every grid
//! coordinate. The bottom-left point is aligned to multiples of the spacing
//! measured from the absolute origin, which keeps cell indices congruent
//! between maps laid over overlapping drawings.
//!
//! Cells start empty. Flood fills (`make_points`), single cell edits
//! (`fill_point`) and line fills mark them filled; every such change is
//! stamped with the undo counter so `undo_points` can revert the last
//! batch. Once the visibility graph is built (see `spark_graph`) the
//! filled cells carry a [`Node`](crate::Node) and an attribute row keyed by
//! their packed [`PixelRef`].

use std::collections::BTreeSet;

use sala_core::geometry::{intersect_line, intersect_region, runion, Line, Point2f, QtRegion};
use sala_core::{AttributeTable, Communicator, CoreError, PixelRef, PixelRefPair, Progress};
use sala_space::PixelBase;

use crate::config::{FillType, GridConfig};
use crate::error::PointMapError;
use crate::point::{state, Point};

/// Tolerance, in cells, used when assigning drawing lines to cells.
pub(crate) const LINE_TOUCH_TOL: f64 = 1e-10;

/// Outcome bits of a single flood-fill step.
mod step {
    pub const OFF_GRID: u8 = 1;
    pub const ALREADY_FILLED: u8 = 2;
    pub const BLOCKED: u8 = 4;
    pub const ADDED: u8 = 8;
}

/// A visibility grid over a line drawing.
#[derive(Clone, Debug)]
pub struct PointMap {
    name: String,
    drawing_region: QtRegion,
    drawing_lines: Vec<Line>,

    pub(crate) spacing: f64,
    offset: Point2f,
    bottom_left: Point2f,
    region: QtRegion,
    pub(crate) cols: i32,
    pub(crate) rows: i32,
    pub(crate) points: Vec<Point>,

    pub(crate) filled_count: usize,
    undo_counter: u32,
    initialised: bool,
    blocked_lines: bool,
    pub(crate) processed: bool,
    pub(crate) boundary_graph: bool,
    pub(crate) has_isovist_analysis: bool,

    pub(crate) selection: BTreeSet<PixelRef>,
    sel_bounds: QtRegion,
    pub(crate) merge_lines: Vec<PixelRefPair>,

    pub(crate) attributes: AttributeTable,
}

impl PixelBase for PointMap {
    fn pixelate(&self, p: Point2f, constrain: bool, scale: i32) -> PixelRef {
        let cell = self.spacing / f64::from(scale);
        let mut x = ((p.x - self.bottom_left.x + self.spacing / 2.0) / cell).floor() as i32;
        let mut y = ((p.y - self.bottom_left.y + self.spacing / 2.0) / cell).floor() as i32;
        if constrain {
            x = x.clamp(0, self.cols * scale - 1);
            y = y.clamp(0, self.rows * scale - 1);
        }
        // cells too far out for a PixelRef must not wrap back onto the grid
        match (i16::try_from(x), i16::try_from(y)) {
            (Ok(x), Ok(y)) => PixelRef::new(x, y),
            _ => PixelRef::NONE,
        }
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

impl PointMap {
    /// An uninitialised map over a drawing. Call [`set_grid`](Self::set_grid)
    /// before anything else.
    pub fn new(name: impl Into<String>, drawing_region: QtRegion, drawing_lines: Vec<Line>) -> Self {
        Self {
            name: name.into(),
            drawing_region,
            drawing_lines,
            spacing: 0.0,
            offset: Point2f::default(),
            bottom_left: Point2f::default(),
            region: QtRegion::default(),
            cols: 0,
            rows: 0,
            points: Vec::new(),
            filled_count: 0,
            undo_counter: 0,
            initialised: false,
            blocked_lines: false,
            processed: false,
            boundary_graph: false,
            has_isovist_analysis: false,
            selection: BTreeSet::new(),
            sel_bounds: QtRegion::default(),
            merge_lines: Vec::new(),
            attributes: AttributeTable::new(),
        }
    }

    // ── Accessors ──────────────────────────────────────────────────

    /// Map name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Rename the map.
    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    /// Bounds of the underlying drawing.
    pub fn drawing_region(&self) -> &QtRegion {
        &self.drawing_region
    }

    /// The drawing lines that block sight and movement.
    pub fn drawing_lines(&self) -> &[Line] {
        &self.drawing_lines
    }

    /// Distance between cell centres.
    pub fn spacing(&self) -> f64 {
        self.spacing
    }

    /// Internal offset of the grid origin from the drawing's bottom-left corner.
    pub fn offset(&self) -> Point2f {
        self.offset
    }

    /// Centre of cell `(0, 0)`.
    pub fn bottom_left(&self) -> Point2f {
        self.bottom_left
    }

    /// True once a grid has been laid out.
    pub fn is_initialised(&self) -> bool {
        self.initialised
    }

    /// True once the visibility graph has been built.
    pub fn is_processed(&self) -> bool {
        self.processed
    }

    /// True if the graph was built over edge cells only.
    pub fn is_boundary_graph(&self) -> bool {
        self.boundary_graph
    }

    /// True while drawing lines are assigned to cells.
    pub fn is_blocked(&self) -> bool {
        self.blocked_lines
    }

    /// True once an isovist analysis has filled the occlusion bins.
    pub fn has_isovist_analysis(&self) -> bool {
        self.has_isovist_analysis
    }

    /// Number of filled cells.
    pub fn filled_count(&self) -> usize {
        self.filled_count
    }

    /// The cell at `pix`, or `None` off the grid.
    pub fn point(&self, pix: PixelRef) -> Option<&Point> {
        self.includes(pix).then(|| self.pt(pix))
    }

    /// Every cell with its reference, column by column.
    pub fn points(&self) -> impl Iterator<Item = (PixelRef, &Point)> + '_ {
        let rows = self.rows as usize;
        self.points
            .iter()
            .enumerate()
            .map(move |(i, p)| (PixelRef::new((i / rows) as i16, (i % rows) as i16), p))
    }

    /// References of the filled cells, column by column.
    pub fn filled_pixels(&self) -> Vec<PixelRef> {
        self.points()
            .filter(|(_, p)| p.is_filled())
            .map(|(pix, _)| pix)
            .collect()
    }

    /// Per-cell analysis results, keyed by packed [`PixelRef`].
    pub fn attributes(&self) -> &AttributeTable {
        &self.attributes
    }

    /// Mutable access to the analysis results.
    pub fn attributes_mut(&mut self) -> &mut AttributeTable {
        &mut self.attributes
    }

    #[inline]
    pub(crate) fn index(&self, pix: PixelRef) -> usize {
        pix.x as usize * self.rows as usize + pix.y as usize
    }

    #[inline]
    pub(crate) fn pt(&self, pix: PixelRef) -> &Point {
        &self.points[self.index(pix)]
    }

    #[inline]
    pub(crate) fn pt_mut(&mut self, pix: PixelRef) -> &mut Point {
        let i = self.index(pix);
        &mut self.points[i]
    }

    pub(crate) fn each_pixel(&self) -> impl Iterator<Item = PixelRef> {
        let rows = self.rows as i16;
        (0..self.cols as i16).flat_map(move |x| (0..rows).map(move |y| PixelRef::new(x, y)))
    }

    // ── Grid layout ────────────────────────────────────────────────

    /// Lay a fresh grid over the drawing, discarding every cell, merge,
    /// node and analysis result.
    pub fn set_grid(&mut self, config: &GridConfig) -> Result<(), PointMapError> {
        config.validate()?;
        let s = config.spacing;
        let dr = self.drawing_region;
        if !(dr.width() > 0.0 || dr.height() > 0.0) {
            return Err(CoreError::EmptyRegion.into());
        }

        let align = |v: f64| {
            let mut off = v % s;
            if off < s / 2.0 {
                off += s;
            }
            if off > s / 2.0 {
                off -= s;
            }
            off
        };
        let xoff = align(dr.bottom_left.x + config.offset.x);
        let yoff = align(dr.bottom_left.y + config.offset.y);

        let cols = ((xoff + dr.width()) / s + 0.5).floor() + 1.0;
        let rows = ((yoff + dr.height()) / s + 0.5).floor() + 1.0;
        if cols > f64::from(i16::MAX) || rows > f64::from(i16::MAX) {
            return Err(CoreError::InvalidSpacing { spacing: s }.into());
        }

        self.lay_out(s, Point2f::new(-xoff, -yoff), cols as i32, rows as i32);
        log::debug!(
            "point map '{}': {}x{} grid at spacing {}",
            self.name,
            self.cols,
            self.rows,
            s
        );
        Ok(())
    }

    /// Reset to an empty grid of `cols` x `rows` cells whose origin is the
    /// drawing's bottom-left shifted by `offset`.
    pub(crate) fn lay_out(&mut self, s: f64, offset: Point2f, cols: i32, rows: i32) {
        self.spacing = s;
        self.offset = offset;
        self.cols = cols;
        self.rows = rows;
        self.bottom_left = self.drawing_region.bottom_left + offset;
        let half = s / 2.0;
        self.region = QtRegion::new(
            Point2f::new(self.bottom_left.x - half, self.bottom_left.y - half),
            Point2f::new(
                self.bottom_left.x + f64::from(self.cols - 1) * s + half,
                self.bottom_left.y + f64::from(self.rows - 1) * s + half,
            ),
        );

        self.points = self
            .each_pixel()
            .map(|pix| Point::at(self.depixelate(pix, 1.0)))
            .collect();
        self.filled_count = 0;
        self.undo_counter = 0;
        self.initialised = true;
        self.blocked_lines = false;
        self.processed = false;
        self.boundary_graph = false;
        self.has_isovist_analysis = false;
        self.selection.clear();
        self.merge_lines.clear();
        self.attributes = AttributeTable::new();
    }

    /// Centre of `pix`, or of a sub-cell when `scale` > 1.
    pub fn depixelate(&self, pix: PixelRef, scale: f64) -> Point2f {
        let step = self.spacing * scale;
        Point2f::new(
            self.bottom_left.x + step * f64::from(pix.x),
            self.bottom_left.y + step * f64::from(pix.y),
        )
    }

    /// Bounds of `pix`, grown by `border` cells on every side.
    pub fn regionate(&self, pix: PixelRef, border: f64) -> QtRegion {
        let s = self.spacing;
        let (x, y) = (f64::from(pix.x), f64::from(pix.y));
        QtRegion::new(
            Point2f::new(
                self.bottom_left.x + s * (x - 0.5 - border),
                self.bottom_left.y + s * (y - 0.5 - border),
            ),
            Point2f::new(
                self.bottom_left.x + s * (x + 0.5 + border),
                self.bottom_left.y + s * (y + 0.5 + border),
            ),
        )
    }

    fn require_grid(&self) -> Result<(), PointMapError> {
        if self.initialised {
            Ok(())
        } else {
            Err(PointMapError::GridNotSet)
        }
    }

    pub(crate) fn require_graph(&self) -> Result<(), PointMapError> {
        if self.processed {
            Ok(())
        } else {
            Err(PointMapError::NotProcessed)
        }
    }

    pub(crate) fn require_selection(&self) -> Result<(), PointMapError> {
        self.require_graph()?;
        if self.selection.is_empty() {
            Err(PointMapError::NoSelection)
        } else {
            Ok(())
        }
    }

    // ── Filling ────────────────────────────────────────────────────

    /// Fill (`add`) or empty a single cell under `p`. Returns false if `p`
    /// is off the grid.
    pub fn fill_point(&mut self, p: Point2f, add: bool) -> bool {
        let pix = self.pixelate(p, false, 1);
        if !self.includes(pix) {
            return false;
        }
        let filled = self.pt(pix).is_filled();
        if add && !filled {
            self.filled_count += 1;
            self.undo_counter += 1;
            let tag = self.undo_counter;
            self.pt_mut(pix).set(state::FILLED, tag);
        } else if !add && filled {
            self.filled_count -= 1;
            self.undo_counter += 1;
            let tag = self.undo_counter;
            self.pt_mut(pix).set(state::EMPTY, tag);
        }
        true
    }

    /// Fill every empty cell the drawing lines pass through, as one undo step.
    pub fn fill_lines(&mut self) -> Result<(), PointMapError> {
        self.require_grid()?;
        self.undo_counter += 1;
        let lines = std::mem::take(&mut self.drawing_lines);
        for l in &lines {
            self.fill_line(l);
        }
        self.drawing_lines = lines;
        Ok(())
    }

    /// Fill every empty cell `l` passes through, tagged with the current undo step.
    pub fn fill_line(&mut self, l: &Line) {
        let tag = self.undo_counter;
        for pix in self.pixelate_line(l, 1) {
            let pt = self.pt_mut(pix);
            if pt.is_empty() {
                pt.set(state::FILLED, tag);
                self.filled_count += 1;
            }
        }
    }

    /// Assign every drawing line to the cells it touches, clipped to each
    /// cell, and flag those cells blocked. Does nothing if already blocked.
    pub fn block_lines(&mut self) -> Result<(), PointMapError> {
        self.require_grid()?;
        if self.blocked_lines {
            return Ok(());
        }
        self.unblock_lines(true);

        let mut hits = Vec::new();
        for (key, l) in self.drawing_lines.iter().enumerate() {
            for pix in self.pixelate_line_touching(l, LINE_TOUCH_TOL) {
                hits.push((self.index(pix), key as i32, *l));
            }
        }
        for (i, key, l) in hits {
            self.points[i].insert_line(key, l);
            self.points[i].set_blocked(true);
        }

        for pix in self.each_pixel() {
            let viewport = self.regionate(pix, LINE_TOUCH_TOL);
            let i = self.index(pix);
            // the touching walk is generous; drop lines that miss the cell
            self.points[i].lines.retain(|(_, l)| l.crop(&viewport));
        }

        self.blocked_lines = true;
        Ok(())
    }

    /// Drop the per-cell line lists, and the blocked flags too when
    /// `clear_blocked` is set.
    pub fn unblock_lines(&mut self, clear_blocked: bool) {
        for pt in &mut self.points {
            pt.lines.clear();
            if clear_blocked {
                pt.set_blocked(false);
            }
        }
        self.blocked_lines = false;
    }

    /// Flood fill outwards from `seed` through open cells.
    ///
    /// The fill moves to all eight neighbours, stopping where the step
    /// between two cell centres crosses a drawing line. Cells where such a
    /// step was refused, or that contain a line, are flagged as edges. On
    /// cancellation the partial fill is undone.
    pub fn make_points(
        &mut self,
        seed: Point2f,
        fill: FillType,
        comm: Option<&mut dyn Communicator>,
    ) -> Result<usize, PointMapError> {
        self.require_grid()?;
        let mut progress = Progress::new(comm);
        progress.start((self.rows * self.cols) as usize);

        let seed_pix = self.pixelate(seed, false, 1);
        if !self.includes(seed_pix) || self.is_fill_stop(seed_pix) {
            return Err(PointMapError::SeedNotFillable { pixel: seed_pix });
        }
        self.block_lines()?;

        self.undo_counter += 1;
        let fill_state = fill.state();
        let tag = self.undo_counter;
        self.pt_mut(seed_pix).set(fill_state, tag);
        self.filled_count += 1;

        let mut current = vec![seed_pix];
        let mut next = Vec::new();
        let mut added = 0usize;
        while let Some(curs) = current.pop() {
            let mut result = 0u8;
            for to in [
                curs.up(),
                curs.down(),
                curs.left(),
                curs.right(),
                curs.up().left(),
                curs.up().right(),
                curs.down().left(),
                curs.down().right(),
            ] {
                result |= self.expand(curs, to, &mut next, fill_state);
            }
            if result & step::BLOCKED != 0 || self.pt(curs).is_blocked() {
                self.pt_mut(curs).set_edge();
            }
            if current.is_empty() {
                std::mem::swap(&mut current, &mut next);
            }
            added += 1;
            if let Err(e) = progress.tick(added) {
                self.undo_points();
                return Err(e.into());
            }
        }

        log::info!(
            "point map '{}': fill from {} reached {} cells ({} filled in total)",
            self.name,
            seed_pix,
            added,
            self.filled_count
        );
        Ok(added)
    }

    fn is_fill_stop(&self, pix: PixelRef) -> bool {
        self.pt(pix).state & (state::FILLED | state::AUGMENTED) != 0
    }

    fn expand(&mut self, from: PixelRef, to: PixelRef, list: &mut Vec<PixelRef>, fill_state: u16) -> u8 {
        if !self.includes(to) {
            return step::OFF_GRID;
        }
        if self.is_fill_stop(to) {
            return step::ALREADY_FILLED;
        }
        let walk = Line::new(self.depixelate(from, 1.0), self.depixelate(to, 1.0));
        let tol = self.spacing * 1e-10;
        let crosses = |pt: &Point| {
            pt.lines()
                .any(|l| intersect_region(&walk.region(), &l.region(), tol) && intersect_line(&walk, l, tol))
        };
        if crosses(self.pt(from)) || crosses(self.pt(to)) {
            return step::BLOCKED;
        }
        let tag = self.undo_counter;
        self.pt_mut(to).set(fill_state, tag);
        self.filled_count += 1;
        list.push(to);
        step::ADDED
    }

    // ── Clearing and undo ──────────────────────────────────────────

    /// Empty the selected cells, or every filled cell when nothing is
    /// selected. Returns false if the map has no filled cells.
    pub fn clear_points(&mut self) -> bool {
        if self.filled_count == 0 {
            return false;
        }
        self.undo_counter += 1;
        let tag = self.undo_counter;
        if self.selection.is_empty() {
            for pt in &mut self.points {
                if pt.is_filled() {
                    pt.set(state::EMPTY, tag);
                }
                pt.detach_merge();
            }
            self.filled_count = 0;
            self.merge_lines.clear();
        } else {
            let selected: Vec<PixelRef> = self.selection.iter().copied().collect();
            for pix in selected {
                if !self.pt(pix).is_filled() {
                    continue;
                }
                self.pt_mut(pix).set(state::EMPTY, tag);
                if let Some(partner) = self.pt(pix).merge_pixel() {
                    self.remove_merge_line(pix, partner);
                    self.pt_mut(partner).detach_merge();
                    self.pt_mut(pix).detach_merge();
                }
                self.filled_count = self.filled_count.saturating_sub(1);
            }
        }
        self.clear_sel();
        true
    }

    /// Revert the most recent fill or clear step. Returns false when there
    /// is nothing to undo.
    pub fn undo_points(&mut self) -> bool {
        if self.undo_counter == 0 {
            return false;
        }
        let tag = self.undo_counter;
        for pt in &mut self.points {
            if pt.undo_tag != tag {
                continue;
            }
            if pt.state & (state::FILLED | state::AUGMENTED) != 0 {
                pt.state = (pt.state & !(state::FILLED | state::AUGMENTED | state::CONTEXT_FILLED)) | state::EMPTY;
                pt.undo_tag = 0;
                self.filled_count -= 1;
            } else if pt.state & state::EMPTY != 0 {
                pt.state = (pt.state & !state::EMPTY) | state::FILLED;
                pt.undo_tag = 0;
                self.filled_count += 1;
            }
        }
        self.undo_counter -= 1;
        true
    }

    /// True if an undo step is available (never once the graph is built).
    pub fn can_undo(&self) -> bool {
        !self.processed && self.undo_counter != 0
    }

    // ── Selection ──────────────────────────────────────────────────

    /// The selected cells, in reference order.
    pub fn selection(&self) -> &BTreeSet<PixelRef> {
        &self.selection
    }

    /// Bounds of the region(s) used to make the current selection.
    pub fn selection_bounds(&self) -> &QtRegion {
        &self.sel_bounds
    }

    /// Deselect everything. Returns false if nothing was selected.
    pub fn clear_sel(&mut self) -> bool {
        if self.selection.is_empty() {
            return false;
        }
        for pix in std::mem::take(&mut self.selection) {
            self.pt_mut(pix).state &= !state::SELECTED;
        }
        true
    }

    /// Select the filled cells inside `r`, optionally adding to the current
    /// selection. Returns the region actually covered, from the centre of
    /// the first selected column and row to the centre of the last.
    pub fn set_cur_sel_region(&mut self, r: &QtRegion, add: bool) -> Result<QtRegion, PointMapError> {
        self.require_grid()?;
        let add = if self.selection.is_empty() {
            false
        } else {
            if !add {
                self.clear_sel();
            }
            add
        };
        let s_bl = self.pixelate(r.bottom_left, true, 1);
        let s_tr = self.pixelate(r.top_right, true, 1);
        self.sel_bounds = if add { runion(&self.sel_bounds, r) } else { *r };

        for x in s_bl.x..=s_tr.x {
            for y in s_bl.y..=s_tr.y {
                let pix = PixelRef::new(x, y);
                let pt = self.pt_mut(pix);
                if pt.is_filled() && !pt.is_selected() {
                    pt.state |= state::SELECTED;
                    self.selection.insert(pix);
                }
            }
        }
        Ok(QtRegion::new(self.depixelate(s_bl, 1.0), self.depixelate(s_tr, 1.0)))
    }

    /// Select cells by reference. Only cells with an analysis row are taken.
    pub fn set_cur_sel_pixels(&mut self, pixels: &[PixelRef], add: bool) {
        if !add {
            self.clear_sel();
        }
        for &pix in pixels {
            if self.includes(pix) && self.attributes.has_row(pix.packed()) {
                self.pt_mut(pix).state |= state::SELECTED;
                self.selection.insert(pix);
            }
        }
    }

    // ── Merging ────────────────────────────────────────────────────

    /// Link `a` and `b` as merge partners, detaching any previous partner of
    /// either. Merging a cell with itself removes its link.
    ///
    /// Both cells must be on the grid and filled.
    pub fn merge_pixels(&mut self, a: PixelRef, b: PixelRef) -> Result<(), PointMapError> {
        for pixel in [a, b] {
            if !self.point(pixel).is_some_and(Point::is_filled) {
                return Err(PointMapError::CellNotFilled { pixel });
            }
        }
        self.link_merge(a, b);
        Ok(())
    }

    fn link_merge(&mut self, a: PixelRef, b: PixelRef) {
        if a == b {
            if let Some(c) = self.pt(a).merge_pixel() {
                self.remove_merge_line(a, c);
                self.pt_mut(c).detach_merge();
                self.pt_mut(a).detach_merge();
            }
            return;
        }
        if self.pt(a).merge == b {
            return;
        }
        for end in [a, b] {
            if let Some(c) = self.pt(end).merge_pixel() {
                self.remove_merge_line(end, c);
                self.pt_mut(c).detach_merge();
            }
        }
        for (from, to) in [(a, b), (b, a)] {
            let pt = self.pt_mut(from);
            pt.merge = to;
            pt.state |= state::MERGED;
        }
        self.merge_lines.push(PixelRefPair::new(a, b));
    }

    fn remove_merge_line(&mut self, a: PixelRef, b: PixelRef) {
        let pair = PixelRefPair::new(a, b);
        if let Some(i) = self.merge_lines.iter().position(|p| *p == pair) {
            self.merge_lines.remove(i);
        }
    }

    /// Merge every selected cell with the cell at the same relative position
    /// from `p`, taking the top-left of the selection bounds as the anchor.
    /// Targets that are off the grid or unfilled are skipped. Clears the
    /// selection.
    pub fn merge_points(&mut self, p: Point2f) -> Result<(), PointMapError> {
        if self.selection.is_empty() {
            return Err(PointMapError::NoSelection);
        }
        let bl = self.pixelate(self.sel_bounds.bottom_left, true, 1);
        let tr = self.pixelate(self.sel_bounds.top_right, true, 1);
        let offset = self.pixelate(p, true, 1) - PixelRef::new(tr.x, bl.y);
        let selected: Vec<PixelRef> = self.selection.iter().copied().collect();
        for a in selected {
            let b = a + offset;
            if self.includes(b) && self.pt(b).is_filled() {
                self.link_merge(a, b);
            }
        }
        self.clear_sel();
        Ok(())
    }

    /// Remove the merge links of every selected cell and clear the selection.
    pub fn unmerge_points(&mut self) -> Result<(), PointMapError> {
        if self.selection.is_empty() {
            return Err(PointMapError::NoSelection);
        }
        let selected: Vec<PixelRef> = self.selection.iter().copied().collect();
        for a in selected {
            self.link_merge(a, a);
        }
        self.clear_sel();
        Ok(())
    }

    /// Merge the cells under the ends of each line where both are filled.
    pub fn merge_from_lines(&mut self, lines: &[Line]) {
        for l in lines {
            let a = self.pixelate(l.start(), true, 1);
            let b = self.pixelate(l.end(), true, 1);
            if self.pt(a).is_filled() && self.pt(b).is_filled() {
                self.link_merge(a, b);
            }
        }
    }

    /// True if `pix` has a merge partner.
    pub fn is_pixel_merged(&self, pix: PixelRef) -> bool {
        self.point(pix).is_some_and(|p| p.merge_pixel().is_some())
    }

    /// Every merge link, once each.
    pub fn merged_pixel_pairs(&self) -> &[PixelRefPair] {
        &self.merge_lines
    }

    // ── Queries ────────────────────────────────────────────────────

    /// True if any of the eight neighbours of `pix` is blocked.
    pub fn blocked_adjacent(&self, pix: PixelRef) -> bool {
        [
            pix.right(),
            pix.right().up(),
            pix.up(),
            pix.up().left(),
            pix.left(),
            pix.left().down(),
            pix.down(),
            pix.down().right(),
        ]
        .into_iter()
        .any(|n| self.includes(n) && self.pt(n).is_blocked())
    }

    /// Mark every filled cell for processing of all octants (or clear the
    /// marks) and drop the selection. Returns the number of filled cells.
    pub fn tag_state(&mut self, set: bool) -> usize {
        self.clear_sel();
        let flag = if set { 0xff } else { 0 };
        let mut count = 0;
        for pt in &mut self.points {
            if pt.is_filled() {
                pt.process_flag = flag;
                count += 1;
            }
        }
        count
    }

    /// Remove the columns of an analysis that did not finish.
    pub(crate) fn drop_columns(&mut self, mut cols: Vec<usize>) {
        cols.sort_unstable();
        cols.dedup();
        for col in cols.into_iter().rev() {
            self.attributes.remove_column(col);
        }
    }

    /// Value of attribute column `col` at the cell under `p`, or -2 if the
    /// point is off the grid or the cell has no analysis row.
    pub fn location_value(&self, p: Point2f, col: usize) -> f64 {
        let pix = self.pixelate(p, false, 1);
        if !self.includes(pix) {
            return -2.0;
        }
        match self.attributes.value(pix.packed(), col) {
            Some(v) => f64::from(v),
            None => -2.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sala_core::comm::ProgressKind;

    fn room(w: f64, h: f64) -> (QtRegion, Vec<Line>) {
        let r = QtRegion::new(Point2f::new(0.0, 0.0), Point2f::new(w, h));
        let c = [
            Point2f::new(0.0, 0.0),
            Point2f::new(w, 0.0),
            Point2f::new(w, h),
            Point2f::new(0.0, h),
        ];
        let lines = (0..4).map(|i| Line::new(c[i], c[(i + 1) % 4])).collect();
        (r, lines)
    }

    fn gridded(w: f64, h: f64, spacing: f64) -> PointMap {
        let (r, lines) = room(w, h);
        let mut map = PointMap::new("test", r, lines);
        map.set_grid(&GridConfig::with_spacing(spacing)).unwrap();
        map
    }

    // ── Grid tests ─────────────────────────────────────────────────

    #[test]
    fn grid_aligns_to_origin() {
        let map = gridded(2.0, 4.0, 0.5);
        assert_eq!((map.cols(), map.rows()), (5, 9));
        assert_eq!(map.bottom_left(), Point2f::new(0.0, 0.0));
        assert_eq!(map.region().bottom_left, Point2f::new(-0.25, -0.25));
        assert_eq!(map.points().count(), 45);
    }

    #[test]
    fn offset_region_keeps_congruent_cells() {
        let r = QtRegion::new(Point2f::new(0.3, 0.3), Point2f::new(3.3, 2.3));
        let mut map = PointMap::new("shifted", r, Vec::new());
        map.set_grid(&GridConfig::with_spacing(1.0)).unwrap();
        // cell centres stay on whole numbers
        let c = map.bottom_left();
        assert!((c.x - c.x.round()).abs() < 1e-9);
        assert!((c.y - c.y.round()).abs() < 1e-9);
    }

    #[test]
    fn pixelate_and_depixelate_agree() {
        let map = gridded(4.0, 4.0, 1.0);
        let pix = map.pixelate(Point2f::new(2.3, 1.6), true, 1);
        assert_eq!(pix, PixelRef::new(2, 2));
        assert_eq!(map.pixelate(map.depixelate(pix, 1.0), true, 1), pix);
        assert_eq!(map.pixelate(Point2f::new(-10.0, 0.0), true, 1).x, 0);
        assert!(!map.includes(map.pixelate(Point2f::new(-10.0, 0.0), false, 1)));
    }

    #[test]
    fn regionate_borders_the_cell() {
        let map = gridded(4.0, 4.0, 1.0);
        let r = map.regionate(PixelRef::new(1, 1), 0.0);
        assert_eq!(r.bottom_left, Point2f::new(0.5, 0.5));
        assert_eq!(r.top_right, Point2f::new(1.5, 1.5));
    }

    #[test]
    fn zero_spacing_is_rejected() {
        let (r, lines) = room(2.0, 2.0);
        let mut map = PointMap::new("bad", r, lines);
        let err = map.set_grid(&GridConfig::with_spacing(0.0)).unwrap_err();
        assert!(matches!(err, PointMapError::Config(_)));
        assert!(!map.is_initialised());
    }

    #[test]
    fn far_points_stay_off_the_grid() {
        let mut map = gridded(4.0, 4.0, 1.0);
        for far in [Point2f::new(65538.0, 2.0), Point2f::new(2.0, -65536.0)] {
            let pix = map.pixelate(far, false, 1);
            assert!(!map.includes(pix), "{pix} wrapped onto the grid");
            assert!(!map.fill_point(far, true));
        }
        assert_eq!(map.filled_count(), 0);
        let edge = map.pixelate(Point2f::new(65538.0, 2.0), true, 1);
        assert_eq!(edge, PixelRef::new(map.cols() as i16 - 1, 2));
    }

    // ── Fill tests ─────────────────────────────────────────────────

    #[test]
    fn flood_fill_stays_inside_walls() {
        let mut map = gridded(4.0, 4.0, 1.0);
        let added = map.make_points(Point2f::new(2.0, 2.0), FillType::Full, None).unwrap();
        // the interior is the 3x3 block of centres strictly inside the walls
        assert_eq!(added, 9);
        assert_eq!(map.filled_count(), 9);
        assert!(map.point(PixelRef::new(0, 0)).unwrap().is_empty());
        assert!(map.point(PixelRef::new(1, 1)).unwrap().is_edge());
        assert!(!map.point(PixelRef::new(2, 2)).unwrap().is_edge());
    }

    #[test]
    fn seed_on_filled_cell_is_rejected() {
        let mut map = gridded(4.0, 4.0, 1.0);
        map.make_points(Point2f::new(2.0, 2.0), FillType::Full, None).unwrap();
        let err = map.make_points(Point2f::new(2.0, 2.0), FillType::Full, None).unwrap_err();
        assert!(matches!(err, PointMapError::SeedNotFillable { .. }));
        let err = map.make_points(Point2f::new(40.0, 2.0), FillType::Full, None).unwrap_err();
        assert!(matches!(err, PointMapError::SeedNotFillable { .. }));
    }

    #[test]
    fn fill_needs_a_grid() {
        let (r, lines) = room(2.0, 2.0);
        let mut map = PointMap::new("bare", r, lines);
        let err = map.make_points(Point2f::new(1.0, 1.0), FillType::Full, None).unwrap_err();
        assert_eq!(err, PointMapError::GridNotSet);
    }

    #[test]
    fn augment_fill_terminates() {
        let mut map = gridded(4.0, 4.0, 1.0);
        let added = map.make_points(Point2f::new(2.0, 2.0), FillType::Augment, None).unwrap();
        assert_eq!(added, 9);
        assert!(map.point(PixelRef::new(2, 2)).unwrap().is_augmented());
    }

    struct CancelNow;
    impl Communicator for CancelNow {
        fn post(&mut self, _kind: ProgressKind, _value: usize) {}
        fn is_cancelled(&self) -> bool {
            true
        }
    }

    #[test]
    fn cancelled_fill_is_rolled_back() {
        let mut map = gridded(4.0, 4.0, 1.0);
        let mut comm = CancelNow;
        let err = map
            .make_points(Point2f::new(2.0, 2.0), FillType::Full, Some(&mut comm))
            .unwrap_err();
        assert_eq!(err, PointMapError::Cancelled);
        assert_eq!(map.filled_count(), 0);
    }

    #[test]
    fn fill_point_and_undo() {
        let mut map = gridded(4.0, 4.0, 1.0);
        assert!(map.fill_point(Point2f::new(1.0, 1.0), true));
        assert!(map.fill_point(Point2f::new(2.0, 1.0), true));
        assert_eq!(map.filled_count(), 2);
        assert!(map.can_undo());
        assert!(map.undo_points());
        assert_eq!(map.filled_count(), 1);
        assert!(map.fill_point(Point2f::new(1.0, 1.0), false));
        assert_eq!(map.filled_count(), 0);
        assert!(!map.fill_point(Point2f::new(-5.0, 1.0), true));
    }

    #[test]
    fn clear_then_undo_restores() {
        let mut map = gridded(4.0, 4.0, 1.0);
        map.make_points(Point2f::new(2.0, 2.0), FillType::Full, None).unwrap();
        assert!(map.clear_points());
        assert_eq!(map.filled_count(), 0);
        assert!(!map.clear_points());
        assert!(map.undo_points());
        assert_eq!(map.filled_count(), 9);
    }

    #[test]
    fn fill_lines_marks_wall_cells() {
        let mut map = gridded(4.0, 4.0, 1.0);
        map.fill_lines().unwrap();
        assert!(map.point(PixelRef::new(0, 0)).unwrap().is_filled());
        assert!(map.point(PixelRef::new(4, 2)).unwrap().is_filled());
        assert!(map.point(PixelRef::new(2, 2)).unwrap().is_empty());
    }

    #[test]
    fn block_lines_clips_to_cells() {
        let mut map = gridded(4.0, 4.0, 1.0);
        map.block_lines().unwrap();
        let wall = map.point(PixelRef::new(0, 2)).unwrap();
        assert!(wall.is_blocked());
        for l in wall.lines() {
            assert!(l.region().bottom_left.y >= 1.5 - 1e-9);
            assert!(l.region().top_right.y <= 2.5 + 1e-9);
        }
        assert!(!map.point(PixelRef::new(2, 2)).unwrap().is_blocked());
        assert!(map.blocked_adjacent(PixelRef::new(1, 1)));
        assert!(!map.blocked_adjacent(PixelRef::new(2, 2)));
        map.unblock_lines(true);
        assert!(!map.point(PixelRef::new(0, 2)).unwrap().is_blocked());
    }

    // ── Selection and merge tests ──────────────────────────────────

    #[test]
    fn region_selection_picks_filled_cells() {
        let mut map = gridded(4.0, 4.0, 1.0);
        map.make_points(Point2f::new(2.0, 2.0), FillType::Full, None).unwrap();
        let r = QtRegion::new(Point2f::new(0.0, 0.0), Point2f::new(1.2, 3.2));
        let actual = map.set_cur_sel_region(&r, false).unwrap();
        assert_eq!(map.selection().len(), 3);
        assert_eq!(actual.bottom_left, Point2f::new(0.0, 0.0));
        assert_eq!(actual.top_right, Point2f::new(1.0, 3.0));
        assert!(map.clear_sel());
        assert!(!map.clear_sel());
    }

    #[test]
    fn clearing_a_selection_empties_only_it() {
        let mut map = gridded(4.0, 4.0, 1.0);
        map.make_points(Point2f::new(2.0, 2.0), FillType::Full, None).unwrap();
        map.set_cur_sel_region(&QtRegion::new(Point2f::new(1.0, 1.0), Point2f::new(1.0, 3.0)), false)
            .unwrap();
        map.merge_pixels(PixelRef::new(1, 2), PixelRef::new(3, 2)).unwrap();
        assert!(map.clear_points());
        assert_eq!(map.filled_count(), 6);
        assert!(map.selection().is_empty());
        assert!(map.point(PixelRef::new(1, 2)).unwrap().is_empty());
        assert!(!map.is_pixel_merged(PixelRef::new(3, 2)));
        assert!(map.merged_pixel_pairs().is_empty());
    }

    #[test]
    fn merge_replaces_previous_partner() {
        let mut map = gridded(4.0, 4.0, 1.0);
        map.make_points(Point2f::new(2.0, 2.0), FillType::Full, None).unwrap();
        let (a, b, c) = (PixelRef::new(1, 1), PixelRef::new(3, 3), PixelRef::new(1, 3));
        map.merge_pixels(a, b).unwrap();
        assert!(map.is_pixel_merged(a) && map.is_pixel_merged(b));
        map.merge_pixels(c, a).unwrap();
        assert!(!map.is_pixel_merged(b));
        assert_eq!(map.merged_pixel_pairs(), &[PixelRefPair::new(a, c)]);
        map.merge_pixels(a, a).unwrap();
        assert!(map.merged_pixel_pairs().is_empty());
        assert!(!map.is_pixel_merged(c));
    }

    #[test]
    fn merging_needs_filled_cells() {
        let mut map = gridded(4.0, 4.0, 1.0);
        let (a, b) = (PixelRef::new(0, 0), PixelRef::new(4, 4));
        assert_eq!(map.merge_pixels(a, b), Err(PointMapError::CellNotFilled { pixel: a }));
        assert!(!map.is_pixel_merged(a) && !map.is_pixel_merged(b));
        assert!(map.merged_pixel_pairs().is_empty());

        map.make_points(Point2f::new(2.0, 2.0), FillType::Full, None).unwrap();
        let (inside, off) = (PixelRef::new(2, 2), PixelRef::new(40, 1));
        assert!(map.point(inside).unwrap().is_filled());
        assert_eq!(map.merge_pixels(inside, off), Err(PointMapError::CellNotFilled { pixel: off }));
        assert!(!map.is_pixel_merged(inside));
    }

    #[test]
    fn merge_points_offsets_from_selection_corner() {
        let mut map = gridded(4.0, 4.0, 1.0);
        map.make_points(Point2f::new(2.0, 2.0), FillType::Full, None).unwrap();
        map.set_cur_sel_region(&QtRegion::new(Point2f::new(1.0, 1.0), Point2f::new(1.0, 1.0)), false)
            .unwrap();
        map.merge_points(Point2f::new(3.0, 3.0)).unwrap();
        assert_eq!(
            map.point(PixelRef::new(1, 1)).unwrap().merge_pixel(),
            Some(PixelRef::new(3, 3))
        );
        assert!(map.selection().is_empty());
        assert_eq!(map.merge_points(Point2f::new(1.0, 1.0)), Err(PointMapError::NoSelection));
    }

    #[test]
    fn merge_from_lines_needs_filled_ends() {
        let mut map = gridded(4.0, 4.0, 1.0);
        map.make_points(Point2f::new(2.0, 2.0), FillType::Full, None).unwrap();
        map.merge_from_lines(&[
            Line::new(Point2f::new(1.0, 1.0), Point2f::new(3.0, 1.0)),
            Line::new(Point2f::new(0.0, 0.0), Point2f::new(2.0, 2.0)),
        ]);
        assert_eq!(map.merged_pixel_pairs().len(), 1);
    }

    #[test]
    fn location_value_without_rows() {
        let map = gridded(4.0, 4.0, 1.0);
        assert_eq!(map.location_value(Point2f::new(2.0, 2.0), 0), -2.0);
        assert_eq!(map.location_value(Point2f::new(-20.0, 2.0), 0), -2.0);
    }
}
