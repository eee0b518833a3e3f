//! Binary layout of a point map's grid.
//!
//! The block stores what is needed to rebuild the grid: name, drawing,
//! layout and per-cell state with merge partners. Nodes and analysis
//! results are not stored; rebuild them with
//! [`PointMap::spark_graph`](crate::PointMap::spark_graph).
//!
//! ```text
//! magic "SPMG" | version u8
//! name (u32 length + UTF-8)
//! drawing region (32 bytes) | line count u32 | lines (40 bytes each)
//! spacing f64 | offset x f64 | offset y f64 | cols i32 | rows i32
//! per cell, column by column: state u32 | merge pixel (4 bytes)
//! ```

use std::io::{Read, Write};

use sala_core::codec::{
    read_f64_le, read_i32_le, read_line, read_pixel, read_region, read_u32_le, read_u8, write_f64_le,
    write_i32_le, write_line, write_pixel, write_region, write_u32_le, write_u8,
};
use sala_core::{CodecError, PixelRefPair, Point2f};
use sala_space::PixelBase;

use crate::point::state;
use crate::pointmap::PointMap;

/// Magic bytes opening a grid block.
pub const GRID_MAGIC: [u8; 4] = *b"SPMG";
/// Current grid block version.
pub const GRID_VERSION: u8 = 1;

fn write_str(w: &mut dyn Write, s: &str) -> Result<(), CodecError> {
    write_u32_le(w, s.len() as u32)?;
    w.write_all(s.as_bytes())?;
    Ok(())
}

fn read_str(r: &mut dyn Read) -> Result<String, CodecError> {
    let len = read_u32_le(r)? as usize;
    let mut buf = vec![0u8; len];
    r.read_exact(&mut buf)?;
    String::from_utf8(buf).map_err(|e| CodecError::Malformed {
        detail: format!("invalid UTF-8 name: {e}"),
    })
}

impl PointMap {
    /// Encode the grid block. Selection flags are not written.
    pub fn write_grid(&self, w: &mut dyn Write) -> Result<(), CodecError> {
        w.write_all(&GRID_MAGIC)?;
        write_u8(w, GRID_VERSION)?;
        write_str(w, self.name())?;

        write_region(w, self.drawing_region())?;
        write_u32_le(w, self.drawing_lines().len() as u32)?;
        for l in self.drawing_lines() {
            write_line(w, l)?;
        }

        write_f64_le(w, self.spacing)?;
        write_f64_le(w, self.offset().x)?;
        write_f64_le(w, self.offset().y)?;
        write_i32_le(w, self.cols)?;
        write_i32_le(w, self.rows)?;

        for pt in &self.points {
            write_u32_le(w, u32::from(pt.state & !state::SELECTED))?;
            write_pixel(w, pt.merge)?;
        }
        Ok(())
    }

    /// Decode a grid block written by [`write_grid`](Self::write_grid).
    ///
    /// The map comes back filled and merged but without a visibility graph.
    pub fn read_grid(r: &mut dyn Read) -> Result<Self, CodecError> {
        let mut magic = [0u8; 4];
        r.read_exact(&mut magic)?;
        if magic != GRID_MAGIC {
            return Err(CodecError::InvalidMagic);
        }
        let version = read_u8(r)?;
        if version != GRID_VERSION {
            return Err(CodecError::UnsupportedVersion { found: version });
        }
        let name = read_str(r)?;

        let region = read_region(r)?;
        let line_count = read_u32_le(r)? as usize;
        let mut lines = Vec::with_capacity(line_count.min(1 << 16));
        for _ in 0..line_count {
            lines.push(read_line(r)?);
        }

        let spacing = read_f64_le(r)?;
        let offset = Point2f::new(read_f64_le(r)?, read_f64_le(r)?);
        let cols = read_i32_le(r)?;
        let rows = read_i32_le(r)?;
        if !(spacing.is_finite() && spacing > 0.0) {
            return Err(CodecError::Malformed {
                detail: format!("grid spacing {spacing}"),
            });
        }
        let max = i32::from(i16::MAX);
        if cols < 0 || rows < 0 || cols > max || rows > max {
            return Err(CodecError::Malformed {
                detail: format!("grid size {cols}x{rows}"),
            });
        }

        let mut map = PointMap::new(name, region, lines);
        map.lay_out(spacing, offset, cols, rows);

        let mut filled = 0;
        for i in 0..map.points.len() {
            let bits = read_u32_le(r)?;
            let merge = read_pixel(r)?;
            let st = u16::try_from(bits).map_err(|_| CodecError::Malformed {
                detail: format!("cell state {bits:#x}"),
            })?;
            if merge.is_some() && !map.includes(merge) {
                return Err(CodecError::Malformed {
                    detail: format!("merge partner {merge} off the grid"),
                });
            }
            let pt = &mut map.points[i];
            pt.state = st;
            pt.merge = merge;
            if pt.is_filled() {
                filled += 1;
            }
        }
        map.filled_count = filled;

        let mut pairs = Vec::new();
        for (pix, pt) in map.points() {
            if let Some(partner) = pt.merge_pixel() {
                if pix < partner {
                    pairs.push(PixelRefPair::new(pix, partner));
                }
            }
        }
        map.merge_lines = pairs;

        log::debug!(
            "point map '{}': read {}x{} grid with {} filled cells",
            map.name(),
            cols,
            rows,
            filled
        );
        Ok(map)
    }
}
