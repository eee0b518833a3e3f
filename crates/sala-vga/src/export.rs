//! Delimited text exports of a point map.
//!
//! Cells are written by packed reference (see [`PixelRef::packed`]) with
//! their centre in drawing coordinates.

use std::collections::HashSet;
use std::io::{self, Write};

use sala_core::PixelRef;

use crate::node::BIN_COUNT;
use crate::pointmap::PointMap;

impl PointMap {
    /// One line per filled cell: `Ref, x, y`.
    pub fn write_points<W: Write>(&self, out: &mut W, delim: char) -> io::Result<()> {
        writeln!(out, "Ref{delim}x{delim}y")?;
        for (pix, pt) in self.points() {
            if pt.is_filled() {
                let p = self.depixelate(pix, 1.0);
                writeln!(out, "{}{delim}{}{delim}{}", pix.packed(), p.x, p.y)?;
            }
        }
        Ok(())
    }

    /// One line per merge link, between the two cell centres.
    pub fn write_merge_lines<W: Write>(&self, out: &mut W, delim: char) -> io::Result<()> {
        writeln!(out, "x1{delim}y1{delim}x2{delim}y2")?;
        for pair in self.merged_pixel_pairs() {
            let a = self.depixelate(pair.a, 1.0);
            let b = self.depixelate(pair.b, 1.0);
            writeln!(out, "{}{delim}{}{delim}{}{delim}{}", a.x, a.y, b.x, b.y)?;
        }
        Ok(())
    }

    /// Every visibility edge once, as `RefFrom, RefTo`.
    ///
    /// Cells are visited column by column; an edge is written from the
    /// first of its two cells to be visited.
    pub fn write_connections<W: Write>(&self, out: &mut W, delim: char) -> io::Result<()> {
        write!(out, "RefFrom{delim}RefTo")?;
        let mut seen: HashSet<PixelRef> = HashSet::new();
        for (pix, pt) in self.points() {
            let Some(node) = pt.node().filter(|_| pt.is_filled()) else {
                continue;
            };
            seen.insert(pix);
            for b in 0..BIN_COUNT {
                let mut hood = Vec::new();
                node.bin(b).contents(&mut hood);
                for to in hood {
                    if !seen.contains(&to) {
                        write!(out, "\n{}{delim}{}", pix.packed(), to.packed())?;
                    }
                }
            }
        }
        Ok(())
    }

    /// `Ref, x, y` followed by every attribute column, one line per row.
    pub fn write_summary<W: Write>(&self, out: &mut W, delim: char) -> io::Result<()> {
        write!(out, "Ref{delim}x{delim}y")?;
        let table = self.attributes();
        for name in table.column_names() {
            write!(out, "{delim}{name}")?;
        }
        writeln!(out)?;
        for row in 0..table.row_count() {
            let Some(key) = table.key_at(row) else {
                continue;
            };
            let p = self.depixelate(PixelRef::from_packed(key), 1.0);
            write!(out, "{key}{delim}{}{delim}{}", p.x, p.y)?;
            for col in 0..table.column_count() {
                let v = table.value_at(row, col).unwrap_or(sala_core::NO_VALUE);
                write!(out, "{delim}{v}")?;
            }
            writeln!(out)?;
        }
        Ok(())
    }
}
