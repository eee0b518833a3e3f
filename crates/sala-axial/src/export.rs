//! Connection exports of a line graph.
//!
//! Lines are named by row index. The pair lists have a header and no
//! trailing newline.

use std::io::{self, Write};

use sala_space::SegDir;

use crate::graph::ShapeGraph;

impl ShapeGraph {
    /// The undirected graph in Graphviz form, one edge per direction.
    pub fn write_dot<W: Write>(&self, out: &mut W) -> io::Result<()> {
        writeln!(out, "strict graph {{")?;
        for (i, c) in self.connectors().iter().enumerate() {
            for to in &c.connections {
                writeln!(out, "    {i} -- {to}")?;
            }
        }
        writeln!(out, "}}")
    }

    /// `refA,refB`, one row per connection and direction.
    ///
    /// Rows of consecutive lines are separated by a newline even when a
    /// line has no connections, so an isolated line shows as a blank row.
    pub fn write_pairs_csv<W: Write>(&self, out: &mut W) -> io::Result<()> {
        writeln!(out, "refA,refB")?;
        for (i, c) in self.connectors().iter().enumerate() {
            if i != 0 {
                writeln!(out)?;
            }
            for (k, to) in c.connections.iter().enumerate() {
                if k != 0 {
                    writeln!(out)?;
                }
                write!(out, "{i},{to}")?;
            }
        }
        Ok(())
    }

    /// `refA,refB,ss_weight,for_back,dir`, one row per directed segment
    /// connection: forward connections of a segment first, then back.
    ///
    /// `for_back` is 0 for connections leaving through the segment's end
    /// and 1 for its start; `dir` is the direction the neighbour is
    /// travelled in (1 forward, -1 back).
    pub fn write_segment_pairs_csv<W: Write>(&self, out: &mut W) -> io::Result<()> {
        write!(out, "refA,refB,ss_weight,for_back,dir")?;
        for (i, c) in self.connectors().iter().enumerate() {
            for (side, flag) in [(SegDir::Forward, 0), (SegDir::Back, 1)] {
                for (r, w) in c.segconns(side) {
                    write!(out, "\n{i},{},{w},{flag},{}", r.index, r.dir.signum())?;
                }
            }
        }
        Ok(())
    }
}
