//! Fixed-size binary layouts for the geometry primitives.
//!
//! All values are little-endian. A [`QtRegion`] occupies 32 bytes (four
//! `f64`), a [`Line`] 40 bytes (its region followed by an 8-byte tail of
//! parity, direction and six zero bytes) and a [`PixelRef`] 4 bytes in
//! its packed form.

use std::io::{Read, Write};

use crate::error::CodecError;
use crate::geometry::{Line, Point2f, QtRegion};
use crate::pixel::PixelRef;

/// Encoded size of a [`QtRegion`].
pub const REGION_SIZE: usize = 32;
/// Encoded size of a [`Line`].
pub const LINE_SIZE: usize = 40;
/// Encoded size of a [`PixelRef`].
pub const PIXEL_SIZE: usize = 4;

// ── Primitive writers ───────────────────────────────────────────

/// Write a single byte.
pub fn write_u8(w: &mut dyn Write, v: u8) -> Result<(), CodecError> {
    w.write_all(&[v])?;
    Ok(())
}

/// Write a little-endian u32.
pub fn write_u32_le(w: &mut dyn Write, v: u32) -> Result<(), CodecError> {
    w.write_all(&v.to_le_bytes())?;
    Ok(())
}

/// Write a little-endian i32.
pub fn write_i32_le(w: &mut dyn Write, v: i32) -> Result<(), CodecError> {
    w.write_all(&v.to_le_bytes())?;
    Ok(())
}

/// Write a little-endian f32.
pub fn write_f32_le(w: &mut dyn Write, v: f32) -> Result<(), CodecError> {
    w.write_all(&v.to_le_bytes())?;
    Ok(())
}

/// Write a little-endian f64.
pub fn write_f64_le(w: &mut dyn Write, v: f64) -> Result<(), CodecError> {
    w.write_all(&v.to_le_bytes())?;
    Ok(())
}

// ── Primitive readers ───────────────────────────────────────────

/// Read a single byte.
pub fn read_u8(r: &mut dyn Read) -> Result<u8, CodecError> {
    let mut buf = [0u8; 1];
    r.read_exact(&mut buf)?;
    Ok(buf[0])
}

/// Read a little-endian u32.
pub fn read_u32_le(r: &mut dyn Read) -> Result<u32, CodecError> {
    let mut buf = [0u8; 4];
    r.read_exact(&mut buf)?;
    Ok(u32::from_le_bytes(buf))
}

/// Read a little-endian i32.
pub fn read_i32_le(r: &mut dyn Read) -> Result<i32, CodecError> {
    let mut buf = [0u8; 4];
    r.read_exact(&mut buf)?;
    Ok(i32::from_le_bytes(buf))
}

/// Read a little-endian f32.
pub fn read_f32_le(r: &mut dyn Read) -> Result<f32, CodecError> {
    let mut buf = [0u8; 4];
    r.read_exact(&mut buf)?;
    Ok(f32::from_le_bytes(buf))
}

/// Read a little-endian f64.
pub fn read_f64_le(r: &mut dyn Read) -> Result<f64, CodecError> {
    let mut buf = [0u8; 8];
    r.read_exact(&mut buf)?;
    Ok(f64::from_le_bytes(buf))
}

// ── Geometry records ────────────────────────────────────────────

fn write_point(w: &mut dyn Write, p: Point2f) -> Result<(), CodecError> {
    write_f64_le(w, p.x)?;
    write_f64_le(w, p.y)
}

fn read_point(r: &mut dyn Read) -> Result<Point2f, CodecError> {
    let x = read_f64_le(r)?;
    let y = read_f64_le(r)?;
    Ok(Point2f::new(x, y))
}

/// Write a region as 32 bytes.
pub fn write_region(w: &mut dyn Write, region: &QtRegion) -> Result<(), CodecError> {
    write_point(w, region.bottom_left)?;
    write_point(w, region.top_right)
}

/// Read a 32-byte region.
pub fn read_region(r: &mut dyn Read) -> Result<QtRegion, CodecError> {
    let bl = read_point(r)?;
    let tr = read_point(r)?;
    Ok(QtRegion::new(bl, tr))
}

/// Write a line as 40 bytes.
pub fn write_line(w: &mut dyn Write, line: &Line) -> Result<(), CodecError> {
    write_point(w, line.bottom_left())?;
    write_point(w, line.top_right())?;
    let mut tail = [0u8; 8];
    tail[0] = if line.parity() { 1 } else { 0xff };
    tail[1] = if line.rightward() { 1 } else { 0xff };
    w.write_all(&tail)?;
    Ok(())
}

/// Read a 40-byte line.
pub fn read_line(r: &mut dyn Read) -> Result<Line, CodecError> {
    let bl = read_point(r)?;
    let tr = read_point(r)?;
    let mut tail = [0u8; 8];
    r.read_exact(&mut tail)?;
    let flag = |b: u8, name: &str| match b {
        1 => Ok(true),
        0 | 0xff => Ok(false),
        other => Err(CodecError::Malformed {
            detail: format!("line {name} byte {other:#04x}"),
        }),
    };
    let parity = flag(tail[0], "parity")?;
    let rightward = flag(tail[1], "direction")?;
    if bl.y > tr.y {
        return Err(CodecError::Malformed {
            detail: "line bounding box is inverted".to_owned(),
        });
    }
    Ok(Line::from_parts(bl, tr, parity, rightward))
}

/// Write a pixel in its packed 4-byte form.
pub fn write_pixel(w: &mut dyn Write, p: PixelRef) -> Result<(), CodecError> {
    write_i32_le(w, p.packed())
}

/// Read a packed 4-byte pixel.
pub fn read_pixel(r: &mut dyn Read) -> Result<PixelRef, CodecError> {
    Ok(PixelRef::from_packed(read_i32_le(r)?))
}
