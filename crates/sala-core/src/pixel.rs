//! Integer grid coordinates.

use std::fmt;
use std::ops::{Add, Div, Sub};

// ── Directions ──────────────────────────────────────────────────

/// Walk directions used by the visibility bins.
pub mod dir {
    /// Not a direction.
    pub const NONE: u8 = 0x00;
    /// Positive x.
    pub const HORIZONTAL: u8 = 0x01;
    /// Positive y.
    pub const VERTICAL: u8 = 0x02;
    /// Positive x, positive y.
    pub const POS_DIAGONAL: u8 = 0x04;
    /// Positive x, negative y.
    pub const NEG_DIAGONAL: u8 = 0x08;
    /// Either diagonal.
    pub const DIAGONAL: u8 = 0x0c;
    /// Negative x.
    pub const NEG_HORIZONTAL: u8 = 0x10;
    /// Negative y.
    pub const NEG_VERTICAL: u8 = 0x20;
}

/// A cell on an integer grid.
///
/// `(-1, -1)` is reserved as [`PixelRef::NONE`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PixelRef {
    /// Column.
    pub x: i16,
    /// Row.
    pub y: i16,
}

impl Default for PixelRef {
    fn default() -> Self {
        Self::NONE
    }
}

impl PixelRef {
    /// The "no pixel" sentinel.
    pub const NONE: PixelRef = PixelRef { x: -1, y: -1 };

    /// Create a pixel reference.
    #[inline]
    pub const fn new(x: i16, y: i16) -> Self {
        Self { x, y }
    }

    /// Decode from the packed integer form.
    #[inline]
    pub const fn from_packed(packed: i32) -> Self {
        Self {
            x: (packed >> 16) as i16,
            y: (packed & 0xffff) as i16,
        }
    }

    /// Pack into a single integer: `x` in the high half, `y` in the low half.
    #[inline]
    pub const fn packed(self) -> i32 {
        ((self.x as i32) << 16) + (self.y as i32 & 0xffff)
    }

    /// True unless this is the sentinel.
    #[inline]
    pub fn is_some(self) -> bool {
        self != Self::NONE
    }

    /// One row up.
    #[inline]
    pub fn up(self) -> Self {
        Self::new(self.x, self.y + 1)
    }

    /// One row down.
    #[inline]
    pub fn down(self) -> Self {
        Self::new(self.x, self.y - 1)
    }

    /// One column left.
    #[inline]
    pub fn left(self) -> Self {
        Self::new(self.x - 1, self.y)
    }

    /// One column right.
    #[inline]
    pub fn right(self) -> Self {
        Self::new(self.x + 1, self.y)
    }

    /// Step once in one of the [`dir`] directions.
    pub fn moved(self, direction: u8) -> Self {
        match direction {
            dir::POS_DIAGONAL => Self::new(self.x + 1, self.y + 1),
            dir::NEG_DIAGONAL => Self::new(self.x + 1, self.y - 1),
            dir::HORIZONTAL => self.right(),
            dir::VERTICAL => self.up(),
            dir::NEG_HORIZONTAL => self.left(),
            dir::NEG_VERTICAL => self.down(),
            _ => self,
        }
    }

    /// Coordinate that stays fixed when walking in `direction`.
    #[inline]
    pub fn row(self, direction: u8) -> i16 {
        if direction & dir::VERTICAL != 0 {
            self.x
        } else {
            self.y
        }
    }

    /// Coordinate that advances when walking in `direction`.
    #[inline]
    pub fn col(self, direction: u8) -> i16 {
        if direction & dir::VERTICAL != 0 {
            self.y
        } else {
            self.x
        }
    }

    /// Overwrite the coordinate that advances in `direction`.
    #[inline]
    pub fn set_col(&mut self, direction: u8, v: i16) {
        if direction & dir::VERTICAL != 0 {
            self.y = v;
        } else {
            self.x = v;
        }
    }

    /// Overwrite the coordinate that stays fixed in `direction`.
    #[inline]
    pub fn set_row(&mut self, direction: u8, v: i16) {
        if direction & dir::VERTICAL != 0 {
            self.x = v;
        } else {
            self.y = v;
        }
    }

    /// True if inside the box spanned by `bl` and `tr`, corners included.
    pub fn within(self, bl: PixelRef, tr: PixelRef) -> bool {
        self.x >= bl.x && self.x <= tr.x && self.y >= bl.y && self.y <= tr.y
    }

    /// True if `0 <= x < width` and `0 <= y < height`.
    pub fn encloses(self, width: i16, height: i16) -> bool {
        self.x >= 0 && self.x < width && self.y >= 0 && self.y < height
    }

    /// Both coordinates odd.
    pub fn is_odd(self) -> bool {
        self.x % 2 == 1 && self.y % 2 == 1
    }

    /// Both coordinates even.
    pub fn is_even(self) -> bool {
        self.x % 2 == 0 && self.y % 2 == 0
    }
}

impl fmt::Display for PixelRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

impl Add for PixelRef {
    type Output = PixelRef;
    fn add(self, o: PixelRef) -> PixelRef {
        PixelRef::new(self.x + o.x, self.y + o.y)
    }
}

impl Sub for PixelRef {
    type Output = PixelRef;
    fn sub(self, o: PixelRef) -> PixelRef {
        PixelRef::new(self.x - o.x, self.y - o.y)
    }
}

impl Div<i16> for PixelRef {
    type Output = PixelRef;
    fn div(self, factor: i16) -> PixelRef {
        PixelRef::new(self.x / factor, self.y / factor)
    }
}

/// Euclidean distance between cell indices.
pub fn pixel_dist(a: PixelRef, b: PixelRef) -> f64 {
    let dx = f64::from(a.x) - f64::from(b.x);
    let dy = f64::from(a.y) - f64::from(b.y);
    (dx * dx + dy * dy).sqrt()
}

/// Turn angle at `b` when walking `a -> b -> c`, in `[0, π]`.
///
/// A missing `c` (the sentinel) means no turn.
pub fn pixel_angle(a: PixelRef, b: PixelRef, c: PixelRef) -> f64 {
    if c == PixelRef::NONE {
        return 0.0;
    }
    let (ax, ay) = (f64::from(a.x - b.x), f64::from(a.y - b.y));
    let (cx, cy) = (f64::from(b.x - c.x), f64::from(b.y - c.y));
    let d = (ax * cx + ay * cy) / ((ax * ax + ay * ay).sqrt() * (cx * cx + cy * cy).sqrt() + 1e-12);
    d.clamp(-1.0, 1.0).acos()
}

/// An unordered pair of pixels, stored with `a <= b`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PixelRefPair {
    /// The smaller pixel.
    pub a: PixelRef,
    /// The larger pixel.
    pub b: PixelRef,
}

impl PixelRefPair {
    /// Create a normalised pair.
    pub fn new(x: PixelRef, y: PixelRef) -> Self {
        if x < y {
            Self { a: x, b: y }
        } else {
            Self { a: y, b: x }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn packed_form_matches_layout() {
        assert_eq!(PixelRef::new(1, 1).packed(), 65537);
        assert_eq!(PixelRef::new(2, 1).packed(), 131073);
        assert_eq!(PixelRef::from_packed(131074), PixelRef::new(2, 2));
    }

    #[test]
    fn default_is_sentinel() {
        assert_eq!(PixelRef::default(), PixelRef::NONE);
        assert!(!PixelRef::NONE.is_some());
    }

    #[test]
    fn ordering_is_x_then_y() {
        assert!(PixelRef::new(0, 5) < PixelRef::new(1, 0));
        assert!(PixelRef::new(1, 0) < PixelRef::new(1, 1));
    }

    #[test]
    fn turn_angle() {
        let a = PixelRef::new(0, 0);
        let b = PixelRef::new(1, 0);
        assert_eq!(pixel_angle(a, b, PixelRef::NONE), 0.0);
        assert!(pixel_angle(a, b, PixelRef::new(2, 0)) < 1e-6);
        let right = pixel_angle(a, b, PixelRef::new(1, 1));
        assert!((right - std::f64::consts::FRAC_PI_2).abs() < 1e-6);
    }

    #[test]
    fn pair_is_normalised() {
        let p = PixelRefPair::new(PixelRef::new(3, 1), PixelRef::new(1, 4));
        assert_eq!(p.a, PixelRef::new(1, 4));
        assert_eq!(p, PixelRefPair::new(PixelRef::new(1, 4), PixelRef::new(3, 1)));
    }

    proptest! {
        #[test]
        fn packing_round_trips(x in 0i16..i16::MAX, y in 0i16..i16::MAX) {
            let p = PixelRef::new(x, y);
            prop_assert_eq!(PixelRef::from_packed(p.packed()), p);
        }
    }
}
