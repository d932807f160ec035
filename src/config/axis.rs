//! Axis identifiers and per-axis bit masks.

use core::ops::{BitAnd, BitOr, BitXor, Not};

use serde::Deserialize;

/// Number of linear axes driven by the machine.
pub const N_AXIS: usize = 3;

/// A machine axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Axis {
    /// X axis (bit 0).
    X,
    /// Y axis (bit 1).
    Y,
    /// Z axis (bit 2).
    Z,
}

impl Axis {
    /// All axes in index order.
    pub const ALL: [Axis; N_AXIS] = [Axis::X, Axis::Y, Axis::Z];

    /// Array index of this axis.
    #[inline]
    pub const fn index(self) -> usize {
        match self {
            Axis::X => 0,
            Axis::Y => 1,
            Axis::Z => 2,
        }
    }

    /// Single-bit mask for this axis.
    #[inline]
    pub const fn mask(self) -> AxisMask {
        AxisMask(1 << self.index())
    }
}

/// Bit set over the machine axes (bit 0 = X, bit 1 = Y, bit 2 = Z).
///
/// Used for direction bits, step bits, invert masks and limit switch state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[serde(transparent)]
pub struct AxisMask(pub u8);

impl AxisMask {
    /// No axes.
    pub const NONE: Self = Self(0);
    /// X, Y and Z.
    pub const ALL: Self = Self((1 << N_AXIS) - 1);

    /// Create a mask from raw bits.
    #[inline]
    pub const fn new(bits: u8) -> Self {
        Self(bits)
    }

    /// Raw bits.
    #[inline]
    pub const fn bits(self) -> u8 {
        self.0
    }

    /// Check whether the axis bit is set.
    #[inline]
    pub const fn contains(self, axis: Axis) -> bool {
        self.0 & (1 << axis.index()) != 0
    }

    /// Check whether the bit at `index` is set.
    #[inline]
    pub const fn is_set(self, index: usize) -> bool {
        self.0 & (1 << index) != 0
    }

    /// Set the bit at `index`.
    #[inline]
    pub fn set(&mut self, index: usize) {
        self.0 |= 1 << index;
    }

    /// True if no bit is set.
    #[inline]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// True if any bit outside the machine axes is set.
    #[inline]
    pub const fn has_foreign_bits(self) -> bool {
        self.0 & !Self::ALL.0 != 0
    }

    /// Iterate over the axis indices contained in the mask.
    pub fn indices(self) -> impl Iterator<Item = usize> {
        (0..N_AXIS).filter(move |&i| self.is_set(i))
    }
}

impl BitOr for AxisMask {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self::Output {
        Self(self.0 | rhs.0)
    }
}

impl BitAnd for AxisMask {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self::Output {
        Self(self.0 & rhs.0)
    }
}

impl BitXor for AxisMask {
    type Output = Self;

    fn bitxor(self, rhs: Self) -> Self::Output {
        Self(self.0 ^ rhs.0)
    }
}

impl Not for AxisMask {
    type Output = Self;

    fn not(self) -> Self::Output {
        Self(!self.0 & Self::ALL.0)
    }
}

impl From<Axis> for AxisMask {
    fn from(axis: Axis) -> Self {
        axis.mask()
    }
}
