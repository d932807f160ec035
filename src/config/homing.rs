//! Homing cycle and limit switch settings.

use serde::Deserialize;

use super::axis::AxisMask;
use super::units::{Millimeters, MmPerMin};

/// Largest supported number of locate cycles.
pub const MAX_HOMING_CYCLES: u8 = 128;

/// Homing and hard-limit parameters.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[serde(default)]
pub struct HomingConfig {
    /// Allow homing cycles to run.
    pub enabled: bool,

    /// Abort motion and raise an alarm when a limit switch trips outside homing.
    pub hard_limits: bool,

    /// Axes homed by a homing cycle.
    pub axes: AxisMask,

    /// Axes that home in the negative direction (clear bit = positive).
    pub direction_mask: AxisMask,

    /// Rate of the initial search for the switches.
    pub seek_rate: MmPerMin,

    /// Slower rate used to locate the switches precisely.
    pub feed_rate: MmPerMin,

    /// Time a switch reading must be stable before it is trusted, in ms.
    pub debounce_ms: u16,

    /// Distance backed off a tripped switch before each precision approach.
    pub locate_backoff: Millimeters,

    /// Distance retracted after the final cycle; the retracted position becomes zero.
    pub pulloff: Millimeters,

    /// Number of locate cycles (back off and re-approach).
    pub cycles: u8,

    /// Travel bound of the search move; exceeding it fails the cycle.
    pub max_travel: Millimeters,
}

impl Default for HomingConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            hard_limits: false,
            axes: AxisMask::ALL,
            direction_mask: AxisMask::NONE,
            seek_rate: MmPerMin(250.0),
            feed_rate: MmPerMin(25.0),
            debounce_ms: 100,
            locate_backoff: Millimeters(1.0),
            pulloff: Millimeters(1.0),
            cycles: 2,
            max_travel: Millimeters(200.0),
        }
    }
}

impl HomingConfig {
    /// Travel bound of a precision approach.
    #[inline]
    pub fn approach_travel(&self) -> Millimeters {
        Millimeters(self.locate_backoff.0 * 2.0)
    }

    /// Sign of motion toward the switch on the given axis.
    #[inline]
    pub fn seek_sign(&self, axis_index: usize) -> f32 {
        if self.direction_mask.is_set(axis_index) {
            -1.0
        } else {
            1.0
        }
    }
}
