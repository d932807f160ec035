//! Limit switch inputs and debouncing.

use embedded_hal::digital::InputPin;

use crate::config::{AxisMask, N_AXIS};
use crate::error::StepperError;

/// Source of raw limit switch readings.
pub trait LimitSwitches {
    /// Error reported by the inputs.
    type Error;

    /// Read every switch; a set bit means the axis switch is tripped.
    fn read(&mut self) -> Result<AxisMask, Self::Error>;
}

/// [`LimitSwitches`] over embedded-hal input pins, one per axis.
pub struct LimitInputs<PIN: InputPin> {
    pins: [PIN; N_AXIS],
    /// A low level means tripped (normally-open switch with pull-up).
    active_low: bool,
}

impl<PIN: InputPin> LimitInputs<PIN> {
    /// Create from one input per axis.
    pub fn new(pins: [PIN; N_AXIS], active_low: bool) -> Self {
        Self { pins, active_low }
    }

    /// Release the pins.
    pub fn release(self) -> [PIN; N_AXIS] {
        self.pins
    }
}

impl<PIN: InputPin> LimitSwitches for LimitInputs<PIN> {
    type Error = StepperError;

    fn read(&mut self) -> Result<AxisMask, StepperError> {
        let mut tripped = AxisMask::NONE;
        for (i, pin) in self.pins.iter_mut().enumerate() {
            let high = pin.is_high().map_err(|_| StepperError::LimitInput)?;
            if high != self.active_low {
                tripped.set(i);
            }
        }
        Ok(tripped)
    }
}

/// Accepts a new switch state only after it has been stable for the
/// debounce window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LimitDebouncer {
    window_ms: u32,
    stable: AxisMask,
    candidate: AxisMask,
    since_ms: u32,
}

impl LimitDebouncer {
    /// Create a debouncer with all switches released.
    pub const fn new(window_ms: u32) -> Self {
        Self {
            window_ms,
            stable: AxisMask::NONE,
            candidate: AxisMask::NONE,
            since_ms: 0,
        }
    }

    /// Feed a raw reading taken at `now_ms`; returns the debounced state.
    ///
    /// The millisecond clock may wrap.
    pub fn update(&mut self, now_ms: u32, raw: AxisMask) -> AxisMask {
        if raw != self.candidate {
            self.candidate = raw;
            self.since_ms = now_ms;
        }
        if now_ms.wrapping_sub(self.since_ms) >= self.window_ms {
            self.stable = self.candidate;
        }
        self.stable
    }

    /// Last debounced state.
    #[inline]
    pub fn state(&self) -> AxisMask {
        self.stable
    }

    /// Forget history and assume all switches released.
    pub fn reset(&mut self) {
        self.stable = AxisMask::NONE;
        self.candidate = AxisMask::NONE;
    }
}
