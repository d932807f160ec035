//! Step, direction and enable outputs.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;

use crate::config::{AxisMask, StepperConfig, N_AXIS};
use crate::error::StepperError;

/// Output stage driven by the scheduler.
///
/// Masks are already corrected for the direction invert mask: a set bit means
/// "drive the line high".
pub trait StepperPort {
    /// Error reported by the outputs.
    type Error;

    /// Write every direction line.
    fn set_directions(&mut self, directions: AxisMask) -> Result<(), Self::Error>;

    /// Emit one step pulse on every axis in `steps`.
    ///
    /// Must leave at least the configured pulse time between the last
    /// direction write and the rising step edge.
    fn pulse_steps(&mut self, steps: AxisMask) -> Result<(), Self::Error>;

    /// Enable or disable the drivers.
    fn set_enabled(&mut self, enabled: bool) -> Result<(), Self::Error>;
}

/// [`StepperPort`] over embedded-hal output pins.
///
/// Pulses are timed with a blocking [`DelayNs`]; the pulse width is bounded
/// by configuration so one pulse always fits inside one scheduler tick.
pub struct HalStepperPort<STEP, DIR, EN, DELAY>
where
    STEP: OutputPin,
    DIR: OutputPin,
    EN: OutputPin,
    DELAY: DelayNs,
{
    step_pins: [STEP; N_AXIS],
    dir_pins: [DIR; N_AXIS],
    enable_pin: EN,
    delay: DELAY,
    /// Step pulse width in µs.
    pulse_us: u32,
    /// Direction settle time before the next step edge, in µs.
    settle_us: u32,
    invert_enable: bool,
    /// A direction line changed since the last pulse.
    direction_pending: bool,
}

impl<STEP, DIR, EN, DELAY> HalStepperPort<STEP, DIR, EN, DELAY>
where
    STEP: OutputPin,
    DIR: OutputPin,
    EN: OutputPin,
    DELAY: DelayNs,
{
    /// Create a port with pulse timing from the stepper configuration.
    pub fn new(
        step_pins: [STEP; N_AXIS],
        dir_pins: [DIR; N_AXIS],
        enable_pin: EN,
        delay: DELAY,
        config: &StepperConfig,
    ) -> Self {
        Self {
            step_pins,
            dir_pins,
            enable_pin,
            delay,
            pulse_us: config.pulse_microseconds as u32,
            settle_us: config.total_pulse_microseconds(),
            invert_enable: config.invert_step_enable,
            direction_pending: false,
        }
    }

    /// Release the pins and the delay provider.
    pub fn release(self) -> ([STEP; N_AXIS], [DIR; N_AXIS], EN, DELAY) {
        (self.step_pins, self.dir_pins, self.enable_pin, self.delay)
    }
}

impl<STEP, DIR, EN, DELAY> StepperPort for HalStepperPort<STEP, DIR, EN, DELAY>
where
    STEP: OutputPin,
    DIR: OutputPin,
    EN: OutputPin,
    DELAY: DelayNs,
{
    type Error = StepperError;

    fn set_directions(&mut self, directions: AxisMask) -> Result<(), StepperError> {
        for (i, pin) in self.dir_pins.iter_mut().enumerate() {
            if directions.is_set(i) {
                pin.set_high().map_err(|_| StepperError::Port)?;
            } else {
                pin.set_low().map_err(|_| StepperError::Port)?;
            }
        }
        self.direction_pending = true;
        Ok(())
    }

    fn pulse_steps(&mut self, steps: AxisMask) -> Result<(), StepperError> {
        if steps.is_empty() {
            return Ok(());
        }

        if self.direction_pending {
            self.delay.delay_us(self.settle_us);
            self.direction_pending = false;
        }

        for i in steps.indices() {
            self.step_pins[i].set_high().map_err(|_| StepperError::Port)?;
        }

        self.delay.delay_us(self.pulse_us);

        for i in steps.indices() {
            self.step_pins[i].set_low().map_err(|_| StepperError::Port)?;
        }
        Ok(())
    }

    fn set_enabled(&mut self, enabled: bool) -> Result<(), StepperError> {
        if enabled != self.invert_enable {
            self.enable_pin.set_high().map_err(|_| StepperError::Port)
        } else {
            self.enable_pin.set_low().map_err(|_| StepperError::Port)
        }
    }
}
