//! Step pulse timing and scheduler rate settings.

use serde::Deserialize;

use super::axis::AxisMask;

/// Longest step pulse (including the direction delay) the port can emit, in µs.
pub const MAX_STEP_PULSE_MICROSECONDS: u8 = 127;

/// Idle lock time that keeps the drivers enabled forever.
pub const IDLE_LOCK_ALWAYS: u8 = 255;

/// Timing parameters of the stepper pulse scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[serde(default)]
pub struct StepperConfig {
    /// Minimum step pulse width in microseconds.
    pub pulse_microseconds: u8,

    /// Extra settle time between a direction write and the following step pulse.
    pub step_pulse_delay_microseconds: u8,

    /// Frequency of the fixed-rate scheduler tick.
    pub tick_frequency_hz: u32,

    /// Number of velocity profile updates per second.
    pub acceleration_ticks_per_second: u32,

    /// Hard lower bound on the executed step rate, in steps per minute.
    pub minimum_steps_per_minute: u32,

    /// Axes whose direction output is inverted.
    pub direction_invert_mask: AxisMask,

    /// Drive the enable output low to enable the drivers.
    pub invert_step_enable: bool,

    /// Time drivers stay enabled after motion stops, in ms (255 = always).
    pub idle_lock_time_ms: u8,

    /// Start a cycle as soon as a segment is queued.
    pub auto_start: bool,
}

impl Default for StepperConfig {
    fn default() -> Self {
        Self {
            pulse_microseconds: 10,
            step_pulse_delay_microseconds: 0,
            tick_frequency_hz: 30_000,
            acceleration_ticks_per_second: 60,
            minimum_steps_per_minute: 800,
            direction_invert_mask: AxisMask::new(0b110),
            invert_step_enable: false,
            idle_lock_time_ms: 25,
            auto_start: true,
        }
    }
}

impl StepperConfig {
    /// Scheduler ticks per minute; a step rate equal to this fires one step per tick.
    #[inline]
    pub fn ticks_per_minute(&self) -> u32 {
        self.tick_frequency_hz.saturating_mul(60)
    }

    /// Scheduler ticks between two velocity profile updates.
    #[inline]
    pub fn ticks_per_acceleration_tick(&self) -> u32 {
        (self.tick_frequency_hz / self.acceleration_ticks_per_second.max(1)).max(1)
    }

    /// Scheduler tick period in microseconds.
    #[inline]
    pub fn tick_period_us(&self) -> u32 {
        1_000_000 / self.tick_frequency_hz.max(1)
    }

    /// Total time the port holds a pulse cycle, direction delay included.
    #[inline]
    pub fn total_pulse_microseconds(&self) -> u32 {
        self.pulse_microseconds as u32 + self.step_pulse_delay_microseconds as u32
    }

    /// Number of idle ticks before drivers are disabled, `None` when they stay locked.
    pub fn idle_lock_ticks(&self) -> Option<u32> {
        if self.idle_lock_time_ms == IDLE_LOCK_ALWAYS {
            None
        } else {
            Some(self.tick_frequency_hz / 1000 * self.idle_lock_time_ms as u32)
        }
    }
}
