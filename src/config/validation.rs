//! Configuration validation.

use crate::error::{ConfigError, Error, Result};

use super::homing::MAX_HOMING_CYCLES;
use super::stepper::MAX_STEP_PULSE_MICROSECONDS;
use super::{Axis, MachineConfig, RuntimeCommands};

/// Validate a machine configuration.
///
/// Checks:
/// - Axis scales are positive
/// - Feed rates and acceleration are positive, cornering tolerances non-negative
/// - Step pulse timing fits the hardware ceiling and the tick period
/// - Minimum step rate is positive and the acceleration tick fits the tick rate
/// - Masks only name existing axes
/// - Homing parameters are in range
/// - Runtime command bytes are distinct and never part of program text
pub fn validate_config(config: &MachineConfig) -> Result<()> {
    validate_axes(config)?;
    validate_motion(config)?;
    validate_stepper(config)?;
    validate_homing(config)?;
    validate_runtime(&config.runtime)?;
    Ok(())
}

fn validate_axes(config: &MachineConfig) -> Result<()> {
    for axis in Axis::ALL {
        let steps_per_mm = config.axes.axis(axis).steps_per_mm;
        if !(steps_per_mm > 0.0) || !steps_per_mm.is_finite() {
            return Err(Error::Config(ConfigError::InvalidStepsPerMm {
                axis,
                value: steps_per_mm,
            }));
        }
    }
    Ok(())
}

fn validate_motion(config: &MachineConfig) -> Result<()> {
    let motion = &config.motion;

    for rate in [motion.default_feed_rate.0, motion.default_seek_rate.0] {
        if !(rate > 0.0) {
            return Err(Error::Config(ConfigError::InvalidFeedRate(rate)));
        }
    }

    if !(motion.acceleration.0 > 0.0) {
        return Err(Error::Config(ConfigError::InvalidAcceleration(
            motion.acceleration.0,
        )));
    }

    // NaN fails both comparisons
    if !(motion.junction_deviation.0 >= 0.0) {
        return Err(Error::Config(ConfigError::InvalidJunctionDeviation(
            motion.junction_deviation.0,
        )));
    }

    if !(motion.minimum_planner_speed.0 >= 0.0) {
        return Err(Error::Config(ConfigError::InvalidMinimumPlannerSpeed(
            motion.minimum_planner_speed.0,
        )));
    }

    Ok(())
}

fn validate_stepper(config: &MachineConfig) -> Result<()> {
    let stepper = &config.stepper;

    let total_pulse = stepper.total_pulse_microseconds();
    if stepper.pulse_microseconds == 0 || total_pulse > MAX_STEP_PULSE_MICROSECONDS as u32 {
        return Err(Error::Config(ConfigError::InvalidStepPulse(
            stepper.pulse_microseconds,
        )));
    }

    if stepper.tick_frequency_hz == 0 {
        return Err(Error::Config(ConfigError::InvalidTickFrequency(
            stepper.tick_frequency_hz,
        )));
    }

    // Direction settle plus pulse must complete inside one tick
    if total_pulse * 2 > stepper.tick_period_us() {
        return Err(Error::Config(ConfigError::PulseExceedsTickPeriod {
            pulse_us: total_pulse,
            period_us: stepper.tick_period_us(),
        }));
    }

    if stepper.acceleration_ticks_per_second == 0
        || stepper.acceleration_ticks_per_second > stepper.tick_frequency_hz
    {
        return Err(Error::Config(ConfigError::InvalidAccelerationTicks(
            stepper.acceleration_ticks_per_second,
        )));
    }

    if stepper.minimum_steps_per_minute == 0
        || stepper.minimum_steps_per_minute > stepper.ticks_per_minute()
    {
        return Err(Error::Config(ConfigError::InvalidMinimumStepRate(
            stepper.minimum_steps_per_minute,
        )));
    }

    if stepper.direction_invert_mask.has_foreign_bits() {
        return Err(Error::Config(ConfigError::InvalidAxisMask(
            stepper.direction_invert_mask.bits(),
        )));
    }

    Ok(())
}

fn validate_homing(config: &MachineConfig) -> Result<()> {
    let homing = &config.homing;

    if homing.cycles == 0 || homing.cycles > MAX_HOMING_CYCLES {
        return Err(Error::Config(ConfigError::InvalidHomingCycles(homing.cycles)));
    }

    for mask in [homing.axes, homing.direction_mask] {
        if mask.has_foreign_bits() {
            return Err(Error::Config(ConfigError::InvalidAxisMask(mask.bits())));
        }
    }

    for rate in [homing.seek_rate.0, homing.feed_rate.0] {
        if !(rate > 0.0) {
            return Err(Error::Config(ConfigError::InvalidFeedRate(rate)));
        }
    }

    if !(homing.pulloff.0 >= 0.0) {
        return Err(Error::Config(ConfigError::InvalidHomingDistance(homing.pulloff.0)));
    }

    for distance in [homing.locate_backoff.0, homing.max_travel.0] {
        if !(distance > 0.0) {
            return Err(Error::Config(ConfigError::InvalidHomingDistance(distance)));
        }
    }

    Ok(())
}

fn validate_runtime(commands: &RuntimeCommands) -> Result<()> {
    if !commands.are_distinct() {
        return Err(Error::Config(ConfigError::DuplicateRuntimeCommand));
    }

    if let Some(byte) = commands
        .as_array()
        .into_iter()
        .find(|&b| RuntimeCommands::is_program_syntax(b))
    {
        return Err(Error::Config(ConfigError::RuntimeCommandInProgramSyntax(byte)));
    }

    Ok(())
}
