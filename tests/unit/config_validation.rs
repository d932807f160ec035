//! Unit tests for configuration validation.

use cnc_motion::config::{validate_config, Axis, AxisMask, MachineConfig};
use cnc_motion::error::{ConfigError, Error};

/// Test that the stock configuration passes validation.
#[test]
fn test_valid_config_passes_validation() {
    assert!(validate_config(&MachineConfig::default()).is_ok());
}

/// Negative cornering tolerance is rejected.
#[test]
fn test_invalid_junction_deviation() {
    let mut config = MachineConfig::default();
    config.motion.junction_deviation.0 = -0.01;

    let result = validate_config(&config);
    assert!(matches!(
        result,
        Err(Error::Config(ConfigError::InvalidJunctionDeviation(_)))
    ));
}

/// Non-finite axis scale is rejected with the axis named.
#[test]
fn test_invalid_steps_per_mm() {
    let mut config = MachineConfig::default();
    config.axes.z.steps_per_mm = f32::NAN;

    let result = validate_config(&config);
    assert!(matches!(
        result,
        Err(Error::Config(ConfigError::InvalidStepsPerMm { axis: Axis::Z, .. }))
    ));
}

/// Invert mask may only name X, Y and Z.
#[test]
fn test_invalid_invert_mask() {
    let mut config = MachineConfig::default();
    config.stepper.direction_invert_mask = AxisMask::new(0b1000);

    let result = validate_config(&config);
    assert_eq!(result, Err(Error::Config(ConfigError::InvalidAxisMask(0b1000))));
}

/// Homing needs at least one cycle.
#[test]
fn test_invalid_homing_cycles() {
    let mut config = MachineConfig::default();
    config.homing.cycles = 0;

    let result = validate_config(&config);
    assert_eq!(result, Err(Error::Config(ConfigError::InvalidHomingCycles(0))));
}

/// Runtime bytes must be distinct and outside program syntax.
#[test]
fn test_invalid_runtime_commands() {
    let mut config = MachineConfig::default();
    config.runtime.reset = config.runtime.feed_hold;
    assert_eq!(
        validate_config(&config),
        Err(Error::Config(ConfigError::DuplicateRuntimeCommand))
    );

    let mut config = MachineConfig::default();
    config.runtime.cycle_start = b'X';
    assert_eq!(
        validate_config(&config),
        Err(Error::Config(ConfigError::RuntimeCommandInProgramSyntax(b'X')))
    );
}

/// Zero pulse width is rejected.
#[test]
fn test_invalid_step_pulse() {
    let mut config = MachineConfig::default();
    config.stepper.pulse_microseconds = 0;

    let result = validate_config(&config);
    assert_eq!(result, Err(Error::Config(ConfigError::InvalidStepPulse(0))));
}
