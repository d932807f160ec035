//! Unit tests for TOML configuration parsing.

use cnc_motion::config::{parse_config, AxisMask, MachineConfig, IDLE_LOCK_ALWAYS};

/// Test parsing a complete machine description from TOML.
#[test]
fn test_parse_machine_config() {
    let toml_str = r#"
[axes.x]
steps_per_mm = 80.0

[axes.y]
steps_per_mm = 80.0

[axes.z]
steps_per_mm = 400.0

[motion]
default_feed_rate = 300.0
default_seek_rate = 1500.0
acceleration = 216000.0
junction_deviation = 0.02
minimum_planner_speed = 0.0

[stepper]
pulse_microseconds = 5
step_pulse_delay_microseconds = 2
tick_frequency_hz = 40000
acceleration_ticks_per_second = 100
minimum_steps_per_minute = 1000
direction_invert_mask = 1
invert_step_enable = true
idle_lock_time_ms = 255
auto_start = false
"#;

    let config: MachineConfig = toml::from_str(toml_str).expect("Failed to parse TOML");

    assert_eq!(config.steps_per_mm(), [80.0, 80.0, 400.0]);
    assert_eq!(config.motion.default_seek_rate.0, 1500.0);
    assert_eq!(config.motion.acceleration.0, 216000.0);
    assert_eq!(config.stepper.total_pulse_microseconds(), 7);
    assert_eq!(config.stepper.ticks_per_acceleration_tick(), 400);
    assert_eq!(config.stepper.direction_invert_mask, AxisMask::new(0b001));
    assert_eq!(config.stepper.idle_lock_time_ms, IDLE_LOCK_ALWAYS);
    assert!(config.stepper.invert_step_enable);
    assert!(!config.stepper.auto_start);
}

/// Test parsing homing, runtime and report sections.
#[test]
fn test_parse_homing_runtime_report() {
    let toml_str = r#"
[homing]
enabled = true
hard_limits = true
axes = 3
direction_mask = 1
seek_rate = 400.0
feed_rate = 40.0
debounce_ms = 20
locate_backoff = 2.0
pulloff = 1.5
cycles = 1
max_travel = 300.0

[runtime]
status_report = 63
feed_hold = 133
cycle_start = 134
reset = 24

[report]
decimal_places = 4
inches = true
"#;

    let config = parse_config(toml_str).expect("Failed to parse TOML");
    let homing = &config.homing;

    assert!(homing.enabled && homing.hard_limits);
    assert_eq!(homing.axes, AxisMask::new(0b011));
    assert_eq!(homing.seek_sign(0), -1.0);
    assert_eq!(homing.seek_sign(1), 1.0);
    assert_eq!(homing.debounce_ms, 20);
    assert_eq!(homing.approach_travel().0, 4.0);
    assert_eq!(homing.cycles, 1);
    assert_eq!(config.runtime.as_array(), [b'?', 0x85, 0x86, 0x18]);
    assert_eq!(config.report.decimal_places, 4);
    assert!(config.report.inches);
}

/// Missing sections take the firmware defaults.
#[test]
fn test_defaults_fill_missing_sections() {
    let config = parse_config("[axes.z]\nsteps_per_mm = 250.0\n").expect("Failed to parse TOML");
    let defaults = MachineConfig::default();

    assert_eq!(config.axes.z.steps_per_mm, 250.0);
    assert_eq!(config.axes.x, defaults.axes.x);
    assert_eq!(config.motion, defaults.motion);
    assert_eq!(config.stepper, defaults.stepper);
    assert_eq!(config.homing, defaults.homing);
    assert!((defaults.axes.x.steps_per_mm - 377.952_76).abs() < 1e-3);
    assert_eq!(defaults.stepper.pulse_microseconds, 10);
    assert_eq!(defaults.homing.cycles, 2);
}

/// Loading a missing file reports an I/O error.
#[test]
fn test_load_missing_file() {
    let result = cnc_motion::load_config("does/not/exist.toml");
    assert!(matches!(
        result,
        Err(cnc_motion::Error::Config(cnc_motion::error::ConfigError::IoError(_)))
    ));
}
