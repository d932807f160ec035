//! Configuration module for cnc-motion.
//!
//! Provides the immutable machine configuration consumed by the planner,
//! scheduler and homing cycle, loadable from TOML files (with `std` feature)
//! or built in code from the firmware defaults.

mod axis;
mod homing;
mod machine;
mod motion;
mod runtime;
mod stepper;
pub mod units;
#[cfg(feature = "std")]
mod loader;
mod validation;

pub use axis::{Axis, AxisMask, N_AXIS};
pub use homing::{HomingConfig, MAX_HOMING_CYCLES};
pub use machine::{AxesConfig, AxisConfig, MachineConfig, ReportConfig};
pub use motion::MotionConfig;
pub use runtime::RuntimeCommands;
pub use stepper::{StepperConfig, IDLE_LOCK_ALWAYS, MAX_STEP_PULSE_MICROSECONDS};
pub use validation::validate_config;

#[cfg(feature = "std")]
pub use loader::{load_config, parse_config};

// Re-export unit types at config level
pub use units::{Millimeters, MmPerMin, MmPerMinSquared, Steps};
