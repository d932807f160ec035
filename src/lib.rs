//! # cnc-motion
//!
//! Look-ahead motion planning and fixed-rate stepper pulse generation for
//! 3-axis machine tools, with embedded-hal 1.0 support.
//!
//! ## Features
//!
//! - **Look-ahead planner**: junction speeds from the cornering deviation,
//!   re-planned over the whole buffer on every change
//! - **Trapezoidal profiles**: triangular fallback for short moves
//! - **Fixed-rate scheduler**: bounded work per tick, Bresenham step
//!   distribution, resumable feed hold
//! - **Homing and hard limits**: debounced switches, multi-cycle locate
//! - **Runtime commands**: status report, feed hold, cycle start and reset
//!   picked off the input stream
//! - **no_std compatible**: no allocation; every buffer has a fixed capacity
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use cnc_motion::{HalStepperPort, LineRequest, MmPerMin, MotionSystem, RuntimeFlags};
//!
//! static FLAGS: RuntimeFlags = RuntimeFlags::new();
//!
//! // Load configuration from TOML
//! let config = cnc_motion::load_config("machine.toml")?;
//!
//! let port = HalStepperPort::new(step_pins, dir_pins, enable_pin, delay, &config.stepper);
//! let mut system: MotionSystem<'_, _> = MotionSystem::new(&config, &FLAGS, port);
//!
//! system.buffer_line(&LineRequest::new([10.0, 5.0, 0.0], MmPerMin(500.0)))?;
//!
//! // From the timer interrupt, at stepper.tick_frequency_hz
//! system.tick()?;
//!
//! // From the foreground loop
//! if let Some(report) = system.execute_runtime() {
//!     send(report.render()?.as_bytes());
//! }
//! ```
//!
//! ## Feature Flags
//!
//! - `std` (default): Enables file I/O and TOML parsing
//! - `defmt`: Enables defmt logging for embedded targets
//! - `critical-section`: Atomic flags on targets without native atomics

#![cfg_attr(not(feature = "std"), no_std)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]
// Allow large error types - necessary for no_std with heapless strings
#![allow(clippy::result_large_err)]

// Core modules
pub mod config;
pub mod error;
pub mod homing;
pub mod motion;
pub mod planner;
pub mod realtime;
pub mod stepper;
pub mod system;

// Re-exports for ergonomic API
pub use config::{validate_config, AxisMask, MachineConfig, N_AXIS};
pub use error::{Error, Result};
pub use homing::{HomingCycle, HomingState, LimitDebouncer, LimitInputs, LimitSwitches};
pub use motion::{MotionPhase, VelocityProfile};
pub use planner::{FeedRate, LineRequest, MotionSegment, Planner, SEGMENT_QUEUE_CAPACITY};
pub use realtime::{RealtimeCommand, RealtimeInterceptor, RuntimeFlags, StatusReport};
pub use stepper::{HalStepperPort, SchedulerState, StepperPort, StepperScheduler};
pub use system::{MachineState, MotionSystem};

// Configuration loading (std only)
#[cfg(feature = "std")]
pub use config::{load_config, parse_config};

// Unit types
pub use config::units::{Millimeters, MmPerMin, MmPerMinSquared, Steps};
