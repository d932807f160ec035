//! Error types for the cnc-motion library.
//!
//! Provides unified error handling across configuration, planning, homing, and
//! pulse generation. Every error here is local and non-fatal: it changes the
//! position of a state machine, never the liveness of the scheduler.

use core::fmt;

use crate::config::{Axis, AxisMask};

/// Result type alias using the library's Error type.
pub type Result<T> = core::result::Result<T, Error>;

/// Unified error type for all cnc-motion operations.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error {
    /// Configuration parsing or validation error
    Config(ConfigError),
    /// Segment queue or segment validation error
    Planner(PlannerError),
    /// Homing cycle error
    Homing(HomingError),
    /// Pulse output error
    Stepper(StepperError),
    /// Motion requested while the machine is alarmed or homing
    Locked,
}

/// Configuration-related errors.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// Failed to parse TOML configuration
    ParseError(heapless::String<128>),
    /// Steps per mm must be finite and > 0
    InvalidStepsPerMm {
        /// Offending axis
        axis: Axis,
        /// Configured value
        value: f32,
    },
    /// Feed rate must be > 0
    InvalidFeedRate(f32),
    /// Acceleration must be > 0
    InvalidAcceleration(f32),
    /// Junction deviation must be >= 0
    InvalidJunctionDeviation(f32),
    /// Minimum planner speed must be >= 0
    InvalidMinimumPlannerSpeed(f32),
    /// Step pulse must be > 0 and, with the direction delay, <= 127 µs
    InvalidStepPulse(u8),
    /// Tick frequency must be > 0
    InvalidTickFrequency(u32),
    /// Step pulse does not fit inside one scheduler tick
    PulseExceedsTickPeriod {
        /// Pulse time including the direction delay
        pulse_us: u32,
        /// Scheduler tick period
        period_us: u32,
    },
    /// Acceleration ticks must be > 0 and not faster than the scheduler tick
    InvalidAccelerationTicks(u32),
    /// Minimum step rate must be > 0 and reachable by the scheduler tick
    InvalidMinimumStepRate(u32),
    /// Mask names an axis the machine does not have
    InvalidAxisMask(u8),
    /// Homing cycle count must be 1-128
    InvalidHomingCycles(u8),
    /// Homing distance out of range
    InvalidHomingDistance(f32),
    /// Two runtime commands share a byte
    DuplicateRuntimeCommand,
    /// Runtime command byte can appear in program text
    RuntimeCommandInProgramSyntax(u8),
    /// File I/O error (std only)
    #[cfg(feature = "std")]
    IoError(heapless::String<128>),
}

/// Planner errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PlannerError {
    /// Segment queue is at capacity; the caller must retry later
    QueueFull,
    /// No segment is waiting; the scheduler treats this as idle
    QueueEmpty,
    /// Segment rejected before entering the queue
    InvalidSegment(InvalidSegment),
}

/// Reasons a segment is rejected at enqueue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum InvalidSegment {
    /// Target equals the current position on every axis
    ZeroLength,
    /// Target coordinate is NaN or infinite
    NonFiniteTarget,
    /// Target is too far from the current position to count in steps
    OutOfRange,
    /// Feed rate is not a positive finite number
    InvalidFeedRate,
}

/// Homing errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum HomingError {
    /// Switches never tripped within the travel bound
    HomingFailed {
        /// Axes whose switches did not trip
        axes: AxisMask,
    },
    /// Switches still tripped after backing off
    SwitchNotReleased {
        /// Axes whose switches stayed tripped
        axes: AxisMask,
    },
    /// Homing is disabled in the configuration
    Disabled,
    /// Motion is in progress
    Busy,
}

/// Pulse output errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StepperError {
    /// Step, direction or enable output failed
    Port,
    /// Limit switch input failed
    LimitInput,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Config(e) => write!(f, "Configuration error: {}", e),
            Error::Planner(e) => write!(f, "Planner error: {}", e),
            Error::Homing(e) => write!(f, "Homing error: {}", e),
            Error::Stepper(e) => write!(f, "Stepper error: {}", e),
            Error::Locked => write!(f, "Motion locked until reset or homing"),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::ParseError(msg) => write!(f, "Parse error: {}", msg),
            ConfigError::InvalidStepsPerMm { axis, value } => {
                write!(f, "Invalid steps per mm on {:?}: {}. Must be > 0", axis, value)
            }
            ConfigError::InvalidFeedRate(v) => write!(f, "Invalid feed rate: {}. Must be > 0", v),
            ConfigError::InvalidAcceleration(v) => {
                write!(f, "Invalid acceleration: {}. Must be > 0", v)
            }
            ConfigError::InvalidJunctionDeviation(v) => {
                write!(f, "Invalid junction deviation: {}. Must be >= 0", v)
            }
            ConfigError::InvalidMinimumPlannerSpeed(v) => {
                write!(f, "Invalid minimum planner speed: {}. Must be >= 0", v)
            }
            ConfigError::InvalidStepPulse(v) => {
                write!(f, "Invalid step pulse: {} us. Must be 1-127 us including delay", v)
            }
            ConfigError::InvalidTickFrequency(v) => {
                write!(f, "Invalid tick frequency: {} Hz. Must be > 0", v)
            }
            ConfigError::PulseExceedsTickPeriod { pulse_us, period_us } => {
                write!(f, "Step pulse of {} us does not fit a {} us tick", pulse_us, period_us)
            }
            ConfigError::InvalidAccelerationTicks(v) => {
                write!(f, "Invalid acceleration ticks per second: {}", v)
            }
            ConfigError::InvalidMinimumStepRate(v) => {
                write!(f, "Invalid minimum step rate: {} steps/min", v)
            }
            ConfigError::InvalidAxisMask(v) => write!(f, "Invalid axis mask: {:#04x}", v),
            ConfigError::InvalidHomingCycles(v) => {
                write!(f, "Invalid homing cycle count: {}. Must be 1-128", v)
            }
            ConfigError::InvalidHomingDistance(v) => write!(f, "Invalid homing distance: {}", v),
            ConfigError::DuplicateRuntimeCommand => {
                write!(f, "Runtime command characters must be distinct")
            }
            ConfigError::RuntimeCommandInProgramSyntax(v) => {
                write!(f, "Runtime command {:#04x} collides with program syntax", v)
            }
            #[cfg(feature = "std")]
            ConfigError::IoError(msg) => write!(f, "I/O error: {}", msg),
        }
    }
}

impl fmt::Display for PlannerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlannerError::QueueFull => write!(f, "Segment queue full"),
            PlannerError::QueueEmpty => write!(f, "Segment queue empty"),
            PlannerError::InvalidSegment(reason) => write!(f, "Invalid segment: {}", reason),
        }
    }
}

impl fmt::Display for InvalidSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InvalidSegment::ZeroLength => write!(f, "zero length"),
            InvalidSegment::NonFiniteTarget => write!(f, "non-finite target"),
            InvalidSegment::OutOfRange => write!(f, "target out of range"),
            InvalidSegment::InvalidFeedRate => write!(f, "feed rate must be positive"),
        }
    }
}

impl fmt::Display for HomingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HomingError::HomingFailed { axes } => {
                write!(f, "Limit switch not found within travel (axes {:#05b})", axes.bits())
            }
            HomingError::SwitchNotReleased { axes } => {
                write!(f, "Limit switch still tripped after back-off (axes {:#05b})", axes.bits())
            }
            HomingError::Disabled => write!(f, "Homing disabled"),
            HomingError::Busy => write!(f, "Machine busy"),
        }
    }
}

impl fmt::Display for StepperError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StepperError::Port => write!(f, "Step output failed"),
            StepperError::LimitInput => write!(f, "Limit switch input failed"),
        }
    }
}

// Conversion impls
impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Error::Config(e)
    }
}

impl From<PlannerError> for Error {
    fn from(e: PlannerError) -> Self {
        Error::Planner(e)
    }
}

impl From<InvalidSegment> for PlannerError {
    fn from(e: InvalidSegment) -> Self {
        PlannerError::InvalidSegment(e)
    }
}

impl From<HomingError> for Error {
    fn from(e: HomingError) -> Self {
        Error::Homing(e)
    }
}

impl From<StepperError> for Error {
    fn from(e: StepperError) -> Self {
        Error::Stepper(e)
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}

#[cfg(feature = "std")]
impl std::error::Error for ConfigError {}

#[cfg(feature = "std")]
impl std::error::Error for PlannerError {}

#[cfg(feature = "std")]
impl std::error::Error for HomingError {}

#[cfg(feature = "std")]
impl std::error::Error for StepperError {}
